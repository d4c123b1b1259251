//! Versioned envelope: encode/decode of the wrapped KGK plus payload
//!
//! Format 0x01 (AES-256-CBC, no integrity tag):
//! ```text
//! offset  len   field
//!      0    1   format flag (0x01)
//!      1   32   outer salt (cleartext)
//!     33  112   KGK bundle: inner salt ‖ inner IV ‖ KGK, CBC, no padding
//!    145    n   payload, CBC, PKCS#7, optionally zlib-compressed first
//! ```
//!
//! Without a tag, a wrong password is only noticed when the payload padding
//! happens to be invalid. Roughly 1 in 256 wrong passwords will still "open"
//! a format 0x01 envelope to garbage. Format 0x02 (see [`crate::aead`]) closes
//! that gap and is what [`seal`] should be asked for in new deployments.

use rand::{CryptoRng, RngCore};
use secrecy::SecretString;
use zeroize::Zeroizing;

use crate::aead;
use crate::cipher::{decrypt, encrypt, Padding};
use crate::compress::{self, Compression};
use crate::error::{EnvelopeError, EnvelopeResult};
use crate::kdf::{derive_blob_key, derive_key_and_iv, OuterKey};
use crate::keys::{Iv, Kgk, Salt};
use crate::{AES_BLOCK_SIZE, CRYPT_DATA_SIZE, HEADER_SIZE, SALT_SIZE};

/// Known envelope formats, identified by the leading byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FormatVersion {
    /// AES-256 encrypted masterkey, CBC, version 1
    LegacyCbc = 0x01,
    /// AES-256-GCM sealed masterkey and payload
    Aead = 0x02,
}

impl FormatVersion {
    pub fn flag(self) -> u8 {
        self as u8
    }

    pub fn from_flag(flag: u8) -> EnvelopeResult<Self> {
        match flag {
            0x01 => Ok(Self::LegacyCbc),
            0x02 => Ok(Self::Aead),
            found => Err(EnvelopeError::FormatMismatch { found }),
        }
    }

    /// Read the flag of a serialized envelope without decrypting anything.
    pub fn of(envelope: &[u8]) -> EnvelopeResult<Self> {
        let flag = envelope
            .first()
            .ok_or(EnvelopeError::MalformedEnvelope { len: 0, min: 1 })?;
        Self::from_flag(*flag)
    }
}

/// The result of opening an envelope.
#[derive(Debug)]
pub struct Opened {
    pub payload: Zeroizing<Vec<u8>>,
    pub kgk: Kgk,
    pub format: FormatVersion,
}

/// The decrypted KGK bundle: inner salt, inner IV and the KGK.
pub(crate) struct KgkBundle {
    pub salt: Salt,
    pub iv: Iv,
    pub kgk: Kgk,
}

impl KgkBundle {
    pub(crate) fn generate<R: RngCore + CryptoRng>(kgk: &Kgk, rng: &mut R) -> EnvelopeResult<Self> {
        Ok(Self {
            salt: Salt::generate(rng)?,
            iv: Iv::generate(rng)?,
            kgk: kgk.clone(),
        })
    }

    pub(crate) fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        let mut out = Zeroizing::new(Vec::with_capacity(CRYPT_DATA_SIZE));
        out.extend_from_slice(self.salt.as_bytes());
        out.extend_from_slice(self.iv.as_bytes());
        out.extend_from_slice(self.kgk.as_bytes());
        out
    }

    pub(crate) fn from_bytes(bytes: &[u8]) -> EnvelopeResult<Self> {
        if bytes.len() != CRYPT_DATA_SIZE {
            return Err(EnvelopeError::PaddingInvalid);
        }
        let (salt, rest) = bytes.split_at(SALT_SIZE);
        let (iv, kgk) = rest.split_at(AES_BLOCK_SIZE);
        Ok(Self {
            salt: Salt::from_slice(salt),
            iv: Iv::from_slice(iv),
            kgk: Kgk::from_slice(kgk),
        })
    }
}

/// Encode a format 0x01 envelope.
///
/// `outer` must be the key/IV derived from the master password and
/// `outer_salt` via [`derive_key_and_iv`]. A fresh inner salt and IV are drawn
/// from `rng` on every call.
pub fn encode<R: RngCore + CryptoRng>(
    outer: &OuterKey,
    outer_salt: &Salt,
    kgk: &Kgk,
    payload: &[u8],
    compression: Compression,
    rng: &mut R,
) -> EnvelopeResult<Vec<u8>> {
    let bundle = KgkBundle::generate(kgk, rng)?;
    let encrypted_kgk = encrypt(&outer.key, &outer.iv, &bundle.to_bytes(), Padding::None)?;
    debug_assert_eq!(encrypted_kgk.len(), CRYPT_DATA_SIZE);

    let blob_key = derive_blob_key(&bundle.kgk, &bundle.salt);
    let cipher = match compression {
        Compression::Off => encrypt(&blob_key, &bundle.iv, payload, Padding::Pkcs7)?,
        Compression::Zlib(level) => {
            let packed = compress::compress(payload, level)?;
            encrypt(&blob_key, &bundle.iv, &packed, Padding::Pkcs7)?
        }
    };

    let mut out = Vec::with_capacity(HEADER_SIZE + cipher.len());
    out.push(FormatVersion::LegacyCbc.flag());
    out.extend_from_slice(outer_salt.as_bytes());
    out.extend_from_slice(&encrypted_kgk);
    out.extend_from_slice(&cipher);

    tracing::debug!(
        payload_len = payload.len(),
        envelope_len = out.len(),
        compressed = compression.is_enabled(),
        "encoded envelope (format 0x01)"
    );
    Ok(out)
}

/// Decode a format 0x01 envelope. Every other flag is refused before any key
/// is derived.
pub fn decode(
    password: &SecretString,
    envelope: &[u8],
    uncompress: bool,
) -> EnvelopeResult<Opened> {
    let (bundle, payload) = decode_legacy(password, envelope, uncompress)?;
    Ok(Opened {
        payload,
        kgk: bundle.kgk,
        format: FormatVersion::LegacyCbc,
    })
}

fn decode_legacy(
    password: &SecretString,
    envelope: &[u8],
    uncompress: bool,
) -> EnvelopeResult<(KgkBundle, Zeroizing<Vec<u8>>)> {
    let format = FormatVersion::of(envelope)?;
    if format != FormatVersion::LegacyCbc {
        tracing::warn!(flag = format.flag(), "refusing non-0x01 envelope in legacy decoder");
        return Err(EnvelopeError::FormatMismatch { found: format.flag() });
    }
    if envelope.len() < HEADER_SIZE {
        return Err(EnvelopeError::MalformedEnvelope {
            len: envelope.len(),
            min: HEADER_SIZE,
        });
    }

    let outer_salt = Salt::from_slice(&envelope[1..1 + SALT_SIZE]);
    let outer = derive_key_and_iv(password, &outer_salt);
    let bundle = unwrap_bundle(&outer, &envelope[1 + SALT_SIZE..HEADER_SIZE])?;

    let blob_key = derive_blob_key(&bundle.kgk, &bundle.salt);
    let plain = decrypt(&blob_key, &bundle.iv, &envelope[HEADER_SIZE..], Padding::Pkcs7)?;
    let payload = if uncompress {
        compress::decompress(&plain)?
    } else {
        plain
    };

    tracing::debug!(
        envelope_len = envelope.len(),
        payload_len = payload.len(),
        "decoded envelope (format 0x01)"
    );
    Ok((bundle, payload))
}

fn unwrap_bundle(outer: &OuterKey, encrypted: &[u8]) -> EnvelopeResult<KgkBundle> {
    let plain = decrypt(&outer.key, &outer.iv, encrypted, Padding::None)?;
    KgkBundle::from_bytes(&plain)
}

/// Open an envelope of any known format.
pub fn open(password: &SecretString, envelope: &[u8], uncompress: bool) -> EnvelopeResult<Opened> {
    match FormatVersion::of(envelope)? {
        FormatVersion::LegacyCbc => decode(password, envelope, uncompress),
        FormatVersion::Aead => aead::decode(password, envelope, uncompress),
    }
}

/// Create an envelope from the master password: draws the outer salt,
/// derives the outer key/IV and encodes in `format`.
pub fn seal<R: RngCore + CryptoRng>(
    password: &SecretString,
    kgk: &Kgk,
    payload: &[u8],
    format: FormatVersion,
    compression: Compression,
    rng: &mut R,
) -> EnvelopeResult<Vec<u8>> {
    let outer_salt = Salt::generate(rng)?;
    let outer = derive_key_and_iv(password, &outer_salt);
    match format {
        FormatVersion::LegacyCbc => encode(&outer, &outer_salt, kgk, payload, compression, rng),
        FormatVersion::Aead => aead::encode(&outer, &outer_salt, kgk, payload, compression, rng),
    }
}

/// Change the master password of an envelope.
///
/// Only the fixed-size KGK bundle is re-wrapped under a fresh outer salt; the
/// payload ciphertext is carried over byte for byte. The old password must
/// open the whole envelope first (`uncompress` as for [`open`]), so a guess
/// that only slips past the padding check cannot replace the KGK.
pub fn rewrap<R: RngCore + CryptoRng>(
    old_password: &SecretString,
    new_password: &SecretString,
    envelope: &[u8],
    uncompress: bool,
    rng: &mut R,
) -> EnvelopeResult<Vec<u8>> {
    let format = FormatVersion::of(envelope)?;
    let (bundle, payload) = match format {
        FormatVersion::LegacyCbc => {
            let (bundle, _plain) = decode_legacy(old_password, envelope, uncompress)?;
            (bundle, &envelope[HEADER_SIZE..])
        }
        // The GCM tags authenticate the old password.
        FormatVersion::Aead => aead::verify_bundle(old_password, envelope, uncompress)?,
    };

    let new_salt = Salt::generate(rng)?;
    let new_outer = derive_key_and_iv(new_password, &new_salt);
    let wrapped = match format {
        FormatVersion::LegacyCbc => {
            encrypt(&new_outer.key, &new_outer.iv, &bundle.to_bytes(), Padding::None)?
        }
        FormatVersion::Aead => aead::seal_bundle(&new_outer, &new_salt, &bundle)?,
    };

    let mut out = Vec::with_capacity(1 + SALT_SIZE + wrapped.len() + payload.len());
    out.push(format.flag());
    out.extend_from_slice(new_salt.as_bytes());
    out.extend_from_slice(&wrapped);
    out.extend_from_slice(payload);

    tracing::info!(flag = format.flag(), "master password changed");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KGK_SIZE;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn password() -> SecretString {
        SecretString::from("test-master-password")
    }

    fn kgk() -> Kgk {
        Kgk::from_bytes([0x3cu8; KGK_SIZE])
    }

    fn sealed(payload: &[u8], compression: Compression) -> Vec<u8> {
        let mut rng = StdRng::seed_from_u64(42);
        let salt = Salt::from_bytes([0x11u8; SALT_SIZE]);
        let outer = derive_key_and_iv(&password(), &salt);
        encode(&outer, &salt, &kgk(), payload, compression, &mut rng).unwrap()
    }

    #[test]
    fn test_empty_payload_layout() {
        let envelope = sealed(b"", Compression::Off);

        assert_eq!(envelope.len(), 1 + 32 + 112 + 16);
        assert_eq!(envelope[0], 0x01);
        assert_eq!(&envelope[1..33], &[0x11u8; SALT_SIZE]);

        let opened = decode(&password(), &envelope, false).unwrap();
        assert!(opened.payload.is_empty());
        assert_eq!(opened.kgk, kgk());
        assert_eq!(opened.format, FormatVersion::LegacyCbc);
    }

    #[test]
    fn test_roundtrip_with_compression() {
        let payload = br#"{"domains":[{"name":"example.com","length":16}]}"#.repeat(20);
        let envelope = sealed(&payload, Compression::Zlib(9));

        let opened = decode(&password(), &envelope, true).unwrap();
        assert_eq!(&opened.payload[..], &payload[..]);
        assert_eq!(opened.kgk, kgk());
    }

    #[test]
    fn test_format_flag_gate() {
        let mut envelope = sealed(b"data", Compression::Off);
        for flag in [0x00u8, 0x02, 0x7f, 0xff] {
            envelope[0] = flag;
            let err = decode(&password(), &envelope, false).unwrap_err();
            assert!(matches!(err, EnvelopeError::FormatMismatch { found } if found == flag));
        }
    }

    #[test]
    fn test_short_envelope_rejected() {
        let envelope = sealed(b"", Compression::Off);
        let err = decode(&password(), &envelope[..HEADER_SIZE - 1], false).unwrap_err();
        assert!(matches!(err, EnvelopeError::MalformedEnvelope { min: HEADER_SIZE, .. }));

        let err = decode(&password(), &[], false).unwrap_err();
        assert!(matches!(err, EnvelopeError::MalformedEnvelope { len: 0, .. }));
    }

    #[test]
    fn test_fresh_inner_randomness_per_encode() {
        let salt = Salt::from_bytes([0x11u8; SALT_SIZE]);
        let outer = derive_key_and_iv(&password(), &salt);
        let mut rng = StdRng::seed_from_u64(5);

        let a = encode(&outer, &salt, &kgk(), b"same", Compression::Off, &mut rng).unwrap();
        let b = encode(&outer, &salt, &kgk(), b"same", Compression::Off, &mut rng).unwrap();

        assert_eq!(a[..33], b[..33], "caller-supplied salt is kept");
        assert_ne!(a[33..HEADER_SIZE], b[33..HEADER_SIZE], "KGK bundle must differ");
        assert_ne!(a[HEADER_SIZE..], b[HEADER_SIZE..], "payload ciphertext must differ");
    }

    #[test]
    fn test_seal_then_open_both_formats() {
        let mut rng = StdRng::seed_from_u64(9);
        for format in [FormatVersion::LegacyCbc, FormatVersion::Aead] {
            let envelope =
                seal(&password(), &kgk(), b"payload", format, Compression::Zlib(6), &mut rng).unwrap();
            assert_eq!(FormatVersion::of(&envelope).unwrap(), format);

            let opened = open(&password(), &envelope, true).unwrap();
            assert_eq!(&opened.payload[..], b"payload");
            assert_eq!(opened.kgk, kgk());
            assert_eq!(opened.format, format);
        }
    }

    #[test]
    fn test_open_rejects_unknown_flag() {
        let mut envelope = sealed(b"x", Compression::Off);
        envelope[0] = 0x03;
        assert!(matches!(
            open(&password(), &envelope, false),
            Err(EnvelopeError::FormatMismatch { found: 0x03 })
        ));
    }

    #[test]
    fn test_rewrap_keeps_payload_ciphertext() {
        let envelope = sealed(b"site list", Compression::Off);
        let new_password = SecretString::from("new-master-password");
        let mut rng = StdRng::seed_from_u64(77);

        let rewrapped = rewrap(&password(), &new_password, &envelope, false, &mut rng).unwrap();

        assert_eq!(rewrapped.len(), envelope.len());
        assert_ne!(rewrapped[1..33], envelope[1..33], "outer salt must be fresh");
        assert_eq!(rewrapped[HEADER_SIZE..], envelope[HEADER_SIZE..]);

        let opened = decode(&new_password, &rewrapped, false).unwrap();
        assert_eq!(&opened.payload[..], b"site list");
        assert_eq!(opened.kgk, kgk());
    }

    #[test]
    fn test_flag_helpers() {
        assert_eq!(FormatVersion::LegacyCbc.flag(), 0x01);
        assert_eq!(FormatVersion::from_flag(0x02).unwrap(), FormatVersion::Aead);
        assert!(FormatVersion::from_flag(0x00).is_err());
    }
}
