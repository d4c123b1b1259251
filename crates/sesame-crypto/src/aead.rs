//! Format 0x02: the same two-layer envelope sealed with AES-256-GCM
//!
//! ```text
//! [1: flag 0x02][32: outer salt][128: sealed KGK bundle + tag][n + 16: sealed payload + tag]
//! ```
//!
//! - Outer layer: key/IV from `derive_key_and_iv(password, outer salt)`,
//!   nonce = first 12 IV bytes, AAD = flag ‖ outer salt.
//! - Inner layer: blob key from `derive_blob_key(KGK, inner salt)`,
//!   nonce = first 12 inner IV bytes, AAD = flag.
//!
//! Each outer salt is drawn fresh by `seal`/`rewrap` and each inner salt by
//! `encode`, so no (key, nonce) pair repeats.

use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::{CryptoRng, RngCore};
use secrecy::SecretString;
use zeroize::Zeroizing;

use crate::compress::{self, Compression};
use crate::envelope::{FormatVersion, KgkBundle, Opened};
use crate::error::{EnvelopeError, EnvelopeResult};
use crate::kdf::{derive_blob_key, derive_key_and_iv, OuterKey};
use crate::keys::{AesKey, Iv, Kgk, Salt};
use crate::{CRYPT_DATA_SIZE, SALT_SIZE};

/// GCM nonce size (96-bit)
pub const GCM_NONCE_SIZE: usize = 12;

/// GCM authentication tag size
pub const GCM_TAG_SIZE: usize = 16;

/// Sealed KGK bundle size
pub const SEALED_BUNDLE_SIZE: usize = CRYPT_DATA_SIZE + GCM_TAG_SIZE;

/// Bytes preceding the sealed payload
pub const AEAD_HEADER_SIZE: usize = 1 + SALT_SIZE + SEALED_BUNDLE_SIZE;

const FLAG: u8 = FormatVersion::Aead as u8;

fn seal_in_place(key: &AesKey, iv: &Iv, aad: &[u8], buf: &mut Vec<u8>) -> EnvelopeResult<()> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());
    let nonce = Nonce::from_slice(&iv.as_bytes()[..GCM_NONCE_SIZE]);
    cipher
        .encrypt_in_place(nonce, aad, buf)
        .map_err(|e| EnvelopeError::Encryption(format!("AES-256-GCM seal failed: {e}")))
}

fn open_in_place(key: &AesKey, iv: &Iv, aad: &[u8], buf: &mut Vec<u8>) -> EnvelopeResult<()> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());
    let nonce = Nonce::from_slice(&iv.as_bytes()[..GCM_NONCE_SIZE]);
    cipher
        .decrypt_in_place(nonce, aad, buf)
        .map_err(|_| EnvelopeError::PaddingInvalid)
}

fn outer_aad(salt: &Salt) -> [u8; 1 + SALT_SIZE] {
    let mut aad = [0u8; 1 + SALT_SIZE];
    aad[0] = FLAG;
    aad[1..].copy_from_slice(salt.as_bytes());
    aad
}

pub(crate) fn seal_bundle(outer: &OuterKey, outer_salt: &Salt, bundle: &KgkBundle) -> EnvelopeResult<Vec<u8>> {
    let mut buf = bundle.to_bytes();
    seal_in_place(&outer.key, &outer.iv, &outer_aad(outer_salt), &mut buf)?;
    // Sealed bytes are ciphertext; hand them out of the zeroizing wrapper.
    Ok(std::mem::take(&mut *buf))
}

fn open_bundle(password: &SecretString, envelope: &[u8]) -> EnvelopeResult<KgkBundle> {
    let outer_salt = Salt::from_slice(&envelope[1..1 + SALT_SIZE]);
    let outer = derive_key_and_iv(password, &outer_salt);

    let mut buf = Zeroizing::new(envelope[1 + SALT_SIZE..AEAD_HEADER_SIZE].to_vec());
    open_in_place(&outer.key, &outer.iv, &outer_aad(&outer_salt), &mut buf)?;
    KgkBundle::from_bytes(&buf)
}

fn check_header(envelope: &[u8]) -> EnvelopeResult<()> {
    let found = FormatVersion::of(envelope)?;
    if found != FormatVersion::Aead {
        return Err(EnvelopeError::FormatMismatch { found: found.flag() });
    }
    // The payload always carries at least its tag.
    let min = AEAD_HEADER_SIZE + GCM_TAG_SIZE;
    if envelope.len() < min {
        return Err(EnvelopeError::MalformedEnvelope {
            len: envelope.len(),
            min,
        });
    }
    Ok(())
}

/// Encode a format 0x02 envelope.
pub fn encode<R: RngCore + CryptoRng>(
    outer: &OuterKey,
    outer_salt: &Salt,
    kgk: &Kgk,
    payload: &[u8],
    compression: Compression,
    rng: &mut R,
) -> EnvelopeResult<Vec<u8>> {
    let bundle = KgkBundle::generate(kgk, rng)?;
    let sealed_bundle = seal_bundle(outer, outer_salt, &bundle)?;

    let mut buf = match compression {
        Compression::Off => {
            let mut buf = Zeroizing::new(Vec::with_capacity(payload.len() + GCM_TAG_SIZE));
            buf.extend_from_slice(payload);
            buf
        }
        Compression::Zlib(level) => compress::compress(payload, level)?,
    };
    let blob_key = derive_blob_key(&bundle.kgk, &bundle.salt);
    seal_in_place(&blob_key, &bundle.iv, &[FLAG], &mut buf)?;

    let mut out = Vec::with_capacity(AEAD_HEADER_SIZE + buf.len());
    out.push(FLAG);
    out.extend_from_slice(outer_salt.as_bytes());
    out.extend_from_slice(&sealed_bundle);
    out.extend_from_slice(&buf);

    tracing::debug!(
        payload_len = payload.len(),
        envelope_len = out.len(),
        compressed = compression.is_enabled(),
        "encoded envelope (format 0x02)"
    );
    Ok(out)
}

/// Decode a format 0x02 envelope.
pub fn decode(
    password: &SecretString,
    envelope: &[u8],
    uncompress: bool,
) -> EnvelopeResult<Opened> {
    let (bundle, payload) = decode_parts(password, envelope, uncompress)?;
    Ok(Opened {
        payload,
        kgk: bundle.kgk,
        format: FormatVersion::Aead,
    })
}

fn decode_parts(
    password: &SecretString,
    envelope: &[u8],
    uncompress: bool,
) -> EnvelopeResult<(KgkBundle, Zeroizing<Vec<u8>>)> {
    check_header(envelope)?;
    let bundle = open_bundle(password, envelope)?;

    let blob_key = derive_blob_key(&bundle.kgk, &bundle.salt);
    let mut buf = Zeroizing::new(envelope[AEAD_HEADER_SIZE..].to_vec());
    open_in_place(&blob_key, &bundle.iv, &[FLAG], &mut buf)?;

    let payload = if uncompress {
        compress::decompress(&buf)?
    } else {
        buf
    };

    tracing::debug!(
        envelope_len = envelope.len(),
        payload_len = payload.len(),
        "decoded envelope (format 0x02)"
    );
    Ok((bundle, payload))
}

/// Open a format 0x02 envelope with `password` and hand back its KGK bundle
/// together with the untouched sealed payload. Both tags are checked.
pub(crate) fn verify_bundle<'a>(
    password: &SecretString,
    envelope: &'a [u8],
    uncompress: bool,
) -> EnvelopeResult<(KgkBundle, &'a [u8])> {
    let (bundle, _plain) = decode_parts(password, envelope, uncompress)?;
    Ok((bundle, &envelope[AEAD_HEADER_SIZE..]))
}
