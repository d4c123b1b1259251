//! AES-256-CBC with an explicit padding policy
//!
//! All work happens in place inside `Zeroizing` buffers, so plaintext copies
//! are wiped on success and on every error path.

use aes::cipher::block_padding::{NoPadding, Pkcs7};
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use zeroize::Zeroizing;

use crate::error::{EnvelopeError, EnvelopeResult};
use crate::keys::{AesKey, Iv};
use crate::AES_BLOCK_SIZE;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Padding applied before CBC encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Padding {
    /// Input must already be a multiple of the block size.
    None,
    /// PKCS#7 (RFC 5652): always adds 1..=16 bytes.
    Pkcs7,
}

/// Encrypt `plain` under `key`/`iv`.
pub fn encrypt(key: &AesKey, iv: &Iv, plain: &[u8], padding: Padding) -> EnvelopeResult<Vec<u8>> {
    let padded_len = match padding {
        Padding::None => {
            if plain.len() % AES_BLOCK_SIZE != 0 {
                return Err(EnvelopeError::UnalignedInput { len: plain.len() });
            }
            plain.len()
        }
        Padding::Pkcs7 => (plain.len() / AES_BLOCK_SIZE + 1) * AES_BLOCK_SIZE,
    };

    let mut buf = Zeroizing::new(vec![0u8; padded_len]);
    buf[..plain.len()].copy_from_slice(plain);

    let enc = Aes256CbcEnc::new(key.as_bytes().into(), iv.as_bytes().into());
    let cipher = match padding {
        Padding::None => enc.encrypt_padded_mut::<NoPadding>(&mut buf, plain.len()),
        Padding::Pkcs7 => enc.encrypt_padded_mut::<Pkcs7>(&mut buf, plain.len()),
    }
    .map_err(|_| EnvelopeError::UnalignedInput { len: plain.len() })?;

    Ok(cipher.to_vec())
}

/// Decrypt `cipher` under `key`/`iv`, stripping padding if requested.
///
/// Any padding failure, and any ciphertext that is not block aligned, yields
/// the same opaque `PaddingInvalid`.
pub fn decrypt(
    key: &AesKey,
    iv: &Iv,
    cipher: &[u8],
    padding: Padding,
) -> EnvelopeResult<Zeroizing<Vec<u8>>> {
    if cipher.len() % AES_BLOCK_SIZE != 0 {
        return Err(EnvelopeError::PaddingInvalid);
    }

    let mut buf = Zeroizing::new(cipher.to_vec());
    let dec = Aes256CbcDec::new(key.as_bytes().into(), iv.as_bytes().into());
    let plain_len = match padding {
        Padding::None => dec.decrypt_padded_mut::<NoPadding>(&mut buf).map(|p| p.len()),
        Padding::Pkcs7 => dec.decrypt_padded_mut::<Pkcs7>(&mut buf).map(|p| p.len()),
    }
    .map_err(|_| EnvelopeError::PaddingInvalid)?;

    buf.truncate(plain_len);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AES_KEY_SIZE;

    fn test_key() -> AesKey {
        AesKey::from_bytes([0x42u8; AES_KEY_SIZE])
    }

    fn test_iv() -> Iv {
        Iv::from_bytes([0x24u8; AES_BLOCK_SIZE])
    }

    #[test]
    fn test_nist_cbc_aes256_first_block() {
        // NIST SP 800-38A F.2.5, CBC-AES256.Encrypt, block #1
        let key = AesKey::from_bytes([
            0x60, 0x3d, 0xeb, 0x10, 0x15, 0xca, 0x71, 0xbe, 0x2b, 0x73, 0xae, 0xf0, 0x85, 0x7d,
            0x77, 0x81, 0x1f, 0x35, 0x2c, 0x07, 0x3b, 0x61, 0x08, 0xd7, 0x2d, 0x98, 0x10, 0xa3,
            0x09, 0x14, 0xdf, 0xf4,
        ]);
        let iv = Iv::from_bytes([
            0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d,
            0x0e, 0x0f,
        ]);
        let plain = [
            0x6b, 0xc1, 0xbe, 0xe2, 0x2e, 0x40, 0x9f, 0x96, 0xe9, 0x3d, 0x7e, 0x11, 0x73, 0x93,
            0x17, 0x2a,
        ];
        let expected = [
            0xf5, 0x8c, 0x4c, 0x04, 0xd6, 0xe5, 0xf1, 0xba, 0x77, 0x9e, 0xab, 0xfb, 0x5f, 0x7b,
            0xfb, 0xd6,
        ];

        let cipher = encrypt(&key, &iv, &plain, Padding::None).unwrap();
        assert_eq!(cipher, expected);

        let back = decrypt(&key, &iv, &cipher, Padding::None).unwrap();
        assert_eq!(&back[..], &plain);
    }

    #[test]
    fn test_pkcs7_roundtrip_lengths() {
        for len in [0usize, 1, 15, 16, 17, 31, 32, 100] {
            let plain = vec![0xA5u8; len];
            let cipher = encrypt(&test_key(), &test_iv(), &plain, Padding::Pkcs7).unwrap();
            assert_eq!(cipher.len(), (len / AES_BLOCK_SIZE + 1) * AES_BLOCK_SIZE);

            let back = decrypt(&test_key(), &test_iv(), &cipher, Padding::Pkcs7).unwrap();
            assert_eq!(&back[..], &plain[..]);
        }
    }

    #[test]
    fn test_no_padding_rejects_unaligned() {
        let result = encrypt(&test_key(), &test_iv(), &[0u8; 17], Padding::None);
        assert!(matches!(result, Err(EnvelopeError::UnalignedInput { len: 17 })));
    }

    #[test]
    fn test_no_padding_keeps_length() {
        let cipher = encrypt(&test_key(), &test_iv(), &[1u8; 112], Padding::None).unwrap();
        assert_eq!(cipher.len(), 112);
    }

    #[test]
    fn test_decrypt_unaligned_is_padding_error() {
        let result = decrypt(&test_key(), &test_iv(), &[0u8; 20], Padding::Pkcs7);
        assert!(matches!(result, Err(EnvelopeError::PaddingInvalid)));
    }

    #[test]
    fn test_decrypt_bad_padding_fails() {
        // Encrypt a block whose last byte is not a valid PKCS#7 pad, then ask
        // for padded decryption.
        let mut block = [0u8; AES_BLOCK_SIZE];
        block[AES_BLOCK_SIZE - 1] = 0x00;
        let cipher = encrypt(&test_key(), &test_iv(), &block, Padding::None).unwrap();

        let result = decrypt(&test_key(), &test_iv(), &cipher, Padding::Pkcs7);
        assert!(matches!(result, Err(EnvelopeError::PaddingInvalid)));
    }

    #[test]
    fn test_wrong_key_changes_plaintext() {
        let plain = [9u8; 32];
        let cipher = encrypt(&test_key(), &test_iv(), &plain, Padding::None).unwrap();
        let other = AesKey::from_bytes([0x43u8; AES_KEY_SIZE]);

        let back = decrypt(&other, &test_iv(), &cipher, Padding::None).unwrap();
        assert_ne!(&back[..], &plain);
    }
}
