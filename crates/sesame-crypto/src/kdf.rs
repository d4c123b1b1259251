//! Key derivation: PBKDF2 for the outer (password) and inner (KGK) layers
//!
//! The two layers deliberately use different hashes and work factors. The
//! master password is the brute-force target, so it gets SHA-384 with
//! `DOMAIN_ITERATIONS`. The KGK already carries 512 bits of entropy, so the
//! blob key uses SHA-256 with the much lighter `KGK_ITERATIONS`.

use pbkdf2::pbkdf2_hmac;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Sha256, Sha384};
use zeroize::Zeroizing;

use crate::keys::{AesKey, Iv, Kgk, Salt};
use crate::{AES_BLOCK_SIZE, AES_KEY_SIZE, DOMAIN_ITERATIONS, KGK_ITERATIONS};

/// Output length of the outer derivation: one SHA-384 block.
const KEY_AND_IV_SIZE: usize = 384 / 8;

const _: () = assert!(AES_KEY_SIZE + AES_BLOCK_SIZE <= KEY_AND_IV_SIZE);

/// Key and IV protecting the KGK bundle, derived from the master password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OuterKey {
    pub key: AesKey,
    pub iv: Iv,
}

/// Derive the outer AES key and IV from the master password.
///
/// PBKDF2-HMAC-SHA384 with `DOMAIN_ITERATIONS` rounds yields 48 bytes: the
/// first 32 become the key, the next 16 the IV.
pub fn derive_key_and_iv(password: &SecretString, salt: &Salt) -> OuterKey {
    let mut okm = Zeroizing::new([0u8; KEY_AND_IV_SIZE]);
    pbkdf2_hmac::<Sha384>(
        password.expose_secret().as_bytes(),
        salt.as_bytes(),
        DOMAIN_ITERATIONS,
        &mut okm[..],
    );
    OuterKey {
        key: AesKey::from_slice(&okm[..AES_KEY_SIZE]),
        iv: Iv::from_slice(&okm[AES_KEY_SIZE..AES_KEY_SIZE + AES_BLOCK_SIZE]),
    }
}

/// Derive the blob key that protects the payload from the KGK itself.
///
/// PBKDF2-HMAC-SHA256, `KGK_ITERATIONS` rounds, 256-bit output.
pub fn derive_blob_key(kgk: &Kgk, salt: &Salt) -> AesKey {
    let mut okm = Zeroizing::new([0u8; AES_KEY_SIZE]);
    pbkdf2_sha256(kgk.as_bytes(), salt.as_bytes(), KGK_ITERATIONS, &mut okm[..]);
    AesKey::from_bytes(*okm)
}

fn pbkdf2_sha256(secret: &[u8], salt: &[u8], rounds: u32, out: &mut [u8]) {
    pbkdf2_hmac::<Sha256>(secret, salt, rounds, out);
}
