//! Owned key material: KGK, AES keys, IVs and salts
//!
//! Every secret type overwrites its bytes on drop and redacts itself in
//! `Debug` output. `Salt` travels in cleartext and is only a distinct type.

use rand::{CryptoRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::EnvelopeResult;
use crate::rng::fill_random;
use crate::{AES_BLOCK_SIZE, AES_KEY_SIZE, KGK_SIZE, SALT_SIZE};

macro_rules! secret_bytes {
    ($(#[$meta:meta])* $name:ident, $size:expr) => {
        $(#[$meta])*
        #[derive(Clone, Zeroize, ZeroizeOnDrop)]
        pub struct $name {
            bytes: [u8; $size],
        }

        impl $name {
            pub fn from_bytes(bytes: [u8; $size]) -> Self {
                Self { bytes }
            }

            pub fn as_bytes(&self) -> &[u8; $size] {
                &self.bytes
            }

            /// Copy from a slice of exactly the right length.
            pub(crate) fn from_slice(slice: &[u8]) -> Self {
                let mut bytes = [0u8; $size];
                bytes.copy_from_slice(slice);
                Self { bytes }
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.bytes == other.bytes
            }
        }

        impl Eq for $name {}

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("bytes", &"[REDACTED]")
                    .finish()
            }
        }
    };
}

secret_bytes!(
    /// The 64-byte key generation key. Seeds every per-site password and
    /// never leaves memory except wrapped inside an envelope.
    Kgk,
    KGK_SIZE
);

secret_bytes!(
    /// A 256-bit AES key.
    AesKey,
    AES_KEY_SIZE
);

secret_bytes!(
    /// A 128-bit AES-CBC initialization vector.
    Iv,
    AES_BLOCK_SIZE
);

impl Kgk {
    /// Generate the KGK for a new identity.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> EnvelopeResult<Self> {
        let mut bytes = [0u8; KGK_SIZE];
        fill_random(rng, &mut bytes)?;
        let kgk = Self::from_bytes(bytes);
        bytes.zeroize();
        Ok(kgk)
    }
}

impl Iv {
    pub(crate) fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> EnvelopeResult<Self> {
        let mut bytes = [0u8; AES_BLOCK_SIZE];
        fill_random(rng, &mut bytes)?;
        Ok(Self::from_bytes(bytes))
    }
}

/// A 32-byte PBKDF2 salt, stored in cleartext next to the ciphertext.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Salt([u8; SALT_SIZE]);

impl Salt {
    pub fn from_bytes(bytes: [u8; SALT_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.0
    }

    /// Draw a fresh salt. Every envelope gets its own.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> EnvelopeResult<Self> {
        let mut bytes = [0u8; SALT_SIZE];
        fill_random(rng, &mut bytes)?;
        Ok(Self(bytes))
    }

    pub(crate) fn from_slice(slice: &[u8]) -> Self {
        let mut bytes = [0u8; SALT_SIZE];
        bytes.copy_from_slice(slice);
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_kgk_generation() {
        let mut rng = StdRng::seed_from_u64(7);
        let k1 = Kgk::generate(&mut rng).unwrap();
        let k2 = Kgk::generate(&mut rng).unwrap();
        assert_ne!(k1, k2, "consecutive KGKs must differ");
        assert_ne!(k1.as_bytes(), &[0u8; KGK_SIZE]);
    }

    #[test]
    fn test_debug_is_redacted() {
        let kgk = Kgk::from_bytes([0x41u8; KGK_SIZE]);
        let printed = format!("{kgk:?}");
        assert!(printed.contains("REDACTED"));
        assert!(!printed.contains("65"), "raw byte values must not appear");

        let key = AesKey::from_bytes([0x41u8; AES_KEY_SIZE]);
        assert!(format!("{key:?}").contains("REDACTED"));
    }

    #[test]
    fn test_zeroize_clears_bytes() {
        let mut iv = Iv::from_bytes([0xAAu8; AES_BLOCK_SIZE]);
        iv.zeroize();
        assert_eq!(iv.as_bytes(), &[0u8; AES_BLOCK_SIZE]);
    }

    #[test]
    fn test_salts_are_fresh() {
        let mut rng = StdRng::seed_from_u64(1);
        let s1 = Salt::generate(&mut rng).unwrap();
        let s2 = Salt::generate(&mut rng).unwrap();
        assert_ne!(s1, s2);
    }
}
