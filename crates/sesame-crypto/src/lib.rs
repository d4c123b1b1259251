//! sesame-crypto: master-password envelope for the key generation key (KGK)
//!
//! Architecture: double envelope encryption with two PBKDF2 layers
//!
//! Key hierarchy:
//! ```text
//! Master password
//!   └── Outer key + IV (PBKDF2-HMAC-SHA384, 32768 rounds, salt = outer salt)
//!       └── KGK bundle: inner salt ‖ inner IV ‖ KGK (112 bytes, AES-256-CBC, no padding)
//!           └── Blob key (PBKDF2-HMAC-SHA256 over the KGK, 1024 rounds, salt = inner salt)
//!               └── Payload: AES-256-CBC, PKCS#7 padding, optionally zlib-compressed first
//! ```
//!
//! Envelope layout, format 0x01:
//! ```text
//! [1: flag][32: outer salt][112: encrypted KGK bundle][n: encrypted payload]
//! ```
//!
//! Format 0x02 keeps the same derivation and layout but seals both layers with
//! AES-256-GCM, so a wrong password or a flipped bit is detected by the tag.

pub mod aead;
pub mod cipher;
pub mod compress;
pub mod envelope;
pub mod error;
pub mod kdf;
pub mod keys;
pub mod rng;

pub use cipher::{decrypt, encrypt, Padding};
pub use compress::Compression;
pub use envelope::{decode, encode, open, rewrap, seal, FormatVersion, Opened};
pub use error::{EnvelopeError, EnvelopeResult};
pub use kdf::{derive_blob_key, derive_key_and_iv, OuterKey};
pub use keys::{AesKey, Iv, Kgk, Salt};
pub use rng::random_bytes;

/// Size of every salt in bytes
pub const SALT_SIZE: usize = 32;

/// Size of an AES-256 key in bytes
pub const AES_KEY_SIZE: usize = 256 / 8;

/// AES block size, which is also the CBC IV size
pub const AES_BLOCK_SIZE: usize = 16;

/// Size of the key generation key
pub const KGK_SIZE: usize = 64;

/// Size of the KGK bundle: inner salt ‖ inner IV ‖ KGK
pub const CRYPT_DATA_SIZE: usize = SALT_SIZE + AES_BLOCK_SIZE + KGK_SIZE;

/// PBKDF2 rounds for the blob key (input is the high-entropy KGK)
pub const KGK_ITERATIONS: u32 = 1024;

/// PBKDF2 rounds for the master-password key and IV
pub const DOMAIN_ITERATIONS: u32 = 32768;

/// Bytes preceding the payload ciphertext in a format 0x01 envelope
pub const HEADER_SIZE: usize = 1 + SALT_SIZE + CRYPT_DATA_SIZE;

const _: () = assert!(SALT_SIZE + AES_BLOCK_SIZE + KGK_SIZE == CRYPT_DATA_SIZE);
const _: () = assert!(CRYPT_DATA_SIZE % AES_BLOCK_SIZE == 0);
const _: () = assert!(HEADER_SIZE == 145);
