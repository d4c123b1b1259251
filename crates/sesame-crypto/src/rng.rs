//! Random byte source for salts, IVs and KGKs
//!
//! Callers inject the generator. Production code passes `rand::rngs::OsRng`,
//! which reads the operating system CSPRNG on every call and is safe to use
//! from any number of threads. If the OS source fails we return an error;
//! there is no fallback to a deterministic generator.

use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use crate::error::{EnvelopeError, EnvelopeResult};

/// Fill `buf` with uniformly distributed random bytes.
pub fn fill_random<R: RngCore + CryptoRng>(rng: &mut R, buf: &mut [u8]) -> EnvelopeResult<()> {
    rng.try_fill_bytes(buf)
        .map_err(|e| EnvelopeError::Entropy(e.to_string()))
}

/// Return `n` random bytes.
pub fn random_bytes<R: RngCore + CryptoRng>(
    rng: &mut R,
    n: usize,
) -> EnvelopeResult<Zeroizing<Vec<u8>>> {
    let mut buf = Zeroizing::new(vec![0u8; n]);
    fill_random(rng, &mut buf)?;
    Ok(buf)
}
