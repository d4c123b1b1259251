use thiserror::Error;

pub type EnvelopeResult<T> = Result<T, EnvelopeError>;

#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The leading byte is not a format this build understands.
    #[error("unsupported envelope format flag 0x{found:02x}")]
    FormatMismatch { found: u8 },

    #[error("envelope too short: {len} bytes (minimum {min})")]
    MalformedEnvelope { len: usize, min: usize },

    /// Wrong password, wrong salt, bad padding, failed tag, or a payload that
    /// does not decompress. Carries no detail.
    #[error("cannot open envelope: wrong password or corrupted data")]
    PaddingInvalid,

    #[error("input length {len} is not a multiple of the AES block size")]
    UnalignedInput { len: usize },

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("entropy source failure: {0}")]
    Entropy(String),

    #[error("compression failed: {0}")]
    Compression(String),
}

impl EnvelopeError {
    /// True for every failure that means "this password cannot open this blob".
    pub fn is_open_failure(&self) -> bool {
        matches!(
            self,
            Self::FormatMismatch { .. } | Self::MalformedEnvelope { .. } | Self::PaddingInvalid
        )
    }
}
