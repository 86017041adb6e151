use thiserror::Error;

/// Errors produced while parsing a P4K archive's central directory or
/// reading one of its entries.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Common(#[from] libcommon::Error),

    #[error(transparent)]
    Binrw(#[from] binrw::Error),

    #[error("not a ZIP/P4K archive: end of central directory record not found")]
    BadSignature,

    #[error("bad local file header at offset {offset}: {reason}")]
    BadLocalHeader { offset: u64, reason: String },

    #[error("archive is truncated: {0}")]
    Truncated(String),

    #[error("unsupported local/central header flag: {0}")]
    UnsupportedFlag(String),

    #[error("unsupported compression method {0}")]
    UnsupportedCompression(u16),

    #[error("AES-CBC decryption failed: {0}")]
    Decrypt(String),

    #[error("decompression failed: {0}")]
    Decompress(String),

    #[error("no entry named {0:?}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    #[must_use]
    pub fn truncated(msg: impl Into<String>) -> Self {
        Error::Truncated(msg.into())
    }

    #[must_use]
    pub fn unsupported_flag(msg: impl Into<String>) -> Self {
        Error::UnsupportedFlag(msg.into())
    }

    #[must_use]
    pub fn decrypt(msg: impl Into<String>) -> Self {
        Error::Decrypt(msg.into())
    }

    #[must_use]
    pub fn decompress(msg: impl Into<String>) -> Self {
        Error::Decompress(msg.into())
    }
}
