use thiserror::Error;

/// Errors produced while loading a DataCore container or decoding one of its
/// structure instances.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Common(#[from] libcommon::Error),

    #[error(transparent)]
    Binrw(#[from] binrw::Error),

    #[error("malformed schema: {0}")]
    Schema(String),

    #[error("cyclic inheritance chain starting at structure {0}")]
    SchemaCycle(u32),

    #[error("while decoding record {name:?} at offset {offset}: {source}")]
    Record {
        name: String,
        offset: usize,
        #[source]
        source: Box<Error>,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    #[must_use]
    pub fn schema(msg: impl Into<String>) -> Self {
        Error::Schema(msg.into())
    }

    /// Wraps `self` with the name and byte offset of the record being
    /// decoded when the error surfaced, per the propagation policy: callers
    /// always see which record failed.
    #[must_use]
    pub fn in_record(self, name: impl Into<String>, offset: usize) -> Self {
        Error::Record {
            name: name.into(),
            offset,
            source: Box::new(self),
        }
    }
}
