use thiserror::Error;

/// Errors produced while decoding a CryXmlB container or its plain-XML
/// fallback.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Common(#[from] libcommon::Error),

    /// Neither the `CryXmlB` signature nor a plain-XML `<` lead byte was
    /// found.
    #[error("not a CryXmlB or plain XML file")]
    BadSignature,

    #[error("malformed CryXmlB container: {0}")]
    Malformed(String),

    #[error("plain-XML fallback parse failed: {0}")]
    Xml(#[from] quick_xml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    #[must_use]
    pub fn malformed(msg: impl Into<String>) -> Self {
        Error::Malformed(msg.into())
    }
}
