use std::str::Utf8Error;

/// Errors shared by every byte-view reader: mapping a file, bounding a
/// subslice, and resolving a NUL-terminated string out of a string pool.
///
/// The DCB, P4K, and CryXmlB decoders each define their own `Error` type
/// with a variant that wraps this one, since they need additional kinds
/// (`SchemaError`, `BadSignature`, ...) that don't belong at this layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected end of data at offset {offset} (needed {needed} bytes, {available} available)")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("offset {offset} + length {len} is out of bounds for a region of {bound} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        bound: usize,
    },

    #[error("no NUL terminator found for string starting at offset {offset} before end of pool")]
    InvalidString { offset: usize },

    #[error("invalid UTF-8 in string at offset {offset}: {source}")]
    InvalidUtf8 {
        offset: usize,
        #[source]
        source: Utf8Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
