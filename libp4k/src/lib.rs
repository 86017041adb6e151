// https://github.com/rust-lang/cargo/issues/5034
#![warn(clippy::pedantic)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::map_err_ignore,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate
)]
#![warn(rust_2018_idioms)]

//! A P4K archive is a ZIP-dialect container: its own local header magic, its
//! own compression id for Zstandard, and AES-CBC encryption on entries the
//! central directory flags as such. [`archive::P4kArchive::load`] parses the
//! central directory once; [`archive::P4kArchive::open_entry`] decrypts and
//! decompresses one entry at a time, sequentially.

mod archive;
mod crypto;
mod decompress;
mod entry;
pub mod error;
mod zip;

pub use archive::{CancelSignal, ExtractSummary, NeverCancel, P4kArchive, P4kEntryReader};
pub use crypto::DEFAULT_KEY;
pub use entry::P4kEntry;
pub use error::{Error, Result};
