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

mod error;
pub mod io;
pub mod mapping;
pub mod strings;

pub use error::{Error, Result};
pub use io::*;
pub use mapping::{ByteView, Cursor, Mapping, OwnedMapping};
pub use strings::string_at;
