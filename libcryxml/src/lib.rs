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

mod defs;
pub mod error;
pub mod reader;
pub mod serialize;
pub mod tree;

pub use error::{Error, Result};
pub use reader::{parse, Builder};
pub use serialize::to_xml_string;
pub use tree::{TreeBuilder, XmlNode};

/// Parses `data` straight into an owned [`XmlNode`] tree, for callers who
/// don't want to provide their own [`Builder`].
pub fn parse_to_tree(data: &[u8]) -> Result<XmlNode> {
    let mut builder = TreeBuilder::new();
    parse(data, &mut builder)?;
    builder.into_root().ok_or_else(|| Error::malformed("document had no root element"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_to_tree_returns_the_decoded_root() {
        let root = parse_to_tree(b"<a b=\"c\">d</a>").unwrap();
        assert_eq!(root.tag, "a");
        assert_eq!(root.attribute("b"), Some("c"));
        assert_eq!(root.text_content(), "d");
    }
}
