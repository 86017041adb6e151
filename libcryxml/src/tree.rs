//! A generic, owned XML tree and a [`Builder`] that assembles one.
//!
//! This is the "abstract tree" the module-level docs promise callers: no
//! CryXmlB-specific or quick-xml-specific type leaks out of [`crate::parse`]
//! past this point. Anything a caller wants to do with the decoded document
//! — search it, convert it, re-serialise it — works against [`XmlNode`].

use crate::reader::Builder;

/// One element: its tag, its attributes in the order they were emitted,
/// its children in document order, and any inline text segments.
///
/// Text is kept as separate segments rather than concatenated eagerly
/// because a node can interleave text and child elements (`<a>x<b/>y</a>`);
/// [`XmlNode::text_content`] joins them back together for callers who don't
/// care about that interleaving.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlNode {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
    pub text: Vec<String>,
}

impl XmlNode {
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// All inline text segments joined with no separator, the shape a
    /// caller asking "what does this element say" usually wants.
    #[must_use]
    pub fn text_content(&self) -> String {
        self.text.concat()
    }
}

/// Builds an [`XmlNode`] tree out of the `start_element`/`text`/`end_element`
/// event stream [`crate::parse`] emits, using an explicit stack rather than
/// recursion so it has no dependency on the decoder's own call depth.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    stack: Vec<XmlNode>,
    root: Option<XmlNode>,
}

impl TreeBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the builder and returns the completed tree, or `None` if
    /// the document had no root element (an empty `start`/`end` pair never
    /// arrived).
    #[must_use]
    pub fn into_root(self) -> Option<XmlNode> {
        self.root
    }
}

impl Builder for TreeBuilder {
    fn start_element(&mut self, tag: &str, attrs: &[(&str, &str)]) {
        self.stack.push(XmlNode {
            tag: tag.to_string(),
            attributes: attrs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect(),
            children: Vec::new(),
            text: Vec::new(),
        });
    }

    fn end_element(&mut self, _tag: &str) {
        let Some(node) = self.stack.pop() else { return };
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.root = Some(node),
        }
    }

    fn text(&mut self, chars: &str) {
        if let Some(node) = self.stack.last_mut() {
            node.text.push(chars.to_string());
        }
    }
}
