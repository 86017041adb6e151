//! The tokenised-CryXmlB and plain-XML-fallback decoders, unified behind
//! a single [`parse`] entry point and a pluggable [`Builder`].

use binrw::BinRead;
use libcommon::{string_at, ByteView};

use crate::defs::{Attribute, ChildIndex, Header, Node, NO_PARENT};
use crate::error::{Error, Result};

/// Receives decode events in document order, the same shape whether the
/// source was a tokenised CryXmlB container or a plain-text XML fallback.
/// Modelled on `xml.etree.ElementTree`'s `TreeBuilder` target protocol.
pub trait Builder {
    fn start_element(&mut self, tag: &str, attrs: &[(&str, &str)]);
    fn end_element(&mut self, tag: &str);
    fn text(&mut self, chars: &str);
}

/// Decodes `data` through `builder`. Detects format from the leading
/// bytes: `CryXmlB\0` or `CryXmlB` selects the tokenised decoder; a leading
/// `<` falls back to a plain-XML parse through the same builder; anything
/// else is [`Error::BadSignature`].
pub fn parse(data: &[u8], builder: &mut impl Builder) -> Result<()> {
    if is_cryxmlb(data) {
        decode_tokenized(data, builder)
    } else if data.first() == Some(&b'<') {
        decode_plain_xml(data, builder)
    } else {
        Err(Error::BadSignature)
    }
}

fn is_cryxmlb(data: &[u8]) -> bool {
    data.get(0..8) == Some(b"CryXmlB\0".as_slice()) || data.get(0..7) == Some(b"CryXmlB".as_slice())
}

fn decode_tokenized(data: &[u8], builder: &mut impl Builder) -> Result<()> {
    if data.len() < Header::SIZE {
        return Err(Error::malformed("file is smaller than a CryXmlB header"));
    }
    let view = ByteView::new(data);
    let mut header_cursor = binrw::io::Cursor::new(data);
    let header = Header::read(&mut header_cursor)?;

    let nodes = read_table::<Node>(view, header.node_table_offset as usize, header.node_count as usize)?;
    let child_indices =
        read_table::<ChildIndex>(view, header.child_table_offset as usize, header.child_table_count as usize)?;
    let attributes =
        read_table::<Attribute>(view, header.attributes_table_offset as usize, header.attributes_count as usize)?;
    let strings = view.subslice(header.string_data_offset as usize, header.string_data_size as usize)?;

    let root = nodes
        .first()
        .ok_or_else(|| Error::malformed("CryXmlB file declares zero nodes"))?;
    if root.parent_index != NO_PARENT {
        return Err(Error::malformed("root node (index 0) must have no parent"));
    }

    let mut visited = vec![false; nodes.len()];
    walk(0, &nodes, &child_indices, &attributes, strings, builder, &mut visited)
}

fn read_table<T>(view: ByteView<'_>, offset: usize, count: usize) -> Result<Vec<T>>
where
    T: for<'r> BinRead<Args<'r> = ()>,
{
    let mut cursor = binrw::io::Cursor::new(view.as_slice());
    cursor.set_position(offset as u64);
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        items.push(T::read(&mut cursor)?);
    }
    Ok(items)
}

fn walk(
    index: usize,
    nodes: &[Node],
    child_indices: &[ChildIndex],
    attributes: &[Attribute],
    strings: ByteView<'_>,
    builder: &mut impl Builder,
    visited: &mut [bool],
) -> Result<()> {
    let node = nodes
        .get(index)
        .ok_or_else(|| Error::malformed(format!("node index {index} out of range")))?;

    let already_visited = visited
        .get_mut(index)
        .ok_or_else(|| Error::malformed(format!("node index {index} out of range")))?;
    if *already_visited {
        return Err(Error::malformed(format!("node {index} is reachable from more than one parent")));
    }
    *already_visited = true;

    let tag = string_at(strings, node.tag_string_offset as usize)?;

    let mut attrs = Vec::with_capacity(node.attribute_count as usize);
    for i in node.first_attribute_index..node.first_attribute_index + u32::from(node.attribute_count) {
        let attribute = attributes
            .get(i as usize)
            .ok_or_else(|| Error::malformed(format!("attribute index {i} out of range")))?;
        let key = string_at(strings, attribute.key_string_offset as usize)?;
        let value = string_at(strings, attribute.value_string_offset as usize)?;
        attrs.push((key, value));
    }
    builder.start_element(tag, &attrs);

    let content = string_at(strings, node.content_string_offset as usize)?;
    if !content.is_empty() {
        builder.text(content);
    }

    for i in node.first_child_index..node.first_child_index + u32::from(node.child_count) {
        let child = child_indices
            .get(i as usize)
            .ok_or_else(|| Error::malformed(format!("child table index {i} out of range")))?;
        walk(child.index as usize, nodes, child_indices, attributes, strings, builder, visited)?;
    }

    builder.end_element(tag);
    Ok(())
}

fn decode_plain_xml(data: &[u8], builder: &mut impl Builder) -> Result<()> {
    let mut reader = quick_xml::Reader::from_reader(data);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut attr_buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            quick_xml::events::Event::Start(start) => {
                let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                attr_buf.clear();
                collect_attrs(&start, &mut attr_buf)?;
                let attrs: Vec<(&str, &str)> = attr_buf.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
                builder.start_element(&tag, &attrs);
            }
            quick_xml::events::Event::Empty(start) => {
                let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                attr_buf.clear();
                collect_attrs(&start, &mut attr_buf)?;
                let attrs: Vec<(&str, &str)> = attr_buf.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
                builder.start_element(&tag, &attrs);
                builder.end_element(&tag);
            }
            quick_xml::events::Event::End(end) => {
                let tag = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                builder.end_element(&tag);
            }
            quick_xml::events::Event::Text(text) => {
                let unescaped = text.unescape()?;
                if !unescaped.is_empty() {
                    builder.text(&unescaped);
                }
            }
            quick_xml::events::Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

fn collect_attrs(start: &quick_xml::events::BytesStart<'_>, out: &mut Vec<(String, String)>) -> Result<()> {
    for attr in start.attributes() {
        let attr = attr.map_err(|err| Error::malformed(format!("bad attribute: {err}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| Error::malformed(format!("bad attribute value: {err}")))?
            .into_owned();
        out.push((key, value));
    }
    Ok(())
}
