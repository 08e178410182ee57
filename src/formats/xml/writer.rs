//! XML writing from an [`XmlNode`] tree

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::fs;
use std::path::Path;

use super::document::XmlNode;
use crate::error::Result;

/// Write an XML tree to disk.
///
/// # Errors
/// Returns an error if serialization or file writing fails.
pub fn write_xml<P: AsRef<Path>>(root: &XmlNode, path: P) -> Result<()> {
    let xml = serialize_xml(root)?;
    fs::write(path, xml)?;
    Ok(())
}

/// Serialize an XML tree to text with a declaration and 2-space indentation.
///
/// # Errors
/// Returns an error if XML serialization fails.
pub fn serialize_xml(root: &XmlNode) -> Result<String> {
    let mut output = Vec::new();
    let mut writer = Writer::new_with_indent(&mut output, b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write_node(&mut writer, root)?;

    let xml = String::from_utf8(output)?;
    Ok(xml)
}

fn write_node<W: std::io::Write>(writer: &mut Writer<W>, node: &XmlNode) -> Result<()> {
    let mut start = BytesStart::new(node.name.as_str());
    for (key, value) in &node.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if node.text.is_empty() && node.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;

    if !node.text.is_empty() {
        writer.write_event(Event::Text(BytesText::new(&node.text)))?;
    }

    for child in &node.children {
        write_node(writer, child)?;
    }

    writer.write_event(Event::End(BytesEnd::new(node.name.as_str())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::reader::parse_xml;
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_serialize_parse_round_trip() {
        let root = XmlNode::new("Drawable")
            .with_child(XmlNode::with_text("Name", "prop_test"))
            .with_child(XmlNode::with_value("LodDistHigh", "450"))
            .with_child(XmlNode::with_vec3(
                "BoundingBoxMin",
                Vec3::new(-1.0, -2.0, -3.5),
            ));

        let xml = serialize_xml(&root).unwrap();
        let reparsed = parse_xml(&xml).unwrap();
        assert_eq!(reparsed, root);
    }

    #[test]
    fn test_empty_element_is_self_closing() {
        let xml = serialize_xml(&XmlNode::new("Position")).unwrap();
        assert!(xml.contains("<Position/>"));
    }

    #[test]
    fn test_text_is_escaped() {
        let xml = serialize_xml(&XmlNode::with_text("Name", "a&b")).unwrap();
        assert!(xml.contains("a&amp;b"));
        assert_eq!(parse_xml(&xml).unwrap().text, "a&b");
    }
}
