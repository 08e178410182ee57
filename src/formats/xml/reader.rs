//! XML reading into an owned [`XmlNode`] tree

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::fs;
use std::path::Path;

use super::document::XmlNode;
use crate::error::{Error, Result};

/// Read an XML file from disk.
///
/// # Errors
/// Returns an error if the file cannot be read or has invalid XML.
pub fn read_xml<P: AsRef<Path>>(path: P) -> Result<XmlNode> {
    let content = fs::read_to_string(path)?;
    parse_xml(&content)
}

/// Parse an XML string into its root element.
///
/// # Errors
/// Returns an error if the XML is malformed or has no root element.
pub fn parse_xml(content: &str) -> Result<XmlNode> {
    let mut reader = Reader::from_str(content);

    let mut buf = Vec::new();
    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                stack.push(node_from_start(&e)?);
            }
            Ok(Event::Empty(e)) => {
                let node = node_from_start(&e)?;
                attach(&mut stack, &mut root, node);
            }
            Ok(Event::End(_)) => {
                if let Some(completed) = stack.pop() {
                    attach(&mut stack, &mut root, completed);
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(top) = stack.last_mut() {
                    let text = e.unescape()?;
                    let text = text.trim();
                    if !text.is_empty() {
                        if !top.text.is_empty() {
                            top.text.push('\n');
                        }
                        top.text.push_str(text);
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(top) = stack.last_mut() {
                    let text = String::from_utf8_lossy(&e);
                    let text = text.trim();
                    if !text.is_empty() {
                        if !top.text.is_empty() {
                            top.text.push('\n');
                        }
                        top.text.push_str(text);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    root.ok_or_else(|| Error::MissingField {
        element: "document".to_string(),
        field: "root element".to_string(),
    })
}

fn node_from_start(e: &BytesStart<'_>) -> Result<XmlNode> {
    let mut node = XmlNode::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
    for attr in e.attributes() {
        let attr = attr?;
        node.attributes.push((
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            String::from_utf8_lossy(&attr.value).into_owned(),
        ));
    }
    Ok(node)
}

fn attach(stack: &mut [XmlNode], root: &mut Option<XmlNode>, node: XmlNode) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    } else if root.is_none() {
        *root = Some(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_tree() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<Drawable>
  <Name>prop_test</Name>
  <LodDistHigh value="450" />
  <Translation x="1" y="2" z="3" />
</Drawable>"#;
        let root = parse_xml(xml).unwrap();
        assert_eq!(root.name, "Drawable");
        assert_eq!(root.children.len(), 3);
        assert_eq!(root.child_text("Name"), Some("prop_test"));
        assert_eq!(root.child("LodDistHigh").unwrap().f32_value().unwrap(), 450.0);
        assert_eq!(
            root.child("Translation").unwrap().vec3().unwrap(),
            glam::Vec3::new(1.0, 2.0, 3.0)
        );
    }

    #[test]
    fn test_multiline_text_preserved() {
        let xml = "<Data>\n  0 0 0   0 0 1\n  1 0 0   0 0 1\n</Data>";
        let root = parse_xml(xml).unwrap();
        // Inner newlines survive, per-line indentation is the consumer's concern.
        assert!(root.text.contains('\n'));
        assert!(root.text.starts_with("0 0 0"));
    }

    #[test]
    fn test_no_root_is_error() {
        assert!(parse_xml("   ").is_err());
    }

    #[test]
    fn test_entity_unescape() {
        let root = parse_xml("<Name>a&amp;b</Name>").unwrap();
        assert_eq!(root.text, "a&b");
    }
}
