//! Owned XML tree and typed field accessors
//!
//! Drawable XML stores scalars either as a `value` attribute or as element
//! text, and vectors/quaternions as `x`/`y`/`z`/`w` attribute sets. The
//! accessors here encode those per-field conventions once so the resource
//! readers stay declarative.

use glam::{Quat, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An element in a parsed XML document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct XmlNode {
    /// Element name.
    pub name: String,
    /// Attributes in document order.
    pub attributes: Vec<(String, String)>,
    /// Concatenated text content, trimmed.
    pub text: String,
    /// Child elements in document order.
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    /// Creates an empty element.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        XmlNode {
            name: name.into(),
            ..XmlNode::default()
        }
    }

    /// Creates an element carrying only text content.
    #[must_use]
    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        XmlNode {
            name: name.into(),
            text: text.into(),
            ..XmlNode::default()
        }
    }

    /// Creates an element carrying a single `value` attribute.
    #[must_use]
    pub fn with_value(name: impl Into<String>, value: impl ToString) -> Self {
        let mut node = XmlNode::new(name);
        node.set_attr("value", value.to_string());
        node
    }

    /// Creates an element carrying `x`/`y`/`z` attributes.
    #[must_use]
    pub fn with_vec3(name: impl Into<String>, v: Vec3) -> Self {
        let mut node = XmlNode::new(name);
        node.set_attr("x", format_float(v.x));
        node.set_attr("y", format_float(v.y));
        node.set_attr("z", format_float(v.z));
        node
    }

    /// Creates an element carrying `x`/`y`/`z`/`w` attributes.
    #[must_use]
    pub fn with_vec4(name: impl Into<String>, v: Vec4) -> Self {
        let mut node = XmlNode::new(name);
        node.set_attr("x", format_float(v.x));
        node.set_attr("y", format_float(v.y));
        node.set_attr("z", format_float(v.z));
        node.set_attr("w", format_float(v.w));
        node
    }

    /// Creates an element carrying a quaternion as `x`/`y`/`z`/`w` attributes.
    #[must_use]
    pub fn with_quat(name: impl Into<String>, q: Quat) -> Self {
        XmlNode::with_vec4(name, Vec4::new(q.x, q.y, q.z, q.w))
    }

    /// Appends a child element and returns `self` for chaining.
    #[must_use]
    pub fn with_child(mut self, child: XmlNode) -> Self {
        self.children.push(child);
        self
    }

    /// Appends a child element.
    pub fn push(&mut self, child: XmlNode) {
        self.children.push(child);
    }

    /// Sets an attribute, replacing any existing value under the same key.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.attributes.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.attributes.push((key, value));
        }
    }

    /// Looks up an attribute by key.
    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Looks up an attribute, failing with [`Error::MissingField`] if absent.
    pub fn req_attr(&self, key: &str) -> Result<&str> {
        self.attr(key).ok_or_else(|| Error::MissingField {
            element: self.name.clone(),
            field: key.to_string(),
        })
    }

    /// Finds the first child with the given element name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Finds a child, failing with [`Error::MissingField`] if absent.
    pub fn req_child(&self, name: &str) -> Result<&XmlNode> {
        self.child(name).ok_or_else(|| Error::MissingField {
            element: self.name.clone(),
            field: name.to_string(),
        })
    }

    /// Text content of a child element, `None` if the child is absent or empty.
    #[must_use]
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name)
            .map(|c| c.text.as_str())
            .filter(|t| !t.is_empty())
    }

    /// The `value` attribute of this element, falling back to element text.
    #[must_use]
    pub fn value_str(&self) -> Option<&str> {
        self.attr("value")
            .or_else(|| (!self.text.is_empty()).then_some(self.text.as_str()))
    }

    fn req_value(&self) -> Result<&str> {
        self.value_str().ok_or_else(|| Error::MissingField {
            element: self.name.clone(),
            field: "value".to_string(),
        })
    }

    /// Reads this element's scalar as `u32`.
    pub fn u32_value(&self) -> Result<u32> {
        parse_u32(self.req_value()?)
    }

    /// Reads this element's scalar as `i32`.
    pub fn i32_value(&self) -> Result<i32> {
        parse_i32(self.req_value()?)
    }

    /// Reads this element's scalar as `f32`.
    pub fn f32_value(&self) -> Result<f32> {
        parse_f32(self.req_value()?)
    }

    fn axis(&self, key: &str) -> Result<f32> {
        parse_f32(self.req_attr(key)?)
    }

    /// Reads `x`/`y`/`z` attributes as a vector.
    pub fn vec3(&self) -> Result<Vec3> {
        Ok(Vec3::new(self.axis("x")?, self.axis("y")?, self.axis("z")?))
    }

    /// Reads `x`/`y`/`z`/`w` attributes as a vector.
    pub fn vec4(&self) -> Result<Vec4> {
        Ok(Vec4::new(
            self.axis("x")?,
            self.axis("y")?,
            self.axis("z")?,
            self.axis("w")?,
        ))
    }

    /// Reads `x`/`y`/`z`/`w` attributes as a quaternion.
    pub fn quat(&self) -> Result<Quat> {
        Ok(Quat::from_xyzw(
            self.axis("x")?,
            self.axis("y")?,
            self.axis("z")?,
            self.axis("w")?,
        ))
    }
}

/// Parses an unsigned integer field.
pub fn parse_u32(s: &str) -> Result<u32> {
    s.trim().parse().map_err(|_| Error::InvalidInt {
        value: s.to_string(),
    })
}

/// Parses a signed integer field.
pub fn parse_i32(s: &str) -> Result<i32> {
    s.trim().parse().map_err(|_| Error::InvalidInt {
        value: s.to_string(),
    })
}

/// Parses a float field.
pub fn parse_f32(s: &str) -> Result<f32> {
    s.trim().parse().map_err(|_| Error::InvalidFloat {
        value: s.to_string(),
    })
}

/// Formats a float the way the game tooling writes them: up to 7 decimal
/// places with trailing zeros trimmed.
#[must_use]
pub fn format_float(v: f32) -> String {
    let mut s = format!("{v:.7}");
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    if s == "-0" {
        s = "0".to_string();
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(0.0), "0");
        assert_eq!(format_float(1.0), "1");
        assert_eq!(format_float(-0.5), "-0.5");
        assert_eq!(format_float(10.0), "10");
        assert_eq!(format_float(0.25), "0.25");
        assert_eq!(format_float(-0.0), "0");
    }

    #[test]
    fn test_value_accessors() {
        let node = XmlNode::with_value("Tag", 23);
        assert_eq!(node.u32_value().unwrap(), 23);

        let node = XmlNode::with_text("Tag", "42");
        assert_eq!(node.u32_value().unwrap(), 42);

        let node = XmlNode::new("Tag");
        assert!(matches!(
            node.u32_value(),
            Err(Error::MissingField { .. })
        ));
    }

    #[test]
    fn test_vector_round_trip() {
        let v = Vec3::new(1.5, -2.0, 0.0);
        let node = XmlNode::with_vec3("Translation", v);
        assert_eq!(node.vec3().unwrap(), v);

        let q = Quat::from_xyzw(0.0, 0.7071068, 0.0, 0.7071068);
        let node = XmlNode::with_quat("Rotation", q);
        assert_eq!(node.quat().unwrap(), q);
    }

    #[test]
    fn test_missing_axis_is_missing_field() {
        let mut node = XmlNode::new("Scale");
        node.set_attr("x", "1");
        node.set_attr("y", "1");
        let err = node.vec3().unwrap_err();
        assert!(matches!(err, Error::MissingField { field, .. } if field == "z"));
    }
}
