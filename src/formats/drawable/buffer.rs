//! Vertex and index buffer codec
//!
//! Vertex records are newline-separated; line order is the vertex index
//! space referenced by the index buffer and by blend indices. Index data is
//! whitespace-separated and regrouped into triangles.

use serde::{Deserialize, Serialize};

use super::vertex::{self, Vertex, VertexLayout};
use crate::error::{Error, Result};
use crate::formats::xml::{XmlNode, parse_u32};

/// A geometry's vertex block: flags, layout, and decoded vertices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexBuffer {
    pub flags: u32,
    pub layout: VertexLayout,
    pub vertices: Vec<Vertex>,
}

impl VertexBuffer {
    /// Decodes a `VertexBuffer` element.
    pub fn from_node(node: &XmlNode) -> Result<Self> {
        let flags = match node.child("Flags") {
            Some(flags) => flags.u32_value()?,
            None => 0,
        };
        let layout = VertexLayout::from_node(node.req_child("Layout")?)?;

        let data = node
            .child("Data")
            .or_else(|| node.child("Data2"))
            .map(|d| d.text.as_str())
            .unwrap_or_default();
        let vertices = decode_vertex_buffer(&layout, data)?;

        Ok(VertexBuffer {
            flags,
            layout,
            vertices,
        })
    }

    /// Encodes this buffer back to its `VertexBuffer` element.
    pub fn to_node(&self) -> Result<XmlNode> {
        let mut node = XmlNode::new("VertexBuffer");
        node.push(XmlNode::with_value("Flags", self.flags));
        node.push(self.layout.to_node());
        node.push(XmlNode::with_text(
            "Data",
            encode_vertex_buffer(&self.layout, &self.vertices)?,
        ));
        Ok(node)
    }

    /// Number of vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Whether the buffer holds no vertices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// A geometry's triangle list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexBuffer {
    pub triangles: Vec<[u32; 3]>,
}

impl IndexBuffer {
    /// Decodes an `IndexBuffer` element.
    pub fn from_node(node: &XmlNode) -> Result<Self> {
        let data = node
            .child("Data")
            .map(|d| d.text.as_str())
            .unwrap_or_default();
        Ok(IndexBuffer {
            triangles: decode_index_buffer(data)?,
        })
    }

    /// Encodes this buffer back to its `IndexBuffer` element.
    #[must_use]
    pub fn to_node(&self) -> XmlNode {
        XmlNode::new("IndexBuffer").with_child(XmlNode::with_text(
            "Data",
            encode_index_buffer(&self.triangles),
        ))
    }

    /// Number of triangles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    /// Whether the buffer holds no triangles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}

/// Decodes a newline-separated vertex blob, preserving line order.
pub fn decode_vertex_buffer(layout: &VertexLayout, blob: &str) -> Result<Vec<Vertex>> {
    blob.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| vertex::decode(layout, line))
        .collect()
}

/// Encodes vertices back to a newline-separated blob in list order.
pub fn encode_vertex_buffer(layout: &VertexLayout, vertices: &[Vertex]) -> Result<String> {
    let records = vertices
        .iter()
        .map(|v| vertex::encode(layout, v))
        .collect::<Result<Vec<_>>>()?;
    Ok(records.join("\n"))
}

/// Decodes a whitespace-separated index blob into triangles.
///
/// A total index count that is not a multiple of 3 is a hard error; the
/// buffer cannot describe whole triangles.
pub fn decode_index_buffer(blob: &str) -> Result<Vec<[u32; 3]>> {
    let indices = blob
        .split_whitespace()
        .map(parse_u32)
        .collect::<Result<Vec<_>>>()?;
    if indices.len() % 3 != 0 {
        return Err(Error::TriangleAlignment {
            count: indices.len(),
        });
    }
    Ok(indices
        .chunks_exact(3)
        .map(|t| [t[0], t[1], t[2]])
        .collect())
}

/// Flattens triangles back to a single-space-separated blob.
#[must_use]
pub fn encode_index_buffer(triangles: &[[u32; 3]]) -> String {
    let mut parts = Vec::with_capacity(triangles.len() * 3);
    for triangle in triangles {
        for index in triangle {
            parts.push(index.to_string());
        }
    }
    parts.join(" ")
}
