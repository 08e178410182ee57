//! Shader-name to vertex-layout table
//!
//! Exporting a geometry requires knowing which vertex layout its shader
//! expects. That mapping lives in a shader definitions document loaded once
//! per export session; the table is immutable afterwards and passed to the
//! encoder explicitly rather than held as process-wide state.

use std::borrow::Cow;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::shader::Shader;
use super::vertex::VertexLayout;
use crate::error::{Error, Result};
use crate::formats::xml::{XmlNode, parse_xml};

/// Read-only mapping from shader preset filename to vertex layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutTable {
    layouts: IndexMap<String, VertexLayout>,
}

impl LayoutTable {
    /// Parses a shader definitions document:
    /// `<Shaders><Item><Name>…</Name><Layout>…</Layout></Item>…</Shaders>`.
    pub fn parse(content: &str) -> Result<Self> {
        Self::from_node(&parse_xml(content)?)
    }

    /// Builds the table from a parsed definitions tree.
    pub fn from_node(node: &XmlNode) -> Result<Self> {
        let mut layouts = IndexMap::new();
        for item in &node.children {
            let name = item
                .child_text("Name")
                .ok_or_else(|| Error::MissingField {
                    element: item.name.clone(),
                    field: "Name".to_string(),
                })?
                .to_string();
            let layout = match item.child("Layout") {
                Some(layout) => VertexLayout::from_node(layout)?,
                None => continue,
            };
            layouts.insert(name, layout);
        }
        tracing::debug!("loaded {} shader layouts", layouts.len());
        Ok(LayoutTable { layouts })
    }

    /// Registers one layout; table construction only.
    pub fn insert(&mut self, name: impl Into<String>, layout: VertexLayout) {
        self.layouts.insert(name.into(), layout);
    }

    /// Looks up the layout for a scene-side shader name. The name is
    /// normalized first so renamed duplicates (`foo.sps.001`) still resolve.
    #[must_use]
    pub fn get(&self, shader_name: &str) -> Option<&VertexLayout> {
        self.layouts.get(normalize_shader_name(shader_name).as_ref())
    }

    /// Resolves a shader's layout through its preset filename, failing with
    /// [`Error::UnresolvedReference`] on a miss.
    pub fn layout_for(&self, shader: &Shader) -> Result<&VertexLayout> {
        let filename = shader.filename_or_default();
        self.get(filename).ok_or_else(|| Error::UnresolvedReference {
            kind: "shader layout",
            reference: filename.to_string(),
        })
    }

    /// Number of known shaders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}

/// Strips the `.NNN` suffix scene editors append to renamed duplicates:
/// a three-part dotted name keeps only its first two parts.
#[must_use]
pub fn normalize_shader_name(name: &str) -> Cow<'_, str> {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() == 3 {
        Cow::Owned(format!("{}.{}", parts[0], parts[1]))
    } else {
        Cow::Borrowed(name)
    }
}
