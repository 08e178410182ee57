//! Vertex layout engine
//!
//! A geometry's vertex records are flat text lines whose field order is only
//! known from the shader's layout. Fields are joined with three spaces;
//! the scalar components inside a field with single spaces.

use glam::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::formats::xml::{XmlNode, format_float, parse_f32, parse_u32};

/// Delimiter between vertex record fields.
pub const FIELD_DELIMITER: &str = "   ";

/// Number of texture-coordinate channels a vertex can carry.
pub const TEXCOORD_CHANNELS: usize = 8;

/// A named per-vertex attribute semantic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexSemantic {
    Position,
    BlendWeights,
    BlendIndices,
    Normal,
    Colour0,
    Colour1,
    TexCoord0,
    TexCoord1,
    TexCoord2,
    TexCoord3,
    TexCoord4,
    TexCoord5,
    TexCoord6,
    TexCoord7,
    Tangent,
}

impl VertexSemantic {
    /// Resolves a layout element name to a semantic.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "Position" => Self::Position,
            "BlendWeights" => Self::BlendWeights,
            "BlendIndices" => Self::BlendIndices,
            "Normal" => Self::Normal,
            "Colour0" => Self::Colour0,
            "Colour1" => Self::Colour1,
            "TexCoord0" => Self::TexCoord0,
            "TexCoord1" => Self::TexCoord1,
            "TexCoord2" => Self::TexCoord2,
            "TexCoord3" => Self::TexCoord3,
            "TexCoord4" => Self::TexCoord4,
            "TexCoord5" => Self::TexCoord5,
            "TexCoord6" => Self::TexCoord6,
            "TexCoord7" => Self::TexCoord7,
            "Tangent" => Self::Tangent,
            _ => return None,
        })
    }

    /// The element name used in `Layout` blocks.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Position => "Position",
            Self::BlendWeights => "BlendWeights",
            Self::BlendIndices => "BlendIndices",
            Self::Normal => "Normal",
            Self::Colour0 => "Colour0",
            Self::Colour1 => "Colour1",
            Self::TexCoord0 => "TexCoord0",
            Self::TexCoord1 => "TexCoord1",
            Self::TexCoord2 => "TexCoord2",
            Self::TexCoord3 => "TexCoord3",
            Self::TexCoord4 => "TexCoord4",
            Self::TexCoord5 => "TexCoord5",
            Self::TexCoord6 => "TexCoord6",
            Self::TexCoord7 => "TexCoord7",
            Self::Tangent => "Tangent",
        }
    }

    /// Texture-coordinate channel number, if this is a `TexCoordN` semantic.
    #[must_use]
    pub fn texcoord_channel(self) -> Option<usize> {
        match self {
            Self::TexCoord0 => Some(0),
            Self::TexCoord1 => Some(1),
            Self::TexCoord2 => Some(2),
            Self::TexCoord3 => Some(3),
            Self::TexCoord4 => Some(4),
            Self::TexCoord5 => Some(5),
            Self::TexCoord6 => Some(6),
            Self::TexCoord7 => Some(7),
            _ => None,
        }
    }
}

/// An ordered, duplicate-free sequence of vertex semantics.
///
/// The order is the on-disk field order of every record in the owning
/// geometry, and the set is exactly the attributes each vertex must carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexLayout {
    semantics: Vec<VertexSemantic>,
}

impl VertexLayout {
    /// Builds a layout, rejecting duplicate semantics.
    pub fn new(semantics: Vec<VertexSemantic>) -> Result<Self> {
        for (i, semantic) in semantics.iter().enumerate() {
            if semantics[..i].contains(semantic) {
                return Err(Error::DuplicateSemantic {
                    name: semantic.name().to_string(),
                });
            }
        }
        Ok(VertexLayout { semantics })
    }

    /// Decodes a `Layout` element: one child per semantic, in field order.
    pub fn from_node(node: &XmlNode) -> Result<Self> {
        let semantics = node
            .children
            .iter()
            .map(|child| {
                VertexSemantic::from_name(&child.name).ok_or_else(|| Error::UnknownSemantic {
                    name: child.name.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        VertexLayout::new(semantics)
    }

    /// Encodes this layout back to its `Layout` element.
    #[must_use]
    pub fn to_node(&self) -> XmlNode {
        let mut node = XmlNode::new("Layout");
        node.set_attr("type", "GTAV1");
        for semantic in &self.semantics {
            node.push(XmlNode::new(semantic.name()));
        }
        node
    }

    /// The semantics in field order.
    #[must_use]
    pub fn semantics(&self) -> &[VertexSemantic] {
        &self.semantics
    }

    /// Number of fields per record.
    #[must_use]
    pub fn len(&self) -> usize {
        self.semantics.len()
    }

    /// Whether the layout has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.semantics.is_empty()
    }

    /// Whether the layout demands the given semantic.
    #[must_use]
    pub fn contains(&self, semantic: VertexSemantic) -> bool {
        self.semantics.contains(&semantic)
    }
}

/// One decoded vertex. Populated attributes match the owning layout exactly.
///
/// Colors and blend weights live in memory as 0-1 fractions; the byte
/// domain only exists in the text form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub position: Option<Vec3>,
    pub normal: Option<Vec3>,
    pub colour0: Option<[f32; 4]>,
    pub colour1: Option<[f32; 4]>,
    pub texcoords: [Option<Vec2>; TEXCOORD_CHANNELS],
    pub tangent: Option<Vec4>,
    pub blend_weights: Option<[f32; 4]>,
    pub blend_indices: Option<[u32; 4]>,
}

/// Decodes one record into a vertex, dispatching each field by layout tag.
pub fn decode(layout: &VertexLayout, record: &str) -> Result<Vertex> {
    let tokens: Vec<&str> = record.split(FIELD_DELIMITER).collect();
    if tokens.len() != layout.len() {
        return Err(Error::LayoutMismatch {
            expected: layout.len(),
            found: tokens.len(),
        });
    }

    let mut vertex = Vertex::default();
    for (&semantic, token) in layout.semantics().iter().zip(&tokens) {
        match semantic {
            VertexSemantic::Position => {
                vertex.position = Some(Vec3::from_array(floats::<3>(semantic, token)?));
            }
            VertexSemantic::Normal => {
                vertex.normal = Some(Vec3::from_array(floats::<3>(semantic, token)?));
            }
            VertexSemantic::Colour0 => vertex.colour0 = Some(colour(semantic, token)?),
            VertexSemantic::Colour1 => vertex.colour1 = Some(colour(semantic, token)?),
            VertexSemantic::Tangent => {
                vertex.tangent = Some(Vec4::from_array(floats::<4>(semantic, token)?));
            }
            VertexSemantic::BlendWeights => {
                let bytes = floats::<4>(semantic, token)?;
                vertex.blend_weights = Some(bytes.map(|b| b / 255.0));
            }
            VertexSemantic::BlendIndices => vertex.blend_indices = Some(ints(semantic, token)?),
            _ => {
                let channel = semantic.texcoord_channel().unwrap_or_default();
                vertex.texcoords[channel] = Some(Vec2::from_array(floats::<2>(semantic, token)?));
            }
        }
    }
    Ok(vertex)
}

/// Encodes a vertex back to one record in layout field order.
///
/// Fails with [`Error::MissingAttribute`] if the vertex lacks an attribute
/// the layout requires.
pub fn encode(layout: &VertexLayout, vertex: &Vertex) -> Result<String> {
    let mut fields = Vec::with_capacity(layout.len());
    for &semantic in layout.semantics() {
        let field = match semantic {
            VertexSemantic::Position => format_vec3(require(vertex.position, semantic)?),
            VertexSemantic::Normal => format_vec3(require(vertex.normal, semantic)?),
            VertexSemantic::Colour0 => format_colour(require(vertex.colour0, semantic)?),
            VertexSemantic::Colour1 => format_colour(require(vertex.colour1, semantic)?),
            VertexSemantic::Tangent => format_vec4(require(vertex.tangent, semantic)?),
            VertexSemantic::BlendWeights => {
                let weights = require(vertex.blend_weights, semantic)?;
                join(weights.iter().map(|w| quantize_byte(*w).to_string()))
            }
            VertexSemantic::BlendIndices => {
                let indices = require(vertex.blend_indices, semantic)?;
                join(indices.iter().map(ToString::to_string))
            }
            _ => {
                let channel = semantic.texcoord_channel().unwrap_or_default();
                format_vec2(require(vertex.texcoords[channel], semantic)?)
            }
        };
        fields.push(field);
    }
    Ok(fields.join(FIELD_DELIMITER))
}

fn require<T>(value: Option<T>, semantic: VertexSemantic) -> Result<T> {
    value.ok_or(Error::MissingAttribute {
        semantic: semantic.name(),
    })
}

fn floats<const N: usize>(semantic: VertexSemantic, token: &str) -> Result<[f32; N]> {
    let parts: Vec<&str> = token.split_whitespace().collect();
    if parts.len() != N {
        return Err(Error::ComponentCount {
            semantic: semantic.name(),
            expected: N,
            found: parts.len(),
        });
    }
    let mut out = [0.0f32; N];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = parse_f32(part)?;
    }
    Ok(out)
}

fn ints(semantic: VertexSemantic, token: &str) -> Result<[u32; 4]> {
    let parts: Vec<&str> = token.split_whitespace().collect();
    if parts.len() != 4 {
        return Err(Error::ComponentCount {
            semantic: semantic.name(),
            expected: 4,
            found: parts.len(),
        });
    }
    let mut out = [0u32; 4];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = parse_u32(part)?;
    }
    Ok(out)
}

fn colour(semantic: VertexSemantic, token: &str) -> Result<[f32; 4]> {
    let bytes = floats::<4>(semantic, token)?;
    Ok(bytes.map(|b| b / 255.0))
}

fn quantize_byte(fraction: f32) -> u32 {
    (fraction * 255.0).round().clamp(0.0, 255.0) as u32
}

fn format_vec2(v: Vec2) -> String {
    format!("{} {}", format_float(v.x), format_float(v.y))
}

fn format_vec3(v: Vec3) -> String {
    format!(
        "{} {} {}",
        format_float(v.x),
        format_float(v.y),
        format_float(v.z)
    )
}

fn format_vec4(v: Vec4) -> String {
    format!(
        "{} {} {} {}",
        format_float(v.x),
        format_float(v.y),
        format_float(v.z),
        format_float(v.w)
    )
}

fn format_colour(c: [f32; 4]) -> String {
    join(c.iter().map(|v| quantize_byte(*v).to_string()))
}

fn join(parts: impl Iterator<Item = String>) -> String {
    parts.collect::<Vec<_>>().join(" ")
}
