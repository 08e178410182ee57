//! Scene collaborator interface
//!
//! The codec never touches a 3D editor's native objects. A Scene Builder
//! consumes the shapes produced here after decode; a Scene Reader fills a
//! [`MeshSource`] (one entry per face-corner "loop", not per shared vertex)
//! for the encoder. Everything in between stays inside the codec.

use glam::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::formats::drawable::skin::{self, Influence};
use crate::formats::drawable::vertex::{Vertex, VertexLayout, VertexSemantic};
use crate::formats::drawable::{Geometry, IndexBuffer, VertexBuffer};

/// Per-geometry data handed to a Scene Builder after decode: an ordered,
/// attribute-complete vertex list, the triangle list indexing it, and each
/// vertex's rebuilt skinning influences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshData {
    pub shader_index: u32,
    pub positions: Vec<Vec3>,
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<[u32; 3]>,
    /// Influence list per vertex; empty for unskinned geometry.
    pub influences: Vec<Vec<Influence>>,
}

impl MeshData {
    /// Extracts builder-ready mesh data from a decoded geometry.
    ///
    /// Fails with [`Error::MissingAttribute`] if any vertex lacks a
    /// position; every other attribute is optional at this boundary.
    pub fn from_geometry(geometry: &Geometry) -> Result<Self> {
        let mut positions = Vec::with_capacity(geometry.vertex_buffer.len());
        let mut influences = Vec::with_capacity(geometry.vertex_buffer.len());
        for vertex in &geometry.vertex_buffer.vertices {
            positions.push(vertex.position.ok_or(Error::MissingAttribute {
                semantic: VertexSemantic::Position.name(),
            })?);
            influences.push(match (&vertex.blend_weights, &vertex.blend_indices) {
                (Some(weights), Some(indices)) => skin::influences_from_vertex(weights, indices),
                _ => Vec::new(),
            });
        }
        Ok(MeshData {
            shader_index: geometry.shader_index,
            positions,
            vertices: geometry.vertex_buffer.vertices.clone(),
            triangles: geometry.index_buffer.triangles.clone(),
            influences,
        })
    }
}

/// Loop-granularity mesh attributes a Scene Reader supplies for export.
///
/// Arrays are parallel to `positions`; channels the target layout does not
/// demand may be left empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshSource {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub colours0: Vec<[f32; 4]>,
    pub colours1: Vec<[f32; 4]>,
    pub texcoords: Vec<Vec<Vec2>>,
    pub tangents: Vec<Vec4>,
    /// Influences per vertex in scene-iteration order; rows may be empty.
    pub influences: Vec<Vec<Influence>>,
    pub triangles: Vec<[u32; 3]>,
}

impl MeshSource {
    fn attribute<'a, T>(
        &self,
        array: &'a [T],
        semantic: VertexSemantic,
        index: usize,
    ) -> Result<&'a T> {
        if array.is_empty() {
            return Err(Error::MissingAttribute {
                semantic: semantic.name(),
            });
        }
        if array.len() != self.positions.len() {
            return Err(Error::AttributeLength {
                semantic: semantic.name(),
                expected: self.positions.len(),
                found: array.len(),
            });
        }
        Ok(&array[index])
    }
}

/// Assembles layout-complete vertices from scene-side attribute arrays,
/// quantizing skin weights when the layout demands them.
pub fn build_vertices(
    source: &MeshSource,
    layout: &VertexLayout,
    bone_count: usize,
) -> Result<Vec<Vertex>> {
    let mut vertices = Vec::with_capacity(source.positions.len());
    let empty_row: Vec<Influence> = Vec::new();

    for (i, position) in source.positions.iter().enumerate() {
        let mut vertex = Vertex::default();
        for &semantic in layout.semantics() {
            match semantic {
                VertexSemantic::Position => vertex.position = Some(*position),
                VertexSemantic::Normal => {
                    vertex.normal = Some(*source.attribute(&source.normals, semantic, i)?);
                }
                VertexSemantic::Colour0 => {
                    vertex.colour0 = Some(*source.attribute(&source.colours0, semantic, i)?);
                }
                VertexSemantic::Colour1 => {
                    vertex.colour1 = Some(*source.attribute(&source.colours1, semantic, i)?);
                }
                VertexSemantic::Tangent => {
                    vertex.tangent = Some(*source.attribute(&source.tangents, semantic, i)?);
                }
                VertexSemantic::BlendWeights | VertexSemantic::BlendIndices => {
                    let row = source.influences.get(i).unwrap_or(&empty_row);
                    let (weights, indices) = skin::quantize_weights(row, bone_count);
                    vertex.blend_weights = Some(weights.map(|w| w as f32 / 255.0));
                    vertex.blend_indices = Some(indices);
                }
                _ => {
                    let channel = semantic.texcoord_channel().unwrap_or_default();
                    let uvs = source
                        .texcoords
                        .get(channel)
                        .map(Vec::as_slice)
                        .unwrap_or_default();
                    vertex.texcoords[channel] = Some(*source.attribute(uvs, semantic, i)?);
                }
            }
        }
        vertices.push(vertex);
    }
    debug_assert!(vertices.len() == source.positions.len());
    Ok(vertices)
}

/// Builds a complete geometry from scene data: vertices per the shader's
/// layout, triangles, and a bounding box from the positions.
pub fn build_geometry(
    source: &MeshSource,
    shader_index: u32,
    layout: &VertexLayout,
    bone_count: usize,
) -> Result<Geometry> {
    let vertices = build_vertices(source, layout, bone_count)?;

    let mut min = Vec3::splat(f32::MAX);
    let mut max = Vec3::splat(f32::MIN);
    for position in &source.positions {
        min = min.min(*position);
        max = max.max(*position);
    }
    if source.positions.is_empty() {
        min = Vec3::ZERO;
        max = Vec3::ZERO;
    }

    let bone_ids = if bone_count > 0 && layout.contains(VertexSemantic::BlendWeights) {
        (0..bone_count as u32).collect()
    } else {
        Vec::new()
    };

    Ok(Geometry {
        shader_index,
        bounding_box_min: min,
        bounding_box_max: max,
        vertex_buffer: VertexBuffer {
            flags: 0,
            layout: layout.clone(),
            vertices,
        },
        index_buffer: IndexBuffer {
            triangles: source.triangles.clone(),
        },
        bone_ids,
    })
}
