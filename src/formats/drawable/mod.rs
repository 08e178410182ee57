//! Drawable resource model: geometry, LOD buckets, skeleton, shaders.
//!
//! A drawable is one renderable model definition. Decoding produces an
//! owned tree; encoding mirrors it back to the XML text form the game's
//! tooling consumes.

pub mod buffer;
pub mod layouts;
pub mod shader;
pub mod skeleton;
pub mod skin;
pub mod vertex;

use std::fs;
use std::path::Path;

use glam::Vec3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::formats::xml::{self, XmlNode, format_float};

pub use buffer::{IndexBuffer, VertexBuffer};
pub use layouts::{LayoutTable, normalize_shader_name};
pub use shader::{
    Shader, ShaderGroup, ShaderParameter, Texture, TextureDictionary, TextureFormat, TextureUsage,
    TextureUsageFlags,
};
pub use skeleton::{Bone, BoneFlag, BoneFlags, Joint, Skeleton};
pub use skin::{Influence, influences_from_vertex, quantize_weights};
pub use vertex::{Vertex, VertexLayout, VertexSemantic};

/// One of the four detail levels a drawable can carry models for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LodLevel {
    High,
    Medium,
    Low,
    VeryLow,
}

impl LodLevel {
    /// All levels, bucket order.
    pub const ALL: [LodLevel; 4] = [
        LodLevel::High,
        LodLevel::Medium,
        LodLevel::Low,
        LodLevel::VeryLow,
    ];

    /// The bucket's element name.
    #[must_use]
    pub fn models_element(self) -> &'static str {
        match self {
            LodLevel::High => "DrawableModelsHigh",
            LodLevel::Medium => "DrawableModelsMed",
            LodLevel::Low => "DrawableModelsLow",
            LodLevel::VeryLow => "DrawableModelsVlow",
        }
    }

    /// The bucket's LOD distance element name.
    #[must_use]
    pub fn distance_element(self) -> &'static str {
        match self {
            LodLevel::High => "LodDistHigh",
            LodLevel::Medium => "LodDistMed",
            LodLevel::Low => "LodDistLow",
            LodLevel::VeryLow => "LodDistVlow",
        }
    }

    /// The bucket's flags element name.
    #[must_use]
    pub fn flags_element(self) -> &'static str {
        match self {
            LodLevel::High => "FlagsHigh",
            LodLevel::Medium => "FlagsMed",
            LodLevel::Low => "FlagsLow",
            LodLevel::VeryLow => "FlagsVlow",
        }
    }
}

/// One mesh part bound to a single shader, with its own buffers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Index into the owning drawable's shader list.
    pub shader_index: u32,
    pub bounding_box_min: Vec3,
    pub bounding_box_max: Vec3,
    pub vertex_buffer: VertexBuffer,
    pub index_buffer: IndexBuffer,
    /// Bone list positions, used only by skinned geometry whose model has
    /// no owning skeleton.
    pub bone_ids: Vec<u32>,
}

impl Geometry {
    /// Decodes one geometry `Item` element.
    pub fn from_node(node: &XmlNode) -> Result<Self> {
        let bone_ids = match node.child_text("BoneIDs") {
            Some(raw) => raw
                .split(',')
                .map(xml::parse_u32)
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };
        Ok(Geometry {
            shader_index: node.req_child("ShaderIndex")?.u32_value()?,
            bounding_box_min: node.req_child("BoundingBoxMin")?.vec3()?,
            bounding_box_max: node.req_child("BoundingBoxMax")?.vec3()?,
            vertex_buffer: VertexBuffer::from_node(node.req_child("VertexBuffer")?)?,
            index_buffer: IndexBuffer::from_node(node.req_child("IndexBuffer")?)?,
            bone_ids,
        })
    }

    /// Encodes this geometry back to its `Item` element.
    pub fn to_node(&self) -> Result<XmlNode> {
        let mut node = XmlNode::new("Item");
        node.push(XmlNode::with_value("ShaderIndex", self.shader_index));
        node.push(XmlNode::with_vec3("BoundingBoxMin", self.bounding_box_min));
        node.push(XmlNode::with_vec3("BoundingBoxMax", self.bounding_box_max));
        if !self.bone_ids.is_empty() {
            let ids: Vec<String> = self.bone_ids.iter().map(ToString::to_string).collect();
            node.push(XmlNode::with_text("BoneIDs", ids.join(", ")));
        }
        node.push(self.vertex_buffer.to_node()?);
        node.push(self.index_buffer.to_node());
        Ok(node)
    }
}

/// An ordered set of geometries rendered together in one LOD bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawableModel {
    /// Bitmask controlling which render phases see this model.
    pub render_mask: u32,
    pub flags: u32,
    pub has_skin: bool,
    pub bone_index: u32,
    /// Bone count mirror written by the exporter.
    pub unknown_1: u32,
    pub geometries: Vec<Geometry>,
}

impl DrawableModel {
    /// Decodes one model `Item` element. Geometries decode in parallel but
    /// keep file order, which is semantically significant.
    pub fn from_node(node: &XmlNode) -> Result<Self> {
        let render_mask = node.req_child("RenderMask")?.u32_value()?;
        let flags = match node.child("Flags") {
            Some(f) => f.u32_value()?,
            None => 0,
        };
        let has_skin = match node.child("HasSkin") {
            Some(h) => h.u32_value()? != 0,
            None => false,
        };
        let bone_index = match node.child("BoneIndex") {
            Some(b) => b.u32_value()?,
            None => 0,
        };
        let unknown_1 = match node.child("Unknown1") {
            Some(u) => u.u32_value()?,
            None => 0,
        };

        let geometries = node
            .req_child("Geometries")?
            .children
            .par_iter()
            .map(Geometry::from_node)
            .collect::<Result<Vec<_>>>()?;

        Ok(DrawableModel {
            render_mask,
            flags,
            has_skin,
            bone_index,
            unknown_1,
            geometries,
        })
    }

    /// Encodes this model back to its `Item` element.
    pub fn to_node(&self) -> Result<XmlNode> {
        let mut node = XmlNode::new("Item");
        node.push(XmlNode::with_value("RenderMask", self.render_mask));
        node.push(XmlNode::with_value("Flags", self.flags));
        node.push(XmlNode::with_value("HasSkin", u32::from(self.has_skin)));
        node.push(XmlNode::with_value("BoneIndex", self.bone_index));
        node.push(XmlNode::with_value("Unknown1", self.unknown_1));
        let mut geometries = XmlNode::new("Geometries");
        for geometry in &self.geometries {
            geometries.push(geometry.to_node()?);
        }
        node.push(geometries);
        Ok(node)
    }
}

/// One renderable model definition: LOD buckets, materials, optional
/// skeleton, bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drawable {
    pub name: String,
    pub bounding_sphere_center: Vec3,
    pub bounding_sphere_radius: f32,
    pub bounding_box_min: Vec3,
    pub bounding_box_max: Vec3,
    pub lod_dist_high: f32,
    pub lod_dist_med: f32,
    pub lod_dist_low: f32,
    pub lod_dist_vlow: f32,
    pub flags_high: u32,
    pub flags_med: u32,
    pub flags_low: u32,
    pub flags_vlow: u32,
    pub unknown_9a: u32,
    pub shader_group: Option<ShaderGroup>,
    pub skeleton: Option<Skeleton>,
    pub joints: Vec<Joint>,
    pub models_high: Vec<DrawableModel>,
    pub models_med: Vec<DrawableModel>,
    pub models_low: Vec<DrawableModel>,
    pub models_vlow: Vec<DrawableModel>,
    /// Embedded collision composite, carried through verbatim when present.
    pub bounds: Option<XmlNode>,
}

impl Default for Drawable {
    fn default() -> Self {
        Drawable {
            name: "Drawable".to_string(),
            bounding_sphere_center: Vec3::ZERO,
            bounding_sphere_radius: 0.0,
            bounding_box_min: Vec3::ZERO,
            bounding_box_max: Vec3::ZERO,
            lod_dist_high: 0.0,
            lod_dist_med: 0.0,
            lod_dist_low: 0.0,
            lod_dist_vlow: 0.0,
            flags_high: 0,
            flags_med: 0,
            flags_low: 0,
            flags_vlow: 0,
            unknown_9a: 0,
            shader_group: None,
            skeleton: None,
            joints: Vec::new(),
            models_high: Vec::new(),
            models_med: Vec::new(),
            models_low: Vec::new(),
            models_vlow: Vec::new(),
            bounds: None,
        }
    }
}

impl Drawable {
    /// Decodes a drawable element (`Drawable` root, dictionary `Item`, or a
    /// fragment's nested `Drawable`).
    pub fn from_node(node: &XmlNode) -> Result<Self> {
        let mut drawable = Drawable {
            name: node.child_text("Name").unwrap_or("Drawable").to_string(),
            ..Drawable::default()
        };

        // Legacy files spell the medium bucket out in full.
        let bucket_node = |level: LodLevel| {
            node.child(level.models_element()).or_else(|| {
                (level == LodLevel::Medium)
                    .then(|| node.child("DrawableModelsMedium"))
                    .flatten()
            })
        };

        if LodLevel::ALL.iter().all(|&l| bucket_node(l).is_none()) {
            // No LOD bucket at all: an empty drawable, callers decide
            // whether to keep it.
            return Ok(drawable);
        }

        for level in LodLevel::ALL {
            let dist = node
                .child(level.distance_element())
                .ok_or(Error::MissingLodDistances {
                    field: level.distance_element(),
                })?
                .f32_value()?;
            match level {
                LodLevel::High => drawable.lod_dist_high = dist,
                LodLevel::Medium => drawable.lod_dist_med = dist,
                LodLevel::Low => drawable.lod_dist_low = dist,
                LodLevel::VeryLow => drawable.lod_dist_vlow = dist,
            }
        }

        if let Some(center) = node.child("BoundingSphereCenter") {
            drawable.bounding_sphere_center = center.vec3()?;
        }
        if let Some(radius) = node.child("BoundingSphereRadius") {
            drawable.bounding_sphere_radius = radius.f32_value()?;
        }
        if let Some(min) = node.child("BoundingBoxMin") {
            drawable.bounding_box_min = min.vec3()?;
        }
        if let Some(max) = node.child("BoundingBoxMax") {
            drawable.bounding_box_max = max.vec3()?;
        }
        for (slot, level) in [
            (&mut drawable.flags_high, LodLevel::High),
            (&mut drawable.flags_med, LodLevel::Medium),
            (&mut drawable.flags_low, LodLevel::Low),
            (&mut drawable.flags_vlow, LodLevel::VeryLow),
        ] {
            if let Some(flags) = node.child(level.flags_element()) {
                *slot = flags.u32_value()?;
            }
        }
        if let Some(unknown_9a) = node.child("Unknown9A") {
            drawable.unknown_9a = unknown_9a.u32_value()?;
        }

        drawable.shader_group = node
            .child("ShaderGroup")
            .map(ShaderGroup::from_node)
            .transpose()?;
        drawable.skeleton = node
            .child("Skeleton")
            .map(Skeleton::from_node)
            .transpose()?;

        if let Some(joints_node) = node.child("Joints") {
            if let Some(limits) = joints_node.child("RotationLimits") {
                drawable.joints = limits
                    .children
                    .iter()
                    .map(Joint::from_node)
                    .collect::<Result<Vec<_>>>()?;
            }
        }

        for level in LodLevel::ALL {
            if let Some(bucket) = bucket_node(level) {
                let models = bucket
                    .children
                    .iter()
                    .map(DrawableModel::from_node)
                    .collect::<Result<Vec<_>>>()?;
                *drawable.models_mut(level) = models;
            }
        }

        drawable.bounds = node.child("Bounds").cloned();

        drawable.validate()?;
        tracing::debug!(
            "decoded drawable '{}' ({} high models)",
            drawable.name,
            drawable.models_high.len()
        );
        Ok(drawable)
    }

    /// Encodes this drawable under the given root element name
    /// (`Drawable` for .ydr, `Item` inside dictionaries).
    pub fn to_node(&self, root_name: &str) -> Result<XmlNode> {
        let mut node = XmlNode::new(root_name);
        node.push(XmlNode::with_text("Name", self.name.clone()));

        if self.is_empty() {
            return Ok(node);
        }

        node.push(XmlNode::with_vec3(
            "BoundingSphereCenter",
            self.bounding_sphere_center,
        ));
        node.push(XmlNode::with_value(
            "BoundingSphereRadius",
            format_float(self.bounding_sphere_radius),
        ));
        node.push(XmlNode::with_vec3("BoundingBoxMin", self.bounding_box_min));
        node.push(XmlNode::with_vec3("BoundingBoxMax", self.bounding_box_max));
        for (dist, level) in [
            (self.lod_dist_high, LodLevel::High),
            (self.lod_dist_med, LodLevel::Medium),
            (self.lod_dist_low, LodLevel::Low),
            (self.lod_dist_vlow, LodLevel::VeryLow),
        ] {
            node.push(XmlNode::with_value(
                level.distance_element(),
                format_float(dist),
            ));
        }
        for (flags, level) in [
            (self.flags_high, LodLevel::High),
            (self.flags_med, LodLevel::Medium),
            (self.flags_low, LodLevel::Low),
            (self.flags_vlow, LodLevel::VeryLow),
        ] {
            node.push(XmlNode::with_value(level.flags_element(), flags));
        }
        node.push(XmlNode::with_value("Unknown9A", self.unknown_9a));

        if let Some(shader_group) = &self.shader_group {
            node.push(shader_group.to_node());
        }
        if let Some(skeleton) = &self.skeleton {
            node.push(skeleton.to_node());
        }
        if !self.joints.is_empty() {
            let mut limits = XmlNode::new("RotationLimits");
            for joint in &self.joints {
                limits.push(joint.to_node());
            }
            node.push(XmlNode::new("Joints").with_child(limits));
        }

        for level in LodLevel::ALL {
            let models = self.models(level);
            if models.is_empty() {
                continue;
            }
            let mut bucket = XmlNode::new(level.models_element());
            for model in models {
                bucket.push(model.to_node()?);
            }
            node.push(bucket);
        }

        if let Some(bounds) = &self.bounds {
            node.push(bounds.clone());
        }

        Ok(node)
    }

    /// The models in one LOD bucket.
    #[must_use]
    pub fn models(&self, level: LodLevel) -> &[DrawableModel] {
        match level {
            LodLevel::High => &self.models_high,
            LodLevel::Medium => &self.models_med,
            LodLevel::Low => &self.models_low,
            LodLevel::VeryLow => &self.models_vlow,
        }
    }

    /// Mutable access to one LOD bucket.
    pub fn models_mut(&mut self, level: LodLevel) -> &mut Vec<DrawableModel> {
        match level {
            LodLevel::High => &mut self.models_high,
            LodLevel::Medium => &mut self.models_med,
            LodLevel::Low => &mut self.models_low,
            LodLevel::VeryLow => &mut self.models_vlow,
        }
    }

    /// Whether every LOD bucket is empty. Empty drawables are elided from
    /// hierarchy construction by callers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        LodLevel::ALL.iter().all(|&l| self.models(l).is_empty())
    }

    /// This drawable's bones, if it owns a skeleton.
    #[must_use]
    pub fn bones(&self) -> Option<&[Bone]> {
        self.skeleton.as_ref().map(|s| s.bones.as_slice())
    }

    fn validate(&self) -> Result<()> {
        if let Some(shader_group) = &self.shader_group {
            let shader_count = shader_group.shaders.len() as u32;
            for level in LodLevel::ALL {
                for model in self.models(level) {
                    for geometry in &model.geometries {
                        if geometry.shader_index >= shader_count {
                            return Err(Error::UnresolvedReference {
                                kind: "shader index",
                                reference: format!(
                                    "geometry references shader {} of {shader_count}",
                                    geometry.shader_index
                                ),
                            });
                        }
                    }
                }
            }
        }

        match &self.skeleton {
            Some(skeleton) => {
                for joint in &self.joints {
                    if skeleton.bone_by_tag(joint.tag).is_none() {
                        return Err(Error::UnresolvedReference {
                            kind: "joint bone tag",
                            reference: joint.tag.to_string(),
                        });
                    }
                }
            }
            None => {
                if let Some(joint) = self.joints.first() {
                    return Err(Error::UnresolvedReference {
                        kind: "joint bone tag",
                        reference: joint.tag.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// An ordered list of drawables sharing one skeleton.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawableDictionary {
    pub drawables: Vec<Drawable>,
}

impl DrawableDictionary {
    /// Decodes a `DrawableDictionary` element.
    pub fn from_node(node: &XmlNode) -> Result<Self> {
        let drawables = node
            .children
            .iter()
            .map(Drawable::from_node)
            .collect::<Result<Vec<_>>>()?;
        Ok(DrawableDictionary { drawables })
    }

    /// Encodes this dictionary back to its root element.
    pub fn to_node(&self) -> Result<XmlNode> {
        let mut node = XmlNode::new("DrawableDictionary");
        for drawable in &self.drawables {
            node.push(drawable.to_node("Item")?);
        }
        Ok(node)
    }

    /// The member authoritative for bone data: the first one carrying a
    /// skeleton.
    #[must_use]
    pub fn drawable_with_bones(&self) -> Option<&Drawable> {
        self.drawables.iter().find(|d| d.skeleton.is_some())
    }

    /// The skeleton every boneless member's meshes are skinned against.
    /// A member owning its own skeleton uses that in preference.
    #[must_use]
    pub fn bones_override(&self) -> Option<&Skeleton> {
        self.drawable_with_bones()
            .and_then(|d| d.skeleton.as_ref())
    }

    /// Sorts members by the Jenkins hash of their names, the order the game
    /// stores dictionary entries in.
    pub fn sort_by_name_hash(&mut self) {
        self.drawables
            .sort_by_key(|d| crate::utils::jenk_hash(&d.name));
    }
}

/// Read a `.ydr.xml` drawable from disk.
pub fn read_drawable<P: AsRef<Path>>(path: P) -> Result<Drawable> {
    parse_drawable(&fs::read_to_string(path)?)
}

/// Parse a drawable from XML text.
pub fn parse_drawable(content: &str) -> Result<Drawable> {
    Drawable::from_node(&xml::parse_xml(content)?)
}

/// Write a drawable to disk as `.ydr.xml` text.
pub fn write_drawable<P: AsRef<Path>>(drawable: &Drawable, path: P) -> Result<()> {
    fs::write(path, serialize_drawable(drawable)?)?;
    Ok(())
}

/// Serialize a drawable to XML text.
pub fn serialize_drawable(drawable: &Drawable) -> Result<String> {
    xml::serialize_xml(&drawable.to_node("Drawable")?)
}

/// Read a `.ydd.xml` drawable dictionary from disk.
pub fn read_drawable_dictionary<P: AsRef<Path>>(path: P) -> Result<DrawableDictionary> {
    parse_drawable_dictionary(&fs::read_to_string(path)?)
}

/// Parse a drawable dictionary from XML text.
pub fn parse_drawable_dictionary(content: &str) -> Result<DrawableDictionary> {
    DrawableDictionary::from_node(&xml::parse_xml(content)?)
}

/// Write a drawable dictionary to disk as `.ydd.xml` text.
pub fn write_drawable_dictionary<P: AsRef<Path>>(
    dictionary: &DrawableDictionary,
    path: P,
) -> Result<()> {
    fs::write(path, serialize_drawable_dictionary(dictionary)?)?;
    Ok(())
}

/// Serialize a drawable dictionary to XML text.
pub fn serialize_drawable_dictionary(dictionary: &DrawableDictionary) -> Result<String> {
    xml::serialize_xml(&dictionary.to_node()?)
}
