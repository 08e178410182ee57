//! Fragment resources: a physics-decomposed drawable.
//!
//! A fragment overlays a rigid-body group/child tree on a renderable
//! drawable. Children and archetype bounds are associated purely by list
//! position, so the codec pairs each child with its bound in one structure
//! instead of keeping two separately-indexed lists.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::formats::drawable::Drawable;
use crate::formats::xml::{self, XmlNode, format_float};

/// The physics collision-bounds container of a fragment.
///
/// The bound subtrees themselves belong to the collision format, outside
/// this codec; they are carried opaquely and re-encoded verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Archetype {
    pub name: String,
    /// Attributes of the `Bounds` wrapper element (composite type).
    pub bounds_attrs: Vec<(String, String)>,
    /// Whether the bound items sat under a nested `Children` element.
    pub bounds_wrapped: bool,
}

/// One rigid-body partition node. Groups form a tree over the children
/// rows, encoded with first-index/count fields like the bone hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    /// Index of this group's first child row (element `Index`).
    pub first_child_index: u32,
    /// Parent group index (element `ParentIndex`).
    pub parent_index: i32,
    /// Index of this group's first child group (element `UnkByte4C`).
    pub first_group_index: u32,
    /// Number of child rows (element `UnkByte4F`).
    pub child_count: u32,
    /// Number of child groups (element `UnkByte50`).
    pub group_count: u32,
    pub mass: f32,
}

impl Group {
    /// Decodes one group `Item` element.
    pub fn from_node(node: &XmlNode) -> Result<Self> {
        let read_u32 = |name: &str| -> Result<u32> {
            match node.child(name) {
                Some(child) => child.u32_value(),
                None => Ok(0),
            }
        };
        let mass = match node.child("Mass") {
            Some(mass) => mass.f32_value()?,
            None => 0.0,
        };
        let parent_index = match node.child("ParentIndex") {
            Some(parent) => parent.i32_value()?,
            None => 0,
        };
        Ok(Group {
            name: node.child_text("Name").unwrap_or_default().to_string(),
            first_child_index: read_u32("Index")?,
            parent_index,
            first_group_index: read_u32("UnkByte4C")?,
            child_count: read_u32("UnkByte4F")?,
            group_count: read_u32("UnkByte50")?,
            mass,
        })
    }

    /// Encodes this group back to its `Item` element.
    #[must_use]
    pub fn to_node(&self) -> XmlNode {
        XmlNode::new("Item")
            .with_child(XmlNode::with_text("Name", self.name.clone()))
            .with_child(XmlNode::with_value("Index", self.first_child_index))
            .with_child(XmlNode::with_value("ParentIndex", self.parent_index))
            .with_child(XmlNode::with_value("UnkByte4C", self.first_group_index))
            .with_child(XmlNode::with_value("UnkByte4F", self.child_count))
            .with_child(XmlNode::with_value("UnkByte50", self.group_count))
            .with_child(XmlNode::with_value("Mass", format_float(self.mass)))
    }
}

/// One rigid-body child: a group reference, a bone tag, its own nested
/// drawable, and the archetype bound it is paired with positionally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Child {
    /// Index into the fragment's group list.
    pub group_index: u32,
    /// Tag of the bone this child follows.
    pub bone_tag: u32,
    pub drawable: Drawable,
    /// The collision bound at this child's list position, carried verbatim.
    pub bound: XmlNode,
}

impl Child {
    fn from_node(node: &XmlNode, bound: XmlNode) -> Result<Self> {
        let group_index = node.req_child("GroupIndex")?.u32_value()?;
        let bone_tag = match node.child("BoneTag") {
            Some(tag) => tag.u32_value()?,
            None => 0,
        };
        Ok(Child {
            group_index,
            bone_tag,
            drawable: Drawable::from_node(node.req_child("Drawable")?)?,
            bound,
        })
    }

    fn to_node(&self) -> Result<XmlNode> {
        Ok(XmlNode::new("Item")
            .with_child(XmlNode::with_value("GroupIndex", self.group_index))
            .with_child(XmlNode::with_value("BoneTag", self.bone_tag))
            .with_child(self.drawable.to_node("Drawable")?))
    }
}

/// The physics block of a fragment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Physics {
    pub archetype: Archetype,
    pub groups: Vec<Group>,
    pub children: Vec<Child>,
}

/// A physics-decomposed drawable: renderable shell plus group/child tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub name: String,
    pub drawable: Drawable,
    pub physics: Option<Physics>,
}

impl Fragment {
    /// Decodes a `Fragment` root element.
    pub fn from_node(node: &XmlNode) -> Result<Self> {
        let name = node.child_text("Name").unwrap_or("Fragment").to_string();
        let drawable = Drawable::from_node(node.req_child("Drawable")?)?;

        let physics = match node.child("Physics") {
            Some(physics_node) => Some(Self::physics_from_node(
                physics_node.req_child("LOD1")?,
                &drawable,
            )?),
            None => None,
        };

        Ok(Fragment {
            name,
            drawable,
            physics,
        })
    }

    fn physics_from_node(lod_node: &XmlNode, drawable: &Drawable) -> Result<Physics> {
        let archetype_node = lod_node.req_child("Archetype")?;
        let bounds_node = archetype_node.req_child("Bounds")?;
        let (bound_items, bounds_wrapped) = match bounds_node.child("Children") {
            Some(wrapper) => (wrapper.children.clone(), true),
            None => (bounds_node.children.clone(), false),
        };
        let archetype = Archetype {
            name: archetype_node
                .child_text("Name")
                .unwrap_or_default()
                .to_string(),
            bounds_attrs: bounds_node.attributes.clone(),
            bounds_wrapped,
        };

        let groups = match lod_node.child("Groups") {
            Some(groups) => groups
                .children
                .iter()
                .map(Group::from_node)
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        let child_nodes = match lod_node.child("Children") {
            Some(children) => children.children.iter().collect::<Vec<_>>(),
            None => Vec::new(),
        };

        // Bound-to-child association is positional; a count mismatch means
        // the pairing is undefined.
        if child_nodes.len() != bound_items.len() {
            return Err(Error::ChildBoundMismatch {
                children: child_nodes.len(),
                bounds: bound_items.len(),
            });
        }

        let children = child_nodes
            .into_iter()
            .zip(bound_items)
            .map(|(node, bound)| Child::from_node(node, bound))
            .collect::<Result<Vec<_>>>()?;

        for child in &children {
            if child.group_index as usize >= groups.len() {
                return Err(Error::UnresolvedReference {
                    kind: "group index",
                    reference: child.group_index.to_string(),
                });
            }
            if let Some(skeleton) = &drawable.skeleton {
                if skeleton.bone_by_tag(child.bone_tag).is_none() {
                    return Err(Error::UnresolvedReference {
                        kind: "child bone tag",
                        reference: child.bone_tag.to_string(),
                    });
                }
            }
        }

        tracing::debug!(
            "decoded fragment physics: {} groups, {} children",
            groups.len(),
            children.len()
        );
        Ok(Physics {
            archetype,
            groups,
            children,
        })
    }

    /// Encodes this fragment back to its root element.
    pub fn to_node(&self) -> Result<XmlNode> {
        let mut node = XmlNode::new("Fragment");
        node.push(XmlNode::with_text("Name", self.name.clone()));
        node.push(self.drawable.to_node("Drawable")?);

        if let Some(physics) = &self.physics {
            let mut bounds = XmlNode::new("Bounds");
            bounds.attributes = physics.archetype.bounds_attrs.clone();
            let bound_items: Vec<XmlNode> =
                physics.children.iter().map(|c| c.bound.clone()).collect();
            if physics.archetype.bounds_wrapped {
                let mut wrapper = XmlNode::new("Children");
                wrapper.children = bound_items;
                bounds.push(wrapper);
            } else {
                bounds.children = bound_items;
            }

            let archetype = XmlNode::new("Archetype")
                .with_child(XmlNode::with_text("Name", physics.archetype.name.clone()))
                .with_child(bounds);

            let mut groups = XmlNode::new("Groups");
            for group in &physics.groups {
                groups.push(group.to_node());
            }

            let mut children = XmlNode::new("Children");
            for child in &physics.children {
                children.push(child.to_node()?);
            }

            let lod = XmlNode::new("LOD1")
                .with_child(archetype)
                .with_child(groups)
                .with_child(children);
            node.push(XmlNode::new("Physics").with_child(lod));
        }

        Ok(node)
    }
}

/// Read a `.yft.xml` fragment from disk.
pub fn read_fragment<P: AsRef<Path>>(path: P) -> Result<Fragment> {
    parse_fragment(&fs::read_to_string(path)?)
}

/// Parse a fragment from XML text.
pub fn parse_fragment(content: &str) -> Result<Fragment> {
    Fragment::from_node(&xml::parse_xml(content)?)
}

/// Write a fragment to disk as `.yft.xml` text.
pub fn write_fragment<P: AsRef<Path>>(fragment: &Fragment, path: P) -> Result<()> {
    fs::write(path, serialize_fragment(fragment)?)?;
    Ok(())
}

/// Serialize a fragment to XML text.
pub fn serialize_fragment(fragment: &Fragment) -> Result<String> {
    xml::serialize_xml(&fragment.to_node()?)
}
