//! Skeleton decoding/encoding and bind-pose composition
//!
//! Bones are stored flat in file order; that order is the index space the
//! rest of the resource references, and parents always precede children.
//! Sibling links are not authoritative data: they are recomputed from the
//! hierarchy on encode.

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::formats::xml::XmlNode;

/// A named marker on a bone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoneFlag {
    RotX,
    RotY,
    RotZ,
    LimitRotation,
    TransX,
    TransY,
    TransZ,
    LimitTranslation,
    ScaleX,
    ScaleY,
    ScaleZ,
    LimitScale,
    Invisible,
    /// Set on every bone with at least one child.
    Unk0,
}

const BONE_FLAGS: [(BoneFlag, &str); 14] = [
    (BoneFlag::RotX, "RotX"),
    (BoneFlag::RotY, "RotY"),
    (BoneFlag::RotZ, "RotZ"),
    (BoneFlag::LimitRotation, "LimitRotation"),
    (BoneFlag::TransX, "TransX"),
    (BoneFlag::TransY, "TransY"),
    (BoneFlag::TransZ, "TransZ"),
    (BoneFlag::LimitTranslation, "LimitTranslation"),
    (BoneFlag::ScaleX, "ScaleX"),
    (BoneFlag::ScaleY, "ScaleY"),
    (BoneFlag::ScaleZ, "ScaleZ"),
    (BoneFlag::LimitScale, "LimitScale"),
    (BoneFlag::Invisible, "Invisible"),
    (BoneFlag::Unk0, "Unk0"),
];

impl BoneFlag {
    fn bit(self) -> u16 {
        1 << BONE_FLAGS.iter().position(|(f, _)| *f == self).unwrap_or(0)
    }

    /// The token used in the bone's `Flags` list.
    #[must_use]
    pub fn name(self) -> &'static str {
        BONE_FLAGS
            .iter()
            .find(|(f, _)| *f == self)
            .map_or("", |(_, n)| *n)
    }
}

/// Fixed-vocabulary bone flag set.
///
/// Tokens outside the vocabulary are dropped with a warning; the format's
/// consumers only understand the known markers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoneFlags {
    bits: u16,
}

impl BoneFlags {
    /// The empty flag set.
    #[must_use]
    pub fn empty() -> Self {
        BoneFlags::default()
    }

    /// Parses a comma-space-delimited flag list.
    #[must_use]
    pub fn from_list(raw: &str) -> Self {
        let mut flags = BoneFlags::default();
        for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match BONE_FLAGS.iter().find(|(_, name)| *name == token) {
                Some((flag, _)) => flags.set(*flag),
                None => tracing::warn!("dropping unknown bone flag token: {token}"),
            }
        }
        flags
    }

    /// Sets a flag.
    pub fn set(&mut self, flag: BoneFlag) {
        self.bits |= flag.bit();
    }

    /// Clears a flag.
    pub fn clear(&mut self, flag: BoneFlag) {
        self.bits &= !flag.bit();
    }

    /// Whether a flag is set.
    #[must_use]
    pub fn contains(self, flag: BoneFlag) -> bool {
        self.bits & flag.bit() != 0
    }

    /// Whether no flag is set.
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.bits == 0
    }

    /// Returns this set with the given flag added.
    #[must_use]
    pub fn with(mut self, flag: BoneFlag) -> Self {
        self.set(flag);
        self
    }
}

impl std::fmt::Display for BoneFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (flag, name) in &BONE_FLAGS {
            if self.contains(*flag) {
                if !first {
                    f.write_str(", ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// One bone in a skeleton.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bone {
    pub name: String,
    /// Stable identifier independent of list position; joints and fragment
    /// children cross-reference bones by tag.
    pub tag: u32,
    /// Position in the flattened bone list.
    pub index: i32,
    /// -1 for a root bone.
    pub parent_index: i32,
    /// Next bone sharing this bone's parent, -1 if none. Recomputed on encode.
    pub sibling_index: i32,
    pub flags: BoneFlags,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    /// Opaque quaternion carried through unchanged.
    pub transform_unk: Quat,
}

impl Default for Bone {
    fn default() -> Self {
        Bone {
            name: String::new(),
            tag: 0,
            index: 0,
            parent_index: -1,
            sibling_index: -1,
            flags: BoneFlags::default(),
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            transform_unk: Quat::IDENTITY,
        }
    }
}

impl Bone {
    /// Decodes one bone `Item` element.
    pub fn from_node(node: &XmlNode) -> Result<Self> {
        let name = node
            .child_text("Name")
            .ok_or_else(|| Error::MissingField {
                element: node.name.clone(),
                field: "Name".to_string(),
            })?
            .to_string();

        let flags = node
            .child_text("Flags")
            .map(BoneFlags::from_list)
            .unwrap_or_default();

        // A TRS element may be absent entirely (defaults apply), but a
        // present element with a missing axis attribute is a hard error.
        let translation = match node.child("Translation") {
            Some(t) => t.vec3()?,
            None => Vec3::ZERO,
        };
        let rotation = match node.child("Rotation") {
            Some(r) => r.quat()?,
            None => Quat::IDENTITY,
        };
        let scale = match node.child("Scale") {
            Some(s) => s.vec3()?,
            None => Vec3::ONE,
        };
        let transform_unk = match node.child("TransformUnk") {
            Some(t) => t.quat()?,
            None => Quat::IDENTITY,
        };

        Ok(Bone {
            name,
            tag: node.req_child("Tag")?.u32_value()?,
            index: node.req_child("Index")?.i32_value()?,
            parent_index: node.req_child("ParentIndex")?.i32_value()?,
            sibling_index: node.req_child("SiblingIndex")?.i32_value()?,
            flags,
            translation,
            rotation,
            scale,
            transform_unk,
        })
    }

    /// Encodes one bone `Item` element with the given computed links.
    #[must_use]
    pub fn to_node(&self, sibling_index: i32, flags: BoneFlags) -> XmlNode {
        let mut node = XmlNode::new("Item");
        node.push(XmlNode::with_text("Name", self.name.clone()));
        node.push(XmlNode::with_value("Tag", self.tag));
        node.push(XmlNode::with_value("Index", self.index));
        node.push(XmlNode::with_value("ParentIndex", self.parent_index));
        node.push(XmlNode::with_value("SiblingIndex", sibling_index));
        node.push(XmlNode::with_text("Flags", flags.to_string()));
        node.push(XmlNode::with_vec3("Translation", self.translation));
        node.push(XmlNode::with_quat("Rotation", self.rotation));
        node.push(XmlNode::with_vec3("Scale", self.scale));
        node.push(XmlNode::with_quat("TransformUnk", self.transform_unk));
        node
    }

    /// The bone's local-to-parent matrix: scale, then rotate, then translate.
    #[must_use]
    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// An ordered bone hierarchy plus four opaque versioning words.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Skeleton {
    pub unknown_1c: u32,
    pub unknown_50: u32,
    pub unknown_54: u32,
    pub unknown_58: u32,
    pub bones: Vec<Bone>,
}

impl Skeleton {
    /// Builds a skeleton around an existing bone list, validating the
    /// hierarchy.
    pub fn new(bones: Vec<Bone>) -> Result<Self> {
        let skeleton = Skeleton {
            bones,
            ..Skeleton::default()
        };
        skeleton.validate()?;
        Ok(skeleton)
    }

    /// Decodes a `Skeleton` element.
    pub fn from_node(node: &XmlNode) -> Result<Self> {
        let bones = node
            .req_child("Bones")?
            .children
            .iter()
            .map(Bone::from_node)
            .collect::<Result<Vec<_>>>()?;

        let skeleton = Skeleton {
            unknown_1c: node.req_child("Unknown1C")?.u32_value()?,
            unknown_50: node.req_child("Unknown50")?.u32_value()?,
            unknown_54: node.req_child("Unknown54")?.u32_value()?,
            unknown_58: node.req_child("Unknown58")?.u32_value()?,
            bones,
        };
        skeleton.validate()?;
        tracing::debug!("decoded skeleton with {} bones", skeleton.bones.len());
        Ok(skeleton)
    }

    /// Encodes this skeleton back to its `Skeleton` element.
    ///
    /// Sibling indices are recomputed from the hierarchy, and every bone
    /// with children gains the `Unk0` marker.
    #[must_use]
    pub fn to_node(&self) -> XmlNode {
        let mut bones_node = XmlNode::new("Bones");
        for (i, bone) in self.bones.iter().enumerate() {
            let mut flags = bone.flags;
            if self.has_children(i) {
                flags.set(BoneFlag::Unk0);
            }
            bones_node.push(bone.to_node(self.sibling_index(i), flags));
        }

        XmlNode::new("Skeleton")
            .with_child(XmlNode::with_value("Unknown1C", self.unknown_1c))
            .with_child(XmlNode::with_value("Unknown50", self.unknown_50))
            .with_child(XmlNode::with_value("Unknown54", self.unknown_54))
            .with_child(XmlNode::with_value("Unknown58", self.unknown_58))
            .with_child(bones_node)
    }

    /// The next bone sharing bone `i`'s parent, -1 if `i` is the last or
    /// only child (roots have no siblings).
    #[must_use]
    pub fn sibling_index(&self, i: usize) -> i32 {
        let parent = match self.bones.get(i) {
            Some(bone) if bone.parent_index >= 0 => bone.parent_index,
            _ => return -1,
        };
        let mut found_self = false;
        for (j, bone) in self.bones.iter().enumerate() {
            if bone.parent_index != parent {
                continue;
            }
            if found_self {
                return j as i32;
            }
            if j == i {
                found_self = true;
            }
        }
        -1
    }

    /// Whether bone `i` has at least one child.
    #[must_use]
    pub fn has_children(&self, i: usize) -> bool {
        self.bones.iter().any(|b| b.parent_index == i as i32)
    }

    /// Finds a bone by its stable tag.
    #[must_use]
    pub fn bone_by_tag(&self, tag: u32) -> Option<&Bone> {
        self.bones.iter().find(|b| b.tag == tag)
    }

    /// Composes each bone's bind-pose world matrix along the hierarchy.
    ///
    /// Valid because parents precede children in the list.
    #[must_use]
    pub fn bind_pose(&self) -> Vec<Mat4> {
        let mut world: Vec<Mat4> = Vec::with_capacity(self.bones.len());
        for bone in &self.bones {
            let local = bone.local_matrix();
            let matrix = if bone.parent_index >= 0 {
                world[bone.parent_index as usize] * local
            } else {
                local
            };
            world.push(matrix);
        }
        world
    }

    fn validate(&self) -> Result<()> {
        let mut roots = 0usize;
        for (i, bone) in self.bones.iter().enumerate() {
            if bone.index != i as i32 {
                return Err(Error::UnresolvedReference {
                    kind: "bone index",
                    reference: format!("bone '{}' has index {} at position {i}", bone.name, bone.index),
                });
            }
            if bone.parent_index == -1 {
                roots += 1;
            } else if bone.parent_index < 0 || bone.parent_index >= i as i32 {
                return Err(Error::UnresolvedReference {
                    kind: "bone parent",
                    reference: format!(
                        "bone '{}' at {i} has parent index {}",
                        bone.name, bone.parent_index
                    ),
                });
            }
        }
        if roots != 1 && !self.bones.is_empty() {
            return Err(Error::UnresolvedReference {
                kind: "bone parent",
                reference: format!("skeleton has {roots} root bones"),
            });
        }
        Ok(())
    }
}

/// A rotation-limit constraint on a bone, keyed by tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    /// Tag of the constrained bone.
    pub tag: u32,
    /// Opaque word carried through unchanged.
    pub unknown_a: u32,
    pub min: Vec3,
    pub max: Vec3,
}

impl Joint {
    /// Decodes one `RotationLimits` `Item` element.
    pub fn from_node(node: &XmlNode) -> Result<Self> {
        let unknown_a = match node.child("UnknownA") {
            Some(u) => u.u32_value()?,
            None => 0,
        };
        Ok(Joint {
            tag: node.req_child("BoneId")?.u32_value()?,
            unknown_a,
            min: node.req_child("Min")?.vec3()?,
            max: node.req_child("Max")?.vec3()?,
        })
    }

    /// Encodes this joint back to its `Item` element.
    #[must_use]
    pub fn to_node(&self) -> XmlNode {
        XmlNode::new("Item")
            .with_child(XmlNode::with_value("BoneId", self.tag))
            .with_child(XmlNode::with_value("UnknownA", self.unknown_a))
            .with_child(XmlNode::with_vec3("Min", self.min))
            .with_child(XmlNode::with_vec3("Max", self.max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bone(name: &str, index: i32, parent: i32, translation: Vec3) -> Bone {
        Bone {
            name: name.to_string(),
            tag: 1000 + index as u32,
            index,
            parent_index: parent,
            translation,
            ..Bone::default()
        }
    }

    fn chain() -> Skeleton {
        Skeleton::new(vec![
            bone("root", 0, -1, Vec3::ZERO),
            bone("child", 1, 0, Vec3::new(0.0, 1.0, 0.0)),
            bone("grandchild", 2, 1, Vec3::new(0.0, 1.0, 0.0)),
        ])
        .unwrap()
    }

    #[test]
    fn test_bind_pose_composition() {
        let world = chain().bind_pose();
        let grandchild = world[2].w_axis.truncate();
        assert!((grandchild - Vec3::new(0.0, 2.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_sibling_indices() {
        let skeleton = Skeleton::new(vec![
            bone("root", 0, -1, Vec3::ZERO),
            bone("a", 1, 0, Vec3::ZERO),
            bone("b", 2, 0, Vec3::ZERO),
            bone("c", 3, 0, Vec3::ZERO),
        ])
        .unwrap();
        assert_eq!(skeleton.sibling_index(0), -1);
        assert_eq!(skeleton.sibling_index(1), 2);
        assert_eq!(skeleton.sibling_index(2), 3);
        assert_eq!(skeleton.sibling_index(3), -1);
    }

    #[test]
    fn test_unk0_accumulated_on_encode() {
        let node = chain().to_node();
        let items = &node.child("Bones").unwrap().children;
        assert_eq!(items[0].child_text("Flags"), Some("Unk0"));
        assert_eq!(items[1].child_text("Flags"), Some("Unk0"));
        // Leaf bone keeps an empty flag list.
        assert_eq!(items[2].child_text("Flags"), None);
    }

    #[test]
    fn test_parent_must_precede_child() {
        let err = Skeleton::new(vec![
            bone("root", 0, -1, Vec3::ZERO),
            bone("bad", 1, 1, Vec3::ZERO),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::UnresolvedReference { kind: "bone parent", .. }));
    }

    #[test]
    fn test_exactly_one_root() {
        let err = Skeleton::new(vec![
            bone("a", 0, -1, Vec3::ZERO),
            bone("b", 1, -1, Vec3::ZERO),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::UnresolvedReference { .. }));
    }

    #[test]
    fn test_flags_unknown_token_dropped() {
        let flags = BoneFlags::from_list("LimitRotation, Wobble, Unk0");
        assert!(flags.contains(BoneFlag::LimitRotation));
        assert!(flags.contains(BoneFlag::Unk0));
        assert_eq!(flags.to_string(), "LimitRotation, Unk0");
    }

    #[test]
    fn test_bone_node_round_trip() {
        let original = Bone {
            name: "spine_01".to_string(),
            tag: 23553,
            index: 4,
            parent_index: 3,
            sibling_index: -1,
            flags: BoneFlags::empty().with(BoneFlag::LimitRotation),
            translation: Vec3::new(0.0, 0.125, -0.5),
            rotation: Quat::from_xyzw(0.0, 0.7071068, 0.0, 0.7071068),
            scale: Vec3::ONE,
            transform_unk: Quat::from_xyzw(0.0, 4.0, -3.0, 0.0),
        };
        let node = original.to_node(original.sibling_index, original.flags);
        let decoded = Bone::from_node(&node).unwrap();
        assert_eq!(decoded, original);
    }
}
