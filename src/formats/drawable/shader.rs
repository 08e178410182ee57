//! Shader, texture, and texture-dictionary resources
//!
//! Shader parameters are dispatched on their `type` attribute exactly once,
//! at parse time, into a tagged variant. Texture usage flags are a fixed
//! 25-token vocabulary decoded by substring containment against the raw
//! string, faithful to how the game tooling reads them.

use glam::Vec4;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::formats::xml::XmlNode;

/// Shader filename assumed when a shader carries none.
pub const DEFAULT_SHADER_FILENAME: &str = "default.sps";

/// One shader parameter, shape decided at parse time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShaderParameter {
    /// A texture reference; the name is the sampler slot.
    Texture {
        name: String,
        texture_name: Option<String>,
    },
    /// A 4-component vector value.
    Vector { name: String, value: Vec4 },
}

impl ShaderParameter {
    /// Decodes one parameter `Item`, dispatching on its `type` attribute.
    ///
    /// `type="Texture"` carries an optional texture-name reference; every
    /// other type is a vector, read from the item's axis attributes or from
    /// a nested `Value` element for the `Array` variant.
    pub fn from_node(node: &XmlNode) -> Result<Self> {
        let name = node.req_attr("name")?.to_string();
        match node.req_attr("type")? {
            "Texture" => Ok(ShaderParameter::Texture {
                name,
                texture_name: node.child_text("Name").map(str::to_string),
            }),
            "Array" => Ok(ShaderParameter::Vector {
                name,
                value: node.req_child("Value")?.vec4()?,
            }),
            _ => Ok(ShaderParameter::Vector {
                name,
                value: node.vec4()?,
            }),
        }
    }

    /// Encodes this parameter back to its `Item` element.
    ///
    /// `Array` parameters re-encode as plain `Vector`, matching the game
    /// tooling's exporter.
    #[must_use]
    pub fn to_node(&self) -> XmlNode {
        match self {
            ShaderParameter::Texture { name, texture_name } => {
                let mut node = XmlNode::new("Item");
                node.set_attr("name", name.clone());
                node.set_attr("type", "Texture");
                if let Some(texture_name) = texture_name {
                    if !texture_name.is_empty() {
                        node.push(XmlNode::with_text("Name", texture_name.clone()));
                    }
                }
                node
            }
            ShaderParameter::Vector { name, value } => {
                let mut node = XmlNode::with_vec4("Item", *value);
                // name/type lead the attribute list like the tooling writes them
                node.attributes.insert(0, ("name".to_string(), name.clone()));
                node.attributes.insert(1, ("type".to_string(), "Vector".to_string()));
                node
            }
        }
    }

    /// The parameter's slot name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            ShaderParameter::Texture { name, .. } | ShaderParameter::Vector { name, .. } => name,
        }
    }
}

/// One shader/material definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Shader {
    pub name: String,
    /// Preset filename (`*.sps`); absent shaders fall back to
    /// [`DEFAULT_SHADER_FILENAME`] for layout lookups.
    pub filename: Option<String>,
    pub render_bucket: u32,
    pub parameters: Vec<ShaderParameter>,
}

impl Shader {
    /// Decodes one shader `Item` element.
    pub fn from_node(node: &XmlNode) -> Result<Self> {
        let render_bucket = match node.child("RenderBucket") {
            Some(rb) => rb.u32_value()?,
            None => 0,
        };
        let parameters = node
            .req_child("Parameters")?
            .children
            .iter()
            .map(ShaderParameter::from_node)
            .collect::<Result<Vec<_>>>()?;

        Ok(Shader {
            name: node.child_text("Name").unwrap_or_default().to_string(),
            filename: node.child_text("FileName").map(str::to_string),
            render_bucket,
            parameters,
        })
    }

    /// Encodes this shader back to its `Item` element.
    #[must_use]
    pub fn to_node(&self) -> XmlNode {
        let mut node = XmlNode::new("Item");
        node.push(XmlNode::with_text("Name", self.name.clone()));
        if let Some(filename) = &self.filename {
            node.push(XmlNode::with_text("FileName", filename.clone()));
        }
        node.push(XmlNode::with_value("RenderBucket", self.render_bucket));
        let mut params = XmlNode::new("Parameters");
        for parameter in &self.parameters {
            params.push(parameter.to_node());
        }
        node.push(params);
        node
    }

    /// The shader preset filename, falling back to `default.sps`.
    #[must_use]
    pub fn filename_or_default(&self) -> &str {
        match self.filename.as_deref() {
            Some(filename) if !filename.is_empty() => filename,
            _ => {
                tracing::warn!(
                    "shader '{}' has no FileName, assuming {DEFAULT_SHADER_FILENAME}",
                    self.name
                );
                DEFAULT_SHADER_FILENAME
            }
        }
    }

    /// Finds a parameter by slot name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&ShaderParameter> {
        self.parameters.iter().find(|p| p.name() == name)
    }
}

/// Texture usage category. Unknown tokens pass through inert with a warning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureUsage {
    #[default]
    Unknown,
    Default,
    Terrain,
    CloudDensity,
    CloudNormal,
    Cloud,
    Water,
    Foam,
    Diffuse,
    Detail,
    Normal,
    Specular,
    Emissive,
    TintPalette,
    SkipProcessing,
    DoNotOptimize,
    Test,
    /// Token outside the known vocabulary, carried through unchanged.
    Other(String),
}

const TEXTURE_USAGES: [(&str, TextureUsage); 17] = [
    ("UNKNOWN", TextureUsage::Unknown),
    ("DEFAULT", TextureUsage::Default),
    ("TERRAIN", TextureUsage::Terrain),
    ("CLOUDDENSITY", TextureUsage::CloudDensity),
    ("CLOUDNORMAL", TextureUsage::CloudNormal),
    ("CLOUD", TextureUsage::Cloud),
    ("WATER", TextureUsage::Water),
    ("FOAM", TextureUsage::Foam),
    ("DIFFUSE", TextureUsage::Diffuse),
    ("DETAIL", TextureUsage::Detail),
    ("NORMAL", TextureUsage::Normal),
    ("SPECULAR", TextureUsage::Specular),
    ("EMISSIVE", TextureUsage::Emissive),
    ("TINTPALETTE", TextureUsage::TintPalette),
    ("SKIPPROCESSING", TextureUsage::SkipProcessing),
    ("DONOTOPTIMIZE", TextureUsage::DoNotOptimize),
    ("TEST", TextureUsage::Test),
];

impl TextureUsage {
    /// Resolves a usage token, passing unknown tokens through inert.
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        TEXTURE_USAGES
            .iter()
            .find(|(name, _)| *name == token)
            .map_or_else(
                || {
                    tracing::warn!("unknown texture usage token: {token}");
                    TextureUsage::Other(token.to_string())
                },
                |(_, usage)| usage.clone(),
            )
    }

    /// The on-disk token.
    #[must_use]
    pub fn token(&self) -> &str {
        if let TextureUsage::Other(token) = self {
            return token;
        }
        TEXTURE_USAGES
            .iter()
            .find(|(_, usage)| usage == self)
            .map_or("UNKNOWN", |(name, _)| *name)
    }
}

/// Texture pixel format. Unknown tokens pass through inert with a warning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureFormat {
    #[default]
    Dxt1,
    Dxt3,
    Dxt5,
    Ati1,
    Ati2,
    A8R8G8B8,
    A8B8G8R8,
    A1R5G5B5,
    A8,
    L8,
    /// Token outside the known vocabulary, carried through unchanged.
    Other(String),
}

const TEXTURE_FORMATS: [(&str, TextureFormat); 10] = [
    ("D3DFMT_DXT1", TextureFormat::Dxt1),
    ("D3DFMT_DXT3", TextureFormat::Dxt3),
    ("D3DFMT_DXT5", TextureFormat::Dxt5),
    ("D3DFMT_ATI1", TextureFormat::Ati1),
    ("D3DFMT_ATI2", TextureFormat::Ati2),
    ("D3DFMT_A8R8G8B8", TextureFormat::A8R8G8B8),
    ("D3DFMT_A8B8G8R8", TextureFormat::A8B8G8R8),
    ("D3DFMT_A1R5G5B5", TextureFormat::A1R5G5B5),
    ("D3DFMT_A8", TextureFormat::A8),
    ("D3DFMT_L8", TextureFormat::L8),
];

impl TextureFormat {
    /// Resolves a format token, passing unknown tokens through inert.
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        TEXTURE_FORMATS
            .iter()
            .find(|(name, _)| *name == token)
            .map_or_else(
                || {
                    tracing::warn!("unknown texture format token: {token}");
                    TextureFormat::Other(token.to_string())
                },
                |(_, format)| format.clone(),
            )
    }

    /// The on-disk token.
    #[must_use]
    pub fn token(&self) -> &str {
        if let TextureFormat::Other(token) = self {
            return token;
        }
        TEXTURE_FORMATS
            .iter()
            .find(|(_, format)| format == self)
            .map_or("D3DFMT_DXT1", |(name, _)| *name)
    }
}

macro_rules! usage_flags {
    ($(($field:ident, $token:literal)),+ $(,)?) => {
        /// The texture usage-flag set: 25 independent markers packed into one
        /// comma-delimited string on disk.
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
        pub struct TextureUsageFlags {
            $(pub $field: bool,)+
        }

        impl TextureUsageFlags {
            /// Decodes the flag string by independent substring containment
            /// tests. Token order is insignificant and flags are not mutually
            /// exclusive; tokens outside the vocabulary are dropped.
            #[must_use]
            pub fn from_list(raw: &str) -> Self {
                TextureUsageFlags {
                    $($field: raw.contains($token),)+
                }
            }

            /// Whether no flag is set.
            #[must_use]
            pub fn is_empty(self) -> bool {
                true $(&& !self.$field)+
            }
        }

        impl std::fmt::Display for TextureUsageFlags {
            /// Rebuilds the flag string: set flags only, comma-space
            /// delimited, in declaration order.
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let mut first = true;
                $(
                    if self.$field {
                        if !first {
                            f.write_str(", ")?;
                        }
                        f.write_str($token)?;
                        first = false;
                    }
                )+
                Ok(())
            }
        }
    };
}

usage_flags![
    (not_half, "NOT_HALF"),
    (hd_split, "HD_SPLIT"),
    (full, "FULL"),
    (maps_half, "MAPS_HALF"),
    (x2, "X2"),
    (x4, "X4"),
    (y4, "Y4"),
    (x8, "X8"),
    (x16, "X16"),
    (x32, "X32"),
    (x64, "X64"),
    (y64, "Y64"),
    (x128, "X128"),
    (x256, "X256"),
    (x512, "X512"),
    (y512, "Y512"),
    (x1024, "X1024"),
    (y1024, "Y1024"),
    (x2048, "X2048"),
    (y2048, "Y2048"),
    (embeddedscriptrt, "EMBEDDEDSCRIPTRT"),
    (unk19, "UNK19"),
    (unk20, "UNK20"),
    (unk21, "UNK21"),
    (unk24, "UNK24"),
];

/// One embedded texture's metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Texture {
    pub name: String,
    pub unk32: u32,
    pub usage: TextureUsage,
    pub usage_flags: TextureUsageFlags,
    pub extra_flags: u32,
    pub width: u32,
    pub height: u32,
    pub miplevels: u32,
    pub format: TextureFormat,
    pub filename: String,
}

impl Texture {
    /// Decodes one texture `Item` element.
    pub fn from_node(node: &XmlNode) -> Result<Self> {
        let unk32 = match node.child("Unk32") {
            Some(u) => u.u32_value()?,
            None => 0,
        };
        let extra_flags = match node.child("ExtraFlags") {
            Some(e) => e.u32_value()?,
            None => 0,
        };
        Ok(Texture {
            name: node
                .child_text("Name")
                .ok_or_else(|| Error::MissingField {
                    element: node.name.clone(),
                    field: "Name".to_string(),
                })?
                .to_string(),
            unk32,
            usage: TextureUsage::from_token(node.child_text("Usage").unwrap_or("UNKNOWN")),
            usage_flags: node
                .child_text("UsageFlags")
                .map(TextureUsageFlags::from_list)
                .unwrap_or_default(),
            extra_flags,
            width: node.req_child("Width")?.u32_value()?,
            height: node.req_child("Height")?.u32_value()?,
            miplevels: node.req_child("MipLevels")?.u32_value()?,
            format: TextureFormat::from_token(
                node.child_text("Format").unwrap_or("D3DFMT_DXT1"),
            ),
            filename: node.child_text("FileName").unwrap_or_default().to_string(),
        })
    }

    /// Encodes this texture back to its `Item` element.
    #[must_use]
    pub fn to_node(&self) -> XmlNode {
        XmlNode::new("Item")
            .with_child(XmlNode::with_text("Name", self.name.clone()))
            .with_child(XmlNode::with_value("Unk32", self.unk32))
            .with_child(XmlNode::with_text("Usage", self.usage.token()))
            .with_child(XmlNode::with_text("UsageFlags", self.usage_flags.to_string()))
            .with_child(XmlNode::with_value("ExtraFlags", self.extra_flags))
            .with_child(XmlNode::with_value("Width", self.width))
            .with_child(XmlNode::with_value("Height", self.height))
            .with_child(XmlNode::with_value("MipLevels", self.miplevels))
            .with_child(XmlNode::with_text("Format", self.format.token()))
            .with_child(XmlNode::with_text("FileName", self.filename.clone()))
    }
}

/// The embedded texture dictionary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextureDictionary {
    pub textures: Vec<Texture>,
}

impl TextureDictionary {
    /// Decodes a `TextureDictionary` element.
    pub fn from_node(node: &XmlNode) -> Result<Self> {
        let textures = node
            .children
            .iter()
            .map(Texture::from_node)
            .collect::<Result<Vec<_>>>()?;
        Ok(TextureDictionary { textures })
    }

    /// Encodes this dictionary back to its element.
    #[must_use]
    pub fn to_node(&self) -> XmlNode {
        let mut node = XmlNode::new("TextureDictionary");
        for texture in &self.textures {
            node.push(texture.to_node());
        }
        node
    }

    /// Finds a texture by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Texture> {
        self.textures.iter().find(|t| t.name == name)
    }
}

/// The shader group: embedded texture dictionary plus the ordered shader
/// list geometry `shader_index` values point into.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShaderGroup {
    pub unknown_30: f32,
    pub texture_dictionary: Option<TextureDictionary>,
    pub shaders: Vec<Shader>,
}

impl ShaderGroup {
    /// Decodes a `ShaderGroup` element.
    pub fn from_node(node: &XmlNode) -> Result<Self> {
        let unknown_30 = match node.child("Unknown30") {
            Some(u) => u.f32_value()?,
            None => 0.0,
        };
        let texture_dictionary = node
            .child("TextureDictionary")
            .map(TextureDictionary::from_node)
            .transpose()?;
        let shaders = node
            .req_child("Shaders")?
            .children
            .iter()
            .map(Shader::from_node)
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!("decoded shader group with {} shaders", shaders.len());
        Ok(ShaderGroup {
            unknown_30,
            texture_dictionary,
            shaders,
        })
    }

    /// Encodes this group back to its `ShaderGroup` element.
    #[must_use]
    pub fn to_node(&self) -> XmlNode {
        let mut node = XmlNode::new("ShaderGroup");
        node.push(XmlNode::with_value(
            "Unknown30",
            crate::formats::xml::format_float(self.unknown_30),
        ));
        if let Some(dictionary) = &self.texture_dictionary {
            node.push(dictionary.to_node());
        }
        let mut shaders = XmlNode::new("Shaders");
        for shader in &self.shaders {
            shaders.push(shader.to_node());
        }
        node.push(shaders);
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_flags_decode_exact_set() {
        let flags = TextureUsageFlags::from_list("NOT_HALF, X4, UNK19");
        assert!(flags.not_half);
        assert!(flags.x4);
        assert!(flags.unk19);
        // every other flag stays clear
        let expected = TextureUsageFlags {
            not_half: true,
            x4: true,
            unk19: true,
            ..TextureUsageFlags::default()
        };
        assert_eq!(flags, expected);
    }

    #[test]
    fn test_usage_flags_round_trip_is_same_set() {
        let flags = TextureUsageFlags::from_list("UNK19, X4, NOT_HALF");
        let encoded = flags.to_string();
        assert_eq!(encoded, "NOT_HALF, X4, UNK19");
        assert_eq!(TextureUsageFlags::from_list(&encoded), flags);
    }

    #[test]
    fn test_usage_flags_legacy_full_token() {
        // Older files spell the token FLAG_FULL; containment still matches.
        let flags = TextureUsageFlags::from_list("FLAG_FULL");
        assert!(flags.full);
        assert_eq!(flags.to_string(), "FULL");
    }

    #[test]
    fn test_usage_flags_substring_quirk_preserved() {
        // X256 also satisfies the X2 containment test, as in the source tooling.
        let flags = TextureUsageFlags::from_list("X256");
        assert!(flags.x256);
        assert!(flags.x2);
    }

    #[test]
    fn test_parameter_dispatch() {
        let mut texture = XmlNode::new("Item");
        texture.set_attr("name", "DiffuseSampler");
        texture.set_attr("type", "Texture");
        texture.push(XmlNode::with_text("Name", "prop_diff"));
        assert_eq!(
            ShaderParameter::from_node(&texture).unwrap(),
            ShaderParameter::Texture {
                name: "DiffuseSampler".to_string(),
                texture_name: Some("prop_diff".to_string()),
            }
        );

        let mut vector = XmlNode::new("Item");
        vector.set_attr("name", "matDiffuseColor");
        vector.set_attr("type", "Vector");
        vector.set_attr("x", "1");
        vector.set_attr("y", "0.5");
        vector.set_attr("z", "0");
        vector.set_attr("w", "1");
        assert_eq!(
            ShaderParameter::from_node(&vector).unwrap(),
            ShaderParameter::Vector {
                name: "matDiffuseColor".to_string(),
                value: Vec4::new(1.0, 0.5, 0.0, 1.0),
            }
        );
    }

    #[test]
    fn test_array_parameter_reads_nested_value() {
        let mut array = XmlNode::new("Item");
        array.set_attr("name", "Ambient");
        array.set_attr("type", "Array");
        let mut value = XmlNode::new("Value");
        value.set_attr("x", "0.25");
        value.set_attr("y", "0");
        value.set_attr("z", "0");
        value.set_attr("w", "1");
        array.push(value);

        let parameter = ShaderParameter::from_node(&array).unwrap();
        assert_eq!(
            parameter,
            ShaderParameter::Vector {
                name: "Ambient".to_string(),
                value: Vec4::new(0.25, 0.0, 0.0, 1.0),
            }
        );
        // Array re-encodes as a plain Vector item.
        assert_eq!(parameter.to_node().attr("type"), Some("Vector"));
    }

    #[test]
    fn test_unknown_usage_passes_through() {
        let usage = TextureUsage::from_token("SOMETHING_NEW");
        assert_eq!(usage, TextureUsage::Other("SOMETHING_NEW".to_string()));
        assert_eq!(usage.token(), "SOMETHING_NEW");
    }

    #[test]
    fn test_texture_node_round_trip() {
        let texture = Texture {
            name: "prop_diff".to_string(),
            unk32: 128,
            usage: TextureUsage::Diffuse,
            usage_flags: TextureUsageFlags::from_list("NOT_HALF"),
            extra_flags: 0,
            width: 512,
            height: 512,
            miplevels: 8,
            format: TextureFormat::Dxt5,
            filename: "prop_diff.dds".to_string(),
        };
        let decoded = Texture::from_node(&texture.to_node()).unwrap();
        assert_eq!(decoded, texture);
    }
}
