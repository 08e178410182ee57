//! # RageKit
//!
//! A pure-Rust library for working with GTA V RAGE drawable resources in
//! their XML text form.
//!
//! ## Supported Resources
//!
//! - **YDR** - Drawables: geometry LODs, materials, skeleton, bounds
//! - **YDD** - Drawable dictionaries sharing one skeleton
//! - **YFT** - Fragments: physics group/child decomposition of a drawable
//!
//! ## Quick Start
//!
//! ```no_run
//! use ragekit::formats::drawable::{read_drawable, serialize_drawable};
//!
//! // Decode a drawable
//! let drawable = read_drawable("prop_chair.ydr.xml")?;
//! println!("{} high-LOD models", drawable.models_high.len());
//!
//! // Round-trip back to XML text
//! let xml = serialize_drawable(&drawable)?;
//! # Ok::<(), ragekit::Error>(())
//! ```
//!
//! ### Feeding a scene
//!
//! ```no_run
//! use ragekit::formats::drawable::read_drawable;
//! use ragekit::scene::MeshData;
//!
//! let drawable = read_drawable("prop_chair.ydr.xml")?;
//! for model in &drawable.models_high {
//!     for geometry in &model.geometries {
//!         let mesh = MeshData::from_geometry(geometry)?;
//!         // hand mesh.positions / mesh.triangles / mesh.influences
//!         // to whatever scene representation you use
//!     }
//! }
//! # Ok::<(), ragekit::Error>(())
//! ```
//!
//! ### Using the Prelude
//!
//! ```
//! use ragekit::prelude::*;
//! ```

pub mod error;
pub mod formats;
pub mod scene;
pub mod utils;

// Re-exports for convenience
pub use error::{Error, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::formats::drawable::{
        Bone, BoneFlag, BoneFlags, Drawable, DrawableDictionary, DrawableModel, Geometry,
        IndexBuffer, Influence, Joint, LayoutTable, LodLevel, Shader, ShaderGroup,
        ShaderParameter, Skeleton, Texture, TextureDictionary, Vertex, VertexBuffer,
        VertexLayout, VertexSemantic,
    };
    pub use crate::formats::drawable::{
        parse_drawable, parse_drawable_dictionary, read_drawable, read_drawable_dictionary,
        serialize_drawable, serialize_drawable_dictionary, write_drawable,
        write_drawable_dictionary,
    };
    pub use crate::formats::fragment::{
        Archetype, Child, Fragment, Group, Physics, parse_fragment, read_fragment,
        serialize_fragment, write_fragment,
    };
    pub use crate::formats::xml::{XmlNode, parse_xml, serialize_xml};
    pub use crate::scene::{MeshData, MeshSource, build_geometry, build_vertices};
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
