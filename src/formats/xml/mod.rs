//! Primitive XML layer: owned tree, typed accessors, reader, writer.

pub mod document;
pub mod reader;
pub mod writer;

pub use document::{XmlNode, format_float, parse_f32, parse_i32, parse_u32};
pub use reader::{parse_xml, read_xml};
pub use writer::{serialize_xml, write_xml};
