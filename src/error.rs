//! Error types for `RageKit`

use thiserror::Error;

/// The error type for `RageKit` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ==================== XML Errors ====================
    /// XML parsing error.
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// XML attribute error.
    #[error("XML attribute error: {0}")]
    XmlAttr(String),

    /// UTF-8 conversion error.
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    // ==================== Document Structure Errors ====================
    /// A required XML child element or attribute is absent.
    #[error("missing field '{field}' in element '{element}'")]
    MissingField {
        /// The element being decoded.
        element: String,
        /// The child element or attribute that was expected.
        field: String,
    },

    /// An integer field could not be parsed.
    #[error("invalid integer value: '{value}'")]
    InvalidInt {
        /// The offending text.
        value: String,
    },

    /// A floating-point field could not be parsed.
    #[error("invalid float value: '{value}'")]
    InvalidFloat {
        /// The offending text.
        value: String,
    },

    // ==================== Vertex Codec Errors ====================
    /// A vertex record's token count does not match its layout length.
    #[error("vertex record has {found} fields, layout expects {expected}")]
    LayoutMismatch {
        /// Number of fields the layout demands.
        expected: usize,
        /// Number of fields found in the record.
        found: usize,
    },

    /// A layout element names a semantic outside the known vocabulary.
    #[error("unknown vertex semantic: '{name}'")]
    UnknownSemantic {
        /// The unrecognized tag name.
        name: String,
    },

    /// A layout lists the same semantic twice.
    #[error("duplicate vertex semantic: '{name}'")]
    DuplicateSemantic {
        /// The repeated tag name.
        name: String,
    },

    /// A vertex lacks an attribute its layout demands (encode side).
    #[error("vertex is missing the '{semantic}' attribute required by its layout")]
    MissingAttribute {
        /// The layout semantic with no corresponding vertex data.
        semantic: &'static str,
    },

    /// A vertex field has the wrong number of scalar components.
    #[error("'{semantic}' field has {found} components, expected {expected}")]
    ComponentCount {
        /// The semantic being parsed.
        semantic: &'static str,
        /// Components the semantic requires.
        expected: usize,
        /// Components found in the field.
        found: usize,
    },

    /// A scene-side attribute array does not cover every vertex.
    #[error("'{semantic}' array has {found} entries for {expected} vertices")]
    AttributeLength {
        /// The semantic whose array is short or long.
        semantic: &'static str,
        /// The vertex count.
        expected: usize,
        /// The array length supplied.
        found: usize,
    },

    // ==================== Index Buffer Errors ====================
    /// The index buffer length is not a multiple of 3.
    #[error("index buffer has {count} indices, not a multiple of 3")]
    TriangleAlignment {
        /// Total index count found.
        count: usize,
    },

    // ==================== Aggregate Errors ====================
    /// A drawable with populated LOD buckets lacks a LOD distance.
    #[error("drawable has LOD models but no '{field}' distance")]
    MissingLodDistances {
        /// The absent distance element.
        field: &'static str,
    },

    /// A cross-reference does not resolve within its owning collection.
    #[error("unresolved {kind} reference: {reference}")]
    UnresolvedReference {
        /// What kind of reference failed (bone tag, shader index, group...).
        kind: &'static str,
        /// The reference value that did not resolve.
        reference: String,
    },

    /// A fragment's child list and archetype bound list differ in length.
    #[error("fragment has {children} children but {bounds} archetype bounds")]
    ChildBoundMismatch {
        /// Number of children decoded.
        children: usize,
        /// Number of archetype bounds decoded.
        bounds: usize,
    },
}

// quick-xml reports attribute syntax problems through a separate error type
impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::XmlAttr(err.to_string())
    }
}

/// A specialized Result type for `RageKit` operations.
pub type Result<T> = std::result::Result<T, Error>;
