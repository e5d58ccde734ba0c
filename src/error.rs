use std::path::PathBuf;

use thiserror::Error;

/// Top-level failure of a synthesis run or of a metadata file operation.
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// A required deployment setting is missing or invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Another run holds the lock for this IDP root.
    #[error("another synthesis run holds the lock {}", .0.display())]
    Locked(PathBuf),

    #[error(transparent)]
    MetadataParse(#[from] MetadataError),

    #[error(transparent)]
    AttributeResolution(#[from] AttributeResolutionError),

    #[error(transparent)]
    FilterParse(#[from] FilterParseError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SynthesisError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Attribute has no type definition in the directory schema.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("no attribute type definition for `{0}` in the directory schema")]
pub struct SchemaLookupError(pub String);

#[derive(Debug, Error)]
pub enum AttributeResolutionError {
    #[error("failed to resolve SAML2 URI: {0}")]
    Schema(#[from] SchemaLookupError),

    /// A released attribute DN does not match any known attribute.
    #[error("trust relationship {relationship} releases unknown attribute {dn}")]
    UnknownAttribute { relationship: String, dn: String },

    /// A NameID configuration points at a source attribute that does not exist.
    #[error("NameID source attribute `{0}` is not defined")]
    UnknownNameIdSource(String),
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("XML parse error at position {position}: {message}")]
    Xml { position: u64, message: String },

    #[error("metadata document has no root element")]
    Empty,

    #[error("metadata document ends with {0} unclosed element(s)")]
    Unbalanced(usize),

    #[error("failed to read metadata {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
#[error("invalid metadata filter: {0}")]
pub struct FilterParseError(pub String);

#[derive(Debug, Error)]
#[error("failed to render template {template}: {message}")]
pub struct RenderError {
    pub template: String,
    pub message: String,
}

#[derive(Debug, Error)]
#[error("failed to write {}: {source}", path.display())]
pub struct WriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("entry {0} not found")]
    NotFound(String),

    #[error("entry {0} already exists")]
    Conflict(String),

    #[error("store i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store data error in {}: {source}", path.display())]
    Serde {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
#[error("failed to decrypt secret: {0}")]
pub struct SecretError(pub String);
