use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArborDbError {
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Malformed path segment '{segment}': segments must not contain '/'")]
    MalformedSegment { segment: String },

    #[error("Empty segment in path '{path}'")]
    EmptySegment { path: String },

    #[error("Wildcard segment '{segment}' is not allowed in a concrete reference path")]
    WildcardSegment { segment: String },

    #[error("Invalid identifier '{id}': {reason}")]
    InvalidId { id: String, reason: &'static str },

    #[error("Collection paths must have an odd number of segments, '{path}' has {count}")]
    CollectionParity { path: String, count: usize },

    #[error("Document paths must have an even number of segments, '{path}' has {count}")]
    DocumentParity { path: String, count: usize },

    #[error("A {kind} reference built from a base collection needs an {expected} number of extra segments, got {count}")]
    ExtraSegmentParity {
        kind: &'static str,
        expected: &'static str,
        count: usize,
    },

    #[error("Unknown {kind} '{name}' at '{at}' in schema")]
    UnknownKey {
        kind: &'static str,
        name: String,
        at: String,
    },

    #[error("Document not found: {path}")]
    NotFound { path: String },

    #[error("Precondition failed for {path}: {reason}")]
    PreconditionFailed { path: String, reason: &'static str },

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ArborDbError>;
