// Path segments, wildcard markers, and the odd/even parity rules that
// separate collection paths from document paths.

use crate::error::{ArborDbError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// IDs matching this pattern are reserved by the underlying store.
static RESERVED_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^__.*__$").unwrap());

/// One path segment: a literal key or a wildcard marker.
///
/// A segment is a wildcard exactly when wrapped in `{` and `}`. The
/// interior text is documentation only and is never matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Wildcard { label: String },
}

impl Segment {
    pub fn parse(raw: &str) -> Segment {
        if raw.len() >= 2 && raw.starts_with('{') && raw.ends_with('}') {
            Segment::Wildcard {
                label: raw[1..raw.len() - 1].to_string(),
            }
        } else {
            Segment::Literal(raw.to_string())
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Segment::Wildcard { .. })
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Literal(s) => f.write_str(s),
            Segment::Wildcard { label } => write!(f, "{{{label}}}"),
        }
    }
}

/// What a path addresses, decided by segment-count parity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Collection,
    Document,
}

impl PathKind {
    /// Collection paths have odd length, document paths even. Zero
    /// segments address the root and have no kind.
    pub fn of_len(len: usize) -> Option<PathKind> {
        if len == 0 {
            None
        } else if len % 2 == 1 {
            Some(PathKind::Collection)
        } else {
            Some(PathKind::Document)
        }
    }
}

/// Split a slash-delimited path into segments. The empty string yields
/// an empty segment list (the root path); empty segments elsewhere are
/// errors.
pub fn split_path(raw: &str) -> Result<Vec<Segment>> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    let mut segments = Vec::new();
    for part in raw.split('/') {
        if part.is_empty() {
            return Err(ArborDbError::EmptySegment {
                path: raw.to_string(),
            });
        }
        segments.push(Segment::parse(part));
    }
    Ok(segments)
}

/// Build segments from an explicit pre-split list. A part containing an
/// embedded `/` is malformed regardless of position, since each part was
/// supplied as a single segment.
pub fn segments_from_parts(parts: &[&str]) -> Result<Vec<Segment>> {
    let mut segments = Vec::with_capacity(parts.len());
    for part in parts {
        if part.contains('/') {
            return Err(ArborDbError::MalformedSegment {
                segment: part.to_string(),
            });
        }
        if part.is_empty() {
            return Err(ArborDbError::EmptySegment {
                path: parts.join("/"),
            });
        }
        segments.push(Segment::parse(part));
    }
    Ok(segments)
}

/// Check that a full path has the parity its consumer expects.
pub fn expect_kind(segments: &[Segment], kind: PathKind, original: &str) -> Result<()> {
    match (PathKind::of_len(segments.len()), kind) {
        (Some(PathKind::Collection), PathKind::Collection) => Ok(()),
        (Some(PathKind::Document), PathKind::Document) => Ok(()),
        (_, PathKind::Collection) => Err(ArborDbError::CollectionParity {
            path: original.to_string(),
            count: segments.len(),
        }),
        (_, PathKind::Document) => Err(ArborDbError::DocumentParity {
            path: original.to_string(),
            count: segments.len(),
        }),
    }
}

/// Parity rule for base-plus-extras accessor calls: the base is already a
/// collection, so a collection target needs an even number of extras
/// (document/collection pairs) and a document target an odd number.
pub fn check_extra_parity(kind: PathKind, extra_len: usize) -> Result<()> {
    let ok = match kind {
        PathKind::Collection => extra_len % 2 == 0,
        PathKind::Document => extra_len % 2 == 1,
    };
    if ok {
        return Ok(());
    }
    match kind {
        PathKind::Collection => Err(ArborDbError::ExtraSegmentParity {
            kind: "collection",
            expected: "even",
            count: extra_len,
        }),
        PathKind::Document => Err(ArborDbError::ExtraSegmentParity {
            kind: "document",
            expected: "odd",
            count: extra_len,
        }),
    }
}

/// Validate a single collection or document ID for use in a concrete
/// reference path.
pub fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(ArborDbError::InvalidId {
            id: id.to_string(),
            reason: "must not be empty",
        });
    }
    if id.contains('/') {
        return Err(ArborDbError::MalformedSegment {
            segment: id.to_string(),
        });
    }
    if id == "." || id == ".." {
        return Err(ArborDbError::InvalidId {
            id: id.to_string(),
            reason: "'.' and '..' are not valid IDs",
        });
    }
    if RESERVED_ID.is_match(id) {
        return Err(ArborDbError::InvalidId {
            id: id.to_string(),
            reason: "IDs matching __.*__ are reserved",
        });
    }
    Ok(())
}

/// A concrete (wildcard-free) path addressing a collection. Odd segment
/// count by construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath {
    segments: Vec<String>,
}

/// A concrete (wildcard-free) path addressing a document. Even segment
/// count by construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentPath {
    segments: Vec<String>,
}

impl CollectionPath {
    pub fn parse(raw: &str) -> Result<CollectionPath> {
        let segments = concrete_segments(raw)?;
        if PathKind::of_len(segments.len()) != Some(PathKind::Collection) {
            return Err(ArborDbError::CollectionParity {
                path: raw.to_string(),
                count: segments.len(),
            });
        }
        Ok(CollectionPath { segments })
    }

    /// The collection's own name (the last segment).
    pub fn id(&self) -> &str {
        self.segments.last().expect("collection path is non-empty")
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The parent document, or None for a root collection.
    pub fn parent(&self) -> Option<DocumentPath> {
        if self.segments.len() == 1 {
            return None;
        }
        Some(DocumentPath {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Descend into a document of this collection.
    pub fn doc(&self, id: &str) -> Result<DocumentPath> {
        validate_id(id)?;
        let mut segments = self.segments.clone();
        segments.push(id.to_string());
        Ok(DocumentPath { segments })
    }
}

impl DocumentPath {
    pub fn parse(raw: &str) -> Result<DocumentPath> {
        let segments = concrete_segments(raw)?;
        if PathKind::of_len(segments.len()) != Some(PathKind::Document) {
            return Err(ArborDbError::DocumentParity {
                path: raw.to_string(),
                count: segments.len(),
            });
        }
        Ok(DocumentPath { segments })
    }

    /// The document's own ID (the last segment).
    pub fn id(&self) -> &str {
        self.segments.last().expect("document path is non-empty")
    }

    /// The name of the collection this document lives in.
    pub fn collection_id(&self) -> &str {
        &self.segments[self.segments.len() - 2]
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The collection containing this document.
    pub fn parent(&self) -> CollectionPath {
        CollectionPath {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        }
    }

    /// Descend into a subcollection of this document.
    pub fn collection(&self, name: &str) -> Result<CollectionPath> {
        validate_id(name)?;
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Ok(CollectionPath { segments })
    }

    /// True when `other` is this path or lies underneath it.
    pub fn starts_with(&self, prefix: &DocumentPath) -> bool {
        self.segments.len() >= prefix.segments.len()
            && self.segments[..prefix.segments.len()] == prefix.segments[..]
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// Parse a concrete reference path: every segment must be a literal,
/// valid ID. Wildcards are schema-resolution constructs and never
/// address real data.
fn concrete_segments(raw: &str) -> Result<Vec<String>> {
    let parsed = split_path(raw)?;
    let mut segments = Vec::with_capacity(parsed.len());
    for segment in parsed {
        match segment {
            Segment::Wildcard { .. } => {
                return Err(ArborDbError::WildcardSegment {
                    segment: segment.to_string(),
                });
            }
            Segment::Literal(s) => {
                validate_id(&s)?;
                segments.push(s);
            }
        }
    }
    Ok(segments)
}
