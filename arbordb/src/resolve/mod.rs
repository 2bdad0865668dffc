// Walks the schema tree along a parsed segment list, expanding wildcard
// segments into unions over every key at that level.

use crate::path::Segment;
use crate::schema::{CollectionSchema, DocumentSchema, SchemaDefinition};
use serde::Serialize;
use std::collections::HashMap;

/// A node reached by resolution: the root tree, a collection, or a document.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(untagged)]
pub enum SchemaNode<'a> {
    Root(&'a HashMap<String, CollectionSchema>),
    Collection(&'a CollectionSchema),
    Document(&'a DocumentSchema),
}

/// The set of schema nodes reachable via a path. With wildcards this is a
/// union over branches, resolved independently; an empty set means the
/// path matches nothing.
#[derive(Debug, Clone, Default)]
pub struct Resolution<'a> {
    pub matches: Vec<SchemaNode<'a>>,
}

impl<'a> Resolution<'a> {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// All matched collection schemas.
    pub fn collections(&self) -> Vec<&'a CollectionSchema> {
        self.matches
            .iter()
            .filter_map(|node| match node {
                SchemaNode::Collection(c) => Some(*c),
                _ => None,
            })
            .collect()
    }

    /// All matched document schemas.
    pub fn documents(&self) -> Vec<&'a DocumentSchema> {
        self.matches
            .iter()
            .filter_map(|node| match node {
                SchemaNode::Document(d) => Some(*d),
                _ => None,
            })
            .collect()
    }
}

/// Resolve a parsed segment list against the schema tree.
///
/// Literal segments descend by key (exact entry first, catch-all entry
/// second). Wildcard segments union the recursive resolution over every
/// key at the current level, and match nothing when `allow_wildcards` is
/// false. Zero segments resolve to the root tree itself.
pub fn resolve_path<'a>(
    schema: &'a SchemaDefinition,
    segments: &[Segment],
    allow_wildcards: bool,
) -> Resolution<'a> {
    let mut matches = Vec::new();
    resolve_tree(&schema.collections, segments, allow_wildcards, &mut matches);
    Resolution { matches }
}

fn resolve_tree<'a>(
    tree: &'a HashMap<String, CollectionSchema>,
    segments: &[Segment],
    allow_wildcards: bool,
    out: &mut Vec<SchemaNode<'a>>,
) {
    let Some((segment, rest)) = segments.split_first() else {
        out.push(SchemaNode::Root(tree));
        return;
    };
    match segment {
        Segment::Wildcard { .. } => {
            if allow_wildcards {
                for collection in tree.values() {
                    resolve_collection(collection, rest, allow_wildcards, out);
                }
            }
        }
        Segment::Literal(name) => {
            if let Some(collection) = lookup(tree, name) {
                resolve_collection(collection, rest, allow_wildcards, out);
            }
        }
    }
}

fn resolve_collection<'a>(
    collection: &'a CollectionSchema,
    segments: &[Segment],
    allow_wildcards: bool,
    out: &mut Vec<SchemaNode<'a>>,
) {
    let Some((segment, rest)) = segments.split_first() else {
        out.push(SchemaNode::Collection(collection));
        return;
    };
    match segment {
        Segment::Wildcard { .. } => {
            if allow_wildcards {
                for document in collection.documents.values() {
                    resolve_document(document, rest, allow_wildcards, out);
                }
            }
        }
        Segment::Literal(name) => {
            if let Some(document) = collection.document(name) {
                resolve_document(document, rest, allow_wildcards, out);
            }
        }
    }
}

fn resolve_document<'a>(
    document: &'a DocumentSchema,
    segments: &[Segment],
    allow_wildcards: bool,
    out: &mut Vec<SchemaNode<'a>>,
) {
    if segments.is_empty() {
        out.push(SchemaNode::Document(document));
        return;
    }
    resolve_tree(&document.collections, segments, allow_wildcards, out);
}

/// Exact key first, then the level's catch-all entry.
fn lookup<'a>(
    tree: &'a HashMap<String, CollectionSchema>,
    name: &str,
) -> Option<&'a CollectionSchema> {
    if let Some(found) = tree.get(name) {
        return Some(found);
    }
    if crate::schema::is_catch_all_key(name) {
        return None;
    }
    tree.iter()
        .find(|(key, _)| crate::schema::is_catch_all_key(key))
        .map(|(_, value)| value)
}
