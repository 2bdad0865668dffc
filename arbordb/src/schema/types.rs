use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Top-level schema definition parsed from schema.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDefinition {
    #[serde(default)]
    pub types: HashMap<String, HashMap<String, FieldDefinition>>,
    #[serde(default)]
    pub collections: HashMap<String, CollectionSchema>,
}

/// A collection: named document schemas plus ID-generation config.
///
/// Document keys written as `{name}` are catch-all entries matching any
/// document ID without an exact entry of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionSchema {
    #[serde(default)]
    pub documents: HashMap<String, DocumentSchema>,
    #[serde(default)]
    pub id: Option<IdConfig>,
}

/// A document: its field definitions plus nested subcollections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSchema {
    #[serde(default)]
    pub fields: HashMap<String, FieldDefinition>,
    #[serde(default)]
    pub collections: HashMap<String, CollectionSchema>,
    #[serde(default = "default_additional_properties")]
    pub additional_properties: bool,
    #[serde(default)]
    pub strict: bool,
}

fn default_additional_properties() -> bool {
    true
}

/// Configuration for document ID generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdConfig {
    pub auto: Option<AutoIdStrategy>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoIdStrategy {
    Ulid,
    Uuid,
    Nanoid,
}

/// Definition of a single field in a document schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(rename = "enum", default)]
    pub enum_values: Option<Vec<String>>,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub target: Option<RefTarget>,
    #[serde(default)]
    pub items: Option<ItemType>,
}

/// Field type enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Timestamp,
    Geopoint,
    Reference,
    List,
    Map,
    #[serde(untagged)]
    Custom(std::string::String),
}

/// Reference target - single collection-group name or multiple
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RefTarget {
    Single(String),
    Multiple(Vec<String>),
}

impl RefTarget {
    pub fn targets(&self) -> Vec<&str> {
        match self {
            RefTarget::Single(s) => vec![s.as_str()],
            RefTarget::Multiple(v) => v.iter().map(|s| s.as_str()).collect(),
        }
    }
}

/// Item type for lists
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemType {
    Simple(String),
    Complex(Box<FieldDefinition>),
}

/// True when a schema key is a catch-all entry (`{userId}` etc.).
pub fn is_catch_all_key(key: &str) -> bool {
    key.len() >= 2 && key.starts_with('{') && key.ends_with('}')
}

impl SchemaDefinition {
    /// Look up a reusable type definition from the `types:` section.
    pub fn get_custom_type(&self, name: &str) -> Option<&HashMap<String, FieldDefinition>> {
        self.types.get(name)
    }

    /// Look up a top-level collection by key, falling back to a catch-all entry.
    pub fn collection(&self, name: &str) -> Option<&CollectionSchema> {
        lookup(&self.collections, name)
    }
}

impl CollectionSchema {
    /// Look up a document schema by key, falling back to a catch-all entry.
    pub fn document(&self, name: &str) -> Option<&DocumentSchema> {
        lookup(&self.documents, name)
    }

    pub fn auto_id(&self) -> Option<AutoIdStrategy> {
        self.id.as_ref().and_then(|c| c.auto)
    }
}

impl DocumentSchema {
    /// Look up a subcollection by key, falling back to a catch-all entry.
    pub fn collection(&self, name: &str) -> Option<&CollectionSchema> {
        lookup(&self.collections, name)
    }
}

/// Exact key first; otherwise the level's catch-all entry, if any.
fn lookup<'a, T>(map: &'a HashMap<String, T>, name: &str) -> Option<&'a T> {
    if let Some(found) = map.get(name) {
        return Some(found);
    }
    if is_catch_all_key(name) {
        return None;
    }
    map.iter()
        .find(|(key, _)| is_catch_all_key(key))
        .map(|(_, value)| value)
}
