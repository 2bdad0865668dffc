use super::types::{
    is_catch_all_key, CollectionSchema, DocumentSchema, FieldDefinition, FieldType,
    SchemaDefinition,
};
use crate::error::{ArborDbError, Result};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Parse a schema.yaml file into a SchemaDefinition
pub fn parse_schema(path: &Path) -> Result<SchemaDefinition> {
    let content = std::fs::read_to_string(path)?;
    parse_schema_str(&content)
}

/// Parse a schema YAML string into a SchemaDefinition
pub fn parse_schema_str(content: &str) -> Result<SchemaDefinition> {
    let schema: SchemaDefinition = serde_yaml::from_str(content)?;
    verify_schema(&schema)?;
    Ok(schema)
}

/// Hex fingerprint of the schema text. Used for status reporting and
/// stamped into generated code headers.
pub fn hash_schema(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(16);
    for byte in digest.iter().take(8) {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Structural verification, run after deserialization:
/// keys must be usable path segments, references and custom types must be
/// declared, and each level may carry at most one catch-all entry.
pub fn verify_schema(schema: &SchemaDefinition) -> Result<()> {
    for (name, collection) in &schema.collections {
        verify_collection(schema, name, collection, name)?;
    }
    Ok(())
}

fn verify_collection(
    schema: &SchemaDefinition,
    name: &str,
    collection: &CollectionSchema,
    at: &str,
) -> Result<()> {
    verify_key(name, at)?;

    let catch_alls = collection
        .documents
        .keys()
        .filter(|k| is_catch_all_key(k))
        .count();
    if catch_alls > 1 {
        return Err(ArborDbError::Schema(format!(
            "Collection '{at}' declares {catch_alls} catch-all document keys, at most one is allowed"
        )));
    }

    for (doc_name, doc) in &collection.documents {
        let doc_at = format!("{at}/{doc_name}");
        verify_key(doc_name, &doc_at)?;
        verify_document(schema, doc, &doc_at)?;
    }
    Ok(())
}

fn verify_document(schema: &SchemaDefinition, doc: &DocumentSchema, at: &str) -> Result<()> {
    for (field_name, field) in &doc.fields {
        verify_field(schema, field_name, field, at)?;
    }
    for (sub_name, sub) in &doc.collections {
        let sub_at = format!("{at}/{sub_name}");
        verify_collection(schema, sub_name, sub, &sub_at)?;
    }
    Ok(())
}

fn verify_field(
    schema: &SchemaDefinition,
    field_name: &str,
    field: &FieldDefinition,
    at: &str,
) -> Result<()> {
    match &field.field_type {
        FieldType::Reference => {
            if field.target.is_none() {
                return Err(ArborDbError::Schema(format!(
                    "Reference field '{at}.{field_name}' has no target"
                )));
            }
        }
        FieldType::Custom(type_name) => {
            if schema.get_custom_type(type_name).is_none() {
                return Err(ArborDbError::Schema(format!(
                    "Field '{at}.{field_name}' uses undeclared type '{type_name}'"
                )));
            }
        }
        _ => {}
    }

    if let (Some(values), Some(default)) = (&field.enum_values, &field.default) {
        if let Some(s) = default.as_str() {
            if !values.iter().any(|v| v == s) {
                return Err(ArborDbError::Schema(format!(
                    "Field '{at}.{field_name}' default '{s}' is not in its enum"
                )));
            }
        }
    }
    Ok(())
}

fn verify_key(key: &str, at: &str) -> Result<()> {
    if key.is_empty() {
        return Err(ArborDbError::Schema(format!("Empty key at '{at}'")));
    }
    if key.contains('/') {
        return Err(ArborDbError::Schema(format!(
            "Key '{key}' at '{at}' must not contain '/'"
        )));
    }
    if !is_catch_all_key(key) && crate::path::validate_id(key).is_err() {
        return Err(ArborDbError::Schema(format!(
            "Key '{key}' at '{at}' is not a valid identifier"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let schema = parse_schema_str(
            r#"
collections:
  users:
    documents:
      "{userId}":
        fields:
          name: { type: string, required: true }
"#,
        )
        .unwrap();
        assert_eq!(schema.collections.len(), 1);
        let users = &schema.collections["users"];
        assert!(users.document("anyone").is_some());
    }

    #[test]
    fn test_parse_nested() {
        let schema = parse_schema_str(
            r#"
collections:
  users:
    documents:
      "{userId}":
        fields:
          name: { type: string }
        collections:
          posts:
            documents:
              "{postId}":
                fields:
                  title: { type: string, required: true }
"#,
        )
        .unwrap();
        let posts = schema.collections["users"]
            .document("alice")
            .unwrap()
            .collection("posts")
            .unwrap();
        assert!(posts.document("p1").is_some());
    }

    #[test]
    fn test_reject_undeclared_custom_type() {
        let result = parse_schema_str(
            r#"
collections:
  users:
    documents:
      "{userId}":
        fields:
          home: { type: address }
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_reject_reference_without_target() {
        let result = parse_schema_str(
            r#"
collections:
  posts:
    documents:
      "{postId}":
        fields:
          author: { type: reference }
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_reject_enum_default_outside_enum() {
        let result = parse_schema_str(
            r#"
collections:
  posts:
    documents:
      "{postId}":
        fields:
          status: { type: string, enum: [draft, published], default: archived }
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_reject_reserved_key() {
        let result = parse_schema_str(
            r#"
collections:
  __internal__:
    documents: {}
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_reject_double_catch_all() {
        let result = parse_schema_str(
            r#"
collections:
  users:
    documents:
      "{a}": {}
      "{b}": {}
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_schema_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.yaml");
        std::fs::write(
            &path,
            "collections:\n  users:\n    documents:\n      \"{userId}\": {}\n",
        )
        .unwrap();

        let schema = parse_schema(&path).unwrap();
        assert_eq!(schema.collections.len(), 1);
    }

    #[test]
    fn test_hash_schema_stable() {
        let a = hash_schema("collections: {}");
        let b = hash_schema("collections: {}");
        let c = hash_schema("collections:\n  users: {}");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 16);
    }
}
