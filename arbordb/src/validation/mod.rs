use crate::error::{ArborDbError, Result};
use crate::path::{self, PathKind, Segment};
use crate::schema::{DocumentSchema, FieldDefinition, FieldType, ItemType, SchemaDefinition};

/// Result of validating a document
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Validate document data against its document schema.
/// In strict mode issues are errors; otherwise they are warnings only.
pub fn validate_document(
    schema: &SchemaDefinition,
    doc_schema: &DocumentSchema,
    data: &serde_json::Value,
) -> ValidationResult {
    let mut result = ValidationResult {
        errors: Vec::new(),
        warnings: Vec::new(),
    };

    let object = match data.as_object() {
        Some(o) => o,
        None => {
            result
                .errors
                .push("Document data must be a JSON object".into());
            return result;
        }
    };

    // Check required fields and validate each declared field
    for (field_name, field_def) in &doc_schema.fields {
        let value = object.get(field_name);

        if field_def.required && (value.is_none() || value == Some(&serde_json::Value::Null)) {
            if field_def.default.is_none() {
                add_issue(
                    &mut result,
                    doc_schema.strict,
                    format!("Required field '{field_name}' is missing"),
                );
            }
            continue;
        }

        if let Some(val) = value {
            if !val.is_null() {
                validate_field_value(
                    schema,
                    field_name,
                    field_def,
                    val,
                    doc_schema.strict,
                    &mut result,
                );
            }
        }
    }

    // Check for additional properties
    if !doc_schema.additional_properties {
        for key in object.keys() {
            if !doc_schema.fields.contains_key(key) {
                add_issue(
                    &mut result,
                    doc_schema.strict,
                    format!("Unexpected field '{key}' (additional_properties is false)"),
                );
            }
        }
    }

    result
}

/// Validate a partial (merge) body: only fields that are present are
/// checked, and required fields are not enforced.
pub fn validate_partial(
    schema: &SchemaDefinition,
    doc_schema: &DocumentSchema,
    data: &serde_json::Value,
) -> ValidationResult {
    let mut result = ValidationResult {
        errors: Vec::new(),
        warnings: Vec::new(),
    };

    let object = match data.as_object() {
        Some(o) => o,
        None => {
            result
                .errors
                .push("Partial update data must be a JSON object".into());
            return result;
        }
    };

    for (field_name, field_def) in &doc_schema.fields {
        if let Some(val) = object.get(field_name) {
            if !val.is_null() {
                validate_field_value(
                    schema,
                    field_name,
                    field_def,
                    val,
                    doc_schema.strict,
                    &mut result,
                );
            }
        }
    }

    if !doc_schema.additional_properties {
        for key in object.keys() {
            if !doc_schema.fields.contains_key(key) {
                add_issue(
                    &mut result,
                    doc_schema.strict,
                    format!("Unexpected field '{key}' (additional_properties is false)"),
                );
            }
        }
    }

    result
}

/// Apply default values to document data in place.
pub fn apply_defaults(doc_schema: &DocumentSchema, data: &mut serde_json::Value) {
    let object = match data.as_object_mut() {
        Some(o) => o,
        None => return,
    };

    for (field_name, field_def) in &doc_schema.fields {
        let has_value = object
            .get(field_name)
            .map(|v| !v.is_null())
            .unwrap_or(false);

        if !has_value {
            if let Some(default) = &field_def.default {
                object.insert(field_name.clone(), default.clone());
            }
        }
    }
}

fn validate_field_value(
    schema: &SchemaDefinition,
    field_name: &str,
    field_def: &FieldDefinition,
    value: &serde_json::Value,
    strict: bool,
    result: &mut ValidationResult,
) {
    match &field_def.field_type {
        FieldType::String => {
            if !value.is_string() {
                add_issue(
                    result,
                    strict,
                    format!("Field '{field_name}' expected string, got {}", type_name(value)),
                );
                return;
            }

            if let Some(enum_values) = &field_def.enum_values {
                if let Some(s) = value.as_str() {
                    if !enum_values.iter().any(|v| v == s) {
                        add_issue(
                            result,
                            strict,
                            format!(
                                "Field '{field_name}' value '{s}' is not in enum: {enum_values:?}"
                            ),
                        );
                    }
                }
            }
        }
        FieldType::Number => {
            if !value.is_number() {
                add_issue(
                    result,
                    strict,
                    format!("Field '{field_name}' expected number, got {}", type_name(value)),
                );
            }
        }
        FieldType::Boolean => {
            if !value.is_boolean() {
                add_issue(
                    result,
                    strict,
                    format!("Field '{field_name}' expected boolean, got {}", type_name(value)),
                );
            }
        }
        FieldType::Timestamp => {
            let ok = value
                .as_str()
                .map(|s| chrono::DateTime::parse_from_rfc3339(s).is_ok())
                .unwrap_or(false);
            if !ok {
                add_issue(
                    result,
                    strict,
                    format!("Field '{field_name}' expected an RFC 3339 timestamp string"),
                );
            }
        }
        FieldType::Geopoint => {
            let ok = value
                .as_object()
                .map(|o| {
                    o.get("latitude").map(|v| v.is_number()).unwrap_or(false)
                        && o.get("longitude").map(|v| v.is_number()).unwrap_or(false)
                })
                .unwrap_or(false);
            if !ok {
                add_issue(
                    result,
                    strict,
                    format!(
                        "Field '{field_name}' expected a geopoint with numeric latitude/longitude"
                    ),
                );
            }
        }
        FieldType::Reference => {
            validate_reference(field_name, field_def, value, strict, result);
        }
        FieldType::List => {
            match value.as_array() {
                None => {
                    add_issue(
                        result,
                        strict,
                        format!("Field '{field_name}' expected list, got {}", type_name(value)),
                    );
                }
                Some(items) => {
                    if let Some(ItemType::Simple(item_type)) = &field_def.items {
                        for (index, item) in items.iter().enumerate() {
                            if !simple_type_matches(item_type, item) {
                                add_issue(
                                    result,
                                    strict,
                                    format!(
                                        "Field '{field_name}[{index}]' expected {item_type}, got {}",
                                        type_name(item)
                                    ),
                                );
                            }
                        }
                    }
                }
            }
        }
        FieldType::Map => {
            if !value.is_object() {
                add_issue(
                    result,
                    strict,
                    format!("Field '{field_name}' expected map, got {}", type_name(value)),
                );
            }
        }
        FieldType::Custom(type_name_str) => {
            if let Some(type_fields) = schema.get_custom_type(type_name_str) {
                if let Some(object) = value.as_object() {
                    for (sub_field_name, sub_field_def) in type_fields {
                        let sub_val = object.get(sub_field_name);
                        if sub_field_def.required
                            && (sub_val.is_none() || sub_val == Some(&serde_json::Value::Null))
                        {
                            add_issue(
                                result,
                                strict,
                                format!(
                                    "Field '{field_name}.{sub_field_name}' is required in type '{type_name_str}'"
                                ),
                            );
                        }
                    }
                } else {
                    add_issue(
                        result,
                        strict,
                        format!(
                            "Field '{field_name}' expected object (type '{type_name_str}'), got {}",
                            type_name(value)
                        ),
                    );
                }
            }
        }
    }
}

/// A reference value is a document path string whose collection name is
/// one of the declared targets.
fn validate_reference(
    field_name: &str,
    field_def: &FieldDefinition,
    value: &serde_json::Value,
    strict: bool,
    result: &mut ValidationResult,
) {
    let raw = match value.as_str() {
        Some(s) => s,
        None => {
            add_issue(
                result,
                strict,
                format!(
                    "Field '{field_name}' (reference) expected a document path string, got {}",
                    type_name(value)
                ),
            );
            return;
        }
    };

    let segments = match path::split_path(raw) {
        Ok(segments) => segments,
        Err(_) => {
            add_issue(
                result,
                strict,
                format!("Field '{field_name}' reference '{raw}' is not a valid path"),
            );
            return;
        }
    };
    if PathKind::of_len(segments.len()) != Some(PathKind::Document)
        || segments.iter().any(Segment::is_wildcard)
    {
        add_issue(
            result,
            strict,
            format!("Field '{field_name}' reference '{raw}' must address a document"),
        );
        return;
    }

    if let Some(target) = &field_def.target {
        let collection_name = match &segments[segments.len() - 2] {
            Segment::Literal(s) => s.as_str(),
            Segment::Wildcard { .. } => unreachable!("wildcards rejected above"),
        };
        if !target.targets().contains(&collection_name) {
            add_issue(
                result,
                strict,
                format!(
                    "Field '{field_name}' reference '{raw}' targets collection '{collection_name}', expected one of {:?}",
                    target.targets()
                ),
            );
        }
    }
}

fn simple_type_matches(item_type: &str, value: &serde_json::Value) -> bool {
    match item_type {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "map" => value.is_object(),
        // Unknown item types are not this function's problem
        _ => true,
    }
}

fn add_issue(result: &mut ValidationResult, strict: bool, message: String) {
    if strict {
        result.errors.push(message);
    } else {
        result.warnings.push(message);
    }
}

fn type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "list",
        serde_json::Value::Object(_) => "map",
    }
}

/// Validate and apply defaults. Returns an error if strict validation
/// fails; warnings are returned for the caller to log.
pub fn validate_and_prepare(
    schema: &SchemaDefinition,
    doc_schema: &DocumentSchema,
    data: &mut serde_json::Value,
) -> Result<Vec<String>> {
    apply_defaults(doc_schema, data);
    let result = validate_document(schema, doc_schema, data);

    if !result.is_ok() {
        return Err(ArborDbError::Validation(format!(
            "Document validation failed:\n  - {}",
            result.errors.join("\n  - ")
        )));
    }

    Ok(result.warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_schema_str;
    use serde_json::json;

    fn test_schema() -> SchemaDefinition {
        parse_schema_str(
            r#"
types:
  address:
    street: { type: string, required: true }
    city: { type: string, required: true }
    zip: { type: string }

collections:
  users:
    documents:
      "{userId}":
        strict: true
        additional_properties: false
        fields:
          name: { type: string, required: true }
          email: { type: string, required: true }
          role: { type: string, enum: [admin, member, guest], default: member }
          joined: { type: timestamp }
          home: { type: address }
          location: { type: geopoint }
          tags: { type: list, items: string }
  posts:
    documents:
      "{postId}":
        strict: true
        fields:
          title: { type: string, required: true }
          author: { type: reference, target: users, required: true }
  events:
    documents:
      "{eventId}":
        fields:
          kind: { type: string, required: true }
"#,
        )
        .unwrap()
    }

    fn users_doc(schema: &SchemaDefinition) -> &DocumentSchema {
        schema.collections["users"].document("alice").unwrap()
    }

    #[test]
    fn test_valid_document() {
        let schema = test_schema();
        let data = json!({ "name": "Alice", "email": "alice@test.com", "role": "admin" });
        let result = validate_document(&schema, users_doc(&schema), &data);
        assert!(result.is_ok(), "Errors: {:?}", result.errors);
    }

    #[test]
    fn test_missing_required_field() {
        let schema = test_schema();
        let data = json!({ "name": "Alice" });
        let result = validate_document(&schema, users_doc(&schema), &data);
        assert!(!result.is_ok());
        assert!(result.errors.iter().any(|e| e.contains("email")));
    }

    #[test]
    fn test_invalid_enum_value() {
        let schema = test_schema();
        let data = json!({ "name": "Alice", "email": "a@test.com", "role": "superadmin" });
        let result = validate_document(&schema, users_doc(&schema), &data);
        assert!(result.errors.iter().any(|e| e.contains("superadmin")));
    }

    #[test]
    fn test_timestamp_validation() {
        let schema = test_schema();
        let good = json!({ "name": "A", "email": "a@t", "joined": "2026-01-05T10:30:00Z" });
        assert!(validate_document(&schema, users_doc(&schema), &good).is_ok());

        let bad = json!({ "name": "A", "email": "a@t", "joined": "last tuesday" });
        let result = validate_document(&schema, users_doc(&schema), &bad);
        assert!(result.errors.iter().any(|e| e.contains("joined")));
    }

    #[test]
    fn test_geopoint_validation() {
        let schema = test_schema();
        let good = json!({
            "name": "A", "email": "a@t",
            "location": { "latitude": 59.9, "longitude": 10.7 }
        });
        assert!(validate_document(&schema, users_doc(&schema), &good).is_ok());

        let bad = json!({ "name": "A", "email": "a@t", "location": { "latitude": 59.9 } });
        assert!(!validate_document(&schema, users_doc(&schema), &bad).is_ok());
    }

    #[test]
    fn test_reference_validation() {
        let schema = test_schema();
        let posts = schema.collections["posts"].document("p1").unwrap();

        let good = json!({ "title": "Hi", "author": "users/alice" });
        assert!(validate_document(&schema, posts, &good).is_ok());

        // Wrong parity: addresses a collection
        let collection = json!({ "title": "Hi", "author": "users" });
        assert!(!validate_document(&schema, posts, &collection).is_ok());

        // Wrong target collection
        let wrong = json!({ "title": "Hi", "author": "events/e1" });
        let result = validate_document(&schema, posts, &wrong);
        assert!(result.errors.iter().any(|e| e.contains("users")));
    }

    #[test]
    fn test_list_item_types() {
        let schema = test_schema();
        let bad = json!({ "name": "A", "email": "a@t", "tags": ["ok", 7] });
        let result = validate_document(&schema, users_doc(&schema), &bad);
        assert!(result.errors.iter().any(|e| e.contains("tags[1]")));
    }

    #[test]
    fn test_additional_properties_rejected() {
        let schema = test_schema();
        let data = json!({ "name": "A", "email": "a@t", "extra": true });
        let result = validate_document(&schema, users_doc(&schema), &data);
        assert!(result.errors.iter().any(|e| e.contains("extra")));
    }

    #[test]
    fn test_non_strict_mode_warns() {
        let schema = test_schema();
        let events = schema.collections["events"].document("e1").unwrap();
        let data = json!({ "kind": 42 });
        let result = validate_document(&schema, events, &data);
        assert!(result.is_ok());
        assert!(result.has_warnings());
    }

    #[test]
    fn test_custom_type_validation() {
        let schema = test_schema();
        let data = json!({ "name": "A", "email": "a@t", "home": { "city": "Oslo" } });
        let result = validate_document(&schema, users_doc(&schema), &data);
        assert!(result.errors.iter().any(|e| e.contains("street")));
    }

    #[test]
    fn test_apply_defaults() {
        let schema = test_schema();
        let mut data = json!({ "name": "A", "email": "a@t" });
        apply_defaults(users_doc(&schema), &mut data);
        assert_eq!(data["role"], "member");
    }

    #[test]
    fn test_apply_defaults_does_not_overwrite() {
        let schema = test_schema();
        let mut data = json!({ "name": "A", "email": "a@t", "role": "admin" });
        apply_defaults(users_doc(&schema), &mut data);
        assert_eq!(data["role"], "admin");
    }

    #[test]
    fn test_validate_and_prepare() {
        let schema = test_schema();
        let mut data = json!({ "name": "A", "email": "a@t" });
        let warnings = validate_and_prepare(&schema, users_doc(&schema), &mut data).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(data["role"], "member");

        let mut invalid = json!({ "name": "A" });
        assert!(validate_and_prepare(&schema, users_doc(&schema), &mut invalid).is_err());
    }

    #[test]
    fn test_validate_partial_skips_required() {
        let schema = test_schema();
        // Only role is supplied; missing name/email is fine for a merge
        let partial = json!({ "role": "admin" });
        let result = validate_partial(&schema, users_doc(&schema), &partial);
        assert!(result.is_ok(), "Errors: {:?}", result.errors);

        // Present fields are still type-checked
        let bad = json!({ "role": "superadmin" });
        let result = validate_partial(&schema, users_doc(&schema), &bad);
        assert!(!result.is_ok());
    }
}
