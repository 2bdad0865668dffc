//! ArborDB code generation - generates Rust types from schema.yaml at compile time.
//!
//! The main entry point is [`generate_from_schema`], which reads a schema.yaml
//! and writes a complete Rust source file with typed structs, enums, and
//! database accessors.

mod accessor_gen;
mod enum_gen;
mod generator;
mod struct_gen;
pub mod type_utils;

use std::path::Path;

/// Generate Rust types from a schema.yaml file.
///
/// Reads the schema at `schema_path`, generates typed Rust code, and writes
/// the output to `output_path`. This is intended to be called from a `build.rs`
/// build script.
///
/// # Example
///
/// ```no_run
/// // In build.rs:
/// arbordb_codegen::generate_from_schema("schema.yaml", "src/generated.rs").unwrap();
/// ```
pub fn generate_from_schema(
    schema_path: &str,
    output_path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(Path::new(schema_path))?;
    let formatted = generate_from_schema_str(&content)?;
    std::fs::write(output_path, formatted)?;
    Ok(())
}

/// Generate Rust types from a schema YAML string.
///
/// Like [`generate_from_schema`] but takes the schema content directly
/// instead of reading from a file. Useful for testing.
pub fn generate_from_schema_str(
    schema_yaml: &str,
) -> Result<String, Box<dyn std::error::Error>> {
    let schema = arbordb::schema::parse_schema_str(schema_yaml)?;
    let tokens = generator::generate_all(&schema);
    let hash = arbordb::schema::hash_schema(schema_yaml);
    let header = format!(
        "// Generated by arbordb-codegen (schema {hash}). Do not edit by hand.\n\n"
    );
    Ok(format!("{header}{}", generator::format_token_stream(&tokens)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SCHEMA: &str = r#"
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
        fields:
          name: { type: string, required: true }
          email: { type: string, required: true }
          role: { type: string, enum: [admin, member, guest], default: member }
          home: { type: address }
          joined: { type: timestamp }
          location: { type: geopoint }
        collections:
          posts:
            id: { auto: ulid }
            documents:
              "{postId}":
                strict: true
                fields:
                  title: { type: string, required: true }
                  status: { type: string, enum: [draft, published, archived], default: draft }
                  tags: { type: list, items: string }
                collections:
                  comments:
                    documents:
                      "{commentId}":
                        fields:
                          body: { type: string, required: true }
                          parent: { type: reference, target: [posts, comments] }
  events:
    documents:
      "{eventId}":
        fields:
          type: { type: string, required: true }
          payload: { type: map }
"#;

    #[test]
    fn test_generate_from_schema_str_full() {
        let result = generate_from_schema_str(TEST_SCHEMA);
        assert!(result.is_ok(), "Generation failed: {:?}", result.err());

        let code = result.unwrap();

        // Verify it's valid Rust
        assert!(
            syn::parse_file(&code).is_ok(),
            "Generated code is not valid Rust:\n{}",
            &code[..code.len().min(2000)]
        );

        // Document structs at every depth
        assert!(code.contains("pub struct User"), "Missing User struct");
        assert!(code.contains("pub struct UserPost"), "Missing UserPost struct");
        assert!(
            code.contains("pub struct UserPostComment"),
            "Missing UserPostComment struct"
        );
        assert!(code.contains("pub struct Event"), "Missing Event struct");

        // Reusable types
        assert!(code.contains("pub struct Address"), "Missing Address struct");

        // Enums and their defaults
        assert!(code.contains("pub enum UserRole"), "Missing UserRole enum");
        assert!(
            code.contains("pub enum UserPostStatus"),
            "Missing UserPostStatus enum"
        );
        assert!(
            code.contains("impl Default for UserRole"),
            "Missing UserRole Default impl"
        );

        // Polymorphic reference
        assert!(code.contains("ParentRef"), "Missing ParentRef enum");

        // Partial structs
        assert!(code.contains("pub struct UserPartial"), "Missing UserPartial");
        assert!(
            code.contains("pub struct UserPostPartial"),
            "Missing UserPostPartial"
        );

        // Accessor surface
        assert!(code.contains("trait DatabaseExt"), "Missing DatabaseExt trait");
        assert!(code.contains("fn users"), "Missing users accessor");
        assert!(code.contains("fn user_posts"), "Missing user_posts accessor");
        assert!(
            code.contains("fn user_post_comments"),
            "Missing user_post_comments accessor"
        );
        assert!(code.contains("fn events"), "Missing events accessor");

        // Header carries the schema fingerprint
        assert!(code.starts_with("// Generated by arbordb-codegen"));
    }

    #[test]
    fn test_generate_minimal_schema() {
        let schema = r#"
collections:
  items:
    documents:
      "{itemId}":
        fields:
          name: { type: string, required: true }
"#;
        let result = generate_from_schema_str(schema);
        assert!(result.is_ok(), "Generation failed: {:?}", result.err());

        let code = result.unwrap();
        assert!(syn::parse_file(&code).is_ok(), "Not valid Rust");
        assert!(code.contains("pub struct Item"));
        assert!(code.contains("pub struct ItemPartial"));
    }

    #[test]
    fn test_generate_all_field_types() {
        let schema = r#"
collections:
  records:
    documents:
      "{recordId}":
        fields:
          name: { type: string, required: true }
          count: { type: number, required: true }
          active: { type: boolean, required: true }
          updated: { type: timestamp }
          place: { type: geopoint }
          owner: { type: reference, target: records }
          tags: { type: list, items: string }
          metadata: { type: map }
"#;
        let result = generate_from_schema_str(schema);
        assert!(result.is_ok(), "Generation failed: {:?}", result.err());

        let code = result.unwrap();
        assert!(
            syn::parse_file(&code).is_ok(),
            "Not valid Rust:\n{}",
            &code[..code.len().min(2000)]
        );

        assert!(code.contains("String"), "Missing String type");
        assert!(code.contains("f64"), "Missing f64 type");
        assert!(code.contains("bool"), "Missing bool type");
        assert!(code.contains("DateTime"), "Missing DateTime type");
        assert!(code.contains("GeoPoint"), "Missing GeoPoint type");
        assert!(code.contains("Vec"), "Missing Vec type");
        assert!(code.contains("serde_json"), "Missing serde_json::Value type");
    }

    #[test]
    fn test_rust_keyword_field_names() {
        let schema = r#"
collections:
  events:
    documents:
      "{eventId}":
        fields:
          type: { type: string, required: true }
          ref: { type: string }
"#;
        let result = generate_from_schema_str(schema);
        assert!(result.is_ok(), "Generation failed: {:?}", result.err());

        let code = result.unwrap();
        assert!(
            syn::parse_file(&code).is_ok(),
            "Not valid Rust:\n{}",
            &code[..code.len().min(2000)]
        );
        assert!(code.contains("r#type"), "Keyword field not escaped");
    }

    #[test]
    fn test_invalid_schema_fails() {
        let result = generate_from_schema_str("collections:\n  users:\n    documents:\n      \"{u}\":\n        fields:\n          home: { type: address }\n");
        assert!(result.is_err());
    }
}
