use arbordb::schema::{FieldDefinition, FieldType, ItemType, RefTarget};
use heck::{ToPascalCase, ToSnakeCase};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};

/// Struct name for a collection's documents, prefixed with its ancestor
/// collections so nested names never collide.
/// e.g. ([], "users") -> "User", (["users"], "posts") -> "UserPost"
pub fn struct_name(ancestors: &[&str], collection_name: &str) -> String {
    let mut name = String::new();
    for ancestor in ancestors {
        name.push_str(&singularize(ancestor).to_pascal_case());
    }
    name.push_str(&singularize(collection_name).to_pascal_case());
    name
}

/// Accessor method name: singular ancestors joined with the plural
/// collection name. e.g. (["users"], "posts") -> "user_posts"
pub fn method_name(ancestors: &[&str], collection_name: &str) -> String {
    let mut parts: Vec<String> = ancestors
        .iter()
        .map(|a| singularize(a).to_snake_case())
        .collect();
    parts.push(collection_name.to_snake_case());
    parts.join("_")
}

/// Parameter name for an ancestor document ID.
/// e.g. "users" -> "user_id"
pub fn id_param_name(collection_name: &str) -> String {
    format!("{}_id", singularize(collection_name).to_snake_case())
}

/// Enum name for a field with enum values.
/// e.g. ("User", "role") -> "UserRole"
pub fn enum_type_name(struct_name: &str, field_name: &str) -> String {
    format!("{}{}", struct_name, field_name.to_pascal_case())
}

/// Polymorphic reference enum name.
/// e.g. "parent" -> "ParentRef"
pub fn ref_enum_name(field_name: &str) -> String {
    format!("{}Ref", field_name.to_pascal_case())
}

/// Partial struct name. e.g. "User" -> "UserPartial"
pub fn partial_struct_name(struct_name: &str) -> String {
    format!("{struct_name}Partial")
}

/// Map a schema field to its Rust type as a TokenStream.
/// `owner` is the owning struct name, used for naming generated enums.
pub fn field_to_rust_type(
    field: &FieldDefinition,
    owner: &str,
    field_name: &str,
    known_types: &[String],
) -> TokenStream {
    let base_type = field_base_type(field, owner, field_name, known_types);

    // Wrap in Option if not required and no default; lists default to empty
    if !field.required && field.default.is_none() {
        match &field.field_type {
            FieldType::List => base_type,
            _ => quote! { Option<#base_type> },
        }
    } else {
        base_type
    }
}

/// The base Rust type (without Option wrapping) for a field.
pub fn field_base_type(
    field: &FieldDefinition,
    owner: &str,
    field_name: &str,
    known_types: &[String],
) -> TokenStream {
    if field.enum_values.is_some() {
        let ident = format_ident!("{}", enum_type_name(owner, field_name));
        return quote! { #ident };
    }

    match &field.field_type {
        FieldType::String => quote! { String },
        FieldType::Number => quote! { f64 },
        FieldType::Boolean => quote! { bool },
        FieldType::Timestamp => quote! { chrono::DateTime<chrono::Utc> },
        FieldType::Geopoint => quote! { arbordb::GeoPoint },
        FieldType::Map => quote! { serde_json::Value },
        FieldType::List => {
            let item_type = list_item_type(field, known_types);
            quote! { Vec<#item_type> }
        }
        FieldType::Reference => ref_rust_type(field, field_name),
        FieldType::Custom(type_name) => {
            if known_types.contains(type_name) {
                let ident = format_ident!("{}", type_name.to_pascal_case());
                quote! { #ident }
            } else {
                quote! { serde_json::Value }
            }
        }
    }
}

fn list_item_type(field: &FieldDefinition, known_types: &[String]) -> TokenStream {
    match &field.items {
        Some(ItemType::Simple(s)) => match s.as_str() {
            "string" => quote! { String },
            "number" => quote! { f64 },
            "boolean" => quote! { bool },
            "timestamp" => quote! { chrono::DateTime<chrono::Utc> },
            "geopoint" => quote! { arbordb::GeoPoint },
            "map" => quote! { serde_json::Value },
            other => {
                if known_types.contains(&other.to_string()) {
                    let ident = format_ident!("{}", other.to_pascal_case());
                    quote! { #ident }
                } else {
                    quote! { serde_json::Value }
                }
            }
        },
        Some(ItemType::Complex(inner)) => match &inner.field_type {
            // Lists of references hold document paths
            FieldType::Reference => quote! { String },
            _ => quote! { serde_json::Value },
        },
        None => quote! { serde_json::Value },
    }
}

fn ref_rust_type(field: &FieldDefinition, field_name: &str) -> TokenStream {
    match &field.target {
        Some(RefTarget::Multiple(_)) => {
            let ident = format_ident!("{}", ref_enum_name(field_name));
            quote! { #ident }
        }
        // Single-target references are bare document paths
        _ => quote! { String },
    }
}

/// Naive singularization of English words.
pub fn singularize(word: &str) -> String {
    let w = word.to_lowercase();
    if w.ends_with("ies") {
        format!("{}y", &w[..w.len() - 3])
    } else if w.ends_with("ses") || w.ends_with("xes") || w.ends_with("zes") {
        w[..w.len() - 2].to_string()
    } else if w.ends_with("ves") {
        format!("{}f", &w[..w.len() - 3])
    } else if w.ends_with('s') && !w.ends_with("ss") {
        w[..w.len() - 1].to_string()
    } else {
        w
    }
}

/// Check if a field name is a Rust keyword and needs raw identifier syntax.
pub fn safe_field_ident(name: &str) -> proc_macro2::Ident {
    match name {
        "type" | "struct" | "enum" | "fn" | "let" | "mut" | "ref" | "self" | "super" | "crate"
        | "mod" | "use" | "pub" | "impl" | "trait" | "for" | "loop" | "while" | "if" | "else"
        | "match" | "return" | "break" | "continue" | "as" | "in" | "where" | "async"
        | "await" | "dyn" | "move" | "static" | "const" | "unsafe" | "extern" | "true"
        | "false" | "abstract" | "become" | "box" | "do" | "final" | "macro" | "override"
        | "priv" | "typeof" | "unsized" | "virtual" | "yield" | "try" => {
            format_ident!("r#{}", name)
        }
        _ => format_ident!("{}", name.to_snake_case()),
    }
}

/// Convert an enum value string to a variant identifier.
pub fn enum_variant_ident(value: &str) -> proc_macro2::Ident {
    format_ident!("{}", value.to_pascal_case())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singularize() {
        assert_eq!(singularize("users"), "user");
        assert_eq!(singularize("posts"), "post");
        assert_eq!(singularize("categories"), "category");
        assert_eq!(singularize("addresses"), "address");
        assert_eq!(singularize("wiki"), "wiki");
    }

    #[test]
    fn test_struct_name() {
        assert_eq!(struct_name(&[], "users"), "User");
        assert_eq!(struct_name(&["users"], "posts"), "UserPost");
        assert_eq!(struct_name(&["users", "posts"], "comments"), "UserPostComment");
    }

    #[test]
    fn test_method_name() {
        assert_eq!(method_name(&[], "users"), "users");
        assert_eq!(method_name(&["users"], "posts"), "user_posts");
        assert_eq!(
            method_name(&["users", "posts"], "comments"),
            "user_post_comments"
        );
    }

    #[test]
    fn test_id_param_name() {
        assert_eq!(id_param_name("users"), "user_id");
        assert_eq!(id_param_name("posts"), "post_id");
    }

    #[test]
    fn test_enum_type_name() {
        assert_eq!(enum_type_name("User", "role"), "UserRole");
        assert_eq!(enum_type_name("UserPost", "status"), "UserPostStatus");
    }

    #[test]
    fn test_safe_field_ident() {
        assert_eq!(safe_field_ident("type").to_string(), "r#type");
        assert_eq!(safe_field_ident("name").to_string(), "name");
    }
}
