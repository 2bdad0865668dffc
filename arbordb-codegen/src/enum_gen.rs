use arbordb::schema::{
    CollectionSchema, DocumentSchema, FieldDefinition, RefTarget, SchemaDefinition,
};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use std::collections::{HashMap, HashSet};

use crate::struct_gen::document_struct_name;
use crate::type_utils::{enum_type_name, enum_variant_ident, ref_enum_name, struct_name};

/// Generate all enum types from the schema:
/// 1. Value enums for fields with `enum` values (e.g. UserRole)
/// 2. Polymorphic reference enums for multi-target reference fields
pub fn generate_enums(schema: &SchemaDefinition) -> TokenStream {
    let mut tokens = TokenStream::new();
    let mut generated_refs = HashSet::new();
    walk(&schema.collections, &[], &mut generated_refs, &mut tokens);
    tokens
}

fn walk(
    tree: &HashMap<String, CollectionSchema>,
    ancestors: &[&str],
    generated_refs: &mut HashSet<String>,
    out: &mut TokenStream,
) {
    let mut collections: Vec<_> = tree.iter().collect();
    collections.sort_by(|(a, _), (b, _)| a.cmp(b));

    for (collection_name, collection) in collections {
        let base_name = struct_name(ancestors, collection_name);

        let mut documents: Vec<_> = collection.documents.iter().collect();
        documents.sort_by(|(a, _), (b, _)| a.cmp(b));

        for (doc_key, document) in documents {
            let owner = document_struct_name(&base_name, doc_key);
            out.extend(generate_document_enums(&owner, document, generated_refs));

            let mut child_ancestors: Vec<&str> = ancestors.to_vec();
            child_ancestors.push(collection_name);
            walk(&document.collections, &child_ancestors, generated_refs, out);
        }
    }
}

fn generate_document_enums(
    owner: &str,
    document: &DocumentSchema,
    generated_refs: &mut HashSet<String>,
) -> TokenStream {
    let mut tokens = TokenStream::new();

    let mut fields: Vec<_> = document.fields.iter().collect();
    fields.sort_by(|(a, _), (b, _)| a.cmp(b));

    for (field_name, field_def) in &fields {
        if let Some(enum_values) = &field_def.enum_values {
            tokens.extend(generate_value_enum(owner, field_name, enum_values, field_def));
        }

        if let Some(RefTarget::Multiple(targets)) = &field_def.target {
            let name = ref_enum_name(field_name);
            // Two multi-target fields with the same name share one enum
            if generated_refs.insert(name.clone()) {
                tokens.extend(generate_ref_enum(&name, targets));
            }
        }
    }

    tokens
}

fn generate_value_enum(
    owner: &str,
    field_name: &str,
    enum_values: &[String],
    field_def: &FieldDefinition,
) -> TokenStream {
    let enum_ident = format_ident!("{}", enum_type_name(owner, field_name));

    let variants: Vec<_> = enum_values
        .iter()
        .map(|value| {
            let variant = enum_variant_ident(value);
            quote! {
                #[serde(rename = #value)]
                #variant,
            }
        })
        .collect();

    let mut tokens = quote! {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum #enum_ident {
            #(#variants)*
        }
    };

    if let Some(default) = field_def.default.as_ref().and_then(|d| d.as_str()) {
        let default_variant = enum_variant_ident(default);
        tokens.extend(quote! {
            impl Default for #enum_ident {
                fn default() -> Self {
                    #enum_ident::#default_variant
                }
            }
        });
    }

    tokens
}

/// A polymorphic reference: one variant per target collection group, each
/// holding the referenced document path.
fn generate_ref_enum(name: &str, targets: &[String]) -> TokenStream {
    let enum_ident = format_ident!("{}", name);

    let variants: Vec<_> = targets
        .iter()
        .map(|target| {
            let variant = enum_variant_ident(&crate::type_utils::singularize(target));
            quote! {
                #variant(String),
            }
        })
        .collect();

    quote! {
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(untagged)]
        pub enum #enum_ident {
            #(#variants)*
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbordb::schema::parse_schema_str;

    #[test]
    fn test_value_enum_with_default() {
        let schema = parse_schema_str(
            r#"
collections:
  users:
    documents:
      "{userId}":
        fields:
          role: { type: string, enum: [admin, member, guest], default: member }
"#,
        )
        .unwrap();

        let code = generate_enums(&schema).to_string();
        assert!(code.contains("pub enum UserRole"));
        assert!(code.contains("Admin"));
        assert!(code.contains("impl Default for UserRole"));
        assert!(code.contains("UserRole :: Member"));
    }

    #[test]
    fn test_ref_enum_for_multi_target() {
        let schema = parse_schema_str(
            r#"
collections:
  comments:
    documents:
      "{commentId}":
        fields:
          parent: { type: reference, target: [posts, comments] }
"#,
        )
        .unwrap();

        let code = generate_enums(&schema).to_string();
        assert!(code.contains("pub enum ParentRef"));
        assert!(code.contains("Post (String)"));
        assert!(code.contains("Comment (String)"));
    }

    #[test]
    fn test_nested_enum_owner_names() {
        let schema = parse_schema_str(
            r#"
collections:
  users:
    documents:
      "{userId}":
        collections:
          posts:
            documents:
              "{postId}":
                fields:
                  status: { type: string, enum: [draft, published] }
"#,
        )
        .unwrap();

        let code = generate_enums(&schema).to_string();
        assert!(code.contains("pub enum UserPostStatus"));
    }
}
