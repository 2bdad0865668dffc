use arbordb::schema::{
    is_catch_all_key, CollectionSchema, DocumentSchema, FieldDefinition, FieldType,
    SchemaDefinition,
};
use heck::ToPascalCase;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use std::collections::HashMap;

use crate::type_utils::{
    field_base_type, field_to_rust_type, partial_struct_name, safe_field_ident, struct_name,
};

/// Generate document structs and partial structs for every collection at
/// every depth, plus structs for the reusable `types:` section.
pub fn generate_structs(schema: &SchemaDefinition) -> TokenStream {
    let mut tokens = TokenStream::new();

    let known_types: Vec<String> = schema.types.keys().cloned().collect();

    tokens.extend(generate_reusable_types(schema, &known_types));
    walk(&schema.collections, &[], "", &known_types, &mut tokens);
    tokens
}

fn walk(
    tree: &HashMap<String, CollectionSchema>,
    ancestors: &[&str],
    path_prefix: &str,
    known_types: &[String],
    out: &mut TokenStream,
) {
    // Sort collections for deterministic output
    let mut collections: Vec<_> = tree.iter().collect();
    collections.sort_by(|(a, _), (b, _)| a.cmp(b));

    for (collection_name, collection) in collections {
        let collection_path = if path_prefix.is_empty() {
            collection_name.clone()
        } else {
            format!("{path_prefix}/{collection_name}")
        };
        let base_name = struct_name(ancestors, collection_name);

        let mut documents: Vec<_> = collection.documents.iter().collect();
        documents.sort_by(|(a, _), (b, _)| a.cmp(b));

        for (doc_key, document) in documents {
            let name = document_struct_name(&base_name, doc_key);
            out.extend(generate_document_struct(
                &name,
                &collection_path,
                document,
                known_types,
            ));
            out.extend(generate_partial_struct(&name, document, known_types));

            let mut child_ancestors: Vec<&str> = ancestors.to_vec();
            child_ancestors.push(collection_name);
            let document_path = format!("{collection_path}/{doc_key}");
            walk(
                &document.collections,
                &child_ancestors,
                &document_path,
                known_types,
                out,
            );
        }
    }
}

/// The catch-all entry takes the bare name; literal document keys are
/// appended so sibling shapes stay distinct.
pub fn document_struct_name(base_name: &str, doc_key: &str) -> String {
    if is_catch_all_key(doc_key) {
        base_name.to_string()
    } else {
        format!("{base_name}{}", doc_key.to_pascal_case())
    }
}

/// Generate structs for reusable types defined in the `types:` section.
fn generate_reusable_types(schema: &SchemaDefinition, known_types: &[String]) -> TokenStream {
    let mut tokens = TokenStream::new();

    let mut types: Vec<_> = schema.types.iter().collect();
    types.sort_by(|(a, _), (b, _)| a.cmp(b));

    for (type_name, fields) in types {
        let struct_ident = format_ident!("{}", type_name.to_pascal_case());

        let mut field_entries: Vec<_> = fields.iter().collect();
        field_entries.sort_by(|(a, _), (b, _)| a.cmp(b));

        let field_tokens: Vec<_> = field_entries
            .iter()
            .map(|(field_name, field_def)| {
                let ident = safe_field_ident(field_name);
                let ty =
                    field_to_rust_type(field_def, &type_name.to_pascal_case(), field_name, known_types);
                generate_field_with_attrs(&ident, &ty, field_def, field_name)
            })
            .collect();

        tokens.extend(quote! {
            #[derive(Debug, Clone, Serialize, Deserialize)]
            pub struct #struct_ident {
                #(#field_tokens)*
            }
        });
    }

    tokens
}

fn generate_document_struct(
    name: &str,
    collection_path: &str,
    document: &DocumentSchema,
    known_types: &[String],
) -> TokenStream {
    let struct_ident = format_ident!("{}", name);
    let doc_comment = format!(" A document in the `{collection_path}` collection.");

    let mut fields: Vec<_> = document.fields.iter().collect();
    fields.sort_by(|(a, _), (b, _)| a.cmp(b));

    let field_tokens: Vec<_> = fields
        .iter()
        .map(|(field_name, field_def)| {
            let ident = safe_field_ident(field_name);
            let ty = field_to_rust_type(field_def, name, field_name, known_types);
            generate_field_with_attrs(&ident, &ty, field_def, field_name)
        })
        .collect();

    quote! {
        #[doc = #doc_comment]
        #[derive(Debug, Clone, Serialize, Deserialize)]
        pub struct #struct_ident {
            #(#field_tokens)*
        }
    }
}

/// Partial structs carry every field as an Option and skip absent fields
/// when serializing, so they serialize into merge-update bodies.
fn generate_partial_struct(
    name: &str,
    document: &DocumentSchema,
    known_types: &[String],
) -> TokenStream {
    let partial_ident = format_ident!("{}", partial_struct_name(name));

    let mut fields: Vec<_> = document.fields.iter().collect();
    fields.sort_by(|(a, _), (b, _)| a.cmp(b));

    let field_tokens: Vec<_> = fields
        .iter()
        .map(|(field_name, field_def)| {
            let ident = safe_field_ident(field_name);
            let base_ty = field_base_type(field_def, name, field_name, known_types);
            let serde_attr = generate_partial_serde_attr(field_name);
            quote! {
                #serde_attr
                pub #ident: Option<#base_ty>,
            }
        })
        .collect();

    quote! {
        #[derive(Debug, Clone, Default, Serialize, Deserialize)]
        pub struct #partial_ident {
            #(#field_tokens)*
        }
    }
}

fn generate_field_with_attrs(
    ident: &proc_macro2::Ident,
    ty: &TokenStream,
    field_def: &FieldDefinition,
    field_name: &str,
) -> TokenStream {
    let serde_attrs = generate_serde_attrs(field_def);

    let ident_str = ident.to_string();
    let rename_attr = if ident_str.starts_with("r#") || ident_str != field_name {
        Some(quote! { #[serde(rename = #field_name)] })
    } else {
        None
    };

    quote! {
        #rename_attr
        #serde_attrs
        pub #ident: #ty,
    }
}

fn generate_serde_attrs(field_def: &FieldDefinition) -> TokenStream {
    match &field_def.field_type {
        // Lists always get #[serde(default)]
        FieldType::List => quote! { #[serde(default)] },
        _ => {
            if field_def.default.is_some() {
                quote! { #[serde(default)] }
            } else if !field_def.required {
                quote! { #[serde(default, skip_serializing_if = "Option::is_none")] }
            } else {
                quote! {}
            }
        }
    }
}

fn generate_partial_serde_attr(field_name: &str) -> TokenStream {
    let ident_str = safe_field_ident(field_name).to_string();
    if ident_str.starts_with("r#") || ident_str != field_name {
        quote! {
            #[serde(rename = #field_name, default, skip_serializing_if = "Option::is_none")]
        }
    } else {
        quote! {
            #[serde(default, skip_serializing_if = "Option::is_none")]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbordb::schema::parse_schema_str;

    #[test]
    fn test_nested_struct_names() {
        let schema = parse_schema_str(
            r#"
collections:
  users:
    documents:
      "{userId}":
        fields:
          name: { type: string, required: true }
        collections:
          posts:
            documents:
              "{postId}":
                fields:
                  title: { type: string, required: true }
"#,
        )
        .unwrap();

        let code = generate_structs(&schema).to_string();
        assert!(code.contains("pub struct User"));
        assert!(code.contains("pub struct UserPost"));
        assert!(code.contains("pub struct UserPartial"));
        assert!(code.contains("pub struct UserPostPartial"));
    }

    #[test]
    fn test_literal_document_keys_get_suffixed_names() {
        let schema = parse_schema_str(
            r#"
collections:
  config:
    documents:
      limits:
        fields:
          max_items: { type: number, required: true }
      "{other}":
        fields:
          note: { type: string }
"#,
        )
        .unwrap();

        let code = generate_structs(&schema).to_string();
        assert!(code.contains("pub struct ConfigLimits"));
        assert!(code.contains("pub struct Config "));
    }

    #[test]
    fn test_document_struct_name() {
        assert_eq!(document_struct_name("User", "{userId}"), "User");
        assert_eq!(document_struct_name("Config", "limits"), "ConfigLimits");
    }
}
