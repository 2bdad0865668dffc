use arbordb::schema::SchemaDefinition;
use proc_macro2::TokenStream;
use quote::quote;

use crate::{accessor_gen, enum_gen, struct_gen};

/// Assemble the complete generated module: imports, enums, document
/// structs, and the typed accessor surface.
pub fn generate_all(schema: &SchemaDefinition) -> TokenStream {
    let enums = enum_gen::generate_enums(schema);
    let structs = struct_gen::generate_structs(schema);
    let accessors = accessor_gen::generate_database_ext(schema);

    quote! {
        use serde::{Deserialize, Serialize};

        #enums
        #structs
        #accessors
    }
}

/// Pretty-print a token stream as a Rust source file.
pub fn format_token_stream(tokens: &TokenStream) -> String {
    match syn::parse2::<syn::File>(tokens.clone()) {
        Ok(file) => prettyplease::unparse(&file),
        // Unparseable output still gets written so the compiler error
        // points at the real problem
        Err(_) => tokens.to_string(),
    }
}
