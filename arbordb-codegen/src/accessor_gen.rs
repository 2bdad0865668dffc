use arbordb::schema::{is_catch_all_key, CollectionSchema, SchemaDefinition};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use std::collections::{HashMap, HashSet};

use crate::struct_gen::document_struct_name;
use crate::type_utils::{id_param_name, method_name, struct_name};

/// Generate the `DatabaseExt` trait with a typed accessor for every
/// collection at every depth, plus the `TypedCollection` wrapper they
/// return. Nested accessors take one ID parameter per ancestor document.
pub fn generate_database_ext(schema: &SchemaDefinition) -> TokenStream {
    let mut trait_methods = Vec::new();
    let mut impl_methods = Vec::new();
    let mut seen = HashSet::new();

    walk(
        &schema.collections,
        &[],
        &mut seen,
        &mut trait_methods,
        &mut impl_methods,
    );

    quote! {
        /// A typed wrapper around an arbordb collection reference.
        pub struct TypedCollection<'a, C: arbordb::DocumentStore, T> {
            inner: arbordb::CollectionRef<'a, C>,
            _marker: std::marker::PhantomData<T>,
        }

        impl<'a, C: arbordb::DocumentStore, T> TypedCollection<'a, C, T> {
            pub fn new(inner: arbordb::CollectionRef<'a, C>) -> Self {
                Self {
                    inner,
                    _marker: std::marker::PhantomData,
                }
            }

            /// The untyped reference underneath.
            pub fn raw(&self) -> &arbordb::CollectionRef<'a, C> {
                &self.inner
            }

            pub fn doc(&self, id: &str) -> arbordb::Result<arbordb::DocumentRef<'a, C>> {
                self.inner.doc(id)
            }
        }

        impl<'a, C, T> TypedCollection<'a, C, T>
        where
            C: arbordb::DocumentStore,
            T: serde::Serialize + serde::de::DeserializeOwned,
        {
            pub fn get(&self, id: &str) -> arbordb::Result<Option<T>> {
                self.inner.doc(id)?.get_as()
            }

            pub fn list(&self) -> arbordb::Result<Vec<(String, T)>> {
                let snapshots = self.inner.get_documents()?;
                let mut out = Vec::with_capacity(snapshots.len());
                for snapshot in snapshots {
                    out.push((snapshot.id().to_string(), snapshot.data_as()?));
                }
                Ok(out)
            }

            pub fn add(&self, value: &T) -> arbordb::Result<String> {
                Ok(self.inner.add_typed(value)?.id().to_string())
            }

            pub fn set(&self, id: &str, value: &T) -> arbordb::Result<()> {
                self.inner.doc(id)?.set_typed(value)
            }

            /// Merge a partial value into an existing document.
            pub fn merge<P: serde::Serialize>(&self, id: &str, partial: &P) -> arbordb::Result<()> {
                self.inner.doc(id)?.update(serde_json::to_value(partial)?)
            }

            pub fn delete(&self, id: &str) -> arbordb::Result<()> {
                self.inner.doc(id)?.delete()
            }
        }

        /// Typed accessors for every collection declared in the schema.
        pub trait DatabaseExt<C: arbordb::DocumentStore> {
            #(#trait_methods)*
        }

        impl<C: arbordb::DocumentStore> DatabaseExt<C> for arbordb::Database<C> {
            #(#impl_methods)*
        }
    }
}

fn walk(
    tree: &HashMap<String, CollectionSchema>,
    ancestors: &[&str],
    seen: &mut HashSet<String>,
    trait_methods: &mut Vec<TokenStream>,
    impl_methods: &mut Vec<TokenStream>,
) {
    let mut collections: Vec<_> = tree.iter().collect();
    collections.sort_by(|(a, _), (b, _)| a.cmp(b));

    for (collection_name, collection) in collections {
        let method = method_name(ancestors, collection_name);

        if let Some(element) = element_struct(ancestors, collection_name, collection) {
            if seen.insert(method.clone()) {
                let method_ident = format_ident!("{}", method);
                let element_ident = format_ident!("{}", element);

                let params: Vec<_> = ancestors
                    .iter()
                    .map(|a| format_ident!("{}", id_param_name(a)))
                    .collect();

                let body = if ancestors.is_empty() {
                    quote! { self.collection(#collection_name) }
                } else {
                    let base = ancestors[0];
                    let mut extras: Vec<TokenStream> = Vec::new();
                    for (index, param) in params.iter().enumerate() {
                        extras.push(quote! { #param });
                        if index + 1 < ancestors.len() {
                            let next = ancestors[index + 1];
                            extras.push(quote! { #next });
                        }
                    }
                    extras.push(quote! { #collection_name });
                    quote! { self.collection_at(#base, &[#(#extras),*]) }
                };

                trait_methods.push(quote! {
                    fn #method_ident(&self #(, #params: &str)*) -> arbordb::Result<TypedCollection<'_, C, #element_ident>>;
                });
                impl_methods.push(quote! {
                    fn #method_ident(&self #(, #params: &str)*) -> arbordb::Result<TypedCollection<'_, C, #element_ident>> {
                        Ok(TypedCollection::new(#body?))
                    }
                });
            }
        }

        let mut child_ancestors: Vec<&str> = ancestors.to_vec();
        child_ancestors.push(collection_name);
        let mut documents: Vec<_> = collection.documents.iter().collect();
        documents.sort_by(|(a, _), (b, _)| a.cmp(b));
        for (_, document) in documents {
            walk(
                &document.collections,
                &child_ancestors,
                seen,
                trait_methods,
                impl_methods,
            );
        }
    }
}

/// The element type of a collection's typed accessor: the catch-all
/// document entry when present, the sole entry otherwise. Collections
/// with several literal document shapes get no typed accessor.
fn element_struct(
    ancestors: &[&str],
    collection_name: &str,
    collection: &CollectionSchema,
) -> Option<String> {
    let base = struct_name(ancestors, collection_name);
    if let Some((key, _)) = collection
        .documents
        .iter()
        .find(|(key, _)| is_catch_all_key(key))
    {
        return Some(document_struct_name(&base, key));
    }
    if collection.documents.len() == 1 {
        let key = collection.documents.keys().next().expect("one entry");
        return Some(document_struct_name(&base, key));
    }
    None
}
