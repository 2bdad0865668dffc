pub mod schema;
pub mod path;
pub mod resolve;
pub mod group;
pub mod client;
pub mod memory;
pub mod store;
pub mod validation;
pub mod error;

pub use error::{ArborDbError, Result};
pub use schema::SchemaDefinition;
pub use client::{DocumentStore, GeoPoint, Snapshot};
pub use memory::MemoryStore;
pub use path::{CollectionPath, DocumentPath};
pub use store::{CollectionRef, Database, DocumentRef, QueryRef};
