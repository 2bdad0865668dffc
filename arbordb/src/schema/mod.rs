mod parser;
mod types;

pub use parser::{hash_schema, parse_schema, parse_schema_str, verify_schema};
pub use types::{
    is_catch_all_key, AutoIdStrategy, CollectionSchema, DocumentSchema, FieldDefinition,
    FieldType, IdConfig, ItemType, RefTarget, SchemaDefinition,
};
