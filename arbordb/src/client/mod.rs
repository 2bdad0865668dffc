// The consumed "document store client" capability: the minimal set of
// operations the schema layer needs from a backend. Everything here is
// pass-through territory; the wrapper adds no retries, no buffering,
// and no translation of client failures.

use crate::error::Result;
use crate::path::{CollectionPath, DocumentPath};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A point-in-time read of a document.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub path: DocumentPath,
    pub data: serde_json::Value,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

impl Snapshot {
    pub fn id(&self) -> &str {
        self.path.id()
    }

    /// Deserialize the document data into a typed value.
    ///
    /// No check is made that the data actually fits the schema the caller
    /// resolved it under; a wildcard union member may deserialize data
    /// shaped like a different member.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.data.clone())?)
    }
}

/// A latitude/longitude pair, one of the store's primitive field values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Comparison operator for a query filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    ArrayContains,
}

#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// What a query ranges over: one concrete collection, or every collection
/// sharing a name anywhere in the store (a collection group).
#[derive(Debug, Clone)]
pub enum QueryScope {
    Collection(CollectionPath),
    Group(String),
}

/// A narrowed read over a collection or collection group.
#[derive(Debug, Clone)]
pub struct Query {
    pub scope: QueryScope,
    pub filters: Vec<Filter>,
    pub order_by: Vec<OrderBy>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl Query {
    pub fn over(scope: QueryScope) -> Query {
        Query {
            scope,
            filters: Vec::new(),
            order_by: Vec::new(),
            offset: 0,
            limit: None,
        }
    }
}

/// Write precondition, checked atomically with the write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    None,
    MustExist,
}

/// A single deferred write, the unit of atomic commits.
#[derive(Debug, Clone)]
pub enum WriteOp {
    Set {
        path: DocumentPath,
        data: serde_json::Value,
        merge: bool,
    },
    Update {
        path: DocumentPath,
        data: serde_json::Value,
    },
    Delete {
        path: DocumentPath,
        precondition: Precondition,
    },
}

impl WriteOp {
    pub fn path(&self) -> &DocumentPath {
        match self {
            WriteOp::Set { path, .. } => path,
            WriteOp::Update { path, .. } => path,
            WriteOp::Delete { path, .. } => path,
        }
    }
}

/// The backend capability consumed by [`crate::store::Database`].
///
/// Implementations own all I/O concerns: consistency windows, contention
/// retries on commits (conventionally up to 5 attempts), and transaction
/// timeouts (conventionally 60s idle, 270s total). The schema layer
/// forwards calls unchanged and never retries on its behalf.
pub trait DocumentStore {
    /// Read a single document, or None when it does not exist.
    fn get_document(&self, path: &DocumentPath) -> Result<Option<Snapshot>>;

    /// Run a narrowed read and return the matching documents.
    fn run_query(&self, query: &Query) -> Result<Vec<Snapshot>>;

    /// Apply a set of writes atomically: either every write lands or none.
    fn commit(&self, writes: Vec<WriteOp>) -> Result<()>;

    /// List the names of the immediate child collections of a document,
    /// or of the store root when `parent` is None.
    fn list_collections(&self, parent: Option<&DocumentPath>) -> Result<Vec<String>>;
}
