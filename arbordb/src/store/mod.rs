use crate::client::{
    Direction, DocumentStore, Filter, FilterOp, OrderBy, Precondition, Query, QueryScope,
    Snapshot, WriteOp,
};
use crate::error::{ArborDbError, Result};
use crate::path::{self, CollectionPath, DocumentPath, PathKind, Segment};
use crate::resolve::resolve_path;
use crate::schema::{AutoIdStrategy, CollectionSchema, DocumentSchema, SchemaDefinition};
use crate::validation;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Upper bound on writes per atomic commit, matching the conventional
/// limit of hosted document stores.
pub const MAX_BATCH_WRITES: usize = 500;

/// The main entry point: attaches a schema definition to a document-store
/// client and hands out schema-aware references.
///
/// Reference construction is synchronous, pure, and side-effect free; all
/// I/O is delegated to the client unchanged.
pub struct Database<C: DocumentStore> {
    schema: SchemaDefinition,
    client: C,
    check_paths: bool,
}

impl<C: DocumentStore> Database<C> {
    pub fn new(schema: SchemaDefinition, client: C) -> Database<C> {
        Database {
            schema,
            client,
            check_paths: false,
        }
    }

    /// Enable runtime path checking: accessor paths whose literal segments
    /// do not resolve against the schema become synchronous errors instead
    /// of deferring to the store's not-found semantics.
    pub fn with_path_checking(mut self, check: bool) -> Database<C> {
        self.check_paths = check;
        self
    }

    pub fn schema(&self) -> &SchemaDefinition {
        &self.schema
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Reference a collection by its full slash-delimited path
    /// (odd segment count).
    pub fn collection(&self, path: &str) -> Result<CollectionRef<'_, C>> {
        let parsed = CollectionPath::parse(path)?;
        self.check_collection(&parsed)?;
        Ok(CollectionRef { db: self, path: parsed })
    }

    /// Reference a document by its full slash-delimited path
    /// (even segment count).
    pub fn doc(&self, path: &str) -> Result<DocumentRef<'_, C>> {
        let parsed = DocumentPath::parse(path)?;
        self.check_document(&parsed)?;
        Ok(DocumentRef { db: self, path: parsed })
    }

    /// Reference a collection from a base collection path plus extra
    /// alternating document/collection segments. The extras must come in
    /// an even count: each pair descends document-then-collection.
    pub fn collection_at(&self, base: &str, segments: &[&str]) -> Result<CollectionRef<'_, C>> {
        let built = self.build_path(base, segments, PathKind::Collection)?;
        match built {
            BuiltPath::Collection(path) => {
                self.check_collection(&path)?;
                Ok(CollectionRef { db: self, path })
            }
            BuiltPath::Document(_) => unreachable!("parity checked before descent"),
        }
    }

    /// Reference a document from a base collection path plus extra
    /// alternating segments. The extras must come in an odd count: the
    /// first names a document of the base collection.
    pub fn doc_at(&self, base: &str, segments: &[&str]) -> Result<DocumentRef<'_, C>> {
        let built = self.build_path(base, segments, PathKind::Document)?;
        match built {
            BuiltPath::Document(path) => {
                self.check_document(&path)?;
                Ok(DocumentRef { db: self, path })
            }
            BuiltPath::Collection(_) => unreachable!("parity checked before descent"),
        }
    }

    /// Reference every collection named `name`, at any depth.
    pub fn collection_group(&self, name: &str) -> Result<CollectionGroup<'_, C>> {
        path::validate_id(name)?;
        if self.check_paths
            && crate::group::find_collection_group(&self.schema, name)?.is_empty()
        {
            return Err(ArborDbError::UnknownKey {
                kind: "collection group",
                name: name.to_string(),
                at: "/".to_string(),
            });
        }
        Ok(CollectionGroup {
            db: self,
            name: name.to_string(),
        })
    }

    /// Start a batch of writes for one atomic commit.
    pub fn batch(&self) -> WriteBatch<'_, C> {
        WriteBatch {
            db: self,
            writes: Vec::new(),
        }
    }

    /// Run a read-then-write transaction. Reads pass through to the
    /// client; writes are buffered and committed atomically after the
    /// closure returns. Contention retries and timeouts are the client's
    /// concern, not replicated here.
    pub fn run_transaction<T>(
        &self,
        f: impl FnOnce(&mut Transaction<'_, C>) -> Result<T>,
    ) -> Result<T> {
        let mut tx = Transaction {
            db: self,
            writes: Vec::new(),
        };
        let out = f(&mut tx)?;
        if !tx.writes.is_empty() {
            self.client.commit(tx.writes)?;
        }
        Ok(out)
    }

    /// Names of the store's root-level collections.
    pub fn list_collections(&self) -> Result<Vec<String>> {
        self.client.list_collections(None)
    }

    /// Read several documents in one call.
    pub fn get_all(&self, refs: &[&DocumentRef<'_, C>]) -> Result<Vec<Option<Snapshot>>> {
        refs.iter()
            .map(|r| self.client.get_document(&r.path))
            .collect()
    }

    /// Delete a document and everything beneath it, in commit-sized
    /// chunks. The subtree is collected before any delete is issued.
    pub fn recursive_delete(&self, doc: &DocumentRef<'_, C>) -> Result<()> {
        let mut paths = Vec::new();
        self.collect_subtree(&doc.path, &mut paths)?;
        paths.push(doc.path.clone());
        self.delete_paths(paths)
    }

    /// Delete every document in a collection, including their subtrees.
    pub fn recursive_delete_collection(&self, collection: &CollectionRef<'_, C>) -> Result<()> {
        let snapshots = self
            .client
            .run_query(&Query::over(QueryScope::Collection(collection.path.clone())))?;
        let mut paths = Vec::new();
        for snapshot in snapshots {
            self.collect_subtree(&snapshot.path, &mut paths)?;
            paths.push(snapshot.path);
        }
        self.delete_paths(paths)
    }

    fn collect_subtree(&self, doc: &DocumentPath, out: &mut Vec<DocumentPath>) -> Result<()> {
        for name in self.client.list_collections(Some(doc))? {
            let collection = doc.collection(&name)?;
            let snapshots = self
                .client
                .run_query(&Query::over(QueryScope::Collection(collection)))?;
            for snapshot in snapshots {
                self.collect_subtree(&snapshot.path, out)?;
                out.push(snapshot.path);
            }
        }
        Ok(())
    }

    fn delete_paths(&self, paths: Vec<DocumentPath>) -> Result<()> {
        log::debug!("recursive delete of {} documents", paths.len());
        for chunk in paths.chunks(MAX_BATCH_WRITES) {
            let writes = chunk
                .iter()
                .map(|path| WriteOp::Delete {
                    path: path.clone(),
                    precondition: Precondition::None,
                })
                .collect();
            self.client.commit(writes)?;
        }
        Ok(())
    }

    /// The runtime path-segment builder: validate every supplied segment
    /// up front (fail fast, no partial traversal), then alternate
    /// document/collection descent from the base collection.
    fn build_path(&self, base: &str, segments: &[&str], kind: PathKind) -> Result<BuiltPath> {
        let base_path = CollectionPath::parse(base)?;
        for segment in segments {
            if segment.contains('/') {
                return Err(ArborDbError::MalformedSegment {
                    segment: segment.to_string(),
                });
            }
            if Segment::parse(segment).is_wildcard() {
                return Err(ArborDbError::WildcardSegment {
                    segment: segment.to_string(),
                });
            }
            path::validate_id(segment)?;
        }
        path::check_extra_parity(kind, segments.len())?;

        let mut current = BuiltPath::Collection(base_path);
        for segment in segments {
            current = match current {
                BuiltPath::Collection(collection) => {
                    BuiltPath::Document(collection.doc(segment)?)
                }
                BuiltPath::Document(document) => {
                    BuiltPath::Collection(document.collection(segment)?)
                }
            };
        }
        Ok(current)
    }

    fn check_collection(&self, path: &CollectionPath) -> Result<()> {
        if !self.check_paths {
            return Ok(());
        }
        if self.resolution_for(path.segments()).collections().is_empty() {
            return Err(ArborDbError::UnknownKey {
                kind: "collection",
                name: path.id().to_string(),
                at: path.to_string(),
            });
        }
        Ok(())
    }

    fn check_document(&self, path: &DocumentPath) -> Result<()> {
        if !self.check_paths {
            return Ok(());
        }
        if self.resolution_for(path.segments()).documents().is_empty() {
            return Err(ArborDbError::UnknownKey {
                kind: "document",
                name: path.id().to_string(),
                at: path.to_string(),
            });
        }
        Ok(())
    }

    fn resolution_for(&self, segments: &[String]) -> crate::resolve::Resolution<'_> {
        let literals: Vec<Segment> = segments
            .iter()
            .map(|s| Segment::Literal(s.clone()))
            .collect();
        resolve_path(&self.schema, &literals, false)
    }

    fn collection_schema_for(&self, path: &CollectionPath) -> Option<&CollectionSchema> {
        self.resolution_for(path.segments())
            .collections()
            .first()
            .copied()
    }

    fn document_schema_for(&self, path: &DocumentPath) -> Option<&DocumentSchema> {
        self.resolution_for(path.segments())
            .documents()
            .first()
            .copied()
    }

    fn generate_id(&self, collection: &CollectionPath) -> String {
        let strategy = self
            .collection_schema_for(collection)
            .and_then(|c| c.auto_id());
        match strategy {
            Some(AutoIdStrategy::Ulid) => ulid::Ulid::new().to_string().to_lowercase(),
            Some(AutoIdStrategy::Uuid) => uuid::Uuid::new_v4().to_string(),
            Some(AutoIdStrategy::Nanoid) | None => nanoid::nanoid!(),
        }
    }

    /// Validate a full document body against the schema it resolves to,
    /// applying defaults. Paths that resolve to nothing skip validation;
    /// the store's own not-found semantics stay authoritative.
    fn prepare_write(&self, path: &DocumentPath, data: &mut serde_json::Value) -> Result<()> {
        if let Some(doc_schema) = self.document_schema_for(path) {
            let warnings = validation::validate_and_prepare(&self.schema, doc_schema, data)?;
            for warning in warnings {
                log::warn!("{path}: {warning}");
            }
        }
        Ok(())
    }

    /// Validate a partial (merge) body: present fields only, no
    /// required-field enforcement.
    fn prepare_partial_write(&self, path: &DocumentPath, data: &serde_json::Value) -> Result<()> {
        if let Some(doc_schema) = self.document_schema_for(path) {
            let result = validation::validate_partial(&self.schema, doc_schema, data);
            if !result.is_ok() {
                return Err(ArborDbError::Validation(format!(
                    "Partial update validation failed:\n  - {}",
                    result.errors.join("\n  - ")
                )));
            }
            for warning in result.warnings {
                log::warn!("{path}: {warning}");
            }
        }
        Ok(())
    }
}

enum BuiltPath {
    Collection(CollectionPath),
    Document(DocumentPath),
}

/// A schema-aware reference to a collection. Cheap to create and clone;
/// holds no client state.
pub struct CollectionRef<'a, C: DocumentStore> {
    db: &'a Database<C>,
    path: CollectionPath,
}

impl<'a, C: DocumentStore> CollectionRef<'a, C> {
    /// The collection's own name.
    pub fn id(&self) -> &str {
        self.path.id()
    }

    pub fn path(&self) -> &CollectionPath {
        &self.path
    }

    /// The parent document, or None for a root collection.
    pub fn parent(&self) -> Option<DocumentRef<'a, C>> {
        self.path.parent().map(|path| DocumentRef { db: self.db, path })
    }

    /// Reference a document of this collection by ID.
    pub fn doc(&self, id: &str) -> Result<DocumentRef<'a, C>> {
        let path = self.path.doc(id)?;
        self.db.check_document(&path)?;
        Ok(DocumentRef { db: self.db, path })
    }

    /// Create a document with a generated ID. The ID strategy comes from
    /// the collection's schema (`id.auto`), defaulting to nanoid.
    pub fn add(&self, mut data: serde_json::Value) -> Result<DocumentRef<'a, C>> {
        let id = self.db.generate_id(&self.path);
        let path = self.path.doc(&id)?;
        self.db.prepare_write(&path, &mut data)?;
        self.db.client.commit(vec![WriteOp::Set {
            path: path.clone(),
            data,
            merge: false,
        }])?;
        Ok(DocumentRef { db: self.db, path })
    }

    /// Typed variant of [`CollectionRef::add`].
    pub fn add_typed<T: Serialize>(&self, value: &T) -> Result<DocumentRef<'a, C>> {
        self.add(serde_json::to_value(value)?)
    }

    /// Start a query over this collection.
    pub fn query(&self) -> QueryRef<'a, C> {
        QueryRef {
            db: self.db,
            query: Query::over(QueryScope::Collection(self.path.clone())),
        }
    }

    /// All documents in this collection.
    pub fn get_documents(&self) -> Result<Vec<Snapshot>> {
        self.query().get()
    }
}

impl<C: DocumentStore> Clone for CollectionRef<'_, C> {
    fn clone(&self) -> Self {
        CollectionRef {
            db: self.db,
            path: self.path.clone(),
        }
    }
}

impl<C: DocumentStore> std::fmt::Debug for CollectionRef<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionRef")
            .field("path", &self.path)
            .finish()
    }
}

/// A schema-aware reference to a document.
pub struct DocumentRef<'a, C: DocumentStore> {
    db: &'a Database<C>,
    path: DocumentPath,
}

impl<'a, C: DocumentStore> DocumentRef<'a, C> {
    /// The document's own ID.
    pub fn id(&self) -> &str {
        self.path.id()
    }

    pub fn path(&self) -> &DocumentPath {
        &self.path
    }

    /// The collection this document lives in.
    pub fn parent(&self) -> CollectionRef<'a, C> {
        CollectionRef {
            db: self.db,
            path: self.path.parent(),
        }
    }

    /// Reference a subcollection of this document by name.
    pub fn collection(&self, name: &str) -> Result<CollectionRef<'a, C>> {
        let path = self.path.collection(name)?;
        self.db.check_collection(&path)?;
        Ok(CollectionRef { db: self.db, path })
    }

    /// Read the document.
    pub fn get(&self) -> Result<Option<Snapshot>> {
        self.db.client.get_document(&self.path)
    }

    /// Read and deserialize the document data.
    pub fn get_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match self.get()? {
            Some(snapshot) => Ok(Some(snapshot.data_as()?)),
            None => Ok(None),
        }
    }

    /// Write the full document body, creating it if absent.
    pub fn set(&self, mut data: serde_json::Value) -> Result<()> {
        self.db.prepare_write(&self.path, &mut data)?;
        self.db.client.commit(vec![WriteOp::Set {
            path: self.path.clone(),
            data,
            merge: false,
        }])
    }

    /// Merge fields into the document, creating it if absent.
    pub fn set_merge(&self, data: serde_json::Value) -> Result<()> {
        self.db.prepare_partial_write(&self.path, &data)?;
        self.db.client.commit(vec![WriteOp::Set {
            path: self.path.clone(),
            data,
            merge: true,
        }])
    }

    /// Typed variant of [`DocumentRef::set`].
    pub fn set_typed<T: Serialize>(&self, value: &T) -> Result<()> {
        self.set(serde_json::to_value(value)?)
    }

    /// Merge fields into an existing document; fails if it does not exist.
    pub fn update(&self, data: serde_json::Value) -> Result<()> {
        self.db.prepare_partial_write(&self.path, &data)?;
        self.db.client.commit(vec![WriteOp::Update {
            path: self.path.clone(),
            data,
        }])
    }

    /// Delete the document. Deleting an absent document is not an error.
    pub fn delete(&self) -> Result<()> {
        self.db.client.commit(vec![WriteOp::Delete {
            path: self.path.clone(),
            precondition: Precondition::None,
        }])
    }

    /// Names of this document's immediate subcollections.
    pub fn list_collections(&self) -> Result<Vec<String>> {
        self.db.client.list_collections(Some(&self.path))
    }
}

impl<C: DocumentStore> Clone for DocumentRef<'_, C> {
    fn clone(&self) -> Self {
        DocumentRef {
            db: self.db,
            path: self.path.clone(),
        }
    }
}

impl<C: DocumentStore> std::fmt::Debug for DocumentRef<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentRef")
            .field("path", &self.path)
            .finish()
    }
}

/// A reference to every collection sharing a name, at any depth.
pub struct CollectionGroup<'a, C: DocumentStore> {
    db: &'a Database<C>,
    name: String,
}

impl<'a, C: DocumentStore> CollectionGroup<'a, C> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn query(&self) -> QueryRef<'a, C> {
        QueryRef {
            db: self.db,
            query: Query::over(QueryScope::Group(self.name.clone())),
        }
    }

    pub fn get_documents(&self) -> Result<Vec<Snapshot>> {
        self.query().get()
    }
}

/// An immutable query handle. Every narrowing method returns a new
/// handle wrapping a new narrowed query; the receiver is never mutated.
pub struct QueryRef<'a, C: DocumentStore> {
    db: &'a Database<C>,
    query: Query,
}

impl<'a, C: DocumentStore> QueryRef<'a, C> {
    pub fn filter(&self, field: &str, op: FilterOp, value: serde_json::Value) -> QueryRef<'a, C> {
        let mut query = self.query.clone();
        query.filters.push(Filter {
            field: field.to_string(),
            op,
            value,
        });
        QueryRef { db: self.db, query }
    }

    pub fn order_by(&self, field: &str, direction: Direction) -> QueryRef<'a, C> {
        let mut query = self.query.clone();
        query.order_by.push(OrderBy {
            field: field.to_string(),
            direction,
        });
        QueryRef { db: self.db, query }
    }

    pub fn limit(&self, limit: usize) -> QueryRef<'a, C> {
        let mut query = self.query.clone();
        query.limit = Some(limit);
        QueryRef { db: self.db, query }
    }

    pub fn offset(&self, offset: usize) -> QueryRef<'a, C> {
        let mut query = self.query.clone();
        query.offset = offset;
        QueryRef { db: self.db, query }
    }

    /// Run the query.
    pub fn get(&self) -> Result<Vec<Snapshot>> {
        self.db.client.run_query(&self.query)
    }
}

/// A batch of writes that commits all-or-nothing.
pub struct WriteBatch<'a, C: DocumentStore> {
    db: &'a Database<C>,
    writes: Vec<WriteOp>,
}

impl<C: DocumentStore> WriteBatch<'_, C> {
    pub fn set(&mut self, doc: &DocumentRef<'_, C>, mut data: serde_json::Value) -> Result<&mut Self> {
        self.db.prepare_write(&doc.path, &mut data)?;
        self.writes.push(WriteOp::Set {
            path: doc.path.clone(),
            data,
            merge: false,
        });
        Ok(self)
    }

    pub fn set_merge(
        &mut self,
        doc: &DocumentRef<'_, C>,
        data: serde_json::Value,
    ) -> Result<&mut Self> {
        self.db.prepare_partial_write(&doc.path, &data)?;
        self.writes.push(WriteOp::Set {
            path: doc.path.clone(),
            data,
            merge: true,
        });
        Ok(self)
    }

    pub fn update(
        &mut self,
        doc: &DocumentRef<'_, C>,
        data: serde_json::Value,
    ) -> Result<&mut Self> {
        self.db.prepare_partial_write(&doc.path, &data)?;
        self.writes.push(WriteOp::Update {
            path: doc.path.clone(),
            data,
        });
        Ok(self)
    }

    pub fn delete(&mut self, doc: &DocumentRef<'_, C>) -> &mut Self {
        self.writes.push(WriteOp::Delete {
            path: doc.path.clone(),
            precondition: Precondition::None,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Commit every queued write atomically.
    pub fn commit(self) -> Result<()> {
        if self.writes.len() > MAX_BATCH_WRITES {
            return Err(ArborDbError::Store(format!(
                "Batch of {} writes exceeds the limit of {MAX_BATCH_WRITES}",
                self.writes.len()
            )));
        }
        if self.writes.is_empty() {
            return Ok(());
        }
        self.db.client.commit(self.writes)
    }
}

/// A read-then-write transaction handle. Reads pass through; writes are
/// buffered until the transaction closure returns.
pub struct Transaction<'a, C: DocumentStore> {
    db: &'a Database<C>,
    writes: Vec<WriteOp>,
}

impl<C: DocumentStore> Transaction<'_, C> {
    pub fn get(&self, doc: &DocumentRef<'_, C>) -> Result<Option<Snapshot>> {
        self.db.client.get_document(&doc.path)
    }

    pub fn set(&mut self, doc: &DocumentRef<'_, C>, mut data: serde_json::Value) -> Result<()> {
        self.db.prepare_write(&doc.path, &mut data)?;
        self.writes.push(WriteOp::Set {
            path: doc.path.clone(),
            data,
            merge: false,
        });
        Ok(())
    }

    pub fn update(&mut self, doc: &DocumentRef<'_, C>, data: serde_json::Value) -> Result<()> {
        self.db.prepare_partial_write(&doc.path, &data)?;
        self.writes.push(WriteOp::Update {
            path: doc.path.clone(),
            data,
        });
        Ok(())
    }

    pub fn delete(&mut self, doc: &DocumentRef<'_, C>) {
        self.writes.push(WriteOp::Delete {
            path: doc.path.clone(),
            precondition: Precondition::None,
        });
    }
}
