// In-memory DocumentStore backend, for tests and embedding.

use crate::client::{
    Direction, DocumentStore, Filter, FilterOp, Precondition, Query, QueryScope, Snapshot,
    WriteOp,
};
use crate::error::{ArborDbError, Result};
use crate::path::DocumentPath;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::RwLock;

#[derive(Debug, Clone)]
struct StoredDocument {
    data: serde_json::Value,
    create_time: DateTime<Utc>,
    update_time: DateTime<Utc>,
}

/// A `DocumentStore` backed by a path-keyed map.
///
/// Commits are all-or-nothing: preconditions for every write are checked
/// under the write lock before any write is applied.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<BTreeMap<String, StoredDocument>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn len(&self) -> usize {
        self.documents.read().expect("memory store lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(path: &DocumentPath, stored: &StoredDocument) -> Snapshot {
        Snapshot {
            path: path.clone(),
            data: stored.data.clone(),
            create_time: stored.create_time,
            update_time: stored.update_time,
        }
    }
}

impl DocumentStore for MemoryStore {
    fn get_document(&self, path: &DocumentPath) -> Result<Option<Snapshot>> {
        let documents = self.documents.read().expect("memory store lock");
        Ok(documents
            .get(&path.to_string())
            .map(|stored| Self::snapshot(path, stored)))
    }

    fn run_query(&self, query: &Query) -> Result<Vec<Snapshot>> {
        let documents = self.documents.read().expect("memory store lock");

        let mut matches: Vec<Snapshot> = Vec::new();
        for (key, stored) in documents.iter() {
            let path = DocumentPath::parse(key)?;
            let in_scope = match &query.scope {
                QueryScope::Collection(collection) => {
                    path.parent() == *collection
                }
                QueryScope::Group(name) => path.collection_id() == name,
            };
            if !in_scope {
                continue;
            }
            if query.filters.iter().all(|f| matches_filter(&stored.data, f)) {
                matches.push(Self::snapshot(&path, stored));
            }
        }

        for order in query.order_by.iter().rev() {
            matches.sort_by(|a, b| {
                let ord = compare_values(
                    field_value(&a.data, &order.field),
                    field_value(&b.data, &order.field),
                );
                match order.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }

        let mut results: Vec<Snapshot> = matches.into_iter().skip(query.offset).collect();
        if let Some(limit) = query.limit {
            results.truncate(limit);
        }
        Ok(results)
    }

    fn commit(&self, writes: Vec<WriteOp>) -> Result<()> {
        let mut documents = self.documents.write().expect("memory store lock");

        // Precondition pass: nothing is applied unless every write can be.
        for write in &writes {
            let key = write.path().to_string();
            match write {
                WriteOp::Update { path, .. } => {
                    if !documents.contains_key(&key) {
                        return Err(ArborDbError::NotFound {
                            path: path.to_string(),
                        });
                    }
                }
                WriteOp::Delete {
                    path,
                    precondition: Precondition::MustExist,
                } => {
                    if !documents.contains_key(&key) {
                        return Err(ArborDbError::PreconditionFailed {
                            path: path.to_string(),
                            reason: "document does not exist",
                        });
                    }
                }
                _ => {}
            }
        }

        let now = Utc::now();
        for write in writes {
            let key = write.path().to_string();
            match write {
                WriteOp::Set { data, merge, .. } => match documents.get_mut(&key) {
                    Some(existing) => {
                        if merge {
                            merge_fields(&mut existing.data, data);
                        } else {
                            existing.data = data;
                        }
                        existing.update_time = now;
                    }
                    None => {
                        documents.insert(
                            key,
                            StoredDocument {
                                data,
                                create_time: now,
                                update_time: now,
                            },
                        );
                    }
                },
                WriteOp::Update { data, .. } => {
                    let existing = documents.get_mut(&key).expect("checked in precondition pass");
                    merge_fields(&mut existing.data, data);
                    existing.update_time = now;
                }
                WriteOp::Delete { .. } => {
                    documents.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn list_collections(&self, parent: Option<&DocumentPath>) -> Result<Vec<String>> {
        let documents = self.documents.read().expect("memory store lock");
        let mut names: Vec<String> = Vec::new();

        for key in documents.keys() {
            let path = DocumentPath::parse(key)?;
            let segments = path.segments();
            let child = match parent {
                None => {
                    if segments.len() >= 2 {
                        Some(segments[0].clone())
                    } else {
                        None
                    }
                }
                Some(parent) => {
                    if path.starts_with(parent) && segments.len() >= parent.segments().len() + 2 {
                        Some(segments[parent.segments().len()].clone())
                    } else {
                        None
                    }
                }
            };
            if let Some(name) = child {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        Ok(names)
    }
}

/// Merge top-level fields of `incoming` into `base`; non-objects replace.
fn merge_fields(base: &mut serde_json::Value, incoming: serde_json::Value) {
    match (base.as_object_mut(), incoming) {
        (Some(base_map), serde_json::Value::Object(incoming_map)) => {
            for (key, value) in incoming_map {
                base_map.insert(key, value);
            }
        }
        (_, incoming) => *base = incoming,
    }
}

fn field_value<'a>(data: &'a serde_json::Value, field: &str) -> Option<&'a serde_json::Value> {
    let mut current = data;
    for part in field.split('.') {
        current = current.get(part)?;
    }
    Some(current)
}

fn matches_filter(data: &serde_json::Value, filter: &Filter) -> bool {
    let value = field_value(data, &filter.field);
    match filter.op {
        FilterOp::Eq => value == Some(&filter.value),
        FilterOp::Ne => value != Some(&filter.value),
        FilterOp::ArrayContains => value
            .and_then(|v| v.as_array())
            .map(|items| items.contains(&filter.value))
            .unwrap_or(false),
        FilterOp::Lt | FilterOp::Le | FilterOp::Gt | FilterOp::Ge => {
            let ord = compare_values(value, Some(&filter.value));
            match filter.op {
                FilterOp::Lt => value.is_some() && ord == Ordering::Less,
                FilterOp::Le => value.is_some() && ord != Ordering::Greater,
                FilterOp::Gt => value.is_some() && ord == Ordering::Greater,
                FilterOp::Ge => value.is_some() && ord != Ordering::Less,
                _ => unreachable!(),
            }
        }
    }
}

/// Total-enough ordering over JSON values for filters and sorting:
/// null < bool < number < string; mixed kinds compare by that rank.
fn compare_values(a: Option<&serde_json::Value>, b: Option<&serde_json::Value>) -> Ordering {
    fn rank(v: &serde_json::Value) -> u8 {
        match v {
            serde_json::Value::Null => 0,
            serde_json::Value::Bool(_) => 1,
            serde_json::Value::Number(_) => 2,
            serde_json::Value::String(_) => 3,
            serde_json::Value::Array(_) => 4,
            serde_json::Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (serde_json::Value::Number(x), serde_json::Value::Number(y)) => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
            (serde_json::Value::String(x), serde_json::Value::String(y)) => x.cmp(y),
            (serde_json::Value::Bool(x), serde_json::Value::Bool(y)) => x.cmp(y),
            _ => rank(a).cmp(&rank(b)),
        },
    }
}
