//! The entity API facade every controller talks to.
//!
//! Controllers never touch storage directly: they compose id lists and field
//! maps and hand them to an [`EntityApi`]. [`MemoryApi`] is the in-process
//! implementation used by the dev server and the tests.

mod memory;

pub use memory::{MemoryApi, Restriction};

use crate::caller::Caller;
use crate::types::{EntityKind, Id};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// An opaque entity record: field name to JSON value.
pub type Record = serde_json::Map<String, Value>;

pub const NO_PERMISSIONS: &str = "No permissions to referred object or it does not exist!";

// ---------------------------------------------------------------------------
// Query / Mutation
// ---------------------------------------------------------------------------

/// Options for [`EntityApi::get`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Restrict to these ids; `None` means every record.
    pub ids: Option<Vec<Id>>,
    /// Only records the caller may modify.
    pub editable: bool,
    /// Exact-match field filter.
    pub filter: BTreeMap<String, Value>,
}

impl Query {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn ids(ids: &[Id]) -> Self {
        Self {
            ids: Some(ids.to_vec()),
            ..Self::default()
        }
    }

    pub fn editable(mut self) -> Self {
        self.editable = true;
        self
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter.insert(field.into(), value.into());
        self
    }
}

/// Result of a create/update/delete call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mutation {
    pub ids: Vec<Id>,
    /// Informational messages raised while the call succeeded.
    pub notices: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Create,
    Update,
    Delete,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verb::Get => "get",
            Verb::Create => "create",
            Verb::Update => "update",
            Verb::Delete => "delete",
        })
    }
}

// ---------------------------------------------------------------------------
// ApiError
// ---------------------------------------------------------------------------

/// A failed API call. Carries the messages to show the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .messages.join("; "))]
pub struct ApiError {
    pub messages: Vec<String>,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            messages: vec![message.into()],
        }
    }

    pub fn no_permissions() -> Self {
        Self::new(NO_PERMISSIONS)
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

// ---------------------------------------------------------------------------
// EntityApi
// ---------------------------------------------------------------------------

/// CRUD facade over the entities owned by the backend.
///
/// Every verb is attempted exactly once per call and is all-or-nothing.
pub trait EntityApi: Send + Sync {
    fn get(&self, caller: &Caller, kind: EntityKind, query: &Query) -> ApiResult<Vec<Record>>;

    fn create(&self, caller: &Caller, kind: EntityKind, records: Vec<Record>)
        -> ApiResult<Mutation>;

    /// Apply partial records; each must carry the kind's id field.
    fn update(&self, caller: &Caller, kind: EntityKind, records: Vec<Record>)
        -> ApiResult<Mutation>;

    fn delete(&self, caller: &Caller, kind: EntityKind, ids: &[Id]) -> ApiResult<Mutation>;
}

// ---------------------------------------------------------------------------
// Record helpers
// ---------------------------------------------------------------------------

/// Read an id from a record field stored either as a string or a number.
pub fn field_id(record: &Record, field: &str) -> Option<Id> {
    match record.get(field)? {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

pub fn record_id(kind: EntityKind, record: &Record) -> Option<Id> {
    field_id(record, kind.id_field())
}

/// Ids of `records`, in order, skipping records without one.
pub fn ids_of(kind: EntityKind, records: &[Record]) -> Vec<Id> {
    records.iter().filter_map(|r| record_id(kind, r)).collect()
}

/// Build the `[{ <idfield>: "<id>", <field>: <value> }, ...]` list used for
/// mass status updates.
pub fn id_records(kind: EntityKind, ids: &[Id], field: &str, value: impl Into<Value>) -> Vec<Record> {
    let value = value.into();
    ids.iter()
        .map(|id| {
            let mut r = Record::new();
            r.insert(kind.id_field().to_string(), Value::String(id.to_string()));
            r.insert(field.to_string(), value.clone());
            r
        })
        .collect()
}
