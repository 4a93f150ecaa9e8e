// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Document store layer.
//!
//! The core talks to a schemaless per-collection store through the
//! [`DocumentStore`] trait. [`Repository`] sits on top of it and converts
//! documents to and from the typed models.

pub mod firestore;
pub mod memory;
pub mod repository;

use crate::error::AppError;
use async_trait::async_trait;
use serde_json::Value;

pub use self::firestore::FirestoreStore;
pub use memory::MemoryStore;
pub use repository::Repository;

/// A stored document. Every document carries its identifier in `id`.
pub type Document = serde_json::Map<String, Value>;

/// Collection names as constants.
pub mod collections {
    pub const CHALLENGES: &str = "challenges";
    pub const SUBMISSIONS: &str = "submissions";
    pub const USERS: &str = "users";
}

/// Scalar a field can be compared against for equality.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Str(String),
    Bool(bool),
}

impl FilterValue {
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (FilterValue::Str(expected), Value::String(actual)) => expected == actual,
            (FilterValue::Bool(expected), Value::Bool(actual)) => expected == actual,
            _ => false,
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Str(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Str(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

/// One clause of a conjunctive filter. Range clauses compare strings, which
/// is enough for identifiers and fixed-width timestamps.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(String, FilterValue),
    Gt(String, String),
    Gte(String, String),
    Lt(String, String),
}

impl Condition {
    /// Evaluate this clause against a document.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Condition::Eq(field, expected) => {
                doc.get(field).is_some_and(|value| expected.matches(value))
            }
            Condition::Gt(field, bound) => string_field(doc, field).is_some_and(|v| v > bound.as_str()),
            Condition::Gte(field, bound) => {
                string_field(doc, field).is_some_and(|v| v >= bound.as_str())
            }
            Condition::Lt(field, bound) => string_field(doc, field).is_some_and(|v| v < bound.as_str()),
        }
    }
}

fn string_field<'a>(doc: &'a Document, field: &str) -> Option<&'a str> {
    doc.get(field).and_then(Value::as_str)
}

/// Conjunction of conditions. An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: &str) -> Self {
        Self::new().eq("id", id)
    }

    pub fn eq(mut self, field: &str, value: impl Into<FilterValue>) -> Self {
        self.conditions
            .push(Condition::Eq(field.to_string(), value.into()));
        self
    }

    pub fn gt(mut self, field: &str, bound: impl Into<String>) -> Self {
        self.conditions
            .push(Condition::Gt(field.to_string(), bound.into()));
        self
    }

    pub fn gte(mut self, field: &str, bound: impl Into<String>) -> Self {
        self.conditions
            .push(Condition::Gte(field.to_string(), bound.into()));
        self
    }

    pub fn lt(mut self, field: &str, bound: impl Into<String>) -> Self {
        self.conditions
            .push(Condition::Lt(field.to_string(), bound.into()));
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// The identifier, if this filter is exactly an id lookup.
    pub fn as_id_lookup(&self) -> Option<&str> {
        match self.conditions.as_slice() {
            [Condition::Eq(field, FilterValue::Str(id))] if field == "id" => Some(id),
            _ => None,
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions.iter().all(|c| c.matches(doc))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Sort and pagination for [`DocumentStore::find`].
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub sort: Option<(String, SortDirection)>,
    pub skip: u32,
    pub limit: Option<u32>,
}

impl FindOptions {
    pub fn sorted(field: &str, direction: SortDirection) -> Self {
        Self {
            sort: Some((field.to_string(), direction)),
            ..Self::default()
        }
    }

    pub fn page(mut self, skip: u32, limit: u32) -> Self {
        self.skip = skip;
        self.limit = Some(limit);
        self
    }
}

/// Schemaless document store.
///
/// Single-document writes are atomic. There are no cross-document
/// transactions; callers sequence multi-document work themselves.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Connectivity check run once at startup.
    async fn ping(&self) -> Result<(), AppError>;

    /// Insert `doc` (which must carry an `id`) and return its id.
    async fn insert(&self, collection: &str, doc: Document) -> Result<String, AppError>;

    async fn find_one(&self, collection: &str, filter: &Filter)
        -> Result<Option<Document>, AppError>;

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>, AppError>;

    /// Merge `patch` into the first matching document. Returns the number of
    /// documents modified; a patch that changes nothing reports 0.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        patch: Document,
    ) -> Result<u64, AppError>;

    /// Replace document `id` with `doc` only if its stored `version` equals
    /// `expected_version`. Returns `false` on a version mismatch or if the
    /// document no longer exists.
    async fn replace_if_version(
        &self,
        collection: &str,
        id: &str,
        expected_version: u64,
        doc: Document,
    ) -> Result<bool, AppError>;

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64, AppError>;

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, AppError>;

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, AppError>;
}

/// Stored `version` of a document, 0 when absent.
pub fn document_version(doc: &Document) -> u64 {
    doc.get("version").and_then(Value::as_u64).unwrap_or(0)
}

/// Merge `patch` into `doc`. Returns whether any field changed.
pub fn merge_patch(doc: &mut Document, patch: Document) -> bool {
    let mut changed = false;
    for (key, value) in patch {
        if doc.get(&key) != Some(&value) {
            doc.insert(key, value);
            changed = true;
        }
    }
    changed
}
