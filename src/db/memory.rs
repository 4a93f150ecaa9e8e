// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store for local development and tests.

use crate::db::{document_version, merge_patch, Document, DocumentStore, Filter, FindOptions, SortDirection};
use crate::error::AppError;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Collections keyed by name; documents keyed by id, so iteration order is
/// id order.
#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<String, BTreeMap<String, Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn document_id(doc: &Document) -> Result<String, AppError> {
    doc.get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| AppError::Database("Document has no id".to_string()))
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .unwrap_or(0.0)
            .total_cmp(&b.as_f64().unwrap_or(0.0)),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<String, AppError> {
        let id = document_id(&doc)?;
        let mut docs = self.collections.entry(collection.to_string()).or_default();
        if docs.contains_key(&id) {
            return Err(AppError::Database(format!(
                "Duplicate id {} in {}",
                id, collection
            )));
        }
        docs.insert(id.clone(), doc);
        Ok(id)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, AppError> {
        let Some(docs) = self.collections.get(collection) else {
            return Ok(None);
        };

        if let Some(id) = filter.as_id_lookup() {
            return Ok(docs.get(id).cloned());
        }

        Ok(docs.values().find(|doc| filter.matches(doc)).cloned())
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>, AppError> {
        let mut matched: Vec<Document> = match self.collections.get(collection) {
            Some(docs) => docs
                .values()
                .filter(|doc| filter.matches(doc))
                .cloned()
                .collect(),
            None => Vec::new(),
        };

        if let Some((field, direction)) = &options.sort {
            matched.sort_by(|a, b| {
                let ordering = compare_values(a.get(field), b.get(field));
                match direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            });
        }

        let limit = options.limit.map_or(usize::MAX, |l| l as usize);
        Ok(matched
            .into_iter()
            .skip(options.skip as usize)
            .take(limit)
            .collect())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        patch: Document,
    ) -> Result<u64, AppError> {
        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(0);
        };

        let Some(doc) = docs.values_mut().find(|doc| filter.matches(doc)) else {
            return Ok(0);
        };

        Ok(u64::from(merge_patch(doc, patch)))
    }

    async fn replace_if_version(
        &self,
        collection: &str,
        id: &str,
        expected_version: u64,
        doc: Document,
    ) -> Result<bool, AppError> {
        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(false);
        };

        match docs.get_mut(id) {
            Some(stored) if document_version(stored) == expected_version => {
                *stored = doc;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64, AppError> {
        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(0);
        };

        let id = docs
            .iter()
            .find(|(_, doc)| filter.matches(doc))
            .map(|(id, _)| id.clone());

        Ok(match id {
            Some(id) => u64::from(docs.remove(&id).is_some()),
            None => 0,
        })
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, AppError> {
        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(0);
        };

        let before = docs.len();
        docs.retain(|_, doc| !filter.matches(doc));
        Ok((before - docs.len()) as u64)
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, AppError> {
        Ok(self
            .collections
            .get(collection)
            .map(|docs| docs.values().filter(|doc| filter.matches(doc)).count() as u64)
            .unwrap_or(0))
    }
}
