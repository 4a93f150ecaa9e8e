// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore adapter for the document store.
//!
//! Documents are stored under their `id` as the Firestore document ID, and
//! also carry `id` as a field so range filters and ordering on identifiers
//! work through ordinary queries.

use crate::db::{
    document_version, merge_patch, Condition, Document, DocumentStore, Filter, FilterValue,
    FindOptions, SortDirection,
};
use crate::error::AppError;
use async_trait::async_trait;
use firestore::errors::FirestoreError;
use firestore::select_builder::FirestoreSelectDocBuilder;
use firestore::{FirestoreConsistencySelector, FirestoreDb};
use serde::Deserialize;
use serde_json::Value;

// Firestore limits batch/transaction writes to 500 operations.
const BATCH_SIZE: usize = 400;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreStore {
    client: Option<FirestoreDb>,
}

impl FirestoreStore {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Offline client: every operation fails with a database error.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    async fn get_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn write(&self, collection: &str, id: &str, doc: &Document) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(doc)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete_by_id(&self, collection: &str, id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collection)
            .document_id(id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Batch delete documents by id using transactions.
    async fn batch_delete(&self, collection: &str, ids: &[String]) -> Result<(), AppError> {
        let client = self.get_client()?;

        for chunk in ids.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for id in chunk {
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }
}

/// Single row returned by a count aggregation.
#[derive(Debug, Deserialize)]
struct CountRow {
    #[serde(default)]
    count: u64,
}

/// Another transaction touched the document first.
fn is_write_conflict(error: &FirestoreError) -> bool {
    match error {
        FirestoreError::DataConflictError(_) => true,
        FirestoreError::DatabaseError(e) => e.public.code == "Aborted",
        _ => false,
    }
}

/// Apply `filter` as a conjunction of field conditions.
fn filtered<'a>(
    query: FirestoreSelectDocBuilder<'a, FirestoreDb>,
    filter: &Filter,
) -> FirestoreSelectDocBuilder<'a, FirestoreDb> {
    if filter.conditions().is_empty() {
        return query;
    }

    query.filter(|q| {
        let clauses: Vec<_> = filter
            .conditions()
            .iter()
            .map(|condition| match condition {
                Condition::Eq(field, FilterValue::Str(value)) => {
                    q.field(field.as_str()).eq(value.as_str())
                }
                Condition::Eq(field, FilterValue::Bool(value)) => q.field(field.as_str()).eq(*value),
                Condition::Gt(field, bound) => q.field(field.as_str()).greater_than(bound.as_str()),
                Condition::Gte(field, bound) => {
                    q.field(field.as_str()).greater_than_or_equal(bound.as_str())
                }
                Condition::Lt(field, bound) => q.field(field.as_str()).less_than(bound.as_str()),
            })
            .collect();
        q.for_all(clauses)
    })
}

fn document_id(doc: &Document) -> Result<String, AppError> {
    doc.get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| AppError::Database("Document has no id".to_string()))
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn ping(&self) -> Result<(), AppError> {
        // Reading a document that does not exist still round-trips to the server.
        self.get_by_id(crate::db::collections::USERS, "__ping__")
            .await
            .map(|_| ())
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<String, AppError> {
        let id = document_id(&doc)?;
        self.write(collection, &id, &doc).await?;
        Ok(id)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, AppError> {
        if let Some(id) = filter.as_id_lookup() {
            return self.get_by_id(collection, id).await;
        }

        let options = FindOptions {
            limit: Some(1),
            ..FindOptions::default()
        };
        Ok(self.find(collection, filter, &options).await?.into_iter().next())
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>, AppError> {
        let mut query = filtered(self.get_client()?.fluent().select().from(collection), filter);

        if let Some((field, direction)) = &options.sort {
            let direction = match direction {
                SortDirection::Ascending => firestore::FirestoreQueryDirection::Ascending,
                SortDirection::Descending => firestore::FirestoreQueryDirection::Descending,
            };
            query = query.order_by([(field.as_str(), direction)]);
        }

        if let Some(limit) = options.limit {
            query = query.limit(limit);
        }
        if options.skip > 0 {
            query = query.offset(options.skip);
        }

        query
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        patch: Document,
    ) -> Result<u64, AppError> {
        let Some(mut doc) = self.find_one(collection, filter).await? else {
            return Ok(0);
        };

        if !merge_patch(&mut doc, patch) {
            return Ok(0);
        }

        let id = document_id(&doc)?;
        self.write(collection, &id, &doc).await?;
        Ok(1)
    }

    async fn replace_if_version(
        &self,
        collection: &str,
        id: &str,
        expected_version: u64,
        doc: Document,
    ) -> Result<bool, AppError> {
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        // Reading through the transaction makes a concurrent commit abort this one.
        let in_transaction = client.clone_with_consistency_selector(
            FirestoreConsistencySelector::Transaction(transaction.transaction_id().clone()),
        );
        let read: Result<Option<Document>, FirestoreError> = in_transaction
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await;
        let current = match read {
            Ok(current) => current,
            Err(e) if is_write_conflict(&e) => {
                let _ = transaction.rollback().await;
                return Ok(false);
            }
            Err(e) => {
                let _ = transaction.rollback().await;
                return Err(AppError::Database(e.to_string()));
            }
        };
        match current {
            Some(stored) if document_version(&stored) == expected_version => {}
            _ => {
                let _ = transaction.rollback().await;
                return Ok(false);
            }
        }

        client
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(&doc)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add document to transaction: {}", e))
            })?;

        match transaction.commit().await {
            Ok(_) => Ok(true),
            Err(e) if is_write_conflict(&e) => {
                tracing::debug!(collection, id, error = %e, "Versioned write lost a race");
                Ok(false)
            }
            Err(e) => Err(AppError::Database(format!(
                "Transaction commit failed: {}",
                e
            ))),
        }
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64, AppError> {
        let Some(doc) = self.find_one(collection, filter).await? else {
            return Ok(0);
        };

        self.delete_by_id(collection, &document_id(&doc)?).await?;
        Ok(1)
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, AppError> {
        let ids = self
            .find(collection, filter, &FindOptions::default())
            .await?
            .iter()
            .map(document_id)
            .collect::<Result<Vec<_>, _>>()?;

        self.batch_delete(collection, &ids).await?;
        tracing::debug!(collection, count = ids.len(), "Deleted documents");
        Ok(ids.len() as u64)
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, AppError> {
        let rows: Vec<CountRow> = filtered(self.get_client()?.fluent().select().from(collection), filter)
            .aggregate(|a| a.fields([a.field("count").count()]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows.first().map_or(0, |row| row.count))
    }
}
