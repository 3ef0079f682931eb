//! SQLite document store built on `SeaORM`.
//!
//! All collections share the `documents` table. Queries select the rows of one
//! collection (or the listed ids) in SQL and apply field filters and ordering
//! in memory. That keeps the store schema-free, at the cost of reading a whole
//! collection for equality filters.
//!
//! Live subscriptions are kept in an in-process registry. After every
//! committed write the store re-runs each registered query on the written
//! collection and pushes the fresh result set down the subscriber's channel.

use super::{Collection, Document, DocumentStore, Fields, Filter, Query, Subscription};
use crate::{
    entities::{Document as DocumentEntity, document},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};
use tokio::sync::mpsc;
use tracing::{debug, error, trace};
use uuid::Uuid;

struct Watcher {
    collection: Collection,
    query: Query,
    sender: mpsc::UnboundedSender<Vec<Document>>,
}

type Registry = Arc<Mutex<HashMap<u64, Watcher>>>;

/// Document store over a `SeaORM` connection.
#[derive(Clone)]
pub struct SqlStore {
    db: DatabaseConnection,
    watchers: Registry,
    next_watcher: Arc<AtomicU64>,
}

impl SqlStore {
    /// Wraps an open connection. Tables must already exist
    /// (see [`crate::config::database::create_tables`]).
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            watchers: Arc::new(Mutex::new(HashMap::new())),
            next_watcher: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.watchers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn to_document(model: document::Model) -> Document {
        let fields = match model.fields {
            Value::Object(map) => map,
            other => {
                error!(id = %model.id, "Document body is not an object: {other}");
                Fields::new()
            }
        };
        Document {
            id: model.id,
            fields,
        }
    }

    async fn find_model(&self, collection: Collection, id: &str) -> Result<Option<document::Model>> {
        DocumentEntity::find_by_id(id.to_string())
            .filter(document::Column::Collection.eq(collection.as_str()))
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    /// Runs `query` against `collection`. Id-in-set filters are pushed down to SQL.
    async fn run_query(&self, collection: Collection, query: &Query) -> Result<Vec<Document>> {
        let mut select = DocumentEntity::find()
            .filter(document::Column::Collection.eq(collection.as_str()))
            .order_by_asc(document::Column::CreatedAt)
            .order_by_asc(document::Column::Id);

        for filter in &query.filters {
            if let Filter::IdIn(ids) = filter {
                select = select.filter(document::Column::Id.is_in(ids.iter().cloned()));
            }
        }

        let mut docs: Vec<Document> = select
            .all(&self.db)
            .await?
            .into_iter()
            .map(Self::to_document)
            .collect();
        query.apply(&mut docs);
        Ok(docs)
    }

    /// Pushes a fresh snapshot to every subscriber of `collection`.
    async fn notify(&self, collection: Collection) {
        let targets: Vec<(u64, Query, mpsc::UnboundedSender<Vec<Document>>)> = self
            .watchers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, w)| w.collection == collection)
            .map(|(id, w)| (*id, w.query.clone(), w.sender.clone()))
            .collect();

        for (watcher_id, query, sender) in targets {
            match self.run_query(collection, &query).await {
                Ok(snapshot) => {
                    trace!(watcher_id, %collection, len = snapshot.len(), "Pushing snapshot");
                    if sender.send(snapshot).is_err() {
                        self.forget(watcher_id);
                    }
                }
                Err(e) => error!(watcher_id, %collection, "Failed to refresh subscription: {e}"),
            }
        }
    }

    fn forget(&self, watcher_id: u64) {
        self.watchers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&watcher_id);
    }
}

impl DocumentStore for SqlStore {
    async fn add_document(&self, collection: Collection, fields: Fields) -> Result<String> {
        let id = Uuid::new_v4().simple().to_string();
        let now = Utc::now();

        let model = document::ActiveModel {
            id: Set(id.clone()),
            collection: Set(collection.as_str().to_string()),
            fields: Set(Value::Object(fields)),
            created_at: Set(now),
            updated_at: Set(now),
        };
        model.insert(&self.db).await?;
        debug!(%collection, %id, "Document added");

        self.notify(collection).await;
        Ok(id)
    }

    async fn update_document(&self, collection: Collection, id: &str, fields: Fields) -> Result<()> {
        let model = self
            .find_model(collection, id)
            .await?
            .ok_or_else(|| Error::not_found("Document", id))?;

        let mut merged = match model.fields.clone() {
            Value::Object(map) => map,
            _ => Fields::new(),
        };
        merged.extend(fields);

        let mut active: document::ActiveModel = model.into();
        active.fields = Set(Value::Object(merged));
        active.updated_at = Set(Utc::now());
        active.update(&self.db).await?;
        debug!(%collection, %id, "Document updated");

        self.notify(collection).await;
        Ok(())
    }

    async fn delete_document(&self, collection: Collection, id: &str) -> Result<()> {
        let result = DocumentEntity::delete_many()
            .filter(document::Column::Id.eq(id))
            .filter(document::Column::Collection.eq(collection.as_str()))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            debug!(%collection, %id, "Delete of missing document ignored");
            return Ok(());
        }
        debug!(%collection, %id, "Document deleted");

        self.notify(collection).await;
        Ok(())
    }

    async fn get_document(&self, collection: Collection, id: &str) -> Result<Option<Document>> {
        Ok(self.find_model(collection, id).await?.map(Self::to_document))
    }

    async fn query(&self, collection: Collection, query: &Query) -> Result<Vec<Document>> {
        self.run_query(collection, query).await
    }

    async fn subscribe(&self, collection: Collection, query: Query) -> Result<Subscription> {
        let initial = self.run_query(collection, &query).await?;
        let (sender, receiver) = mpsc::unbounded_channel();
        // Receiver is alive until this function returns.
        let _ = sender.send(initial);

        let watcher_id = self.next_watcher.fetch_add(1, Ordering::Relaxed);
        self.watchers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                watcher_id,
                Watcher {
                    collection,
                    query,
                    sender,
                },
            );
        debug!(watcher_id, %collection, "Subscription opened");

        let registry = Arc::downgrade(&self.watchers);
        Ok(Subscription::new(receiver, move || {
            if let Some(registry) = registry.upgrade() {
                registry
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&watcher_id);
                debug!(watcher_id, "Subscription closed");
            }
        }))
    }
}
