//! Shared test utilities for `EventEase`.
//!
//! This module provides helpers for setting up in-memory stores, sessions and
//! fixtures with sensible defaults, plus [`RecordingStore`], a store wrapper
//! that remembers every call made through it.

#![allow(clippy::unwrap_used)]

use crate::{
    auth::{Session, User},
    core::event::EventForm,
    errors::{Error, Result},
    models::{Event, Timestamp},
    store::{Collection, Document, DocumentStore, Fields, Query, Subscription, sql::SqlStore},
};
use sea_orm::DatabaseConnection;
use std::{
    collections::HashSet,
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

/// Uid of the organizer used across tests.
pub const ORGANIZER_UID: &str = "organizer-uid";
/// Email of the organizer used across tests.
pub const ORGANIZER_EMAIL: &str = "organizer@example.com";
/// Email of the invited guest used across tests.
pub const GUEST_EMAIL: &str = "ada@example.com";

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// In-memory document store.
pub async fn setup_test_store() -> Result<SqlStore> {
    Ok(SqlStore::new(setup_test_db().await?))
}

/// In-memory document store wrapped in a [`RecordingStore`].
pub async fn setup_recording_store() -> Result<RecordingStore<SqlStore>> {
    Ok(RecordingStore::new(setup_test_store().await?))
}

/// Session signed in as the organizer.
pub fn organizer_session() -> Session {
    Session::signed_in(User {
        uid: ORGANIZER_UID.to_string(),
        email: ORGANIZER_EMAIL.to_string(),
    })
}

/// Session signed in as `email`. The uid is derived from the email.
pub fn guest_session(email: &str) -> Session {
    Session::signed_in(User {
        uid: format!("uid-{}", email.to_lowercase()),
        email: email.to_string(),
    })
}

/// A form that passes every event rule.
///
/// # Defaults
/// * `date`: 2026-04-12
/// * `start_time` / `end_time`: 18:00 to 23:00 UTC that day
/// * `budget`: "1000"
/// * `event_type`: "party"
pub fn sample_event_form(name: &str) -> EventForm {
    EventForm {
        name: name.to_string(),
        date: "2026-04-12".to_string(),
        start_time: "2026-04-12T18:00:00Z".to_string(),
        end_time: "2026-04-12T23:00:00Z".to_string(),
        location: "Town Hall".to_string(),
        budget: "1000".to_string(),
        description: "Annual celebration".to_string(),
        hosted_by: "Events Committee".to_string(),
        event_type: "party".to_string(),
        custom_event_type: String::new(),
        is_private: false,
    }
}

/// An event owned by the organizer, built without touching a store.
pub fn sample_event(id: &str, budget: f64) -> Event {
    Event {
        id: id.to_string(),
        name: "Spring Gala".to_string(),
        date: "2026-04-12".to_string(),
        start_time: None,
        end_time: None,
        location: "Town Hall".to_string(),
        budget,
        description: String::new(),
        hosted_by: String::new(),
        event_type: "party".to_string(),
        is_private: false,
        creator_uid: ORGANIZER_UID.to_string(),
        created_at: Some(Timestamp::now()),
        legacy_guest_list: Vec::new(),
    }
}

/// Store operation kinds seen by [`RecordingStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Update,
    Delete,
    Get,
    Query,
    Subscribe,
}

impl Op {
    const fn is_write(self) -> bool {
        matches!(self, Self::Add | Self::Update | Self::Delete)
    }
}

#[derive(Debug, Default)]
struct Calls {
    ops: Vec<(Op, Collection)>,
    adds: Vec<(Collection, Fields)>,
    updates: Vec<(Collection, String, Fields)>,
}

/// Store wrapper that records calls and can inject failures.
#[derive(Debug)]
pub struct RecordingStore<S> {
    inner: S,
    calls: Mutex<Calls>,
    fail_writes: AtomicBool,
    failing_queries: Mutex<HashSet<Collection>>,
}

impl<S: DocumentStore> RecordingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            calls: Mutex::new(Calls::default()),
            fail_writes: AtomicBool::new(false),
            failing_queries: Mutex::new(HashSet::new()),
        }
    }

    /// Wrapped store.
    pub const fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of add/update/delete calls since the last reset.
    pub fn write_count(&self) -> usize {
        let calls = self.calls.lock().unwrap();
        calls.ops.iter().filter(|(op, _)| op.is_write()).count()
    }

    /// Number of `op` calls against `collection` since the last reset.
    pub fn count(&self, op: Op, collection: Collection) -> usize {
        let calls = self.calls.lock().unwrap();
        calls
            .ops
            .iter()
            .filter(|(o, c)| *o == op && *c == collection)
            .count()
    }

    /// Number of one-off queries against `collection`.
    pub fn query_count(&self, collection: Collection) -> usize {
        self.count(Op::Query, collection)
    }

    /// Fields passed to `add_document`, in call order.
    pub fn adds(&self) -> Vec<(Collection, Fields)> {
        self.calls.lock().unwrap().adds.clone()
    }

    /// Arguments passed to `update_document`, in call order.
    pub fn updates(&self) -> Vec<(Collection, String, Fields)> {
        self.calls.lock().unwrap().updates.clone()
    }

    /// Forgets recorded calls.
    pub fn reset_calls(&self) {
        *self.calls.lock().unwrap() = Calls::default();
    }

    /// Makes every write fail with [`Error::Remote`].
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes one-off queries against `collection` fail with [`Error::Remote`].
    pub fn fail_queries(&self, collection: Collection) {
        self.failing_queries.lock().unwrap().insert(collection);
    }

    /// Lets queries against `collection` succeed again.
    pub fn heal_queries(&self, collection: Collection) {
        self.failing_queries.lock().unwrap().remove(&collection);
    }

    fn record(&self, op: Op, collection: Collection) -> Result<()> {
        self.calls.lock().unwrap().ops.push((op, collection));
        if op.is_write() && self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Remote {
                message: format!("injected write failure on {collection}"),
            });
        }
        if op == Op::Query && self.failing_queries.lock().unwrap().contains(&collection) {
            return Err(Error::Remote {
                message: format!("injected query failure on {collection}"),
            });
        }
        Ok(())
    }
}

impl<S: DocumentStore> DocumentStore for RecordingStore<S> {
    async fn add_document(&self, collection: Collection, fields: Fields) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .adds
            .push((collection, fields.clone()));
        self.record(Op::Add, collection)?;
        self.inner.add_document(collection, fields).await
    }

    async fn update_document(&self, collection: Collection, id: &str, fields: Fields) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .updates
            .push((collection, id.to_string(), fields.clone()));
        self.record(Op::Update, collection)?;
        self.inner.update_document(collection, id, fields).await
    }

    async fn delete_document(&self, collection: Collection, id: &str) -> Result<()> {
        self.record(Op::Delete, collection)?;
        self.inner.delete_document(collection, id).await
    }

    async fn get_document(&self, collection: Collection, id: &str) -> Result<Option<Document>> {
        self.record(Op::Get, collection)?;
        self.inner.get_document(collection, id).await
    }

    async fn query(&self, collection: Collection, query: &Query) -> Result<Vec<Document>> {
        self.record(Op::Query, collection)?;
        self.inner.query(collection, query).await
    }

    async fn subscribe(&self, collection: Collection, query: Query) -> Result<Subscription> {
        self.record(Op::Subscribe, collection)?;
        self.inner.subscribe(collection, query).await
    }
}
