//! Document store contract.
//!
//! The rest of the crate talks to persistence only through [`DocumentStore`]:
//! collection-scoped writes, equality / id-in-set queries and live
//! subscriptions. [`sql::SqlStore`] is the SQLite implementation.

/// SQLite-backed implementation of the store contract
pub mod sql;

use crate::errors::{Error, Result};
use serde_json::{Map, Value};
use std::{cmp::Ordering, fmt, future::Future, str::FromStr, sync::Arc};
use tokio::sync::mpsc;

/// Body of a document: a JSON object keyed by field name.
pub type Fields = Map<String, Value>;

/// Collections known to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Event documents
    Events,
    /// Guest documents, one per invitation
    GuestLists,
    /// Expense documents
    Expenses,
    /// Task documents
    Tasks,
    /// Global vendor catalog
    Vendors,
    /// Event ↔ vendor bookings
    EventVendors,
    /// Legacy RSVP remnant. Addressable, never written by this crate.
    Rsvps,
}

impl Collection {
    /// Wire name of the collection.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Events => "events",
            Self::GuestLists => "guestLists",
            Self::Expenses => "expenses",
            Self::Tasks => "tasks",
            Self::Vendors => "vendors",
            Self::EventVendors => "eventVendors",
            Self::Rsvps => "rsvps",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "events" => Ok(Self::Events),
            "guestLists" => Ok(Self::GuestLists),
            "expenses" => Ok(Self::Expenses),
            "tasks" => Ok(Self::Tasks),
            "vendors" => Ok(Self::Vendors),
            "eventVendors" => Ok(Self::EventVendors),
            "rsvps" => Ok(Self::Rsvps),
            other => Err(Error::Config {
                message: format!("Unknown collection: {other}"),
            }),
        }
    }
}

/// A stored document: its id plus its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Store-assigned id
    pub id: String,
    /// Document body
    pub fields: Fields,
}

impl Document {
    /// Reads a string field.
    #[must_use]
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}

/// A single query predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `fields[field] == value`
    Eq {
        /// Field name
        field: String,
        /// Expected value
        value: Value,
    },
    /// Document id is one of the listed ids.
    IdIn(Vec<String>),
}

impl Filter {
    /// Whether `doc` satisfies the predicate.
    #[must_use]
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Self::Eq { field, value } => doc.fields.get(field) == Some(value),
            Self::IdIn(ids) => ids.iter().any(|id| *id == doc.id),
        }
    }
}

/// Sort direction for [`OrderBy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Smallest first
    Ascending,
    /// Largest first
    Descending,
}

/// Single-field ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    /// Field to sort on
    pub field: String,
    /// Sort direction
    pub direction: Direction,
}

/// Conjunction of filters with an optional ordering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// All filters must match
    pub filters: Vec<Filter>,
    /// Result ordering; insertion order when absent
    pub order_by: Option<OrderBy>,
}

impl Query {
    /// Query matching every document of the collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a `field == value` filter.
    #[must_use]
    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq {
            field: field.to_string(),
            value: value.into(),
        });
        self
    }

    /// Adds an id-in-set filter.
    #[must_use]
    pub fn id_in(mut self, ids: Vec<String>) -> Self {
        self.filters.push(Filter::IdIn(ids));
        self
    }

    /// Sets the ordering.
    #[must_use]
    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.to_string(),
            direction,
        });
        self
    }

    /// Whether `doc` satisfies every filter.
    #[must_use]
    pub fn matches(&self, doc: &Document) -> bool {
        self.filters.iter().all(|f| f.matches(doc))
    }

    /// Filters and orders `docs` in place. Sorting is stable, so documents that
    /// compare equal keep their insertion order.
    pub fn apply(&self, docs: &mut Vec<Document>) {
        docs.retain(|doc| self.matches(doc));
        if let Some(order) = &self.order_by {
            docs.sort_by(|a, b| {
                let ord = compare_values(a.fields.get(&order.field), b.fields.get(&order.field));
                match order.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }
    }
}

/// Orders two optional field values. Missing values sort first, then numbers,
/// strings and timestamp objects (`{seconds, nanoseconds}`) compare naturally.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Object(x)), Some(Value::Object(y))) => {
            let key = |m: &Map<String, Value>| {
                (
                    m.get("seconds").and_then(Value::as_i64).unwrap_or_default(),
                    m.get("nanoseconds").and_then(Value::as_u64).unwrap_or_default(),
                )
            };
            key(x).cmp(&key(y))
        }
        _ => Ordering::Equal,
    }
}

type CancelFn = Box<dyn FnOnce() + Send>;

/// Live feed of snapshots for one query.
///
/// Each item is the complete result set after a change. Dropping the handle
/// (or calling [`Subscription::unsubscribe`]) cancels the feed.
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<Vec<Document>>,
    cancel: Option<CancelFn>,
}

impl Subscription {
    /// Wraps a snapshot receiver with the store's cancellation hook.
    pub fn new(
        receiver: mpsc::UnboundedReceiver<Vec<Document>>,
        cancel: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            receiver,
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Waits for the next snapshot. `None` once the store has closed the feed.
    pub async fn next(&mut self) -> Option<Vec<Document>> {
        self.receiver.recv().await
    }

    /// Returns an already-delivered snapshot without waiting.
    pub fn try_next(&mut self) -> Option<Vec<Document>> {
        self.receiver.try_recv().ok()
    }

    /// Cancels the feed.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish_non_exhaustive()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.receiver.close();
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

/// Contract with the document database.
///
/// Methods return `Send` futures so a dashboard loop driving a store can be
/// spawned onto a multi-threaded runtime.
pub trait DocumentStore: Send + Sync {
    /// Creates a document and returns its id.
    fn add_document(
        &self,
        collection: Collection,
        fields: Fields,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Merges `fields` into an existing document. `NotFound` if it does not exist.
    fn update_document(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Deletes a document. Deleting a missing document is not an error.
    fn delete_document(
        &self,
        collection: Collection,
        id: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Fetches one document by id.
    fn get_document(
        &self,
        collection: Collection,
        id: &str,
    ) -> impl Future<Output = Result<Option<Document>>> + Send;

    /// One-off query.
    fn query(
        &self,
        collection: Collection,
        query: &Query,
    ) -> impl Future<Output = Result<Vec<Document>>> + Send;

    /// Opens a live feed. The current result set is delivered immediately,
    /// then again after every write to `collection`.
    fn subscribe(
        &self,
        collection: Collection,
        query: Query,
    ) -> impl Future<Output = Result<Subscription>> + Send;
}

impl<S: DocumentStore> DocumentStore for &S {
    async fn add_document(&self, collection: Collection, fields: Fields) -> Result<String> {
        (**self).add_document(collection, fields).await
    }

    async fn update_document(&self, collection: Collection, id: &str, fields: Fields) -> Result<()> {
        (**self).update_document(collection, id, fields).await
    }

    async fn delete_document(&self, collection: Collection, id: &str) -> Result<()> {
        (**self).delete_document(collection, id).await
    }

    async fn get_document(&self, collection: Collection, id: &str) -> Result<Option<Document>> {
        (**self).get_document(collection, id).await
    }

    async fn query(&self, collection: Collection, query: &Query) -> Result<Vec<Document>> {
        (**self).query(collection, query).await
    }

    async fn subscribe(&self, collection: Collection, query: Query) -> Result<Subscription> {
        (**self).subscribe(collection, query).await
    }
}

impl<S: DocumentStore> DocumentStore for Arc<S> {
    async fn add_document(&self, collection: Collection, fields: Fields) -> Result<String> {
        (**self).add_document(collection, fields).await
    }

    async fn update_document(&self, collection: Collection, id: &str, fields: Fields) -> Result<()> {
        (**self).update_document(collection, id, fields).await
    }

    async fn delete_document(&self, collection: Collection, id: &str) -> Result<()> {
        (**self).delete_document(collection, id).await
    }

    async fn get_document(&self, collection: Collection, id: &str) -> Result<Option<Document>> {
        (**self).get_document(collection, id).await
    }

    async fn query(&self, collection: Collection, query: &Query) -> Result<Vec<Document>> {
        (**self).query(collection, query).await
    }

    async fn subscribe(&self, collection: Collection, query: Query) -> Result<Subscription> {
        (**self).subscribe(collection, query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, fields: Value) -> Document {
        let Value::Object(fields) = fields else {
            panic!("test document must be an object");
        };
        Document {
            id: id.to_string(),
            fields,
        }
    }

    #[test]
    fn test_collection_names_round_trip() {
        for collection in [
            Collection::Events,
            Collection::GuestLists,
            Collection::Expenses,
            Collection::Tasks,
            Collection::Vendors,
            Collection::EventVendors,
            Collection::Rsvps,
        ] {
            assert_eq!(collection.as_str().parse::<Collection>().ok(), Some(collection));
        }
        assert!("guests".parse::<Collection>().is_err());
    }

    #[test]
    fn test_query_filters_are_conjunctive() {
        let query = Query::new().eq("eventId", "e1").eq("vendorId", "v1");
        assert!(query.matches(&doc("a", json!({"eventId": "e1", "vendorId": "v1"}))));
        assert!(!query.matches(&doc("b", json!({"eventId": "e1", "vendorId": "v2"}))));
        assert!(!query.matches(&doc("c", json!({"eventId": "e1"}))));
    }

    #[test]
    fn test_id_in_filter() {
        let query = Query::new().id_in(vec!["a".to_string(), "c".to_string()]);
        let mut docs = vec![
            doc("a", json!({})),
            doc("b", json!({})),
            doc("c", json!({})),
        ];
        query.apply(&mut docs);
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);
    }

    #[test]
    fn test_order_by_timestamp_objects() {
        let query = Query::new().order_by("deadline", Direction::Ascending);
        let mut docs = vec![
            doc("late", json!({"deadline": {"seconds": 200, "nanoseconds": 0}})),
            doc("none", json!({})),
            doc("early", json!({"deadline": {"seconds": 100, "nanoseconds": 5}})),
        ];
        query.apply(&mut docs);
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["none", "early", "late"]);
    }

    #[test]
    fn test_order_by_descending_numbers() {
        let query = Query::new().order_by("amount", Direction::Descending);
        let mut docs = vec![
            doc("small", json!({"amount": 5})),
            doc("big", json!({"amount": 50.5})),
        ];
        query.apply(&mut docs);
        assert_eq!(docs[0].id, "big");
    }

    #[tokio::test]
    async fn test_dropping_subscription_runs_cancel_hook() {
        use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = Subscription::new(rx, move || flag.store(true, AtomicOrdering::SeqCst));

        subscription.unsubscribe();
        assert!(cancelled.load(AtomicOrdering::SeqCst));
        assert!(tx.send(Vec::new()).is_err());
    }
}
