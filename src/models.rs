//! Typed records stored in the document store.
//!
//! Each record maps to one collection through [`Record`]. Field names on the
//! wire are camelCase; the document id is carried outside the body and filled
//! in when a record is read.

use crate::{
    errors::{Error, Result},
    store::{Collection, Document, Fields},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::{fmt, str::FromStr};

/// Conversion between a typed record and a stored document.
pub trait Record: Serialize + DeserializeOwned {
    /// Collection the record lives in.
    const COLLECTION: Collection;

    /// Reads a record from a document, taking the id from the document.
    fn from_document(doc: &Document) -> Result<Self> {
        let mut fields = doc.fields.clone();
        fields.insert("id".to_string(), Value::String(doc.id.clone()));
        Ok(serde_json::from_value(Value::Object(fields))?)
    }

    /// Document body for this record. The id is never part of the body.
    fn to_fields(&self) -> Result<Fields> {
        match serde_json::to_value(self)? {
            Value::Object(mut map) => {
                map.remove("id");
                Ok(map)
            }
            other => Err(Error::Remote {
                message: format!("Record did not serialize to an object: {other}"),
            }),
        }
    }
}

/// Point in time stored as `{seconds, nanoseconds}`, never as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    /// Seconds since the Unix epoch
    pub seconds: i64,
    /// Sub-second part
    pub nanoseconds: u32,
}

impl Timestamp {
    /// Current time.
    #[must_use]
    pub fn now() -> Self {
        Self::from(Utc::now())
    }

    /// Converts back to a `chrono` value.
    #[must_use]
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.seconds, self.nanoseconds)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self {
            seconds: value.timestamp(),
            nanoseconds: value.timestamp_subsec_nanos(),
        }
    }
}

/// Reads a number that older clients may have written as a numeric string.
/// Anything unreadable counts as zero.
fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or_default(),
        Some(Value::String(s)) => crate::core::validation::parse_amount(&s).unwrap_or_default(),
        _ => 0.0,
    })
}

/// An event owned by its creator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Document id
    #[serde(default)]
    pub id: String,
    /// Event name
    pub name: String,
    /// Calendar date, `YYYY-MM-DD`
    #[serde(default)]
    pub date: String,
    /// Start time, RFC 3339
    #[serde(default)]
    pub start_time: Option<String>,
    /// End time, RFC 3339
    #[serde(default)]
    pub end_time: Option<String>,
    /// Venue or address
    #[serde(default)]
    pub location: String,
    /// Total budget
    #[serde(default, deserialize_with = "lenient_number")]
    pub budget: f64,
    /// Free-text description
    #[serde(default)]
    pub description: String,
    /// Host shown to guests
    #[serde(default)]
    pub hosted_by: String,
    /// Event type label (preset or custom)
    #[serde(default)]
    pub event_type: String,
    /// Hidden from public listings
    #[serde(default)]
    pub is_private: bool,
    /// Uid of the creating user
    #[serde(default)]
    pub creator_uid: String,
    /// Creation time
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    /// Guests embedded by the earliest clients. Read-only; guests now live in
    /// the `guestLists` collection.
    #[serde(rename = "guestList", default)]
    pub legacy_guest_list: Vec<LegacyGuest>,
}

impl Record for Event {
    const COLLECTION: Collection = Collection::Events;
}

/// Guest entry embedded in an event document by older clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyGuest {
    /// Guest name
    pub name: String,
    /// Free-text RSVP
    #[serde(default)]
    pub rsvp: String,
    /// Meal preference
    #[serde(default)]
    pub meal: String,
    /// VIP flag
    #[serde(default)]
    pub vip: bool,
}

/// RSVP answer of an invited guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RsvpStatus {
    /// No answer yet
    #[default]
    Pending,
    /// Attending
    Yes,
    /// Not attending
    No,
    /// Undecided
    Maybe,
}

impl RsvpStatus {
    /// Wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Yes => "Yes",
            Self::No => "No",
            Self::Maybe => "Maybe",
        }
    }
}

impl fmt::Display for RsvpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RsvpStatus {
    type Err = Error;

    /// Case-insensitive. An empty label is what older clients wrote before
    /// the guest answered, so it reads as `Pending`.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "pending" => Ok(Self::Pending),
            "yes" => Ok(Self::Yes),
            "no" => Ok(Self::No),
            "maybe" => Ok(Self::Maybe),
            other => Err(Error::validation(
                "rsvp",
                format!("Unknown RSVP status: {other}"),
            )),
        }
    }
}

impl TryFrom<String> for RsvpStatus {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<RsvpStatus> for String {
    fn from(value: RsvpStatus) -> Self {
        value.as_str().to_string()
    }
}

/// An invitation in the `guestLists` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guest {
    /// Document id
    #[serde(default)]
    pub id: String,
    /// Event the guest is invited to
    pub event_id: String,
    /// Guest name
    pub name: String,
    /// Email used to find the invitation
    #[serde(default)]
    pub email: String,
    /// Current answer
    #[serde(default)]
    pub rsvp: RsvpStatus,
    /// Meal preference
    #[serde(default)]
    pub meal: String,
    /// VIP flag, independent of the RSVP
    #[serde(default)]
    pub vip: bool,
}

impl Record for Guest {
    const COLLECTION: Collection = Collection::GuestLists;
}

/// Money spent for an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    /// Document id
    #[serde(default)]
    pub id: String,
    /// Owning event
    pub event_id: String,
    /// Free-text category, grouped case-sensitively
    pub category: String,
    /// Amount spent
    #[serde(default, deserialize_with = "lenient_number")]
    pub amount: f64,
    /// Optional note
    #[serde(default)]
    pub description: String,
    /// When the expense was recorded
    #[serde(default)]
    pub created_at: Option<Timestamp>,
}

impl Record for Expense {
    const COLLECTION: Collection = Collection::Expenses;
}

/// Organizer to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Document id
    #[serde(default)]
    pub id: String,
    /// Owning event
    pub event_id: String,
    /// What needs doing
    pub title: String,
    /// Due time
    pub deadline: Timestamp,
    /// Done flag
    #[serde(default)]
    pub is_completed: bool,
}

impl Record for Task {
    const COLLECTION: Collection = Collection::Tasks;
}

/// Entry of the global vendor catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vendor {
    /// Document id
    #[serde(default)]
    pub id: String,
    /// Display name
    pub name: String,
    /// Vendor type (e.g. "Catering")
    #[serde(rename = "type")]
    pub vendor_type: String,
    /// City or area served
    #[serde(default)]
    pub location: String,
    /// Free-text price band
    #[serde(default)]
    pub budget_range: String,
    /// Optional rating
    #[serde(default)]
    pub rating: Option<f64>,
    /// Short description
    #[serde(default)]
    pub description: String,
    /// Event types served
    #[serde(default)]
    pub event_types: Vec<String>,
}

impl Record for Vendor {
    const COLLECTION: Collection = Collection::Vendors;
}

/// Booking of a catalog vendor for an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventVendor {
    /// Document id
    #[serde(default)]
    pub id: String,
    /// Booked event
    pub event_id: String,
    /// Booked vendor
    pub vendor_id: String,
    /// Booking status, `"booked"` when created
    #[serde(default)]
    pub status: String,
    /// Organizer notes
    #[serde(default)]
    pub notes: String,
}

impl Record for EventVendor {
    const COLLECTION: Collection = Collection::EventVendors;
}

/// Reads every document of a snapshot as `R`, skipping (and logging) documents
/// that do not fit the record shape.
pub fn records_from_snapshot<R: Record>(docs: &[Document]) -> Vec<R> {
    docs.iter()
        .filter_map(|doc| match R::from_document(doc) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(
                    collection = %R::COLLECTION,
                    id = %doc.id,
                    "Skipping malformed document: {e}"
                );
                None
            }
        })
        .collect()
}
