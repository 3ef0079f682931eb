//! Vendor catalog and event bookings.
//!
//! The catalog (`vendors`) is global. A booking is an `eventVendors` document
//! linking one event to one vendor; nothing prevents the same pair from being
//! linked twice, so unbooking removes every matching link.

use super::validation::{Check, Form, Rule, parse_amount, validate};
use crate::{
    auth::Session,
    config::vendors::VendorConfig,
    errors::{Error, Result},
    models::{EventVendor, Record, Vendor, records_from_snapshot},
    store::{Collection, Direction, DocumentStore, Query},
};
use std::collections::HashSet;
use tracing::{debug, info};

/// Status written on every new booking.
pub const BOOKED: &str = "booked";

/// Raw input of the add-vendor form.
#[derive(Debug, Clone, Default)]
pub struct VendorForm {
    /// Display name
    pub name: String,
    /// Vendor type, e.g. "Catering"
    pub vendor_type: String,
    /// City or area served
    pub location: String,
    /// Free-text price band
    pub budget_range: String,
    /// Optional, must be a finite number when present
    pub rating: String,
    /// Short description
    pub description: String,
    /// Comma-separated event types
    pub event_types: String,
}

impl Form for VendorForm {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "name" => Some(&self.name),
            "type" => Some(&self.vendor_type),
            "location" => Some(&self.location),
            "rating" => Some(&self.rating),
            _ => None,
        }
    }
}

const VENDOR_RULES: &[Rule] = &[
    Rule::new("name", Check::Required, "Name, type, and location are required."),
    Rule::new("type", Check::Required, "Name, type, and location are required."),
    Rule::new("location", Check::Required, "Name, type, and location are required."),
    Rule::new("rating", Check::OptionalNumber, "Rating must be a number."),
];

/// Splits `"wedding, party,"` into `["wedding", "party"]`.
fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Adds a vendor to the catalog.
pub async fn add_vendor<S: DocumentStore>(
    store: &S,
    session: &Session,
    form: &VendorForm,
) -> Result<Vendor> {
    session.require_user()?;
    validate(form, VENDOR_RULES)?;

    let mut vendor = Vendor {
        id: String::new(),
        name: form.name.trim().to_string(),
        vendor_type: form.vendor_type.trim().to_string(),
        location: form.location.trim().to_string(),
        budget_range: form.budget_range.trim().to_string(),
        rating: parse_amount(&form.rating),
        description: form.description.trim().to_string(),
        event_types: split_tags(&form.event_types),
    };
    vendor.id = store
        .add_document(Collection::Vendors, vendor.to_fields()?)
        .await?;
    info!(vendor_id = %vendor.id, name = %vendor.name, "Vendor added to catalog");
    Ok(vendor)
}

/// Fetches one catalog entry.
pub async fn get_vendor<S: DocumentStore>(store: &S, vendor_id: &str) -> Result<Vendor> {
    let doc = store
        .get_document(Collection::Vendors, vendor_id)
        .await?
        .ok_or_else(|| Error::not_found("Vendor", vendor_id))?;
    Vendor::from_document(&doc)
}

/// Whole catalog, by name.
pub async fn list_vendors<S: DocumentStore>(store: &S) -> Result<Vec<Vendor>> {
    let docs = store
        .query(
            Collection::Vendors,
            &Query::new().order_by("name", Direction::Ascending),
        )
        .await?;
    Ok(records_from_snapshot(&docs))
}

/// Adds configured vendors whose name is not in the catalog yet.
///
/// Returns the number of vendors added.
pub async fn seed_vendor_catalog<S: DocumentStore>(
    store: &S,
    vendors: &[VendorConfig],
) -> Result<usize> {
    let existing: HashSet<String> = list_vendors(store)
        .await?
        .into_iter()
        .map(|v| v.name.to_lowercase())
        .collect();

    let mut added = 0;
    for config in vendors {
        if existing.contains(&config.name.to_lowercase()) {
            debug!(name = %config.name, "Vendor already in catalog, skipping");
            continue;
        }
        let vendor = Vendor {
            id: String::new(),
            name: config.name.clone(),
            vendor_type: config.vendor_type.clone(),
            location: config.location.clone(),
            budget_range: config.budget_range.clone(),
            rating: config.rating.filter(|r| r.is_finite()),
            description: config.description.clone(),
            event_types: config.event_types.clone(),
        };
        store
            .add_document(Collection::Vendors, vendor.to_fields()?)
            .await?;
        added += 1;
    }

    if added > 0 {
        info!(added, "Seeded vendor catalog");
    }
    Ok(added)
}

/// Links `vendor_id` to `event_id` with status [`BOOKED`].
pub async fn book_vendor<S: DocumentStore>(
    store: &S,
    session: &Session,
    event_id: &str,
    vendor_id: &str,
) -> Result<EventVendor> {
    session.require_user()?;
    get_vendor(store, vendor_id).await?;

    let mut link = EventVendor {
        id: String::new(),
        event_id: event_id.to_string(),
        vendor_id: vendor_id.to_string(),
        status: BOOKED.to_string(),
        notes: String::new(),
    };
    link.id = store
        .add_document(Collection::EventVendors, link.to_fields()?)
        .await?;
    info!(%event_id, %vendor_id, "Vendor booked");
    Ok(link)
}

fn links_query(event_id: &str, vendor_id: &str) -> Query {
    Query::new()
        .eq("eventId", event_id)
        .eq("vendorId", vendor_id)
}

/// Whether at least one link exists between the event and the vendor.
pub async fn is_vendor_booked<S: DocumentStore>(
    store: &S,
    event_id: &str,
    vendor_id: &str,
) -> Result<bool> {
    let links = store
        .query(Collection::EventVendors, &links_query(event_id, vendor_id))
        .await?;
    Ok(!links.is_empty())
}

/// Deletes every link between the event and the vendor and returns how many
/// were removed.
pub async fn remove_vendor_from_event<S: DocumentStore>(
    store: &S,
    session: &Session,
    event_id: &str,
    vendor_id: &str,
) -> Result<usize> {
    session.require_user()?;
    let links = store
        .query(Collection::EventVendors, &links_query(event_id, vendor_id))
        .await?;
    for link in &links {
        store
            .delete_document(Collection::EventVendors, &link.id)
            .await?;
    }
    info!(%event_id, %vendor_id, removed = links.len(), "Vendor removed from event");
    Ok(links.len())
}

/// Criteria for browsing the catalog. Empty criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VendorFilter {
    /// Exact vendor type
    pub vendor_type: Option<String>,
    /// Exact budget range
    pub budget_range: Option<String>,
    /// Substring of the location, case-insensitive
    pub location: Option<String>,
    /// Event type the vendor must list
    pub event_type: Option<String>,
    /// Substring of the name, case-insensitive
    pub search: Option<String>,
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.trim().to_lowercase())
}

impl VendorFilter {
    /// Whether `vendor` satisfies every criterion that is set.
    #[must_use]
    pub fn matches(&self, vendor: &Vendor) -> bool {
        self.vendor_type
            .as_deref()
            .is_none_or(|t| vendor.vendor_type == t)
            && self
                .budget_range
                .as_deref()
                .is_none_or(|b| vendor.budget_range == b)
            && self
                .location
                .as_deref()
                .is_none_or(|l| contains_ignore_case(&vendor.location, l))
            && self
                .event_type
                .as_deref()
                .is_none_or(|e| vendor.event_types.iter().any(|t| t.eq_ignore_ascii_case(e)))
            && self
                .search
                .as_deref()
                .is_none_or(|s| contains_ignore_case(&vendor.name, s))
    }
}

/// Lazily filters an already fetched catalog.
pub fn filter_catalog<'a>(
    vendors: &'a [Vendor],
    filter: &'a VendorFilter,
) -> impl Iterator<Item = &'a Vendor> + 'a {
    vendors.iter().filter(move |v| filter.matches(v))
}
