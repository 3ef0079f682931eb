//! Guest list business logic.
//!
//! Guests live in the `guestLists` collection, one document per invitation,
//! keyed to their event by `eventId`. The earliest clients embedded guests in
//! the event document instead; that list is never migrated, so
//! [`unmigrated_legacy_guests`] reports entries that only exist there.

use super::validation::{Check, Form, Rule, validate};
use crate::{
    auth::Session,
    errors::Result,
    models::{Event, Guest, Record, RsvpStatus, records_from_snapshot},
    store::{Collection, DocumentStore, Fields, Query},
};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Raw input of the add-guest form.
#[derive(Debug, Clone, Default)]
pub struct GuestForm {
    /// Guest name
    pub name: String,
    /// Invitation email
    pub email: String,
    /// Meal preference
    pub meal: String,
    /// VIP toggle
    pub vip: bool,
}

impl Form for GuestForm {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "name" => Some(&self.name),
            "email" => Some(&self.email),
            "meal" => Some(&self.meal),
            _ => None,
        }
    }
}

const GUEST_RULES: &[Rule] = &[
    Rule::new("name", Check::Required, "Guest name and email are required."),
    Rule::new("email", Check::Required, "Guest name and email are required."),
    Rule::new("email", Check::Email, "Please enter a valid email address."),
];

/// Invitation emails are stored and looked up lowercased.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Invites a guest to `event_id`. New guests start as [`RsvpStatus::Pending`].
pub async fn add_guest<S: DocumentStore>(
    store: &S,
    session: &Session,
    event_id: &str,
    form: &GuestForm,
) -> Result<Guest> {
    session.require_user()?;
    validate(form, GUEST_RULES)?;

    let mut guest = Guest {
        id: String::new(),
        event_id: event_id.to_string(),
        name: form.name.trim().to_string(),
        email: normalize_email(&form.email),
        rsvp: RsvpStatus::Pending,
        meal: form.meal.trim().to_string(),
        vip: form.vip,
    };
    guest.id = store
        .add_document(Collection::GuestLists, guest.to_fields()?)
        .await?;
    info!(%event_id, guest_id = %guest.id, "Guest added");
    Ok(guest)
}

/// Removes an invitation.
pub async fn remove_guest<S: DocumentStore>(
    store: &S,
    session: &Session,
    guest_id: &str,
) -> Result<()> {
    session.require_user()?;
    store
        .delete_document(Collection::GuestLists, guest_id)
        .await?;
    info!(%guest_id, "Guest removed");
    Ok(())
}

/// Sets the VIP flag. Only `vip` is written; the RSVP is left alone.
pub async fn set_guest_vip<S: DocumentStore>(
    store: &S,
    session: &Session,
    guest_id: &str,
    vip: bool,
) -> Result<()> {
    session.require_user()?;
    let mut fields = Fields::new();
    fields.insert("vip".to_string(), Value::Bool(vip));
    store
        .update_document(Collection::GuestLists, guest_id, fields)
        .await?;
    info!(%guest_id, vip, "Guest VIP flag changed");
    Ok(())
}

/// All guests invited to `event_id`.
pub async fn list_guests<S: DocumentStore>(
    store: &S,
    session: &Session,
    event_id: &str,
) -> Result<Vec<Guest>> {
    session.require_user()?;
    let docs = store
        .query(Collection::GuestLists, &Query::new().eq("eventId", event_id))
        .await?;
    debug!(%event_id, count = docs.len(), "Fetched guest list");
    Ok(records_from_snapshot(&docs))
}

/// Invitations addressed to the signed-in user's email.
pub async fn invitations_for_session<S: DocumentStore>(
    store: &S,
    session: &Session,
) -> Result<Vec<Guest>> {
    let user = session.require_user()?;
    let docs = store
        .query(
            Collection::GuestLists,
            &Query::new().eq("email", normalize_email(&user.email)),
        )
        .await?;
    debug!(uid = %user.uid, count = docs.len(), "Fetched invitations");
    Ok(records_from_snapshot(&docs))
}

/// Names of guests embedded in `event` that have no invitation with the same
/// name (case-insensitive) in `guests`.
#[must_use]
pub fn unmigrated_legacy_guests(event: &Event, guests: &[Guest]) -> Vec<String> {
    let known: HashSet<String> = guests.iter().map(|g| g.name.trim().to_lowercase()).collect();
    let missing: Vec<String> = event
        .legacy_guest_list
        .iter()
        .filter(|legacy| !known.contains(&legacy.name.trim().to_lowercase()))
        .map(|legacy| legacy.name.clone())
        .collect();

    if !missing.is_empty() {
        warn!(
            event_id = %event.id,
            count = missing.len(),
            "Event has embedded guests missing from the guest list"
        );
    }
    missing
}
