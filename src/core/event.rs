//! Event business logic - creating, editing, reading and deleting events.
//!
//! Events belong to the user who created them: only the creator may update or
//! delete one. Deleting an event does not touch its guests, expenses, tasks or
//! bookings.

use super::validation::{Check, Form, Rule, parse_amount, parse_date, parse_timestamp, validate};
use crate::{
    auth::Session,
    errors::{Error, Result},
    models::{Event, Record, Timestamp, records_from_snapshot},
    store::{Collection, Direction, DocumentStore, Query},
};
use tracing::{debug, info};

/// Preset event types offered by the creation form.
pub const EVENT_TYPES: &[&str] = &[
    "conference",
    "workshop",
    "party",
    "wedding",
    "meeting",
    "corporate",
    "other",
];

/// Raw input of the create/edit event form.
#[derive(Debug, Clone, Default)]
pub struct EventForm {
    /// Event name
    pub name: String,
    /// `YYYY-MM-DD` or `MM/DD/YYYY`
    pub date: String,
    /// RFC 3339
    pub start_time: String,
    /// RFC 3339
    pub end_time: String,
    /// Venue
    pub location: String,
    /// Budget as typed
    pub budget: String,
    /// Description
    pub description: String,
    /// Host name
    pub hosted_by: String,
    /// One of [`EVENT_TYPES`]
    pub event_type: String,
    /// Label used when `event_type` is `"other"`
    pub custom_event_type: String,
    /// Hide from public listings
    pub is_private: bool,
}

impl Form for EventForm {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "name" => Some(&self.name),
            "date" => Some(&self.date),
            "start_time" => Some(&self.start_time),
            "end_time" => Some(&self.end_time),
            "location" => Some(&self.location),
            "budget" => Some(&self.budget),
            "description" => Some(&self.description),
            "hosted_by" => Some(&self.hosted_by),
            _ => None,
        }
    }
}

const EVENT_RULES: &[Rule] = &[
    Rule::new("name", Check::Required, "Event name is required."),
    Rule::new("date", Check::Required, "Event date is required."),
    Rule::new("date", Check::Date, "Please enter a valid date (MM/DD/YYYY)."),
    Rule::new("location", Check::Required, "Event location is required."),
    Rule::new("budget", Check::PositiveNumber, "Please enter a valid budget."),
    Rule::new("description", Check::Required, "Description is required."),
    Rule::new("hosted_by", Check::Required, "Hosted By is required."),
    Rule::new("start_time", Check::Timestamp, "Please choose a start time."),
    Rule::new("end_time", Check::Timestamp, "Please choose an end time."),
];

/// Validated form contents, ready to be written.
struct ValidEvent {
    name: String,
    date: String,
    start_time: String,
    end_time: String,
    location: String,
    budget: f64,
    description: String,
    hosted_by: String,
    event_type: String,
}

fn check_event_form(form: &EventForm) -> Result<ValidEvent> {
    validate(form, EVENT_RULES)?;

    let event_type = form.event_type.trim().to_lowercase();
    let event_type = match event_type.as_str() {
        "other" => {
            let custom = form.custom_event_type.trim();
            if custom.is_empty() {
                return Err(Error::validation(
                    "custom_event_type",
                    "Please enter a custom event type.",
                ));
            }
            custom.to_string()
        }
        "" => return Err(Error::validation("event_type", "Please choose an event type.")),
        preset if EVENT_TYPES.contains(&preset) => preset.to_string(),
        _ => return Err(Error::validation("event_type", "Please choose an event type.")),
    };

    // Rules above guarantee these parse.
    let (Some(date), Some(start), Some(end), Some(budget)) = (
        parse_date(&form.date),
        parse_timestamp(&form.start_time),
        parse_timestamp(&form.end_time),
        parse_amount(&form.budget),
    ) else {
        return Err(Error::validation("date", "Please enter a valid date (MM/DD/YYYY)."));
    };

    if start >= end {
        return Err(Error::validation(
            "end_time",
            "Start time must be before end time.",
        ));
    }

    Ok(ValidEvent {
        name: form.name.trim().to_string(),
        date: date.format("%Y-%m-%d").to_string(),
        start_time: start.to_rfc3339(),
        end_time: end.to_rfc3339(),
        location: form.location.trim().to_string(),
        budget,
        description: form.description.trim().to_string(),
        hosted_by: form.hosted_by.trim().to_string(),
        event_type,
    })
}

/// Creates an event owned by the signed-in user and returns it.
pub async fn create_event<S: DocumentStore>(
    store: &S,
    session: &Session,
    form: &EventForm,
) -> Result<Event> {
    let user = session.require_user()?;
    let valid = check_event_form(form)?;

    let mut event = Event {
        id: String::new(),
        name: valid.name,
        date: valid.date,
        start_time: Some(valid.start_time),
        end_time: Some(valid.end_time),
        location: valid.location,
        budget: valid.budget,
        description: valid.description,
        hosted_by: valid.hosted_by,
        event_type: valid.event_type,
        is_private: form.is_private,
        creator_uid: user.uid,
        created_at: Some(Timestamp::now()),
        legacy_guest_list: Vec::new(),
    };

    let mut fields = event.to_fields()?;
    fields.remove("guestList");
    event.id = store.add_document(Collection::Events, fields).await?;
    info!(event_id = %event.id, name = %event.name, "Event created");
    Ok(event)
}

/// Loads an event. A missing event is [`Error::NotFound`].
pub async fn get_event<S: DocumentStore>(store: &S, event_id: &str) -> Result<Event> {
    let doc = store
        .get_document(Collection::Events, event_id)
        .await?
        .ok_or_else(|| Error::not_found("Event", event_id))?;
    Event::from_document(&doc)
}

async fn get_owned_event<S: DocumentStore>(
    store: &S,
    session: &Session,
    event_id: &str,
) -> Result<Event> {
    let user = session.require_user()?;
    let event = get_event(store, event_id).await?;
    if event.creator_uid != user.uid {
        return Err(Error::PermissionDenied {
            message: "Only the event creator can change this event".to_string(),
        });
    }
    Ok(event)
}

/// Replaces the editable fields of an event the signed-in user created.
/// Creator, creation time and the legacy guest list are left untouched.
pub async fn update_event<S: DocumentStore>(
    store: &S,
    session: &Session,
    event_id: &str,
    form: &EventForm,
) -> Result<Event> {
    let valid = check_event_form(form)?;
    let mut event = get_owned_event(store, session, event_id).await?;

    event.name = valid.name;
    event.date = valid.date;
    event.start_time = Some(valid.start_time);
    event.end_time = Some(valid.end_time);
    event.location = valid.location;
    event.budget = valid.budget;
    event.description = valid.description;
    event.hosted_by = valid.hosted_by;
    event.event_type = valid.event_type;
    event.is_private = form.is_private;

    let mut fields = event.to_fields()?;
    for untouched in ["creatorUid", "createdAt", "guestList"] {
        fields.remove(untouched);
    }
    store
        .update_document(Collection::Events, event_id, fields)
        .await?;
    info!(%event_id, "Event updated");
    Ok(event)
}

/// Deletes an event the signed-in user created.
pub async fn delete_event<S: DocumentStore>(
    store: &S,
    session: &Session,
    event_id: &str,
) -> Result<()> {
    get_owned_event(store, session, event_id).await?;
    store.delete_document(Collection::Events, event_id).await?;
    info!(%event_id, "Event deleted");
    Ok(())
}

/// Events created by the signed-in user, by date.
pub async fn list_events_for_creator<S: DocumentStore>(
    store: &S,
    session: &Session,
) -> Result<Vec<Event>> {
    let user = session.require_user()?;
    let query = Query::new()
        .eq("creatorUid", user.uid.as_str())
        .order_by("date", Direction::Ascending);
    let docs = store.query(Collection::Events, &query).await?;
    debug!(uid = %user.uid, count = docs.len(), "Listed events");
    Ok(records_from_snapshot(&docs))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_event_stores_normalized_fields() -> Result<()> {
        let store = setup_test_store().await?;
        let session = organizer_session();

        let mut form = sample_event_form("Spring Gala");
        form.date = "04/12/2026".to_string();
        form.event_type = "Wedding".to_string();
        let event = create_event(&store, &session, &form).await?;

        let stored = get_event(&store, &event.id).await?;
        assert_eq!(stored.name, "Spring Gala");
        assert_eq!(stored.date, "2026-04-12");
        assert_eq!(stored.budget, 1000.0);
        assert_eq!(stored.event_type, "wedding");
        assert_eq!(stored.creator_uid, ORGANIZER_UID);
        assert!(stored.legacy_guest_list.is_empty());
        assert!(stored.created_at.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_create_event_requires_login() -> Result<()> {
        let store = setup_recording_store().await?;
        let result =
            create_event(&store, &crate::auth::Session::anonymous(), &sample_event_form("X")).await;
        assert!(matches!(result, Err(Error::Unauthenticated)));
        assert_eq!(store.write_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_event_validation() -> Result<()> {
        let store = setup_recording_store().await?;
        let session = organizer_session();

        let mut form = sample_event_form("Gala");
        form.budget = "abc".to_string();
        let err = create_event(&store, &session, &form).await.unwrap_err();
        assert_eq!(err.to_string(), "Please enter a valid budget.");

        let mut form = sample_event_form("Gala");
        form.budget = "0".to_string();
        assert!(create_event(&store, &session, &form).await.is_err());

        let mut form = sample_event_form("Gala");
        form.event_type = "other".to_string();
        let err = create_event(&store, &session, &form).await.unwrap_err();
        assert_eq!(err.to_string(), "Please enter a custom event type.");

        let mut form = sample_event_form("Gala");
        form.end_time = form.start_time.clone();
        let err = create_event(&store, &session, &form).await.unwrap_err();
        assert_eq!(err.to_string(), "Start time must be before end time.");

        let form = sample_event_form("   ");
        let err = create_event(&store, &session, &form).await.unwrap_err();
        assert_eq!(err.to_string(), "Event name is required.");

        assert_eq!(store.write_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_custom_event_type_is_stored() -> Result<()> {
        let store = setup_test_store().await?;
        let mut form = sample_event_form("Retreat");
        form.event_type = "other".to_string();
        form.custom_event_type = " Team offsite ".to_string();

        let event = create_event(&store, &organizer_session(), &form).await?;
        assert_eq!(event.event_type, "Team offsite");
        Ok(())
    }

    #[tokio::test]
    async fn test_update_event_keeps_creator() -> Result<()> {
        let store = setup_test_store().await?;
        let session = organizer_session();
        let event = create_event(&store, &session, &sample_event_form("Gala")).await?;

        let mut form = sample_event_form("Winter Gala");
        form.budget = "2500".to_string();
        update_event(&store, &session, &event.id, &form).await?;

        let stored = get_event(&store, &event.id).await?;
        assert_eq!(stored.name, "Winter Gala");
        assert_eq!(stored.budget, 2500.0);
        assert_eq!(stored.creator_uid, ORGANIZER_UID);
        assert_eq!(stored.created_at, event.created_at);
        Ok(())
    }

    #[tokio::test]
    async fn test_only_creator_may_update_or_delete() -> Result<()> {
        let store = setup_test_store().await?;
        let event = create_event(&store, &organizer_session(), &sample_event_form("Gala")).await?;

        let other = guest_session("mallory@example.com");
        let update = update_event(&store, &other, &event.id, &sample_event_form("Mine")).await;
        assert!(matches!(update, Err(Error::PermissionDenied { .. })));
        let delete = delete_event(&store, &other, &event.id).await;
        assert!(matches!(delete, Err(Error::PermissionDenied { .. })));

        assert_eq!(get_event(&store, &event.id).await?.name, "Gala");
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_event_then_not_found() -> Result<()> {
        let store = setup_test_store().await?;
        let session = organizer_session();
        let event = create_event(&store, &session, &sample_event_form("Gala")).await?;

        delete_event(&store, &session, &event.id).await?;
        let result = get_event(&store, &event.id).await;
        assert!(matches!(result, Err(Error::NotFound { entity: "Event", .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_events_for_creator() -> Result<()> {
        let store = setup_test_store().await?;
        let session = organizer_session();

        let mut late = sample_event_form("Late");
        late.date = "2026-12-01".to_string();
        let mut early = sample_event_form("Early");
        early.date = "2026-01-15".to_string();
        create_event(&store, &session, &late).await?;
        create_event(&store, &session, &early).await?;
        create_event(&store, &guest_session("someone@example.com"), &sample_event_form("Theirs"))
            .await?;

        let events = list_events_for_creator(&store, &session).await?;
        let names: Vec<_> = events.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Early", "Late"]);
        Ok(())
    }
}
