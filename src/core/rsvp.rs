//! RSVP state machine.
//!
//! A guest starts `Pending` and answers `Yes`, `No` or `Maybe`. An answer can
//! be changed to another answer but never reset to `Pending`. Responding
//! writes only the `rsvp` field of the guest's own document, addressed by id;
//! the id comes from [`super::guest::invitations_for_session`].

use crate::{
    auth::Session,
    errors::{Error, Result},
    models::{Guest, Record, RsvpStatus},
    store::{Collection, DocumentStore, Fields},
};
use serde_json::Value;
use tracing::info;

impl RsvpStatus {
    /// Whether a guest in `self` may move to `to`.
    #[must_use]
    pub const fn can_transition_to(self, to: Self) -> bool {
        !matches!(to, Self::Pending)
    }

    /// Checked transition.
    ///
    /// # Errors
    /// [`Error::InvalidTransition`] when `to` is `Pending`.
    pub fn transition(self, to: Self) -> Result<Self> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(Error::InvalidTransition {
                from: self.to_string(),
                to: to.to_string(),
            })
        }
    }
}

/// Records the signed-in guest's answer on invitation `guest_id`.
///
/// The invitation must be addressed to the session's email.
pub async fn respond<S: DocumentStore>(
    store: &S,
    session: &Session,
    guest_id: &str,
    status: RsvpStatus,
) -> Result<RsvpStatus> {
    let user = session.require_user()?;

    let doc = store
        .get_document(Collection::GuestLists, guest_id)
        .await?
        .ok_or_else(|| Error::not_found("Invitation", guest_id))?;
    let guest = Guest::from_document(&doc)?;

    if !guest.email.trim().eq_ignore_ascii_case(user.email.trim()) {
        return Err(Error::PermissionDenied {
            message: "This invitation belongs to another guest".to_string(),
        });
    }

    let next = guest.rsvp.transition(status)?;

    let mut fields = Fields::new();
    fields.insert("rsvp".to_string(), Value::String(next.to_string()));
    store
        .update_document(Collection::GuestLists, guest_id, fields)
        .await?;

    info!(%guest_id, from = %guest.rsvp, to = %next, "RSVP updated");
    Ok(next)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        core::guest::{GuestForm, add_guest, list_guests},
        store::DocumentStore,
        test_utils::*,
    };

    async fn invite(store: &impl DocumentStore) -> Result<Guest> {
        add_guest(
            store,
            &organizer_session(),
            "e1",
            &GuestForm {
                name: "Ada".to_string(),
                email: GUEST_EMAIL.to_string(),
                meal: "Fish".to_string(),
                vip: true,
            },
        )
        .await
    }

    #[test]
    fn test_transitions() {
        use RsvpStatus::{Maybe, No, Pending, Yes};

        assert_eq!(Pending.transition(Yes).unwrap(), Yes);
        assert_eq!(Pending.transition(Maybe).unwrap(), Maybe);
        assert_eq!(Yes.transition(No).unwrap(), No);
        assert!(matches!(
            Yes.transition(Pending),
            Err(Error::InvalidTransition { .. })
        ));
        assert!(Pending.transition(Pending).is_err());
    }

    #[tokio::test]
    async fn test_respond_updates_only_rsvp() -> Result<()> {
        let store = setup_recording_store().await?;
        let guest = invite(&store).await?;
        store.reset_calls();

        let status = respond(&store, &guest_session(GUEST_EMAIL), &guest.id, RsvpStatus::Yes).await?;
        assert_eq!(status, RsvpStatus::Yes);

        let updates = store.updates();
        assert_eq!(updates.len(), 1);
        let (collection, id, fields) = &updates[0];
        assert_eq!(*collection, Collection::GuestLists);
        assert_eq!(id, &guest.id);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields.get("rsvp"), Some(&Value::String("Yes".to_string())));

        let stored = &list_guests(&store, &organizer_session(), "e1").await?[0];
        assert_eq!(stored.rsvp, RsvpStatus::Yes);
        assert_eq!(stored.name, "Ada");
        assert_eq!(stored.email, GUEST_EMAIL);
        assert_eq!(stored.meal, "Fish");
        assert!(stored.vip);
        Ok(())
    }

    #[tokio::test]
    async fn test_respond_cannot_reset_to_pending() -> Result<()> {
        let store = setup_recording_store().await?;
        let guest = invite(&store).await?;
        let session = guest_session(GUEST_EMAIL);
        respond(&store, &session, &guest.id, RsvpStatus::Maybe).await?;
        store.reset_calls();

        let result = respond(&store, &session, &guest.id, RsvpStatus::Pending).await;
        assert!(matches!(result, Err(Error::InvalidTransition { .. })));
        assert_eq!(store.write_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_respond_checks_invitee() -> Result<()> {
        let store = setup_test_store().await?;
        let guest = invite(&store).await?;

        let result = respond(
            &store,
            &guest_session("mallory@example.com"),
            &guest.id,
            RsvpStatus::No,
        )
        .await;
        assert!(matches!(result, Err(Error::PermissionDenied { .. })));

        // Email comparison ignores case
        let upper = GUEST_EMAIL.to_uppercase();
        respond(&store, &guest_session(&upper), &guest.id, RsvpStatus::No).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_respond_unknown_invitation() -> Result<()> {
        let store = setup_test_store().await?;
        let result = respond(&store, &guest_session(GUEST_EMAIL), "nope", RsvpStatus::Yes).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
        Ok(())
    }
}
