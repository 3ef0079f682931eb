//! Local auth provider.
//!
//! Accounts live in the `accounts` table with Argon2 password hashes. Reset
//! requests are queued in an outbox; delivering the mail is left to whoever
//! drains it.

use super::{AuthProvider, User};
use crate::{
    entities::{Account, account},
    errors::{Error, Result},
};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use sea_orm::{Set, prelude::*};
use std::sync::{Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

/// Password reset waiting to be mailed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordReset {
    /// Account email
    pub email: String,
    /// One-time token for the reset link
    pub token: String,
    /// When the reset was requested
    pub requested_at: DateTime<Utc>,
}

/// Auth provider over the local database.
pub struct LocalAuth {
    db: DatabaseConnection,
    state: watch::Sender<Option<User>>,
    outbox: Mutex<Vec<PasswordReset>>,
}

impl LocalAuth {
    /// Provider with nobody signed in.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            db,
            state,
            outbox: Mutex::new(Vec::new()),
        }
    }

    /// Removes and returns queued password resets.
    pub fn take_password_resets(&self) -> Vec<PasswordReset> {
        std::mem::take(&mut *self.outbox.lock().unwrap_or_else(PoisonError::into_inner))
    }

    async fn find_account(&self, email: &str) -> Result<Option<account::Model>> {
        Account::find()
            .filter(account::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    fn hash_password(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| Error::Auth {
                message: format!("Failed to hash password: {e}"),
            })
    }

    fn verify_password(password: &str, stored: &str) -> bool {
        PasswordHash::new(stored).is_ok_and(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl AuthProvider for LocalAuth {
    fn current_user(&self) -> Option<User> {
        self.state.borrow().clone()
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<User> {
        let email = normalize_email(email);
        let account = self.find_account(&email).await?;

        let Some(account) = account.filter(|a| Self::verify_password(password, &a.password_hash))
        else {
            warn!(%email, "Rejected sign-in");
            return Err(Error::Auth {
                message: "Invalid email or password".to_string(),
            });
        };

        let user = User {
            uid: account.uid,
            email: account.email,
        };
        info!(uid = %user.uid, "User signed in");
        self.state.send_replace(Some(user.clone()));
        Ok(user)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<User> {
        let email = normalize_email(email);
        if self.find_account(&email).await?.is_some() {
            return Err(Error::Auth {
                message: "Email address is already in use".to_string(),
            });
        }

        let account = account::ActiveModel {
            uid: Set(Uuid::new_v4().simple().to_string()),
            email: Set(email),
            password_hash: Set(Self::hash_password(password)?),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await?;

        let user = User {
            uid: account.uid,
            email: account.email,
        };
        info!(uid = %user.uid, "Account created");
        self.state.send_replace(Some(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> Result<()> {
        if let Some(user) = self.state.send_replace(None) {
            info!(uid = %user.uid, "User signed out");
        }
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<()> {
        let email = normalize_email(email);
        if self.find_account(&email).await?.is_none() {
            return Err(Error::Auth {
                message: "No account exists for this email".to_string(),
            });
        }

        info!(%email, "Password reset requested");
        self.outbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(PasswordReset {
                email,
                token: Uuid::new_v4().simple().to_string(),
                requested_at: Utc::now(),
            });
        Ok(())
    }

    fn on_auth_state_changed(&self) -> watch::Receiver<Option<User>> {
        self.state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        auth::{SignUpForm, reset_password, sign_in, sign_up},
        test_utils::setup_test_db,
    };

    fn form(email: &str, password: &str, confirm: &str) -> SignUpForm {
        SignUpForm {
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    #[tokio::test]
    async fn test_sign_up_signs_in() -> Result<()> {
        let auth = LocalAuth::new(setup_test_db().await?);
        let session = auth.session();

        let user = sign_up(&auth, &form("Ada@Example.com", "hunter22", "hunter22")).await?;
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(session.require_user()?, user);
        assert_eq!(auth.current_user(), Some(user));
        Ok(())
    }

    #[tokio::test]
    async fn test_sign_up_validation() -> Result<()> {
        let auth = LocalAuth::new(setup_test_db().await?);

        let mismatch = sign_up(&auth, &form("ada@example.com", "hunter22", "hunter23")).await;
        assert_eq!(mismatch.unwrap_err().to_string(), "Passwords don't match");

        let short = sign_up(&auth, &form("ada@example.com", "abc", "abc")).await;
        assert!(matches!(short, Err(Error::Validation { field: "password", .. })));

        let bad_email = sign_up(&auth, &form("ada", "hunter22", "hunter22")).await;
        assert!(matches!(bad_email, Err(Error::Validation { field: "email", .. })));

        assert!(auth.current_user().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_sign_up_rejected() -> Result<()> {
        let auth = LocalAuth::new(setup_test_db().await?);
        sign_up(&auth, &form("ada@example.com", "hunter22", "hunter22")).await?;

        let again = sign_up(&auth, &form("ADA@example.com", "other-pass", "other-pass")).await;
        assert!(matches!(again, Err(Error::Auth { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_sign_in_and_out() -> Result<()> {
        let auth = LocalAuth::new(setup_test_db().await?);
        let created = sign_up(&auth, &form("ada@example.com", "hunter22", "hunter22")).await?;
        auth.sign_out().await?;
        assert!(auth.current_user().is_none());

        let wrong = sign_in(&auth, "ada@example.com", "wrong-pass").await;
        assert!(matches!(wrong, Err(Error::Auth { .. })));
        assert!(auth.current_user().is_none());

        let empty = sign_in(&auth, "", "").await;
        assert!(matches!(empty, Err(Error::Validation { .. })));

        let user = sign_in(&auth, " ada@example.com ", "hunter22").await?;
        assert_eq!(user.uid, created.uid);
        Ok(())
    }

    #[tokio::test]
    async fn test_auth_state_feed_sees_sign_out() -> Result<()> {
        let auth = LocalAuth::new(setup_test_db().await?);
        let mut feed = auth.on_auth_state_changed();
        sign_up(&auth, &form("ada@example.com", "hunter22", "hunter22")).await?;
        feed.changed().await.unwrap();
        assert!(feed.borrow_and_update().is_some());

        auth.sign_out().await?;
        feed.changed().await.unwrap();
        assert!(feed.borrow_and_update().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_password_reset_outbox() -> Result<()> {
        let auth = LocalAuth::new(setup_test_db().await?);
        sign_up(&auth, &form("ada@example.com", "hunter22", "hunter22")).await?;

        reset_password(&auth, "ada@example.com").await?;
        let unknown = reset_password(&auth, "bob@example.com").await;
        assert!(matches!(unknown, Err(Error::Auth { .. })));
        let blank = reset_password(&auth, " ").await;
        assert!(matches!(blank, Err(Error::Validation { .. })));

        let resets = auth.take_password_resets();
        assert_eq!(resets.len(), 1);
        assert_eq!(resets[0].email, "ada@example.com");
        assert!(auth.take_password_resets().is_empty());
        Ok(())
    }
}
