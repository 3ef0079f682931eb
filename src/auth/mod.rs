//! Authentication contract and session context.
//!
//! Protected operations take a [`Session`] explicitly instead of reading a
//! global "current user". A session follows the auth provider's state, so a
//! sign-out is visible to every holder of the session.

/// Local auth provider backed by the `accounts` table
pub mod local;

use crate::{
    core::validation::{Check, Form, Rule, validate},
    errors::{Error, Result},
};
use std::future::Future;
use tokio::sync::watch;

/// Signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Stable user id
    pub uid: String,
    /// Login email
    pub email: String,
}

/// Contract with the authentication service.
pub trait AuthProvider: Send + Sync {
    /// Currently signed-in user, if any.
    fn current_user(&self) -> Option<User>;

    /// Signs in with email and password.
    fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<User>> + Send;

    /// Creates an account and signs it in.
    fn sign_up(&self, email: &str, password: &str) -> impl Future<Output = Result<User>> + Send;

    /// Signs the current user out.
    fn sign_out(&self) -> impl Future<Output = Result<()>> + Send;

    /// Starts a password reset for `email`.
    fn send_password_reset(&self, email: &str) -> impl Future<Output = Result<()>> + Send;

    /// Auth state feed. The receiver holds the current user and changes on
    /// every sign-in and sign-out.
    fn on_auth_state_changed(&self) -> watch::Receiver<Option<User>>;

    /// Session bound to this provider.
    fn session(&self) -> Session {
        Session::new(self.on_auth_state_changed())
    }
}

/// Explicit session context handed to mutators and view-models.
#[derive(Debug, Clone)]
pub struct Session {
    state: watch::Receiver<Option<User>>,
}

impl Session {
    /// Session following an auth state feed.
    #[must_use]
    pub const fn new(state: watch::Receiver<Option<User>>) -> Self {
        Self { state }
    }

    /// Fixed session for `user`, detached from any provider.
    #[must_use]
    pub fn signed_in(user: User) -> Self {
        let (_, state) = watch::channel(Some(user));
        Self { state }
    }

    /// Fixed session with nobody signed in.
    #[must_use]
    pub fn anonymous() -> Self {
        let (_, state) = watch::channel(None);
        Self { state }
    }

    /// User signed in right now.
    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().clone()
    }

    /// Signed-in user, or [`Error::Unauthenticated`].
    ///
    /// Callers treat that error as "go to the login screen".
    pub fn require_user(&self) -> Result<User> {
        self.current_user().ok_or(Error::Unauthenticated)
    }

    /// Independent receiver on the auth state, for loops that need to react to sign-out.
    #[must_use]
    pub fn watcher(&self) -> watch::Receiver<Option<User>> {
        self.state.clone()
    }
}

/// Sign-up input, checked before the provider is called.
#[derive(Debug, Clone, Default)]
pub struct SignUpForm {
    /// Login email
    pub email: String,
    /// Chosen password
    pub password: String,
    /// Password typed a second time
    pub confirm_password: String,
}

impl Form for SignUpForm {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "email" => Some(&self.email),
            "password" => Some(&self.password),
            _ => None,
        }
    }
}

const SIGN_UP_RULES: &[Rule] = &[
    Rule::new("email", Check::Required, "Please enter email and password."),
    Rule::new("email", Check::Email, "Please enter a valid email address."),
    Rule::new("password", Check::Required, "Please enter email and password."),
];

/// Minimum password length accepted by [`sign_up`].
pub const MIN_PASSWORD_LEN: usize = 6;

/// Validates `form` and creates the account.
pub async fn sign_up(auth: &impl AuthProvider, form: &SignUpForm) -> Result<User> {
    validate(form, SIGN_UP_RULES)?;
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::validation(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters."),
        ));
    }
    if form.password != form.confirm_password {
        return Err(Error::validation("confirm_password", "Passwords don't match"));
    }
    auth.sign_up(form.email.trim(), &form.password).await
}

/// Checks that both credentials are present, then signs in.
pub async fn sign_in(auth: &impl AuthProvider, email: &str, password: &str) -> Result<User> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(Error::validation("email", "Please enter email and password."));
    }
    auth.sign_in_with_password(email.trim(), password).await
}

/// Checks that an email is present, then requests a reset.
pub async fn reset_password(auth: &impl AuthProvider, email: &str) -> Result<()> {
    if email.trim().is_empty() {
        return Err(Error::validation("email", "Please enter your email address."));
    }
    auth.send_password_reset(email.trim()).await
}
