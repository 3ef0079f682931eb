//! Entity module - Contains all SeaORM entity definitions for the database.
//! `documents` backs the document store, `accounts` backs the local auth provider.

pub mod account;
pub mod document;

// Re-export specific types to avoid conflicts
pub use account::{Column as AccountColumn, Entity as Account, Model as AccountModel};
pub use document::{Column as DocumentColumn, Entity as Document, Model as DocumentModel};
