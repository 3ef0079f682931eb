//! Account entity - Credentials for the local auth provider.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Account database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    /// Stable user id handed out on sign-up
    #[sea_orm(primary_key, auto_increment = false)]
    pub uid: String,
    /// Login email, stored lowercase
    #[sea_orm(unique)]
    pub email: String,
    /// Argon2 PHC string
    pub password_hash: String,
    /// When the account was created
    pub created_at: DateTimeUtc,
}

/// `Account` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
