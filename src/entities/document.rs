//! Document entity - One row per stored document.
//!
//! Every collection of the document store shares this table. The `collection`
//! column scopes rows, and the document body lives in `fields` as a JSON object.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Document database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "documents")]
pub struct Model {
    /// Document id, unique across all collections
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Collection name (e.g. `"expenses"`, `"eventVendors"`)
    pub collection: String,
    /// Document body as a JSON object
    pub fields: Json,
    /// When the document was first written
    pub created_at: DateTimeUtc,
    /// When the document was last written
    pub updated_at: DateTimeUtc,
}

/// Documents carry no foreign keys; relations live inside `fields`
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
