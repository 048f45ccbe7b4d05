use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A published dataset. The row is the record of truth; file bytes live in
/// the blob store at `storage_key` and `url` is the signed read URL minted
/// at upload.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "datasets")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    pub description: String,
    pub file_name: String,
    pub storage_key: String,
    pub url: String,
    pub content_type: String,
    pub file_size: i64,
    pub owner_id: String,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
