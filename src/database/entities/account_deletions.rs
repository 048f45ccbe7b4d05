use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Tombstone marking an account for erasure.
///
/// `purge_after` is persisted so the purge survives process restarts: the
/// scheduler derives due-ness from this row, never from an in-memory timer.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "account_deletions")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub owner_id: String,
    pub requested_at: ChronoDateTimeUtc,
    pub purge_after: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
