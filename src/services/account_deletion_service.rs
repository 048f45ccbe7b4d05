use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::database::entities::{
    account_deletions, account_deletions::Entity as AccountDeletions, datasets,
    datasets::Entity as Datasets, projects, projects::Entity as Projects,
};
use crate::errors::ApiError;
use crate::storage::BlobStore;

/// Grace period between a deletion request and the purge.
pub const DELETION_GRACE_DAYS: i64 = 3;

/// How often the purge loop checks for due tombstones.
pub const PURGE_POLL_INTERVAL: StdDuration = StdDuration::from_secs(60);

/// Deferred account teardown: `Active -> MarkedForDeletion -> Purged`.
///
/// Marking upserts a tombstone whose `purge_after` is persisted, so pending
/// deletions survive restarts. The purge itself is idempotent and driven by
/// [`spawn_purge_loop`]; a failed purge leaves the tombstone in place and is
/// retried on the next tick. There is no operation to cancel a pending
/// deletion.
#[derive(Clone)]
pub struct AccountDeletionService {
    db: DatabaseConnection,
    blobs: Arc<dyn BlobStore>,
    grace: Duration,
}

impl AccountDeletionService {
    pub fn new(db: DatabaseConnection, blobs: Arc<dyn BlobStore>) -> Self {
        Self::with_grace(db, blobs, Duration::days(DELETION_GRACE_DAYS))
    }

    pub fn with_grace(db: DatabaseConnection, blobs: Arc<dyn BlobStore>, grace: Duration) -> Self {
        Self { db, blobs, grace }
    }

    /// `Active -> MarkedForDeletion`. Repeat requests reset the clock.
    pub async fn mark_for_deletion(&self, owner_id: &str) -> Result<String, ApiError> {
        let now = Utc::now();
        let tombstone = account_deletions::ActiveModel {
            owner_id: Set(owner_id.to_string()),
            requested_at: Set(now),
            purge_after: Set(now + self.grace),
        };

        AccountDeletions::insert(tombstone)
            .on_conflict(
                OnConflict::column(account_deletions::Column::OwnerId)
                    .update_columns([
                        account_deletions::Column::RequestedAt,
                        account_deletions::Column::PurgeAfter,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(|err| ApiError::internal("Failed to process account deletion", err))?;

        info!("Account {} marked for deletion", owner_id);
        Ok(format!(
            "Account marked for deletion. Data will be removed in {} days.",
            self.grace.num_days()
        ))
    }

    /// `MarkedForDeletion -> Purged` for every tombstone due at `now`.
    ///
    /// Returns how many accounts were fully purged. A failed purge logs and
    /// keeps its tombstone so the next pass retries it.
    pub async fn purge_due(&self, now: DateTime<Utc>) -> anyhow::Result<usize> {
        let due = AccountDeletions::find()
            .filter(account_deletions::Column::PurgeAfter.lte(now))
            .all(&self.db)
            .await?;

        let mut purged = 0;
        for tombstone in due {
            match self.purge_owner(&tombstone.owner_id).await {
                Ok(()) => {
                    info!(
                        "User {} data deleted after the deletion grace period",
                        tombstone.owner_id
                    );
                    purged += 1;
                }
                Err(err) => {
                    warn!(
                        "Purge for user {} failed, tombstone kept for retry: {:#}",
                        tombstone.owner_id, err
                    );
                }
            }
        }

        Ok(purged)
    }

    /// Deletes the owner's datasets (blobs then rows), projects, and the
    /// tombstone, in that order.
    async fn purge_owner(&self, owner_id: &str) -> anyhow::Result<()> {
        let owned_datasets = Datasets::find()
            .filter(datasets::Column::OwnerId.eq(owner_id))
            .all(&self.db)
            .await?;

        for dataset in owned_datasets {
            if let Err(err) = self.blobs.delete(&dataset.storage_key).await {
                warn!(
                    "Failed to delete blob {} while purging user {}: {:#}",
                    dataset.storage_key, owner_id, err
                );
            }
        }

        Datasets::delete_many()
            .filter(datasets::Column::OwnerId.eq(owner_id))
            .exec(&self.db)
            .await?;

        Projects::delete_many()
            .filter(projects::Column::OwnerId.eq(owner_id))
            .exec(&self.db)
            .await?;

        AccountDeletions::delete_many()
            .filter(account_deletions::Column::OwnerId.eq(owner_id))
            .exec(&self.db)
            .await?;

        Ok(())
    }
}

/// Runs the purge pass on a fixed interval until the server shuts down.
pub fn spawn_purge_loop(
    service: AccountDeletionService,
    poll_interval: StdDuration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match service.purge_due(Utc::now()).await {
                Ok(0) => {}
                Ok(count) => info!("Purged {} account(s) past their grace period", count),
                Err(err) => error!("Account purge pass failed: {:#}", err),
            }
        }
    })
}
