//! Ordered removal of every video and the rows referencing it.
//!
//! Dependent tables are emptied before `videos`, then the cached channel
//! aggregates derived from videos are reset. The order lives in
//! [`PURGE_ORDER`] and is checked by [`is_dependency_ordered`] before any
//! row is touched.
//!
//! The job performs no retries and no compensation: the first failing step
//! stops it. Every step is idempotent, so re-running is the recovery path.
//! [`VideoPurgeJob::run_in_transaction`] gives all-or-nothing semantics on
//! PostgreSQL.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::store::{Assignment, PgVideoStore, StoreError, Table, VideoStore};

/// Deletion order: every table referencing `videos` first, then `videos`.
pub const PURGE_ORDER: [Table; 8] = [
    Table::PlaylistItem,
    Table::WatchLater,
    Table::WatchHistory,
    Table::Like,
    Table::Dislike,
    Table::Comment,
    Table::VideoTag,
    Table::Video,
];

/// Channel counters derived from video rows, reset once no video remains.
pub const CHANNEL_AGGREGATE_RESET: [Assignment; 2] = [
    Assignment::new("video_count", 0),
    Assignment::new("total_views", 0),
];

/// Whether deleting `order` front to back can never hit a foreign key.
///
/// Holds when no table appears twice and every table referencing a table
/// in `order` is itself deleted earlier.
pub fn is_dependency_ordered(order: &[Table]) -> bool {
    order.iter().enumerate().all(|(position, table)| {
        !order[..position].contains(table)
            && table
                .referenced_by()
                .all(|child| order[..position].contains(&child))
    })
}

/// One unit of work in a purge run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "step", content = "table", rename_all = "snake_case")]
pub enum PurgeStep {
    Delete(Table),
    ResetChannelAggregates,
}

impl fmt::Display for PurgeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PurgeStep::Delete(table) => write!(f, "delete {table}"),
            PurgeStep::ResetChannelAggregates => f.write_str("reset channel aggregates"),
        }
    }
}

/// Progress notifications emitted while a purge runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgeEvent {
    Started(PurgeStep),
    Finished { step: PurgeStep, rows: u64 },
}

#[derive(Error, Debug)]
pub enum PurgeError {
    /// A step failed; nothing after it was attempted
    #[error("Purge step '{step}' failed: {source}")]
    Step {
        step: PurgeStep,
        #[source]
        source: StoreError,
    },

    /// Deletion order would delete a table before its dependents
    #[error("Deletion order violates foreign key dependencies: {0:?}")]
    InvalidOrder(Vec<Table>),

    /// Transaction could not be opened; nothing was attempted
    #[error("Failed to begin purge transaction: {0}")]
    Begin(#[source] StoreError),

    /// Every step succeeded but the transaction did not commit; nothing was deleted
    #[error("Failed to commit purge transaction: {0}")]
    Commit(#[source] StoreError),

    /// Count query failed during a dry run
    #[error("Failed to count {table}: {source}")]
    Count {
        table: Table,
        #[source]
        source: StoreError,
    },
}

pub type PurgeResult<T> = Result<T, PurgeError>;

/// Rows affected by a completed purge.
#[derive(Debug, Clone, Serialize)]
pub struct PurgeReport {
    /// Rows deleted per table, in execution order
    pub deleted: Vec<(Table, u64)>,
    pub channels_reset: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PurgeReport {
    pub fn total_deleted(&self) -> u64 {
        self.deleted.iter().map(|(_, rows)| rows).sum()
    }
}

/// Rows a purge would affect, gathered without writing.
#[derive(Debug, Clone, Serialize)]
pub struct DryRunReport {
    /// Current row count per table, in deletion order
    pub rows: Vec<(Table, i64)>,
    pub channels: i64,
}

/// Deletes every video and its dependent rows, then resets channel aggregates.
#[derive(Debug, Clone)]
pub struct VideoPurgeJob {
    order: Vec<Table>,
}

impl Default for VideoPurgeJob {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoPurgeJob {
    pub fn new() -> Self {
        Self {
            order: PURGE_ORDER.to_vec(),
        }
    }

    /// Use a custom deletion order. It is validated when the job runs.
    pub fn with_order(order: Vec<Table>) -> Self {
        Self { order }
    }

    pub fn order(&self) -> &[Table] {
        &self.order
    }

    pub async fn run<S>(&self, store: &S) -> PurgeResult<PurgeReport>
    where
        S: VideoStore + ?Sized,
    {
        self.run_with_progress(store, |_| {}).await
    }

    /// Run the purge, reporting each step to `on_event` as it starts and finishes.
    pub async fn run_with_progress<S, F>(&self, store: &S, mut on_event: F) -> PurgeResult<PurgeReport>
    where
        S: VideoStore + ?Sized,
        F: FnMut(PurgeEvent) + Send,
    {
        if !is_dependency_ordered(&self.order) {
            return Err(PurgeError::InvalidOrder(self.order.clone()));
        }

        let started_at = Utc::now();
        info!(tables = self.order.len(), "Starting video purge");

        let mut deleted = Vec::with_capacity(self.order.len());
        for &table in &self.order {
            let step = PurgeStep::Delete(table);
            on_event(PurgeEvent::Started(step));
            debug!(%table, "Deleting rows");

            let rows = store
                .delete_many(table)
                .await
                .map_err(|source| PurgeError::Step { step, source })?;

            info!(%table, rows, "Deleted rows");
            on_event(PurgeEvent::Finished { step, rows });
            deleted.push((table, rows));
        }

        let step = PurgeStep::ResetChannelAggregates;
        on_event(PurgeEvent::Started(step));
        let channels_reset = store
            .update_many(Table::Channel, &CHANNEL_AGGREGATE_RESET)
            .await
            .map_err(|source| PurgeError::Step { step, source })?;
        info!(channels = channels_reset, "Reset channel aggregates");
        on_event(PurgeEvent::Finished {
            step,
            rows: channels_reset,
        });

        let report = PurgeReport {
            deleted,
            channels_reset,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            total_deleted = report.total_deleted(),
            channels_reset,
            "Video purge completed"
        );
        Ok(report)
    }

    /// Run the purge inside one transaction, committed only after the last step.
    ///
    /// On any error the transaction is rolled back and no row is changed.
    pub async fn run_in_transaction<F>(
        &self,
        store: &PgVideoStore,
        on_event: F,
    ) -> PurgeResult<PurgeReport>
    where
        F: FnMut(PurgeEvent) + Send,
    {
        let tx = store.begin().await.map_err(PurgeError::Begin)?;

        match self.run_with_progress(&tx, on_event).await {
            Ok(report) => {
                tx.commit().await.map_err(PurgeError::Commit)?;
                info!("Purge transaction committed");
                Ok(report)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed, transaction aborted on disconnect");
                } else {
                    info!("Purge transaction rolled back");
                }
                Err(e)
            }
        }
    }

    /// Count the rows each step would affect.
    pub async fn dry_run<S>(&self, store: &S) -> PurgeResult<DryRunReport>
    where
        S: VideoStore + ?Sized,
    {
        if !is_dependency_ordered(&self.order) {
            return Err(PurgeError::InvalidOrder(self.order.clone()));
        }

        let mut rows = Vec::with_capacity(self.order.len());
        for &table in &self.order {
            let count = store
                .count(table)
                .await
                .map_err(|source| PurgeError::Count { table, source })?;
            rows.push((table, count));
        }

        let channels = store
            .count(Table::Channel)
            .await
            .map_err(|source| PurgeError::Count {
                table: Table::Channel,
                source,
            })?;

        Ok(DryRunReport { rows, channels })
    }
}
