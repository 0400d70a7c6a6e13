//! Store access used by the maintenance tools.
//!
//! The tools only need four capabilities from the database: bulk delete,
//! bulk update, row count and a per-channel video count projection.
//! [`VideoStore`] captures exactly those so the purge job, the count report
//! and the stats endpoint can run against PostgreSQL or an in-memory double.

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[cfg(any(test, feature = "test-util"))]
mod memory;
mod postgres;

#[cfg(any(test, feature = "test-util"))]
pub use memory::{InMemoryVideoStore, StoreOp};
pub use postgres::{PgTransactionStore, PgVideoStore};

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by a [`VideoStore`].
#[derive(Error, Debug)]
pub enum StoreError {
    /// Connectivity, authentication or constraint failure reported by the database
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A write would leave rows referencing a deleted parent
    #[error("Foreign key violation: {table} still referenced by {referenced_by}")]
    ForeignKeyViolation { table: Table, referenced_by: Table },

    /// Column is not part of the table
    #[error("Unknown column {column} on {table}")]
    UnknownColumn { table: Table, column: &'static str },

    /// Store could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Transaction was already committed or rolled back
    #[error("Transaction already finished")]
    TransactionClosed,
}

/// Tables touched by the maintenance tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    PlaylistItem,
    WatchLater,
    WatchHistory,
    Like,
    Dislike,
    Comment,
    VideoTag,
    Video,
    Channel,
}

impl Table {
    pub const ALL: [Table; 9] = [
        Table::PlaylistItem,
        Table::WatchLater,
        Table::WatchHistory,
        Table::Like,
        Table::Dislike,
        Table::Comment,
        Table::VideoTag,
        Table::Video,
        Table::Channel,
    ];

    /// SQL table name.
    pub const fn table_name(self) -> &'static str {
        match self {
            Table::PlaylistItem => "playlist_items",
            Table::WatchLater => "watch_later",
            Table::WatchHistory => "watch_history",
            Table::Like => "likes",
            Table::Dislike => "dislikes",
            Table::Comment => "comments",
            Table::VideoTag => "video_tags",
            Table::Video => "videos",
            Table::Channel => "channels",
        }
    }

    /// Tables this table holds a foreign key into.
    pub const fn references(self) -> &'static [Table] {
        match self {
            Table::PlaylistItem
            | Table::WatchLater
            | Table::WatchHistory
            | Table::Like
            | Table::Dislike
            | Table::Comment
            | Table::VideoTag => &[Table::Video],
            Table::Video => &[Table::Channel],
            Table::Channel => &[],
        }
    }

    /// Tables holding a foreign key into this table.
    pub fn referenced_by(self) -> impl Iterator<Item = Table> {
        Table::ALL
            .into_iter()
            .filter(move |other| other.references().contains(&self))
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// A `column = value` pair applied by [`VideoStore::update_many`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub column: &'static str,
    pub value: i64,
}

impl Assignment {
    pub const fn new(column: &'static str, value: i64) -> Self {
        Self { column, value }
    }
}

/// Number of videos owned by a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ChannelVideoCount {
    pub channel_id: Uuid,
    pub name: String,
    pub videos: i64,
}

/// Store capabilities needed by the maintenance tools.
#[async_trait]
pub trait VideoStore: Send + Sync {
    /// Delete every row of `table`, returning the number of rows removed.
    async fn delete_many(&self, table: Table) -> StoreResult<u64>;

    /// Apply `assignments` to every row of `table`, returning the number of rows updated.
    async fn update_many(&self, table: Table, assignments: &[Assignment]) -> StoreResult<u64>;

    /// Count the rows of `table`.
    async fn count(&self, table: Table) -> StoreResult<i64>;

    /// Every channel with the number of videos referencing it, ordered by name.
    async fn channel_video_counts(&self) -> StoreResult<Vec<ChannelVideoCount>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependents_reference_video() {
        let dependents: Vec<Table> = Table::Video.referenced_by().collect();
        assert_eq!(
            dependents,
            vec![
                Table::PlaylistItem,
                Table::WatchLater,
                Table::WatchHistory,
                Table::Like,
                Table::Dislike,
                Table::Comment,
                Table::VideoTag,
            ]
        );
    }

    #[test]
    fn test_channel_is_referenced_by_video_only() {
        assert_eq!(Table::Channel.referenced_by().collect::<Vec<_>>(), vec![Table::Video]);
        assert!(Table::Channel.references().is_empty());
    }

    #[test]
    fn test_table_names() {
        assert_eq!(Table::PlaylistItem.to_string(), "playlist_items");
        assert_eq!(Table::Video.to_string(), "videos");
        assert_eq!(Table::Channel.to_string(), "channels");
    }
}
