use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use super::{Assignment, ChannelVideoCount, StoreError, StoreResult, Table, VideoStore};

/// A store call, used both for the call log and for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Delete(Table),
    Update(Table),
    Count(Table),
    ChannelVideoCounts,
}

#[derive(Debug, Clone)]
struct ChannelRow {
    id: Uuid,
    name: String,
    video_count: i64,
    total_views: i64,
}

#[derive(Debug, Clone)]
struct VideoRow {
    id: Uuid,
    channel_id: Uuid,
}

#[derive(Debug, Default)]
struct State {
    channels: Vec<ChannelRow>,
    videos: Vec<VideoRow>,
    /// Dependent rows per table, each holding the referenced video id.
    dependents: HashMap<Table, Vec<Uuid>>,
    failures: HashSet<StoreOp>,
    calls: Vec<StoreOp>,
}

/// In-memory [`VideoStore`] enforcing the same foreign keys as the schema.
///
/// Deleting a parent while child rows still reference it fails with
/// [`StoreError::ForeignKeyViolation`], like a database with restrictive
/// constraints would. Every call is recorded and any call can be made to fail.
#[derive(Debug, Default)]
pub struct InMemoryVideoStore {
    state: Mutex<State>,
}

impl InMemoryVideoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_channel(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().channels.push(ChannelRow {
            id,
            name: name.to_string(),
            video_count: 0,
            total_views: 0,
        });
        id
    }

    /// Add a video and bump the owning channel's cached counters.
    pub fn add_video(&self, channel_id: Uuid, views: i64) -> Uuid {
        let id = Uuid::new_v4();
        let mut state = self.lock();
        if let Some(channel) = state.channels.iter_mut().find(|c| c.id == channel_id) {
            channel.video_count += 1;
            channel.total_views += views;
        }
        state.videos.push(VideoRow { id, channel_id });
        id
    }

    /// Add a row to one of the tables referencing `videos`.
    pub fn add_dependent(&self, table: Table, video_id: Uuid) {
        debug_assert!(table.references().contains(&Table::Video));
        let mut state = self.lock();
        debug_assert!(state.videos.iter().any(|video| video.id == video_id));
        state.dependents.entry(table).or_default().push(video_id);
    }

    /// Make every subsequent `op` fail with [`StoreError::Unavailable`].
    pub fn fail_on(&self, op: StoreOp) {
        self.lock().failures.insert(op);
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Calls made so far, in order.
    pub fn calls(&self) -> Vec<StoreOp> {
        self.lock().calls.clone()
    }

    /// Cached `(video_count, total_views)` for a channel.
    pub fn channel_counters(&self, channel_id: Uuid) -> Option<(i64, i64)> {
        self.lock()
            .channels
            .iter()
            .find(|c| c.id == channel_id)
            .map(|c| (c.video_count, c.total_views))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl State {
    fn record(&mut self, op: StoreOp) -> StoreResult<()> {
        self.calls.push(op);
        if self.failures.contains(&op) {
            return Err(StoreError::Unavailable(format!("injected failure on {op:?}")));
        }
        Ok(())
    }

    fn row_count(&self, table: Table) -> usize {
        match table {
            Table::Video => self.videos.len(),
            Table::Channel => self.channels.len(),
            dependent => self.dependents.get(&dependent).map_or(0, Vec::len),
        }
    }
}

#[async_trait]
impl VideoStore for InMemoryVideoStore {
    async fn delete_many(&self, table: Table) -> StoreResult<u64> {
        let mut state = self.lock();
        state.record(StoreOp::Delete(table))?;

        if let Some(referenced_by) = table
            .referenced_by()
            .find(|child| state.row_count(*child) > 0)
        {
            return Err(StoreError::ForeignKeyViolation {
                table,
                referenced_by,
            });
        }

        let deleted = state.row_count(table) as u64;
        match table {
            Table::Video => state.videos.clear(),
            Table::Channel => state.channels.clear(),
            dependent => {
                state.dependents.remove(&dependent);
            }
        }
        Ok(deleted)
    }

    async fn update_many(&self, table: Table, assignments: &[Assignment]) -> StoreResult<u64> {
        let mut state = self.lock();
        state.record(StoreOp::Update(table))?;

        if table != Table::Channel {
            if let Some(assignment) = assignments.first() {
                return Err(StoreError::UnknownColumn {
                    table,
                    column: assignment.column,
                });
            }
            return Ok(0);
        }

        for assignment in assignments {
            if !matches!(assignment.column, "video_count" | "total_views") {
                return Err(StoreError::UnknownColumn {
                    table,
                    column: assignment.column,
                });
            }
        }

        for channel in &mut state.channels {
            for assignment in assignments {
                match assignment.column {
                    "video_count" => channel.video_count = assignment.value,
                    _ => channel.total_views = assignment.value,
                }
            }
        }
        Ok(state.channels.len() as u64)
    }

    async fn count(&self, table: Table) -> StoreResult<i64> {
        let mut state = self.lock();
        state.record(StoreOp::Count(table))?;
        Ok(state.row_count(table) as i64)
    }

    async fn channel_video_counts(&self) -> StoreResult<Vec<ChannelVideoCount>> {
        let mut state = self.lock();
        state.record(StoreOp::ChannelVideoCounts)?;

        let mut counts: Vec<ChannelVideoCount> = state
            .channels
            .iter()
            .map(|channel| ChannelVideoCount {
                channel_id: channel.id,
                name: channel.name.clone(),
                videos: state
                    .videos
                    .iter()
                    .filter(|video| video.channel_id == channel.id)
                    .count() as i64,
            })
            .collect();
        counts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_delete_parent_with_children_fails() {
        let store = InMemoryVideoStore::new();
        let channel = store.add_channel("news");
        let video = store.add_video(channel, 10);
        store.add_dependent(Table::Comment, video);

        let err = store.delete_many(Table::Video).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::ForeignKeyViolation {
                table: Table::Video,
                referenced_by: Table::Comment,
            }
        ));
        assert_eq!(store.count(Table::Video).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_add_video_updates_channel_counters() {
        let store = InMemoryVideoStore::new();
        let channel = store.add_channel("news");
        store.add_video(channel, 10);
        store.add_video(channel, 32);

        assert_eq!(store.channel_counters(channel), Some((2, 42)));
    }

    #[tokio::test]
    async fn test_injected_failure_is_recorded() {
        let store = InMemoryVideoStore::new();
        store.fail_on(StoreOp::Count(Table::Video));

        assert!(matches!(
            store.count(Table::Video).await,
            Err(StoreError::Unavailable(_))
        ));
        assert_eq!(store.calls(), vec![StoreOp::Count(Table::Video)]);
    }

    #[tokio::test]
    async fn test_update_unknown_column() {
        let store = InMemoryVideoStore::new();
        store.add_channel("news");

        let err = store
            .update_many(Table::Channel, &[Assignment::new("subscriber_count", 0)])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownColumn { .. }));
    }
}
