use std::fmt;

use serde::Serialize;

use crate::store::{ChannelVideoCount, StoreResult, Table, VideoStore};

/// Read-only summary of videos and how they spread across channels.
#[derive(Debug, Clone, Serialize)]
pub struct CountReport {
    pub total_videos: i64,
    pub total_channels: i64,
    pub channels: Vec<ChannelVideoCount>,
}

impl CountReport {
    pub async fn gather<S>(store: &S) -> StoreResult<Self>
    where
        S: VideoStore + ?Sized,
    {
        let total_videos = store.count(Table::Video).await?;
        let total_channels = store.count(Table::Channel).await?;
        let channels = store.channel_video_counts().await?;

        tracing::debug!(total_videos, total_channels, "Gathered video counts");

        Ok(Self {
            total_videos,
            total_channels,
            channels,
        })
    }

    /// Channels owning at least one video.
    pub fn non_empty_channels(&self) -> impl Iterator<Item = &ChannelVideoCount> {
        self.channels.iter().filter(|channel| channel.videos > 0)
    }
}

impl fmt::Display for CountReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total videos: {}", self.total_videos)?;
        writeln!(f, "Total channels: {}", self.total_channels)?;
        writeln!(f, "Videos per channel:")?;
        for channel in self.non_empty_channels() {
            writeln!(f, "  {}: {} videos", channel.name, channel.videos)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn channel(name: &str, videos: i64) -> ChannelVideoCount {
        ChannelVideoCount {
            channel_id: Uuid::new_v4(),
            name: name.to_string(),
            videos,
        }
    }

    #[test]
    fn test_render_omits_empty_channels() {
        let report = CountReport {
            total_videos: 5,
            total_channels: 3,
            channels: vec![channel("cooking", 3), channel("empty", 0), channel("music", 2)],
        };

        assert_eq!(
            report.to_string(),
            "Total videos: 5\n\
             Total channels: 3\n\
             Videos per channel:\n  \
             cooking: 3 videos\n  \
             music: 2 videos\n"
        );
    }

    #[test]
    fn test_render_without_videos() {
        let report = CountReport {
            total_videos: 0,
            total_channels: 1,
            channels: vec![channel("empty", 0)],
        };

        let rendered = report.to_string();
        assert!(rendered.starts_with("Total videos: 0\n"));
        assert!(!rendered.contains("empty"));
    }
}
