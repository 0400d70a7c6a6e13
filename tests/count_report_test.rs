use video_admin::purge::VideoPurgeJob;
use video_admin::report::CountReport;
use video_admin::store::{InMemoryVideoStore, StoreError, StoreOp, Table};

#[tokio::test]
async fn test_report_lists_channels_with_videos() {
    let store = InMemoryVideoStore::new();
    let music = store.add_channel("music");
    let cooking = store.add_channel("cooking");
    store.add_channel("abandoned");
    for _ in 0..4 {
        store.add_video(cooking, 10);
    }
    store.add_video(music, 3);

    let report = CountReport::gather(&store).await.unwrap();

    assert_eq!(report.total_videos, 5);
    assert_eq!(report.total_channels, 3);
    assert_eq!(
        report.to_string(),
        "Total videos: 5\n\
         Total channels: 3\n\
         Videos per channel:\n  \
         cooking: 4 videos\n  \
         music: 1 videos\n"
    );
}

#[tokio::test]
async fn test_per_channel_counts_sum_to_total() {
    let store = InMemoryVideoStore::new();
    let counts = [("a", 2), ("b", 0), ("c", 7), ("d", 1)];
    for (name, videos) in counts {
        let channel = store.add_channel(name);
        for _ in 0..videos {
            store.add_video(channel, 0);
        }
    }

    let report = tokio_test::assert_ok!(CountReport::gather(&store).await);

    let listed: i64 = report.non_empty_channels().map(|c| c.videos).sum();
    assert_eq!(listed, report.total_videos);
    assert_eq!(report.total_videos, 10);
    assert_eq!(report.non_empty_channels().count(), 3);
}

#[tokio::test]
async fn test_report_after_purge_is_empty() {
    let store = InMemoryVideoStore::new();
    let channel = store.add_channel("cooking");
    let video = store.add_video(channel, 10);
    store.add_dependent(Table::Like, video);

    VideoPurgeJob::new().run(&store).await.unwrap();
    let report = CountReport::gather(&store).await.unwrap();

    assert_eq!(report.total_videos, 0);
    assert_eq!(report.total_channels, 1);
    assert_eq!(report.non_empty_channels().count(), 0);
}

#[tokio::test]
async fn test_report_surfaces_store_errors() {
    let store = InMemoryVideoStore::new();
    store.fail_on(StoreOp::ChannelVideoCounts);

    let err = CountReport::gather(&store).await.unwrap_err();

    assert!(matches!(err, StoreError::Unavailable(_)));
}
