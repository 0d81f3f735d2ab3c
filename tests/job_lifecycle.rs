//! End-to-end job lifecycle through the public API with a fake fetcher

mod common;

use common::{FakeFetcher, test_config, wait_for_terminal};
use media_dl::{Error, Event, JobStatus, MediaDownloader, Quality, WorkItem};
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(10);

#[tokio::test]
async fn search_job_from_submission_to_cleanup() {
    let temp_dir = tempfile::tempdir().unwrap();
    let downloader =
        MediaDownloader::with_fetcher(test_config(temp_dir.path()), Arc::new(FakeFetcher::new(1)))
            .await
            .unwrap();
    let mut events = downloader.subscribe();

    let submission = downloader
        .submit("lofi beats to study to", Quality::Medium)
        .await
        .unwrap();
    assert_eq!(submission.total, 1);

    let progress = wait_for_terminal(&downloader, &submission.job_id, WAIT).await;
    assert_eq!(progress.status, JobStatus::Complete);
    assert_eq!((progress.current, progress.total), (1, 1));
    assert_eq!(progress.message, "1 file downloaded");

    let delivery = downloader.retrieve(submission.job_id.as_str()).await.unwrap();
    assert_eq!(delivery.mime_type, "audio/mpeg");
    assert_eq!(delivery.size, 3);
    let job_dir = delivery.path.parent().unwrap().to_path_buf();
    drop(delivery);

    assert!(!job_dir.exists());
    assert!(matches!(
        downloader.progress(submission.job_id.as_str()),
        Err(Error::NotFound(_))
    ));

    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        kinds.push(event.kind());
    }
    assert_eq!(kinds.first(), Some(&"queued"));
    assert!(kinds.contains(&"complete"));
    assert_eq!(kinds.last(), Some(&"retrieved"));
}

#[tokio::test]
async fn playlist_job_is_packed_into_an_archive() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut fetcher = FakeFetcher::new(4);
    fetcher.playlist_size = 4;
    let downloader =
        MediaDownloader::with_fetcher(test_config(temp_dir.path()), Arc::new(fetcher))
            .await
            .unwrap();

    let submission = downloader
        .submit(
            "https://music.youtube.com/playlist?list=OLAK5uy_abc",
            Quality::Best,
        )
        .await
        .unwrap();
    assert_eq!(submission.total, 4);

    let progress = wait_for_terminal(&downloader, &submission.job_id, WAIT).await;
    assert_eq!((progress.current, progress.total), (4, 4));

    let delivery = downloader.retrieve(submission.job_id.as_str()).await.unwrap();
    assert_eq!(delivery.mime_type, "application/zip");
    let archive = zip::ZipArchive::new(std::fs::File::open(&delivery.path).unwrap()).unwrap();
    assert_eq!(archive.len(), 4);
}

#[tokio::test]
async fn batch_with_unavailable_items_reports_partial_success() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut fetcher = FakeFetcher::new(1);
    fetcher.fail_marker = Some("gone");
    let downloader =
        MediaDownloader::with_fetcher(test_config(temp_dir.path()), Arc::new(fetcher))
            .await
            .unwrap();

    let items = vec![
        WorkItem::new("aaaaaaaaaaa", Some("First".into())),
        WorkItem::new("gone0000001", None),
        WorkItem::new("bbbbbbbbbbb", None),
        WorkItem::new("gone0000002", None),
        WorkItem::new("ccccccccccc", Some("Last".into())),
    ];
    let submission = downloader.submit_batch(items, Quality::Best).await.unwrap();

    let progress = wait_for_terminal(&downloader, &submission.job_id, WAIT).await;
    assert_eq!(progress.status, JobStatus::Complete);
    assert_eq!((progress.current, progress.total), (3, 5));
}

#[tokio::test]
async fn concurrent_jobs_stay_isolated() {
    let temp_dir = tempfile::tempdir().unwrap();
    let downloader =
        MediaDownloader::with_fetcher(test_config(temp_dir.path()), Arc::new(FakeFetcher::new(1)))
            .await
            .unwrap();

    let mut ids = Vec::new();
    for i in 0..6 {
        ids.push(
            downloader
                .submit(&format!("query {i}"), Quality::Best)
                .await
                .unwrap()
                .job_id,
        );
    }

    for id in &ids {
        let progress = wait_for_terminal(&downloader, id, WAIT).await;
        assert_eq!((progress.status, progress.current), (JobStatus::Complete, 1));
    }

    // Retrieving one job leaves the others untouched
    drop(downloader.retrieve(ids[0].as_str()).await.unwrap());
    for id in &ids[1..] {
        assert!(downloader.progress(id.as_str()).is_ok());
    }
}

#[tokio::test]
async fn shutdown_stops_new_work() {
    let temp_dir = tempfile::tempdir().unwrap();
    let downloader =
        MediaDownloader::with_fetcher(test_config(temp_dir.path()), Arc::new(FakeFetcher::new(1)))
            .await
            .unwrap();
    let mut events = downloader.subscribe();

    let submission = downloader.submit("last song", Quality::Best).await.unwrap();
    downloader.shutdown().await.unwrap();

    assert_eq!(downloader.active_jobs(), 0);
    assert!(matches!(
        downloader.submit("too late", Quality::Best).await,
        Err(Error::ShuttingDown)
    ));
    assert!(
        downloader
            .progress(submission.job_id.as_str())
            .unwrap()
            .status
            .is_terminal()
    );

    let mut saw_shutdown = false;
    while let Ok(event) = events.try_recv() {
        saw_shutdown |= event == Event::Shutdown;
    }
    assert!(saw_shutdown);
}
