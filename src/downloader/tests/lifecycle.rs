use super::*;
use crate::types::Event;

#[tokio::test]
async fn shutdown_rejects_new_submissions() {
    let fetcher = Arc::new(ScriptedFetcher::new(Script::produce(&["a.mp3"])));
    let (downloader, _tmp) = create_test_downloader(fetcher.clone()).await;
    let mut events = downloader.subscribe();

    assert!(downloader.is_accepting());
    downloader.shutdown().await.unwrap();
    assert!(!downloader.is_accepting());
    assert_eq!(events.recv().await.unwrap(), Event::Shutdown);

    assert!(matches!(
        downloader.submit("song", Quality::Best).await,
        Err(Error::ShuttingDown)
    ));
    assert!(matches!(
        downloader.submit_batch(items(2), Quality::Best).await,
        Err(Error::ShuttingDown)
    ));
    assert!(work_dir_entries(&downloader).is_empty());
    assert!(fetcher.calls().is_empty());
}

#[tokio::test]
async fn shutdown_lets_running_fetches_finish_and_fails_queued_ones() {
    let fetcher = (1..=5).fold(ScriptedFetcher::new(Script::fail(1)), |f, i| {
        let file = format!("t{i}.mp3");
        f.on(
            &item_id(i),
            Script::produce(&[file.as_str()]).after(Duration::from_millis(150)),
        )
    });
    let fetcher = Arc::new(fetcher);
    let (downloader, _tmp) = create_test_downloader(fetcher.clone()).await;

    let submission = downloader.submit_batch(items(5), Quality::Best).await.unwrap();

    // Wait until the first three items hold the three slots
    tokio::time::timeout(Duration::from_secs(5), async {
        while fetcher.calls().len() < 3 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    downloader.shutdown().await.unwrap();

    // Shutdown returned only after the job was finalized
    let progress = downloader.progress(submission.job_id.as_str()).unwrap();
    assert_eq!(progress.status, JobStatus::Complete);
    assert_eq!((progress.current, progress.total), (3, 5));
    assert_eq!(fetcher.calls().len(), 3);
    assert_eq!(downloader.active_jobs(), 0);

    // Finished output stays retrievable during shutdown
    assert!(downloader.retrieve(submission.job_id.as_str()).await.is_ok());
}

#[tokio::test]
async fn shutdown_is_idempotent() {
    let fetcher = Arc::new(ScriptedFetcher::new(Script::produce(&["a.mp3"])));
    let (downloader, _tmp) = create_test_downloader(fetcher).await;

    downloader.shutdown().await.unwrap();
    downloader.shutdown().await.unwrap();
    assert!(!downloader.is_accepting());
}
