//! Batch conversion tests.
//!
//! Tests verify:
//! - Slide ranges are split evenly across workers
//! - Every slide of a batch is written
//! - One failing slide never stops the others
//! - Re-running a batch reproduces its outputs

use wsi_downsampler::{decode, partition, Dispatcher, Downsampler, IdRange, SlideLayout};

use super::test_utils::{bigtiff_with_next_ifd, file_names, TestData};

fn ranges(pairs: &[(u32, u32)]) -> Vec<IdRange> {
    pairs.iter().map(|&(start, end)| IdRange::new(start, end)).collect()
}

// =============================================================================
// Full Batches
// =============================================================================

#[tokio::test]
async fn test_five_slides_two_workers() {
    let data = TestData::new();
    data.add_slides(5);

    let total = SlideLayout::new(&data.config).count_slides().await.unwrap();
    assert_eq!(total, 5);

    let dispatcher = Dispatcher::new(Downsampler::new(data.config.clone()));
    let report = dispatcher.run(total, 2).await.unwrap();

    assert_eq!(report.plan, ranges(&[(1, 3), (4, 5)]));
    assert_eq!(report.requested, 5);
    assert_eq!(report.converted, 5);
    assert!(report.is_complete());
    assert!(report.incomplete_ranges.is_empty());

    let images = file_names(&data.config.image_dir);
    let thumbnails = file_names(&data.config.thumbnail_dir);
    assert_eq!(images.len(), 5);
    assert_eq!(thumbnails.len(), 5);

    for (index, name) in images.iter().enumerate() {
        let id = index as u32 + 1;
        assert!(name.starts_with(&format!("TUPAC-TR-{:03}-32x-", id)));

        let suffix = decode(name).unwrap();
        assert_eq!(suffix.large, (320 + 32 * id, 256));
        assert_eq!(suffix.small, (suffix.large.0 / 32, suffix.large.1 / 32));

        let image = image::open(data.config.image_dir.join(name)).unwrap();
        assert_eq!((image.width(), image.height()), suffix.small);
    }

    for name in &thumbnails {
        let suffix = decode(name).unwrap();
        let thumbnail = image::open(data.config.thumbnail_dir.join(name)).unwrap();
        assert_eq!(thumbnail.width().max(thumbnail.height()), 300);
        assert!(suffix.small.0 > suffix.small.1);
    }
}

#[tokio::test]
async fn test_more_workers_than_slides() {
    let data = TestData::new();
    data.add_slides(3);

    let dispatcher = Dispatcher::new(Downsampler::new(data.config.clone()));
    let report = dispatcher.run(3, 16).await.unwrap();

    assert_eq!(report.plan, ranges(&[(1, 1), (2, 2), (3, 3)]));
    assert_eq!(report.converted, 3);
    assert_eq!(file_names(&data.config.image_dir).len(), 3);
}

#[tokio::test]
async fn test_single_worker() {
    let data = TestData::new();
    data.add_slides(4);

    let dispatcher = Dispatcher::new(Downsampler::new(data.config.clone()));
    let report = dispatcher.run(4, 1).await.unwrap();

    assert_eq!(report.plan, ranges(&[(1, 4)]));
    assert_eq!(report.converted, 4);
}

// =============================================================================
// Failure Isolation
// =============================================================================

#[tokio::test]
async fn test_missing_slide_does_not_stop_range() {
    let data = TestData::new();
    data.add_slides(5);
    std::fs::remove_file(SlideLayout::new(&data.config).slide_path(3)).unwrap();

    let dispatcher = Dispatcher::new(Downsampler::new(data.config.clone()));
    let report = dispatcher.run(5, 2).await.unwrap();

    assert_eq!(report.converted, 4);
    assert_eq!(report.failed_ids(), vec![3]);
    assert_eq!(report.failures[0].error.kind(), "SlideOpenError");
    assert_eq!(report.incomplete_ranges, ranges(&[(1, 3)]));

    let images = file_names(&data.config.image_dir);
    assert_eq!(images.len(), 4);
    assert!(images.iter().all(|name| !name.starts_with("TUPAC-TR-003-")));
}

#[tokio::test]
async fn test_corrupt_slide_reported() {
    let data = TestData::new();
    data.add_slides(5);
    data.add_corrupt_slide(2);

    let dispatcher = Dispatcher::new(Downsampler::new(data.config.clone()));
    let report = dispatcher.run(5, 2).await.unwrap();

    assert_eq!(report.converted, 4);
    assert_eq!(report.failed_ids(), vec![2]);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["failures"][0]["id"], 2);
    assert_eq!(json["failures"][0]["kind"], "SlideOpenError");
    assert_eq!(json["converted"], 4);
}

#[tokio::test]
async fn test_bad_middle_slide_single_worker() {
    let data = TestData::new();
    data.add_slides(3);
    data.add_raw_slide(2, &bigtiff_with_next_ifd(u64::MAX - 3));

    let dispatcher = Dispatcher::new(Downsampler::new(data.config.clone()));
    let report = dispatcher.run(3, 1).await.unwrap();

    assert_eq!(report.plan, ranges(&[(1, 3)]));
    assert_eq!(report.converted, 2);
    assert_eq!(report.failed_ids(), vec![2]);
    assert_eq!(report.failures[0].error.kind(), "SlideOpenError");

    let images = file_names(&data.config.image_dir);
    assert_eq!(images.len(), 2);
    assert!(images[0].starts_with("TUPAC-TR-001-"));
    assert!(images[1].starts_with("TUPAC-TR-003-"));
}

#[tokio::test]
async fn test_retry_failed_ids_only() {
    let data = TestData::new();
    data.add_slides(4);
    let slide_path = SlideLayout::new(&data.config).slide_path(2);
    let saved = std::fs::read(&slide_path).unwrap();
    std::fs::remove_file(&slide_path).unwrap();

    let dispatcher = Dispatcher::new(Downsampler::new(data.config.clone()));
    let report = dispatcher.run(4, 2).await.unwrap();
    assert_eq!(report.failed_ids(), vec![2]);

    std::fs::write(&slide_path, saved).unwrap();
    let plan = report.failed_ids().into_iter().map(|id| IdRange::new(id, id)).collect();
    let retry = dispatcher.run_plan(plan).await;

    assert!(retry.is_complete());
    assert_eq!(retry.converted, 1);
    assert_eq!(file_names(&data.config.image_dir).len(), 4);
}

// =============================================================================
// Idempotence
// =============================================================================

#[tokio::test]
async fn test_rerun_batch_is_identical() {
    let data = TestData::new();
    data.add_slides(3);
    let dispatcher = Dispatcher::new(Downsampler::new(data.config.clone()));

    dispatcher.run(3, 2).await.unwrap();
    let snapshot: Vec<(String, Vec<u8>)> = file_names(&data.config.image_dir)
        .into_iter()
        .map(|name| {
            let bytes = std::fs::read(data.config.image_dir.join(&name)).unwrap();
            (name, bytes)
        })
        .collect();

    dispatcher.run(3, 3).await.unwrap();
    let names = file_names(&data.config.image_dir);
    assert_eq!(names.len(), snapshot.len());
    for (name, bytes) in snapshot {
        assert_eq!(std::fs::read(data.config.image_dir.join(&name)).unwrap(), bytes);
    }
}

// =============================================================================
// Partition Plans
// =============================================================================

#[test]
fn test_plan_matches_dispatch() {
    assert_eq!(partition(5, 2).unwrap(), ranges(&[(1, 3), (4, 5)]));
    assert_eq!(partition(10, 3).unwrap(), ranges(&[(1, 4), (5, 7), (8, 10)]));
    assert!(partition(0, 3).unwrap().is_empty());
    assert!(partition(3, 0).is_err());
}
