//! Slide statistics and information tests.

use wsi_downsampler::stats::{collect_dimensions, collect_info, write_report};
use wsi_downsampler::{MagnificationGroups, SlideFormat, SlideStats};

use super::test_utils::TestData;

#[tokio::test]
async fn test_stats_over_slide_directory() {
    let data = TestData::new();
    data.add_slides(3);

    let (dimensions, failures) = collect_dimensions(&data.config).await.unwrap();
    assert!(failures.is_empty());
    assert_eq!(dimensions.len(), 3);

    let stats = SlideStats::from_dimensions(dimensions).unwrap();
    assert_eq!(stats.max_width.value, 416);
    assert_eq!(stats.max_width.slide, 3);
    assert_eq!(stats.min_width.value, 352);
    assert_eq!(stats.min_width.slide, 1);
    // Equal heights: the first slide keeps both extremes
    assert_eq!(stats.max_height.slide, 1);
    assert_eq!(stats.min_height.slide, 1);
    assert_eq!(stats.avg_width, 384.0);

    let path = write_report(&data.config, &stats).await.unwrap();
    let report = std::fs::read_to_string(path).unwrap();
    assert!(report.contains("slide number,width,height\n1,352,256\n2,384,256\n3,416,256\n"));
}

#[tokio::test]
async fn test_stats_skip_unreadable_slides() {
    let data = TestData::new();
    data.add_slides(3);
    data.add_corrupt_slide(2);

    let (dimensions, failures) = collect_dimensions(&data.config).await.unwrap();
    assert_eq!(dimensions.iter().map(|d| d.id).collect::<Vec<_>>(), vec![1, 3]);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].id, 2);
}

#[tokio::test]
async fn test_stats_without_slide_directory() {
    let data = TestData::new();
    assert!(collect_dimensions(&data.config).await.is_err());
}

#[tokio::test]
async fn test_info_and_magnification_groups() {
    let data = TestData::new();
    data.add_slides(4);

    let (infos, failures) = collect_info(&data.config).await.unwrap();
    assert!(failures.is_empty());
    assert_eq!(infos.len(), 4);

    let first = &infos[0];
    assert_eq!(first.id, 1);
    assert_eq!(first.format, SlideFormat::AperioSvs);
    assert_eq!(first.dimensions, (352, 256));
    assert_eq!(first.level_count, 3);
    assert_eq!(first.level_dimensions, vec![(352, 256), (88, 64), (22, 16)]);
    assert_eq!(first.level_downsamples, vec![1.0, 4.0, 16.0]);
    assert_eq!(first.associated_images, 0);
    assert_eq!(first.properties.get("AppMag").map(String::as_str), Some("20"));

    let groups = MagnificationGroups::from_infos(&infos);
    assert_eq!(groups.x20, vec![1, 3]);
    assert_eq!(groups.x40, vec![2, 4]);
    assert!(groups.other.is_empty());
}
