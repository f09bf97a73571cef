//! Artifact naming and lookup tests.
//!
//! Tests verify:
//! - Converted outputs can be found by slide id alone
//! - Outputs at another scale are ignored by lookups
//! - Points in a downsampled image map back into the slide

use wsi_downsampler::{decode, map_small_to_large, Downsampler, SlideLayout};

use super::test_utils::{SlideBuilder, TestData};

#[tokio::test]
async fn test_find_outputs_after_convert() {
    let data = TestData::new();
    data.add_slides(2);
    let downsampler = Downsampler::new(data.config.clone());
    let first = downsampler.convert(1).await.unwrap();
    let second = downsampler.convert(2).await.unwrap();

    let layout = SlideLayout::new(&data.config);
    assert_eq!(layout.find_image(1).await.unwrap(), Some(first.image_path));
    assert_eq!(layout.find_thumbnail(1).await.unwrap(), Some(first.thumbnail_path));
    assert_eq!(layout.find_image(2).await.unwrap(), Some(second.image_path));
    assert_eq!(layout.find_image(3).await.unwrap(), None);
}

#[tokio::test]
async fn test_find_ignores_other_scales() {
    let data = TestData::new();
    data.add_slide(1, &SlideBuilder::aperio(320, 256, 20));
    let downsampler = Downsampler::new(data.config.clone());

    downsampler.convert_at_scale(1, 8).await.unwrap();
    let layout = SlideLayout::new(&data.config);
    assert_eq!(layout.find_image(1).await.unwrap(), None);

    let converted = downsampler.convert(1).await.unwrap();
    assert_eq!(layout.find_image(1).await.unwrap(), Some(converted.image_path));
}

#[tokio::test]
async fn test_find_before_any_output() {
    let data = TestData::new();
    let layout = SlideLayout::new(&data.config);
    assert!(layout.find_image(1).await.is_err());
}

#[tokio::test]
async fn test_derived_paths_share_suffix() {
    let data = TestData::new();
    data.add_slide(1, &SlideBuilder::aperio(352, 256, 20));
    let converted = Downsampler::new(data.config.clone()).convert(1).await.unwrap();

    let layout = SlideLayout::new(&data.config);
    let stem = "TUPAC-TR-001-32x-352x256-11x8";
    assert_eq!(
        layout.filter_result_path(1, &converted.suffix),
        data.config.filter_dir.join(format!("{}-filtered.png", stem))
    );
    assert_eq!(
        layout.tile_summary_thumbnail_path(1, &converted.suffix),
        data.config
            .tile_summary_thumbnail_dir
            .join(format!("{}-tile_summary.jpg", stem))
    );
    assert_eq!(
        decode(&layout.tile_summary_path(1, &converted.suffix).to_string_lossy()).unwrap(),
        converted.suffix
    );
}

#[tokio::test]
async fn test_locate_point_from_output_name() {
    let data = TestData::new();
    data.add_slide(1, &SlideBuilder::aperio(352, 256, 20));
    let converted = Downsampler::new(data.config.clone()).convert(1).await.unwrap();

    let name = converted.image_path.file_name().unwrap().to_string_lossy().into_owned();
    let suffix = decode(&name).unwrap();

    assert_eq!(map_small_to_large((0, 0), suffix.large, suffix.scale), Some((0, 0)));
    assert_eq!(
        map_small_to_large(suffix.small, suffix.large, suffix.scale),
        Some(suffix.large)
    );

    let (x, y) = map_small_to_large((5, 4), suffix.large, suffix.scale).unwrap();
    assert!((x as i64 - 160).abs() <= 1);
    assert!((y as i64 - 128).abs() <= 1);
}
