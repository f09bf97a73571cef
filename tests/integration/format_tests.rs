//! Format-specific integration tests.
//!
//! Tests verify:
//! - TIFF parser handles little-endian and big-endian files
//! - BigTIFF files are parsed correctly
//! - Levels are read back pixel for pixel
//! - JPEG tiles decode close to their source

use wsi_downsampler::{open_slide, SlideFormat};

use super::test_utils::{pattern, ByteOrderType, SlideBuilder, TestData, TileEncoding};

async fn assert_level_matches_pattern(data: &TestData, id: u32, level: usize) {
    let slide = open_slide(&data.config, id).await.unwrap();
    let image = slide.read_level(level).await.unwrap();
    let (width, height) = slide.level_dimensions()[level];

    assert_eq!(image.dimensions(), (width, height));
    for (x, y, pixel) in image.enumerate_pixels() {
        assert_eq!(pixel.0, pattern(x, y, width, height), "pixel ({}, {})", x, y);
    }
}

// =============================================================================
// TIFF Byte Order Tests
// =============================================================================

#[tokio::test]
async fn test_little_endian_tiff() {
    let data = TestData::new();
    data.add_slide(1, &SlideBuilder::aperio(320, 256, 20));

    let slide = open_slide(&data.config, 1).await.unwrap();
    assert_eq!(slide.dimensions(), (320, 256));
    assert_eq!(slide.level_count(), 3);
    assert_eq!(slide.level_dimensions(), vec![(320, 256), (80, 64), (20, 16)]);
    assert_eq!(slide.level_downsamples(), vec![1.0, 4.0, 16.0]);

    assert_level_matches_pattern(&data, 1, 2).await;
}

#[tokio::test]
async fn test_big_endian_tiff() {
    let data = TestData::new();
    let builder = SlideBuilder::aperio(320, 256, 20).with_byte_order(ByteOrderType::BigEndian);
    let bytes = builder.build();
    assert_eq!(&bytes[..2], b"MM");
    data.add_slide(1, &builder);

    let slide = open_slide(&data.config, 1).await.unwrap();
    assert_eq!(slide.level_count(), 3);
    assert_eq!(slide.metadata().objective_power(), Some(20));

    assert_level_matches_pattern(&data, 1, 1).await;
}

// =============================================================================
// BigTIFF Tests
// =============================================================================

#[tokio::test]
async fn test_bigtiff_both_byte_orders() {
    let data = TestData::new();
    data.add_slide(1, &SlideBuilder::aperio(256, 256, 40).with_bigtiff(true));
    data.add_slide(
        2,
        &SlideBuilder::aperio(256, 256, 40)
            .with_bigtiff(true)
            .with_byte_order(ByteOrderType::BigEndian),
    );

    for id in [1, 2] {
        let slide = open_slide(&data.config, id).await.unwrap();
        assert_eq!(slide.level_dimensions(), vec![(256, 256), (64, 64), (16, 16)]);
        assert_eq!(slide.metadata().objective_power(), Some(40));
        assert_level_matches_pattern(&data, id, 2).await;
    }
}

// =============================================================================
// Tile Stitching
// =============================================================================

#[tokio::test]
async fn test_edge_tiles_are_clipped() {
    let data = TestData::new();
    // 3x2 tiles of 64 with partial right and bottom tiles
    data.add_slide(1, &SlideBuilder::new().add_level(150, 100, 64));

    assert_level_matches_pattern(&data, 1, 0).await;
}

#[tokio::test]
async fn test_jpeg_tiles_decode() {
    let data = TestData::new();
    data.add_slide(
        1,
        &SlideBuilder::aperio(256, 192, 20).with_encoding(TileEncoding::Jpeg),
    );

    let slide = open_slide(&data.config, 1).await.unwrap();
    let image = slide.read_level(1).await.unwrap();
    assert_eq!(image.dimensions(), (64, 48));

    for (x, y, pixel) in image.enumerate_pixels() {
        let expected = pattern(x, y, 64, 48);
        for channel in 0..3 {
            let diff = (pixel.0[channel] as i32 - expected[channel] as i32).abs();
            assert!(diff <= 24, "pixel ({}, {}) channel {} off by {}", x, y, channel, diff);
        }
    }
}

// =============================================================================
// Format Detection
// =============================================================================

#[tokio::test]
async fn test_format_detection() {
    let data = TestData::new();
    data.add_slide(1, &SlideBuilder::aperio(256, 256, 20));
    data.add_slide(2, &SlideBuilder::new().add_level(256, 256, 64).add_level(64, 64, 64));

    let aperio = open_slide(&data.config, 1).await.unwrap();
    assert_eq!(aperio.format(), SlideFormat::AperioSvs);
    assert_eq!(
        aperio.metadata().properties.get("MPP").map(String::as_str),
        Some("0.4990")
    );

    let generic = open_slide(&data.config, 2).await.unwrap();
    assert_eq!(generic.format(), SlideFormat::GenericTiff);
    assert_eq!(generic.metadata().objective_power(), None);
    assert_eq!(generic.level_count(), 2);
}

#[tokio::test]
async fn test_open_errors_name_the_slide() {
    let data = TestData::new();
    data.add_corrupt_slide(7);

    let err = open_slide(&data.config, 7).await.err().unwrap();
    assert_eq!(err.id, 7);
    assert!(err.path.ends_with("TUPAC-TR-007.svs"));

    let err = open_slide(&data.config, 8).await.err().unwrap();
    assert_eq!(err.id, 8);
    assert!(err.path.ends_with("TUPAC-TR-008.svs"));
}
