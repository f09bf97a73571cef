//! Single-slide conversion tests.
//!
//! Tests verify:
//! - Output names carry the scale factor and both sizes
//! - Output images have exactly the encoded sizes
//! - The coarsest sufficient pyramid level is read
//! - Degenerate slides fail with a typed error

use wsi_downsampler::{
    decode, encode, open_slide, thumbnail_dimensions, ConvertError, Downsampler,
};

use super::test_utils::{
    bigtiff_with_next_ifd, file_names, ByteOrderType, SlideBuilder, TestData, TileEncoding,
};

// =============================================================================
// Output Naming and Sizes
// =============================================================================

#[tokio::test]
async fn test_convert_writes_named_outputs() {
    let data = TestData::new();
    data.add_slide(1, &SlideBuilder::aperio(352, 256, 20));

    let converted = Downsampler::new(data.config.clone()).convert(1).await.unwrap();

    assert_eq!(converted.id, 1);
    assert_eq!(converted.suffix.scale, 32);
    assert_eq!(converted.suffix.large, (352, 256));
    assert_eq!(converted.suffix.small, (11, 8));
    assert_eq!(
        converted.image_path,
        data.config.image_dir.join("TUPAC-TR-001-32x-352x256-11x8.png")
    );
    assert_eq!(
        converted.thumbnail_path,
        data.config.thumbnail_dir.join("TUPAC-TR-001-32x-352x256-11x8.jpg")
    );

    let image = image::open(&converted.image_path).unwrap();
    assert_eq!((image.width(), image.height()), (11, 8));

    let thumbnail = image::open(&converted.thumbnail_path).unwrap();
    assert_eq!((thumbnail.width(), thumbnail.height()), (300, 218));
    assert_eq!(converted.thumbnail_size, thumbnail_dimensions((11, 8), 300));
}

#[tokio::test]
async fn test_output_name_decodes_to_file_size() {
    let data = TestData::new();
    data.add_slides(3);
    let downsampler = Downsampler::new(data.config.clone());

    for id in 1..=3 {
        let converted = downsampler.convert(id).await.unwrap();
        let suffix = decode(&converted.image_path.to_string_lossy()).unwrap();
        assert_eq!(suffix, converted.suffix);

        let name = converted.image_path.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(
            name,
            format!("TUPAC-TR-{:03}-{}.png", id, encode(32, suffix.large, suffix.small))
        );

        let image = image::open(&converted.image_path).unwrap();
        assert_eq!((image.width(), image.height()), suffix.small);
        assert_eq!(suffix.small, (suffix.large.0 / 32, suffix.large.1 / 32));
    }
}

#[tokio::test]
async fn test_thumbnail_fits_box() {
    let mut data = TestData::new();
    data.config.thumbnail_size = 8;
    data.add_slide(1, &SlideBuilder::new().add_level(640, 256, 64));

    let converted = Downsampler::new(data.config.clone()).convert(1).await.unwrap();
    assert_eq!(converted.suffix.small, (20, 8));
    assert_eq!(converted.thumbnail_size, (8, 3));

    let thumbnail = image::open(&converted.thumbnail_path).unwrap();
    assert_eq!((thumbnail.width(), thumbnail.height()), (8, 3));
}

// =============================================================================
// Pyramid Level Selection
// =============================================================================

#[tokio::test]
async fn test_best_level_is_used() {
    let data = TestData::new();
    data.add_slide(1, &SlideBuilder::aperio(320, 256, 20));
    data.add_slide(2, &SlideBuilder::new().add_level(320, 256, 64));
    let downsampler = Downsampler::new(data.config.clone());

    // Downsamples 1, 4, 16: scale 32 reads the 16x level
    assert_eq!(downsampler.convert(1).await.unwrap().level, 2);
    assert_eq!(downsampler.convert_at_scale(1, 8).await.unwrap().level, 1);
    assert_eq!(downsampler.convert_at_scale(1, 16).await.unwrap().level, 2);
    assert_eq!(downsampler.convert_at_scale(1, 2).await.unwrap().level, 0);

    // Single-level slides always read level 0
    assert_eq!(downsampler.convert(2).await.unwrap().level, 0);
}

#[tokio::test]
async fn test_scale_changes_output_name() {
    let data = TestData::new();
    data.add_slide(1, &SlideBuilder::aperio(320, 256, 20));
    let downsampler = Downsampler::new(data.config.clone());

    let converted = downsampler.convert_at_scale(1, 8).await.unwrap();
    assert_eq!(converted.suffix.small, (40, 32));
    assert!(converted
        .image_path
        .ends_with("TUPAC-TR-001-8x-320x256-40x32.png"));

    let image = image::open(&converted.image_path).unwrap();
    assert_eq!((image.width(), image.height()), (40, 32));
}

#[tokio::test]
async fn test_convert_jpeg_and_bigtiff_slides() {
    let data = TestData::new();
    data.add_slide(
        1,
        &SlideBuilder::aperio(320, 256, 20).with_encoding(TileEncoding::Jpeg),
    );
    data.add_slide(
        2,
        &SlideBuilder::aperio(320, 256, 40)
            .with_bigtiff(true)
            .with_byte_order(ByteOrderType::BigEndian),
    );
    let downsampler = Downsampler::new(data.config.clone());

    for id in [1, 2] {
        let converted = downsampler.convert(id).await.unwrap();
        assert_eq!(converted.suffix.small, (10, 8));
        let image = image::open(&converted.image_path).unwrap();
        assert_eq!((image.width(), image.height()), (10, 8));
    }
}

// =============================================================================
// Idempotence
// =============================================================================

#[tokio::test]
async fn test_reconvert_is_byte_identical() {
    let data = TestData::new();
    data.add_slide(1, &SlideBuilder::aperio(352, 256, 20));
    let downsampler = Downsampler::new(data.config.clone());

    let first = downsampler.convert(1).await.unwrap();
    let image = std::fs::read(&first.image_path).unwrap();
    let thumbnail = std::fs::read(&first.thumbnail_path).unwrap();

    let second = downsampler.convert(1).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(std::fs::read(&second.image_path).unwrap(), image);
    assert_eq!(std::fs::read(&second.thumbnail_path).unwrap(), thumbnail);

    assert_eq!(file_names(&data.config.image_dir).len(), 1);
    assert_eq!(file_names(&data.config.thumbnail_dir).len(), 1);
}

// =============================================================================
// Errors
// =============================================================================

#[tokio::test]
async fn test_slide_smaller_than_scale() {
    let data = TestData::new();
    data.add_slide(1, &SlideBuilder::new().add_level(20, 100, 16));

    let err = Downsampler::new(data.config.clone()).convert(1).await.unwrap_err();
    assert!(matches!(
        err,
        ConvertError::EmptyTarget {
            id: 1,
            large: (20, 100),
            scale: 32
        }
    ));
    assert_eq!(err.kind(), "EmptyTarget");
    assert!(!data.config.image_dir.exists());
}

#[tokio::test]
async fn test_unwritable_output_directory() {
    let mut data = TestData::new();
    data.add_slide(1, &SlideBuilder::aperio(320, 256, 20));

    // A regular file where the image directory should be
    let blocker = data.dir.path().join("blocker");
    std::fs::write(&blocker, b"").unwrap();
    data.config.image_dir = blocker.join("images");

    let err = Downsampler::new(data.config.clone()).convert(1).await.unwrap_err();
    assert_eq!(err.kind(), "IOWriteError");
}

#[tokio::test]
async fn test_missing_and_corrupt_slides() {
    let data = TestData::new();
    data.add_corrupt_slide(2);
    let downsampler = Downsampler::new(data.config.clone());

    for id in [1, 2] {
        let err = downsampler.convert(id).await.unwrap_err();
        assert_eq!(err.kind(), "SlideOpenError");
        match err {
            ConvertError::Open(open) => assert_eq!(open.id, id),
            other => panic!("unexpected error: {other}"),
        }
    }
}

#[tokio::test]
async fn test_next_ifd_offset_overflow() {
    let data = TestData::new();
    data.add_raw_slide(1, &bigtiff_with_next_ifd(u64::MAX - 3));

    let err = open_slide(&data.config, 1).await.unwrap_err();
    assert_eq!(err.id, 1);

    let err = Downsampler::new(data.config.clone()).convert(1).await.unwrap_err();
    assert_eq!(err.kind(), "SlideOpenError");
}
