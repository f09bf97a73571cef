//! Mapping downsampled pixels back to full resolution.
//!
//! The downsampled edge is `floor(large / scale)`, so it under-represents the
//! slide by up to `scale - 1` pixels. Each axis is stretched by
//! `(large / scale) / floor(large / scale)` before applying the scale, which
//! sends the far edge of the small image to the far edge of the slide.

/// Full-resolution pixel for a pixel of the downsampled image.
///
/// Returns `None` when the scale is zero or leaves an axis with no pixels.
pub fn map_small_to_large(point: (u32, u32), large: (u32, u32), scale_factor: u32) -> Option<(u32, u32)> {
    Some((
        map_axis(point.0, large.0, scale_factor)?,
        map_axis(point.1, large.1, scale_factor)?,
    ))
}

fn map_axis(value: u32, large: u32, scale: u32) -> Option<u32> {
    if scale == 0 {
        return None;
    }
    let small = large / scale;
    if small == 0 {
        return None;
    }

    let scale = scale as f64;
    let correction = (large as f64 / scale) / small as f64;
    let mapped = (correction * scale * value as f64).round();

    Some(mapped.min(u32::MAX as f64) as u32)
}

// =============================================================================
// Tests
// =============================================================================
