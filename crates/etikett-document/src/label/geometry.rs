// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Label geometry — maps label dimensions and offsets (top-left, inches) to a
// crop rectangle in PDF page coordinates (bottom-left, points).

use etikett_core::LabelSettings;
use tracing::debug;

/// PDF user-space units per inch.
pub const POINTS_PER_INCH: f32 = 72.0;

/// A page region in PDF points, bottom-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    pub lower_left_x: f32,
    pub lower_left_y: f32,
    pub upper_right_x: f32,
    pub upper_right_y: f32,
}

impl CropRect {
    pub fn width(&self) -> f32 {
        self.upper_right_x - self.lower_left_x
    }

    pub fn height(&self) -> f32 {
        self.upper_right_y - self.lower_left_y
    }
}

/// Compute the crop rectangle for a label on a page of `page_width` ×
/// `page_height` points.
///
/// Label dimensions are clamped to supported stock bounds first. When
/// `scale_percent` differs from 100, the page's own dimensions are scaled by
/// `scale_percent / 100` — this models shrinking or expanding the source page
/// content before the crop is taken, not resizing the output.
///
/// Offsets are measured from the page's top-left corner while PDF coordinates
/// originate bottom-left, so the vertical axis is flipped. Every bound is
/// clamped into `[0, page_width] × [0, page_height]`: a label that would
/// exceed the page is truncated, never rejected.
pub fn compute_crop(page_width: f32, page_height: f32, settings: &LabelSettings) -> CropRect {
    let settings = settings.clamped();

    let scale = settings.scale_percent / 100.0;
    let (page_width, page_height) = if (settings.scale_percent - 100.0).abs() > f32::EPSILON {
        (page_width * scale, page_height * scale)
    } else {
        (page_width, page_height)
    };

    let label_width = settings.width_in * POINTS_PER_INCH;
    let label_height = settings.height_in * POINTS_PER_INCH;
    let offset_x = settings.offset_x_in * POINTS_PER_INCH;
    let offset_y = settings.offset_y_in * POINTS_PER_INCH;

    let rect = CropRect {
        lower_left_x: offset_x.clamp(0.0, page_width),
        lower_left_y: (page_height - offset_y - label_height).clamp(0.0, page_height),
        upper_right_x: (offset_x + label_width).clamp(0.0, page_width),
        upper_right_y: (page_height - offset_y).clamp(0.0, page_height),
    };

    debug!(
        page_width,
        page_height,
        ll_x = rect.lower_left_x,
        ll_y = rect.lower_left_y,
        ur_x = rect.upper_right_x,
        ur_y = rect.upper_right_y,
        "Crop rectangle computed"
    );
    rect
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(width_in: f32, height_in: f32, ox: f32, oy: f32, scale: f32) -> LabelSettings {
        LabelSettings {
            width_in,
            height_in,
            offset_x_in: ox,
            offset_y_in: oy,
            scale_percent: scale,
        }
    }

    #[test]
    fn default_label_crops_top_left() {
        let rect = compute_crop(612.0, 792.0, &LabelSettings::default());
        assert!((rect.lower_left_x - 0.0).abs() < 1e-3);
        assert!((rect.upper_right_y - 792.0).abs() < 1e-3);
        assert!((rect.width() - 3.94 * 72.0).abs() < 1e-2);
        assert!((rect.height() - 1.5 * 72.0).abs() < 1e-2);
    }

    #[test]
    fn full_page_label_is_identity() {
        // Label the size of the page with zero offsets covers the whole page.
        let rect = compute_crop(8.5 * 72.0, 11.0 * 72.0, &settings(8.5, 11.0, 0.0, 0.0, 100.0));
        assert!((rect.lower_left_x).abs() < 1e-3);
        assert!((rect.lower_left_y).abs() < 1e-3);
        assert!((rect.upper_right_x - 8.5 * 72.0).abs() < 1e-2);
        assert!((rect.upper_right_y - 11.0 * 72.0).abs() < 1e-2);
    }

    #[test]
    fn oversized_request_is_truncated_not_rejected() {
        // Offset pushes the label past the right and bottom edges.
        let rect = compute_crop(612.0, 792.0, &settings(8.5, 11.0, 4.0, 10.5, 100.0));
        assert!(rect.upper_right_x <= 612.0);
        assert!(rect.lower_left_y >= 0.0);
        assert!(rect.width() >= 0.0);
        assert!(rect.height() >= 0.0);
    }

    #[test]
    fn bounds_always_within_page() {
        let cases = [
            settings(1.0, 1.0, -5.0, -5.0, 100.0),
            settings(8.5, 11.0, 100.0, 100.0, 100.0),
            settings(0.0, -3.0, 0.0, 0.0, 100.0),
            settings(4.0, 2.0, 1.0, 1.0, 37.0),
        ];
        for s in cases {
            let scale = s.scale_percent / 100.0;
            let (pw, ph) = (612.0 * scale, 792.0 * scale);
            let rect = compute_crop(612.0, 792.0, &s);
            assert!(rect.lower_left_x >= 0.0 && rect.upper_right_x <= pw + 1e-3);
            assert!(rect.lower_left_y >= 0.0 && rect.upper_right_y <= ph + 1e-3);
        }
    }

    #[test]
    fn degenerate_dimensions_are_clamped_up() {
        let rect = compute_crop(612.0, 792.0, &settings(0.0, -2.0, 0.0, 0.0, 100.0));
        assert!((rect.width() - 72.0).abs() < 1e-2);
        assert!((rect.height() - 72.0).abs() < 1e-2);
    }

    #[test]
    fn scale_shrinks_the_page_before_cropping() {
        // At 50% the page is 306x396, so a 3.94in label is truncated at the
        // new right edge.
        let rect = compute_crop(612.0, 792.0, &settings(3.94, 1.5, 1.0, 0.0, 50.0));
        assert!((rect.upper_right_y - 396.0).abs() < 1e-3);
        assert!((rect.upper_right_x - 306.0).abs() < 1e-3);
    }
}
