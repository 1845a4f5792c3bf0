// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster quality pipeline — rasterizes a cropped label PDF at print
// resolution and applies sharpening, contrast, and color-mode reduction.
// Stage order is fixed: sharpening and contrast run on the full-color image
// before any monochrome thresholding, so edge definition survives
// quantization.

use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgba, RgbaImage};
use pdfium_render::prelude::*;
use tracing::{debug, info, instrument};

use etikett_core::error::EtikettError;
use etikett_core::{ColorMode, QualitySettings, Resampling};

use crate::label::geometry::POINTS_PER_INCH;

/// Unsharp-mask strength tuned for barcode edges: sigma from a 1px radius,
/// threshold 3 to leave flat areas untouched.
const UNSHARP_SIGMA: f32 = 1.0;
const UNSHARP_THRESHOLD: i32 = 3;

/// Map a resampling setting onto the `image` crate's filter types.
pub fn resampling_filter(resampling: Resampling) -> image::imageops::FilterType {
    match resampling {
        Resampling::Lanczos => image::imageops::FilterType::Lanczos3,
        Resampling::Bicubic => image::imageops::FilterType::CatmullRom,
        Resampling::Bilinear => image::imageops::FilterType::Triangle,
        Resampling::Nearest => image::imageops::FilterType::Nearest,
    }
}

/// Rasterize the first page of a (cropped, single-page) PDF at `dpi`.
///
/// Binds the system pdfium library on each call; when the library cannot be
/// bound or the render fails, a `Render` error is returned — the pipeline
/// never substitutes a placeholder image.
#[instrument(skip(pdf_bytes), fields(pdf_len = pdf_bytes.len(), dpi))]
pub fn rasterize_page(pdf_bytes: &[u8], dpi: u32) -> Result<DynamicImage, EtikettError> {
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name()))
        .map_err(|err| EtikettError::Render(format!("pdfium library unavailable: {err}")))?;
    let pdfium = Pdfium::new(bindings);

    let document = pdfium
        .load_pdf_from_byte_slice(pdf_bytes, None)
        .map_err(|err| EtikettError::Render(format!("load cropped PDF: {err}")))?;
    let page = document
        .pages()
        .get(0)
        .map_err(|err| EtikettError::Render(format!("cropped PDF has no page: {err}")))?;

    let scale = dpi as f32 / POINTS_PER_INCH;
    let target_w = (page.width().value * scale).round().max(1.0) as i32;
    let target_h = (page.height().value * scale).round().max(1.0) as i32;

    let config = PdfRenderConfig::new()
        .set_target_width(target_w)
        .set_maximum_height(target_h);

    let bitmap = page
        .render_with_config(&config)
        .map_err(|err| EtikettError::Render(format!("rasterization failed: {err}")))?;

    let width = bitmap.width() as u32;
    let height = bitmap.height() as u32;
    let pixels = bitmap.as_rgba_bytes().to_vec();

    let raster = RgbaImage::from_raw(width, height, pixels).ok_or_else(|| {
        EtikettError::Render("pdfium returned a malformed pixel buffer".to_string())
    })?;

    info!(width, height, dpi, "Page rasterized");
    Ok(DynamicImage::ImageRgba8(raster))
}

/// Apply the quality stages to an already-rasterized image, in order:
/// sharpen, contrast, color-mode reduction.
#[instrument(skip(image), fields(color_mode = ?settings.color_mode))]
pub fn apply_quality(image: DynamicImage, settings: &QualitySettings) -> DynamicImage {
    let mut image = image;

    if settings.sharpening {
        image = image.unsharpen(UNSHARP_SIGMA, UNSHARP_THRESHOLD);
        debug!("Sharpening applied");
    }

    if (settings.contrast - 1.0).abs() > f32::EPSILON {
        image = adjust_contrast(image, settings.contrast);
        debug!(factor = settings.contrast, "Contrast adjusted");
    }

    match settings.color_mode {
        ColorMode::Rgb => image,
        ColorMode::Grayscale => DynamicImage::ImageLuma8(image.to_luma8()),
        ColorMode::Monochrome => {
            DynamicImage::ImageLuma8(threshold_to_monochrome(&image.to_luma8(), settings.threshold))
        }
    }
}

/// Multiply contrast around the mid-point: `factor * (channel - 128) + 128`,
/// clamped per channel. A factor of 1.0 is the identity.
fn adjust_contrast(image: DynamicImage, factor: f32) -> DynamicImage {
    let rgba = image.to_rgba8();
    let contrasted = image::ImageBuffer::from_fn(rgba.width(), rgba.height(), |x, y| {
        let Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        let adjust = |channel: u8| -> u8 {
            let val = factor * (channel as f32 - 128.0) + 128.0;
            val.clamp(0.0, 255.0) as u8
        };
        Rgba([adjust(r), adjust(g), adjust(b), a])
    });
    DynamicImage::ImageRgba8(contrasted)
}

/// Hard black/white cutoff: pixels below `threshold` become pure black,
/// pixels at or above it become pure white.
fn threshold_to_monochrome(gray: &GrayImage, threshold: u8) -> GrayImage {
    let (width, height) = gray.dimensions();
    let mut output = GrayImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let val = gray.get_pixel(x, y).0[0];
            let binary = if val < threshold { 0u8 } else { 255u8 };
            output.put_pixel(x, y, Luma([binary]));
        }
    }
    output
}

/// Uniformly scale the raster to the largest size that fits the printable
/// area, then center it on a matching canvas. Aspect ratio is never
/// distorted; the surrounding canvas is white.
#[instrument(skip(image), fields(area_width, area_height))]
pub fn fit_to_area(
    image: DynamicImage,
    area_width: u32,
    area_height: u32,
    resampling: Resampling,
) -> DynamicImage {
    let (img_w, img_h) = (image.width().max(1), image.height().max(1));
    let ratio = (area_width as f32 / img_w as f32).min(area_height as f32 / img_h as f32);
    let scaled_w = ((img_w as f32 * ratio) as u32).max(1);
    let scaled_h = ((img_h as f32 * ratio) as u32).max(1);

    let filter = resampling_filter(resampling);
    let x = (area_width.saturating_sub(scaled_w)) / 2;
    let y = (area_height.saturating_sub(scaled_h)) / 2;

    debug!(scaled_w, scaled_h, x, y, "Raster fitted to printable area");

    // Compose in the image's own color space so a grayscale or monochrome
    // raster stays single-channel.
    match image {
        DynamicImage::ImageLuma8(gray) => {
            let resized = image::imageops::resize(&gray, scaled_w, scaled_h, filter);
            let mut canvas = GrayImage::from_pixel(area_width, area_height, Luma([255u8]));
            image::imageops::overlay(&mut canvas, &resized, x as i64, y as i64);
            DynamicImage::ImageLuma8(canvas)
        }
        other => {
            let rgba = other.to_rgba8();
            let resized = image::imageops::resize(&rgba, scaled_w, scaled_h, filter);
            let mut canvas =
                RgbaImage::from_pixel(area_width, area_height, Rgba([255u8, 255, 255, 255]));
            image::imageops::overlay(&mut canvas, &resized, x as i64, y as i64);
            DynamicImage::ImageRgba8(canvas)
        }
    }
}

/// Run the full pipeline on a cropped single-page PDF: rasterize at
/// `settings.dpi`, apply quality stages, and optionally fit to a printable
/// area in pixels.
pub fn render_label(
    pdf_bytes: &[u8],
    settings: &QualitySettings,
    printable_area: Option<(u32, u32)>,
) -> Result<DynamicImage, EtikettError> {
    let raster = rasterize_page(pdf_bytes, settings.dpi)?;
    let enhanced = apply_quality(raster, settings);
    Ok(match printable_area {
        Some((w, h)) => fit_to_area(enhanced, w, h, settings.resampling),
        None => enhanced,
    })
}

/// Encode a raster as PNG bytes.
pub fn to_png_bytes(image: &DynamicImage) -> Result<Vec<u8>, EtikettError> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|err| EtikettError::Image(format!("PNG encoding failed: {}", err)))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_gray(value: u8) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(40, 20, Luma([value])))
    }

    fn quality(color_mode: ColorMode) -> QualitySettings {
        QualitySettings {
            color_mode,
            ..QualitySettings::default()
        }
    }

    #[test]
    fn monochrome_below_threshold_is_black() {
        let out = apply_quality(uniform_gray(100), &quality(ColorMode::Monochrome));
        let gray = out.to_luma8();
        assert!(gray.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn monochrome_at_threshold_is_white() {
        let out = apply_quality(uniform_gray(128), &quality(ColorMode::Monochrome));
        let gray = out.to_luma8();
        assert!(gray.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn grayscale_collapses_to_single_channel() {
        let rgb = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            10,
            10,
            Rgba([200, 100, 50, 255]),
        ));
        let out = apply_quality(rgb, &quality(ColorMode::Grayscale));
        assert!(matches!(out, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn contrast_identity_leaves_pixels_untouched() {
        let settings = QualitySettings {
            sharpening: false,
            contrast: 1.0,
            color_mode: ColorMode::Rgb,
            ..QualitySettings::default()
        };
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([90, 140, 30, 255])));
        let out = apply_quality(img.clone(), &settings);
        assert_eq!(out.to_rgba8().get_pixel(0, 0), img.to_rgba8().get_pixel(0, 0));
    }

    #[test]
    fn contrast_spreads_values_around_midpoint() {
        let boosted = adjust_contrast(
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([100, 160, 128, 255]))),
            2.0,
        );
        let px = boosted.to_rgba8().get_pixel(0, 0).0;
        assert_eq!(px[0], 72); // 2*(100-128)+128
        assert_eq!(px[1], 192); // 2*(160-128)+128
        assert_eq!(px[2], 128); // midpoint is a fixed point
    }

    #[test]
    fn fit_preserves_aspect_and_centers() {
        let wide = DynamicImage::ImageLuma8(GrayImage::from_pixel(100, 50, Luma([0u8])));
        let out = fit_to_area(wide, 200, 200, Resampling::Nearest);
        assert_eq!(out.width(), 200);
        assert_eq!(out.height(), 200);

        let gray = out.to_luma8();
        // Scaled content is 200x100 centered vertically: rows above and below
        // stay white, the middle band is black.
        assert_eq!(gray.get_pixel(100, 10).0[0], 255);
        assert_eq!(gray.get_pixel(100, 100).0[0], 0);
        assert_eq!(gray.get_pixel(100, 190).0[0], 255);
    }

    #[test]
    fn fit_never_upscales_past_the_area() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(30, 10, Luma([0u8])));
        let out = fit_to_area(img, 90, 90, Resampling::Bilinear);
        assert_eq!(out.width(), 90);
        assert_eq!(out.height(), 90);
    }

    #[test]
    fn png_round_trip() {
        let img = uniform_gray(77);
        let png = to_png_bytes(&img).expect("encode PNG");
        let decoded = image::load_from_memory(&png).expect("decode PNG");
        assert_eq!(decoded.width(), 40);
        assert_eq!(decoded.height(), 20);
    }
}
