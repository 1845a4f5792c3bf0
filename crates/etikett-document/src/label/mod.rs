// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Label module — crop geometry and the raster quality pipeline.

pub mod geometry;
pub mod raster;

pub use geometry::{CropRect, compute_crop};
pub use raster::{apply_quality, fit_to_area, render_label, to_png_bytes};
