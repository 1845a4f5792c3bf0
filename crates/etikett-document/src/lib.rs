// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// etikett-document: PDF handling for the label print server. Reads uploaded
// documents, extracts and normalizes page text, recognizes serial numbers,
// crops label regions, and rasterizes them at print quality.

pub mod label;
pub mod pdf;
pub mod text;

#[doc(hidden)]
pub mod test_pdf;

pub use label::{CropRect, compute_crop, render_label, to_png_bytes};
pub use pdf::PdfReader;
pub use text::{extract_serials, normalize_identifier, normalize_text};
