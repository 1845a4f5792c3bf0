// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Etikett label print server.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an ingested document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An ingested PDF document.
///
/// Identity is the SHA-256 content hash: byte-identical uploads always map to
/// the same `Document`. Never mutated after its ingestion pass completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    /// Display name supplied at upload time.
    pub name: String,
    /// SHA-256 hex digest of the raw document bytes.
    pub content_hash: String,
    pub page_count: u32,
    /// Number of distinct identifier keys stored for this document.
    pub identifier_count: u32,
    pub uploaded_at: DateTime<Utc>,
}

/// Which recognition pattern produced a serial value.
///
/// The variants are ordered by pattern priority: when the same literal value
/// matches more than one pattern, the earlier type is the one stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SerialType {
    /// GS1/ISO data-identifier envelope, letter-prefixed long numeric serial.
    BarcodeK,
    /// GS1/ISO data-identifier envelope, digit/letter-prefixed numeric serial.
    BarcodeNum,
    /// "S/N"- or "SN"-labelled alphanumeric serial.
    GenericSn,
    /// Bare 1-2 letters followed by 8-12 digits, word-bounded.
    AlphanumericId,
}

impl SerialType {
    /// Stable string form used in the database and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BarcodeK => "BARCODE_K",
            Self::BarcodeNum => "BARCODE_NUM",
            Self::GenericSn => "GENERIC_SN",
            Self::AlphanumericId => "ALPHANUMERIC_ID",
        }
    }

    /// Parse the stable string form back into a variant.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BARCODE_K" => Some(Self::BarcodeK),
            "BARCODE_NUM" => Some(Self::BarcodeNum),
            "GENERIC_SN" => Some(Self::GenericSn),
            "ALPHANUMERIC_ID" => Some(Self::AlphanumericId),
            _ => None,
        }
    }
}

impl std::fmt::Display for SerialType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A serial value recognised in document text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialHit {
    /// Uppercased value with internal whitespace stripped.
    pub text: String,
    pub serial_type: SerialType,
    /// Fixed at 1.0 in the current model; kept in the contract for future
    /// weighting.
    pub confidence: f32,
}

/// Maps one normalized identifier key to the document page it identifies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifierMapping {
    /// Normalized identifier string (see `normalize_identifier`).
    pub key: String,
    pub document_id: DocumentId,
    /// 1-based page number; always within the owning document's page count.
    pub page_number: u32,
    pub serial_type: SerialType,
    pub confidence: f32,
    /// Display name of the owning document, denormalized for scan responses.
    pub document_name: String,
}

/// Result of one ingestion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestOutcome {
    pub document_id: DocumentId,
    pub page_count: u32,
    pub identifier_count: u32,
    /// True when the bytes were already known and no extraction was re-run.
    pub is_duplicate: bool,
}

/// Outcome of a dispatched print job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrintStatus {
    Success,
    Failed,
}

impl PrintStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Append-only log entry for one print attempt.
///
/// Records are never mutated or deleted; deleting a document leaves its
/// records in place as history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintRecord {
    pub id: Uuid,
    pub document_id: DocumentId,
    pub document_name: String,
    pub page_number: u32,
    /// Target printer, or `None` for the system default.
    pub printer_name: Option<String>,
    pub status: PrintStatus,
    /// Message from the print facility, verbatim.
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl PrintRecord {
    pub fn new(
        document_id: DocumentId,
        document_name: String,
        page_number: u32,
        printer_name: Option<String>,
        status: PrintStatus,
        message: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            document_name,
            page_number,
            printer_name,
            status,
            message,
            timestamp: Utc::now(),
        }
    }
}

/// Physical label dimensions and placement for one print/preview request.
///
/// All lengths are in inches; `scale_percent` shrinks or expands the source
/// page content before the crop is taken (100 = unchanged).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelSettings {
    pub width_in: f32,
    pub height_in: f32,
    pub offset_x_in: f32,
    pub offset_y_in: f32,
    pub scale_percent: f32,
}

impl LabelSettings {
    /// Widest label stock the transform accepts, in inches.
    pub const MAX_WIDTH_IN: f32 = 8.5;
    /// Tallest label stock the transform accepts, in inches.
    pub const MAX_HEIGHT_IN: f32 = 11.0;
    /// Smallest accepted label edge, in inches.
    pub const MIN_EDGE_IN: f32 = 1.0;

    /// Clamp width and height into the supported stock bounds.
    ///
    /// Degenerate (zero or negative) dimensions are pulled up to the minimum
    /// edge rather than rejected, so a crop rectangle always has area.
    pub fn clamped(mut self) -> Self {
        self.width_in = self.width_in.clamp(Self::MIN_EDGE_IN, Self::MAX_WIDTH_IN);
        self.height_in = self.height_in.clamp(Self::MIN_EDGE_IN, Self::MAX_HEIGHT_IN);
        self
    }
}

impl Default for LabelSettings {
    fn default() -> Self {
        Self {
            width_in: 3.94,
            height_in: 1.5,
            offset_x_in: 0.0,
            offset_y_in: 0.0,
            scale_percent: 100.0,
        }
    }
}

/// Output color depth of the rendered label raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorMode {
    Rgb,
    Grayscale,
    /// Hard black/white cutoff — for thermal label printers with no gray
    /// levels.
    Monochrome,
}

/// Resampling filter used when fitting the raster to the printable area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resampling {
    Lanczos,
    Bicubic,
    Bilinear,
    Nearest,
}

/// Raster quality parameters for one print/preview request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualitySettings {
    /// Rasterization resolution in dots per inch.
    pub dpi: u32,
    pub color_mode: ColorMode,
    /// Unsharp-mask edge sharpening; barcodes need edge contrast to stay
    /// scannable after the crop/scale stage.
    pub sharpening: bool,
    /// Contrast multiplier; 1.0 is a no-op.
    pub contrast: f32,
    /// Monochrome cutoff: pixels below become black, at/above become white.
    pub threshold: u8,
    pub resampling: Resampling,
}

impl Default for QualitySettings {
    fn default() -> Self {
        Self {
            dpi: 600,
            color_mode: ColorMode::Grayscale,
            sharpening: true,
            contrast: 1.0,
            threshold: 128,
            resampling: Resampling::Lanczos,
        }
    }
}

/// Aggregate counters for the dashboard, derived from the registry and the
/// print log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_documents: usize,
    pub total_identifiers: usize,
    pub total_pages: u64,
    pub total_prints: usize,
    pub failed_prints: usize,
    /// Identifier mappings whose page has never printed successfully.
    pub pending_prints: usize,
}

/// Per-document print statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentPrintStats {
    pub document: Document,
    pub total_identifiers: usize,
    /// Mapped pages with at least one successful print.
    pub printed_pages: usize,
    /// Mapped pages never printed successfully, ascending.
    pub pending_pages: Vec<u32>,
    /// Successful print count per page.
    pub page_print_counts: BTreeMap<u32, u32>,
}
