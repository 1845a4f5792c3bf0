// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print service — the crop / render / dispatch flow behind the preview and
// print endpoints. Every print attempt is logged, success or failure; only
// validation errors before the crop skip the log.

use tracing::{error, info, instrument};

use etikett_core::config::AppConfig;
use etikett_core::error::{EtikettError, Result};
use etikett_core::{DocumentId, LabelSettings, PrintRecord, PrintStatus, QualitySettings};
use etikett_document::{PdfReader, compute_crop, render_label, to_png_bytes};
use etikett_registry::DocumentRegistry;

use crate::dispatch::PrintDispatcher;

/// Orchestrates label preview and printing against one dispatcher.
pub struct PrintService<D: PrintDispatcher> {
    dispatcher: D,
    config: AppConfig,
}

impl<D: PrintDispatcher> PrintService<D> {
    pub fn new(dispatcher: D, config: AppConfig) -> Self {
        Self { dispatcher, config }
    }

    /// Crop the label region of one page and return it as a standalone
    /// single-page PDF.
    fn crop(
        &self,
        bytes: &[u8],
        page_number: u32,
        label: &LabelSettings,
    ) -> Result<Vec<u8>> {
        let reader = PdfReader::from_bytes(bytes)?;
        let (page_width, page_height) = reader.page_size(page_number)?;
        let rect = compute_crop(page_width, page_height, label);
        reader.crop_page(page_number, label.scale_percent, &rect)
    }

    /// Render a print-quality PNG preview of one label. Nothing is logged;
    /// previews are not print attempts.
    #[instrument(skip(self, registry, bytes), fields(%document_id, page_number))]
    pub fn preview_page(
        &self,
        registry: &DocumentRegistry,
        bytes: &[u8],
        document_id: DocumentId,
        page_number: u32,
        label: &LabelSettings,
        quality: &QualitySettings,
    ) -> Result<Vec<u8>> {
        registry.document(document_id)?;
        let cropped = self.crop(bytes, page_number, label)?;
        let raster = render_label(&cropped, quality, None)?;
        to_png_bytes(&raster)
    }

    /// Print one page's label region.
    ///
    /// The payload is the cropped single-page PDF, or a print-quality PNG
    /// when the deployment sets `raster_payload`. Once a payload exists,
    /// every outcome lands in the print log; dispatch failures are returned
    /// with the facility's message intact.
    #[instrument(skip(self, registry, bytes), fields(%document_id, page_number, printer = ?printer_name))]
    pub async fn print_page(
        &self,
        registry: &mut DocumentRegistry,
        bytes: &[u8],
        document_id: DocumentId,
        page_number: u32,
        printer_name: Option<&str>,
        label: &LabelSettings,
        quality: &QualitySettings,
    ) -> Result<String> {
        let document = registry.document(document_id)?.clone();
        if page_number == 0 || page_number > document.page_count {
            return Err(EtikettError::NotFound(format!(
                "page {page_number} of document {document_id} ({} pages)",
                document.page_count
            )));
        }

        let cropped = self.crop(bytes, page_number, label)?;
        let payload = if self.config.raster_payload {
            let raster = render_label(&cropped, quality, None)?;
            to_png_bytes(&raster)?
        } else {
            cropped
        };

        let printer = printer_name
            .map(str::to_string)
            .or_else(|| self.config.default_printer.clone());
        let job_name = format!("{}-p{page_number}", document.name);

        let outcome = self
            .dispatcher
            .send(&payload, printer.as_deref(), &job_name)
            .await;

        let (status, message) = match &outcome {
            Ok(message) => (PrintStatus::Success, message.clone()),
            Err(err) => (PrintStatus::Failed, err.to_string()),
        };
        registry.record_print(&PrintRecord::new(
            document_id,
            document.name.clone(),
            page_number,
            printer,
            status,
            message,
        ))?;

        match outcome {
            Ok(message) => {
                info!(job = %job_name, "label printed");
                Ok(message)
            }
            Err(err) => {
                error!(job = %job_name, %err, "print dispatch failed");
                Err(err)
            }
        }
    }
}
