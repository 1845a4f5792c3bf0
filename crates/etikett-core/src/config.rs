// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::{LabelSettings, QualitySettings};

/// Persistent application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory where uploaded document bytes are stored.
    pub upload_dir: PathBuf,
    /// SQLite database file for the registry and print log.
    pub database_file: PathBuf,
    /// Printer used when a request names none.
    pub default_printer: Option<String>,
    /// Label geometry used when a request supplies none.
    pub default_label: LabelSettings,
    /// Raster quality used when a request supplies none.
    pub default_quality: QualitySettings,
    /// Send a rendered raster to the dispatcher instead of the cropped PDF.
    pub raster_payload: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            database_file: PathBuf::from("etikett.db"),
            default_printer: None,
            default_label: LabelSettings::default(),
            default_quality: QualitySettings::default(),
            raster_payload: false,
        }
    }
}
