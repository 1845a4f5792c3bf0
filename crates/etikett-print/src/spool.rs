// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Spool dispatcher — hands the document to the local `lpr`(1) spooler. Used
// on hosts where CUPS (or another BSD-compatible spooler) already knows the
// printers; Etikett then needs no printer addresses of its own.

use tokio::process::Command;
use tracing::{info, instrument};

use etikett_core::error::{EtikettError, Result};

use crate::dispatch::PrintDispatcher;

/// Dispatches via the system print spooler.
#[derive(Default)]
pub struct SpoolDispatcher;

impl SpoolDispatcher {
    pub fn new() -> Self {
        Self
    }
}

impl PrintDispatcher for SpoolDispatcher {
    #[instrument(skip(self, bytes), fields(job = %job_name, printer = ?printer_name, size = bytes.len()))]
    async fn send(
        &self,
        bytes: &[u8],
        printer_name: Option<&str>,
        job_name: &str,
    ) -> Result<String> {
        // The spooler reads from a file, not stdin, so older lpr builds
        // behave identically.
        let mut spool_file = tempfile::NamedTempFile::new()?;
        std::io::Write::write_all(&mut spool_file, bytes)?;

        let mut cmd = Command::new("lpr");
        if let Some(printer) = printer_name {
            cmd.arg("-P").arg(printer);
        }
        cmd.arg("-J").arg(job_name);
        cmd.arg(spool_file.path());

        let output = cmd
            .output()
            .await
            .map_err(|e| EtikettError::Dispatch(format!("failed to run lpr: {e}")))?;

        if output.status.success() {
            info!("job handed to spooler");
            Ok(format!("job '{job_name}' handed to spooler"))
        } else {
            // The spooler's own words are the most useful diagnostic.
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(EtikettError::Dispatch(if stderr.is_empty() {
                format!("lpr exited with {}", output.status)
            } else {
                stderr
            }))
        }
    }
}
