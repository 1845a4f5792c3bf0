// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print dispatch capability — the one seam between the core and whatever
// print facility a deployment has. The core never branches on platform; it
// hands bytes to a dispatcher and records the outcome verbatim.

use etikett_core::error::Result;

use crate::lpr::LprDispatcher;
use crate::spool::SpoolDispatcher;

/// Something that can deliver a rendered label to a printer.
///
/// `send` returns the facility's own message on success and a `Dispatch`
/// error carrying the facility's message verbatim on failure.
pub trait PrintDispatcher {
    fn send(
        &self,
        bytes: &[u8],
        printer_name: Option<&str>,
        job_name: &str,
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

/// The dispatcher a deployment actually runs, selected at startup.
pub enum SystemDispatcher {
    /// Direct RFC 1179 connection to a network printer.
    Lpr(LprDispatcher),
    /// Local `lpr`(1) spooler.
    Spool(SpoolDispatcher),
}

impl PrintDispatcher for SystemDispatcher {
    async fn send(
        &self,
        bytes: &[u8],
        printer_name: Option<&str>,
        job_name: &str,
    ) -> Result<String> {
        match self {
            Self::Lpr(lpr) => lpr.send(bytes, printer_name, job_name).await,
            Self::Spool(spool) => spool.send(bytes, printer_name, job_name).await,
        }
    }
}
