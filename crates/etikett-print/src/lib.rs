// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// etikett-print: label dispatch. A capability trait over the deployment's
// print facility (network LPR or the local spooler) and the service that
// crops, renders, sends, and logs.

pub mod dispatch;
pub mod lpr;
pub mod service;
pub mod spool;

pub use dispatch::{PrintDispatcher, SystemDispatcher};
pub use lpr::{LPR_PORT, LprDispatcher};
pub use service::PrintService;
pub use spool::SpoolDispatcher;
