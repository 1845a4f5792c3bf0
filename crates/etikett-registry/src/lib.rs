// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// etikett-registry: durable store of ingested documents, the identifier
// index scanned barcodes resolve against, and the append-only print log.

pub mod hash;
pub mod registry;
pub mod resolver;
pub mod stats;

pub use hash::hash_bytes;
pub use registry::DocumentRegistry;
pub use resolver::{MIN_PARTIAL_KEY_LEN, resolve_scan};
