// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text module — normalization of extracted PDF text and serial recognition.

pub mod normalize;
pub mod patterns;

pub use normalize::{normalize_identifier, normalize_text};
pub use patterns::extract_serials;
