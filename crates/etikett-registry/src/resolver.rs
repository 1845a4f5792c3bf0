// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Barcode resolver — maps a raw scanner string to a stored identifier
// mapping. Exact matches always win; partial matching is substring
// containment in either direction, restricted to keys long enough to make a
// coincidental hit unlikely.

use std::collections::BTreeMap;

use tracing::{debug, instrument};

use etikett_core::IdentifierMapping;
use etikett_document::normalize_identifier;

use crate::registry::DocumentRegistry;

/// Keys shorter than this never participate in partial matching.
pub const MIN_PARTIAL_KEY_LEN: usize = 6;

/// Resolve a raw scan against the identifier index.
///
/// Deterministic for a given snapshot of `mappings`:
/// 1. the scan is normalized; an empty result resolves to nothing;
/// 2. an exact key match wins immediately;
/// 3. otherwise every key of length >= `MIN_PARTIAL_KEY_LEN` that contains
///    the scan, or is contained in it, is a candidate;
/// 4. the best candidate has the longest key, with key-contained-in-scan
///    preferred on equal length; remaining ties fall to the index's stable
///    key order.
#[instrument(skip(mappings), fields(raw = %raw))]
pub fn resolve_scan<'a>(
    mappings: &'a BTreeMap<String, IdentifierMapping>,
    raw: &str,
) -> Option<&'a IdentifierMapping> {
    let scan = normalize_identifier(raw);
    if scan.is_empty() {
        return None;
    }

    if let Some(mapping) = mappings.get(&scan) {
        debug!(key = %mapping.key, "exact match");
        return Some(mapping);
    }

    let best = mappings
        .values()
        .filter(|m| m.key.len() >= MIN_PARTIAL_KEY_LEN)
        .filter(|m| scan.contains(&m.key) || m.key.contains(&scan))
        .max_by_key(|m| (m.key.len(), scan.contains(&m.key)));

    if let Some(mapping) = best {
        debug!(key = %mapping.key, "partial match");
    }
    best
}

impl DocumentRegistry {
    /// Resolve a raw scanner string to a stored mapping.
    pub fn resolve(&self, raw: &str) -> Option<&IdentifierMapping> {
        resolve_scan(self.mappings(), raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use etikett_core::{DocumentId, SerialType};

    fn mapping(key: &str, page_number: u32) -> IdentifierMapping {
        IdentifierMapping {
            key: key.to_string(),
            document_id: DocumentId::new(),
            page_number,
            serial_type: SerialType::GenericSn,
            confidence: 1.0,
            document_name: "test.pdf".to_string(),
        }
    }

    fn index(keys: &[(&str, u32)]) -> BTreeMap<String, IdentifierMapping> {
        keys.iter()
            .map(|(k, p)| (k.to_string(), mapping(k, *p)))
            .collect()
    }

    #[test]
    fn empty_scan_resolves_to_nothing() {
        let idx = index(&[("AB1234567890", 1)]);
        assert!(resolve_scan(&idx, "").is_none());
        assert!(resolve_scan(&idx, "   \t ").is_none());
    }

    #[test]
    fn exact_match_beats_longer_partial() {
        // "AB123456" is exactly stored; "AB1234567890" would be the longer
        // partial candidate containing the scan.
        let idx = index(&[("AB123456", 1), ("AB1234567890", 2)]);
        let hit = resolve_scan(&idx, "ab123456").unwrap();
        assert_eq!(hit.page_number, 1);
    }

    #[test]
    fn composite_scan_resolves_by_containment() {
        // A full GS1 envelope scanned verbatim contains the stored serial.
        let idx = index(&[("K1234567890", 3)]);
        let hit = resolve_scan(&idx, "[)>06SK1234567890123A").unwrap();
        assert_eq!(hit.page_number, 3);
    }

    #[test]
    fn longest_key_wins_among_partials() {
        let idx = index(&[("A1234567", 1), ("A123456789", 2)]);
        let hit = resolve_scan(&idx, "XXA123456789XX").unwrap();
        assert_eq!(hit.page_number, 2);
    }

    #[test]
    fn key_contained_in_scan_breaks_length_ties() {
        // Both keys have length 10; only one is contained in the scan.
        let idx = index(&[("A123456789", 1), ("A123456XYZ", 2)]);
        let hit = resolve_scan(&idx, "A123456789TRAILER").unwrap();
        assert_eq!(hit.page_number, 1);
    }

    #[test]
    fn short_keys_never_match_partially() {
        let idx = index(&[("AB123", 1)]);
        assert!(resolve_scan(&idx, "XXAB123XX").is_none());
        // But exact match on a short key still works.
        let hit = resolve_scan(&idx, "AB123").unwrap();
        assert_eq!(hit.page_number, 1);
    }

    #[test]
    fn scan_normalization_applies_before_lookup() {
        let idx = index(&[("AB1234567890", 4)]);
        let hit = resolve_scan(&idx, "  ab1234567890\n").unwrap();
        assert_eq!(hit.page_number, 4);
    }

    #[test]
    fn ingested_serial_resolves_from_composite_scan() {
        use crate::registry::DocumentRegistry;
        use etikett_document::test_pdf::single_page_pdf;

        let mut reg = DocumentRegistry::open_in_memory().unwrap();
        let pdf = single_page_pdf("Unit S/N: AB1234567890 shipped");
        let outcome = reg.ingest(&pdf, "unit.pdf").unwrap();

        // The scanner returns the whole envelope, not the bare serial.
        let hit = reg.resolve("[)>06SAB1234567890123A").unwrap();
        assert_eq!(hit.document_id, outcome.document_id);
        assert_eq!(hit.page_number, 1);

        reg.delete(outcome.document_id).unwrap();
        assert!(reg.resolve("[)>06SAB1234567890123A").is_none());
    }

    #[test]
    fn unrelated_scan_resolves_to_nothing() {
        let idx = index(&[("AB1234567890", 1)]);
        assert!(resolve_scan(&idx, "ZZZZZZZZZZ").is_none());
    }
}
