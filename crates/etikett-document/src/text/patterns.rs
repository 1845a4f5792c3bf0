// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Serial recognition patterns — an ordered, declarative table of regex rules
// applied to normalized page text. New identifier formats are added by
// extending the table, not by touching the resolver.

use std::collections::HashSet;

use etikett_core::{SerialHit, SerialType};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::text::normalize::normalize_text;

/// Matches shorter than this after cleanup are discarded — too weak to be a
/// reliable identifier.
const MIN_SERIAL_LEN: usize = 6;

/// Recognition rules in priority order. Priority matters only when the same
/// literal value would otherwise get a different type label: the first rule
/// to see a value decides its type.
static SERIAL_PATTERNS: Lazy<Vec<(Regex, SerialType)>> = Lazy::new(|| {
    [
        // GS1/ISO data-identifier envelope, "S"-prefixed serial field.
        (r"(?i)\[\)>.*?S([A-Z][0-9]{10})[0-9]*[A-Z]", SerialType::BarcodeK),
        (
            r"(?i)\[\)>.*?S([0-9][A-Z][0-9]{9,12})[0-9]*[A-Z]",
            SerialType::BarcodeNum,
        ),
        // Labelled serials: "S/N: ...", "SN- ...".
        (r"(?i)S/?N[:\s;\.\-]+([A-Z0-9]{8,15})", SerialType::GenericSn),
        (r"(?i)SN[:\s;\.\-]+([A-Z0-9]{8,15})", SerialType::GenericSn),
        // Bare letter-prefixed numeric ids.
        (r"(?i)\b([A-Z]{1,2}[0-9]{8,12})\b", SerialType::AlphanumericId),
    ]
    .into_iter()
    .map(|(pattern, serial_type)| {
        let regex = Regex::new(pattern).expect("serial pattern must compile");
        (regex, serial_type)
    })
    .collect()
});

/// Extract typed serial values from raw page text.
///
/// The text is normalized, then matched twice: once verbatim and once with
/// whitespace condensed away between word characters — the condensed variant
/// repairs identifiers that a scanner or text extractor split with spurious
/// spaces, without joining real word boundaries.
///
/// Output order is insertion order of first discovery and is deterministic.
/// Deduplication is by `(value, type)`: the same value may legitimately
/// appear once per distinct type. A match that yields no capture or an
/// undersized value is skipped without aborting the rest of the scan.
pub fn extract_serials(raw_text: &str) -> Vec<SerialHit> {
    if raw_text.is_empty() {
        return Vec::new();
    }

    let base = normalize_text(raw_text);
    let condensed = condense_intra_word_whitespace(&base);

    let mut candidates = vec![base.as_str()];
    if condensed != base {
        candidates.push(condensed.as_str());
    }

    let mut seen: HashSet<(String, SerialType)> = HashSet::new();
    let mut hits = Vec::new();

    for candidate in candidates {
        for (regex, serial_type) in SERIAL_PATTERNS.iter() {
            for caps in regex.captures_iter(candidate) {
                let Some(group) = caps.get(1) else {
                    continue;
                };
                let value: String = group
                    .as_str()
                    .chars()
                    .filter(|ch| !ch.is_whitespace())
                    .flat_map(char::to_uppercase)
                    .collect();
                if value.len() < MIN_SERIAL_LEN {
                    continue;
                }
                if !seen.insert((value.clone(), *serial_type)) {
                    continue;
                }
                debug!(%value, r#type = %serial_type, "serial recognised");
                hits.push(SerialHit {
                    text: value,
                    serial_type: *serial_type,
                    confidence: 1.0,
                });
            }
        }
    }

    hits
}

/// Remove whitespace runs that sit between two word characters.
///
/// Equivalent to deleting `(?<=\w)\s+(?=\w)` — done as a character walk
/// because the regex crate has no lookaround. Whitespace adjacent to
/// punctuation or at the text edges is left alone.
fn condense_intra_word_whitespace(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());

    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        if !ch.is_whitespace() {
            out.push(ch);
            i += 1;
            continue;
        }

        // Found a whitespace run; look at what brackets it.
        let run_end = chars[i..]
            .iter()
            .position(|c| !c.is_whitespace())
            .map_or(chars.len(), |off| i + off);
        let prev_is_word = out.chars().last().is_some_and(is_word_char);
        let next_is_word = chars.get(run_end).copied().is_some_and(is_word_char);

        if !(prev_is_word && next_is_word) {
            out.extend(&chars[i..run_end]);
        }
        i = run_end;
    }

    out
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}
