// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print log and statistics — append-only record of every print attempt plus
// the derived dashboard and per-document views.

use std::collections::{BTreeMap, BTreeSet};

use rusqlite::params;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use etikett_core::error::Result;
use etikett_core::{
    DashboardStats, DocumentId, DocumentPrintStats, PrintRecord, PrintStatus,
};

use crate::registry::{DocumentRegistry, db_err, parse_timestamp};

const PRINT_LOG_COLUMNS: &str =
    "id, document_id, document_name, page_number, printer_name, status, message, timestamp";

fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Option<PrintRecord>> {
    let id: String = row.get(0)?;
    let document_id: String = row.get(1)?;
    let status: String = row.get(5)?;
    let timestamp: String = row.get(7)?;

    let (Ok(id), Ok(document_uuid)) = (Uuid::parse_str(&id), Uuid::parse_str(&document_id)) else {
        return Ok(None);
    };
    let Some(status) = PrintStatus::parse(&status) else {
        return Ok(None);
    };

    Ok(Some(PrintRecord {
        id,
        document_id: DocumentId(document_uuid),
        document_name: row.get(2)?,
        page_number: row.get(3)?,
        printer_name: row.get(4)?,
        status,
        message: row.get(6)?,
        timestamp: parse_timestamp(&timestamp),
    }))
}

impl DocumentRegistry {
    // -- Print log ----------------------------------------------------------

    /// Append a print attempt to the log. Records are never mutated or
    /// deleted, even when their document is.
    #[instrument(skip(self, record), fields(document_id = %record.document_id, page = record.page_number, status = record.status.as_str()))]
    pub fn record_print(&mut self, record: &PrintRecord) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO print_log (id, document_id, document_name, page_number, printer_name, status, message, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.id.to_string(),
                    record.document_id.to_string(),
                    record.document_name,
                    record.page_number,
                    record.printer_name,
                    record.status.as_str(),
                    record.message,
                    record.timestamp.to_rfc3339(),
                ],
            )
            .map_err(db_err)?;
        debug!("print record appended");
        Ok(())
    }

    /// The full print history, newest first.
    pub fn print_history(&self) -> Result<Vec<PrintRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {PRINT_LOG_COLUMNS} FROM print_log ORDER BY timestamp DESC, id DESC"
            ))
            .map_err(db_err)?;
        let rows = stmt.query_map([], record_from_row).map_err(db_err)?;

        let mut records = Vec::new();
        for row in rows {
            match row.map_err(db_err)? {
                Some(record) => records.push(record),
                None => warn!("skipping malformed print log row"),
            }
        }
        Ok(records)
    }

    /// Number of successful prints for the page a scan resolves to, or 0 when
    /// the scan does not resolve.
    pub fn print_count_for_scan(&self, raw: &str) -> Result<u32> {
        let Some(mapping) = self.resolve(raw) else {
            return Ok(0);
        };
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM print_log
                 WHERE document_id = ?1 AND page_number = ?2 AND status = 'success'",
                params![mapping.document_id.to_string(), mapping.page_number],
                |row| row.get(0),
            )
            .map_err(db_err)
    }

    /// The most recent successful print for the page a scan resolves to.
    pub fn last_print_for_scan(&self, raw: &str) -> Result<Option<PrintRecord>> {
        let Some(mapping) = self.resolve(raw) else {
            return Ok(None);
        };
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {PRINT_LOG_COLUMNS} FROM print_log
                 WHERE document_id = ?1 AND page_number = ?2 AND status = 'success'
                 ORDER BY timestamp DESC, id DESC
                 LIMIT 1"
            ))
            .map_err(db_err)?;
        let mut rows = stmt
            .query_map(
                params![mapping.document_id.to_string(), mapping.page_number],
                record_from_row,
            )
            .map_err(db_err)?;

        match rows.next() {
            Some(row) => Ok(row.map_err(db_err)?),
            None => Ok(None),
        }
    }

    // -- Derived statistics -------------------------------------------------

    /// Pages with at least one successful print, as (document id, page) pairs.
    fn printed_pages(&self) -> Result<BTreeSet<(String, u32)>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT DISTINCT document_id, page_number FROM print_log
                 WHERE status = 'success'",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?)))
            .map_err(db_err)?;

        let mut pages = BTreeSet::new();
        for row in rows {
            pages.insert(row.map_err(db_err)?);
        }
        Ok(pages)
    }

    /// Aggregate counters for the dashboard.
    pub fn dashboard_stats(&self) -> Result<DashboardStats> {
        let documents = self.documents();
        let total_prints: usize = self
            .conn
            .query_row("SELECT COUNT(*) FROM print_log", [], |row| {
                row.get::<_, i64>(0)
            })
            .map_err(db_err)? as usize;
        let failed_prints: usize = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM print_log WHERE status = 'failed'",
                [],
                |row| row.get::<_, i64>(0),
            )
            .map_err(db_err)? as usize;

        let printed = self.printed_pages()?;
        let pending_prints = self
            .mappings()
            .values()
            .filter(|m| !printed.contains(&(m.document_id.to_string(), m.page_number)))
            .count();

        Ok(DashboardStats {
            total_documents: documents.len(),
            total_identifiers: self.mappings().len(),
            total_pages: documents.iter().map(|d| u64::from(d.page_count)).sum(),
            total_prints,
            failed_prints,
            pending_prints,
        })
    }

    /// Per-document print progress: which mapped pages have printed, which
    /// are still pending, and how often each page printed successfully.
    pub fn document_print_stats(&self, document_id: DocumentId) -> Result<DocumentPrintStats> {
        let document = self.document(document_id)?.clone();
        let mappings = self.mappings_for(document_id);

        let mut page_print_counts: BTreeMap<u32, u32> = BTreeMap::new();
        let mut stmt = self
            .conn
            .prepare(
                "SELECT page_number, COUNT(*) FROM print_log
                 WHERE document_id = ?1 AND status = 'success'
                 GROUP BY page_number",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![document_id.to_string()], |row| {
                Ok((row.get::<_, u32>(0)?, row.get::<_, u32>(1)?))
            })
            .map_err(db_err)?;
        for row in rows {
            let (page, count) = row.map_err(db_err)?;
            page_print_counts.insert(page, count);
        }

        let mapped_pages: BTreeSet<u32> = mappings.iter().map(|m| m.page_number).collect();
        let pending_pages: Vec<u32> = mapped_pages
            .iter()
            .copied()
            .filter(|page| !page_print_counts.contains_key(page))
            .collect();
        let printed_pages = mapped_pages.len() - pending_pages.len();

        Ok(DocumentPrintStats {
            document,
            total_identifiers: mappings.len(),
            printed_pages,
            pending_pages,
            page_print_counts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use etikett_document::test_pdf::pdf_with_pages;

    fn registry_with_doc() -> (DocumentRegistry, DocumentId) {
        let mut reg = DocumentRegistry::open_in_memory().unwrap();
        let pdf = pdf_with_pages(&["S/N: AB1234567890", "S/N: CD9876543210"]);
        let outcome = reg.ingest(&pdf, "stats.pdf").unwrap();
        (reg, outcome.document_id)
    }

    fn record(
        document_id: DocumentId,
        page_number: u32,
        status: PrintStatus,
    ) -> PrintRecord {
        PrintRecord::new(
            document_id,
            "stats.pdf".to_string(),
            page_number,
            Some("zebra".to_string()),
            status,
            "ok".to_string(),
        )
    }

    #[test]
    fn history_is_newest_first() {
        let (mut reg, id) = registry_with_doc();
        reg.record_print(&record(id, 1, PrintStatus::Success)).unwrap();
        reg.record_print(&record(id, 2, PrintStatus::Failed)).unwrap();

        let history = reg.print_history().unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].timestamp >= history[1].timestamp);
    }

    #[test]
    fn print_count_follows_resolution() {
        let (mut reg, id) = registry_with_doc();
        reg.record_print(&record(id, 1, PrintStatus::Success)).unwrap();
        reg.record_print(&record(id, 1, PrintStatus::Success)).unwrap();
        reg.record_print(&record(id, 1, PrintStatus::Failed)).unwrap();

        // Failed attempts do not count; unresolvable scans count zero.
        assert_eq!(reg.print_count_for_scan("AB1234567890").unwrap(), 2);
        assert_eq!(reg.print_count_for_scan("CD9876543210").unwrap(), 0);
        assert_eq!(reg.print_count_for_scan("NO-SUCH-SERIAL").unwrap(), 0);
    }

    #[test]
    fn last_print_skips_failures() {
        let (mut reg, id) = registry_with_doc();
        let ok = record(id, 1, PrintStatus::Success);
        reg.record_print(&ok).unwrap();
        reg.record_print(&record(id, 1, PrintStatus::Failed)).unwrap();

        let last = reg.last_print_for_scan("AB1234567890").unwrap().unwrap();
        assert_eq!(last.id, ok.id);
        assert_eq!(last.status, PrintStatus::Success);
    }

    #[test]
    fn dashboard_counts_pending_pages() {
        let (mut reg, id) = registry_with_doc();
        reg.record_print(&record(id, 1, PrintStatus::Success)).unwrap();

        let stats = reg.dashboard_stats().unwrap();
        assert_eq!(stats.total_documents, 1);
        assert_eq!(stats.total_identifiers, 2);
        assert_eq!(stats.total_pages, 2);
        assert_eq!(stats.total_prints, 1);
        assert_eq!(stats.failed_prints, 0);
        // Page 2's mapping has never printed.
        assert_eq!(stats.pending_prints, 1);
    }

    #[test]
    fn per_document_progress() {
        let (mut reg, id) = registry_with_doc();
        reg.record_print(&record(id, 1, PrintStatus::Success)).unwrap();
        reg.record_print(&record(id, 1, PrintStatus::Success)).unwrap();

        let stats = reg.document_print_stats(id).unwrap();
        assert_eq!(stats.total_identifiers, 2);
        assert_eq!(stats.printed_pages, 1);
        assert_eq!(stats.pending_pages, vec![2]);
        assert_eq!(stats.page_print_counts.get(&1), Some(&2));
    }

    #[test]
    fn records_survive_document_deletion() {
        let (mut reg, id) = registry_with_doc();
        reg.record_print(&record(id, 1, PrintStatus::Success)).unwrap();
        reg.delete(id).unwrap();

        assert_eq!(reg.print_history().unwrap().len(), 1);
    }
}
