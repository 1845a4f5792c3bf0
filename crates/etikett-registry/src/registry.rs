// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document registry — SQLite-backed store of ingested documents and their
// identifier-to-page mappings, with in-memory indexes rebuilt at open.
//
// Schema:
//   documents(
//     id               TEXT PRIMARY KEY,   -- UUID
//     name             TEXT    NOT NULL,
//     content_hash     TEXT    NOT NULL UNIQUE,
//     page_count       INTEGER NOT NULL,
//     identifier_count INTEGER NOT NULL,
//     uploaded_at      TEXT    NOT NULL    -- RFC 3339
//   )
//   mappings(
//     key         TEXT PRIMARY KEY,        -- normalized identifier
//     document_id TEXT    NOT NULL,
//     page_number INTEGER NOT NULL,        -- 1-based
//     serial_type TEXT    NOT NULL,
//     confidence  REAL    NOT NULL
//   )
//   print_log(
//     id            TEXT PRIMARY KEY,      -- UUID
//     document_id   TEXT    NOT NULL,
//     document_name TEXT    NOT NULL,
//     page_number   INTEGER NOT NULL,
//     printer_name  TEXT,
//     status        TEXT    NOT NULL,      -- "success" | "failed"
//     message       TEXT    NOT NULL,
//     timestamp     TEXT    NOT NULL       -- RFC 3339
//   )

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use etikett_core::error::{EtikettError, Result};
use etikett_core::{Document, DocumentId, IdentifierMapping, IngestOutcome, SerialType};
use etikett_document::{PdfReader, extract_serials};

use crate::hash::hash_bytes;

// ---------------------------------------------------------------------------
// Local error helpers
// ---------------------------------------------------------------------------

/// Convert a `rusqlite::Error` into an `EtikettError::Database`.
pub(crate) fn db_err(e: rusqlite::Error) -> EtikettError {
    EtikettError::Database(e.to_string())
}

pub(crate) fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// SQLite-backed document registry.
///
/// All reads go through in-memory indexes rebuilt at open; SQLite is the
/// durable copy, written inside a transaction per ingest/delete. Writes take
/// `&mut self` so callers behind a lock never observe a half-ingested
/// document.
pub struct DocumentRegistry {
    pub(crate) conn: Connection,
    documents: HashMap<DocumentId, Document>,
    by_hash: HashMap<String, DocumentId>,
    /// Keyed by normalized identifier; BTreeMap so resolver iteration is
    /// deterministic.
    mappings: BTreeMap<String, IdentifierMapping>,
}

impl DocumentRegistry {
    /// Open (or create) the registry database at `path`.
    ///
    /// Tables are created if missing and the in-memory indexes are rebuilt
    /// from the stored rows. WAL mode is enabled for better concurrent-read
    /// performance.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(db_err)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(db_err)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory registry (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS documents (
                id               TEXT PRIMARY KEY,
                name             TEXT    NOT NULL,
                content_hash     TEXT    NOT NULL UNIQUE,
                page_count       INTEGER NOT NULL,
                identifier_count INTEGER NOT NULL,
                uploaded_at      TEXT    NOT NULL
            );
            CREATE TABLE IF NOT EXISTS mappings (
                key         TEXT PRIMARY KEY,
                document_id TEXT    NOT NULL,
                page_number INTEGER NOT NULL,
                serial_type TEXT    NOT NULL,
                confidence  REAL    NOT NULL
            );
            CREATE TABLE IF NOT EXISTS print_log (
                id            TEXT PRIMARY KEY,
                document_id   TEXT    NOT NULL,
                document_name TEXT    NOT NULL,
                page_number   INTEGER NOT NULL,
                printer_name  TEXT,
                status        TEXT    NOT NULL,
                message       TEXT    NOT NULL,
                timestamp     TEXT    NOT NULL
            );",
        )
        .map_err(db_err)?;

        let mut registry = Self {
            conn,
            documents: HashMap::new(),
            by_hash: HashMap::new(),
            mappings: BTreeMap::new(),
        };
        registry.load_state()?;
        debug!(
            documents = registry.documents.len(),
            mappings = registry.mappings.len(),
            "registry opened"
        );
        Ok(registry)
    }

    /// Rebuild the in-memory indexes from the database.
    fn load_state(&mut self) -> Result<()> {
        {
            let mut stmt = self
                .conn
                .prepare(
                    "SELECT id, name, content_hash, page_count, identifier_count, uploaded_at
                     FROM documents",
                )
                .map_err(db_err)?;
            let rows = stmt
                .query_map([], |row| {
                    let id: String = row.get(0)?;
                    let uploaded_at: String = row.get(5)?;
                    Ok((
                        id,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, u32>(3)?,
                        row.get::<_, u32>(4)?,
                        uploaded_at,
                    ))
                })
                .map_err(db_err)?;

            for row in rows {
                let (id, name, content_hash, page_count, identifier_count, uploaded_at) =
                    row.map_err(db_err)?;
                let Ok(uuid) = Uuid::parse_str(&id) else {
                    warn!(%id, "skipping document row with malformed id");
                    continue;
                };
                let document = Document {
                    id: DocumentId(uuid),
                    name,
                    content_hash: content_hash.clone(),
                    page_count,
                    identifier_count,
                    uploaded_at: parse_timestamp(&uploaded_at),
                };
                self.by_hash.insert(content_hash, document.id);
                self.documents.insert(document.id, document);
            }
        }

        let mut stmt = self
            .conn
            .prepare("SELECT key, document_id, page_number, serial_type, confidence FROM mappings")
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, u32>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, f32>(4)?,
                ))
            })
            .map_err(db_err)?;

        for row in rows {
            let (key, document_id, page_number, serial_type, confidence) = row.map_err(db_err)?;
            let Ok(uuid) = Uuid::parse_str(&document_id) else {
                warn!(%key, "skipping mapping row with malformed document id");
                continue;
            };
            let document_id = DocumentId(uuid);
            // Orphaned mappings (document deleted out-of-band) are dropped.
            let Some(document) = self.documents.get(&document_id) else {
                warn!(%key, %document_id, "skipping mapping for unknown document");
                continue;
            };
            let Some(serial_type) = SerialType::parse(&serial_type) else {
                warn!(%key, serial_type, "skipping mapping with unknown serial type");
                continue;
            };
            self.mappings.insert(
                key.clone(),
                IdentifierMapping {
                    key,
                    document_id,
                    page_number,
                    serial_type,
                    confidence,
                    document_name: document.name.clone(),
                },
            );
        }
        Ok(())
    }

    // -- Ingestion ----------------------------------------------------------

    /// Ingest a PDF: hash, dedupe, extract serial numbers per page, and store
    /// the document with its identifier mappings in one transaction.
    ///
    /// Byte-identical re-uploads short-circuit with `is_duplicate = true` and
    /// never re-run extraction. Within one pass the first hit for a key wins;
    /// across documents a newer document takes over an older document's key.
    #[instrument(skip(self, bytes), fields(name = %display_name, size = bytes.len()))]
    pub fn ingest(&mut self, bytes: &[u8], display_name: &str) -> Result<IngestOutcome> {
        let content_hash = hash_bytes(bytes);
        if let Some(existing_id) = self.by_hash.get(&content_hash) {
            let existing = &self.documents[existing_id];
            info!(document_id = %existing.id, "duplicate upload, extraction skipped");
            return Ok(IngestOutcome {
                document_id: existing.id,
                page_count: existing.page_count,
                identifier_count: existing.identifier_count,
                is_duplicate: true,
            });
        }

        let reader = PdfReader::from_bytes(bytes)?;
        let page_count = reader.page_count();
        let document_id = DocumentId::new();

        // First hit per key wins; the pattern table's priority order already
        // decided the serial type.
        let mut extracted: BTreeMap<String, IdentifierMapping> = BTreeMap::new();
        for page_number in 1..=page_count {
            let text = match reader.page_text(page_number) {
                Ok(text) => text,
                Err(err) => {
                    warn!(page_number, %err, "page text extraction failed, page skipped");
                    continue;
                }
            };
            for hit in extract_serials(&text) {
                extracted.entry(hit.text.clone()).or_insert(IdentifierMapping {
                    key: hit.text,
                    document_id,
                    page_number,
                    serial_type: hit.serial_type,
                    confidence: hit.confidence,
                    document_name: display_name.to_string(),
                });
            }
        }

        for key in extracted.keys() {
            if let Some(previous) = self.mappings.get(key) {
                warn!(
                    %key,
                    previous_document = %previous.document_name,
                    new_document = display_name,
                    "identifier reassigned to newer document"
                );
            }
        }

        let identifier_count = extracted.len() as u32;
        let document = Document {
            id: document_id,
            name: display_name.to_string(),
            content_hash: content_hash.clone(),
            page_count,
            identifier_count,
            uploaded_at: Utc::now(),
        };

        let tx = self.conn.transaction().map_err(db_err)?;
        tx.execute(
            "INSERT INTO documents (id, name, content_hash, page_count, identifier_count, uploaded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                document.id.to_string(),
                document.name,
                document.content_hash,
                document.page_count,
                document.identifier_count,
                document.uploaded_at.to_rfc3339(),
            ],
        )
        .map_err(db_err)?;
        for mapping in extracted.values() {
            tx.execute(
                "INSERT OR REPLACE INTO mappings (key, document_id, page_number, serial_type, confidence)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    mapping.key,
                    mapping.document_id.to_string(),
                    mapping.page_number,
                    mapping.serial_type.as_str(),
                    mapping.confidence,
                ],
            )
            .map_err(db_err)?;
        }
        tx.commit().map_err(db_err)?;

        // Publish to the in-memory indexes only after the commit.
        self.by_hash.insert(content_hash, document_id);
        self.documents.insert(document_id, document);
        for (key, mapping) in extracted {
            self.mappings.insert(key, mapping);
        }

        info!(%document_id, page_count, identifier_count, "document ingested");
        Ok(IngestOutcome {
            document_id,
            page_count,
            identifier_count,
            is_duplicate: false,
        })
    }

    /// Delete a document and its mappings. Print records are history and stay.
    #[instrument(skip(self), fields(%document_id))]
    pub fn delete(&mut self, document_id: DocumentId) -> Result<()> {
        let document = self
            .documents
            .remove(&document_id)
            .ok_or_else(|| EtikettError::NotFound(format!("document {document_id}")))?;

        let tx = self.conn.transaction().map_err(db_err)?;
        tx.execute(
            "DELETE FROM documents WHERE id = ?1",
            params![document_id.to_string()],
        )
        .map_err(db_err)?;
        tx.execute(
            "DELETE FROM mappings WHERE document_id = ?1",
            params![document_id.to_string()],
        )
        .map_err(db_err)?;
        tx.commit().map_err(db_err)?;

        self.by_hash.remove(&document.content_hash);
        self.mappings
            .retain(|_, mapping| mapping.document_id != document_id);

        info!(name = %document.name, "document deleted");
        Ok(())
    }

    // -- Queries ------------------------------------------------------------

    /// All documents, newest first.
    pub fn documents(&self) -> Vec<Document> {
        let mut documents: Vec<Document> = self.documents.values().cloned().collect();
        documents.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        documents
    }

    /// Look up a single document.
    pub fn document(&self, document_id: DocumentId) -> Result<&Document> {
        self.documents
            .get(&document_id)
            .ok_or_else(|| EtikettError::NotFound(format!("document {document_id}")))
    }

    /// Identifier mappings owned by `document_id`, sorted by page then key.
    pub fn mappings_for(&self, document_id: DocumentId) -> Vec<IdentifierMapping> {
        let mut mappings: Vec<IdentifierMapping> = self
            .mappings
            .values()
            .filter(|m| m.document_id == document_id)
            .cloned()
            .collect();
        mappings.sort_by(|a, b| a.page_number.cmp(&b.page_number).then(a.key.cmp(&b.key)));
        mappings
    }

    /// The full identifier index, keyed by normalized identifier.
    pub fn mappings(&self) -> &BTreeMap<String, IdentifierMapping> {
        &self.mappings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use etikett_document::test_pdf::{pdf_with_pages, single_page_pdf};

    fn registry() -> DocumentRegistry {
        DocumentRegistry::open_in_memory().expect("open in-memory registry")
    }

    #[test]
    fn ingest_extracts_labelled_serial() {
        let mut reg = registry();
        let pdf = single_page_pdf("Device label  S/N: AB1234567890  end");
        let outcome = reg.ingest(&pdf, "labels.pdf").unwrap();

        assert!(!outcome.is_duplicate);
        assert_eq!(outcome.page_count, 1);
        assert!(outcome.identifier_count >= 1);

        let mapping = reg.mappings().get("AB1234567890").expect("mapping stored");
        assert_eq!(mapping.page_number, 1);
        assert_eq!(mapping.serial_type, SerialType::GenericSn);
        assert_eq!(mapping.document_name, "labels.pdf");
    }

    #[test]
    fn duplicate_upload_short_circuits() {
        let mut reg = registry();
        let pdf = single_page_pdf("S/N: AB1234567890");

        let first = reg.ingest(&pdf, "one.pdf").unwrap();
        let second = reg.ingest(&pdf, "two.pdf").unwrap();

        assert!(!first.is_duplicate);
        assert!(second.is_duplicate);
        assert_eq!(first.document_id, second.document_id);
        assert_eq!(reg.documents().len(), 1);
        // The original display name is kept.
        assert_eq!(reg.documents()[0].name, "one.pdf");
    }

    #[test]
    fn mappings_point_at_their_page() {
        let mut reg = registry();
        let pdf = pdf_with_pages(&["S/N: AB1234567890", "S/N: CD9876543210"]);
        let outcome = reg.ingest(&pdf, "multi.pdf").unwrap();

        assert_eq!(outcome.page_count, 2);
        assert_eq!(reg.mappings().get("AB1234567890").unwrap().page_number, 1);
        assert_eq!(reg.mappings().get("CD9876543210").unwrap().page_number, 2);

        let per_doc = reg.mappings_for(outcome.document_id);
        assert!(per_doc.windows(2).all(|w| w[0].page_number <= w[1].page_number));
    }

    #[test]
    fn newer_document_takes_over_a_shared_key() {
        let mut reg = registry();
        let older = single_page_pdf("S/N: AB1234567890 older");
        let newer = single_page_pdf("S/N: AB1234567890 newer");

        reg.ingest(&older, "older.pdf").unwrap();
        let outcome = reg.ingest(&newer, "newer.pdf").unwrap();

        let mapping = reg.mappings().get("AB1234567890").unwrap();
        assert_eq!(mapping.document_id, outcome.document_id);
        assert_eq!(mapping.document_name, "newer.pdf");
    }

    #[test]
    fn delete_removes_document_and_mappings() {
        let mut reg = registry();
        let pdf = single_page_pdf("S/N: AB1234567890");
        let outcome = reg.ingest(&pdf, "gone.pdf").unwrap();

        reg.delete(outcome.document_id).unwrap();

        assert!(reg.documents().is_empty());
        assert!(reg.mappings().is_empty());
        assert!(matches!(
            reg.document(outcome.document_id),
            Err(EtikettError::NotFound(_))
        ));
        // The hash index entry is gone too, so the same bytes re-ingest fresh.
        let again = reg.ingest(&pdf, "back.pdf").unwrap();
        assert!(!again.is_duplicate);
    }

    #[test]
    fn delete_unknown_document_is_not_found() {
        let mut reg = registry();
        assert!(matches!(
            reg.delete(DocumentId::new()),
            Err(EtikettError::NotFound(_))
        ));
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("etikett.db");
        let pdf = single_page_pdf("S/N: AB1234567890");

        let outcome = {
            let mut reg = DocumentRegistry::open(&db).unwrap();
            reg.ingest(&pdf, "persist.pdf").unwrap()
        };

        let reg = DocumentRegistry::open(&db).unwrap();
        assert_eq!(reg.documents().len(), 1);
        let mapping = reg.mappings().get("AB1234567890").expect("mapping reloaded");
        assert_eq!(mapping.document_id, outcome.document_id);
        assert_eq!(mapping.serial_type, SerialType::GenericSn);
        assert_eq!(mapping.document_name, "persist.pdf");
    }
}
