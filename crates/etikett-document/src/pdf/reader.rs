// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — open, inspect, extract text from, and crop pages of existing
// PDF documents using the `lopdf` crate.

use std::path::Path;

use lopdf::{Document, Object, ObjectId};
use tracing::{debug, info, instrument, warn};

use etikett_core::error::EtikettError;

use crate::label::geometry::CropRect;

/// US Letter bounds, the fallback when a document carries no /MediaBox.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Reads and manipulates existing PDF files.
///
/// Wraps `lopdf::Document` and provides the operations the label pipeline
/// needs: page counting, per-page text extraction for serial recognition, and
/// cropping a page region into a standalone single-page PDF.
pub struct PdfReader {
    /// The underlying lopdf document.
    document: Document,
    /// Source path, if opened from a file (useful for diagnostics).
    source_path: Option<String>,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EtikettError> {
        let path_ref = path.as_ref();
        info!("Opening PDF: {}", path_ref.display());

        let document = Document::load(path_ref).map_err(|err| {
            EtikettError::Pdf(format!("failed to open {}: {}", path_ref.display(), err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded");

        Ok(Self {
            document,
            source_path: Some(path_ref.display().to_string()),
        })
    }

    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, EtikettError> {
        let document = Document::load_mem(data).map_err(|err| {
            EtikettError::Pdf(format!("failed to load PDF from memory: {}", err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");

        Ok(Self {
            document,
            source_path: None,
        })
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    /// Return the source path if the reader was created via [`PdfReader::open`].
    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }

    /// Extract the text layer of a single page (1-indexed).
    ///
    /// Returns whatever the text layer holds — possibly an empty string for
    /// image-only scans. The caller normalizes before pattern matching.
    #[instrument(skip(self), fields(page_number))]
    pub fn page_text(&self, page_number: u32) -> Result<String, EtikettError> {
        self.page_id(page_number)?;
        let text = self.document.extract_text(&[page_number]).map_err(|err| {
            EtikettError::Pdf(format!("text extraction for page {}: {}", page_number, err))
        })?;
        debug!(page_number, chars = text.len(), "Page text extracted");
        Ok(text)
    }

    /// Width and height of a page (1-indexed) in PDF points.
    pub fn page_size(&self, page_number: u32) -> Result<(f32, f32), EtikettError> {
        let page_id = self.page_id(page_number)?;
        let media_box = self.media_box(page_id);
        Ok((media_box[2] - media_box[0], media_box[3] - media_box[1]))
    }

    // -- Cropping -------------------------------------------------------------

    /// Extract one page (1-indexed) as a standalone single-page PDF whose
    /// visible bounds are `rect`.
    ///
    /// When `scale_percent` differs from 100 the page content is scaled by
    /// `scale_percent / 100` first (a `cm` matrix wrapped in `q`/`Q`), so
    /// `rect` is interpreted in the scaled coordinate space — the same space
    /// [`compute_crop`](crate::label::geometry::compute_crop) works in.
    /// /MediaBox and /CropBox are both set to `rect`.
    #[instrument(skip(self), fields(page_number, scale_percent))]
    pub fn crop_page(
        &self,
        page_number: u32,
        scale_percent: f32,
        rect: &CropRect,
    ) -> Result<Vec<u8>, EtikettError> {
        let page_object_id = self.page_id(page_number)?;

        let mut new_doc = Document::with_version("1.5");
        clone_page_into(&self.document, &mut new_doc, page_object_id)?;

        let new_page_id = *new_doc
            .get_pages()
            .get(&1)
            .ok_or_else(|| EtikettError::Pdf("cloned page missing from page tree".into()))?;

        if (scale_percent - 100.0).abs() > f32::EPSILON {
            let factor = scale_percent / 100.0;
            scale_page_content(&mut new_doc, new_page_id, factor)?;
            debug!(factor, "Page content scaled");
        }

        let bounds = Object::Array(vec![
            rect.lower_left_x.into(),
            rect.lower_left_y.into(),
            rect.upper_right_x.into(),
            rect.upper_right_y.into(),
        ]);
        if let Ok(Object::Dictionary(page_dict)) = new_doc.get_object_mut(new_page_id) {
            page_dict.set("MediaBox", bounds.clone());
            page_dict.set("CropBox", bounds);
        }

        let mut output = Vec::new();
        new_doc.save_to(&mut output).map_err(|err| {
            EtikettError::Pdf(format!("failed to serialise cropped page: {}", err))
        })?;

        debug!(page_number, output_bytes = output.len(), "Page cropped");
        Ok(output)
    }

    // -- Helpers --------------------------------------------------------------

    /// Look up the object id of a 1-indexed page, validating the range.
    fn page_id(&self, page_number: u32) -> Result<ObjectId, EtikettError> {
        let pages = self.document.get_pages();
        if page_number == 0 || page_number as usize > pages.len() {
            return Err(EtikettError::InvalidInput(format!(
                "page {} out of range (document has {} pages)",
                page_number,
                pages.len()
            )));
        }
        pages.get(&page_number).copied().ok_or_else(|| {
            EtikettError::Pdf(format!("page {} not found in page tree", page_number))
        })
    }

    /// Resolve the /MediaBox for a page, walking /Parent inheritance. Falls
    /// back to US Letter when nothing declares one.
    fn media_box(&self, page_id: ObjectId) -> [f32; 4] {
        let mut current = Some(page_id);
        while let Some(id) = current {
            let Ok(Object::Dictionary(dict)) = self.document.get_object(id) else {
                break;
            };
            if let Ok(obj) = dict.get(b"MediaBox")
                && let Some(bounds) = parse_rectangle(&self.document, obj)
            {
                return bounds;
            }
            current = dict
                .get(b"Parent")
                .ok()
                .and_then(|parent| match parent {
                    Object::Reference(parent_id) => Some(*parent_id),
                    _ => None,
                });
        }
        warn!(?page_id, "No /MediaBox found, assuming US Letter");
        DEFAULT_MEDIA_BOX
    }
}

/// Wrap a page's content streams in `q <f> 0 0 <f> 0 0 cm ... Q` so all
/// content is uniformly scaled about the origin.
fn scale_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    factor: f32,
) -> Result<(), EtikettError> {
    let content = doc
        .get_page_content(page_id)
        .map_err(|err| EtikettError::Pdf(format!("read page content: {}", err)))?;

    let mut scaled = format!("q\n{factor} 0 0 {factor} 0 0 cm\n").into_bytes();
    scaled.extend_from_slice(&content);
    scaled.extend_from_slice(b"\nQ");

    doc.change_page_content(page_id, scaled)
        .map_err(|err| EtikettError::Pdf(format!("replace page content: {}", err)))
}

/// Read a 4-element rectangle array, resolving references and accepting both
/// integer and real entries.
fn parse_rectangle(doc: &Document, obj: &Object) -> Option<[f32; 4]> {
    let resolved = match obj {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let arr = resolved.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let mut bounds = [0.0f32; 4];
    for (slot, entry) in bounds.iter_mut().zip(arr.iter()) {
        *slot = match entry {
            Object::Integer(i) => *i as f32,
            Object::Real(r) => *r as f32,
            _ => return None,
        };
    }
    Some(bounds)
}

/// Clone a single page object (and its referenced resources) from `source`
/// into `target`, appending it as the last page.
///
/// Stream data, fonts, and images referenced by the page dictionary are
/// copied as new objects in the target document.
fn clone_page_into(
    source: &Document,
    target: &mut Document,
    page_id: ObjectId,
) -> Result<(), EtikettError> {
    let page_object = source.get_object(page_id).map_err(|err| {
        EtikettError::Pdf(format!("cannot read page object {:?}: {}", page_id, err))
    })?;

    // Deep-clone the page object and all objects it transitively references.
    let cloned_object = deep_clone_object(source, target, page_object)?;
    let cloned_id = target.add_object(cloned_object);

    // Retrieve the document's page tree root (/Pages) and append the new page.
    let pages_id = target
        .catalog()
        .map_err(|err| EtikettError::Pdf(format!("no catalog: {}", err)))
        .and_then(|catalog| {
            catalog
                .get(b"Pages")
                .map_err(|err| EtikettError::Pdf(format!("no /Pages: {}", err)))
                .and_then(|pages_ref| match pages_ref {
                    Object::Reference(id) => Ok(*id),
                    _ => Err(EtikettError::Pdf("/Pages is not a reference".to_string())),
                })
        })?;

    // Add page reference to the /Kids array and bump /Count.
    if let Ok(Object::Dictionary(pages_dict)) = target.get_object_mut(pages_id) {
        if let Ok(Object::Array(kids)) = pages_dict.get_mut(b"Kids") {
            kids.push(Object::Reference(cloned_id));
        }
        if let Ok(count_obj) = pages_dict.get_mut(b"Count")
            && let Object::Integer(count) = count_obj
        {
            *count += 1;
        }
    }

    // Set the cloned page's /Parent to point at the target's /Pages node.
    if let Ok(Object::Dictionary(page_dict)) = target.get_object_mut(cloned_id) {
        page_dict.set("Parent", Object::Reference(pages_id));
    }

    Ok(())
}

/// Deep-clone a single lopdf Object, recursively resolving references (except
/// /Parent which is deliberately skipped to avoid circular cloning).
fn deep_clone_object(
    source: &Document,
    target: &mut Document,
    object: &Object,
) -> Result<Object, EtikettError> {
    match object {
        Object::Dictionary(dict) => {
            let mut new_dict = lopdf::Dictionary::new();
            for (key, value) in dict.iter() {
                // Skip /Parent to avoid circular references; the caller patches it.
                if key == b"Parent" {
                    continue;
                }
                let cloned_value = deep_clone_object(source, target, value)?;
                new_dict.set(key.clone(), cloned_value);
            }
            Ok(Object::Dictionary(new_dict))
        }
        Object::Array(arr) => {
            let mut new_arr = Vec::with_capacity(arr.len());
            for item in arr {
                new_arr.push(deep_clone_object(source, target, item)?);
            }
            Ok(Object::Array(new_arr))
        }
        Object::Reference(ref_id) => {
            // Resolve the reference in the source, clone it, and return a new
            // reference in the target.
            match source.get_object(*ref_id) {
                Ok(referenced) => {
                    let cloned = deep_clone_object(source, target, referenced)?;
                    let new_id = target.add_object(cloned);
                    Ok(Object::Reference(new_id))
                }
                Err(err) => {
                    warn!(?ref_id, %err, "Cannot resolve reference, using Null");
                    Ok(Object::Null)
                }
            }
        }
        Object::Stream(stream) => {
            let mut new_dict = lopdf::Dictionary::new();
            for (key, value) in stream.dict.iter() {
                if key == b"Parent" {
                    continue;
                }
                let cloned_value = deep_clone_object(source, target, value)?;
                new_dict.set(key.clone(), cloned_value);
            }
            Ok(Object::Stream(lopdf::Stream::new(
                new_dict,
                stream.content.clone(),
            )))
        }
        // All other object types (Boolean, Integer, Real, String, Name, Null)
        // are trivially cloneable.
        other => Ok(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pdf::single_page_pdf;

    #[test]
    fn page_count_and_text() {
        let bytes = single_page_pdf("S/N: AB1234567890");
        let reader = PdfReader::from_bytes(&bytes).expect("load PDF");
        assert_eq!(reader.page_count(), 1);

        let text = reader.page_text(1).expect("extract text");
        assert!(text.contains("AB1234567890"), "text was: {text:?}");
    }

    #[test]
    fn page_text_out_of_range() {
        let bytes = single_page_pdf("hello");
        let reader = PdfReader::from_bytes(&bytes).expect("load PDF");
        assert!(matches!(
            reader.page_text(0),
            Err(EtikettError::InvalidInput(_))
        ));
        assert!(matches!(
            reader.page_text(2),
            Err(EtikettError::InvalidInput(_))
        ));
    }

    #[test]
    fn page_size_reads_media_box() {
        let bytes = single_page_pdf("x");
        let reader = PdfReader::from_bytes(&bytes).expect("load PDF");
        let (w, h) = reader.page_size(1).expect("page size");
        assert!((w - 612.0).abs() < 0.01);
        assert!((h - 792.0).abs() < 0.01);
    }

    #[test]
    fn crop_page_sets_bounds() {
        let bytes = single_page_pdf("label content");
        let reader = PdfReader::from_bytes(&bytes).expect("load PDF");

        let rect = CropRect {
            lower_left_x: 0.0,
            lower_left_y: 684.0,
            upper_right_x: 283.68,
            upper_right_y: 792.0,
        };
        let cropped = reader.crop_page(1, 100.0, &rect).expect("crop");

        let cropped_reader = PdfReader::from_bytes(&cropped).expect("reload");
        assert_eq!(cropped_reader.page_count(), 1);
        let (w, h) = cropped_reader.page_size(1).expect("size");
        assert!((w - 283.68).abs() < 0.05, "width was {w}");
        assert!((h - 108.0).abs() < 0.05, "height was {h}");
    }

    #[test]
    fn crop_page_with_scale_keeps_requested_bounds() {
        let bytes = single_page_pdf("scaled");
        let reader = PdfReader::from_bytes(&bytes).expect("load PDF");

        let rect = CropRect {
            lower_left_x: 0.0,
            lower_left_y: 288.0,
            upper_right_x: 283.68,
            upper_right_y: 396.0,
        };
        let cropped = reader.crop_page(1, 50.0, &rect).expect("crop with scale");
        let cropped_reader = PdfReader::from_bytes(&cropped).expect("reload");
        let (w, h) = cropped_reader.page_size(1).expect("size");
        assert!((w - 283.68).abs() < 0.05);
        assert!((h - 108.0).abs() < 0.05);
    }
}
