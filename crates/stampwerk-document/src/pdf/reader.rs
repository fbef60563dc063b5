// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF source: open a document and report its page count and per-page
// physical size using the `lopdf` crate.

use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object, ObjectId};
use stampwerk_core::error::{Result, StampError};
use stampwerk_core::types::PageSize;
use tracing::{debug, info, instrument};

/// Depth limit when walking `/Parent` chains, guarding against cycles.
const MAX_TREE_DEPTH: usize = 32;

/// A page's MediaBox in PDF user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaBox {
    pub llx: f64,
    pub lly: f64,
    pub urx: f64,
    pub ury: f64,
}

impl MediaBox {
    pub fn size(&self) -> PageSize {
        PageSize::new((self.urx - self.llx).abs(), (self.ury - self.lly).abs())
    }

    /// Left and top edges, whichever way round the box was written.
    pub fn left(&self) -> f64 {
        self.llx.min(self.urx)
    }

    pub fn top(&self) -> f64 {
        self.lly.max(self.ury)
    }
}

/// A loaded paged document.
///
/// Wraps `lopdf::Document`; pages are addressed by zero-based index.
pub struct PdfSource {
    document: Document,
    path: Option<PathBuf>,
}

impl PdfSource {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        let document = Document::load(path_ref).map_err(|err| {
            StampError::Pdf(format!("failed to open {}: {}", path_ref.display(), err))
        })?;
        info!(pages = document.get_pages().len(), "PDF loaded");
        Ok(Self {
            document,
            path: Some(path_ref.to_path_buf()),
        })
    }

    /// Load a PDF already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data)
            .map_err(|err| StampError::Pdf(format!("failed to load PDF from memory: {}", err)))?;
        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");
        Ok(Self {
            document,
            path: None,
        })
    }

    // -- Inspection -----------------------------------------------------------

    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Path the document was opened from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Object id of page `index`.
    pub fn page_id(&self, index: usize) -> Result<ObjectId> {
        page_id(&self.document, index)
    }

    /// Effective MediaBox of page `index`, inherited from ancestors if needed.
    pub fn media_box(&self, index: usize) -> Result<MediaBox> {
        let id = self.page_id(index)?;
        media_box(&self.document, id)
    }

    /// Physical size of page `index` in points.
    pub fn page_size(&self, index: usize) -> Result<PageSize> {
        Ok(self.media_box(index)?.size())
    }
}

impl std::fmt::Debug for PdfSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfSource")
            .field("path", &self.path)
            .field("pages", &self.page_count())
            .finish()
    }
}

/// Object id of the zero-based page `index`.
pub(crate) fn page_id(document: &Document, index: usize) -> Result<ObjectId> {
    let pages = document.get_pages();
    let count = pages.len();
    u32::try_from(index + 1)
        .ok()
        .and_then(|number| pages.get(&number).copied())
        .ok_or(StampError::PageOutOfRange { index, count })
}

/// Effective MediaBox of a page, walking `/Parent` links when the page itself
/// does not carry one.
pub(crate) fn media_box(document: &Document, page: ObjectId) -> Result<MediaBox> {
    let mut current = Some(page);
    for _ in 0..MAX_TREE_DEPTH {
        let Some(id) = current else {
            break;
        };
        let dict = dictionary_at(document, id)?;
        if let Some(found) = read_media_box(document, dict) {
            return Ok(found);
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    Err(StampError::Pdf(format!(
        "page {} {} has no MediaBox",
        page.0, page.1
    )))
}

/// Dictionary stored at object `id`.
pub(crate) fn dictionary_at(document: &Document, id: ObjectId) -> Result<&Dictionary> {
    document
        .get_object(id)
        .and_then(Object::as_dict)
        .map_err(|err| StampError::Pdf(format!("object {} {} is not a dictionary: {}", id.0, id.1, err)))
}

/// Follow a reference, or return the object itself.
pub(crate) fn resolve<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => document.get_object(*id).ok(),
        other => Some(other),
    }
}

fn read_media_box(document: &Document, dict: &Dictionary) -> Option<MediaBox> {
    let raw = dict.get(b"MediaBox").ok()?;
    let values = resolve(document, raw)?.as_array().ok()?;
    if values.len() != 4 {
        return None;
    }
    let number = |o: &Object| -> Option<f64> {
        match resolve(document, o)? {
            Object::Integer(i) => Some(*i as f64),
            Object::Real(r) => Some(f64::from(*r)),
            _ => None,
        }
    };
    Some(MediaBox {
        llx: number(&values[0])?,
        lly: number(&values[1])?,
        urx: number(&values[2])?,
        ury: number(&values[3])?,
    })
}
