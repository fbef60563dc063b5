// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document session: everything that belongs to one loaded document and must
// not survive loading the next one.

use std::path::Path;

use stampwerk_core::error::Result;
use stampwerk_core::types::{PageSize, PlacementMode, StampKind, StampSlot};
use stampwerk_document::{ConversionChain, PdfSource, PreparedDocument};
use stampwerk_layout::DragController;
use tracing::{info, instrument};

/// One loaded document with its placement state.
///
/// Dropping the session removes any converted temporary files.
#[derive(Debug)]
pub struct DocumentSession {
    prepared: PreparedDocument,
    source: PdfSource,
    page_index: usize,
    /// One slot per stamp kind, in hit-test order.
    slots: Vec<StampSlot>,
    drag: DragController,
    /// Preview surface size of the most recent render.
    surface: Option<(f64, f64)>,
}

impl DocumentSession {
    /// Prepare and open `path`, converting it to PDF first if needed.
    #[instrument(skip(path, chain), fields(path = %path.display()))]
    pub fn load(path: &Path, chain: &ConversionChain) -> Result<Self> {
        let prepared = chain.prepare(path)?;
        let source = PdfSource::open(prepared.pdf())?;
        info!(
            pages = source.page_count(),
            converted = prepared.was_converted(),
            "Document session started"
        );
        Ok(Self {
            prepared,
            source,
            page_index: 0,
            slots: vec![
                StampSlot::new(StampKind::Registration),
                StampSlot::new(StampKind::Resolution),
            ],
            drag: DragController::new(),
            surface: None,
        })
    }

    pub fn source(&self) -> &PdfSource {
        &self.source
    }

    /// The file the user opened (before any conversion).
    pub fn original_path(&self) -> &Path {
        self.prepared.source()
    }

    pub fn pdf_path(&self) -> &Path {
        self.prepared.pdf()
    }

    pub fn page_count(&self) -> usize {
        self.source.page_count()
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    /// Select a page; fails if it does not exist.
    pub fn set_page(&mut self, index: usize) -> Result<()> {
        self.source.page_size(index)?;
        self.page_index = index;
        Ok(())
    }

    pub fn page_size(&self) -> Result<PageSize> {
        self.source.page_size(self.page_index)
    }

    pub fn slots(&self) -> &[StampSlot] {
        &self.slots
    }

    pub fn slot(&self, kind: StampKind) -> Option<&StampSlot> {
        self.slots.iter().find(|s| s.kind == kind)
    }

    pub(crate) fn slots_mut(&mut self) -> &mut [StampSlot] {
        &mut self.slots
    }

    /// Apply a placement mode to every slot.
    ///
    /// Switching into free mode drops positions left over from an earlier
    /// free session so the next render seeds them from the anchored rects.
    pub(crate) fn set_mode(&mut self, mode: PlacementMode) {
        for slot in &mut self.slots {
            if slot.mode == PlacementMode::Anchored && mode == PlacementMode::Free {
                slot.free_position = None;
            }
            slot.mode = mode;
        }
        if mode == PlacementMode::Anchored {
            self.drag.reset();
        }
    }

    pub(crate) fn drag_parts(&mut self) -> (&mut DragController, &mut [StampSlot]) {
        (&mut self.drag, &mut self.slots)
    }

    pub fn surface(&self) -> Option<(f64, f64)> {
        self.surface
    }

    pub(crate) fn set_surface(&mut self, surface: (f64, f64)) {
        self.surface = Some(surface);
    }
}
