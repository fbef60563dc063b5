// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stamp editor: the front end's single owner of settings, field values, and
// the current document session.
//
// Every edit runs one synchronous render pass before returning, so the slot
// rectangles used for hit-testing always come from the latest composite.

use std::path::{Path, PathBuf};

use image::RgbaImage;
use stampwerk_core::error::{Result, StampError};
use stampwerk_core::human_errors::{HumanError, humanize_error};
use stampwerk_core::types::{Rect, StampKind, StampSlot};
use stampwerk_core::{StampConfig, StampForm};
use stampwerk_document::{
    ConversionChain, ExportSettings, ExportStamp, PageRasterizer, PdfStamper,
};
use stampwerk_layout::{DragOutcome, PlacementParams, resolve_slots};
use stampwerk_render::{
    ImageProcessor, PreviewLayer, StampBuilder, composite_preview, error_card,
};
use tracing::{debug, info, instrument, warn};

use crate::session::DocumentSession;

/// Result of a page render pass.
#[derive(Debug, Clone)]
pub struct PagePreview {
    pub image: RgbaImage,
    /// Stamps that could not be built, shown to the user inline.
    pub errors: Vec<HumanError>,
}

pub struct StampEditor {
    config: StampConfig,
    form: StampForm,
    builder: StampBuilder,
    rasterizer: Box<dyn PageRasterizer>,
    converters: ConversionChain,
    session: Option<DocumentSession>,
    preview: Option<PagePreview>,
}

impl StampEditor {
    pub fn new(
        config: StampConfig,
        builder: StampBuilder,
        rasterizer: Box<dyn PageRasterizer>,
        converters: ConversionChain,
    ) -> Self {
        Self {
            config: config.normalized(),
            form: StampForm::default(),
            builder,
            rasterizer,
            converters,
            session: None,
            preview: None,
        }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn config(&self) -> &StampConfig {
        &self.config
    }

    pub fn session(&self) -> Option<&DocumentSession> {
        self.session.as_ref()
    }

    /// Output of the most recent page render.
    pub fn page_preview(&self) -> Option<&PagePreview> {
        self.preview.as_ref()
    }

    // -- Edits ----------------------------------------------------------------

    /// Change settings, then re-render.
    pub fn edit_config(&mut self, edit: impl FnOnce(&mut StampConfig)) -> Result<()> {
        edit(&mut self.config);
        self.config = std::mem::take(&mut self.config).normalized();
        if let Some(session) = self.session.as_mut() {
            session.set_mode(self.config.placement_mode());
        }
        self.rerender()
    }

    /// Change field values, then re-render.
    pub fn edit_form(&mut self, edit: impl FnOnce(&mut StampForm)) -> Result<()> {
        edit(&mut self.form);
        self.rerender()
    }

    /// Open a document, replacing (and cleaning up) any current session.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub fn load_document(&mut self, path: &Path) -> Result<()> {
        self.close_document();
        let mut session = DocumentSession::load(path, &self.converters)?;
        session.set_mode(self.config.placement_mode());
        self.session = Some(session);
        self.rerender()
    }

    /// Drop the current session and its temporary files.
    pub fn close_document(&mut self) {
        if self.session.take().is_some() {
            info!("Document session closed");
        }
        self.preview = None;
    }

    pub fn set_page(&mut self, index: usize) -> Result<()> {
        self.session_mut()?.set_page(index)?;
        self.rerender()
    }

    // -- Rendering --------------------------------------------------------------

    /// The first active stamp with the current fields and rotation.
    pub fn current_stamp(&self) -> Result<ImageProcessor> {
        let kind = self.config.active_kinds()[0];
        self.builder.build(kind, &self.form, self.config.rotation)
    }

    /// The stamp-only preview: the current stamp, or an error card.
    pub fn stamp_preview(&self) -> RgbaImage {
        match self.current_stamp() {
            Ok(stamp) => stamp.into_rgba(),
            Err(err) => {
                warn!(%err, "Stamp preview failed");
                error_card(&humanize_error(&err).message, self.builder.fonts())
            }
        }
    }

    fn rerender(&mut self) -> Result<()> {
        if self.session.is_some() {
            self.render_page()?;
        }
        Ok(())
    }

    /// Composite the active stamps onto the current page and refresh every
    /// slot's last rendered rectangle.
    #[instrument(skip(self))]
    pub fn render_page(&mut self) -> Result<&PagePreview> {
        let zoom = self.config.zoom();
        let active = self.config.active_kinds();
        let session = self.session.as_mut().ok_or(StampError::NoDocument)?;
        let page = session.page_size()?;
        let (raster_w, raster_h) = page.preview_pixels(zoom);
        let base = self.rasterizer.render_page(
            session.pdf_path(),
            session.page_index(),
            raster_w,
            raster_h,
        )?;

        let mut errors = Vec::new();
        let mut built: Vec<(StampKind, RgbaImage)> = Vec::new();
        for kind in &active {
            match self.builder.build(*kind, &self.form, self.config.rotation) {
                Ok(stamp) => built.push((*kind, stamp.into_rgba())),
                Err(err) => {
                    warn!(%kind, %err, "Stamp skipped on page preview");
                    errors.push(humanize_error(&err));
                }
            }
        }

        let params = PlacementParams::from_config(&self.config, page, zoom);
        let rects = place(params, session.slots_mut(), &built);
        session.set_surface(params.surface_size());

        let layers: Vec<PreviewLayer> = built
            .into_iter()
            .zip(rects)
            .map(|((_, image), rect)| PreviewLayer { image, rect })
            .collect();
        let image = composite_preview(&base, &layers);
        debug!(width = image.width(), height = image.height(), "Page preview ready");

        Ok(self.preview.insert(PagePreview { image, errors }))
    }

    // -- Pointer ----------------------------------------------------------------

    /// Pointer pressed on the page preview at surface coordinates.
    pub fn pointer_down(&mut self, x: f64, y: f64) -> DragOutcome {
        let enabled = self.config.free_position;
        let Some(session) = self.session.as_mut() else {
            return DragOutcome::Ignored;
        };
        let (drag, slots) = session.drag_parts();
        drag.pointer_down(slots, enabled, x, y)
    }

    /// Pointer moved; a moved slot triggers a re-render.
    pub fn pointer_move(&mut self, x: f64, y: f64) -> Result<DragOutcome> {
        let Some(session) = self.session.as_mut() else {
            return Ok(DragOutcome::Ignored);
        };
        let Some((surface_w, surface_h)) = session.surface() else {
            return Ok(DragOutcome::Ignored);
        };
        let (drag, slots) = session.drag_parts();
        let outcome = drag.pointer_move(slots, surface_w, surface_h, x, y);
        if matches!(outcome, DragOutcome::Moved { .. }) {
            self.render_page()?;
        }
        Ok(outcome)
    }

    pub fn pointer_up(&mut self) -> DragOutcome {
        match self.session.as_mut() {
            Some(session) => session.drag_parts().0.pointer_up(),
            None => DragOutcome::Ignored,
        }
    }

    // -- Export -----------------------------------------------------------------

    /// Default export location for the current document.
    pub fn suggested_output(&self) -> Option<PathBuf> {
        let session = self.session.as_ref()?;
        Some(suggested_output(
            session.original_path(),
            &self.form.registration.document_number,
        ))
    }

    /// Write the stamped document to `target`.
    #[instrument(skip(self, target), fields(target = %target.display()))]
    pub fn export(&self, target: &Path) -> Result<()> {
        let session = self.session.as_ref().ok_or(StampError::NoDocument)?;
        let mut stamps = Vec::new();
        for kind in self.config.active_kinds() {
            let png = self
                .builder
                .build(kind, &self.form, self.config.rotation)?
                .to_png_bytes()?;
            let slot = session
                .slot(kind)
                .cloned()
                .unwrap_or_else(|| StampSlot::new(kind));
            stamps.push(ExportStamp::for_slot(&slot, png));
        }
        PdfStamper::new(ExportSettings::from_config(&self.config)).export(
            session.source(),
            &stamps,
            target,
        )
    }

    fn session_mut(&mut self) -> Result<&mut DocumentSession> {
        self.session.as_mut().ok_or(StampError::NoDocument)
    }
}

/// Resolve rectangles for the slots of the built stamps, in slot order, and
/// store them as each slot's last rendered rectangle. Slots without a built
/// stamp are cleared so they cannot be hit.
fn place(params: PlacementParams, slots: &mut [StampSlot], built: &[(StampKind, RgbaImage)]) -> Vec<Rect> {
    let mut active: Vec<StampSlot> = built
        .iter()
        .map(|(kind, _)| {
            slots
                .iter()
                .find(|s| s.kind == *kind)
                .cloned()
                .unwrap_or_else(|| StampSlot::new(*kind))
        })
        .collect();
    let aspects: Vec<f64> = built
        .iter()
        .map(|(_, image)| stampwerk_render::image::processor::aspect_ratio(image))
        .collect();
    let rects = resolve_slots(&params, &mut active, &aspects);

    for slot in slots.iter_mut() {
        slot.last_rendered_rect = None;
    }
    for (resolved, rect) in active.into_iter().zip(&rects) {
        if let Some(slot) = slots.iter_mut().find(|s| s.kind == resolved.kind) {
            slot.free_position = resolved.free_position;
            slot.last_rendered_rect = Some(*rect);
        }
    }
    rects
}

/// `<document number>.pdf` when one is entered, otherwise
/// `<source stem>_stamped.pdf`, beside the source.
pub fn suggested_output(source: &Path, document_number: &str) -> PathBuf {
    let dir = source.parent().unwrap_or_else(|| Path::new(""));
    let number = document_number.trim();
    let stem = if number.is_empty() {
        let original = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".into());
        format!("{original}_stamped")
    } else {
        number
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect()
    };
    dir.join(format!("{stem}.pdf"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use lopdf::content::Content;
    use lopdf::{Document, Object, Stream, dictionary};
    use stampwerk_core::types::{PlacementMode, Rotation};
    use stampwerk_document::BlankPageRasterizer;
    use stampwerk_render::FontBook;

    fn write_pdf(path: &Path, pages: usize) {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let kids: Vec<Object> = (0..pages)
            .map(|_| {
                let content = doc.add_object(Stream::new(dictionary! {}, b"0 g".to_vec()));
                Object::Reference(doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "Contents" => content,
                    "MediaBox" => vec![0.into(), 0.into(), 600.into(), 800.into()],
                }))
            })
            .collect();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages as i64,
            }),
        );
        let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog);
        doc.save(path).unwrap();
    }

    struct Fixture {
        dir: tempfile::TempDir,
        editor: StampEditor,
    }

    fn fixture(config: StampConfig) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("stamp.png");
        RgbaImage::from_pixel(300, 200, Rgba([255, 255, 255, 255]))
            .save(&template)
            .unwrap();
        write_pdf(&dir.path().join("in.pdf"), 2);
        let editor = StampEditor::new(
            config,
            StampBuilder::new(&template, FontBook::empty()),
            Box::new(BlankPageRasterizer),
            ConversionChain::default(),
        );
        Fixture { dir, editor }
    }

    fn free_config() -> StampConfig {
        StampConfig {
            free_position: true,
            zoom_percent: 100,
            ..Default::default()
        }
    }

    fn rect_of(editor: &StampEditor, kind: StampKind) -> Rect {
        editor
            .session()
            .unwrap()
            .slot(kind)
            .unwrap()
            .last_rendered_rect
            .unwrap()
    }

    /// Operands of the single `cm` operator on the first exported page.
    fn export_placement(path: &Path) -> Vec<f64> {
        let doc = Document::load(path).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
        let mut placements: Vec<Vec<f64>> = content
            .operations
            .iter()
            .filter(|op| op.operator == "cm")
            .map(|op| {
                op.operands
                    .iter()
                    .map(|o| o.as_float().map(f64::from).unwrap())
                    .collect()
            })
            .collect();
        assert_eq!(placements.len(), 1);
        placements.remove(0)
    }

    #[test]
    fn loading_renders_and_records_rects() {
        let mut f = fixture(StampConfig::default());
        f.editor.load_document(&f.dir.path().join("in.pdf")).unwrap();

        let preview = f.editor.page_preview().unwrap();
        assert_eq!(preview.image.dimensions(), (720, 960));
        assert!(preview.errors.is_empty());
        let rect = rect_of(&f.editor, StampKind::Registration);
        assert!((rect.width - 600.0 * 1.2 * 0.45).abs() < 1e-9);
        assert!(
            f.editor
                .session()
                .unwrap()
                .slot(StampKind::Resolution)
                .unwrap()
                .last_rendered_rect
                .is_none()
        );
    }

    #[test]
    fn stale_rect_is_never_used_for_hit_testing() {
        let mut f = fixture(free_config());
        f.editor.load_document(&f.dir.path().join("in.pdf")).unwrap();
        let old = rect_of(&f.editor, StampKind::Registration);

        // Shrinking the stamp moves its bottom-right corner inward.
        f.editor.edit_config(|c| c.width_ratio = 0.2).unwrap();
        let new = rect_of(&f.editor, StampKind::Registration);
        assert!(new.width < old.width);

        // A press inside the old rectangle but outside the new one misses.
        let (px, py) = (old.right() - 1.0, old.bottom() - 1.0);
        assert!(old.contains(px, py) && !new.contains(px, py));
        assert_eq!(f.editor.pointer_down(px, py), DragOutcome::Ignored);

        // A press inside the new rectangle grabs.
        assert_eq!(
            f.editor.pointer_down(new.x + 1.0, new.y + 1.0),
            DragOutcome::Grabbed { slot: 0 }
        );
    }

    #[test]
    fn drag_moves_the_slot_and_export_uses_the_same_fractions() {
        let mut f = fixture(free_config());
        f.editor.load_document(&f.dir.path().join("in.pdf")).unwrap();
        let start = rect_of(&f.editor, StampKind::Registration);

        f.editor.pointer_down(start.x + 5.0, start.y + 5.0);
        let outcome = f.editor.pointer_move(65.0, 125.0).unwrap();
        let DragOutcome::Moved { slot: 0, position } = outcome else {
            panic!("expected a move, got {outcome:?}");
        };
        assert!((position.x_pct - 0.1).abs() < 1e-9);
        assert!((position.y_pct - 0.15).abs() < 1e-9);
        assert_eq!(f.editor.pointer_up(), DragOutcome::Released);
        let moved = rect_of(&f.editor, StampKind::Registration);
        assert!((moved.x - 60.0).abs() < 1e-9 && (moved.y - 120.0).abs() < 1e-9);

        // Zoom changes keep the fraction.
        f.editor.edit_config(|c| c.zoom_percent = 200).unwrap();
        let zoomed = rect_of(&f.editor, StampKind::Registration);
        assert!((zoomed.x - 120.0).abs() < 1e-9);

        let out = f.dir.path().join("out.pdf");
        f.editor.export(&out).unwrap();
        let [width, _, _, height, x, y] = export_placement(&out)[..] else {
            panic!("expected one cm operator with six operands");
        };
        assert!(width > 0.0 && height > 0.0);
        assert!((x / 600.0 - 0.1).abs() < 1e-3);
        // PDF space grows upward; the stored fraction is measured from the top.
        assert!(((800.0 - y - height) / 800.0 - 0.15).abs() < 1e-3);
    }

    #[test]
    fn reenabling_free_mode_starts_from_the_current_anchor() {
        let mut f = fixture(free_config());
        f.editor.load_document(&f.dir.path().join("in.pdf")).unwrap();
        let start = rect_of(&f.editor, StampKind::Registration);
        f.editor.pointer_down(start.x + 1.0, start.y + 1.0);
        f.editor.pointer_move(11.0, 11.0).unwrap();
        f.editor.pointer_up();
        assert!((rect_of(&f.editor, StampKind::Registration).x - 10.0).abs() < 1e-9);

        f.editor.edit_config(|c| c.free_position = false).unwrap();
        f.editor.edit_config(|c| c.right_margin_mm = 30.0).unwrap();
        let anchored = rect_of(&f.editor, StampKind::Registration);
        assert!(anchored.x < start.x);

        f.editor.edit_config(|c| c.free_position = true).unwrap();
        let reseeded = rect_of(&f.editor, StampKind::Registration);
        assert!((reseeded.x - anchored.x).abs() < 1e-6);
        assert!((reseeded.y - anchored.y).abs() < 1e-6);
    }

    #[test]
    fn anchored_mode_ignores_presses() {
        let mut f = fixture(StampConfig::default());
        f.editor.load_document(&f.dir.path().join("in.pdf")).unwrap();
        let rect = rect_of(&f.editor, StampKind::Registration);
        assert_eq!(
            f.editor.pointer_down(rect.x + 1.0, rect.y + 1.0),
            DragOutcome::Ignored
        );
    }

    #[test]
    fn new_document_resets_free_positions() {
        let mut f = fixture(free_config());
        let path = f.dir.path().join("in.pdf");
        f.editor.load_document(&path).unwrap();
        let start = rect_of(&f.editor, StampKind::Registration);
        f.editor.pointer_down(start.x + 1.0, start.y + 1.0);
        f.editor.pointer_move(11.0, 11.0).unwrap();
        f.editor.pointer_up();
        assert!((rect_of(&f.editor, StampKind::Registration).x - 10.0).abs() < 1e-9);

        f.editor.load_document(&path).unwrap();
        let fresh = rect_of(&f.editor, StampKind::Registration);
        assert!((fresh.x - start.x).abs() < 1e-9);
        assert_eq!(f.editor.session().unwrap().page_index(), 0);
    }

    #[test]
    fn dual_stamp_places_both_slots() {
        let mut f = fixture(StampConfig {
            dual_stamp: true,
            ..Default::default()
        });
        f.editor.load_document(&f.dir.path().join("in.pdf")).unwrap();
        let reg = rect_of(&f.editor, StampKind::Registration);
        let res = rect_of(&f.editor, StampKind::Resolution);
        assert_eq!(reg.x, res.x);
        assert!(res.bottom() < reg.y);
    }

    #[test]
    fn missing_template_is_inline_on_the_page_and_blocking_on_export() {
        let mut f = fixture(StampConfig::default());
        std::fs::remove_file(f.dir.path().join("stamp.png")).unwrap();
        f.editor.load_document(&f.dir.path().join("in.pdf")).unwrap();
        assert_eq!(f.editor.page_preview().unwrap().errors.len(), 1);
        assert_eq!(f.editor.stamp_preview().dimensions(), (308, 197));

        let out = f.dir.path().join("out.pdf");
        let err = f.editor.export(&out).unwrap_err();
        assert!(matches!(err, StampError::AssetNotFound { .. }));
        assert!(!out.exists());
    }

    #[test]
    fn page_selection_is_checked() {
        let mut f = fixture(StampConfig::default());
        assert!(matches!(f.editor.set_page(0), Err(StampError::NoDocument)));
        f.editor.load_document(&f.dir.path().join("in.pdf")).unwrap();
        f.editor.set_page(1).unwrap();
        assert!(matches!(
            f.editor.set_page(2),
            Err(StampError::PageOutOfRange { index: 2, count: 2 })
        ));
    }

    #[test]
    fn rotation_swaps_stamp_preview_dimensions() {
        let mut f = fixture(StampConfig::default());
        f.editor.edit_config(|c| c.rotation = Rotation::Deg90).unwrap();
        assert_eq!(f.editor.stamp_preview().dimensions(), (200, 300));
        f.editor
            .edit_form(|form| form.registration.document_number = "INV-42".into())
            .unwrap();
        assert_eq!(f.editor.config().placement_mode(), PlacementMode::Anchored);
    }

    #[test]
    fn suggested_names() {
        let src = Path::new("/docs/letter.docx");
        assert_eq!(suggested_output(src, ""), PathBuf::from("/docs/letter_stamped.pdf"));
        assert_eq!(suggested_output(src, " INV-42 "), PathBuf::from("/docs/INV-42.pdf"));
        assert_eq!(suggested_output(src, "12/3"), PathBuf::from("/docs/12_3.pdf"));
    }
}
