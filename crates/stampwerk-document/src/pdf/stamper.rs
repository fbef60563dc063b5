// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Export compositor: embed stamp images into PDF pages.
//
// Each stamp PNG becomes one image XObject (RGB plus an alpha soft mask)
// shared by every stamped page. A page's existing content is wrapped in
// `q ... Q` and followed by a stream that paints the stamps, so nothing
// already on the page is rewritten. Rectangles come from the same placement
// resolver the preview uses, at one surface unit per point.

use std::path::Path;

use image::RgbaImage;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use stampwerk_core::StampConfig;
use stampwerk_core::error::{Result, StampError};
use stampwerk_core::types::{FreePosition, PlacementMode, Rect, StampKind, StampSlot};
use stampwerk_layout::{PlacementParams, resolve_slots};
use tracing::{debug, info, instrument};

use super::reader::{self, PdfSource};

/// XObject resource name prefix for embedded stamps.
const XOBJECT_PREFIX: &str = "StwStamp";

/// One stamp to embed, with the placement state of its slot.
#[derive(Debug, Clone)]
pub struct ExportStamp {
    pub kind: StampKind,
    /// PNG-encoded, already rotated stamp image.
    pub png: Vec<u8>,
    pub mode: PlacementMode,
    pub free_position: Option<FreePosition>,
}

impl ExportStamp {
    /// Stamp placed like `slot`.
    pub fn for_slot(slot: &StampSlot, png: Vec<u8>) -> Self {
        Self {
            kind: slot.kind,
            png,
            mode: slot.mode,
            free_position: slot.free_position,
        }
    }
}

/// Placement knobs shared by every stamp of an export.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportSettings {
    pub width_ratio: f64,
    pub right_margin_mm: f64,
    pub bottom_margin_mm: f64,
    pub gap_mm: f64,
    pub first_page_only: bool,
}

impl ExportSettings {
    pub fn from_config(config: &StampConfig) -> Self {
        Self {
            width_ratio: config.width_ratio,
            right_margin_mm: config.right_margin_mm,
            bottom_margin_mm: config.bottom_margin_mm,
            gap_mm: config.stamp_gap_mm,
            first_page_only: config.first_page_only,
        }
    }
}

/// An embedded stamp image.
struct EmbeddedStamp {
    id: ObjectId,
    aspect: f64,
    slot: StampSlot,
}

/// Produces stamped copies of a PDF.
pub struct PdfStamper {
    settings: ExportSettings,
}

impl PdfStamper {
    pub fn new(settings: ExportSettings) -> Self {
        Self { settings }
    }

    /// Stamp a copy of `source` and return it. The source is not modified.
    #[instrument(skip_all, fields(stamps = stamps.len(), first_page_only = self.settings.first_page_only))]
    pub fn stamp(&self, source: &PdfSource, stamps: &[ExportStamp]) -> Result<Document> {
        let mut document = source.document().clone();
        let page_count = source.page_count();
        if page_count == 0 {
            return Err(StampError::Pdf("document has no pages".into()));
        }

        let mut embedded = Vec::with_capacity(stamps.len());
        for stamp in stamps {
            let image = image::load_from_memory(&stamp.png)
                .map_err(|err| StampError::Image(format!("failed to decode stamp PNG: {}", err)))?
                .into_rgba8();
            let aspect = if image.width() == 0 {
                1.0
            } else {
                f64::from(image.height()) / f64::from(image.width())
            };
            embedded.push(EmbeddedStamp {
                id: embed_image(&mut document, &image)?,
                aspect,
                slot: StampSlot {
                    mode: stamp.mode,
                    free_position: stamp.free_position,
                    ..StampSlot::new(stamp.kind)
                },
            });
        }

        let targets = if self.settings.first_page_only { 1 } else { page_count };
        for index in 0..targets {
            self.stamp_page(&mut document, index, &embedded)?;
        }
        info!(pages = targets, "Stamps embedded");
        Ok(document)
    }

    /// Stamp `source` and write the result to `target` atomically.
    #[instrument(skip_all, fields(target = %target.as_ref().display()))]
    pub fn export(
        &self,
        source: &PdfSource,
        stamps: &[ExportStamp],
        target: impl AsRef<Path>,
    ) -> Result<()> {
        let target = target.as_ref();
        if let Some(src) = source.path() {
            if same_file(src, target) {
                return Err(StampError::Pdf(
                    "refusing to overwrite the source document".into(),
                ));
            }
        }
        let mut document = self.stamp(source, stamps)?;
        save_atomic(&mut document, target)?;
        info!("Stamped PDF written");
        Ok(())
    }

    fn stamp_page(&self, document: &mut Document, index: usize, stamps: &[EmbeddedStamp]) -> Result<()> {
        let page_id = reader::page_id(document, index)?;
        let media_box = reader::media_box(document, page_id)?;
        let page = media_box.size();

        let params = PlacementParams {
            page,
            scale: 1.0,
            width_ratio: self.settings.width_ratio,
            right_margin_mm: self.settings.right_margin_mm,
            bottom_margin_mm: self.settings.bottom_margin_mm,
            gap_mm: self.settings.gap_mm,
        };
        let mut slots: Vec<StampSlot> = stamps.iter().map(|s| s.slot.clone()).collect();
        let aspects: Vec<f64> = stamps.iter().map(|s| s.aspect).collect();
        let rects = resolve_slots(&params, &mut slots, &aspects);

        let mut resources = effective_resources(document, page_id)?;
        let mut xobjects = match resources.get(b"XObject").ok() {
            Some(obj) => reader::resolve(document, obj)
                .and_then(|o| o.as_dict().ok())
                .cloned()
                .unwrap_or_default(),
            None => Dictionary::new(),
        };

        // Leading newline: the previous stream may end mid-token.
        let mut paint = String::from("\nQ\n");
        for (stamp, rect) in stamps.iter().zip(&rects) {
            let name = unused_name(&xobjects);
            xobjects.set(name.as_str(), stamp.id);
            paint.push_str(&draw_command(&name, rect, media_box.left(), media_box.top()));
            debug!(page = index, name = %name, x = rect.x, y = rect.y, "Stamp placed");
        }
        resources.set("XObject", Object::Dictionary(xobjects));

        let open_id = document.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
        let paint_id = document.add_object(Stream::new(dictionary! {}, paint.into_bytes()));
        let mut contents = vec![Object::Reference(open_id)];
        contents.extend(existing_contents(document, page_id)?);
        contents.push(Object::Reference(paint_id));

        let page_dict = document
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|err| StampError::Pdf(format!("page {} is not a dictionary: {}", index, err)))?;
        page_dict.set("Resources", Object::Dictionary(resources));
        page_dict.set("Contents", Object::Array(contents));
        Ok(())
    }
}

/// `cm`/`Do` operators painting `name` into `rect`, given top-down page
/// coordinates and the MediaBox's left/top edges.
fn draw_command(name: &str, rect: &Rect, left: f64, top: f64) -> String {
    let x = left + rect.x;
    let y = top - rect.y - rect.height;
    format!(
        "q {:.4} 0 0 {:.4} {:.4} {:.4} cm /{} Do Q\n",
        rect.width, rect.height, x, y, name
    )
}

/// First `StwStampN` name not already in the XObject dictionary.
fn unused_name(xobjects: &Dictionary) -> String {
    (0..)
        .map(|n| format!("{XOBJECT_PREFIX}{n}"))
        .find(|name| !xobjects.has(name.as_bytes()))
        .unwrap_or_else(|| XOBJECT_PREFIX.to_string())
}

/// Owned copy of the page's resources, inherited from the page tree if the
/// page has none of its own.
fn effective_resources(document: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let dict = reader::dictionary_at(document, id)?;
        if let Ok(raw) = dict.get(b"Resources") {
            return Ok(reader::resolve(document, raw)
                .and_then(|o| o.as_dict().ok())
                .cloned()
                .unwrap_or_default());
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    Ok(Dictionary::new())
}

/// The page's content stream references, flattened into a list.
fn existing_contents(document: &Document, page_id: ObjectId) -> Result<Vec<Object>> {
    let page = reader::dictionary_at(document, page_id)?;
    let Ok(raw) = page.get(b"Contents") else {
        return Ok(Vec::new());
    };
    let items = match raw {
        Object::Array(items) => items.clone(),
        Object::Reference(id) => match document.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        _ => {
            return Err(StampError::Pdf(format!(
                "page {} {} has malformed Contents",
                page_id.0, page_id.1
            )));
        }
    };
    Ok(items)
}

/// Add an image XObject with an alpha soft mask; returns its object id.
fn embed_image(document: &mut Document, image: &RgbaImage) -> Result<ObjectId> {
    let (width, height) = image.dimensions();
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    for pixel in image.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel.0[3]);
    }

    let mut mask = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(width),
            "Height" => i64::from(height),
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        alpha,
    );
    compress(&mut mask)?;
    let mask_id = document.add_object(mask);

    let mut color = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(width),
            "Height" => i64::from(height),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "SMask" => mask_id,
        },
        rgb,
    );
    compress(&mut color)?;
    Ok(document.add_object(color))
}

fn compress(stream: &mut Stream) -> Result<()> {
    stream
        .compress()
        .map_err(|err| StampError::Pdf(format!("failed to compress image stream: {}", err)))
}

/// Write `document` next to `target` and rename it into place.
pub fn save_atomic(document: &mut Document, target: &Path) -> Result<()> {
    let dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    document
        .save_to(temp.as_file_mut())
        .map_err(|err| StampError::Pdf(format!("failed to serialise PDF: {}", err)))?;
    temp.as_file().sync_all()?;
    temp.persist(target).map_err(|err| StampError::Io(err.error))?;
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::reader::tests::test_pdf;
    use image::Rgba;
    use lopdf::content::Content;
    use stampwerk_core::types::mm_to_pt;
    use std::io::Cursor;

    fn png(w: u32, h: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 200]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn settings(first_page_only: bool) -> ExportSettings {
        ExportSettings {
            width_ratio: 0.45,
            right_margin_mm: 10.0,
            bottom_margin_mm: 10.0,
            gap_mm: 5.0,
            first_page_only,
        }
    }

    fn stamp(kind: StampKind, mode: PlacementMode, pos: Option<FreePosition>) -> ExportStamp {
        ExportStamp {
            kind,
            png: png(90, 56),
            mode,
            free_position: pos,
        }
    }

    /// Operand lists of every `cm` operator on page `index`.
    fn placements(doc: &Document, index: usize) -> Vec<Vec<f64>> {
        let page_id = reader::page_id(doc, index).unwrap();
        let bytes = doc.get_page_content(page_id).unwrap();
        let content = Content::decode(&bytes).unwrap();
        content
            .operations
            .iter()
            .filter(|op| op.operator == "cm")
            .map(|op| {
                op.operands
                    .iter()
                    .map(|o| o.as_float().map(f64::from).unwrap())
                    .collect()
            })
            .collect()
    }

    #[test]
    fn anchored_stamp_lands_in_the_bottom_right_corner() {
        let source = PdfSource::from_bytes(&test_pdf(&[Some((612, 792))])).unwrap();
        let doc = PdfStamper::new(settings(false))
            .stamp(&source, &[stamp(StampKind::Registration, PlacementMode::Anchored, None)])
            .unwrap();

        let cms = placements(&doc, 0);
        assert_eq!(cms.len(), 1);
        let (w, h, x, y) = (cms[0][0], cms[0][3], cms[0][4], cms[0][5]);
        assert!((w - 612.0 * 0.45).abs() < 1e-3);
        assert!((h - w * 56.0 / 90.0).abs() < 1e-3);
        assert!((x + w - (612.0 - mm_to_pt(10.0))).abs() < 1e-3);
        // PDF y grows upward: bottom edge sits on the bottom margin.
        assert!((y - mm_to_pt(10.0)).abs() < 1e-3);
    }

    #[test]
    fn original_content_is_kept_and_wrapped() {
        let source = PdfSource::from_bytes(&test_pdf(&[None])).unwrap();
        let doc = PdfStamper::new(settings(false))
            .stamp(&source, &[stamp(StampKind::Registration, PlacementMode::Anchored, None)])
            .unwrap();
        let page_id = reader::page_id(&doc, 0).unwrap();
        let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
        let ops: Vec<&str> = content.operations.iter().map(|o| o.operator.as_str()).collect();
        assert_eq!(ops.first(), Some(&"q"));
        assert!(ops.contains(&"re"));
        assert_eq!(ops.iter().filter(|o| **o == "q").count(), ops.iter().filter(|o| **o == "Q").count());
        assert_eq!(ops.last(), Some(&"Q"));
    }

    #[test]
    fn first_page_only_leaves_other_pages_alone() {
        let source = PdfSource::from_bytes(&test_pdf(&[None, None, None])).unwrap();
        let stamps = [stamp(StampKind::Registration, PlacementMode::Anchored, None)];

        let doc = PdfStamper::new(settings(true)).stamp(&source, &stamps).unwrap();
        assert_eq!(placements(&doc, 0).len(), 1);
        assert!(placements(&doc, 1).is_empty());
        assert!(placements(&doc, 2).is_empty());

        let all = PdfStamper::new(settings(false)).stamp(&source, &stamps).unwrap();
        assert!((0..3).all(|i| placements(&all, i).len() == 1));
    }

    #[test]
    fn free_position_matches_preview_fractions() {
        let source = PdfSource::from_bytes(&test_pdf(&[Some((600, 800))])).unwrap();
        let position = FreePosition::new(0.25, 0.5);
        let doc = PdfStamper::new(settings(false))
            .stamp(
                &source,
                &[stamp(StampKind::Registration, PlacementMode::Free, Some(position))],
            )
            .unwrap();
        let cm = &placements(&doc, 0)[0];
        let (h, x, y) = (cm[3], cm[4], cm[5]);
        assert!((x / 600.0 - 0.25).abs() < 1e-6);
        // Top edge in top-down terms is 800 - (y + h).
        assert!(((800.0 - (y + h)) / 800.0 - 0.5).abs() < 1e-6);
    }

    #[test]
    fn dual_stamps_stack_with_gap() {
        let source = PdfSource::from_bytes(&test_pdf(&[Some((595, 842))])).unwrap();
        let doc = PdfStamper::new(settings(false))
            .stamp(
                &source,
                &[
                    stamp(StampKind::Registration, PlacementMode::Anchored, None),
                    stamp(StampKind::Resolution, PlacementMode::Anchored, None),
                ],
            )
            .unwrap();
        let cms = placements(&doc, 0);
        assert_eq!(cms.len(), 2);
        let first_top = cms[0][5] + cms[0][3];
        let second_bottom = cms[1][5];
        assert!((second_bottom - first_top - mm_to_pt(5.0)).abs() < 1e-3);
        assert_eq!(cms[0][4], cms[1][4]);
    }

    #[test]
    fn stamp_image_has_soft_mask() {
        let source = PdfSource::from_bytes(&test_pdf(&[None])).unwrap();
        let doc = PdfStamper::new(settings(false))
            .stamp(&source, &[stamp(StampKind::Registration, PlacementMode::Anchored, None)])
            .unwrap();
        let page_id = reader::page_id(&doc, 0).unwrap();
        let page = reader::dictionary_at(&doc, page_id).unwrap();
        let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
        let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
        let image_id = xobjects
            .get(format!("{XOBJECT_PREFIX}0").as_bytes())
            .unwrap()
            .as_reference()
            .unwrap();
        let image = doc.get_object(image_id).unwrap().as_stream().unwrap();
        assert!(image.dict.get(b"SMask").is_ok());
        assert_eq!(image.dict.get(b"Width").unwrap().as_i64().unwrap(), 90);
    }

    #[test]
    fn export_writes_target_and_leaves_source_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let src_path = dir.path().join("in.pdf");
        let bytes = test_pdf(&[None]);
        std::fs::write(&src_path, &bytes).unwrap();
        let source = PdfSource::open(&src_path).unwrap();
        let stamps = [stamp(StampKind::Registration, PlacementMode::Anchored, None)];
        let stamper = PdfStamper::new(settings(false));

        let out = dir.path().join("out.pdf");
        stamper.export(&source, &stamps, &out).unwrap();
        assert_eq!(std::fs::read(&src_path).unwrap(), bytes);
        let written = PdfSource::open(&out).unwrap();
        assert_eq!(placements(written.document(), 0).len(), 1);

        let err = stamper.export(&source, &stamps, &src_path).unwrap_err();
        assert!(matches!(err, StampError::Pdf(_)));
        assert_eq!(std::fs::read(&src_path).unwrap(), bytes);
    }

    #[test]
    fn bad_png_fails_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let source = PdfSource::from_bytes(&test_pdf(&[None])).unwrap();
        let bad = ExportStamp {
            png: b"nope".to_vec(),
            ..stamp(StampKind::Registration, PlacementMode::Anchored, None)
        };
        let out = dir.path().join("out.pdf");
        let err = PdfStamper::new(settings(false))
            .export(&source, &[bad], &out)
            .unwrap_err();
        assert!(matches!(err, StampError::Image(_)));
        assert!(!out.exists());
    }

    #[test]
    fn draw_command_flips_into_pdf_space() {
        let cmd = draw_command("S0", &Rect::new(10.0, 20.0, 100.0, 50.0), 0.0, 800.0);
        assert_eq!(cmd, "q 100.0000 0 0 50.0000 10.0000 730.0000 cm /S0 Do Q\n");
    }

    #[test]
    fn unused_name_skips_existing_entries() {
        let mut dict = Dictionary::new();
        dict.set(format!("{XOBJECT_PREFIX}0"), Object::Null);
        assert_eq!(unused_name(&dict), format!("{XOBJECT_PREFIX}1"));
    }
}
