// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Field text renderer.
//
// A field is laid out either centred on its anchor (using the ink box of the
// rasterised glyph outlines, not the advance width) or left-aligned on a
// baseline. Text is rasterised into a coverage mask; a non-zero stroke width
// dilates the mask by half the stroke on every side, which is what stroking
// the outline and then filling it in the same colour produces.

use ab_glyph::{Font, FontArc, OutlinedGlyph, PxScale, ScaleFont, point};
use image::{GrayImage, Luma, Pixel, Rgba, RgbaImage};
use imageproc::morphology::{Mask, grayscale_dilate};

use crate::fields::{FieldAnchor, FieldSpec};

/// Em fraction between the nominal field line and the top of the text box.
pub const BASELINE_FACTOR: f32 = 0.70;

/// Ink colour for all stamp text.
pub const TEXT_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Font, size, and outline settings for one draw call.
#[derive(Debug, Clone, Copy)]
pub struct TextStyle<'a> {
    pub font: &'a FontArc,
    /// Em height in pixels.
    pub em_px: f32,
    /// Outline stroke width in pixels; 0 disables stroking.
    pub stroke_width: f32,
}

/// Ink bounding box in pixels, relative to the layout origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InkBounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl InkBounds {
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    fn center(&self) -> (f32, f32) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    fn union(self, other: InkBounds) -> InkBounds {
        InkBounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

/// Draw `text` into `canvas` at the position described by `spec`.
pub fn draw_field(canvas: &mut RgbaImage, style: &TextStyle<'_>, spec: &FieldSpec, text: &str) {
    if text.trim().is_empty() || style.em_px <= 0.0 {
        return;
    }
    let (width, height) = (canvas.width() as f32, canvas.height() as f32);
    let origin = match spec.anchor {
        FieldAnchor::Center => {
            let Some(ink) = measure_ink(style, text) else {
                return;
            };
            centered_origin(spec.x * width, spec.y * height, &ink)
        }
        FieldAnchor::LeftBaseline => baseline_origin(spec.x * width, spec.y * height, style.em_px),
    };
    draw_text_at(canvas, style, origin, text);
}

/// Top-left layout origin that puts the ink box centre on the anchor.
pub fn centered_origin(anchor_x: f32, anchor_y: f32, ink: &InkBounds) -> (f32, f32) {
    let (cx, cy) = ink.center();
    (anchor_x - cx, anchor_y - cy)
}

/// Top-left layout origin for a left-aligned field on the line at `line_y`.
pub fn baseline_origin(left_x: f32, line_y: f32, em_px: f32) -> (f32, f32) {
    (left_x, line_y - em_px * BASELINE_FACTOR)
}

/// Ink box of `text` laid out at the origin, or `None` for blank text.
pub fn measure_ink(style: &TextStyle<'_>, text: &str) -> Option<InkBounds> {
    ink_of(&layout(style, (0.0, 0.0), text))
}

/// Rasterise `text` in black with its layout box's top-left corner at `origin`.
pub fn draw_text_at(canvas: &mut RgbaImage, style: &TextStyle<'_>, origin: (f32, f32), text: &str) {
    draw_text_colored(canvas, style, origin, text, TEXT_COLOR);
}

/// Rasterise `text` in `color` with its layout box's top-left corner at `origin`.
pub fn draw_text_colored(
    canvas: &mut RgbaImage,
    style: &TextStyle<'_>,
    origin: (f32, f32),
    text: &str,
    color: Rgba<u8>,
) {
    let glyphs = layout(style, origin, text);
    let Some(ink) = ink_of(&glyphs) else {
        return;
    };
    let radius = (style.stroke_width / 2.0).max(0.0);
    let pad = radius.ceil() as i32;
    let Some(mut mask) = CoverageMask::covering(&ink, pad, canvas.width(), canvas.height()) else {
        return;
    };
    for glyph in &glyphs {
        mask.add_glyph(glyph);
    }
    if radius > 0.0 {
        mask = mask.dilated(radius);
    }
    mask.composite(canvas, color);
}

/// Pixel scale that makes one em `em_px` tall.
fn em_scale(font: &FontArc, em_px: f32) -> PxScale {
    let units_per_em = font.units_per_em().unwrap_or(1000.0);
    PxScale::from(em_px * font.height_unscaled() / units_per_em)
}

/// Position and outline every glyph on a single line.
fn layout(style: &TextStyle<'_>, origin: (f32, f32), text: &str) -> Vec<OutlinedGlyph> {
    let scale = em_scale(style.font, style.em_px);
    let scaled = style.font.as_scaled(scale);
    let baseline = origin.1 + scaled.ascent();
    let mut caret = origin.0;
    let mut previous = None;
    let mut outlined = Vec::with_capacity(text.len());

    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(prev) = previous {
            caret += scaled.kern(prev, id);
        }
        let glyph = id.with_scale_and_position(scale, point(caret, baseline));
        caret += scaled.h_advance(id);
        previous = Some(id);
        if let Some(o) = style.font.outline_glyph(glyph) {
            outlined.push(o);
        }
    }
    outlined
}

fn ink_of(glyphs: &[OutlinedGlyph]) -> Option<InkBounds> {
    glyphs
        .iter()
        .map(|g| {
            let b = g.px_bounds();
            InkBounds {
                min_x: b.min.x,
                min_y: b.min.y,
                max_x: b.max.x,
                max_y: b.max.y,
            }
        })
        .reduce(InkBounds::union)
}

/// Per-pixel text coverage over a clipped window of the canvas.
#[derive(Debug, Clone)]
pub(crate) struct CoverageMask {
    x0: i32,
    y0: i32,
    coverage: GrayImage,
}

impl CoverageMask {
    /// Mask covering `ink` grown by `pad`, clipped to a `canvas_w × canvas_h` canvas.
    pub(crate) fn covering(ink: &InkBounds, pad: i32, canvas_w: u32, canvas_h: u32) -> Option<Self> {
        let x0 = (ink.min_x.floor() as i32 - pad).max(0);
        let y0 = (ink.min_y.floor() as i32 - pad).max(0);
        let x1 = (ink.max_x.ceil() as i32 + pad).min(canvas_w as i32);
        let y1 = (ink.max_y.ceil() as i32 + pad).min(canvas_h as i32);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Self::blank(x0, y0, (x1 - x0) as u32, (y1 - y0) as u32))
    }

    pub(crate) fn blank(x0: i32, y0: i32, width: u32, height: u32) -> Self {
        Self {
            x0,
            y0,
            coverage: GrayImage::new(width, height),
        }
    }

    fn local(&self, x: i32, y: i32) -> Option<(u32, u32)> {
        let (lx, ly) = (x - self.x0, y - self.y0);
        if lx < 0 || ly < 0 {
            return None;
        }
        let (lx, ly) = (lx as u32, ly as u32);
        (lx < self.coverage.width() && ly < self.coverage.height()).then_some((lx, ly))
    }

    /// Accumulate `coverage` in `0.0..=1.0` at canvas pixel `(x, y)`.
    pub(crate) fn add(&mut self, x: i32, y: i32, coverage: f32) {
        if let Some((lx, ly)) = self.local(x, y) {
            let px = self.coverage.get_pixel_mut(lx, ly);
            let sum = f32::from(px.0[0]) + coverage.clamp(0.0, 1.0) * 255.0;
            px.0[0] = sum.round().min(255.0) as u8;
        }
    }

    pub(crate) fn get(&self, x: i32, y: i32) -> u8 {
        self.local(x, y)
            .map_or(0, |(lx, ly)| self.coverage.get_pixel(lx, ly).0[0])
    }

    fn add_glyph(&mut self, glyph: &OutlinedGlyph) {
        let bounds = glyph.px_bounds();
        let (bx, by) = (bounds.min.x as i32, bounds.min.y as i32);
        glyph.draw(|gx, gy, c| self.add(bx + gx as i32, by + gy as i32, c));
    }

    /// Grow the covered area by `radius` pixels.
    ///
    /// Dilation runs with a disk of the next whole radius; a fractional
    /// radius keeps that share of the grown ring.
    pub(crate) fn dilated(&self, radius: f32) -> Self {
        let whole = radius.ceil().clamp(0.0, f32::from(u8::MAX));
        if whole <= 0.0 {
            return self.clone();
        }
        let grown = grayscale_dilate(&self.coverage, &Mask::disk(whole as u8));
        let share = radius / whole;
        let coverage = GrayImage::from_fn(grown.width(), grown.height(), |x, y| {
            let base = f32::from(self.coverage.get_pixel(x, y).0[0]);
            let wide = f32::from(grown.get_pixel(x, y).0[0]);
            Luma([(base + (wide - base) * share).round() as u8])
        });
        Self {
            x0: self.x0,
            y0: self.y0,
            coverage,
        }
    }

    /// Blend `color` over `canvas` with per-pixel alpha from the mask.
    pub(crate) fn composite(&self, canvas: &mut RgbaImage, color: Rgba<u8>) {
        for (lx, ly, px) in self.coverage.enumerate_pixels() {
            let coverage = px.0[0];
            if coverage == 0 {
                continue;
            }
            let x = (self.x0 + lx as i32) as u32;
            let y = (self.y0 + ly as i32) as u32;
            if x >= canvas.width() || y >= canvas.height() {
                continue;
            }
            let mut ink = color;
            ink.0[3] = ((u16::from(coverage) * u16::from(color.0[3]) + 127) / 255) as u8;
            canvas.get_pixel_mut(x, y).blend(&ink);
        }
    }
}
