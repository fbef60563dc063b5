// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stamp builder.
//
// Produces the finished, rotated stamp image for either kind from an
// immutable content snapshot. Registration stamps are drawn over the template
// image; resolution stamps are drawn on a transparent canvas of the same size
// so both kinds place identically.

use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use image::RgbaImage;
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect as PixelRect;
use stampwerk_core::content::{RegistrationContent, ResolutionContent, StampForm};
use stampwerk_core::error::Result;
use stampwerk_core::types::{Rotation, StampKind};
use stampwerk_core::StampConfig;
use tracing::{debug, instrument, warn};

use crate::fields::{self, FieldSpec};
use crate::font::FontBook;
use crate::image::ImageProcessor;
use crate::text::{self, TEXT_COLOR, TextStyle};

/// Canvas size used when the template is unavailable and only its size matters.
pub const FALLBACK_CANVAS: (u32, u32) = (900, 560);

/// Outline stroke for registration text, in pixels.
pub const REGISTRATION_STROKE: f32 = 1.0;

/// Checkbox label captions.
pub const IN_ORDER_LABEL: &str = "В наказ";
pub const REFUSE_LABEL: &str = "Відмова";

const RULE_THICKNESS: f32 = 2.0;
const BOX_PEN: f32 = 1.4;
const BOX_FILL_INSET: i32 = 4;

/// Point size to pixels at 96 DPI.
fn pt_to_px(pt: f32) -> f32 {
    pt * 96.0 / 72.0
}

/// Builds stamp images from content snapshots.
#[derive(Debug, Clone)]
pub struct StampBuilder {
    template_path: PathBuf,
    fonts: FontBook,
    today: NaiveDate,
}

impl StampBuilder {
    pub fn new(template_path: impl Into<PathBuf>, fonts: FontBook) -> Self {
        Self {
            template_path: template_path.into(),
            fonts,
            today: Local::now().date_naive(),
        }
    }

    /// Builder using the configured template and font preferences.
    pub fn from_config(config: &StampConfig) -> Self {
        Self::new(
            config.template_location(),
            FontBook::discover(&config.font_preferences),
        )
    }

    /// Fix the date used to fill unparseable date fields.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Template pixel size, or [`FALLBACK_CANVAS`] when it cannot be read.
    pub fn template_size(&self) -> (u32, u32) {
        match image::image_dimensions(&self.template_path) {
            Ok(size) => size,
            Err(err) => {
                warn!(
                    path = %self.template_path.display(),
                    %err,
                    "Template size unavailable, using fallback canvas"
                );
                FALLBACK_CANVAS
            }
        }
    }

    /// Build the stamp for `kind`, rotated.
    #[instrument(skip(self, form, kind), fields(kind = %kind, degrees = rotation.degrees()))]
    pub fn build(
        &self,
        kind: StampKind,
        form: &StampForm,
        rotation: Rotation,
    ) -> Result<ImageProcessor> {
        let canvas = match kind {
            StampKind::Registration => self.build_registration(&form.registration)?,
            StampKind::Resolution => self.build_resolution(&form.resolution),
        };
        debug!(
            width = canvas.width(),
            height = canvas.height(),
            "Stamp drawn"
        );
        Ok(ImageProcessor::from_rgba(canvas).rotate(rotation))
    }

    /// Text drawn into each registration field, after date normalization.
    pub fn registration_values(
        &self,
        content: &RegistrationContent,
    ) -> Vec<(&'static FieldSpec, String)> {
        let date = content.normalized_date(self.today);
        let value = |name: &str| -> String {
            match name {
                "sheets" => content.sheet_count.trim().to_string(),
                "doc" => content.document_number.trim().to_string(),
                "day" => date.day_text(),
                "month" => date.month_text().to_string(),
                "year" => date.year_tail_text(),
                _ => String::new(),
            }
        };
        fields::fields_for(StampKind::Registration)
            .iter()
            .map(|spec| (spec, value(spec.name)))
            .collect()
    }

    /// Unrotated registration stamp over the template image.
    pub fn build_registration(&self, content: &RegistrationContent) -> Result<RgbaImage> {
        let mut canvas = ImageProcessor::open(&self.template_path)?.into_rgba();
        let height = canvas.height() as f32;

        let Some(font) = self.fonts.sans() else {
            warn!("No font available, registration text skipped");
            return Ok(canvas);
        };
        for (spec, value) in self.registration_values(content) {
            let style = TextStyle {
                font,
                em_px: spec.relative_font_height * height,
                stroke_width: REGISTRATION_STROKE,
            };
            text::draw_field(&mut canvas, &style, spec, &value);
        }
        Ok(canvas)
    }

    /// Unrotated resolution stamp on a transparent template-sized canvas.
    pub fn build_resolution(&self, content: &ResolutionContent) -> RgbaImage {
        let (w, h) = self.template_size();
        let mut canvas = RgbaImage::new(w, h);
        let (wf, hf) = (w as f32, h as f32);

        let rule_y = (0.14 * hf - RULE_THICKNESS / 2.0).round() as i32;
        draw_filled_rect_mut(
            &mut canvas,
            PixelRect::at((0.04 * wf).round() as i32, rule_y)
                .of_size(((0.92 * wf).round() as u32).max(1), RULE_THICKNESS as u32),
            TEXT_COLOR,
        );

        let box_w = 0.11 * wf;
        let box_h = 0.12 * hf;
        let box_y = 0.17 * hf;
        draw_checkbox(&mut canvas, 0.28 * wf, box_y, box_w, box_h, content.in_order);
        draw_checkbox(
            &mut canvas,
            0.86 * wf - box_w,
            box_y,
            box_w,
            box_h,
            content.refuse,
        );

        let Some(font) = self.fonts.serif() else {
            warn!("No font available, resolution text skipped");
            return canvas;
        };
        let pt = content.point_size();
        let body = TextStyle {
            font,
            em_px: pt_to_px(pt),
            stroke_width: content.stroke_width(),
        };
        let label = TextStyle {
            em_px: pt_to_px((pt - 4.0).max(12.0)),
            ..body
        };

        let lookup = |name: &str| fields::field(StampKind::Resolution, name);
        let placements: [(Option<&FieldSpec>, &TextStyle<'_>, &str); 4] = [
            (lookup("title"), &body, content.title_line.as_str()),
            (lookup("inorderLbl"), &label, IN_ORDER_LABEL),
            (lookup("refuseLbl"), &label, REFUSE_LABEL),
            (lookup("cmdr1"), &body, content.commander_line.as_str()),
        ];
        for (spec, style, value) in placements {
            if let Some(spec) = spec {
                text::draw_field(&mut canvas, style, spec, value);
            }
        }
        if let Some(rank) = lookup("rank") {
            let nudged = rank.nudged(content.line_delta_px(), h);
            text::draw_field(&mut canvas, &body, &nudged, &content.rank_line);
        }
        canvas
    }

    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }
}

/// Outlined checkbox, filled with a small inset when `checked`.
fn draw_checkbox(canvas: &mut RgbaImage, x: f32, y: f32, w: f32, h: f32, checked: bool) {
    let (x, y) = (x.round() as i32, y.round() as i32);
    let (w, h) = (w.round().max(1.0) as i32, h.round().max(1.0) as i32);
    let pen = BOX_PEN.round().max(1.0) as i32;

    // Four edges as filled strips.
    for (ex, ey, ew, eh) in [
        (x, y, w, pen),
        (x, y + h - pen, w, pen),
        (x, y, pen, h),
        (x + w - pen, y, pen, h),
    ] {
        if ew > 0 && eh > 0 {
            draw_filled_rect_mut(
                canvas,
                PixelRect::at(ex, ey).of_size(ew as u32, eh as u32),
                TEXT_COLOR,
            );
        }
    }

    let inner_w = w - 2 * BOX_FILL_INSET;
    let inner_h = h - 2 * BOX_FILL_INSET;
    if checked && inner_w > 0 && inner_h > 0 {
        draw_filled_rect_mut(
            canvas,
            PixelRect::at(x + BOX_FILL_INSET, y + BOX_FILL_INSET)
                .of_size(inner_w as u32, inner_h as u32),
            TEXT_COLOR,
        );
    }
}
