// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Field values for the two stamp kinds.
//
// These are plain snapshots: the front end owns the editable copy and hands
// an immutable borrow to the builder on every render pass.

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::date::{NormalizedDate, month_name};

/// Lowest and highest accepted resolution font size, in points.
pub const RESOLUTION_PT_RANGE: (f32, f32) = (10.0, 40.0);
/// Lowest and highest accepted inter-line nudge, in pixels.
pub const LINE_DELTA_RANGE: (f32, f32) = (-60.0, 60.0);

const DEFAULT_POINT_SIZE: f32 = 20.0;
const DEFAULT_LINE_DELTA: f32 = -6.0;

fn clamp_or(value: f32, (lo, hi): (f32, f32), fallback: f32) -> f32 {
    if value.is_finite() { value.clamp(lo, hi) } else { fallback }
}

/// Registration stamp fields, as typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationContent {
    pub sheet_count: String,
    pub document_number: String,
    pub day: String,
    pub month: String,
    pub year_tail: String,
}

impl RegistrationContent {
    /// Default content with the date fields set to `date`.
    pub fn today(date: NaiveDate) -> Self {
        let mut content = Self {
            sheet_count: "1".into(),
            document_number: String::new(),
            day: String::new(),
            month: String::new(),
            year_tail: String::new(),
        };
        content.set_date(date);
        content
    }

    /// Overwrite the three date fields from a calendar date.
    pub fn set_date(&mut self, date: NaiveDate) {
        self.day = format!("{:02}", date.day());
        self.month = month_name(date.month()).to_string();
        self.year_tail = format!("{:02}", date.year().rem_euclid(100));
    }

    /// Calendar-normalized date for rendering.
    pub fn normalized_date(&self, today: NaiveDate) -> NormalizedDate {
        NormalizedDate::resolve(&self.day, &self.month, &self.year_tail, today)
    }
}

impl Default for RegistrationContent {
    fn default() -> Self {
        Self::today(Local::now().date_naive())
    }
}

/// Resolution stamp fields and formatting knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionContent {
    pub title_line: String,
    pub in_order: bool,
    pub refuse: bool,
    pub commander_line: String,
    pub rank_line: String,
    pub font_point_size: f32,
    pub line_spacing_adjust_px: f32,
    pub thin_stroke: bool,
}

impl ResolutionContent {
    /// Font size clamped to the accepted range; the default when not a number.
    pub fn point_size(&self) -> f32 {
        clamp_or(self.font_point_size, RESOLUTION_PT_RANGE, DEFAULT_POINT_SIZE)
    }

    /// Line nudge clamped to the accepted range; the default when not a number.
    pub fn line_delta_px(&self) -> f32 {
        clamp_or(self.line_spacing_adjust_px, LINE_DELTA_RANGE, DEFAULT_LINE_DELTA)
    }

    /// Outline stroke width: none for thin text, 0.8 px otherwise.
    pub fn stroke_width(&self) -> f32 {
        if self.thin_stroke { 0.0 } else { 0.8 }
    }
}

impl Default for ResolutionContent {
    fn default() -> Self {
        Self {
            title_line: String::new(),
            in_order: false,
            refuse: false,
            commander_line: "Командир військової частини".into(),
            rank_line: "підполковник".into(),
            font_point_size: DEFAULT_POINT_SIZE,
            line_spacing_adjust_px: DEFAULT_LINE_DELTA,
            thin_stroke: true,
        }
    }
}

/// Snapshot of every stamp field, passed by reference into each render.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StampForm {
    pub registration: RegistrationContent,
    pub resolution: ResolutionContent,
}
