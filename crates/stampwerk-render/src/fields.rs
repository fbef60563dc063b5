// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fixed field layouts for both stamp kinds.
//
// Positions and font heights are fractions of the stamp canvas, so the same
// table works at any template resolution.

use stampwerk_core::StampKind;

/// How a field's text is positioned relative to its anchor point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAnchor {
    /// Ink box centred on the anchor on both axes.
    Center,
    /// Left edge at the anchor, glyph line sitting on the anchor's baseline.
    LeftBaseline,
}

/// One named text field of a stamp kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub anchor: FieldAnchor,
    pub x: f32,
    pub y: f32,
    /// Font em height as a fraction of canvas height.
    pub relative_font_height: f32,
}

impl FieldSpec {
    const fn new(
        name: &'static str,
        anchor: FieldAnchor,
        x: f32,
        y: f32,
        relative_font_height: f32,
    ) -> Self {
        Self {
            name,
            anchor,
            x,
            y,
            relative_font_height,
        }
    }

    /// Copy of this field moved down by `delta_px` on a canvas `canvas_height` tall.
    pub fn nudged(&self, delta_px: f32, canvas_height: u32) -> Self {
        let delta = if canvas_height == 0 {
            0.0
        } else {
            delta_px / canvas_height as f32
        };
        Self {
            y: self.y + delta,
            ..*self
        }
    }
}

use FieldAnchor::{Center, LeftBaseline};

pub const REGISTRATION_FIELDS: [FieldSpec; 5] = [
    FieldSpec::new("sheets", Center, 0.175, 0.110, 0.135),
    FieldSpec::new("doc", LeftBaseline, 0.705, 0.235, 0.145),
    FieldSpec::new("day", Center, 0.125, 0.580, 0.135),
    FieldSpec::new("month", LeftBaseline, 0.225, 0.610, 0.145),
    FieldSpec::new("year", LeftBaseline, 0.778, 0.600, 0.145),
];

pub const RESOLUTION_FIELDS: [FieldSpec; 5] = [
    FieldSpec::new("title", Center, 0.50, 0.08, 0.085),
    FieldSpec::new("inorderLbl", LeftBaseline, 0.05, 0.24, 0.06),
    FieldSpec::new("refuseLbl", LeftBaseline, 0.52, 0.24, 0.06),
    FieldSpec::new("cmdr1", LeftBaseline, 0.05, 0.36, 0.070),
    FieldSpec::new("rank", LeftBaseline, 0.05, 0.50, 0.070),
];

/// Field table for a stamp kind.
pub fn fields_for(kind: StampKind) -> &'static [FieldSpec] {
    match kind {
        StampKind::Registration => &REGISTRATION_FIELDS,
        StampKind::Resolution => &RESOLUTION_FIELDS,
    }
}

/// Look up a field by name.
pub fn field(kind: StampKind, name: &str) -> Option<&'static FieldSpec> {
    fields_for(kind).iter().find(|f| f.name == name)
}
