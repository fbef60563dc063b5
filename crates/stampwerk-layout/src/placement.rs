// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Placement resolver.
//
// All rectangles use a top-left origin with y growing down, in "surface
// units": page points multiplied by `scale`. Preview passes the zoom factor as
// the scale, export passes 1.0. Positions persisted as page fractions are
// therefore identical on both surfaces.

use stampwerk_core::StampConfig;
use stampwerk_core::types::{FreePosition, PageSize, PlacementMode, Rect, StampSlot, mm_to_pt};
use tracing::debug;

/// Everything the resolver needs besides the slots themselves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementParams {
    pub page: PageSize,
    /// Surface units per page point.
    pub scale: f64,
    /// Stamp width as a fraction of page width.
    pub width_ratio: f64,
    pub right_margin_mm: f64,
    pub bottom_margin_mm: f64,
    /// Vertical gap between stacked slots.
    pub gap_mm: f64,
}

impl PlacementParams {
    /// Parameters for `page` drawn at `scale` using the configured knobs.
    pub fn from_config(config: &StampConfig, page: PageSize, scale: f64) -> Self {
        Self {
            page,
            scale,
            width_ratio: config.width_ratio,
            right_margin_mm: config.right_margin_mm,
            bottom_margin_mm: config.bottom_margin_mm,
            gap_mm: config.stamp_gap_mm,
        }
    }

    /// Surface width and height.
    pub fn surface_size(&self) -> (f64, f64) {
        (
            self.page.width_pt * self.scale,
            self.page.height_pt * self.scale,
        )
    }

    fn length(&self, mm: f64) -> f64 {
        mm_to_pt(mm) * self.scale
    }

    /// Stamp width and height for an image of the given height/width ratio.
    pub fn stamp_size(&self, aspect: f64) -> (f64, f64) {
        let (surface_w, _) = self.surface_size();
        let w = (surface_w * self.width_ratio).max(0.0);
        let aspect = if aspect.is_finite() && aspect > 0.0 {
            aspect
        } else {
            1.0
        };
        (w, w * aspect)
    }

    /// Bottom-right anchored rectangle.
    pub fn anchored_rect(&self, aspect: f64) -> Rect {
        let (surface_w, surface_h) = self.surface_size();
        let (w, h) = self.stamp_size(aspect);
        Rect::new(
            surface_w - self.length(self.right_margin_mm) - w,
            surface_h - self.length(self.bottom_margin_mm) - h,
            w,
            h,
        )
    }

    /// Rectangle directly above `below`, separated by the gap. Falls back to
    /// `below`'s position when it would cross the top edge.
    pub fn stacked_above(&self, below: &Rect, aspect: f64) -> Rect {
        let (w, h) = self.stamp_size(aspect);
        let y = below.y - h - self.length(self.gap_mm);
        let y = if y < 0.0 { below.y } else { y };
        Rect::new(below.x, y, w, h)
    }

    /// Rectangle at a persisted page fraction.
    pub fn free_rect(&self, position: FreePosition, aspect: f64) -> Rect {
        let (surface_w, surface_h) = self.surface_size();
        let (w, h) = self.stamp_size(aspect);
        Rect::new(position.x_pct * surface_w, position.y_pct * surface_h, w, h)
    }

    /// Default rectangle for the slot at `index`: anchored for the first,
    /// stacked on the previous slot's rectangle otherwise.
    fn default_rect(&self, previous: Option<&Rect>, aspect: f64) -> Rect {
        match previous {
            None => self.anchored_rect(aspect),
            Some(below) => self.stacked_above(below, aspect),
        }
    }
}

/// Resolve a rectangle for every slot, in slot order.
///
/// `aspects[i]` is the height/width ratio of slot `i`'s built stamp. A slot
/// in free mode without a persisted position is seeded from its default
/// rectangle; persisted positions are never modified otherwise.
pub fn resolve_slots(params: &PlacementParams, slots: &mut [StampSlot], aspects: &[f64]) -> Vec<Rect> {
    let (surface_w, surface_h) = params.surface_size();
    let mut rects: Vec<Rect> = Vec::with_capacity(slots.len());

    for (index, slot) in slots.iter_mut().enumerate() {
        let aspect = aspects.get(index).copied().unwrap_or(1.0);
        let default = params.default_rect(rects.last(), aspect);
        let rect = match slot.mode {
            PlacementMode::Anchored => default,
            PlacementMode::Free => {
                let position = *slot
                    .free_position
                    .get_or_insert_with(|| FreePosition::of_rect(&default, surface_w, surface_h));
                params.free_rect(position, aspect)
            }
        };
        debug!(
            slot = index,
            kind = %slot.kind,
            x = rect.x,
            y = rect.y,
            w = rect.width,
            h = rect.height,
            "Slot resolved"
        );
        rects.push(rect);
    }
    rects
}
