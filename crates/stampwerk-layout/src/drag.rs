// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Drag controller: pointer-driven repositioning of free-placed slots on the
// preview surface.

use stampwerk_core::types::{FreePosition, StampSlot};
use tracing::debug;

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        slot: usize,
        /// Pointer position minus the grabbed rectangle's origin.
        grab_x: f64,
        grab_y: f64,
    },
}

/// What a pointer event did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragOutcome {
    /// Nothing changed.
    Ignored,
    /// A drag started on the given slot.
    Grabbed { slot: usize },
    /// The slot moved; the caller must re-render before the next event.
    Moved { slot: usize, position: FreePosition },
    /// The drag ended.
    Released,
}

#[derive(Debug, Clone, Default)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Return to idle without touching any slot.
    pub fn reset(&mut self) {
        self.state = DragState::Idle;
    }

    /// Start a drag if the pointer lands in a slot's last rendered rectangle.
    ///
    /// Slots are tested in order and the first hit wins. `enabled` is false
    /// when free positioning is off or no page is loaded.
    pub fn pointer_down(&mut self, slots: &[StampSlot], enabled: bool, x: f64, y: f64) -> DragOutcome {
        if !enabled || self.is_dragging() {
            return DragOutcome::Ignored;
        }
        let hit = slots.iter().enumerate().find_map(|(index, slot)| {
            slot.last_rendered_rect
                .filter(|rect| rect.contains(x, y))
                .map(|rect| (index, rect))
        });
        let Some((slot, rect)) = hit else {
            return DragOutcome::Ignored;
        };
        self.state = DragState::Dragging {
            slot,
            grab_x: x - rect.x,
            grab_y: y - rect.y,
        };
        debug!(slot, x, y, "Drag started");
        DragOutcome::Grabbed { slot }
    }

    /// Move the dragged slot, keeping it fully on a `surface_w × surface_h`
    /// surface, and persist its new page fraction.
    pub fn pointer_move(
        &mut self,
        slots: &mut [StampSlot],
        surface_w: f64,
        surface_h: f64,
        x: f64,
        y: f64,
    ) -> DragOutcome {
        let DragState::Dragging {
            slot,
            grab_x,
            grab_y,
        } = self.state
        else {
            return DragOutcome::Ignored;
        };
        let Some(target) = slots.get_mut(slot) else {
            self.reset();
            return DragOutcome::Ignored;
        };
        let Some(rect) = target.last_rendered_rect else {
            self.reset();
            return DragOutcome::Ignored;
        };

        let clamp = |v: f64, extent: f64, size: f64| v.clamp(0.0, (extent - size).max(0.0));
        let moved = rect.with_origin(
            clamp(x - grab_x, surface_w, rect.width),
            clamp(y - grab_y, surface_h, rect.height),
        );
        let position = FreePosition::of_rect(&moved, surface_w, surface_h);
        target.free_position = Some(position);
        target.last_rendered_rect = Some(moved);
        debug!(slot, x = moved.x, y = moved.y, "Slot dragged");
        DragOutcome::Moved { slot, position }
    }

    /// End any drag, wherever the pointer is.
    pub fn pointer_up(&mut self) -> DragOutcome {
        if self.is_dragging() {
            self.reset();
            DragOutcome::Released
        } else {
            DragOutcome::Ignored
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stampwerk_core::types::{PlacementMode, Rect, StampKind};

    fn slot_at(kind: StampKind, rect: Rect) -> StampSlot {
        StampSlot {
            mode: PlacementMode::Free,
            last_rendered_rect: Some(rect),
            ..StampSlot::new(kind)
        }
    }

    #[test]
    fn press_outside_every_slot_stays_idle() {
        let slots = [slot_at(StampKind::Registration, Rect::new(10.0, 10.0, 50.0, 30.0))];
        let mut drag = DragController::new();
        assert_eq!(drag.pointer_down(&slots, true, 5.0, 5.0), DragOutcome::Ignored);
        // Right and bottom edges are outside.
        assert_eq!(drag.pointer_down(&slots, true, 60.0, 20.0), DragOutcome::Ignored);
        assert_eq!(drag.state(), DragState::Idle);
    }

    #[test]
    fn disabled_controller_ignores_presses() {
        let slots = [slot_at(StampKind::Registration, Rect::new(0.0, 0.0, 50.0, 30.0))];
        let mut drag = DragController::new();
        assert_eq!(drag.pointer_down(&slots, false, 10.0, 10.0), DragOutcome::Ignored);
    }

    #[test]
    fn first_slot_wins_on_overlap() {
        let rect = Rect::new(0.0, 0.0, 50.0, 30.0);
        let slots = [
            slot_at(StampKind::Registration, rect),
            slot_at(StampKind::Resolution, rect),
        ];
        let mut drag = DragController::new();
        assert_eq!(
            drag.pointer_down(&slots, true, 10.0, 10.0),
            DragOutcome::Grabbed { slot: 0 }
        );
    }

    #[test]
    fn move_keeps_grab_offset_and_persists_fraction() {
        let mut slots = [slot_at(StampKind::Registration, Rect::new(100.0, 100.0, 50.0, 30.0))];
        let mut drag = DragController::new();
        drag.pointer_down(&slots, true, 110.0, 105.0);

        let outcome = drag.pointer_move(&mut slots, 400.0, 600.0, 210.0, 305.0);
        let DragOutcome::Moved { slot, position } = outcome else {
            panic!("expected a move, got {outcome:?}");
        };
        assert_eq!(slot, 0);
        assert_eq!(position, FreePosition::new(0.5, 0.5));
        assert_eq!(slots[0].free_position, Some(position));
        assert_eq!(
            slots[0].last_rendered_rect,
            Some(Rect::new(200.0, 300.0, 50.0, 30.0))
        );
    }

    #[test]
    fn move_is_clamped_to_the_surface() {
        let mut slots = [slot_at(StampKind::Registration, Rect::new(10.0, 10.0, 50.0, 30.0))];
        let mut drag = DragController::new();
        drag.pointer_down(&slots, true, 20.0, 20.0);

        drag.pointer_move(&mut slots, 200.0, 100.0, 1000.0, 1000.0);
        assert_eq!(
            slots[0].last_rendered_rect,
            Some(Rect::new(150.0, 70.0, 50.0, 30.0))
        );
        drag.pointer_move(&mut slots, 200.0, 100.0, -500.0, -500.0);
        assert_eq!(slots[0].free_position, Some(FreePosition::new(0.0, 0.0)));
    }

    #[test]
    fn oversized_rect_pins_to_origin() {
        let mut slots = [slot_at(StampKind::Registration, Rect::new(0.0, 0.0, 300.0, 30.0))];
        let mut drag = DragController::new();
        drag.pointer_down(&slots, true, 5.0, 5.0);
        drag.pointer_move(&mut slots, 200.0, 100.0, 50.0, 5.0);
        assert_eq!(slots[0].last_rendered_rect.unwrap().x, 0.0);
    }

    #[test]
    fn release_always_returns_to_idle() {
        let mut slots = [slot_at(StampKind::Registration, Rect::new(0.0, 0.0, 50.0, 30.0))];
        let mut drag = DragController::new();
        drag.pointer_down(&slots, true, 5.0, 5.0);
        assert!(drag.is_dragging());
        assert_eq!(drag.pointer_up(), DragOutcome::Released);
        assert_eq!(drag.state(), DragState::Idle);
        assert_eq!(
            drag.pointer_move(&mut slots, 100.0, 100.0, 50.0, 50.0),
            DragOutcome::Ignored
        );
        assert_eq!(drag.pointer_up(), DragOutcome::Ignored);
    }

    #[test]
    fn vanished_slot_cancels_the_drag() {
        let mut slots = [slot_at(StampKind::Registration, Rect::new(0.0, 0.0, 50.0, 30.0))];
        let mut drag = DragController::new();
        drag.pointer_down(&slots, true, 5.0, 5.0);
        slots[0].last_rendered_rect = None;
        assert_eq!(
            drag.pointer_move(&mut slots, 100.0, 100.0, 10.0, 10.0),
            DragOutcome::Ignored
        );
        assert!(!drag.is_dragging());
    }
}
