//! Resize state machine for the article panel.
//!
//! The panel is conceptually centered, so moving one edge by a column
//! redistributes two columns of width. Width is tracked in layout units
//! (ten per terminal cell) and clamped to the configured bounds at every
//! observable moment. The controller does no IO: `end_drag` hands the
//! committed width back to the caller, which persists it.

use crate::config::LayoutConfig;

pub const MIN_ARTICLE_WIDTH: u16 = 600;
pub const MAX_ARTICLE_WIDTH: u16 = 1400;
pub const DEFAULT_ARTICLE_WIDTH: u16 = 860;

/// One terminal cell spans this many layout units.
pub const UNITS_PER_CELL: u16 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DragState {
    Idle,
    Active {
        edge: Edge,
        anchor_x: i32,
        anchor_width: u16,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WidthBounds {
    pub min: u16,
    pub max: u16,
    pub default: u16,
}

impl WidthBounds {
    /// Configured bounds, or the built-in constants when the configured
    /// values are inconsistent (min >= max, or default outside the range).
    pub fn from_config(layout: &LayoutConfig) -> Self {
        let candidate = Self {
            min: layout.min_article_width,
            max: layout.max_article_width,
            default: layout.default_article_width,
        };
        if candidate.is_consistent() {
            candidate
        } else {
            Self::default()
        }
    }

    fn is_consistent(self) -> bool {
        self.min < self.max && (self.min..=self.max).contains(&self.default)
    }

    pub fn contains(self, width: u16) -> bool {
        (self.min..=self.max).contains(&width)
    }

    fn clamp(self, width: i64) -> u16 {
        width.clamp(i64::from(self.min), i64::from(self.max)) as u16
    }
}

impl Default for WidthBounds {
    fn default() -> Self {
        Self {
            min: MIN_ARTICLE_WIDTH,
            max: MAX_ARTICLE_WIDTH,
            default: DEFAULT_ARTICLE_WIDTH,
        }
    }
}

/// Owns the article width and at most one drag session.
pub struct ResizeController {
    bounds: WidthBounds,
    width: u16,
    state: DragState,
}

impl ResizeController {
    /// Restore the width from a persisted value. An integer within the
    /// bounds is used verbatim; anything else (absent, non-numeric,
    /// out of range) falls back to the default. Never fails.
    pub fn restore(bounds: WidthBounds, saved: Option<&str>) -> Self {
        let width = saved
            .and_then(|raw| raw.trim().parse::<u16>().ok())
            .filter(|width| bounds.contains(*width))
            .unwrap_or(bounds.default);
        Self {
            bounds,
            width,
            state: DragState::Idle,
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn bounds(&self) -> WidthBounds {
        self.bounds
    }

    pub fn dragging(&self) -> bool {
        !matches!(self.state, DragState::Idle)
    }

    /// Start a drag session at `pointer_x` (layout units). Ignored while a
    /// session is already active; returns whether a session was started.
    pub fn begin_drag(&mut self, edge: Edge, pointer_x: i32) -> bool {
        if self.dragging() {
            return false;
        }
        self.state = DragState::Active {
            edge,
            anchor_x: pointer_x,
            anchor_width: self.width,
        };
        true
    }

    /// Update the width from a pointer position. No-op when idle.
    pub fn pointer_moved(&mut self, pointer_x: i32) {
        let DragState::Active {
            edge,
            anchor_x,
            anchor_width,
        } = self.state
        else {
            return;
        };
        let delta = i64::from(pointer_x) - i64::from(anchor_x);
        let proposed = match edge {
            Edge::Right => i64::from(anchor_width) + delta * 2,
            Edge::Left => i64::from(anchor_width) - delta * 2,
        };
        self.width = self.bounds.clamp(proposed);
    }

    /// Close the session and return the width to persist. No-op (None)
    /// when idle, so a second call has no further effect.
    pub fn end_drag(&mut self) -> Option<u16> {
        if !self.dragging() {
            return None;
        }
        self.state = DragState::Idle;
        Some(self.width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> ResizeController {
        ResizeController::restore(WidthBounds::default(), None)
    }

    #[test]
    fn restore_uses_saved_width_in_range() {
        let ctl = ResizeController::restore(WidthBounds::default(), Some("900"));
        assert_eq!(ctl.width(), 900);
    }

    #[test]
    fn restore_falls_back_on_garbage() {
        let ctl = ResizeController::restore(WidthBounds::default(), Some("abc"));
        assert_eq!(ctl.width(), DEFAULT_ARTICLE_WIDTH);
    }

    #[test]
    fn restore_falls_back_when_absent() {
        assert_eq!(controller().width(), DEFAULT_ARTICLE_WIDTH);
    }

    #[test]
    fn restore_falls_back_when_out_of_range() {
        let ctl = ResizeController::restore(WidthBounds::default(), Some("9000"));
        assert_eq!(ctl.width(), DEFAULT_ARTICLE_WIDTH);
        let ctl = ResizeController::restore(WidthBounds::default(), Some("12"));
        assert_eq!(ctl.width(), DEFAULT_ARTICLE_WIDTH);
    }

    #[test]
    fn right_edge_doubles_delta() {
        let mut ctl = controller();
        assert!(ctl.begin_drag(Edge::Right, 500));
        ctl.pointer_moved(600);
        assert_eq!(ctl.width(), 1060);
        assert_eq!(ctl.end_drag(), Some(1060));
    }

    #[test]
    fn left_edge_inverts_delta() {
        let mut ctl = controller();
        assert!(ctl.begin_drag(Edge::Left, 500));
        ctl.pointer_moved(300);
        assert_eq!(ctl.width(), 1260);
    }

    #[test]
    fn width_clamps_to_bounds_during_drag() {
        let mut ctl = controller();
        ctl.begin_drag(Edge::Right, 0);
        ctl.pointer_moved(1000);
        assert_eq!(ctl.width(), MAX_ARTICLE_WIDTH);
        ctl.pointer_moved(-1000);
        assert_eq!(ctl.width(), MIN_ARTICLE_WIDTH);
    }

    #[test]
    fn intermediate_moves_do_not_accumulate() {
        // Each move recomputes from the anchor, so a wild swing followed
        // by a return lands exactly where the pointer says.
        let mut ctl = controller();
        ctl.begin_drag(Edge::Right, 100);
        ctl.pointer_moved(5000);
        ctl.pointer_moved(150);
        assert_eq!(ctl.width(), 960);
    }

    #[test]
    fn begin_drag_is_ignored_while_active() {
        let mut ctl = controller();
        assert!(ctl.begin_drag(Edge::Right, 100));
        assert!(!ctl.begin_drag(Edge::Left, 999));
        ctl.pointer_moved(150);
        assert_eq!(ctl.width(), 960);
    }

    #[test]
    fn end_drag_is_idempotent() {
        let mut ctl = controller();
        ctl.begin_drag(Edge::Right, 0);
        ctl.pointer_moved(20);
        assert_eq!(ctl.end_drag(), Some(900));
        assert_eq!(ctl.end_drag(), None);
        assert_eq!(ctl.width(), 900);
    }

    #[test]
    fn move_and_end_without_session_are_noops() {
        let mut ctl = controller();
        ctl.pointer_moved(400);
        assert_eq!(ctl.width(), DEFAULT_ARTICLE_WIDTH);
        assert_eq!(ctl.end_drag(), None);
    }

    #[test]
    fn inconsistent_config_bounds_fall_back() {
        let layout = LayoutConfig {
            min_article_width: 800,
            max_article_width: 700,
            default_article_width: 860,
        };
        assert_eq!(WidthBounds::from_config(&layout), WidthBounds::default());

        let layout = LayoutConfig {
            min_article_width: 600,
            max_article_width: 1400,
            default_article_width: 2000,
        };
        assert_eq!(WidthBounds::from_config(&layout), WidthBounds::default());
    }

    #[test]
    fn consistent_config_bounds_are_used() {
        let layout = LayoutConfig {
            min_article_width: 400,
            max_article_width: 1000,
            default_article_width: 700,
        };
        let bounds = WidthBounds::from_config(&layout);
        assert_eq!(bounds.min, 400);
        let ctl = ResizeController::restore(bounds, None);
        assert_eq!(ctl.width(), 700);
    }
}
