//! Swipe navigation between tabs
//!
//! A two-state machine (idle, dragging) turning a horizontal touch gesture
//! into either a live drag offset or a discrete tab change. Vertical
//! gestures are left alone so page content can scroll.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fraction of the viewport a drag must exceed to change tabs
pub const COMMIT_RATIO: f64 = 0.33;

/// Commit threshold used while the viewport width is unknown
pub const FALLBACK_THRESHOLD_PX: f64 = 80.0;

/// Offset divisor applied when dragging past the first or last tab
pub const EDGE_DAMPING: f64 = 3.0;

/// Transition applied to the track whenever no finger is down
pub const TRANSITION: &str = "transform 300ms cubic-bezier(0.25, 0.8, 0.5, 1)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    Status,
    Config,
    Modules,
    Info,
}

impl Tab {
    /// Tabs in track order
    pub const ALL: [Tab; 4] = [Tab::Status, Tab::Config, Tab::Modules, Tab::Info];

    pub fn id(self) -> &'static str {
        match self {
            Tab::Status => "status",
            Tab::Config => "config",
            Tab::Modules => "modules",
            Tab::Info => "info",
        }
    }

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl FromStr for Tab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.id() == s)
            .ok_or_else(|| format!("Unknown tab: '{}'", s))
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Ephemeral navigation state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NavigationState {
    pub active_index: usize,
    pub drag_offset_px: f64,
    pub dragging: bool,
    pub viewport_width_px: f64,
}

/// What a touch move did with the gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Not dragging, or the gesture is mostly vertical
    Ignored,
    /// Horizontal drag claimed; the caller should suppress the default action
    /// when `prevent_default` is set
    Claimed { prevent_default: bool },
}

/// Where the tab track should be drawn
#[derive(Debug, Clone, PartialEq)]
pub struct TrackTransform {
    /// Track translation in percent of the track width
    pub base_percent: f64,
    /// Additional translation in pixels from the live drag
    pub offset_px: f64,
    pub transition: Option<&'static str>,
}

impl TrackTransform {
    /// CSS `transform` value
    pub fn css(&self) -> String {
        format!(
            "translateX(calc({}% + {}px))",
            self.base_percent, self.offset_px
        )
    }
}

#[derive(Debug, Clone)]
pub struct SwipeNavigator {
    tab_count: usize,
    state: NavigationState,
    start: (f64, f64),
}

impl Default for SwipeNavigator {
    fn default() -> Self {
        Self::new(Tab::ALL.len())
    }
}

impl SwipeNavigator {
    pub fn new(tab_count: usize) -> Self {
        Self {
            tab_count: tab_count.max(1),
            state: NavigationState {
                active_index: 0,
                drag_offset_px: 0.0,
                dragging: false,
                viewport_width_px: 0.0,
            },
            start: (0.0, 0.0),
        }
    }

    pub fn state(&self) -> NavigationState {
        self.state
    }

    pub fn active_index(&self) -> usize {
        self.state.active_index
    }

    pub fn tab_count(&self) -> usize {
        self.tab_count
    }

    pub fn set_viewport_width(&mut self, width_px: f64) {
        self.state.viewport_width_px = width_px.max(0.0);
    }

    /// Jump to a tab (nav-bar tap). Ignored while dragging or out of range.
    pub fn select(&mut self, index: usize) -> bool {
        if self.state.dragging || index >= self.tab_count {
            return false;
        }
        self.state.active_index = index;
        true
    }

    pub fn touch_start(&mut self, x: f64, y: f64) {
        self.start = (x, y);
        self.state.drag_offset_px = 0.0;
        self.state.dragging = true;
    }

    pub fn touch_move(&mut self, x: f64, y: f64, cancelable: bool) -> MoveOutcome {
        if !self.state.dragging {
            return MoveOutcome::Ignored;
        }

        let dx = x - self.start.0;
        let dy = y - self.start.1;
        if dy.abs() > dx.abs() {
            return MoveOutcome::Ignored;
        }

        let at_first = self.state.active_index == 0;
        let at_last = self.state.active_index + 1 >= self.tab_count;
        let past_edge = (at_first && dx > 0.0) || (at_last && dx < 0.0);

        self.state.drag_offset_px = if past_edge { dx / EDGE_DAMPING } else { dx };
        MoveOutcome::Claimed {
            prevent_default: cancelable,
        }
    }

    /// Finish the gesture. Returns the new index when it changed tabs.
    pub fn touch_end(&mut self) -> Option<usize> {
        if !self.state.dragging {
            return None;
        }

        let threshold = self.threshold();
        let offset = self.state.drag_offset_px;
        let index = self.state.active_index;

        let committed = if offset < -threshold && index + 1 < self.tab_count {
            Some(index + 1)
        } else if offset > threshold && index > 0 {
            Some(index - 1)
        } else {
            None
        };

        if let Some(next) = committed {
            self.state.active_index = next;
        }
        self.state.drag_offset_px = 0.0;
        self.state.dragging = false;
        committed
    }

    /// Same resolution as [`touch_end`](Self::touch_end)
    pub fn touch_cancel(&mut self) -> Option<usize> {
        self.touch_end()
    }

    pub fn threshold(&self) -> f64 {
        if self.state.viewport_width_px > 0.0 {
            self.state.viewport_width_px * COMMIT_RATIO
        } else {
            FALLBACK_THRESHOLD_PX
        }
    }

    pub fn transform(&self) -> TrackTransform {
        let step = 100.0 / self.tab_count as f64;
        TrackTransform {
            base_percent: -(self.state.active_index as f64) * step,
            offset_px: self.state.drag_offset_px,
            transition: (!self.state.dragging).then_some(TRANSITION),
        }
    }
}
