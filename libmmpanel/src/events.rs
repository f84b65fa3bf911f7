//! Change notifications published by the store
//!
//! The store never pushes into presentation code directly. Instead every
//! state mutation emits a [`StoreEvent`] on a `tokio::sync::broadcast`
//! channel, and any number of observers (a TUI, the CLI's toast printer,
//! tests) subscribe and re-read the snapshots they care about.
//!
//! If no subscribers exist, events are dropped immediately. Slow subscribers
//! lag without blocking the store.
//!
//! # Recomputation triggers
//!
//! | Trigger                                  | Event              |
//! |------------------------------------------|--------------------|
//! | config loaded, reset or edited           | `ConfigReplaced`   |
//! | save finished                            | `ConfigSaved`      |
//! | module scan applied                      | `ModulesReplaced`  |
//! | status queries applied                   | `StatusRefreshed`  |
//! | mode toggled or system preference change | `ThemeApplied`     |
//! | language switched                        | `LocaleChanged`    |
//! | busy counter crossed zero                | `BusyChanged`      |
//! | toast shown / hidden                     | `ToastShown` / `ToastDismissed` |

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::notify::Toast;
use crate::store::busy::Resource;
use crate::theme::AppliedTheme;

/// Event receiver type alias
pub type EventReceiver = broadcast::Receiver<StoreEvent>;

/// Default per-subscriber buffer
pub const DEFAULT_CAPACITY: usize = 100;

/// Broadcast bus for store events
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<StoreEvent>,
}

impl EventBus {
    /// Create a new event bus with the specified per-subscriber capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events emitted after this call
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Emit an event to all subscribers without blocking
    pub fn emit(&self, event: StoreEvent) {
        // send() only fails when nobody is listening
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreEvent {
    ConfigReplaced,

    ConfigSaved {
        success: bool,
    },

    ModulesReplaced {
        count: usize,
    },

    StatusRefreshed,

    ThemeApplied {
        theme: AppliedTheme,
    },

    LocaleChanged {
        code: String,
    },

    NavFixChanged {
        enabled: bool,
    },

    BusyChanged {
        resource: Resource,
        busy: bool,
    },

    ToastShown {
        toast: Toast,
    },

    ToastDismissed {
        id: u64,
    },
}
