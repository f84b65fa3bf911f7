//! Single-slot transient notifications
//!
//! At most one toast is visible. Showing a new one replaces the current toast
//! immediately and aborts its pending auto-dismiss task; dismissal also
//! compares ids, so a timer that fires late can never hide a newer toast.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::events::{EventBus, StoreEvent};

/// How long a toast stays visible unless superseded or dismissed
pub const TOAST_DURATION: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Success => write!(f, "success"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Toast {
    pub id: u64,
    pub text: String,
    pub severity: Severity,
    pub visible: bool,
    pub shown_at: DateTime<Utc>,
}

#[derive(Default)]
struct Slot {
    toast: Option<Toast>,
    timer: Option<JoinHandle<()>>,
}

/// Cheap to clone; clones share the same slot
#[derive(Clone)]
pub struct NotificationQueue {
    slot: Arc<Mutex<Slot>>,
    next_id: Arc<AtomicU64>,
    duration: Duration,
    events: EventBus,
}

impl NotificationQueue {
    pub fn new(events: EventBus) -> Self {
        Self::with_duration(events, TOAST_DURATION)
    }

    pub fn with_duration(events: EventBus, duration: Duration) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot::default())),
            next_id: Arc::new(AtomicU64::new(0)),
            duration,
            events,
        }
    }

    /// Show a toast, superseding the current one. Returns the new toast id.
    ///
    /// Auto-dismissal needs a tokio runtime; without one the toast stays
    /// until it is superseded or dismissed manually.
    pub fn show(&self, text: impl Into<String>, severity: Severity) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let toast = Toast {
            id,
            text: text.into(),
            severity,
            visible: true,
            shown_at: Utc::now(),
        };

        match severity {
            Severity::Error => tracing::error!(id, "{}", toast.text),
            Severity::Warning => tracing::warn!(id, "{}", toast.text),
            Severity::Info | Severity::Success => tracing::info!(id, "{}", toast.text),
        }

        {
            // Slot is updated before the timer can observe it
            let mut slot = self.lock();
            if let Some(previous) = slot.timer.take() {
                previous.abort();
            }
            slot.toast = Some(toast.clone());
            slot.timer = match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let queue = self.clone();
                    let duration = self.duration;
                    Some(handle.spawn(async move {
                        tokio::time::sleep(duration).await;
                        queue.expire(id);
                    }))
                }
                Err(_) => {
                    tracing::debug!(id, "no runtime, toast will not auto-dismiss");
                    None
                }
            };
        }

        self.events.emit(StoreEvent::ToastShown { toast });
        id
    }

    /// Hide the toast with `id` if it is still the current one.
    ///
    /// Returns whether anything was hidden.
    pub fn dismiss(&self, id: u64) -> bool {
        let hidden = {
            let mut slot = self.lock();
            let hidden = Self::hide(&mut slot, id);
            if hidden {
                if let Some(timer) = slot.timer.take() {
                    timer.abort();
                }
            }
            hidden
        };
        if hidden {
            self.events.emit(StoreEvent::ToastDismissed { id });
        }
        hidden
    }

    /// The toast in the slot, visible or not
    pub fn current(&self) -> Option<Toast> {
        self.lock().toast.clone()
    }

    /// The toast in the slot, only while visible
    pub fn visible(&self) -> Option<Toast> {
        self.lock().toast.clone().filter(|t| t.visible)
    }

    // Called from the timer task; must not abort its own handle.
    fn expire(&self, id: u64) {
        let hidden = {
            let mut slot = self.lock();
            let hidden = Self::hide(&mut slot, id);
            if hidden {
                slot.timer = None;
            }
            hidden
        };
        if hidden {
            self.events.emit(StoreEvent::ToastDismissed { id });
        } else {
            tracing::trace!(id, "stale toast timer ignored");
        }
    }

    fn hide(slot: &mut Slot, id: u64) -> bool {
        match slot.toast.as_mut() {
            Some(toast) if toast.id == id && toast.visible => {
                toast.visible = false;
                true
            }
            _ => false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}
