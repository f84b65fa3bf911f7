//! Busy flags and request generations
//!
//! Each flag is an in-flight counter behind a RAII [`BusyGuard`], so a flag
//! reads `true` while at least one call holds it and drops back to `false`
//! on every exit path of the last one, panics included.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::events::{EventBus, StoreEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    /// Loading or resetting the mount configuration
    Config,
    /// Writing the mount configuration
    Saving,
    Modules,
    Status,
}

impl Resource {
    fn slot(self) -> usize {
        match self {
            Resource::Config => 0,
            Resource::Saving => 1,
            Resource::Modules => 2,
            Resource::Status => 3,
        }
    }
}

/// Snapshot of all busy flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyFlags {
    pub config: bool,
    pub saving: bool,
    pub modules: bool,
    pub status: bool,
}

impl BusyFlags {
    pub fn any(&self) -> bool {
        self.config || self.saving || self.modules || self.status
    }
}

#[derive(Clone)]
pub struct BusyTracker {
    counts: Arc<Mutex<[usize; 4]>>,
    events: EventBus,
}

impl BusyTracker {
    pub fn new(events: EventBus) -> Self {
        Self {
            counts: Arc::new(Mutex::new([0; 4])),
            events,
        }
    }

    /// Mark `resource` busy until the returned guard is dropped
    pub fn enter(&self, resource: Resource) -> BusyGuard {
        let became_busy = {
            let mut counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
            counts[resource.slot()] += 1;
            counts[resource.slot()] == 1
        };
        if became_busy {
            self.events.emit(StoreEvent::BusyChanged {
                resource,
                busy: true,
            });
        }
        BusyGuard {
            tracker: self.clone(),
            resource,
        }
    }

    pub fn is_busy(&self, resource: Resource) -> bool {
        let counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        counts[resource.slot()] > 0
    }

    pub fn flags(&self) -> BusyFlags {
        let counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        BusyFlags {
            config: counts[Resource::Config.slot()] > 0,
            saving: counts[Resource::Saving.slot()] > 0,
            modules: counts[Resource::Modules.slot()] > 0,
            status: counts[Resource::Status.slot()] > 0,
        }
    }

    fn leave(&self, resource: Resource) {
        let became_idle = {
            let mut counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
            let count = &mut counts[resource.slot()];
            *count = count.saturating_sub(1);
            *count == 0
        };
        if became_idle {
            self.events.emit(StoreEvent::BusyChanged {
                resource,
                busy: false,
            });
        }
    }
}

#[must_use = "the resource is only busy while the guard is alive"]
pub struct BusyGuard {
    tracker: BusyTracker,
    resource: Resource,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.tracker.leave(self.resource);
    }
}

/// Latest issued request number per replaceable resource
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Generations {
    config: u64,
    modules: u64,
    status: u64,
}

impl Generations {
    /// Issue a new generation for `resource`, superseding older ones
    pub fn advance(&mut self, resource: Resource) -> u64 {
        let counter = match resource {
            // A save replaces nothing in memory; it shares the config counter
            Resource::Config | Resource::Saving => &mut self.config,
            Resource::Modules => &mut self.modules,
            Resource::Status => &mut self.status,
        };
        *counter += 1;
        *counter
    }

    pub fn is_current(&self, resource: Resource, generation: u64) -> bool {
        let current = match resource {
            Resource::Config | Resource::Saving => self.config,
            Resource::Modules => self.modules,
            Resource::Status => self.status,
        };
        current == generation
    }
}
