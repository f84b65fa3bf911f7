//! mm-panel - control panel state for magic mount
//!
//! This library holds the application state and synchronization layer of
//! the magic mount control panel: the config file codec, theme and locale
//! resolution, transient notifications, the async store that talks to the
//! device, and the swipe navigation state machine. Front-ends only render
//! snapshots and call store operations.

pub mod api;
pub mod config;
pub mod draft;
pub mod error;
pub mod events;
pub mod executor;
pub mod locale;
pub mod logging;
pub mod mount_config;
pub mod nav;
pub mod notify;
pub mod prefs;
pub mod store;
pub mod theme;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{PanelError, Result};
pub use events::{EventBus, StoreEvent};
pub use mount_config::MountConfig;
pub use notify::{Severity, Toast};
pub use store::{Resource, Store};
pub use theme::ThemeMode;
pub use types::{DeviceStatus, Module, ModuleSummary, StorageUsage, SystemInfo};
