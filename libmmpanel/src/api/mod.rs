//! Data providers for the panel
//!
//! Everything the store knows about the device comes through a
//! [`PanelApi`]. [`device::DeviceApi`] talks to the mount tool through a
//! [`CommandExecutor`](crate::executor::CommandExecutor); [`mock::MockApi`]
//! serves canned data for tests and for running the panel off-device.
//!
//! # Examples
//!
//! ```no_run
//! use libmmpanel::api::{device::DeviceApi, PanelApi};
//! use libmmpanel::config::DeviceConfig;
//! use libmmpanel::executor::ShellExecutor;
//!
//! # async fn example() -> libmmpanel::Result<()> {
//! let device = DeviceConfig::default();
//! let api = DeviceApi::new(ShellExecutor::new(&device.shell), device);
//!
//! let config = api.load_config().await?;
//! let modules = api.scan_modules(&config.module_dir).await?;
//! println!("{} modules under {}", modules.len(), config.module_dir);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;

use crate::error::Result;
use crate::mount_config::MountConfig;
use crate::types::{DeviceStatus, Module, StorageUsage, SystemInfo};

pub mod device;

// Available in all builds so the CLI can run with `--mock`
pub mod mock;

pub use device::DeviceApi;
pub use mock::MockApi;

/// Source of configuration, module inventory and device queries
#[async_trait]
pub trait PanelApi: Send + Sync {
    /// Read the persisted mount configuration
    ///
    /// A missing or empty file yields [`MountConfig::default`].
    async fn load_config(&self) -> Result<MountConfig>;

    /// Write the whole configuration back
    ///
    /// # Errors
    ///
    /// Returns `CommandError::NonZeroExit` carrying the collaborator's stderr
    /// when the write fails.
    async fn save_config(&self, config: &MountConfig) -> Result<()>;

    /// Scan installed modules
    ///
    /// Unparsable scanner output is logged and yields an empty list rather
    /// than an error.
    async fn scan_modules(&self, module_dir: &str) -> Result<Vec<Module>>;

    async fn storage_usage(&self) -> Result<StorageUsage>;

    async fn system_info(&self) -> Result<SystemInfo>;

    async fn device_status(&self) -> Result<DeviceStatus>;

    /// Version of the mount tool
    async fn version(&self) -> Result<String>;

    /// System accent color as `#rrggbb`, when the platform exposes one
    async fn system_accent_color(&self) -> Result<Option<String>>;

    /// Whether the system UI is in night mode; `None` when it switches
    /// automatically or does not say
    async fn system_dark_mode(&self) -> Result<Option<bool>>;

    async fn reboot(&self) -> Result<()>;

    async fn open_link(&self, url: &str) -> Result<()>;

    /// Provider name for logs (e.g. "device", "mock")
    fn name(&self) -> &str;
}
