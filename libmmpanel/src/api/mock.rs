//! Mock provider for tests and off-device runs
//!
//! Serves a fixed demo inventory by default. Every operation can be made to
//! fail or to take longer, and calls are counted, so tests can drive the
//! store through failure and overlap scenarios without a device.
//!
//! Data is read when a call starts, before any simulated delay. A test can
//! therefore change the canned data between two overlapping calls and tell
//! their responses apart.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::sleep;

use super::PanelApi;
use crate::error::{CommandError, Result};
use crate::mount_config::MountConfig;
use crate::types::{DeviceStatus, Module, ModuleRules, StorageUsage, SystemInfo, MAGIC_MODE};

/// Operations of [`PanelApi`], used to target failures and delays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    LoadConfig,
    SaveConfig,
    ScanModules,
    StorageUsage,
    SystemInfo,
    DeviceStatus,
    Version,
    AccentColor,
    DarkMode,
    Reboot,
    OpenLink,
}

impl fmt::Display for MockOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MockOp::LoadConfig => "load_config",
            MockOp::SaveConfig => "save_config",
            MockOp::ScanModules => "scan_modules",
            MockOp::StorageUsage => "storage_usage",
            MockOp::SystemInfo => "system_info",
            MockOp::DeviceStatus => "device_status",
            MockOp::Version => "version",
            MockOp::AccentColor => "accent_color",
            MockOp::DarkMode => "dark_mode",
            MockOp::Reboot => "reboot",
            MockOp::OpenLink => "open_link",
        };
        f.write_str(name)
    }
}

/// Canned data and behaviour of a [`MockApi`]
#[derive(Debug, Clone)]
pub struct MockState {
    pub config: MountConfig,
    pub modules: Vec<Module>,
    pub storage: StorageUsage,
    pub system: SystemInfo,
    pub device: DeviceStatus,
    pub version: String,
    pub accent_color: Option<String>,
    /// Night mode reported by the system; `None` means "follows a schedule"
    pub dark_mode: Option<bool>,

    /// Operations that currently fail
    pub failing: HashSet<MockOp>,
    /// One-shot delays, consumed per call before falling back to the default
    pub delays: HashMap<MockOp, VecDeque<Duration>>,
    pub default_delay: Duration,

    pub calls: HashMap<MockOp, usize>,
    /// Configs accepted by `save_config`, oldest first
    pub saved: Vec<MountConfig>,
    pub opened_links: Vec<String>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            config: MountConfig {
                verbose: true,
                partitions: vec![
                    "product".to_string(),
                    "system_ext".to_string(),
                    "vendor".to_string(),
                ],
                ..MountConfig::default()
            },
            modules: demo_modules(),
            storage: StorageUsage {
                kind: Some("ext4".to_string()),
                percent: "42%".to_string(),
                size: "118 GB".to_string(),
                used: "50 GB".to_string(),
                hymofs_available: false,
            },
            system: SystemInfo {
                kernel: "5.10.101-android12-9-00001-g532145".to_string(),
                selinux: "Enforcing".to_string(),
                mount_base: "/data/adb/modules".to_string(),
                active_mounts: vec!["youtube-revanced".to_string(), "pixelfy-gphotos".to_string()],
            },
            device: DeviceStatus {
                model: "Pixel 8 Pro (Mock)".to_string(),
                android: "14".to_string(),
                kernel: "5.10.101-mock".to_string(),
                selinux: "Enforcing".to_string(),
            },
            version: "1.2.0-mock".to_string(),
            accent_color: Some("#50a48f".to_string()),
            dark_mode: None,
            failing: HashSet::new(),
            delays: HashMap::new(),
            default_delay: Duration::ZERO,
            calls: HashMap::new(),
            saved: Vec::new(),
            opened_links: Vec::new(),
        }
    }
}

fn demo_module(id: &str, name: &str, version: &str, author: &str, description: &str, mounted: bool) -> Module {
    Module {
        id: id.to_string(),
        name: name.to_string(),
        version: version.to_string(),
        author: author.to_string(),
        description: description.to_string(),
        is_mounted: mounted,
        mode: MAGIC_MODE.to_string(),
        rules: ModuleRules::default(),
    }
}

/// The three modules served by a fresh [`MockApi`]
pub fn demo_modules() -> Vec<Module> {
    vec![
        demo_module(
            "youtube-revanced",
            "YouTube ReVanced",
            "18.20.39",
            "ReVanced Team",
            "YouTube ReVanced Module",
            true,
        ),
        demo_module(
            "pixelfy-gphotos",
            "Pixelfy GPhotos",
            "2.1",
            "PixelProps",
            "Unlimited Google Photos backup for Pixel devices.",
            true,
        ),
        demo_module(
            "sound-enhancer",
            "Sound Enhancer",
            "1.0",
            "AudioMod",
            "Improves system audio quality. Currently disabled.",
            false,
        ),
    ]
}

/// Mock provider; clones share state
#[derive(Debug, Clone, Default)]
pub struct MockApi {
    state: Arc<Mutex<MockState>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: MockState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Every call waits `delay` unless a one-shot delay is queued
    pub fn with_delay(delay: Duration) -> Self {
        Self::from_state(MockState {
            default_delay: delay,
            ..MockState::default()
        })
    }

    /// A provider whose every operation fails
    pub fn failing() -> Self {
        let api = Self::new();
        for op in [
            MockOp::LoadConfig,
            MockOp::SaveConfig,
            MockOp::ScanModules,
            MockOp::StorageUsage,
            MockOp::SystemInfo,
            MockOp::DeviceStatus,
            MockOp::Version,
            MockOp::AccentColor,
            MockOp::DarkMode,
            MockOp::Reboot,
            MockOp::OpenLink,
        ] {
            api.set_failing(op, true);
        }
        api
    }

    pub fn set_failing(&self, op: MockOp, failing: bool) {
        let mut state = self.lock();
        if failing {
            state.failing.insert(op);
        } else {
            state.failing.remove(&op);
        }
    }

    /// Delay only the next call of `op`
    pub fn push_delay(&self, op: MockOp, delay: Duration) {
        self.lock().delays.entry(op).or_default().push_back(delay);
    }

    pub fn set_modules(&self, modules: Vec<Module>) {
        self.lock().modules = modules;
    }

    pub fn set_config(&self, config: MountConfig) {
        self.lock().config = config;
    }

    pub fn set_accent_color(&self, color: Option<&str>) {
        self.lock().accent_color = color.map(str::to_string);
    }

    pub fn set_dark_mode(&self, dark: Option<bool>) {
        self.lock().dark_mode = dark;
    }

    pub fn call_count(&self, op: MockOp) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn saved_configs(&self) -> Vec<MountConfig> {
        self.lock().saved.clone()
    }

    pub fn opened_links(&self) -> Vec<String> {
        self.lock().opened_links.clone()
    }

    /// Inspect or tweak the state directly
    pub fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        f(&mut self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Count the call, read the response, then wait and fail as configured
    async fn respond<T, F>(&self, op: MockOp, read: F) -> Result<T>
    where
        F: FnOnce(&MockState) -> T + Send,
        T: Send,
    {
        let (delay, failing, value) = {
            let mut state = self.lock();
            *state.calls.entry(op).or_default() += 1;
            let default_delay = state.default_delay;
            let delay = state
                .delays
                .get_mut(&op)
                .and_then(VecDeque::pop_front)
                .unwrap_or(default_delay);
            let failing = state.failing.contains(&op);
            (delay, failing, read(&state))
        };

        if !delay.is_zero() {
            sleep(delay).await;
        }

        if failing {
            tracing::debug!(%op, "mock failure");
            return Err(CommandError::NonZeroExit {
                code: 1,
                stderr: format!("mock {} failed", op),
            }
            .into());
        }
        Ok(value)
    }
}

#[async_trait]
impl PanelApi for MockApi {
    async fn load_config(&self) -> Result<MountConfig> {
        self.respond(MockOp::LoadConfig, |s| s.config.clone()).await
    }

    async fn save_config(&self, config: &MountConfig) -> Result<()> {
        self.respond(MockOp::SaveConfig, |_| ()).await?;
        let mut state = self.lock();
        state.config = config.clone();
        state.saved.push(config.clone());
        Ok(())
    }

    async fn scan_modules(&self, module_dir: &str) -> Result<Vec<Module>> {
        tracing::debug!(module_dir, "mock scan");
        self.respond(MockOp::ScanModules, |s| s.modules.clone()).await
    }

    async fn storage_usage(&self) -> Result<StorageUsage> {
        self.respond(MockOp::StorageUsage, |s| s.storage.clone()).await
    }

    async fn system_info(&self) -> Result<SystemInfo> {
        self.respond(MockOp::SystemInfo, |s| s.system.clone()).await
    }

    async fn device_status(&self) -> Result<DeviceStatus> {
        self.respond(MockOp::DeviceStatus, |s| s.device.clone()).await
    }

    async fn version(&self) -> Result<String> {
        self.respond(MockOp::Version, |s| s.version.clone()).await
    }

    async fn system_accent_color(&self) -> Result<Option<String>> {
        self.respond(MockOp::AccentColor, |s| s.accent_color.clone())
            .await
    }

    async fn system_dark_mode(&self) -> Result<Option<bool>> {
        self.respond(MockOp::DarkMode, |s| s.dark_mode).await
    }

    async fn reboot(&self) -> Result<()> {
        self.respond(MockOp::Reboot, |_| ()).await?;
        tracing::info!("mock reboot requested");
        Ok(())
    }

    async fn open_link(&self, url: &str) -> Result<()> {
        self.respond(MockOp::OpenLink, |_| ()).await?;
        self.lock().opened_links.push(url.to_string());
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
