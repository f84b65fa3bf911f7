//! Store-owned state and the read-only snapshots handed to consumers

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::busy::Generations;
use crate::locale::{LocaleRegistry, LocaleResolver, FALLBACK_CODE};
use crate::mount_config::MountConfig;
use crate::nav::SwipeNavigator;
use crate::theme::{AppliedTheme, ThemeState};
use crate::types::{DeviceStatus, Module, ModuleSummary, StorageUsage, SystemInfo};

/// Shown until the mount tool reports its version
pub const VERSION_PLACEHOLDER: &str = "...";

pub(crate) struct StoreState {
    pub config: MountConfig,
    pub modules: Vec<Module>,
    pub device: DeviceStatus,
    pub system: SystemInfo,
    pub storage: StorageUsage,
    pub version: String,
    pub active_partitions: Vec<String>,

    pub theme: ThemeState,
    pub applied_theme: AppliedTheme,
    /// Language the user asked for; the active bundle may differ
    pub lang: String,
    pub locale: LocaleResolver,
    pub fix_bottom_nav: bool,

    pub nav: SwipeNavigator,
    pub generations: Generations,
}

impl StoreState {
    pub fn new(registry: Arc<LocaleRegistry>) -> Self {
        let theme = ThemeState::default();
        let applied_theme = theme.apply();
        Self {
            config: MountConfig::default(),
            modules: Vec::new(),
            device: DeviceStatus::default(),
            system: SystemInfo::default(),
            storage: StorageUsage::default(),
            version: VERSION_PLACEHOLDER.to_string(),
            active_partitions: Vec::new(),
            theme,
            applied_theme,
            lang: FALLBACK_CODE.to_string(),
            locale: LocaleResolver::new(registry),
            fix_bottom_nav: false,
            nav: SwipeNavigator::default(),
            generations: Generations::default(),
        }
    }

    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            device: self.device.clone(),
            version: self.version.clone(),
            storage: self.storage.clone(),
            system: self.system.clone(),
            active_partitions: self.active_partitions.clone(),
            summary: ModuleSummary::from_modules(&self.modules),
        }
    }
}

/// Everything the status page shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub device: DeviceStatus,
    pub version: String,
    pub storage: StorageUsage,
    pub system: SystemInfo,
    pub active_partitions: Vec<String>,
    pub summary: ModuleSummary,
}
