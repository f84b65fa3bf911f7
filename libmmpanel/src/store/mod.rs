//! The panel store
//!
//! [`Store`] owns every piece of panel state and is the only thing that
//! mutates it. Front-ends hold a clone, call its operations and read
//! snapshots; they learn about changes by subscribing to the
//! [`EventBus`](crate::events::EventBus).
//!
//! # Operations
//!
//! - `init`: restore preferences, follow the system theme (or ask the
//!   provider for night mode once), fetch the accent seed, then load config
//!   and status concurrently
//! - `load_config` / `save_config` / `reset_config`: the mount configuration
//! - `load_modules`: module inventory, replaced wholesale; `search_modules`
//!   filters the last inventory without rescanning
//! - `load_status`: device, version, storage and system queries
//! - `reboot_device`
//!
//! Each operation holds a busy flag for its resource while in flight.
//! Loads are numbered per resource; a response that arrives after a newer
//! request was issued is dropped.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use libmmpanel::api::MockApi;
//! use libmmpanel::prefs::MemoryPreferences;
//! use libmmpanel::store::Store;
//!
//! # async fn example() -> libmmpanel::Result<()> {
//! let store = Store::new(Arc::new(MockApi::new()), Arc::new(MemoryPreferences::new()));
//! let mut events = store.subscribe();
//!
//! store.init(None).await?;
//! println!("{} modules", store.modules().len());
//! # Ok(())
//! # }
//! ```

pub mod busy;
pub mod state;

pub use busy::{BusyFlags, BusyGuard, Resource};
pub use state::{StatusSnapshot, VERSION_PLACEHOLDER};

use futures::future::{join, join4};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

use self::busy::BusyTracker;
use self::state::StoreState;
use crate::api::PanelApi;
use crate::error::{PanelError, Result};
use crate::events::{EventBus, EventReceiver, StoreEvent};
use crate::locale::{Language, Locale, LocaleRegistry, FALLBACK_CODE};
use crate::mount_config::MountConfig;
use crate::nav::{NavigationState, SwipeNavigator};
use crate::notify::{NotificationQueue, Severity};
use crate::prefs::{PreferenceStore, FIX_NAV_KEY, LANG_KEY, THEME_KEY};
use crate::theme::{AppliedTheme, ThemeMode, ThemeState};
use crate::types::{filter_modules, DeviceStatus, Module, ModuleSummary, StorageUsage, SystemInfo};

/// Application state and the operations that change it
///
/// Cloning is cheap; clones share the same state.
#[derive(Clone)]
pub struct Store {
    api: Arc<dyn PanelApi>,
    prefs: Arc<dyn PreferenceStore>,
    registry: Arc<LocaleRegistry>,
    state: Arc<Mutex<StoreState>>,
    busy: BusyTracker,
    toasts: NotificationQueue,
    events: EventBus,
    initialized: Arc<AtomicBool>,
}

impl Store {
    /// Create a store with the built-in locale bundles
    pub fn new(api: Arc<dyn PanelApi>, prefs: Arc<dyn PreferenceStore>) -> Self {
        Self::with_locales(api, prefs, LocaleRegistry::builtin())
    }

    pub fn with_locales(
        api: Arc<dyn PanelApi>,
        prefs: Arc<dyn PreferenceStore>,
        registry: LocaleRegistry,
    ) -> Self {
        let registry = Arc::new(registry);
        let events = EventBus::default();
        Self {
            api,
            prefs,
            state: Arc::new(Mutex::new(StoreState::new(Arc::clone(&registry)))),
            registry,
            busy: BusyTracker::new(events.clone()),
            toasts: NotificationQueue::new(events.clone()),
            events,
            initialized: Arc::new(AtomicBool::new(false)),
        }
    }

    /// One-time startup.
    ///
    /// `system_dark` carries the platform's dark-mode preference; while the
    /// sender lives, every change reapplies the theme. Without it the
    /// provider is asked once. Load failures are reported through toasts,
    /// not through the returned result.
    ///
    /// # Errors
    ///
    /// Returns [`PanelError::AlreadyInitialized`] on every call after the first.
    pub async fn init(&self, system_dark: Option<watch::Receiver<bool>>) -> Result<()> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return Err(PanelError::AlreadyInitialized);
        }
        tracing::debug!(provider = self.api.name(), "initializing store");

        let lang = self
            .prefs
            .get(LANG_KEY)
            .unwrap_or_else(|| FALLBACK_CODE.to_string());
        let mode = ThemeMode::from_preference(self.prefs.get(THEME_KEY).as_deref());
        let fix_nav = self.prefs.get(FIX_NAV_KEY).as_deref() == Some("true");

        let active = {
            let mut state = self.lock();
            state.lang = lang.clone();
            state.locale.load(&lang);
            state.theme.mode = mode;
            state.fix_bottom_nav = fix_nav;
            state.locale.active_code().map(str::to_string)
        };
        if let Some(code) = active {
            self.events.emit(StoreEvent::LocaleChanged { code });
        }

        if let Some(mut receiver) = system_dark {
            let initial = *receiver.borrow_and_update();
            self.lock().theme.system_prefers_dark = initial;

            let store = self.clone();
            tokio::spawn(async move {
                while receiver.changed().await.is_ok() {
                    let dark = *receiver.borrow_and_update();
                    store.set_system_dark(dark);
                }
                tracing::debug!("system theme source closed");
            });
        } else {
            match self.api.system_dark_mode().await {
                Ok(Some(dark)) => self.lock().theme.system_prefers_dark = dark,
                Ok(None) => tracing::debug!("system night mode is automatic"),
                Err(e) => tracing::debug!("night mode unavailable: {}", e),
            }
        }

        match self.api.system_accent_color().await {
            Ok(Some(color)) => {
                if !self.lock().theme.offer_seed(&color) {
                    tracing::debug!(color = %color, "ignoring unusable accent color");
                }
            }
            Ok(None) => tracing::debug!("no system accent color"),
            Err(e) => tracing::debug!("accent color unavailable: {}", e),
        }
        self.apply_theme();

        let (config, _) = join(self.load_config(), self.load_status()).await;
        if let Err(e) = config {
            tracing::debug!("initial config load failed: {}", e);
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    // ---- configuration -------------------------------------------------

    /// Replace the in-memory configuration with the persisted one
    pub async fn load_config(&self) -> Result<()> {
        let _busy = self.busy.enter(Resource::Config);
        let generation = self.lock().generations.advance(Resource::Config);

        let result = self.api.load_config().await;
        let current = self.lock().generations.is_current(Resource::Config, generation);
        if !current {
            tracing::debug!(generation, "discarding stale config response");
            return result.map(|_| ());
        }

        match result {
            Ok(config) => {
                self.lock().config = config;
                self.events.emit(StoreEvent::ConfigReplaced);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("failed to load config: {}", e);
                self.toast(Severity::Error, |l| l.common.load_failed());
                Err(e)
            }
        }
    }

    /// Write the in-memory configuration.
    ///
    /// Success and failure each show their own toast. The result lets a
    /// presenter move its dirty baseline only after a successful write.
    pub async fn save_config(&self) -> Result<()> {
        let _busy = self.busy.enter(Resource::Saving);
        let result = self.persist_config().await;
        match &result {
            Ok(()) => {
                self.toast(Severity::Success, |l| l.common.save_success());
            }
            Err(e) => {
                tracing::warn!("failed to save config: {}", e);
                self.toast(Severity::Error, |l| l.common.save_failed());
            }
        }
        self.events.emit(StoreEvent::ConfigSaved {
            success: result.is_ok(),
        });
        result
    }

    /// Restore the built-in defaults and save them
    pub async fn reset_config(&self) -> Result<()> {
        let _busy = self.busy.enter(Resource::Config);
        {
            let mut state = self.lock();
            state.generations.advance(Resource::Config);
            state.config = MountConfig::default();
        }
        self.events.emit(StoreEvent::ConfigReplaced);

        let result = {
            let _saving = self.busy.enter(Resource::Saving);
            self.persist_config().await
        };
        match &result {
            Ok(()) => {
                self.toast(Severity::Success, |l| l.common.reset_success());
            }
            Err(e) => {
                tracing::warn!("failed to save reset config: {}", e);
                self.toast(Severity::Error, |l| l.common.reset_failed());
            }
        }
        self.events.emit(StoreEvent::ConfigSaved {
            success: result.is_ok(),
        });
        result
    }

    /// Replace the configuration with a user edit
    pub fn set_config(&self, config: MountConfig) {
        self.edit_config(|current| *current = config);
    }

    /// Edit the configuration in place. Supersedes any load in flight.
    pub fn edit_config<R>(&self, edit: impl FnOnce(&mut MountConfig) -> R) -> R {
        let result = {
            let mut state = self.lock();
            state.generations.advance(Resource::Config);
            edit(&mut state.config)
        };
        self.events.emit(StoreEvent::ConfigReplaced);
        result
    }

    async fn persist_config(&self) -> Result<()> {
        let config = self.lock().config.clone();
        self.api.save_config(&config).await
    }

    // ---- modules --------------------------------------------------------

    /// Rescan modules under the configured module directory.
    ///
    /// On failure the previous list is kept.
    pub async fn load_modules(&self) -> Result<()> {
        let _busy = self.busy.enter(Resource::Modules);
        let (generation, module_dir) = {
            let mut state = self.lock();
            (
                state.generations.advance(Resource::Modules),
                state.config.module_dir.clone(),
            )
        };

        let result = self.api.scan_modules(&module_dir).await;
        let current = self.lock().generations.is_current(Resource::Modules, generation);
        if !current {
            tracing::debug!(generation, "discarding stale module scan");
            return result.map(|_| ());
        }

        match result {
            Ok(modules) => {
                let count = modules.len();
                self.lock().modules = modules;
                self.events.emit(StoreEvent::ModulesReplaced { count });
                Ok(())
            }
            Err(e) => {
                tracing::warn!("failed to load modules: {}", e);
                self.toast(Severity::Error, |l| l.modules.load_failed());
                Err(e)
            }
        }
    }

    /// Per-module rule editing is not available for magic mount
    pub fn save_modules(&self) -> u64 {
        self.toast(Severity::Info, |l| l.common.not_supported())
    }

    // ---- status ---------------------------------------------------------

    /// Refresh device, version, storage and system info.
    ///
    /// The four queries run concurrently and each success is applied on its
    /// own. Failures are logged, never toasted. Scans modules afterwards if
    /// none are known yet.
    pub async fn load_status(&self) {
        let _busy = self.busy.enter(Resource::Status);
        let generation = self.lock().generations.advance(Resource::Status);

        let (device, version, storage, system) = join4(
            self.api.device_status(),
            self.api.version(),
            self.api.storage_usage(),
            self.api.system_info(),
        )
        .await;

        let needs_modules = {
            let mut state = self.lock();
            if !state.generations.is_current(Resource::Status, generation) {
                tracing::debug!(generation, "discarding stale status queries");
                return;
            }

            match device {
                Ok(device) => state.device = device,
                Err(e) => tracing::warn!(query = "device", "status query failed: {}", e),
            }
            match version {
                Ok(version) => state.version = version,
                Err(e) => tracing::warn!(query = "version", "status query failed: {}", e),
            }
            match storage {
                Ok(storage) => state.storage = storage,
                Err(e) => tracing::warn!(query = "storage", "status query failed: {}", e),
            }
            match system {
                Ok(system) => {
                    state.active_partitions = system.active_mounts.clone();
                    state.system = system;
                }
                Err(e) => tracing::warn!(query = "system", "status query failed: {}", e),
            }

            // System info is authoritative for these two
            state.device.kernel = state.system.kernel.clone();
            state.device.selinux = state.system.selinux.clone();

            state.modules.is_empty()
        };
        self.events.emit(StoreEvent::StatusRefreshed);

        if needs_modules {
            // Failures are toasted by load_modules itself
            let _ = self.load_modules().await;
        }
    }

    /// Ask the device to reboot. Only failures produce feedback.
    pub async fn reboot_device(&self) -> Result<()> {
        self.api.reboot().await.map_err(|e| {
            tracing::warn!("reboot failed: {}", e);
            self.toast(Severity::Error, |l| l.common.reboot_failed());
            e
        })
    }

    pub async fn open_link(&self, url: &str) -> Result<()> {
        self.api.open_link(url).await.map_err(|e| {
            tracing::warn!(url, "failed to open link: {}", e);
            e
        })
    }

    // ---- theme ----------------------------------------------------------

    /// Advance auto → light → dark → auto; persists and reapplies
    pub fn toggle_theme(&self) -> ThemeMode {
        let mode = self.lock().theme.mode.next();
        self.set_theme_mode(mode);
        mode
    }

    pub fn set_theme_mode(&self, mode: ThemeMode) -> AppliedTheme {
        self.lock().theme.mode = mode;
        self.persist(THEME_KEY, &mode.to_string());
        self.apply_theme()
    }

    /// Feed the live system dark-mode preference
    pub fn set_system_dark(&self, dark: bool) -> AppliedTheme {
        self.lock().theme.system_prefers_dark = dark;
        self.apply_theme()
    }

    fn apply_theme(&self) -> AppliedTheme {
        let applied = {
            let mut state = self.lock();
            let applied = state.theme.apply();
            state.applied_theme = applied.clone();
            applied
        };
        tracing::debug!(mode = %applied.mode, dark = applied.dark, seed = %applied.seed, "theme applied");
        self.events.emit(StoreEvent::ThemeApplied {
            theme: applied.clone(),
        });
        applied
    }

    // ---- locale ---------------------------------------------------------

    /// Switch language; returns the code of the bundle now active
    pub fn set_lang(&self, code: &str) -> Option<String> {
        let active = {
            let mut state = self.lock();
            state.lang = code.to_string();
            state.locale.load(code).map(str::to_string)
        };
        self.persist(LANG_KEY, code);
        if let Some(active) = &active {
            self.events.emit(StoreEvent::LocaleChanged {
                code: active.clone(),
            });
        }
        active
    }

    pub fn available_languages(&self) -> Vec<Language> {
        self.registry.available_languages()
    }

    /// Strings of the active bundle
    pub fn strings(&self) -> Arc<Locale> {
        self.lock()
            .locale
            .active_bundle()
            .unwrap_or_else(|| Arc::new(Locale::default()))
    }

    pub fn lang(&self) -> String {
        self.lock().lang.clone()
    }

    pub fn active_lang(&self) -> Option<String> {
        self.lock().locale.active_code().map(str::to_string)
    }

    // ---- navigation -----------------------------------------------------

    pub fn toggle_bottom_nav_fix(&self) -> bool {
        let enabled = {
            let mut state = self.lock();
            state.fix_bottom_nav = !state.fix_bottom_nav;
            state.fix_bottom_nav
        };
        self.persist(FIX_NAV_KEY, if enabled { "true" } else { "false" });
        self.events.emit(StoreEvent::NavFixChanged { enabled });
        enabled
    }

    pub fn fix_bottom_nav(&self) -> bool {
        self.lock().fix_bottom_nav
    }

    /// Run `f` against the swipe navigator
    pub fn navigate<R>(&self, f: impl FnOnce(&mut SwipeNavigator) -> R) -> R {
        f(&mut self.lock().nav)
    }

    pub fn nav_state(&self) -> NavigationState {
        self.lock().nav.state()
    }

    // ---- toasts and events ----------------------------------------------

    pub fn show_toast(&self, text: impl Into<String>, severity: Severity) -> u64 {
        self.toasts.show(text, severity)
    }

    pub fn toasts(&self) -> &NotificationQueue {
        &self.toasts
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // ---- snapshots ------------------------------------------------------

    pub fn config(&self) -> MountConfig {
        self.lock().config.clone()
    }

    pub fn modules(&self) -> Vec<Module> {
        self.lock().modules.clone()
    }

    /// Modules whose name or id contains `query`, ignoring case
    pub fn search_modules(&self, query: &str) -> Vec<Module> {
        let state = self.lock();
        let found: Vec<Module> = filter_modules(&state.modules, query)
            .into_iter()
            .cloned()
            .collect();
        found
    }

    pub fn summary(&self) -> ModuleSummary {
        ModuleSummary::from_modules(&self.lock().modules)
    }

    pub fn device(&self) -> DeviceStatus {
        self.lock().device.clone()
    }

    pub fn system_info(&self) -> SystemInfo {
        self.lock().system.clone()
    }

    pub fn storage(&self) -> StorageUsage {
        self.lock().storage.clone()
    }

    pub fn version(&self) -> String {
        self.lock().version.clone()
    }

    pub fn active_partitions(&self) -> Vec<String> {
        self.lock().active_partitions.clone()
    }

    pub fn status(&self) -> StatusSnapshot {
        self.lock().status()
    }

    pub fn theme(&self) -> ThemeState {
        self.lock().theme.clone()
    }

    pub fn applied_theme(&self) -> AppliedTheme {
        self.lock().applied_theme.clone()
    }

    pub fn busy(&self) -> BusyFlags {
        self.busy.flags()
    }

    pub fn is_busy(&self, resource: Resource) -> bool {
        self.busy.is_busy(resource)
    }

    // ---- internals ------------------------------------------------------

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Show a toast with a localized text
    fn toast(&self, severity: Severity, pick: impl FnOnce(&Locale) -> &str) -> u64 {
        let text = pick(self.lock().locale.strings()).to_string();
        self.toasts.show(text, severity)
    }

    fn persist(&self, key: &str, value: &str) {
        if let Err(e) = self.prefs.set(key, value) {
            tracing::warn!(key, "failed to persist preference: {}", e);
        }
    }
}
