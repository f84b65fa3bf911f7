//! Integration tests for the store
//!
//! Drives `Store` end to end against the mock provider: startup, the
//! config save/reset protocol, failure isolation, busy flags and stale
//! response handling.

use std::sync::Arc;
use std::time::Duration;

use libmmpanel::api::mock::{demo_modules, MockApi, MockOp};
use libmmpanel::draft::ConfigDraft;
use libmmpanel::prefs::{MemoryPreferences, PreferenceStore, FIX_NAV_KEY, LANG_KEY, THEME_KEY};
use libmmpanel::store::{Resource, Store};
use libmmpanel::{MountConfig, PanelError, Severity, StoreEvent, ThemeMode};
use tokio::sync::watch;

/// Setup a store over a fresh mock provider and empty preferences
fn setup_store() -> (Store, MockApi, Arc<MemoryPreferences>) {
    setup_store_with(MockApi::new(), MemoryPreferences::new())
}

fn setup_store_with(api: MockApi, prefs: MemoryPreferences) -> (Store, MockApi, Arc<MemoryPreferences>) {
    let prefs = Arc::new(prefs);
    let store = Store::new(Arc::new(api.clone()), prefs.clone());
    (store, api, prefs)
}

#[tokio::test]
async fn test_init_restores_preferences_and_loads_everything() {
    let prefs = MemoryPreferences::with_entries([
        (LANG_KEY, "de"),
        (THEME_KEY, "dark"),
        (FIX_NAV_KEY, "true"),
    ]);
    let (store, api, _prefs) = setup_store_with(MockApi::new(), prefs);

    store.init(None).await.unwrap();

    assert_eq!(store.active_lang().as_deref(), Some("de"));
    assert_eq!(store.strings().common.save_success(), "Gespeichert");
    assert_eq!(store.theme().mode, ThemeMode::Dark);
    assert!(store.applied_theme().dark);
    assert_eq!(store.applied_theme().seed, "#50a48f");
    assert!(store.fix_bottom_nav());

    assert_eq!(store.config(), api.with_state(|s| s.config.clone()));
    assert_eq!(store.version(), "1.2.0-mock");
    assert_eq!(store.modules().len(), 3);
    assert_eq!(store.active_partitions(), vec!["youtube-revanced", "pixelfy-gphotos"]);

    // kernel and selinux come from system info, not the device status
    let device = store.device();
    assert_eq!(device.model, "Pixel 8 Pro (Mock)");
    assert_eq!(device.kernel, "5.10.101-android12-9-00001-g532145");
    assert_eq!(device.selinux, "Enforcing");

    assert!(!store.busy().any());
}

#[tokio::test]
async fn test_init_twice_is_rejected() {
    let (store, api, _prefs) = setup_store();
    store.init(None).await.unwrap();

    let second = store.init(None).await;
    assert!(matches!(second, Err(PanelError::AlreadyInitialized)));
    assert_eq!(api.call_count(MockOp::LoadConfig), 1);
    assert!(store.is_initialized());
}

#[tokio::test]
async fn test_first_run_defaults() {
    let (store, _api, _prefs) = setup_store();
    store.init(None).await.unwrap();

    assert_eq!(store.lang(), "en");
    assert_eq!(store.active_lang().as_deref(), Some("en"));
    assert_eq!(store.theme().mode, ThemeMode::Auto);
    assert!(!store.fix_bottom_nav());
}

#[tokio::test]
async fn test_unknown_saved_language_falls_back_to_en() {
    let prefs = MemoryPreferences::with_entries([(LANG_KEY, "xx")]);
    let (store, _api, _prefs) = setup_store_with(MockApi::new(), prefs);
    store.init(None).await.unwrap();

    assert_eq!(store.lang(), "xx");
    assert_eq!(store.active_lang().as_deref(), Some("en"));
}

#[tokio::test]
async fn test_unusable_accent_color_keeps_default_seed() {
    let api = MockApi::new();
    api.set_accent_color(Some("teal"));
    let (store, _api, _prefs) = setup_store_with(api, MemoryPreferences::new());
    store.init(None).await.unwrap();

    assert_eq!(store.applied_theme().seed, libmmpanel::theme::DEFAULT_SEED);
}

#[tokio::test]
async fn test_failed_module_load_keeps_previous_list() {
    let (store, api, _prefs) = setup_store();
    store.load_modules().await.unwrap();
    assert_eq!(store.modules(), demo_modules());

    api.set_failing(MockOp::ScanModules, true);
    let result = store.load_modules().await;

    assert!(result.is_err());
    assert_eq!(store.modules(), demo_modules());
    let toast = store.toasts().visible().unwrap();
    assert_eq!(toast.severity, Severity::Error);
    assert_eq!(toast.text, "Failed to load modules");
    assert!(!store.is_busy(Resource::Modules));
}

#[tokio::test]
async fn test_busy_flags_clear_after_failures() {
    let (store, _api, _prefs) = setup_store_with(MockApi::failing(), MemoryPreferences::new());

    // failures during init are reported through toasts only
    store.init(None).await.unwrap();
    assert!(!store.busy().any());

    assert!(store.load_config().await.is_err());
    assert!(store.save_config().await.is_err());
    assert!(store.reset_config().await.is_err());
    assert!(store.load_modules().await.is_err());
    store.load_status().await;
    assert!(store.reboot_device().await.is_err());

    assert!(!store.busy().any());
}

#[tokio::test(start_paused = true)]
async fn test_busy_flag_is_set_while_in_flight() {
    let (store, api, _prefs) = setup_store();
    api.push_delay(MockOp::LoadConfig, Duration::from_millis(200));

    let pending = tokio::spawn({
        let store = store.clone();
        async move { store.load_config().await }
    });
    tokio::task::yield_now().await;
    assert!(store.busy().config);
    assert!(!store.busy().saving);

    pending.await.unwrap().unwrap();
    assert!(!store.busy().config);
}

#[tokio::test(start_paused = true)]
async fn test_stale_module_scan_is_discarded() {
    let (store, api, _prefs) = setup_store();
    api.push_delay(MockOp::ScanModules, Duration::from_millis(500));

    let slow = tokio::spawn({
        let store = store.clone();
        async move { store.load_modules().await }
    });
    tokio::task::yield_now().await;

    let newer = vec![demo_modules().remove(2)];
    api.set_modules(newer.clone());
    store.load_modules().await.unwrap();
    assert_eq!(store.modules(), newer);
    assert!(store.busy().modules, "slow scan still in flight");

    slow.await.unwrap().unwrap();
    assert_eq!(store.modules(), newer);
    assert!(!store.busy().modules);
}

#[tokio::test(start_paused = true)]
async fn test_stale_config_load_does_not_clobber_reset() {
    let (store, api, _prefs) = setup_store();
    api.push_delay(MockOp::LoadConfig, Duration::from_millis(500));

    let slow = tokio::spawn({
        let store = store.clone();
        async move { store.load_config().await }
    });
    tokio::task::yield_now().await;

    store.reset_config().await.unwrap();
    slow.await.unwrap().unwrap();

    assert_eq!(store.config(), MountConfig::default());
}

#[tokio::test]
async fn test_save_config_success_and_failure_are_distinct() {
    let (store, api, _prefs) = setup_store();
    store.load_config().await.unwrap();

    store.edit_config(|config| config.partitions.push("odm".to_string()));
    store.save_config().await.unwrap();
    let saved = api.saved_configs();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].partitions.last().map(String::as_str), Some("odm"));
    let toast = store.toasts().visible().unwrap();
    assert_eq!((toast.text.as_str(), toast.severity), ("Saved", Severity::Success));

    api.set_failing(MockOp::SaveConfig, true);
    assert!(store.save_config().await.is_err());
    let toast = store.toasts().visible().unwrap();
    assert_eq!(
        (toast.text.as_str(), toast.severity),
        ("Failed to save config", Severity::Error)
    );
}

#[tokio::test]
async fn test_reset_config_saves_defaults() {
    let (store, api, _prefs) = setup_store();
    store.set_config(MountConfig {
        module_dir: "/data/adb/custom".to_string(),
        verbose: true,
        ..MountConfig::default()
    });

    store.reset_config().await.unwrap();

    assert_eq!(store.config(), MountConfig::default());
    assert_eq!(api.saved_configs(), vec![MountConfig::default()]);
    assert_eq!(store.toasts().visible().unwrap().text, "Config Reset");

    api.set_failing(MockOp::SaveConfig, true);
    assert!(store.reset_config().await.is_err());
    assert_eq!(store.toasts().visible().unwrap().text, "Failed to reset");
}

#[tokio::test]
async fn test_status_failures_are_silent() {
    let api = MockApi::new();
    api.set_failing(MockOp::DeviceStatus, true);
    api.set_failing(MockOp::StorageUsage, true);
    let (store, _api, _prefs) = setup_store_with(api, MemoryPreferences::new());

    store.load_status().await;

    assert!(store.toasts().visible().is_none());
    assert_eq!(store.device().model, "-");
    assert_eq!(store.device().kernel, "5.10.101-android12-9-00001-g532145");
    assert_eq!(store.storage().percent, "0%");
    assert_eq!(store.version(), "1.2.0-mock");
    // modules were empty, so status loading scanned them
    assert_eq!(store.summary().total, 3);
    assert_eq!(store.summary().skipped, 1);
}

#[tokio::test]
async fn test_status_does_not_rescan_known_modules() {
    let (store, api, _prefs) = setup_store();
    store.load_modules().await.unwrap();
    store.load_status().await;
    assert_eq!(api.call_count(MockOp::ScanModules), 1);
}

#[tokio::test]
async fn test_reboot_feedback_only_on_failure() {
    let (store, api, _prefs) = setup_store();
    store.reboot_device().await.unwrap();
    assert!(store.toasts().current().is_none());

    api.set_failing(MockOp::Reboot, true);
    assert!(store.reboot_device().await.is_err());
    assert_eq!(store.toasts().visible().unwrap().text, "Reboot failed");
}

#[tokio::test]
async fn test_theme_toggle_cycle_and_persistence() {
    let (store, _api, prefs) = setup_store();

    assert_eq!(store.toggle_theme(), ThemeMode::Light);
    assert_eq!(prefs.get(THEME_KEY).as_deref(), Some("light"));
    assert_eq!(store.toggle_theme(), ThemeMode::Dark);
    assert!(store.applied_theme().dark);
    assert_eq!(store.toggle_theme(), ThemeMode::Auto);
    assert_eq!(prefs.get(THEME_KEY).as_deref(), Some("auto"));
}

#[tokio::test]
async fn test_auto_theme_follows_system_preference() {
    let (store, _api, _prefs) = setup_store();
    let (tx, rx) = watch::channel(false);
    store.init(Some(rx)).await.unwrap();
    assert!(!store.applied_theme().dark);

    let mut events = store.subscribe();
    tx.send(true).unwrap();

    let applied = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(StoreEvent::ThemeApplied { theme }) = events.recv().await {
                return theme;
            }
        }
    })
    .await
    .unwrap();
    assert!(applied.dark);
    assert_eq!(store.theme().mode, ThemeMode::Auto);
    assert!(store.applied_theme().dark);

    // explicit modes ignore the system
    store.set_theme_mode(ThemeMode::Light);
    assert!(!store.set_system_dark(true).dark);
}

#[tokio::test]
async fn test_set_lang_and_nav_fix_persist() {
    let (store, _api, prefs) = setup_store();
    let mut events = store.subscribe();

    assert_eq!(store.set_lang("fr").as_deref(), Some("fr"));
    assert_eq!(prefs.get(LANG_KEY).as_deref(), Some("fr"));
    assert_eq!(
        events.recv().await.unwrap(),
        StoreEvent::LocaleChanged { code: "fr".to_string() }
    );

    assert!(store.toggle_bottom_nav_fix());
    assert_eq!(prefs.get(FIX_NAV_KEY).as_deref(), Some("true"));
    assert!(!store.toggle_bottom_nav_fix());
    assert_eq!(prefs.get(FIX_NAV_KEY).as_deref(), Some("false"));
}

#[tokio::test]
async fn test_languages_list_en_first() {
    let (store, _api, _prefs) = setup_store();
    let codes: Vec<String> = store
        .available_languages()
        .into_iter()
        .map(|l| l.code)
        .collect();
    assert_eq!(codes, vec!["en", "de", "fr", "zh"]);
}

#[tokio::test]
async fn test_module_events_and_save_modules() {
    let (store, _api, _prefs) = setup_store();
    let mut events = store.subscribe();

    store.load_modules().await.unwrap();
    let mut saw_replaced = false;
    while let Ok(event) = events.try_recv() {
        if event == (StoreEvent::ModulesReplaced { count: 3 }) {
            saw_replaced = true;
        }
    }
    assert!(saw_replaced);

    store.save_modules();
    let toast = store.toasts().visible().unwrap();
    assert_eq!(toast.severity, Severity::Info);
    assert_eq!(toast.text, "Not supported in this version");
}

#[tokio::test]
async fn test_open_link_and_navigation() {
    let (store, api, _prefs) = setup_store();
    store.open_link("https://github.com/Tools-cx-app/meta-magic_mount").await.unwrap();
    assert_eq!(api.opened_links().len(), 1);

    let committed = store.navigate(|nav| {
        nav.set_viewport_width(400.0);
        nav.touch_start(300.0, 50.0);
        nav.touch_move(100.0, 60.0, true);
        nav.touch_end()
    });
    assert_eq!(committed, Some(1));
    assert_eq!(store.nav_state().active_index, 1);
    assert_eq!(store.nav_state().drag_offset_px, 0.0);
}

#[tokio::test]
async fn test_init_asks_provider_for_night_mode() {
    let api = MockApi::new();
    api.set_dark_mode(Some(true));
    let (store, api, _prefs) = setup_store_with(api, MemoryPreferences::new());

    store.init(None).await.unwrap();

    assert_eq!(api.call_count(MockOp::DarkMode), 1);
    assert_eq!(store.theme().mode, ThemeMode::Auto);
    assert!(store.applied_theme().dark);
}

#[tokio::test]
async fn test_init_with_system_signal_skips_night_mode_query() {
    let api = MockApi::new();
    api.set_dark_mode(Some(true));
    let (store, api, _prefs) = setup_store_with(api, MemoryPreferences::new());
    let (_tx, rx) = watch::channel(false);

    store.init(Some(rx)).await.unwrap();

    assert_eq!(api.call_count(MockOp::DarkMode), 0);
    assert!(!store.applied_theme().dark);
}

#[tokio::test]
async fn test_night_mode_failure_keeps_light_auto_theme() {
    let api = MockApi::new();
    api.set_failing(MockOp::DarkMode, true);
    let (store, _api, _prefs) = setup_store_with(api, MemoryPreferences::new());

    store.init(None).await.unwrap();

    assert!(!store.applied_theme().dark);
    assert!(store.toasts().visible().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_stale_status_load_does_not_overwrite_newer() {
    let (store, api, _prefs) = setup_store();
    api.push_delay(MockOp::DeviceStatus, Duration::from_millis(500));

    let slow = tokio::spawn({
        let store = store.clone();
        async move { store.load_status().await }
    });
    tokio::task::yield_now().await;

    api.with_state(|s| s.device.model = "Pixel 9 (Newer)".to_string());
    store.load_status().await;
    assert_eq!(store.device().model, "Pixel 9 (Newer)");
    assert!(store.busy().status, "slow status load still in flight");

    slow.await.unwrap();
    assert_eq!(store.device().model, "Pixel 9 (Newer)");
    assert!(!store.busy().status);
}

#[tokio::test]
async fn test_failed_config_reload_keeps_loaded_config() {
    let (store, api, _prefs) = setup_store();
    store.load_config().await.unwrap();
    let loaded = store.config();
    assert_ne!(loaded, MountConfig::default());

    api.set_failing(MockOp::LoadConfig, true);
    assert!(store.load_config().await.is_err());

    assert_eq!(store.config(), loaded);
    let toast = store.toasts().visible().unwrap();
    assert_eq!(
        (toast.text.as_str(), toast.severity),
        ("Failed to load config", Severity::Error)
    );
    assert!(!store.is_busy(Resource::Config));
}

#[tokio::test]
async fn test_search_modules_matches_name_or_id() {
    let (store, _api, _prefs) = setup_store();
    store.load_modules().await.unwrap();

    let all = store.search_modules("");
    assert_eq!(all, store.modules());

    let first = &demo_modules()[0];
    let by_id = store.search_modules(&first.id.to_uppercase());
    assert!(by_id.iter().any(|m| m.id == first.id));
    let by_name = store.search_modules(&first.name.to_lowercase());
    assert!(by_name.iter().any(|m| m.id == first.id));

    assert!(store.search_modules("no such module").is_empty());
}

#[tokio::test]
async fn test_draft_load_refuses_when_config_unreadable() {
    let api = MockApi::new();
    api.set_failing(MockOp::LoadConfig, true);
    let (store, api, _prefs) = setup_store_with(api, MemoryPreferences::new());

    assert!(ConfigDraft::load(&store).await.is_err());
    assert!(api.saved_configs().is_empty());
}

#[tokio::test]
async fn test_draft_commit_saves_only_changes() {
    let (store, api, _prefs) = setup_store();
    let mut draft = ConfigDraft::load(&store).await.unwrap();
    let persisted = api.with_state(|s| s.config.clone());
    assert_eq!(draft.baseline(), Some(&persisted));

    assert!(!draft.commit(&store, store.config()).await.unwrap());
    assert!(api.saved_configs().is_empty());

    let mut edited = store.config();
    edited.verbose = !edited.verbose;
    assert!(draft.commit(&store, edited.clone()).await.unwrap());
    assert_eq!(api.saved_configs(), vec![edited.clone()]);
    assert!(!draft.is_dirty(&store.config()));
    assert_eq!(store.toasts().visible().unwrap().text, "Saved");
}

#[tokio::test]
async fn test_draft_commit_failure_stays_dirty() {
    let (store, api, _prefs) = setup_store();
    let mut draft = ConfigDraft::load(&store).await.unwrap();
    api.set_failing(MockOp::SaveConfig, true);

    let mut edited = store.config();
    edited.partitions.push("odm".to_string());
    assert!(draft.commit(&store, edited.clone()).await.is_err());

    assert!(draft.is_dirty(&edited));
    assert_eq!(store.toasts().visible().unwrap().text, "Failed to save config");
}

#[tokio::test]
async fn test_draft_commit_rejects_relative_module_dir() {
    let (store, api, _prefs) = setup_store();
    let mut draft = ConfigDraft::load(&store).await.unwrap();

    let mut edited = store.config();
    edited.module_dir = "modules".to_string();
    let err = draft.commit(&store, edited).await.unwrap_err();

    assert!(matches!(err, PanelError::InvalidInput(_)));
    assert!(api.saved_configs().is_empty());
}
