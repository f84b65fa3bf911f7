//! Locale bundles, fallback resolution and the language list
//!
//! Bundles follow a typed schema: every key the panel displays is declared
//! here with a fallback literal, so a partially translated bundle never
//! leaves a hole in the UI. Built-in bundles are compiled in from
//! `locales/*.json`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Code of the bundle used when a requested code is not registered
pub const FALLBACK_CODE: &str = "en";

/// Current schema version of the bundle files
pub const SCHEMA_VERSION: u32 = 1;

const BUILTIN: [(&str, &str); 4] = [
    ("en", include_str!("../locales/en.json")),
    ("de", include_str!("../locales/de.json")),
    ("fr", include_str!("../locales/fr.json")),
    ("zh", include_str!("../locales/zh.json")),
];

/// Declares a bundle section: optional string fields plus an accessor per
/// field returning the translation or its fallback literal.
macro_rules! section {
    ($(#[$meta:meta])* $name:ident { $($field:ident => $fallback:expr),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(default, rename_all = "camelCase")]
        pub struct $name {
            $(pub $field: Option<String>,)*
        }

        impl $name {
            $(
                pub fn $field(&self) -> &str {
                    self.$field.as_deref().unwrap_or($fallback)
                }
            )*
        }
    };
}

section!(
    /// Metadata about the bundle itself
    LangSection {
        display => "",
    }
);

section!(
    /// Shared strings, mostly toast texts
    CommonSection {
        app_name => "Magic Mount",
        language => "Language",
        theme => "Theme",
        saving => "Saving...",
        save_success => "Saved",
        save_failed => "Failed to save config",
        load_failed => "Failed to load config",
        reset_success => "Config Reset",
        reset_failed => "Failed to reset",
        reboot => "Reboot",
        reboot_title => "Reboot device?",
        reboot_confirm => "The device will restart immediately.",
        reboot_failed => "Reboot failed",
        cancel => "Cancel",
        not_supported => "Not supported in this version",
    }
);

section!(
    TabsSection {
        status => "status",
        config => "config",
        modules => "modules",
        info => "info",
    }
);

section!(
    ConfigSection {
        module_dir => "Module Directory",
        mount_source => "Mount Source",
        partitions => "Extra Partitions",
        umount_label => "Disable Umount",
        fix_bottom_nav => "Fix Bottom Navigation",
        invalid_path => "Invalid Path",
        save => "Save",
        reload => "Reload",
    }
);

section!(
    ModulesSection {
        empty => "No modules found",
        reload => "Refresh",
        load_failed => "Failed to load modules",
    }
);

section!(
    StatusSection {
        device_title => "Device",
        sys_info_title => "System",
        android_label => "Android",
        kernel_label => "Kernel",
        selinux_label => "SELinux",
        module_active => "Active Modules",
        refresh => "Refresh",
    }
);

/// A locale bundle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Locale {
    pub version: u32,
    pub lang: LangSection,
    pub common: CommonSection,
    pub tabs: TabsSection,
    pub config: ConfigSection,
    pub modules: ModulesSection,
    pub status: StatusSection,
}

impl Locale {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// A bundle with every key missing; all lookups yield fallbacks
    pub fn empty() -> &'static Locale {
        static EMPTY: OnceLock<Locale> = OnceLock::new();
        EMPTY.get_or_init(Locale::default)
    }

    pub fn with_display(display: &str) -> Self {
        Self {
            version: SCHEMA_VERSION,
            lang: LangSection {
                display: Some(display.to_string()),
            },
            ..Self::default()
        }
    }
}

/// Entry of the language picker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub code: String,
    pub name: String,
}

/// The fixed set of bundles known to the panel
#[derive(Debug, Clone, Default)]
pub struct LocaleRegistry {
    bundles: BTreeMap<String, Arc<Locale>>,
}

impl LocaleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the bundles compiled into the library
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for (code, json) in BUILTIN {
            match Locale::from_json(json) {
                Ok(locale) => registry.register(code, locale),
                Err(e) => tracing::error!(code, "skipping malformed locale bundle: {}", e),
            }
        }
        registry
    }

    pub fn register(&mut self, code: &str, locale: Locale) {
        if locale.version > SCHEMA_VERSION {
            tracing::warn!(
                code,
                version = locale.version,
                "locale bundle is newer than this build understands"
            );
        }
        self.bundles.insert(code.to_string(), Arc::new(locale));
    }

    pub fn get(&self, code: &str) -> Option<Arc<Locale>> {
        self.bundles.get(code).cloned()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.bundles.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    /// Languages for the picker: `en` first, the rest by display name
    pub fn available_languages(&self) -> Vec<Language> {
        let mut languages: Vec<Language> = self
            .bundles
            .iter()
            .map(|(code, locale)| {
                let name = match locale.lang.display() {
                    "" => code.to_uppercase(),
                    display => display.to_string(),
                };
                Language {
                    code: code.clone(),
                    name,
                }
            })
            .collect();

        languages.sort_by_cached_key(|language| {
            (
                language.code != FALLBACK_CODE,
                collation_key(&language.name),
                language.name.to_lowercase(),
                language.code.clone(),
            )
        });
        languages
    }
}

/// Sort key that orders accented letters with their base letter
/// (`Čeština` next to `Cymraeg`, not after `Z`).
fn collation_key(name: &str) -> String {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Tracks the active bundle
#[derive(Debug, Clone)]
pub struct LocaleResolver {
    registry: Arc<LocaleRegistry>,
    active: Option<(String, Arc<Locale>)>,
}

impl LocaleResolver {
    pub fn new(registry: Arc<LocaleRegistry>) -> Self {
        Self {
            registry,
            active: None,
        }
    }

    /// Activate the bundle for `code`, falling back to `en`.
    ///
    /// When neither exists the active bundle is left as it was. Returns the
    /// code of the bundle now active, if any.
    pub fn load(&mut self, code: &str) -> Option<&str> {
        let resolved = self
            .registry
            .get(code)
            .map(|locale| (code.to_string(), locale))
            .or_else(|| {
                self.registry
                    .get(FALLBACK_CODE)
                    .map(|locale| (FALLBACK_CODE.to_string(), locale))
            });

        match resolved {
            Some((resolved_code, locale)) => {
                if resolved_code != code {
                    tracing::debug!(requested = code, "locale not bundled, using fallback");
                }
                self.active = Some((resolved_code, locale));
            }
            None => {
                tracing::warn!(requested = code, "no locale or fallback bundle, keeping current");
            }
        }
        self.active_code()
    }

    pub fn active_code(&self) -> Option<&str> {
        self.active.as_ref().map(|(code, _)| code.as_str())
    }

    /// Shared handle to the active bundle
    pub fn active_bundle(&self) -> Option<Arc<Locale>> {
        self.active.as_ref().map(|(_, locale)| Arc::clone(locale))
    }

    /// Strings of the active bundle, or the all-fallback bundle when none
    pub fn strings(&self) -> &Locale {
        match &self.active {
            Some((_, locale)) => locale,
            None => Locale::empty(),
        }
    }

    pub fn registry(&self) -> &LocaleRegistry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_bundles_parse() {
        let registry = LocaleRegistry::builtin();
        assert_eq!(registry.len(), 4);
        let en = registry.get("en").unwrap();
        assert_eq!(en.lang.display(), "English");
        assert_eq!(en.common.save_success(), "Saved");
    }

    #[test]
    fn test_missing_keys_use_fallback_literals() {
        let registry = LocaleRegistry::builtin();
        let fr = registry.get("fr").unwrap();
        // fr.json declares no config section
        assert_eq!(fr.config.invalid_path(), "Invalid Path");
        assert_eq!(fr.common.save_success(), "Enregistré");
    }

    #[test]
    fn test_display_name_falls_back_to_code() {
        let mut registry = LocaleRegistry::new();
        registry.register("pt", Locale::default());
        let languages = registry.available_languages();
        assert_eq!(languages[0].name, "PT");
    }

    #[test]
    fn test_accented_names_sort_with_base_letter() {
        let mut registry = LocaleRegistry::new();
        registry.register("da", Locale::with_display("Dansk"));
        registry.register("cs", Locale::with_display("Čeština"));
        registry.register("en", Locale::with_display("English"));
        registry.register("eo", Locale::with_display("Ésperanto"));

        let names: Vec<String> = registry
            .available_languages()
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, vec!["English", "Čeština", "Dansk", "Ésperanto"]);
    }

    #[test]
    fn test_strings_without_active_bundle() {
        let resolver = LocaleResolver::new(Arc::new(LocaleRegistry::new()));
        assert!(resolver.active_code().is_none());
        assert_eq!(resolver.strings().common.reboot_failed(), "Reboot failed");
    }

    #[test]
    fn test_partial_json_is_accepted() {
        let locale = Locale::from_json(r#"{"common": {"saveSuccess": "OK"}}"#).unwrap();
        assert_eq!(locale.common.save_success(), "OK");
        assert_eq!(locale.common.reset_failed(), "Failed to reset");
        assert_eq!(locale.version, 0);
    }
}
