//! Snapshots of device, module and storage state
//!
//! All of these are read-only views produced by the data provider and
//! replaced wholesale by the store; nothing here is persisted by the panel.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mount mode reported for every module handled by magic mount
pub const MAGIC_MODE: &str = "magic";

/// An installed module as reported by `scan --json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: String,
    pub name: String,
    pub version: String,
    pub author: String,
    pub description: String,
    pub is_mounted: bool,
    pub mode: String,
    pub rules: ModuleRules,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRules {
    pub default_mode: String,
    pub paths: BTreeMap<String, String>,
}

impl Default for ModuleRules {
    fn default() -> Self {
        Self {
            default_mode: MAGIC_MODE.to_string(),
            paths: BTreeMap::new(),
        }
    }
}

/// Raw entry of the scanner's JSON array.
///
/// Only `id` is mandatory; everything else may be absent or `null` and
/// degrades to an empty string or `false`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScannedModule {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub skip: Option<bool>,
    #[serde(default, alias = "disable")]
    pub disabled: Option<bool>,
}

impl From<ScannedModule> for Module {
    fn from(raw: ScannedModule) -> Self {
        Module {
            is_mounted: !(raw.skip.unwrap_or(false) || raw.disabled.unwrap_or(false)),
            author: raw.author.unwrap_or_else(|| "Unknown".to_string()),
            id: raw.id,
            name: raw.name.unwrap_or_default(),
            version: raw.version.unwrap_or_default(),
            description: raw.description.unwrap_or_default(),
            mode: MAGIC_MODE.to_string(),
            rules: ModuleRules::default(),
        }
    }
}

impl Module {
    /// Case-insensitive substring match on name or id. An empty (or blank)
    /// query matches everything.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        query.is_empty()
            || self.name.to_lowercase().contains(&query)
            || self.id.to_lowercase().contains(&query)
    }
}

/// Modules matching `query`, in inventory order
pub fn filter_modules<'a>(modules: &'a [Module], query: &str) -> Vec<&'a Module> {
    modules.iter().filter(|m| m.matches(query)).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub model: String,
    pub android: String,
    pub kernel: String,
    pub selinux: String,
}

impl Default for DeviceStatus {
    fn default() -> Self {
        Self {
            model: "-".to_string(),
            android: "-".to_string(),
            kernel: "-".to_string(),
            selinux: "-".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub kernel: String,
    pub selinux: String,
    pub mount_base: String,
    pub active_mounts: Vec<String>,
}

impl Default for SystemInfo {
    fn default() -> Self {
        Self {
            kernel: "-".to_string(),
            selinux: "-".to_string(),
            mount_base: "-".to_string(),
            active_mounts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageUsage {
    /// Filesystem type, when known
    pub kind: Option<String>,
    pub percent: String,
    pub size: String,
    pub used: String,
    pub hymofs_available: bool,
}

impl Default for StorageUsage {
    fn default() -> Self {
        Self {
            kind: None,
            percent: "0%".to_string(),
            size: "-".to_string(),
            used: "-".to_string(),
            hymofs_available: false,
        }
    }
}

/// Counts derived from the module inventory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSummary {
    pub total: usize,
    pub mounted: usize,
    pub skipped: usize,
}

impl ModuleSummary {
    pub fn from_modules(modules: &[Module]) -> Self {
        let mounted = modules.iter().filter(|m| m.is_mounted).count();
        Self {
            total: modules.len(),
            mounted,
            skipped: modules.len() - mounted,
        }
    }
}

/// Format a byte count with binary units, trimming trailing zeros
/// (`1536` → `"1.5 KB"`, `0` → `"0 B"`).
pub fn format_bytes(bytes: u64, decimals: usize) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let mut text = format!("{:.*}", decimals, value);
    if text.contains('.') {
        text = text.trim_end_matches('0').trim_end_matches('.').to_string();
    }
    format!("{} {}", text, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scanned_module_conversion() {
        let raw: ScannedModule = serde_json::from_str(
            r#"{"id":"sound-enhancer","name":"Sound Enhancer","version":"1.0","description":"x","skip":true}"#,
        )
        .unwrap();
        let module = Module::from(raw);

        assert!(!module.is_mounted);
        assert_eq!(module.author, "Unknown");
        assert_eq!(module.mode, MAGIC_MODE);
        assert_eq!(module.rules.default_mode, MAGIC_MODE);
        assert!(module.rules.paths.is_empty());
    }

    #[test]
    fn test_disable_alias_marks_unmounted() {
        let raw: ScannedModule =
            serde_json::from_str(r#"{"id":"a","author":"me","disable":true}"#).unwrap();
        let module = Module::from(raw);
        assert!(!module.is_mounted);
        assert_eq!(module.author, "me");
    }

    #[test]
    fn test_null_fields_degrade_to_defaults() {
        let raw: ScannedModule = serde_json::from_str(
            r#"{"id":"b","name":null,"version":null,"description":null,"author":null,"skip":null}"#,
        )
        .unwrap();
        let module = Module::from(raw);
        assert_eq!(module.name, "");
        assert_eq!(module.author, "Unknown");
        assert!(module.is_mounted);
    }

    #[test]
    fn test_filter_modules_by_name_or_id() {
        let modules: Vec<Module> = [("youtube-revanced", "YouTube ReVanced"), ("sound-enhancer", "Sound Enhancer")]
            .into_iter()
            .map(|(id, name)| {
                Module::from(ScannedModule {
                    id: id.to_string(),
                    name: Some(name.to_string()),
                    ..ScannedModule::default()
                })
            })
            .collect();

        let ids = |query: &str| -> Vec<&str> {
            filter_modules(&modules, query)
                .into_iter()
                .map(|m| m.id.as_str())
                .collect()
        };
        assert_eq!(ids("revanced"), vec!["youtube-revanced"]);
        assert_eq!(ids("SOUND ENH"), vec!["sound-enhancer"]);
        assert_eq!(ids("-enh"), vec!["sound-enhancer"]);
        assert_eq!(ids("  "), vec!["youtube-revanced", "sound-enhancer"]);
        assert!(ids("magisk").is_empty());
    }

    #[test]
    fn test_module_summary() {
        let mounted: Module = ScannedModule {
            id: "a".into(),
            ..ScannedModule::default()
        }
        .into();
        let mut skipped = mounted.clone();
        skipped.id = "b".into();
        skipped.is_mounted = false;

        let summary = ModuleSummary::from_modules(&[mounted, skipped]);
        assert_eq!(summary, ModuleSummary { total: 2, mounted: 1, skipped: 1 });
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0, 2), "0 B");
        assert_eq!(format_bytes(512, 2), "512 B");
        assert_eq!(format_bytes(1536, 2), "1.5 KB");
        assert_eq!(format_bytes(2 * 1024 * 1024 * 1024, 2), "2 GB");
        assert_eq!(format_bytes(123_456_789, 2), "117.74 MB");
    }

    #[test]
    fn test_placeholder_defaults() {
        assert_eq!(DeviceStatus::default().model, "-");
        assert_eq!(StorageUsage::default().percent, "0%");
        assert!(SystemInfo::default().active_mounts.is_empty());
    }
}
