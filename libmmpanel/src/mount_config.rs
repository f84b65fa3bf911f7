//! Codec for the mount tool's key-value configuration file
//!
//! The file is a loose, TOML-looking line format:
//!
//! ```text
//! # Magic Mount Configuration File
//!
//! moduledir = "/data/adb/modules"
//! mountsource = "KSU"
//! verbose = false
//! umount = true
//! partitions = ["product", "system_ext"]
//! ```
//!
//! Parsing is lenient: comments, blank lines, lines without `=` and unknown
//! keys are skipped, so [`parse`] always yields a usable [`MountConfig`].
//! [`serialize`] is deterministic and its output parses back to the same
//! configuration.

use serde::{Deserialize, Serialize};

/// Header written at the top of every serialized file
pub const HEADER: &str = "# Magic Mount Configuration File";

const TRUTHY: [&str; 4] = ["1", "true", "yes", "on"];

/// Mount behaviour of the magic mount tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountConfig {
    pub module_dir: String,
    /// Empty means "let the tool pick a temp dir"
    pub temp_dir: String,
    pub mount_source: String,
    pub verbose: bool,
    pub umount: bool,
    pub partitions: Vec<String>,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            module_dir: "/data/adb/modules".to_string(),
            temp_dir: String::new(),
            mount_source: "KSU".to_string(),
            verbose: false,
            umount: true,
            partitions: Vec::new(),
        }
    }
}

impl MountConfig {
    /// UI-facing inverse of `umount`; never serialized
    pub fn disable_umount(&self) -> bool {
        !self.umount
    }

    pub fn set_disable_umount(&mut self, disable: bool) {
        self.umount = !disable;
    }

    /// Apply a single `key = value` entry using the file's parsing rules.
    ///
    /// Returns `false` when the key is not recognized (or is a bracketed
    /// value for a non-list key), in which case nothing changes.
    pub fn set_field(&mut self, key: &str, raw_value: &str) -> bool {
        let key = key.trim();
        let value = raw_value.trim();

        if let Some(interior) = value.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
            if key != "partitions" {
                return false;
            }
            self.partitions = parse_list(interior);
            return true;
        }

        let unquoted = strip_quotes(value);
        match key {
            "moduledir" => self.module_dir = unquoted.to_string(),
            "tempdir" => self.temp_dir = unquoted.to_string(),
            "mountsource" => self.mount_source = unquoted.to_string(),
            "verbose" => self.verbose = is_truthy(value),
            "umount" => self.umount = is_truthy(value),
            _ => return false,
        }
        true
    }
}

/// Parse configuration text. Never fails; anything unusable is skipped.
pub fn parse(text: &str) -> MountConfig {
    let mut config = MountConfig::default();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        if key.is_empty() || value.is_empty() {
            continue;
        }

        if !config.set_field(key, value) {
            tracing::trace!(key, "ignoring unrecognized config entry");
        }
    }

    config
}

/// Serialize a configuration to the file format
pub fn serialize(config: &MountConfig) -> String {
    let mut lines = vec![HEADER.to_string(), String::new()];

    lines.push(format!("moduledir = {}", quote(&config.module_dir)));
    if !config.temp_dir.is_empty() {
        lines.push(format!("tempdir = {}", quote(&config.temp_dir)));
    }
    lines.push(format!("mountsource = {}", quote(&config.mount_source)));
    lines.push(format!("verbose = {}", config.verbose));
    lines.push(format!("umount = {}", config.umount));

    let partitions = config
        .partitions
        .iter()
        .map(|p| quote(p))
        .collect::<Vec<_>>()
        .join(", ");
    lines.push(format!("partitions = [{}]", partitions));

    lines.join("\n")
}

fn parse_list(interior: &str) -> Vec<String> {
    if interior.trim().is_empty() {
        return Vec::new();
    }
    interior
        .split(',')
        .map(|item| strip_quotes(item.trim()).to_string())
        .collect()
}

fn strip_quotes(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

fn is_truthy(raw: &str) -> bool {
    let lowered = raw.trim().to_lowercase();
    TRUTHY.contains(&lowered.as_str())
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_file() {
        let text = r#"
# Magic Mount Configuration File

moduledir = "/data/adb/modules"
tempdir = "/debug_ramdisk"
mountsource = "APatch"
verbose = true
umount = false
partitions = ["product", "system_ext"]
"#;
        let config = parse(text);
        assert_eq!(config.module_dir, "/data/adb/modules");
        assert_eq!(config.temp_dir, "/debug_ramdisk");
        assert_eq!(config.mount_source, "APatch");
        assert!(config.verbose);
        assert!(!config.umount);
        assert!(config.disable_umount());
        assert_eq!(config.partitions, vec!["product", "system_ext"]);
    }

    #[test]
    fn test_comments_and_junk_are_skipped() {
        let text = "  # moduledir = \"/nope\"\nno equals here\n= orphan\nempty =\nunknown = 5\n";
        assert_eq!(parse(text), MountConfig::default());
    }

    #[test]
    fn test_value_split_at_first_equals() {
        let config = parse("mountsource = a=b");
        assert_eq!(config.mount_source, "a=b");
    }

    #[test]
    fn test_bracketed_non_list_key_ignored() {
        let config = parse("moduledir = [/a, /b]");
        assert_eq!(config.module_dir, MountConfig::default().module_dir);
    }

    #[test]
    fn test_quoted_boolean_is_not_truthy() {
        // Truthiness looks at the raw value, quotes included
        assert!(!parse("verbose = \"true\"").verbose);
        assert!(parse("verbose = On").verbose);
    }

    #[test]
    fn test_strip_single_layer_only() {
        let config = parse("moduledir = \"\"/odd\"\"");
        assert_eq!(config.module_dir, "\"/odd\"");
    }

    #[test]
    fn test_serialize_layout() {
        let config = MountConfig {
            partitions: vec!["vendor".into(), "odm".into()],
            ..MountConfig::default()
        };
        let text = serialize(&config);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], HEADER);
        assert_eq!(lines[1], "");
        assert_eq!(lines[2], "moduledir = \"/data/adb/modules\"");
        assert_eq!(lines[3], "mountsource = \"KSU\"");
        assert_eq!(lines[4], "verbose = false");
        assert_eq!(lines[5], "umount = true");
        assert_eq!(lines[6], "partitions = [\"vendor\", \"odm\"]");
        assert!(!text.contains("tempdir"));
    }

    #[test]
    fn test_serialize_empty_partitions() {
        let text = serialize(&MountConfig::default());
        assert!(text.ends_with("partitions = []"));
    }

    #[test]
    fn test_set_field_and_disable_umount() {
        let mut config = MountConfig::default();
        assert!(config.set_field("partitions", "[a, \"b\"]"));
        assert!(config.set_field("tempdir", "\"/mnt/tmp\""));
        assert!(!config.set_field("bogus", "1"));
        assert_eq!(config.partitions, vec!["a", "b"]);
        assert_eq!(config.temp_dir, "/mnt/tmp");

        config.set_disable_umount(true);
        assert!(!config.umount);
    }
}
