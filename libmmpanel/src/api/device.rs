//! Provider backed by shell commands on the device

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

use super::PanelApi;
use crate::config::DeviceConfig;
use crate::error::{CommandError, Result};
use crate::executor::{CommandExecutor, ExecOutput};
use crate::mount_config::{self, MountConfig};
use crate::types::{format_bytes, DeviceStatus, Module, ScannedModule, StorageUsage, SystemInfo};

const DEVICE_PROPS: &str = "getprop ro.product.model; getprop ro.build.version.release";
const KERNEL_QUERY: &str = "echo \"KERNEL:$(uname -r)\"\necho \"SELINUX:$(getenforce)\"";
const ACCENT_SETTING: &str = "settings get secure theme_customization_overlay_packages";
const NIGHT_MODE: &str = "cmd uimode night";
const REBOOT: &str = "svc power reboot || reboot";
const HEREDOC_MARKER: &str = "EOF_CONFIG";

pub struct DeviceApi<E> {
    executor: E,
    device: DeviceConfig,
}

impl<E: CommandExecutor> DeviceApi<E> {
    pub fn new(executor: E, device: DeviceConfig) -> Self {
        Self { executor, device }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Run a command and turn a non-zero exit into an error
    async fn run_checked(&self, command: &str) -> Result<ExecOutput> {
        let output = self.executor.execute(command).await?;
        if !output.is_success() {
            return Err(CommandError::NonZeroExit {
                code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            }
            .into());
        }
        Ok(output)
    }

    fn read_config_command(&self) -> String {
        let path = &self.device.config_path;
        format!("[ -f \"{path}\" ] && cat \"{path}\" || echo \"\"")
    }

    fn write_config_command(&self, content: &str) -> String {
        let path = &self.device.config_path;
        format!(
            "mkdir -p \"$(dirname \"{path}\")\"\n\
             cat > \"{path}\" << '{HEREDOC_MARKER}'\n\
             {content}\n\
             {HEREDOC_MARKER}\n\
             chmod 644 \"{path}\""
        )
    }
}

#[async_trait]
impl<E: CommandExecutor> PanelApi for DeviceApi<E> {
    async fn load_config(&self) -> Result<MountConfig> {
        let output = self.run_checked(&self.read_config_command()).await?;
        if output.stdout.trim().is_empty() {
            tracing::debug!(path = %self.device.config_path, "no config file, using defaults");
            return Ok(MountConfig::default());
        }
        Ok(mount_config::parse(&output.stdout))
    }

    async fn save_config(&self, config: &MountConfig) -> Result<()> {
        let content = mount_config::serialize(config);
        self.run_checked(&self.write_config_command(&content)).await?;
        tracing::info!(path = %self.device.config_path, "config written");
        Ok(())
    }

    async fn scan_modules(&self, module_dir: &str) -> Result<Vec<Module>> {
        // The scanner reads its module directory from the saved config
        tracing::debug!(module_dir, "scanning modules");
        let command = format!("{} scan --json", self.device.binary_path);
        let output = self.run_checked(&command).await?;
        Ok(parse_scan_output(&output.stdout))
    }

    async fn storage_usage(&self) -> Result<StorageUsage> {
        let command = format!("df -k {} | tail -n 1", self.device.modules_root);
        let output = self.run_checked(&command).await?;
        parse_df_line(&output.stdout)
    }

    async fn system_info(&self) -> Result<SystemInfo> {
        let output = self.run_checked(KERNEL_QUERY).await?;
        let mut info = SystemInfo {
            mount_base: self.device.modules_root.clone(),
            ..SystemInfo::default()
        };
        for line in output.stdout.lines() {
            if let Some(kernel) = line.strip_prefix("KERNEL:") {
                info.kernel = kernel.trim().to_string();
            } else if let Some(selinux) = line.strip_prefix("SELINUX:") {
                info.selinux = selinux.trim().to_string();
            }
        }

        let listing = self
            .executor
            .execute(&format!("ls -1 {}", self.device.modules_root))
            .await;
        match listing {
            Ok(listing) if listing.is_success() => {
                info.active_mounts = listing
                    .stdout
                    .lines()
                    .map(str::trim)
                    .filter(|id| !id.is_empty() && *id != self.device.self_module_id)
                    .map(str::to_string)
                    .collect();
            }
            Ok(listing) => {
                tracing::debug!(exit_code = listing.exit_code, "module listing failed");
            }
            Err(e) => tracing::warn!("module listing could not run: {}", e),
        }
        Ok(info)
    }

    async fn device_status(&self) -> Result<DeviceStatus> {
        let output = self.run_checked(DEVICE_PROPS).await?;
        let mut lines = output.stdout.lines().map(str::trim);
        let mut next = || {
            lines
                .next()
                .filter(|v| !v.is_empty())
                .unwrap_or("Unknown")
                .to_string()
        };
        Ok(DeviceStatus {
            model: next(),
            android: next(),
            ..DeviceStatus::default()
        })
    }

    async fn version(&self) -> Result<String> {
        #[derive(Deserialize)]
        struct VersionReply {
            version: Option<String>,
        }

        let command = format!("{} version", self.device.binary_path);
        let output = self.run_checked(&command).await?;
        let reply: VersionReply = serde_json::from_str(output.stdout.trim())
            .map_err(|e| CommandError::Parse(format!("version reply: {}", e)))?;
        Ok(reply.version.unwrap_or_else(|| "0.0.0".to_string()))
    }

    async fn system_accent_color(&self) -> Result<Option<String>> {
        let output = self.run_checked(ACCENT_SETTING).await?;
        Ok(parse_accent_color(&output.stdout))
    }

    async fn system_dark_mode(&self) -> Result<Option<bool>> {
        let output = self.run_checked(NIGHT_MODE).await?;
        Ok(parse_night_mode(&output.stdout))
    }

    async fn reboot(&self) -> Result<()> {
        tracing::warn!("rebooting device");
        self.run_checked(REBOOT).await?;
        Ok(())
    }

    async fn open_link(&self, url: &str) -> Result<()> {
        let safe_url = url.replace('"', "\\\"");
        let command = format!("am start -a android.intent.action.VIEW -d \"{}\"", safe_url);
        self.run_checked(&command).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "device"
    }
}

/// Decode `scan --json` output.
///
/// Output that is not a JSON array is logged and yields no modules. Entries
/// are decoded one by one; a malformed entry is logged and skipped.
pub fn parse_scan_output(stdout: &str) -> Vec<Module> {
    if stdout.trim().is_empty() {
        return Vec::new();
    }
    let entries = match serde_json::from_str::<Vec<serde_json::Value>>(stdout) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!("failed to parse module JSON: {}", e);
            return Vec::new();
        }
    };
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value::<ScannedModule>(entry) {
            Ok(raw) => Some(Module::from(raw)),
            Err(e) => {
                tracing::warn!(index, "skipping malformed module entry: {}", e);
                None
            }
        })
        .collect()
}

/// Decode the last line of `df -k`
pub fn parse_df_line(line: &str) -> Result<StorageUsage> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 6 {
        return Err(CommandError::Parse(format!("unexpected df output: '{}'", line.trim())).into());
    }
    let kib = |field: &str| {
        field
            .parse::<u64>()
            .map_err(|_| CommandError::Parse(format!("not a block count: '{}'", field)))
    };
    let total = kib(parts[1])?;
    let used = kib(parts[2])?;

    Ok(StorageUsage {
        kind: None,
        percent: parts[4].to_string(),
        size: format_bytes(total.saturating_mul(1024), 2),
        used: format_bytes(used.saturating_mul(1024), 2),
        hymofs_available: false,
    })
}

/// Extract the accent color from the theme overlay setting.
///
/// `system_palette` wins over `source_color`; 8-digit values carry an alpha
/// byte in front, which is dropped.
pub fn parse_accent_color(setting: &str) -> Option<String> {
    static PALETTE_RE: OnceLock<Regex> = OnceLock::new();
    static SOURCE_RE: OnceLock<Regex> = OnceLock::new();

    let palette = PALETTE_RE.get_or_init(|| {
        Regex::new(
            r#"(?i)["']?android\.theme\.customization\.system_palette["']?[ \t]*:[ \t]*["']?#?([0-9a-f]{6,8})["']?"#,
        )
        .expect("valid palette regex")
    });
    let source = SOURCE_RE.get_or_init(|| {
        Regex::new(r#"(?i)["']?source_color["']?[ \t]*:[ \t]*["']?#?([0-9a-f]{6,8})["']?"#)
            .expect("valid source color regex")
    });

    let captures = palette
        .captures(setting)
        .or_else(|| source.captures(setting))?;
    let hex = captures.get(1)?.as_str();
    let hex = if hex.len() == 8 { &hex[2..] } else { hex };
    // {6,8} also admits 7 digits
    if hex.len() != 6 {
        return None;
    }
    Some(format!("#{}", hex.to_lowercase()))
}

/// Decode `cmd uimode night` (`Night mode: yes|no|auto|custom`)
pub fn parse_night_mode(output: &str) -> Option<bool> {
    let value = output.trim().rsplit(':').next()?.trim().to_lowercase();
    match value.as_str() {
        "yes" => Some(true),
        "no" => Some(false),
        _ => None,
    }
}
