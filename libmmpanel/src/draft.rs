//! Unsaved-edit tracking for the configuration form
//!
//! The store owns the live [`MountConfig`]; a presenter keeps a
//! [`ConfigDraft`] to know whether the user has edits that were not saved
//! yet. The baseline moves on successful load and save only.

use crate::error::{PanelError, Result};
use crate::mount_config::MountConfig;
use crate::store::{Resource, Store};

/// A module directory is acceptable when empty or an absolute path other than `/`
pub fn is_valid_module_dir(path: &str) -> bool {
    path.is_empty() || (path.starts_with('/') && path.len() > 1)
}

pub fn validate(config: &MountConfig) -> Result<()> {
    if !is_valid_module_dir(&config.module_dir) {
        return Err(PanelError::InvalidInput(format!(
            "module directory must be an absolute path: '{}'",
            config.module_dir
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct ConfigDraft {
    baseline: Option<MountConfig>,
}

impl ConfigDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn baseline(&self) -> Option<&MountConfig> {
        self.baseline.as_ref()
    }

    /// Accept `config` as the saved state
    pub fn rebase(&mut self, config: &MountConfig) {
        self.baseline = Some(config.clone());
    }

    /// Follow a config change that did not come from the user.
    ///
    /// The baseline only moves while there are no pending edits, and never
    /// while a load is in flight.
    pub fn observe(&mut self, config: &MountConfig, loading: bool) {
        if !loading && self.baseline.is_none() {
            self.rebase(config);
        }
    }

    /// Whether `current` differs from the baseline. False before any baseline.
    pub fn is_dirty(&self, current: &MountConfig) -> bool {
        self.baseline
            .as_ref()
            .map(|base| base != current)
            .unwrap_or(false)
    }
}

impl ConfigDraft {
    /// Start editing from the persisted configuration.
    ///
    /// Fails when the config cannot be read, so callers never edit the
    /// built-in defaults by accident.
    pub async fn load(store: &Store) -> Result<Self> {
        store.load_config().await?;
        let mut draft = Self::new();
        draft.observe(&store.config(), store.is_busy(Resource::Config));
        Ok(draft)
    }

    /// Validate and save `edited` if it differs from the baseline.
    ///
    /// Returns whether a write happened. The baseline moves only after the
    /// store reports a successful save.
    pub async fn commit(&mut self, store: &Store, edited: MountConfig) -> Result<bool> {
        validate(&edited)?;
        if self.baseline.is_some() && !self.is_dirty(&edited) {
            tracing::debug!("config unchanged, nothing to save");
            return Ok(false);
        }

        store.set_config(edited);
        store.save_config().await?;
        self.rebase(&store.config());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_dir_validation() {
        assert!(is_valid_module_dir(""));
        assert!(is_valid_module_dir("/data/adb/modules"));
        assert!(!is_valid_module_dir("/"));
        assert!(!is_valid_module_dir("data/adb"));

        let config = MountConfig {
            module_dir: "relative".to_string(),
            ..MountConfig::default()
        };
        assert!(matches!(validate(&config), Err(PanelError::InvalidInput(_))));
    }

    #[test]
    fn test_dirty_tracking() {
        let mut draft = ConfigDraft::new();
        let mut config = MountConfig::default();
        assert!(!draft.is_dirty(&config));

        draft.observe(&config, true);
        assert!(draft.baseline().is_none());
        draft.observe(&config, false);
        assert!(!draft.is_dirty(&config));

        config.verbose = true;
        assert!(draft.is_dirty(&config));
        // pending edits keep the old baseline
        draft.observe(&config, false);
        assert!(draft.is_dirty(&config));

        draft.rebase(&config);
        assert!(!draft.is_dirty(&config));
    }
}
