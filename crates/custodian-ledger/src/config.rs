use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use custodian_store::SyncMode;

use crate::error::{LedgerError, LedgerResult};

/// Configuration for a ledger instance.
///
/// Every field has a default, so a TOML file only needs the keys it
/// overrides:
///
/// ```toml
/// data_dir = "/var/lib/custodian"
/// sync_mode = "data_only"
/// append_timeout_ms = 2000
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Directory holding the segment file.
    pub data_dir: PathBuf,
    /// Segment file name inside `data_dir`.
    pub file_name: String,
    /// How appends are made durable.
    pub sync_mode: SyncMode,
    /// Maximum time a caller waits for the append gate.
    pub append_timeout_ms: u64,
    /// Maximum byte length of any single text field.
    pub max_field_len: usize,
    /// Maximum number of metadata entries per action.
    pub max_metadata_entries: usize,
    /// Number of entries read per step when queries scan the chain.
    pub scan_chunk: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/ledger"),
            file_name: "custodian.ledger".into(),
            sync_mode: SyncMode::Full,
            append_timeout_ms: 5_000,
            max_field_len: 4_096,
            max_metadata_entries: 64,
            scan_chunk: 256,
        }
    }
}

impl LedgerConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(s: &str) -> LedgerResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| LedgerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file.
    pub fn load(path: &Path) -> LedgerResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| LedgerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Same configuration rooted at another directory.
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Full path of the segment file.
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(&self.file_name)
    }

    pub fn append_timeout(&self) -> Duration {
        Duration::from_millis(self.append_timeout_ms)
    }

    /// Reject settings no ledger can run with.
    pub fn validate(&self) -> LedgerResult<()> {
        if self.file_name.trim().is_empty() {
            return Err(LedgerError::Config("file_name must not be empty".into()));
        }
        if self.max_field_len == 0 {
            return Err(LedgerError::Config("max_field_len must be positive".into()));
        }
        if self.scan_chunk == 0 {
            return Err(LedgerError::Config("scan_chunk must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = LedgerConfig::default();
        assert_eq!(c.ledger_path(), PathBuf::from("data/ledger/custodian.ledger"));
        assert_eq!(c.sync_mode, SyncMode::Full);
        assert_eq!(c.append_timeout(), Duration::from_secs(5));
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = LedgerConfig::from_toml_str(
            r#"
            data_dir = "/var/lib/custodian"
            sync_mode = "data_only"
            append_timeout_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(c.data_dir, PathBuf::from("/var/lib/custodian"));
        assert_eq!(c.sync_mode, SyncMode::DataOnly);
        assert_eq!(c.append_timeout_ms, 250);
        assert_eq!(c.file_name, "custodian.ledger");
        assert_eq!(c.scan_chunk, 256);
    }

    #[test]
    fn invalid_values_rejected() {
        assert!(matches!(
            LedgerConfig::from_toml_str("scan_chunk = 0"),
            Err(LedgerError::Config(_))
        ));
        assert!(matches!(
            LedgerConfig::from_toml_str("sync_mode = \"sometimes\""),
            Err(LedgerError::Config(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custodian.toml");
        fs::write(&path, "file_name = \"audit.log\"\nmax_field_len = 128\n").unwrap();

        let c = LedgerConfig::load(&path).unwrap();
        assert_eq!(c.file_name, "audit.log");
        assert_eq!(c.max_field_len, 128);

        assert!(LedgerConfig::load(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn toml_roundtrip() {
        let c = LedgerConfig::default().with_data_dir("/tmp/x");
        let text = toml::to_string(&c).unwrap();
        assert_eq!(LedgerConfig::from_toml_str(&text).unwrap(), c);
    }
}
