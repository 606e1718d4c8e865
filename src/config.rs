// Bank configuration - JSON file plus CARD_LEDGER_* environment overrides

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BankConfig {
    pub database_path: PathBuf,
    pub busy_timeout_ms: u64,
    /// Load the demo clients/cards/billers on startup
    pub seed_demo_data: bool,
    pub server_addr: String,
    /// Fallback when RUST_LOG is not set
    pub log_filter: String,
}

impl Default for BankConfig {
    fn default() -> Self {
        BankConfig {
            database_path: PathBuf::from("card-ledger.db"),
            busy_timeout_ms: 5000,
            seed_demo_data: false,
            server_addr: "0.0.0.0:3000".to_string(),
            log_filter: "info".to_string(),
        }
    }
}

impl BankConfig {
    /// Defaults, then the JSON file (when given), then the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => BankConfig::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("CARD_LEDGER_DB") {
            self.database_path = PathBuf::from(path);
        }
        if let Some(ms) = lookup("CARD_LEDGER_BUSY_TIMEOUT_MS") {
            self.busy_timeout_ms = ms
                .parse()
                .with_context(|| format!("CARD_LEDGER_BUSY_TIMEOUT_MS is not a number: {}", ms))?;
        }
        if let Some(seed) = lookup("CARD_LEDGER_SEED") {
            self.seed_demo_data = matches!(seed.as_str(), "1" | "true" | "yes");
        }
        if let Some(addr) = lookup("CARD_LEDGER_ADDR") {
            self.server_addr = addr;
        }
        if let Some(filter) = lookup("CARD_LEDGER_LOG") {
            self.log_filter = filter;
        }

        Ok(())
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = BankConfig::default();

        assert_eq!(config.database_path, PathBuf::from("card-ledger.db"));
        assert_eq!(config.busy_timeout(), Duration::from_secs(5));
        assert!(!config.seed_demo_data);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bank.json");
        std::fs::write(&path, r#"{ "database_path": "/tmp/bank.db", "seed_demo_data": true }"#)
            .unwrap();

        let config = BankConfig::from_file(&path).unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/bank.db"));
        assert!(config.seed_demo_data);
        assert_eq!(config.server_addr, "0.0.0.0:3000");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("CARD_LEDGER_DB", "other.db"),
            ("CARD_LEDGER_BUSY_TIMEOUT_MS", "250"),
            ("CARD_LEDGER_SEED", "true"),
            ("CARD_LEDGER_LOG", "card_ledger=debug"),
        ]
        .into_iter()
        .collect();

        let mut config = BankConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.database_path, PathBuf::from("other.db"));
        assert_eq!(config.busy_timeout_ms, 250);
        assert!(config.seed_demo_data);
        assert_eq!(config.log_filter, "card_ledger=debug");
    }

    #[test]
    fn test_bad_timeout_is_an_error() {
        let mut config = BankConfig::default();

        let result = config.apply_overrides(|key| {
            (key == "CARD_LEDGER_BUSY_TIMEOUT_MS").then(|| "soon".to_string())
        });

        assert!(result.is_err());
    }
}
