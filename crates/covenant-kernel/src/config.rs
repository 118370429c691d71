//! Configuration for the Covenant kernel.

use covenant_watchdog::WatchdogConfig;
use serde::{Deserialize, Serialize};

use crate::agents::AgentSpec;

/// Main kernel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Ledger backend selection
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Watchdog cadence and context window
    #[serde(default)]
    pub watchdog: WatchdogConfig,

    /// The governing ruleset agents swear their oaths against
    #[serde(default)]
    pub ruleset: RulesetConfig,

    /// Agents constructed and admitted at startup
    #[serde(default)]
    pub agents: Vec<AgentSpec>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            ledger: LedgerConfig::default(),
            watchdog: WatchdogConfig::default(),
            ruleset: RulesetConfig::default(),
            agents: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Ledger backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LedgerConfig {
    /// In-memory chain (development/testing)
    Memory,

    /// Durable JSON-lines chain
    File {
        /// Ledger file path
        path: String,
    },
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig::Memory
    }
}

/// Governing ruleset configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesetConfig {
    #[serde(default = "default_ruleset_version")]
    pub version: String,

    #[serde(default = "default_ruleset_text")]
    pub text: String,
}

impl Default for RulesetConfig {
    fn default() -> Self {
        Self {
            version: default_ruleset_version(),
            text: default_ruleset_text(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value helpers
fn default_ruleset_version() -> String {
    "2026.1".to_string()
}

fn default_ruleset_text() -> String {
    "license before broadcast; approval before transfer; proposal before vote".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl KernelConfig {
    /// Load configuration: defaults, then an optional file, then
    /// `COVENANT_`-prefixed environment variables.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&KernelConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("COVENANT")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_memory_ledger() {
        let config = KernelConfig::default();
        assert!(matches!(config.ledger, LedgerConfig::Memory));
        assert_eq!(config.watchdog.check_interval_cycles, 10);
        assert!(config.agents.is_empty());
    }

    #[test]
    fn load_without_file_matches_defaults() {
        let config = KernelConfig::load(None).unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.ruleset.version, "2026.1");
    }

    #[test]
    fn ledger_config_roundtrips_through_serde() {
        let file = LedgerConfig::File {
            path: "/var/lib/covenant/ledger.jsonl".to_string(),
        };
        let json = serde_json::to_string(&file).unwrap();
        assert!(json.contains("\"type\":\"file\""));
        let restored: LedgerConfig = serde_json::from_str(&json).unwrap();
        assert!(matches!(restored, LedgerConfig::File { .. }));
    }
}
