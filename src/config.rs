use pf1_formula::{RulesTable, SimplifyOptions};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub strict: bool,
    pub roll_timeout_ms: u64,
    pub rules: RulesTable,
    /// Roll data `@` references resolve against.
    pub data: serde_json::Value,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            strict: true,
            roll_timeout_ms: 2000,
            rules: RulesTable::default(),
            data: serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}

impl Config {
    /// Reads a TOML config, falling back to defaults for anything unreadable.
    pub fn load(path: &Path) -> Config {
        let content = match std::fs::read(path) {
            Ok(content) => content,
            Err(e) => {
                log::warn!("Unable to read config file: {}", e);
                return Config::default();
            }
        };
        let mut config: Config = match toml::from_slice(&content) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Unable to parse config: {}", e);
                return Config::default();
            }
        };
        if let Err(e) = config.rules.validate() {
            log::warn!("{}, using the default rules", e);
            config.rules = RulesTable::default();
        }
        config
    }

    pub fn options(&self) -> SimplifyOptions {
        SimplifyOptions {
            strict: self.strict,
        }
    }

    pub fn roll_timeout(&self) -> Duration {
        Duration::from_millis(self.roll_timeout_ms)
    }
}
