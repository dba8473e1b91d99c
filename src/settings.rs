use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::categorizer::RuleTable;
use crate::error::{CardPivotError, Result};
use crate::models::{Bank, SignConvention};
use crate::normalizer::NormalizeOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// JSON rule table replacing the built-in rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules_file: Option<String>,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    #[serde(default = "default_scan_dir")]
    pub scan_dir: String,
    #[serde(default = "default_scan_days")]
    pub scan_days: u32,
    #[serde(default = "default_export_dir")]
    pub export_dir: String,
    /// Bank key (`amex`, `chase`, ...) to sign convention.
    #[serde(default)]
    pub sign_overrides: BTreeMap<String, SignConvention>,
    #[serde(default = "default_generic_sign")]
    pub generic_sign: SignConvention,
}

fn default_lookback_days() -> u32 {
    365
}

fn default_scan_days() -> u32 {
    30
}

fn default_scan_dir() -> String {
    "~/Downloads".to_string()
}

fn default_export_dir() -> String {
    "~/Documents/cardpivot/exports".to_string()
}

fn default_generic_sign() -> SignConvention {
    SignConvention::SpendPositive
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rules_file: None,
            lookback_days: default_lookback_days(),
            scan_dir: default_scan_dir(),
            scan_days: default_scan_days(),
            export_dir: default_export_dir(),
            sign_overrides: BTreeMap::new(),
            generic_sign: default_generic_sign(),
        }
    }
}

impl Settings {
    pub fn normalize_options(&self) -> Result<NormalizeOptions> {
        let mut sign_overrides = std::collections::HashMap::new();
        for (key, sign) in &self.sign_overrides {
            let bank = Bank::from_key(key)
                .map_err(|_| CardPivotError::Settings(format!("unknown bank in sign_overrides: {key}")))?;
            sign_overrides.insert(bank, *sign);
        }
        Ok(NormalizeOptions {
            sign_overrides,
            generic_sign: self.generic_sign,
        })
    }

    /// The configured rules file, or the built-in table.
    pub fn rule_table(&self) -> Result<RuleTable> {
        match &self.rules_file {
            Some(path) => RuleTable::load(&expand_path(path)),
            None => RuleTable::builtin(),
        }
    }

    pub fn scan_dir_path(&self) -> PathBuf {
        expand_path(&self.scan_dir)
    }

    pub fn export_dir_path(&self) -> PathBuf {
        expand_path(&self.export_dir)
    }
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

pub fn config_dir() -> PathBuf {
    home_dir().join(".config").join("cardpivot")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

/// Missing or unreadable settings fall back to defaults.
pub fn load_settings() -> Settings {
    let path = settings_path();
    if !path.exists() {
        return Settings::default();
    }
    let content = std::fs::read_to_string(&path).unwrap_or_default();
    serde_json::from_str(&content).unwrap_or_else(|e| {
        tracing::warn!("ignoring invalid settings file {}: {e}", path.display());
        Settings::default()
    })
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    std::fs::create_dir_all(config_dir())?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| CardPivotError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn settings_file_exists() -> bool {
    settings_path().exists()
}

pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        return home_dir().join(rest);
    }
    if path == "~" {
        return home_dir();
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.lookback_days, 365);
        assert_eq!(s.scan_days, 30);
        assert!(s.rules_file.is_none());
        assert_eq!(s.generic_sign, SignConvention::SpendPositive);
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"lookback_days": 90, "sign_overrides": {"amex": "spend_positive"}}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.lookback_days, 90);
        assert_eq!(s.scan_dir, "~/Downloads");
        let opts = s.normalize_options().unwrap();
        assert_eq!(opts.sign_overrides.get(&Bank::Amex), Some(&SignConvention::SpendPositive));
    }

    #[test]
    fn test_unknown_bank_override_is_an_error() {
        let json = r#"{"sign_overrides": {"monzo": "spend_negative"}}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert!(matches!(s.normalize_options(), Err(CardPivotError::Settings(_))));
    }

    #[test]
    fn test_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            rules_file: Some("/tmp/rules.json".to_string()),
            lookback_days: 30,
            ..Settings::default()
        };
        std::fs::write(&path, serde_json::to_string_pretty(&settings).unwrap()).unwrap();
        let loaded: Settings =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_rule_table_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, r#"[{"pattern": "deli", "category": "Lunch"}]"#).unwrap();
        let settings = Settings {
            rules_file: Some(path.to_string_lossy().to_string()),
            ..Settings::default()
        };
        assert_eq!(settings.rule_table().unwrap().len(), 1);
        assert!(Settings::default().rule_table().unwrap().len() > 100);
    }

    #[test]
    fn test_expand_path() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand_path("~/Downloads"), home.join("Downloads"));
        assert_eq!(expand_path("/var/tmp"), PathBuf::from("/var/tmp"));
    }
}
