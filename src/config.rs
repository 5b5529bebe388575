// ⚙️ Configuration - where the spreadsheet lives and where the cache goes
//
// Priority (lowest → highest): built-in defaults, TOML file, environment.
// An unset or placeholder API key is the signal for local-only mode.

use crate::error::{FundError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Placeholder shipped in example config files
pub const PLACEHOLDER_API_KEY: &str = "YOUR_API_KEY";

/// Placeholder for an unconfigured spreadsheet id
pub const PLACEHOLDER_SPREADSHEET_ID: &str = "YOUR_SPREADSHEET_ID";

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "community-fund.toml";

pub const DEFAULT_API_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

// ============================================================================
// SHEET NAMES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetNames {
    pub contributions: String,
    pub mentors: String,
    pub users: String,
    pub villages: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        SheetNames {
            contributions: "Sheet1".to_string(),
            mentors: "Mentors".to_string(),
            users: "Users".to_string(),
            villages: "Villages".to_string(),
        }
    }
}

// ============================================================================
// FUND CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FundConfig {
    pub spreadsheet_id: String,
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub sheets: SheetNames,
    /// SQLite file backing the local cache
    pub cache_path: PathBuf,
}

impl Default for FundConfig {
    fn default() -> Self {
        FundConfig {
            spreadsheet_id: PLACEHOLDER_SPREADSHEET_ID.to_string(),
            api_key: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            sheets: SheetNames::default(),
            cache_path: PathBuf::from("community-fund.db"),
        }
    }
}

impl FundConfig {
    /// Load config: defaults, then `community-fund.toml` if present, then env
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let path = Path::new(DEFAULT_CONFIG_FILE);
        let config = if path.exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };

        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| FundError::Config(e.to_string()))
    }

    /// Apply `FUND_*` overrides; `lookup` is injectable for tests
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(id) = lookup("FUND_SPREADSHEET_ID") {
            self.spreadsheet_id = id;
        }
        if let Some(key) = lookup("FUND_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(url) = lookup("FUND_API_BASE_URL") {
            self.api_base_url = url;
        }
        if let Some(path) = lookup("FUND_CACHE_PATH") {
            self.cache_path = PathBuf::from(path);
        }
        self
    }

    /// Usable credential, or None when unset/placeholder
    pub fn credential(&self) -> Option<&str> {
        match self.api_key.as_deref().map(str::trim) {
            None | Some("") | Some(PLACEHOLDER_API_KEY) => None,
            Some(key) => Some(key),
        }
    }

    pub fn remote_configured(&self) -> bool {
        self.credential().is_some()
            && !self.spreadsheet_id.trim().is_empty()
            && self.spreadsheet_id != PLACEHOLDER_SPREADSHEET_ID
    }
}
