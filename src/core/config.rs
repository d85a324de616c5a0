//! Configuration management with layered hierarchy

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::core::workspace::Workspace;

/// Code that gates permanent deletion when nothing else is configured
pub const DEFAULT_ADMIN_CODE: &str = "1234";

/// Name-field value that swaps a survey for its sample record
pub const DEFAULT_DEMO_CODE: &str = "0520";

pub const DEFAULT_IVA_PERCENTAGE: f64 = 19.0;

pub const DEFAULT_PLACEHOLDER_BASE_URL: &str = "https://placehold.co/600x400";

/// Agency configuration with layered hierarchy
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default author recorded on quotes and briefs
    pub author: Option<String>,

    /// Default output format
    pub default_format: Option<String>,

    /// Access code for destructive cronograma actions
    pub admin_code: Option<String>,

    /// Sentinel typed into a survey name field to load the sample record
    pub demo_code: Option<String>,

    /// IVA applied to quotes, in percent
    pub iva_percentage: Option<f64>,

    /// Shell command used as the recommendation backend
    pub recommender_command: Option<String>,

    /// Base URL for generated placeholder images
    pub placeholder_base_url: Option<String>,

    /// Delimiter for text exports (first character is used)
    pub export_delimiter: Option<String>,

    /// Quote items per printed page
    pub items_per_page: Option<usize>,
}

impl Config {
    /// Load configuration from all sources, discovering the workspace from the cwd
    pub fn load() -> Self {
        let workspace = Workspace::discover().ok();
        Self::load_for(workspace.as_ref())
    }

    /// Load configuration from all sources, merging in priority order
    pub fn load_for(workspace: Option<&Workspace>) -> Self {
        let mut config = Config::default();

        // Global user config (~/.config/agency/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // Workspace config (.agency/config.yaml)
        if let Some(ws) = workspace {
            if let Some(local) = Self::read_file(&ws.agency_dir().join("config.yaml")) {
                config.merge(local);
            }
        }

        // Environment variables
        if let Ok(author) = std::env::var("AGENCY_AUTHOR") {
            config.author = Some(author);
        }
        if let Ok(code) = std::env::var("AGENCY_ADMIN_CODE") {
            config.admin_code = Some(code);
        }
        if let Ok(command) = std::env::var("AGENCY_RECOMMENDER") {
            config.recommender_command = Some(command);
        }

        config
    }

    fn read_file(path: &std::path::Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable config file");
                return None;
            }
        };
        if contents.trim().is_empty() {
            return None;
        }
        match serde_yml::from_str::<Config>(&contents) {
            Ok(c) => Some(c),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring malformed config file");
                None
            }
        }
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "agency")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.author.is_some() {
            self.author = other.author;
        }
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
        if other.admin_code.is_some() {
            self.admin_code = other.admin_code;
        }
        if other.demo_code.is_some() {
            self.demo_code = other.demo_code;
        }
        if other.iva_percentage.is_some() {
            self.iva_percentage = other.iva_percentage;
        }
        if other.recommender_command.is_some() {
            self.recommender_command = other.recommender_command;
        }
        if other.placeholder_base_url.is_some() {
            self.placeholder_base_url = other.placeholder_base_url;
        }
        if other.export_delimiter.is_some() {
            self.export_delimiter = other.export_delimiter;
        }
        if other.items_per_page.is_some() {
            self.items_per_page = other.items_per_page;
        }
    }

    /// Get the author name, falling back to the login name
    pub fn author(&self) -> String {
        if let Some(ref author) = self.author {
            return author.clone();
        }
        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string())
    }

    pub fn admin_code(&self) -> &str {
        self.admin_code.as_deref().unwrap_or(DEFAULT_ADMIN_CODE)
    }

    pub fn demo_code(&self) -> &str {
        self.demo_code.as_deref().unwrap_or(DEFAULT_DEMO_CODE)
    }

    pub fn iva_percentage(&self) -> f64 {
        self.iva_percentage.unwrap_or(DEFAULT_IVA_PERCENTAGE)
    }

    pub fn placeholder_base_url(&self) -> &str {
        self.placeholder_base_url
            .as_deref()
            .unwrap_or(DEFAULT_PLACEHOLDER_BASE_URL)
    }

    pub fn export_delimiter(&self) -> u8 {
        self.export_delimiter
            .as_deref()
            .and_then(|d| d.bytes().next())
            .unwrap_or(b';')
    }

    pub fn items_per_page(&self) -> usize {
        self.items_per_page.filter(|n| *n > 0).unwrap_or(12)
    }

    /// Read a key by name, for `agency config show <key>`
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "author" => self.author.clone(),
            "default_format" => self.default_format.clone(),
            "admin_code" => self.admin_code.clone(),
            "demo_code" => self.demo_code.clone(),
            "iva_percentage" => self.iva_percentage.map(|v| v.to_string()),
            "recommender_command" => self.recommender_command.clone(),
            "placeholder_base_url" => self.placeholder_base_url.clone(),
            "export_delimiter" => self.export_delimiter.clone(),
            "items_per_page" => self.items_per_page.map(|v| v.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.admin_code(), "1234");
        assert_eq!(config.demo_code(), "0520");
        assert_eq!(config.iva_percentage(), 19.0);
        assert_eq!(config.export_delimiter(), b';');
        assert_eq!(config.items_per_page(), 12);
    }

    #[test]
    fn test_workspace_config_overrides_defaults() {
        let tmp = tempdir().unwrap();
        let ws = Workspace::init(tmp.path()).unwrap();
        std::fs::write(
            ws.agency_dir().join("config.yaml"),
            "iva_percentage: 5\nexport_delimiter: \"|\"\nitems_per_page: 0\n",
        )
        .unwrap();

        let config = Config::load_for(Some(&ws));
        assert_eq!(config.iva_percentage(), 5.0);
        assert_eq!(config.export_delimiter(), b'|');
        // zero falls back to the default page size
        assert_eq!(config.items_per_page(), 12);
    }

    #[test]
    fn test_malformed_config_is_ignored() {
        let tmp = tempdir().unwrap();
        let ws = Workspace::init(tmp.path()).unwrap();
        std::fs::write(ws.agency_dir().join("config.yaml"), "iva_percentage: [nope").unwrap();

        let config = Config::load_for(Some(&ws));
        assert_eq!(config.iva_percentage(), DEFAULT_IVA_PERCENTAGE);
    }
}
