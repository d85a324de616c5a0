//! Shared helper functions for CLI commands
//!
//! This module contains the per-command context (workspace, config and
//! stores) and small formatting utilities used across command modules.

use console::style;
use miette::{miette, IntoDiagnostic, Result};
use std::path::{Path, PathBuf};

use crate::cli::GlobalOpts;
use crate::core::catalog::{normalize_nit, Catalog};
use crate::core::config::Config;
use crate::core::remote::{RemoteError, SqliteStore};
use crate::core::storage::LocalStorage;
use crate::core::workspace::Workspace;
use crate::schema::{SchemaRegistry, Validator};

/// Everything a workspace command needs
pub struct AppContext {
    pub workspace: Workspace,
    pub config: Config,
    pub storage: LocalStorage,
}

impl AppContext {
    /// Locate the workspace (`--project` or the current directory) and load its config
    pub fn open(global: &GlobalOpts) -> Result<Self> {
        let workspace = Workspace::locate(global.project.as_deref()).map_err(|e| miette!("{}", e))?;
        let config = Config::load_for(Some(&workspace));
        let storage = LocalStorage::open(&workspace);
        tracing::debug!(root = %workspace.root().display(), "workspace opened");
        Ok(Self {
            workspace,
            config,
            storage,
        })
    }

    /// Open the remote store. Failures are logged and reported once; callers
    /// continue with local data only.
    pub fn remote(&self) -> Option<SqliteStore> {
        match SqliteStore::open_for(&self.workspace) {
            Ok(store) => Some(store),
            Err(e) => {
                tracing::warn!(error = %e, "remote store unavailable");
                warn_remote_failure(&e);
                None
            }
        }
    }

    pub fn catalog(&self) -> Result<Catalog> {
        Catalog::load(Some(&self.workspace)).map_err(|e| miette!("{}", e))
    }

    /// `path` if given, else `exports/<file_name>` in the workspace
    pub fn export_path(&self, path: Option<&Path>, file_name: &str) -> Result<PathBuf> {
        match path {
            Some(p) => Ok(p.to_path_buf()),
            None => {
                let dir = self.workspace.exports_dir();
                std::fs::create_dir_all(&dir).into_diagnostic()?;
                Ok(dir.join(file_name))
            }
        }
    }
}

/// Schema validator over the embedded schemas
pub fn validator() -> Validator {
    Validator::new(&SchemaRegistry::default())
}

/// Generic notice for remote failures; details go to the log
pub fn warn_remote_failure(error: &RemoteError) {
    tracing::debug!(error = ?error, "remote failure detail");
    eprintln!(
        "{} Could not reach the shared store. Changes were kept locally; please try again later.",
        style("!").yellow()
    );
}

/// Validate and normalize a client NIT argument
pub fn parse_nit(raw: &str) -> Result<String> {
    let nit = normalize_nit(raw);
    if !(6..=12).contains(&nit.len()) {
        return Err(miette!(
            "'{}' is not a valid NIT (expected 6 to 12 digits, e.g. 900123456)",
            raw
        ));
    }
    Ok(nit)
}

/// Truncate a string to max_len characters, adding "..." if truncated
///
/// Useful for table columns that need fixed-width output.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("hi", 2), "hi");
        assert_eq!(truncate_str("Panadería El Trigal", 10), "Panader...");
    }

    #[test]
    fn test_parse_nit() {
        assert_eq!(parse_nit("900.123.456-7").unwrap(), "900123456");
        assert_eq!(parse_nit(" 800555111 ").unwrap(), "800555111");
        assert!(parse_nit("12").is_err());
        assert!(parse_nit("abc").is_err());
        assert!(parse_nit("abc123456").is_err());
        assert!(parse_nit("NIT 900123456").is_err());
    }
}
