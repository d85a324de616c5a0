//! Workspace discovery and structure

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the marker directory at the workspace root
pub const WORKSPACE_DIR: &str = ".agency";

/// Represents an agency workspace
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Root directory of the workspace (parent of .agency/)
    root: PathBuf,
}

impl Workspace {
    /// Find workspace root by walking up from the current directory
    pub fn discover() -> Result<Self, WorkspaceError> {
        let current =
            std::env::current_dir().map_err(|e| WorkspaceError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find workspace root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, WorkspaceError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| WorkspaceError::IoError(e.to_string()))?;

        loop {
            if current.join(WORKSPACE_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(WorkspaceError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Use an explicit `--project` path, or discover from the current directory
    pub fn locate(explicit: Option<&Path>) -> Result<Self, WorkspaceError> {
        match explicit {
            Some(path) => Self::discover_from(path),
            None => Self::discover(),
        }
    }

    /// Create a new workspace structure at the given path
    pub fn init(path: &Path) -> Result<Self, WorkspaceError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        if root.join(WORKSPACE_DIR).exists() {
            return Err(WorkspaceError::AlreadyExists(root));
        }

        Self::create_layout(&root)?;
        Ok(Self { root })
    }

    /// Force initialization even if .agency/ exists (config is rewritten, data kept)
    pub fn init_force(path: &Path) -> Result<Self, WorkspaceError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Self::create_layout(&root)?;
        Ok(Self { root })
    }

    fn create_layout(root: &Path) -> Result<(), WorkspaceError> {
        let agency_dir = root.join(WORKSPACE_DIR);
        for dir in ["storage", "catalog"] {
            std::fs::create_dir_all(agency_dir.join(dir))
                .map_err(|e| WorkspaceError::IoError(e.to_string()))?;
        }
        std::fs::create_dir_all(root.join("exports"))
            .map_err(|e| WorkspaceError::IoError(e.to_string()))?;

        std::fs::write(agency_dir.join("config.yaml"), Self::default_config())
            .map_err(|e| WorkspaceError::IoError(e.to_string()))?;
        Ok(())
    }

    fn default_config() -> &'static str {
        r#"# Agency workspace configuration

# Default author recorded on quotes and briefs
# author: ""

# Code required to permanently delete cronograma projects
# admin_code: "1234"

# IVA percentage applied to quote subtotals
# iva_percentage: 19

# Shell command that receives a recommendation prompt on stdin
# and prints the model answer on stdout
# recommender_command: ""

# Default output format (auto, yaml, tsv, json, csv, md, id)
# default_format: auto
"#
    }

    /// Get the workspace root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .agency directory
    pub fn agency_dir(&self) -> PathBuf {
        self.root.join(WORKSPACE_DIR)
    }

    /// Directory holding local-storage snapshots
    pub fn storage_dir(&self) -> PathBuf {
        self.agency_dir().join("storage")
    }

    /// Path of the remote-store database
    pub fn remote_db_path(&self) -> PathBuf {
        self.agency_dir().join("remote.db")
    }

    /// Directory holding catalog overrides (clients, galleries, services)
    pub fn catalog_dir(&self) -> PathBuf {
        self.agency_dir().join("catalog")
    }

    /// Default directory for exported files
    pub fn exports_dir(&self) -> PathBuf {
        self.root.join("exports")
    }
}

/// Errors that can occur during workspace operations
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("not an agency workspace (searched from {searched_from:?}). Run 'agency init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("agency workspace already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_workspace_init_creates_structure() {
        let tmp = tempdir().unwrap();
        let ws = Workspace::init(tmp.path()).unwrap();

        assert!(ws.agency_dir().join("config.yaml").exists());
        assert!(ws.storage_dir().is_dir());
        assert!(ws.catalog_dir().is_dir());
        assert!(ws.exports_dir().is_dir());
    }

    #[test]
    fn test_workspace_init_fails_if_exists() {
        let tmp = tempdir().unwrap();
        Workspace::init(tmp.path()).unwrap();

        let err = Workspace::init(tmp.path()).unwrap_err();
        assert!(matches!(err, WorkspaceError::AlreadyExists(_)));
    }

    #[test]
    fn test_workspace_discover_from_nested_dir() {
        let tmp = tempdir().unwrap();
        Workspace::init(tmp.path()).unwrap();

        let subdir = tmp.path().join("clients/acme/briefs");
        std::fs::create_dir_all(&subdir).unwrap();

        let ws = Workspace::discover_from(&subdir).unwrap();
        assert_eq!(
            ws.root().canonicalize().unwrap(),
            tmp.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_workspace_discover_fails_without_marker() {
        let tmp = tempdir().unwrap();
        let err = Workspace::discover_from(tmp.path()).unwrap_err();
        assert!(matches!(err, WorkspaceError::NotFound { .. }));
    }
}
