//! Core module - workspace, configuration, identity and persistence

pub mod catalog;
pub mod config;
pub mod identity;
pub mod remote;
pub mod storage;
pub mod workspace;

pub use catalog::{Catalog, CatalogError, Client, Gallery, Service};
pub use config::Config;
pub use identity::{EntityId, EntityPrefix, IdParseError};
pub use remote::{RemoteError, RemoteStore, SqliteStore};
pub use storage::{LocalStorage, StorageError};
pub use workspace::{Workspace, WorkspaceError};
