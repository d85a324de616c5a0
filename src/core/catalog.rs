//! Static lookup records: clients, galleries and the service catalog
//!
//! Defaults are embedded from `catalog/*.yaml`. A workspace may replace any
//! of the three files with its own copy under `.agency/catalog/`.

use rust_embed::Embed;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use thiserror::Error;

use crate::core::workspace::Workspace;

#[derive(Embed)]
#[folder = "catalog/"]
struct EmbeddedCatalog;

const CLIENTS_FILE: &str = "clients.yaml";
const GALLERIES_FILE: &str = "galleries.yaml";
const SERVICES_FILE: &str = "services.yaml";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("cannot read catalog file {file}: {message}")]
    Read { file: String, message: String },

    #[error("catalog file {file} is invalid: {message}")]
    Parse { file: String, message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Client {
    pub nit: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GalleryItem {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Gallery {
    pub id: String,
    pub title: String,
    pub client_nit: String,
    pub access_code: String,

    #[serde(default)]
    pub items: Vec<GalleryItem>,
}

impl Gallery {
    /// Codes are compared trimmed and case-insensitively
    pub fn accepts(&self, code: &str) -> bool {
        self.access_code.eq_ignore_ascii_case(code.trim())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub slug: String,
    pub name: String,
    pub summary: String,

    #[serde(default)]
    pub keywords: Vec<String>,
}

/// All lookup records
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub clients: Vec<Client>,
    pub galleries: Vec<Gallery>,
    pub services: Vec<Service>,
}

impl Catalog {
    /// Embedded records only
    pub fn embedded() -> Result<Self, CatalogError> {
        Self::load(None)
    }

    /// Embedded records, with workspace overrides where present
    pub fn load(workspace: Option<&Workspace>) -> Result<Self, CatalogError> {
        Ok(Self {
            clients: read_records(workspace, CLIENTS_FILE)?,
            galleries: read_records(workspace, GALLERIES_FILE)?,
            services: read_records(workspace, SERVICES_FILE)?,
        })
    }

    /// Client by NIT; dots, dashes, spaces and a trailing check digit are ignored
    pub fn client(&self, nit: &str) -> Option<&Client> {
        let wanted = normalize_nit(nit);
        if wanted.is_empty() {
            return None;
        }
        self.clients.iter().find(|c| normalize_nit(&c.nit) == wanted)
    }

    pub fn gallery(&self, id: &str) -> Option<&Gallery> {
        let id = id.trim();
        self.galleries.iter().find(|g| g.id.eq_ignore_ascii_case(id))
    }

    /// Service by slug or display name
    pub fn service(&self, key: &str) -> Option<&Service> {
        let key = key.trim();
        let slug_form = key.to_lowercase().replace([' ', '-'], "_");
        self.services
            .iter()
            .find(|s| s.slug == slug_form || s.name.eq_ignore_ascii_case(key))
    }
}

fn read_records<T: DeserializeOwned>(
    workspace: Option<&Workspace>,
    file: &str,
) -> Result<Vec<T>, CatalogError> {
    let override_path = workspace.map(|w| w.catalog_dir().join(file));

    let (origin, text) = match override_path.filter(|p| p.exists()) {
        Some(path) => {
            let text = fs::read_to_string(&path).map_err(|e| CatalogError::Read {
                file: path.display().to_string(),
                message: e.to_string(),
            })?;
            tracing::debug!(path = %path.display(), "using workspace catalog override");
            (path.display().to_string(), text)
        }
        None => {
            let content = EmbeddedCatalog::get(file).ok_or_else(|| CatalogError::Read {
                file: file.to_string(),
                message: "not embedded".to_string(),
            })?;
            let text = String::from_utf8_lossy(&content.data).into_owned();
            (file.to_string(), text)
        }
    };

    serde_yml::from_str(&text).map_err(|e| CatalogError::Parse {
        file: origin,
        message: e.to_string(),
    })
}

/// Digits of a NIT without separators or check digit (`900.123.456-7` -> `900123456`).
/// Anything besides digits, dots, dashes and spaces yields an empty string.
pub fn normalize_nit(nit: &str) -> String {
    let nit = nit.trim();
    if !nit
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | ' '))
    {
        return String::new();
    }
    let main = match nit.rsplit_once('-') {
        Some((head, check)) if check.trim().len() == 1 => head,
        _ => nit,
    };
    main.chars().filter(|c| c.is_ascii_digit()).collect()
}
