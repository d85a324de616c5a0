//! Remote persistence for survey responses and cronograma projects
//!
//! Records are stored as opaque JSON payloads next to the columns used for
//! filtering. Only inserts, upserts, deletes and filtered selects are
//! supported; there are no migrations.

mod schema;

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use crate::core::identity::EntityId;
use crate::core::workspace::Workspace;
use crate::entities::project::Project;
use crate::entities::survey::{SurveyKind, SurveyResponse};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("cannot open remote store at {path}: {message}")]
    Open { path: String, message: String },

    #[error("remote query failed: {0}")]
    Query(String),

    #[error("stored record {id} is unreadable: {message}")]
    Decode { id: String, message: String },

    #[error("'{query}' matches {count} survey responses; use more characters of the id")]
    Ambiguous { query: String, count: usize },
}

impl From<rusqlite::Error> for RemoteError {
    fn from(e: rusqlite::Error) -> Self {
        RemoteError::Query(e.to_string())
    }
}

/// Table-oriented store shared by every client of the agency
pub trait RemoteStore {
    /// Insert a submitted survey response
    fn insert_survey(&self, response: &SurveyResponse) -> Result<(), RemoteError>;

    /// Responses, newest first, optionally of one survey kind
    fn surveys(&self, kind: Option<SurveyKind>) -> Result<Vec<SurveyResponse>, RemoteError>;

    /// Insert or replace a project row
    fn upsert_project(&self, project: &Project) -> Result<(), RemoteError>;

    /// All projects of a client
    fn projects(&self, client_nit: &str) -> Result<Vec<Project>, RemoteError>;

    /// Remove a project; returns whether a row existed
    fn delete_project(&self, id: &EntityId) -> Result<bool, RemoteError>;
}

/// SQLite-backed remote store
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open or create the store at `path`
    pub fn open(path: &Path) -> Result<Self, RemoteError> {
        let open_err = |message: String| RemoteError::Open {
            path: path.display().to_string(),
            message,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| open_err(e.to_string()))?;
        }
        let conn = Connection::open(path).map_err(|e| open_err(e.to_string()))?;
        let store = Self { conn };
        store.init_schema()?;
        tracing::debug!(path = %path.display(), "opened remote store");
        Ok(store)
    }

    /// The store of a workspace (`.agency/remote.db`)
    pub fn open_for(workspace: &Workspace) -> Result<Self, RemoteError> {
        Self::open(&workspace.remote_db_path())
    }

    /// Private in-memory store
    pub fn open_in_memory() -> Result<Self, RemoteError> {
        let conn = Connection::open_in_memory().map_err(|e| RemoteError::Open {
            path: ":memory:".to_string(),
            message: e.to_string(),
        })?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Find one response by full id or unique id prefix (at least 6 characters)
    pub fn survey(&self, query: &str) -> Result<Option<SurveyResponse>, RemoteError> {
        let mut stmt = self.conn.prepare("SELECT id, payload FROM survey_responses")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut matches = Vec::new();
        for row in rows {
            let (id, payload) = row?;
            let hit = id
                .parse::<EntityId>()
                .map(|parsed| parsed.matches(query))
                .unwrap_or(false);
            if hit {
                matches.push((id, payload));
            }
        }

        match matches.as_slice() {
            [] => Ok(None),
            [(id, payload)] => decode(id, payload).map(Some),
            _ => Err(RemoteError::Ambiguous {
                query: query.trim().to_string(),
                count: matches.len(),
            }),
        }
    }
}

fn encode<T: serde::Serialize>(id: &EntityId, value: &T) -> Result<String, RemoteError> {
    serde_json::to_string(value).map_err(|e| RemoteError::Decode {
        id: id.to_string(),
        message: e.to_string(),
    })
}

fn decode<T: serde::de::DeserializeOwned>(id: &str, payload: &str) -> Result<T, RemoteError> {
    serde_json::from_str(payload).map_err(|e| RemoteError::Decode {
        id: id.to_string(),
        message: e.to_string(),
    })
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339()
}

impl RemoteStore for SqliteStore {
    fn insert_survey(&self, response: &SurveyResponse) -> Result<(), RemoteError> {
        let payload = encode(&response.id, response)?;
        self.conn.execute(
            "INSERT INTO survey_responses (id, survey, payload, submitted_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                response.id.to_string(),
                response.survey.as_str(),
                payload,
                timestamp(response.submitted_at)
            ],
        )?;
        tracing::info!(id = %response.id, survey = %response.survey, "survey response stored");
        Ok(())
    }

    fn surveys(&self, kind: Option<SurveyKind>) -> Result<Vec<SurveyResponse>, RemoteError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, payload FROM survey_responses
             WHERE (?1 IS NULL OR survey = ?1)
             ORDER BY submitted_at DESC",
        )?;
        let rows = stmt.query_map(params![kind.map(|k| k.as_str())], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut responses = Vec::new();
        for row in rows {
            let (id, payload) = row?;
            responses.push(decode(&id, &payload)?);
        }
        Ok(responses)
    }

    fn upsert_project(&self, project: &Project) -> Result<(), RemoteError> {
        let payload = encode(&project.id, project)?;
        self.conn.execute(
            "INSERT INTO projects (id, client_nit, payload, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                client_nit = excluded.client_nit,
                payload = excluded.payload,
                updated_at = excluded.updated_at",
            params![
                project.id.to_string(),
                project.client_nit,
                payload,
                timestamp(Utc::now())
            ],
        )?;
        Ok(())
    }

    fn projects(&self, client_nit: &str) -> Result<Vec<Project>, RemoteError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, payload FROM projects WHERE client_nit = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![client_nit], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut projects = Vec::new();
        for row in rows {
            let (id, payload) = row?;
            match decode::<Project>(&id, &payload) {
                Ok(p) => projects.push(p),
                // One bad row must not hide the rest of the board
                Err(e) => tracing::warn!(error = %e, "skipping unreadable project row"),
            }
        }
        Ok(projects)
    }

    fn delete_project(&self, id: &EntityId) -> Result<bool, RemoteError> {
        let removed = self
            .conn
            .execute("DELETE FROM projects WHERE id = ?1", params![id.to_string()])?;
        Ok(removed > 0)
    }
}
