//! Cronograma projects: scheduled work for one client, with its status lifecycle

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::remote::{RemoteError, RemoteStore};
use crate::core::storage::{keys, LocalStorage};
use crate::schema::validator::{FieldErrors, Validator};

/// Project status on the board
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Pending,
    Urgent,
    Completed,
    Archived,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Pending => "pending",
            ProjectStatus::Urgent => "urgent",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Archived => "archived",
        }
    }

    /// Still work to do
    pub fn is_open(&self) -> bool {
        matches!(self, ProjectStatus::Pending | ProjectStatus::Urgent)
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A status change requested from the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Prioritize,
    Complete,
    Archive,
    Restore,
}

impl Transition {
    pub fn verb(&self) -> &'static str {
        match self {
            Transition::Prioritize => "prioritize",
            Transition::Complete => "complete",
            Transition::Archive => "archive",
            Transition::Restore => "restore",
        }
    }

    /// Target status, or `None` if `from` does not allow this transition
    pub fn apply(&self, from: ProjectStatus) -> Option<ProjectStatus> {
        use ProjectStatus::*;
        match (self, from) {
            (Transition::Prioritize, Pending) => Some(Urgent),
            (Transition::Complete, Pending | Urgent) => Some(Completed),
            (Transition::Archive, Pending | Urgent | Completed) => Some(Archived),
            (Transition::Restore, Archived) => Some(Pending),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot {} a project that is {from}", .transition.verb())]
pub struct TransitionError {
    pub transition: Transition,
    pub from: ProjectStatus,
}

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("no project matches '{0}'")]
    NotFound(String),

    #[error("'{query}' matches {count} projects; use more characters of the id")]
    Ambiguous { query: String, count: usize },

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("invalid admin code")]
    InvalidAdminCode,

    #[error("import file is not a project export: {0}")]
    InvalidImport(String),
}

/// A scheduled project (cronograma entry)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: EntityId,

    #[serde(default)]
    pub client_nit: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Why the client needs it
    #[serde(default)]
    pub reason: String,

    #[serde(default)]
    pub image_url: Option<String>,

    pub due_date: NaiveDate,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub status: ProjectStatus,
}

impl Project {
    pub fn new(client_nit: impl Into<String>, title: impl Into<String>, due_date: NaiveDate) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Prj),
            client_nit: client_nit.into(),
            title: title.into(),
            description: String::new(),
            reason: String::new(),
            image_url: None,
            due_date,
            created_at: Utc::now(),
            status: ProjectStatus::Pending,
        }
    }

    pub fn transition(&mut self, transition: Transition) -> Result<ProjectStatus, TransitionError> {
        let next = transition.apply(self.status).ok_or(TransitionError {
            transition,
            from: self.status,
        })?;
        self.status = next;
        Ok(next)
    }

    pub fn prioritize(&mut self) -> Result<ProjectStatus, TransitionError> {
        self.transition(Transition::Prioritize)
    }

    pub fn complete(&mut self) -> Result<ProjectStatus, TransitionError> {
        self.transition(Transition::Complete)
    }

    pub fn archive(&mut self) -> Result<ProjectStatus, TransitionError> {
        self.transition(Transition::Archive)
    }

    pub fn restore(&mut self) -> Result<ProjectStatus, TransitionError> {
        self.transition(Transition::Restore)
    }

    /// Past its due date while still open
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status.is_open() && self.due_date < today
    }

    /// True if the image is embedded inline rather than linked
    pub fn has_inline_image(&self) -> bool {
        self.image_url
            .as_deref()
            .is_some_and(|url| url.starts_with("data:"))
    }

    /// Set a placeholder image built from the title if none is present
    pub fn ensure_image(&mut self, placeholder_base_url: &str) {
        let missing = self.image_url.as_deref().map_or(true, |u| u.trim().is_empty());
        if missing {
            self.image_url = Some(placeholder_image_url(placeholder_base_url, &self.title));
        }
    }
}

/// Field changes applied by `project edit`; status is never touched
#[derive(Debug, Clone, Default)]
pub struct ProjectEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub reason: Option<String>,
    pub image_url: Option<String>,
    pub due_date: Option<NaiveDate>,
}

impl ProjectEdit {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.reason.is_none()
            && self.image_url.is_none()
            && self.due_date.is_none()
    }

    pub fn apply(self, project: &mut Project) {
        if let Some(title) = self.title {
            project.title = title;
        }
        if let Some(description) = self.description {
            project.description = description;
        }
        if let Some(reason) = self.reason {
            project.reason = reason;
        }
        if let Some(image_url) = self.image_url {
            project.image_url = if image_url.trim().is_empty() {
                None
            } else {
                Some(image_url)
            };
        }
        if let Some(due_date) = self.due_date {
            project.due_date = due_date;
        }
    }
}

/// Placeholder image URL showing the project title
pub fn placeholder_image_url(base_url: &str, title: &str) -> String {
    let text: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '+' })
        .collect::<String>()
        .split('+')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("+");
    if text.is_empty() {
        base_url.to_string()
    } else {
        format!("{}?text={}", base_url.trim_end_matches('/'), text)
    }
}

/// Merge local and remote lists: local first, then remote rows whose id is not present
pub fn reconcile(local: Vec<Project>, remote: Vec<Project>) -> Vec<Project> {
    let mut merged = local;
    let mut added = 0;
    for project in remote {
        if !merged.iter().any(|p| p.id == project.id) {
            merged.push(project);
            added += 1;
        }
    }
    tracing::debug!(total = merged.len(), from_remote = added, "reconciled project lists");
    merged
}

/// Exported project list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectExport {
    pub client_nit: String,
    pub exported_at: DateTime<Utc>,
    pub projects: Vec<Project>,
}

/// Outcome of importing an export file
#[derive(Debug, Default)]
pub struct ImportReport {
    pub imported: Vec<EntityId>,
    /// Ids already on the board
    pub skipped: Vec<EntityId>,
    /// Entries that failed validation, by position in the file
    pub rejected: Vec<(usize, FieldErrors)>,
}

/// Result of writing the board to both stores
#[derive(Debug)]
pub struct SaveReport {
    pub local_saved: bool,
    pub remote_error: Option<RemoteError>,
}

impl SaveReport {
    pub fn is_complete(&self) -> bool {
        self.local_saved && self.remote_error.is_none()
    }
}

/// All projects of one client
#[derive(Debug, Clone, PartialEq)]
pub struct Cronograma {
    client_nit: String,
    projects: Vec<Project>,
}

impl Cronograma {
    pub fn new(client_nit: impl Into<String>) -> Self {
        Self {
            client_nit: client_nit.into(),
            projects: Vec::new(),
        }
    }

    pub fn with_projects(client_nit: impl Into<String>, projects: Vec<Project>) -> Self {
        Self {
            client_nit: client_nit.into(),
            projects,
        }
    }

    /// Load a client's board: local snapshot first, then remote rows not already present.
    ///
    /// Local read failures fall back to an empty list; remote failures are
    /// logged and the local list is used alone.
    pub fn load(client_nit: &str, storage: &LocalStorage, remote: Option<&dyn RemoteStore>) -> Self {
        let local: Vec<Project> = storage.load_or_default(&keys::cronograma_projects(client_nit));
        let remote_rows = match remote.map(|r| r.projects(client_nit)) {
            Some(Ok(rows)) => rows,
            Some(Err(e)) => {
                tracing::warn!(nit = client_nit, error = %e, "remote projects unavailable; using local list");
                Vec::new()
            }
            None => Vec::new(),
        };
        Self::with_projects(client_nit, reconcile(local, remote_rows))
    }

    /// Write the whole list locally and upsert every project remotely
    pub fn save(&self, storage: &LocalStorage, remote: Option<&dyn RemoteStore>) -> SaveReport {
        let local_saved = storage.set_or_warn(&keys::cronograma_projects(&self.client_nit), &self.projects);
        let remote_error = remote.and_then(|r| {
            self.projects
                .iter()
                .try_for_each(|p| r.upsert_project(p))
                .err()
        });
        if let Some(ref e) = remote_error {
            tracing::warn!(nit = %self.client_nit, error = %e, "remote project sync failed");
        }
        SaveReport {
            local_saved,
            remote_error,
        }
    }

    pub fn client_nit(&self) -> &str {
        &self.client_nit
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// Projects with one of `statuses` (all but archived when empty), by due date
    pub fn filtered(&self, statuses: &[ProjectStatus]) -> Vec<&Project> {
        let mut list: Vec<&Project> = self
            .projects
            .iter()
            .filter(|p| {
                if statuses.is_empty() {
                    p.status != ProjectStatus::Archived
                } else {
                    statuses.contains(&p.status)
                }
            })
            .collect();
        list.sort_by(|a, b| a.due_date.cmp(&b.due_date).then_with(|| a.title.cmp(&b.title)));
        list
    }

    fn position(&self, query: &str) -> Result<usize, ProjectError> {
        let matches: Vec<usize> = self
            .projects
            .iter()
            .enumerate()
            .filter(|(_, p)| p.id.matches(query))
            .map(|(i, _)| i)
            .collect();
        match matches.as_slice() {
            [i] => Ok(*i),
            [] => Err(ProjectError::NotFound(query.to_string())),
            _ => Err(ProjectError::Ambiguous {
                query: query.to_string(),
                count: matches.len(),
            }),
        }
    }

    pub fn find(&self, query: &str) -> Result<&Project, ProjectError> {
        self.position(query).map(|i| &self.projects[i])
    }

    pub fn add(&mut self, mut project: Project) -> &Project {
        project.client_nit = self.client_nit.clone();
        self.projects.push(project);
        &self.projects[self.projects.len() - 1]
    }

    /// Apply a status transition; the list is unchanged on error
    pub fn transition(&mut self, query: &str, transition: Transition) -> Result<&Project, ProjectError> {
        let i = self.position(query)?;
        self.projects[i].transition(transition)?;
        Ok(&self.projects[i])
    }

    pub fn edit(&mut self, query: &str, edit: ProjectEdit) -> Result<&Project, ProjectError> {
        let i = self.position(query)?;
        edit.apply(&mut self.projects[i]);
        Ok(&self.projects[i])
    }

    /// Permanently remove a project; requires the admin code
    pub fn delete(&mut self, query: &str, code: &str, admin_code: &str) -> Result<Project, ProjectError> {
        if code.trim() != admin_code {
            return Err(ProjectError::InvalidAdminCode);
        }
        let i = self.position(query)?;
        Ok(self.projects.remove(i))
    }

    /// Snapshot for export, with inline image data stripped
    pub fn export(&self) -> ProjectExport {
        let projects = self
            .projects
            .iter()
            .cloned()
            .map(|mut p| {
                if p.has_inline_image() {
                    p.image_url = None;
                }
                p
            })
            .collect();
        ProjectExport {
            client_nit: self.client_nit.clone(),
            exported_at: Utc::now(),
            projects,
        }
    }

    /// Import projects from an export document (or a bare array of projects).
    ///
    /// Each entry is validated against the `project` schema. Entries whose
    /// id is already on the board are skipped; entries without an image get
    /// a placeholder.
    pub fn import(
        &mut self,
        document: &Value,
        validator: &Validator,
        placeholder_base_url: &str,
    ) -> Result<ImportReport, ProjectError> {
        let entries = match document {
            Value::Array(items) => items,
            Value::Object(map) => map
                .get("projects")
                .and_then(|p| p.as_array())
                .ok_or_else(|| ProjectError::InvalidImport("missing 'projects' array".to_string()))?,
            _ => {
                return Err(ProjectError::InvalidImport(
                    "expected an object or an array".to_string(),
                ))
            }
        };

        let mut report = ImportReport::default();
        for (index, entry) in entries.iter().enumerate() {
            if let Err(errors) = validator.validate_value("project", entry) {
                report.rejected.push((index, errors));
                continue;
            }
            let mut project: Project = match serde_json::from_value(entry.clone()) {
                Ok(p) => p,
                Err(e) => {
                    let mut errors = FieldErrors::new();
                    errors.insert(crate::schema::validator::ROOT_FIELD.to_string(), e.to_string());
                    report.rejected.push((index, errors));
                    continue;
                }
            };

            if self.projects.iter().any(|p| p.id == project.id) {
                report.skipped.push(project.id);
                continue;
            }

            project.client_nit = self.client_nit.clone();
            project.ensure_image(placeholder_base_url);
            report.imported.push(project.id.clone());
            self.projects.push(project);
        }

        tracing::info!(
            nit = %self.client_nit,
            imported = report.imported.len(),
            skipped = report.skipped.len(),
            rejected = report.rejected.len(),
            "project import finished"
        );
        Ok(report)
    }
}
