//! Creative briefs: intake requests that seed a cronograma project

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::identity::{EntityId, EntityPrefix};
use crate::entities::project::Project;

/// A brief as submitted by a client contact
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Brief {
    pub id: EntityId,
    pub client_nit: String,
    pub requester: String,
    pub title: String,
    pub description: String,
    pub reason: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<String>,

    pub due_date: NaiveDate,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_url: Option<String>,

    pub submitted_at: DateTime<Utc>,
}

/// Brief fields as they appear in a form or file (the `brief` schema)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BriefForm {
    pub client_nit: String,
    pub requester: String,
    pub title: String,
    pub description: String,
    pub reason: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<String>,

    pub due_date: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_url: Option<String>,
}

impl BriefForm {
    /// Value to validate against the `brief` schema
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Turn a validated form into a brief. Fails only on an unparseable due date.
    pub fn into_brief(self) -> Result<Brief, chrono::ParseError> {
        let due_date = NaiveDate::parse_from_str(&self.due_date, "%Y-%m-%d")?;
        Ok(Brief {
            id: EntityId::new(EntityPrefix::Brf),
            client_nit: self.client_nit,
            requester: self.requester,
            title: self.title,
            description: self.description,
            reason: self.reason,
            objective: self.objective.filter(|s| !s.trim().is_empty()),
            channels: self.channels,
            due_date,
            reference_url: self.reference_url.filter(|s| !s.trim().is_empty()),
            submitted_at: Utc::now(),
        })
    }
}

impl Brief {
    /// New pending project carrying the brief's title, description, reason and due date
    pub fn to_project(&self) -> Project {
        let mut project = Project::new(self.client_nit.clone(), self.title.clone(), self.due_date);
        project.description = self.description.clone();
        project.reason = self.reason.clone();
        project
    }
}
