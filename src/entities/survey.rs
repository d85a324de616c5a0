//! Survey definitions and submitted responses

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::core::identity::{EntityId, EntityPrefix};

/// Most options a multi-select question accepts
pub const MULTI_SELECT_LIMIT: usize = 3;

/// Which survey a response belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SurveyKind {
    /// Full marketing diagnostic (8 steps)
    Diagnostic,
    /// Short intake from the public site (3 steps)
    Quick,
}

impl SurveyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SurveyKind::Diagnostic => "diagnostic",
            SurveyKind::Quick => "quick",
        }
    }

    pub fn definition(&self) -> &'static SurveyDefinition {
        match self {
            SurveyKind::Diagnostic => &DIAGNOSTIC,
            SurveyKind::Quick => &QUICK,
        }
    }
}

impl std::fmt::Display for SurveyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SurveyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "diagnostic" => Ok(SurveyKind::Diagnostic),
            "quick" => Ok(SurveyKind::Quick),
            _ => Err(format!("Unknown survey: {}", s)),
        }
    }
}

/// One wizard step: a title and the fields it owns
#[derive(Debug)]
pub struct Step {
    pub key: &'static str,
    pub title: &'static str,
    pub fields: &'static [&'static str],
}

/// Static description of a survey: schema, steps and demo record
#[derive(Debug)]
pub struct SurveyDefinition {
    pub kind: SurveyKind,
    /// Name of the schema in the registry
    pub schema: &'static str,
    pub steps: &'static [Step],
    /// Field watched for the demo sentinel
    pub name_field: &'static str,
    sample: fn() -> Value,
}

impl SurveyDefinition {
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// The fixed sample record loaded by the demo sentinel
    pub fn sample_record(&self) -> Map<String, Value> {
        match (self.sample)() {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    /// Step index owning a field, if any
    pub fn step_of(&self, field: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.fields.contains(&field))
    }

    /// All fields in step order
    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.steps.iter().flat_map(|s| s.fields.iter().copied())
    }
}

static DIAGNOSTIC_STEPS: [Step; 8] = [
    Step {
        key: "contact",
        title: "Contact",
        fields: &["name", "company", "email", "phone", "city"],
    },
    Step {
        key: "business",
        title: "Business",
        fields: &["industry", "company_size", "years_in_business", "business_description"],
    },
    Step {
        key: "audience",
        title: "Audience",
        fields: &["target_audience", "age_ranges", "customer_channels"],
    },
    Step {
        key: "brand",
        title: "Brand",
        fields: &["brand_perception", "brand_values", "has_brand_manual"],
    },
    Step {
        key: "digital",
        title: "Digital presence",
        fields: &["social_networks", "has_website", "posting_frequency", "digital_satisfaction"],
    },
    Step {
        key: "competition",
        title: "Competition",
        fields: &["competitors", "competitive_advantage"],
    },
    Step {
        key: "goals",
        title: "Goals",
        fields: &["main_goals", "services_of_interest", "timeline"],
    },
    Step {
        key: "budget",
        title: "Budget",
        fields: &["monthly_budget", "decision_maker", "how_did_you_hear", "additional_comments"],
    },
];

static QUICK_STEPS: [Step; 3] = [
    Step {
        key: "contact",
        title: "Contact",
        fields: &["name", "email", "company"],
    },
    Step {
        key: "business",
        title: "Business",
        fields: &["industry", "main_goals"],
    },
    Step {
        key: "budget",
        title: "Budget",
        fields: &["monthly_budget", "timeline"],
    },
];

pub static DIAGNOSTIC: SurveyDefinition = SurveyDefinition {
    kind: SurveyKind::Diagnostic,
    schema: "diagnostic",
    steps: &DIAGNOSTIC_STEPS,
    name_field: "name",
    sample: diagnostic_sample,
};

pub static QUICK: SurveyDefinition = SurveyDefinition {
    kind: SurveyKind::Quick,
    schema: "quick",
    steps: &QUICK_STEPS,
    name_field: "name",
    sample: quick_sample,
};

fn diagnostic_sample() -> Value {
    json!({
        "name": "María Fernanda Ruiz",
        "company": "Panadería El Trigal",
        "email": "mafe@eltrigal.co",
        "phone": "+57 300 555 0134",
        "city": "Medellín",
        "industry": "food",
        "company_size": "11-50",
        "years_in_business": "5-10",
        "business_description": "Artisan bakery with three shops selling bread, pastries and catering for offices.",
        "target_audience": "Families and office workers in El Poblado and Laureles",
        "age_ranges": ["25-34", "35-44"],
        "customer_channels": ["store", "whatsapp", "social"],
        "brand_perception": "Traditional and reliable, but a little old-fashioned",
        "brand_values": ["quality", "tradition", "closeness"],
        "has_brand_manual": "partial",
        "social_networks": ["instagram", "facebook"],
        "has_website": false,
        "posting_frequency": "weekly",
        "digital_satisfaction": 2,
        "competitors": ["Pan Pa' Ya", "Astor"],
        "competitive_advantage": "Sourdough recipes kept since 1998 and same-day catering",
        "main_goals": ["brand_awareness", "sales"],
        "services_of_interest": ["branding", "social_media", "web_design"],
        "timeline": "1_month",
        "monthly_budget": "3M-5M",
        "decision_maker": "owner",
        "how_did_you_hear": "referral",
        "additional_comments": "We are opening a fourth shop in March."
    })
}

fn quick_sample() -> Value {
    json!({
        "name": "Andrés Castaño",
        "email": "andres@ferreteriacastano.com",
        "company": "Ferretería Castaño",
        "industry": "retail",
        "main_goals": ["leads", "digital_presence"],
        "monthly_budget": "1M-3M",
        "timeline": "3_months"
    })
}

/// A submitted survey; immutable once created
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SurveyResponse {
    pub id: EntityId,
    pub survey: SurveyKind,
    pub submitted_at: DateTime<Utc>,
    pub answers: Map<String, Value>,
}

impl SurveyResponse {
    pub fn new(survey: SurveyKind, answers: Map<String, Value>) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Srv),
            survey,
            submitted_at: Utc::now(),
            answers,
        }
    }

    /// Respondent name, if answered
    pub fn respondent(&self) -> &str {
        self.answers
            .get(self.survey.definition().name_field)
            .and_then(|v| v.as_str())
            .unwrap_or("-")
    }

    pub fn company(&self) -> &str {
        self.answers
            .get("company")
            .and_then(|v| v.as_str())
            .unwrap_or("-")
    }

    /// Answers as `(field, text)` rows in step order, for summaries and exports
    pub fn summary_rows(&self) -> Vec<(String, String)> {
        self.survey
            .definition()
            .fields()
            .filter_map(|field| {
                self.answers
                    .get(field)
                    .map(|v| (field.to_string(), display_value(v)))
            })
            .collect()
    }
}

/// Human-readable rendering of an answer
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(true) => "yes".to_string(),
        Value::Bool(false) => "no".to_string(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::validator::Validator;

    #[test]
    fn test_every_schema_field_belongs_to_one_step() {
        let validator = Validator::default();
        for def in [&DIAGNOSTIC, &QUICK] {
            let schema = validator.registry().get_json(def.schema).unwrap();
            let props = schema["properties"].as_object().unwrap();
            for name in props.keys() {
                let owners = def.steps.iter().filter(|s| s.fields.contains(&name.as_str())).count();
                assert_eq!(owners, 1, "{} owned by {} steps in {}", name, owners, def.schema);
            }
            assert_eq!(def.fields().count(), props.len());
        }
    }

    #[test]
    fn test_samples_satisfy_their_schemas() {
        let validator = Validator::default();
        for def in [&DIAGNOSTIC, &QUICK] {
            let sample = Value::Object(def.sample_record());
            assert!(
                validator.validate_value(def.schema, &sample).is_ok(),
                "sample for {} is invalid",
                def.schema
            );
        }
    }

    #[test]
    fn test_diagnostic_layout() {
        assert_eq!(DIAGNOSTIC.fields().count(), 28);
        assert_eq!(DIAGNOSTIC.step_count(), 8);
        assert_eq!(DIAGNOSTIC.step_of("competitors"), Some(5));
    }

    #[test]
    fn test_summary_rows_follow_step_order() {
        let response = SurveyResponse::new(SurveyKind::Quick, QUICK.sample_record());
        let rows = response.summary_rows();
        assert_eq!(rows[0], ("name".to_string(), "Andrés Castaño".to_string()));
        assert_eq!(rows[4].1, "leads, digital_presence");
        assert_eq!(response.respondent(), "Andrés Castaño");
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&json!(true)), "yes");
        assert_eq!(display_value(&json!(3)), "3");
        assert_eq!(display_value(&json!(["a", "b"])), "a, b");
    }
}
