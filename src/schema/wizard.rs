//! Multi-step survey wizard with per-step validation
//!
//! [`SurveyWizard`] is the state machine: it owns the current step, the
//! values collected so far and the errors of the last validated step.
//! [`InteractivePrompter`] drives it from a terminal with dialoguer,
//! building each prompt from the field's JSON Schema.

use chrono::{DateTime, Utc};
use console::style;
use dialoguer::{theme::ColorfulTheme, Input, MultiSelect, Select};
use miette::{IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::entities::survey::{SurveyDefinition, SurveyKind, SurveyResponse, MULTI_SELECT_LIMIT};
use crate::schema::validator::{CompiledSchema, FieldErrors, SchemaError, Validator};

/// Input shape of a field, derived from its schema
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text { min_length: Option<u64>, max_length: Option<u64> },
    Choice { options: Vec<String> },
    MultiChoice { options: Vec<String>, max: usize },
    /// Repeatable free-text entries (e.g. competitor names)
    List { max: Option<usize> },
    Rating { min: i64, max: i64 },
    Boolean,
}

/// Field information extracted from schema
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub description: Option<String>,
    pub kind: FieldKind,
    pub required: bool,
}

#[derive(Debug, Error, PartialEq)]
pub enum WizardError {
    #[error("'{field}' is not a field of the {survey} survey")]
    UnknownField { survey: SurveyKind, field: String },

    #[error("'{0}' is not a multiple-choice field")]
    NotMultiChoice(String),

    #[error("'{option}' is not an option of '{field}'")]
    UnknownOption { field: String, option: String },
}

/// Result of storing a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOutcome {
    Stored,
    Cleared,
    /// The demo sentinel replaced the whole form with the sample record
    DemoLoaded,
}

/// Result of toggling a multiple-choice option
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceOutcome {
    Added,
    Removed,
    /// Selection is already at the limit; nothing changed
    Rejected { limit: usize },
}

#[derive(Debug, Error, PartialEq)]
pub enum SubmitError {
    #[error("submit is only available on the last step (currently on step {current} of {total})")]
    NotLastStep { current: usize, total: usize },

    #[error("{} field(s) need attention", .0.len())]
    Invalid(FieldErrors),
}

/// Saved in-progress wizard, restored with [`SurveyWizard::resume`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WizardDraft {
    pub survey: SurveyKind,
    pub current_step: usize,
    pub form_state: Map<String, Value>,
    pub saved_at: DateTime<Utc>,
}

/// Survey wizard state machine
pub struct SurveyWizard {
    definition: &'static SurveyDefinition,
    current_step: usize,
    form_state: Map<String, Value>,
    errors: FieldErrors,
    step_schemas: Vec<CompiledSchema>,
    full_schema: CompiledSchema,
    fields: BTreeMap<String, FieldSpec>,
    demo_code: String,
}

impl SurveyWizard {
    pub fn new(
        kind: SurveyKind,
        validator: &Validator,
        demo_code: impl Into<String>,
    ) -> Result<Self, SchemaError> {
        let definition = kind.definition();
        let schema = validator
            .registry()
            .get_json(definition.schema)
            .ok_or_else(|| SchemaError::Unknown(definition.schema.to_string()))?;

        let step_schemas = definition
            .steps
            .iter()
            .map(|step| validator.compile_subset(definition.schema, step.fields))
            .collect::<Result<Vec<_>, _>>()?;
        let full_schema = CompiledSchema::compile(definition.schema, &schema)?;

        Ok(Self {
            definition,
            current_step: 0,
            form_state: Map::new(),
            errors: FieldErrors::new(),
            step_schemas,
            full_schema,
            fields: extract_fields(&schema),
            demo_code: demo_code.into(),
        })
    }

    /// Rebuild a wizard from a saved draft. The step is clamped to the valid range.
    pub fn resume(
        draft: WizardDraft,
        validator: &Validator,
        demo_code: impl Into<String>,
    ) -> Result<Self, SchemaError> {
        let mut wizard = Self::new(draft.survey, validator, demo_code)?;
        wizard.current_step = draft.current_step.min(wizard.last_step());
        wizard.form_state = draft
            .form_state
            .into_iter()
            .filter(|(k, _)| wizard.fields.contains_key(k))
            .collect();
        Ok(wizard)
    }

    pub fn to_draft(&self) -> WizardDraft {
        WizardDraft {
            survey: self.definition.kind,
            current_step: self.current_step,
            form_state: self.form_state.clone(),
            saved_at: Utc::now(),
        }
    }

    pub fn definition(&self) -> &'static SurveyDefinition {
        self.definition
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn last_step(&self) -> usize {
        self.definition.step_count().saturating_sub(1)
    }

    pub fn is_last_step(&self) -> bool {
        self.current_step == self.last_step()
    }

    pub fn form_state(&self) -> &Map<String, Value> {
        &self.form_state
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn value(&self, field: &str) -> Option<&Value> {
        self.form_state.get(field)
    }

    pub fn field_spec(&self, field: &str) -> Option<&FieldSpec> {
        self.fields.get(field)
    }

    /// Specs of the fields owned by the current step, in step order
    pub fn current_fields(&self) -> Vec<&FieldSpec> {
        self.definition.steps[self.current_step]
            .fields
            .iter()
            .filter_map(|f| self.fields.get(*f))
            .collect()
    }

    /// Store a value for a field. `null` and blank strings clear it.
    ///
    /// The demo sentinel typed into the name field replaces the whole form
    /// state with the survey's sample record.
    pub fn set_field(&mut self, field: &str, value: Value) -> Result<FieldOutcome, WizardError> {
        if !self.fields.contains_key(field) {
            return Err(WizardError::UnknownField {
                survey: self.definition.kind,
                field: field.to_string(),
            });
        }

        if field == self.definition.name_field
            && value.as_str().map(str::trim) == Some(self.demo_code.as_str())
        {
            self.form_state = self.definition.sample_record();
            self.errors.clear();
            return Ok(FieldOutcome::DemoLoaded);
        }

        let blank = match &value {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            _ => false,
        };
        if blank {
            self.form_state.remove(field);
            return Ok(FieldOutcome::Cleared);
        }

        self.form_state.insert(field.to_string(), value);
        Ok(FieldOutcome::Stored)
    }

    /// Select or deselect one option of a multiple-choice field.
    ///
    /// Deselecting always succeeds; selecting beyond the field's limit is
    /// rejected and leaves the selection unchanged.
    pub fn toggle_choice(&mut self, field: &str, option: &str) -> Result<ChoiceOutcome, WizardError> {
        let spec = self.fields.get(field).ok_or_else(|| WizardError::UnknownField {
            survey: self.definition.kind,
            field: field.to_string(),
        })?;
        let FieldKind::MultiChoice { options, max } = &spec.kind else {
            return Err(WizardError::NotMultiChoice(field.to_string()));
        };
        if !options.iter().any(|o| o == option) {
            return Err(WizardError::UnknownOption {
                field: field.to_string(),
                option: option.to_string(),
            });
        }
        let limit = *max;

        let mut selected: Vec<Value> = self
            .form_state
            .get(field)
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        if let Some(pos) = selected.iter().position(|v| v.as_str() == Some(option)) {
            selected.remove(pos);
            if selected.is_empty() {
                self.form_state.remove(field);
            } else {
                self.form_state.insert(field.to_string(), Value::Array(selected));
            }
            return Ok(ChoiceOutcome::Removed);
        }

        if selected.len() >= limit {
            return Ok(ChoiceOutcome::Rejected { limit });
        }

        selected.push(Value::String(option.to_string()));
        self.form_state.insert(field.to_string(), Value::Array(selected));
        Ok(ChoiceOutcome::Added)
    }

    /// Whether another option of `field` can currently be selected
    pub fn can_select_more(&self, field: &str) -> bool {
        let Some(FieldSpec {
            kind: FieldKind::MultiChoice { max, .. },
            ..
        }) = self.fields.get(field)
        else {
            return false;
        };
        let count = self
            .form_state
            .get(field)
            .and_then(|v| v.as_array())
            .map_or(0, |a| a.len());
        count < *max
    }

    /// Validate the current step's fields and advance if they all pass.
    ///
    /// Returns the new step index, or the errors of this step.
    pub fn go_next(&mut self) -> Result<usize, FieldErrors> {
        let state = Value::Object(self.form_state.clone());
        match self.step_schemas[self.current_step].check(&state) {
            Ok(()) => {
                self.errors.clear();
                self.current_step = (self.current_step + 1).min(self.last_step());
                Ok(self.current_step)
            }
            Err(errors) => {
                self.errors = errors.clone();
                Err(errors)
            }
        }
    }

    /// Go back one step without validating
    pub fn go_prev(&mut self) -> usize {
        self.current_step = self.current_step.saturating_sub(1);
        self.current_step
    }

    /// Validate everything collected and produce the finished response
    pub fn submit(&mut self) -> Result<SurveyResponse, SubmitError> {
        if !self.is_last_step() {
            return Err(SubmitError::NotLastStep {
                current: self.current_step + 1,
                total: self.definition.step_count(),
            });
        }

        let state = Value::Object(self.form_state.clone());
        match self.full_schema.check(&state) {
            Ok(()) => {
                self.errors.clear();
                Ok(SurveyResponse::new(self.definition.kind, self.form_state.clone()))
            }
            Err(errors) => {
                self.errors = errors.clone();
                Err(SubmitError::Invalid(errors))
            }
        }
    }

    /// Step owning the first field with an error
    pub fn first_error_step(&self) -> Option<usize> {
        self.errors
            .keys()
            .filter_map(|f| self.definition.step_of(f))
            .min()
    }
}

/// Extract field specs from a JSON Schema
pub fn extract_fields(schema: &Value) -> BTreeMap<String, FieldSpec> {
    let mut fields = BTreeMap::new();

    let required: Vec<&str> = schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();

    if let Some(props) = schema.get("properties").and_then(|p| p.as_object()) {
        for (name, prop) in props {
            if let Some(kind) = parse_kind(prop) {
                fields.insert(
                    name.clone(),
                    FieldSpec {
                        name: name.clone(),
                        description: prop
                            .get("description")
                            .and_then(|d| d.as_str())
                            .map(String::from),
                        kind,
                        required: required.contains(&name.as_str()),
                    },
                );
            }
        }
    }

    fields
}

fn string_options(value: Option<&Value>) -> Option<Vec<String>> {
    value.and_then(|e| e.as_array()).map(|arr| {
        arr.iter()
            .filter_map(|v| v.as_str())
            .map(String::from)
            .collect()
    })
}

fn parse_kind(schema: &Value) -> Option<FieldKind> {
    if let Some(options) = string_options(schema.get("enum")) {
        return Some(FieldKind::Choice { options });
    }

    match schema.get("type").and_then(|t| t.as_str()) {
        Some("string") => Some(FieldKind::Text {
            min_length: schema.get("minLength").and_then(|v| v.as_u64()),
            max_length: schema.get("maxLength").and_then(|v| v.as_u64()),
        }),
        Some("integer") => Some(FieldKind::Rating {
            min: schema.get("minimum").and_then(|v| v.as_i64()).unwrap_or(1),
            max: schema.get("maximum").and_then(|v| v.as_i64()).unwrap_or(5),
        }),
        Some("boolean") => Some(FieldKind::Boolean),
        Some("array") => {
            let items = schema.get("items").unwrap_or(&Value::Null);
            let max = schema
                .get("maxItems")
                .and_then(|v| v.as_u64())
                .map(|v| v as usize);
            match string_options(items.get("enum")) {
                Some(options) => Some(FieldKind::MultiChoice {
                    options,
                    max: max.unwrap_or(MULTI_SELECT_LIMIT),
                }),
                None => Some(FieldKind::List { max }),
            }
        }
        _ => None,
    }
}

/// What the user chose after filling a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAction {
    Next,
    Back,
    Submit,
    SaveAndQuit,
}

/// Terminal front-end for [`SurveyWizard`]
pub struct InteractivePrompter {
    theme: ColorfulTheme,
}

impl InteractivePrompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }

    /// Print the step header and any errors from the last validation
    pub fn show_step(&self, wizard: &SurveyWizard) {
        let def = wizard.definition();
        let step = &def.steps[wizard.current_step()];
        println!();
        println!(
            "{} Step {}/{} {}",
            style("◆").cyan(),
            wizard.current_step() + 1,
            def.step_count(),
            style(step.title).bold()
        );
        println!("{}", style("─".repeat(50)).dim());
        print_errors(wizard.errors());
    }

    /// Prompt every field of the current step. Returns true if the demo
    /// sentinel replaced the form state.
    pub fn prompt_step(&self, wizard: &mut SurveyWizard) -> Result<bool> {
        let specs: Vec<FieldSpec> = wizard.current_fields().into_iter().cloned().collect();
        for spec in specs {
            if self.prompt_field(wizard, &spec)? {
                println!(
                    "{} Sample record loaded into the {} survey",
                    style("✓").green(),
                    style(wizard.definition().kind).cyan()
                );
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Ask where to go next
    pub fn choose_action(&self, wizard: &SurveyWizard) -> Result<NavAction> {
        let mut actions = Vec::new();
        if wizard.is_last_step() {
            actions.push((NavAction::Submit, "Submit"));
        } else {
            actions.push((NavAction::Next, "Next step"));
        }
        if wizard.current_step() > 0 {
            actions.push((NavAction::Back, "Previous step"));
        }
        actions.push((NavAction::SaveAndQuit, "Save draft and quit"));

        let labels: Vec<&str> = actions.iter().map(|(_, l)| *l).collect();
        let selection = Select::with_theme(&self.theme)
            .with_prompt("Continue")
            .items(&labels)
            .default(0)
            .interact()
            .into_diagnostic()?;
        Ok(actions[selection].0)
    }

    fn prompt_field(&self, wizard: &mut SurveyWizard, spec: &FieldSpec) -> Result<bool> {
        let prompt = format_prompt(spec);
        let current = wizard.value(&spec.name).cloned();

        let value = match &spec.kind {
            FieldKind::Text { .. } => {
                let default = current
                    .as_ref()
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                let mut input = Input::<String>::with_theme(&self.theme)
                    .with_prompt(&prompt)
                    .allow_empty(true);
                if !default.is_empty() {
                    input = input.default(default);
                }
                Value::String(input.interact_text().into_diagnostic()?)
            }

            FieldKind::Choice { options } => {
                let default_idx = current
                    .as_ref()
                    .and_then(|v| v.as_str())
                    .and_then(|d| options.iter().position(|o| o == d))
                    .unwrap_or(0);
                let selection = Select::with_theme(&self.theme)
                    .with_prompt(&prompt)
                    .items(options)
                    .default(default_idx)
                    .interact()
                    .into_diagnostic()?;
                Value::String(options[selection].clone())
            }

            FieldKind::MultiChoice { options, max } => {
                self.prompt_multi_choice(wizard, spec, options, *max, &prompt)?;
                return Ok(false);
            }

            FieldKind::List { .. } => {
                let default = current
                    .as_ref()
                    .and_then(|v| v.as_array())
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(|i| i.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    })
                    .unwrap_or_default();
                let mut input = Input::<String>::with_theme(&self.theme)
                    .with_prompt(format!("{} (comma-separated)", prompt))
                    .allow_empty(true);
                if !default.is_empty() {
                    input = input.default(default);
                }
                let raw = input.interact_text().into_diagnostic()?;
                let items: Vec<Value> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| Value::String(s.to_string()))
                    .collect();
                if items.is_empty() {
                    Value::Null
                } else {
                    Value::Array(items)
                }
            }

            FieldKind::Rating { min, max } => {
                let options: Vec<String> = (*min..=*max).map(|n| n.to_string()).collect();
                let default_idx = current
                    .as_ref()
                    .and_then(|v| v.as_i64())
                    .and_then(|n| usize::try_from(n - min).ok())
                    .unwrap_or(0);
                let selection = Select::with_theme(&self.theme)
                    .with_prompt(&prompt)
                    .items(&options)
                    .default(default_idx.min(options.len().saturating_sub(1)))
                    .interact()
                    .into_diagnostic()?;
                Value::from(min + selection as i64)
            }

            FieldKind::Boolean => {
                let default_idx = match current.as_ref().and_then(|v| v.as_bool()) {
                    Some(false) => 1,
                    _ => 0,
                };
                let selection = Select::with_theme(&self.theme)
                    .with_prompt(&prompt)
                    .items(&["Yes", "No"])
                    .default(default_idx)
                    .interact()
                    .into_diagnostic()?;
                Value::Bool(selection == 0)
            }
        };

        let outcome = wizard.set_field(&spec.name, value).into_diagnostic()?;
        Ok(outcome == FieldOutcome::DemoLoaded)
    }

    /// Apply a checkbox selection through `toggle_choice` so the limit holds
    fn prompt_multi_choice(
        &self,
        wizard: &mut SurveyWizard,
        spec: &FieldSpec,
        options: &[String],
        max: usize,
        prompt: &str,
    ) -> Result<()> {
        let selected: Vec<String> = wizard
            .value(&spec.name)
            .and_then(|v| v.as_array())
            .map(|a| a.iter().filter_map(|v| v.as_str()).map(String::from).collect())
            .unwrap_or_default();
        let defaults: Vec<bool> = options.iter().map(|o| selected.contains(o)).collect();

        let picked = MultiSelect::with_theme(&self.theme)
            .with_prompt(format!("{} (choose up to {}, space to toggle)", prompt, max))
            .items(options)
            .defaults(&defaults)
            .interact()
            .into_diagnostic()?;

        // Deselect first so freed slots can be reused
        for option in &selected {
            let idx = options.iter().position(|o| o == option);
            if !idx.is_some_and(|i| picked.contains(&i)) {
                wizard.toggle_choice(&spec.name, option).into_diagnostic()?;
            }
        }
        for idx in picked {
            let option = &options[idx];
            if selected.contains(option) {
                continue;
            }
            if let ChoiceOutcome::Rejected { limit } =
                wizard.toggle_choice(&spec.name, option).into_diagnostic()?
            {
                println!(
                    "  {} '{}' not added: at most {} options",
                    style("!").yellow(),
                    option,
                    limit
                );
            }
        }
        Ok(())
    }
}

impl Default for InteractivePrompter {
    fn default() -> Self {
        Self::new()
    }
}

/// Print field errors the way the wizard shows them next to each field
pub fn print_errors(errors: &FieldErrors) {
    for (field, message) in errors {
        println!(
            "  {} {}: {}",
            style("✗").red(),
            style(field.replace('_', " ")).bold(),
            message
        );
    }
}

/// Format the prompt for a field
fn format_prompt(spec: &FieldSpec) -> String {
    let name = spec.name.replace('_', " ");
    let mut chars = name.chars();
    let name = match chars.next() {
        None => String::new(),
        Some(c) => c.to_uppercase().chain(chars).collect(),
    };
    let name = if spec.required {
        name
    } else {
        format!("{} (optional)", name)
    };

    if let Some(ref desc) = spec.description {
        let short_desc = if desc.chars().count() > 50 {
            format!("{}...", desc.chars().take(47).collect::<String>())
        } else {
            desc.clone()
        };
        format!("{} ({})", name, style(short_desc).dim())
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::survey::{DIAGNOSTIC, QUICK};
    use serde_json::json;

    fn wizard(kind: SurveyKind) -> SurveyWizard {
        SurveyWizard::new(kind, &Validator::default(), "0520").unwrap()
    }

    fn fill_step(w: &mut SurveyWizard, step: usize) {
        let sample = w.definition().sample_record();
        for field in w.definition().steps[step].fields {
            if let Some(v) = sample.get(*field) {
                w.set_field(field, v.clone()).unwrap();
            }
        }
    }

    #[test]
    fn test_go_next_blocks_on_invalid_step() {
        let mut w = wizard(SurveyKind::Quick);
        w.set_field("name", json!("Ana")).unwrap();

        let errors = w.go_next().unwrap_err();
        assert_eq!(w.current_step(), 0);
        // Only contact-step fields carry errors
        let keys: Vec<&str> = errors.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["company", "email"]);
        assert_eq!(w.errors(), &errors);
    }

    #[test]
    fn test_go_next_advances_and_clears_errors() {
        let mut w = wizard(SurveyKind::Quick);
        assert!(w.go_next().is_err());
        fill_step(&mut w, 0);

        assert_eq!(w.go_next(), Ok(1));
        assert!(w.errors().is_empty());
    }

    #[test]
    fn test_go_next_ignores_other_steps_fields() {
        let mut w = wizard(SurveyKind::Quick);
        fill_step(&mut w, 0);
        // An invalid value in a later step does not block step 0
        w.set_field("timeline", json!("yesterday")).unwrap();
        assert_eq!(w.go_next(), Ok(1));
    }

    #[test]
    fn test_go_next_saturates_at_last_step() {
        let mut w = wizard(SurveyKind::Quick);
        w.set_field("name", json!("0520")).unwrap();
        for _ in 0..5 {
            w.go_next().unwrap();
        }
        assert_eq!(w.current_step(), 2);
    }

    #[test]
    fn test_go_prev_never_fails_or_mutates() {
        let mut w = wizard(SurveyKind::Diagnostic);
        assert_eq!(w.go_prev(), 0);

        fill_step(&mut w, 0);
        w.go_next().unwrap();
        fill_step(&mut w, 1);
        w.set_field("company_size", json!("not a size")).unwrap();
        let before = w.form_state().clone();

        assert_eq!(w.go_prev(), 0);
        assert_eq!(w.form_state(), &before);
    }

    #[test]
    fn test_values_survive_back_and_forth() {
        let mut w = wizard(SurveyKind::Diagnostic);
        fill_step(&mut w, 0);
        w.go_next().unwrap();
        w.go_prev();
        assert_eq!(w.value("company"), Some(&json!("Panadería El Trigal")));
        assert_eq!(w.go_next(), Ok(1));
    }

    #[test]
    fn test_demo_sentinel_loads_sample() {
        for def in [&DIAGNOSTIC, &QUICK] {
            let mut w = wizard(def.kind);
            w.set_field("company", json!("Something else")).unwrap();
            let outcome = w.set_field("name", json!(" 0520 ")).unwrap();
            assert_eq!(outcome, FieldOutcome::DemoLoaded);
            assert_eq!(w.form_state(), &def.sample_record());
            assert!(w.errors().is_empty());
        }
    }

    #[test]
    fn test_sentinel_only_applies_to_name_field() {
        let mut w = wizard(SurveyKind::Quick);
        let outcome = w.set_field("company", json!("0520")).unwrap();
        assert_eq!(outcome, FieldOutcome::Stored);
        assert_eq!(w.form_state().len(), 1);
    }

    #[test]
    fn test_blank_clears_field() {
        let mut w = wizard(SurveyKind::Quick);
        w.set_field("company", json!("Acme")).unwrap();
        assert_eq!(w.set_field("company", json!("  ")).unwrap(), FieldOutcome::Cleared);
        assert!(w.value("company").is_none());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut w = wizard(SurveyKind::Quick);
        let err = w.set_field("favourite_colour", json!("blue")).unwrap_err();
        assert!(matches!(err, WizardError::UnknownField { .. }));
    }

    #[test]
    fn test_toggle_choice_caps_at_three() {
        let mut w = wizard(SurveyKind::Quick);
        for option in ["sales", "leads", "loyalty"] {
            assert_eq!(w.toggle_choice("main_goals", option), Ok(ChoiceOutcome::Added));
        }
        assert!(!w.can_select_more("main_goals"));

        assert_eq!(
            w.toggle_choice("main_goals", "launch"),
            Ok(ChoiceOutcome::Rejected { limit: 3 })
        );
        assert_eq!(w.value("main_goals"), Some(&json!(["sales", "leads", "loyalty"])));

        // Deselection is always allowed and frees a slot
        assert_eq!(w.toggle_choice("main_goals", "leads"), Ok(ChoiceOutcome::Removed));
        assert!(w.can_select_more("main_goals"));
        assert_eq!(w.toggle_choice("main_goals", "launch"), Ok(ChoiceOutcome::Added));
        assert_eq!(w.value("main_goals"), Some(&json!(["sales", "loyalty", "launch"])));
    }

    #[test]
    fn test_toggle_choice_errors() {
        let mut w = wizard(SurveyKind::Quick);
        assert_eq!(
            w.toggle_choice("industry", "retail"),
            Err(WizardError::NotMultiChoice("industry".to_string()))
        );
        assert!(matches!(
            w.toggle_choice("main_goals", "fame"),
            Err(WizardError::UnknownOption { .. })
        ));
    }

    #[test]
    fn test_removing_last_choice_clears_field() {
        let mut w = wizard(SurveyKind::Quick);
        w.toggle_choice("main_goals", "sales").unwrap();
        w.toggle_choice("main_goals", "sales").unwrap();
        assert!(w.value("main_goals").is_none());
    }

    #[test]
    fn test_submit_requires_last_step() {
        let mut w = wizard(SurveyKind::Quick);
        assert_eq!(
            w.submit(),
            Err(SubmitError::NotLastStep { current: 1, total: 3 })
        );
    }

    #[test]
    fn test_submit_runs_full_validation() {
        let mut w = wizard(SurveyKind::Quick);
        w.set_field("name", json!("0520")).unwrap();
        w.go_next().unwrap();
        w.go_next().unwrap();
        // Break a field from an earlier step after passing it
        w.set_field("email", json!("nope")).unwrap();

        let err = w.submit().unwrap_err();
        let SubmitError::Invalid(errors) = err else {
            panic!("expected invalid");
        };
        assert!(errors.contains_key("email"));
        assert_eq!(w.current_step(), 2);
        assert_eq!(w.first_error_step(), Some(0));

        w.set_field("email", json!("andres@ferreteriacastano.com")).unwrap();
        let response = w.submit().unwrap();
        assert_eq!(response.survey, SurveyKind::Quick);
        assert_eq!(response.answers, QUICK.sample_record());
    }

    #[test]
    fn test_draft_roundtrip_resumes_step_and_values() {
        let mut w = wizard(SurveyKind::Diagnostic);
        fill_step(&mut w, 0);
        w.go_next().unwrap();
        let mut draft = w.to_draft();
        draft.form_state.insert("stale_field".to_string(), json!("x"));

        let resumed = SurveyWizard::resume(draft, &Validator::default(), "0520").unwrap();
        assert_eq!(resumed.current_step(), 1);
        assert_eq!(resumed.value("city"), Some(&json!("Medellín")));
        assert!(resumed.value("stale_field").is_none());
    }

    #[test]
    fn test_extract_fields_kinds() {
        let w = wizard(SurveyKind::Diagnostic);
        assert!(matches!(
            w.field_spec("age_ranges").unwrap().kind,
            FieldKind::MultiChoice { max: 3, .. }
        ));
        assert_eq!(
            w.field_spec("competitors").unwrap().kind,
            FieldKind::List { max: Some(5) }
        );
        assert_eq!(
            w.field_spec("digital_satisfaction").unwrap().kind,
            FieldKind::Rating { min: 1, max: 5 }
        );
        assert_eq!(w.field_spec("has_website").unwrap().kind, FieldKind::Boolean);
        assert!(!w.field_spec("additional_comments").unwrap().required);
    }
}
