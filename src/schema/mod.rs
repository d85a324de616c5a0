//! Schema system - validation, the survey wizard and document templates

pub mod registry;
pub mod template;
pub mod validator;
pub mod wizard;

pub use registry::SchemaRegistry;
pub use template::{TemplateError, TemplateGenerator};
pub use validator::{FieldErrors, ValidationError, Validator};
pub use wizard::{InteractivePrompter, SurveyWizard, WizardDraft};
