//! Agency records
//!
//! - [`SurveyResponse`] - submitted diagnostic or quick survey
//! - [`Project`] - scheduled work on a client's cronograma
//! - [`Quote`] - priced quotation with IVA
//! - [`Brief`] - creative request that seeds a project

pub mod brief;
pub mod calendar;
pub mod project;
pub mod quote;
pub mod survey;

pub use brief::{Brief, BriefForm};
pub use calendar::MonthCalendar;
pub use project::{Cronograma, Project, ProjectError, ProjectStatus, Transition, TransitionError};
pub use quote::{Quote, QuoteError, QuoteItem};
pub use survey::{SurveyKind, SurveyResponse};
