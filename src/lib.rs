//! Agency toolkit
//!
//! Command-line tools for a marketing agency: diagnostic surveys, quotes,
//! creative briefs, the project cronograma and service recommendations.

pub mod cli;
pub mod core;
pub mod entities;
pub mod recommend;
pub mod schema;
