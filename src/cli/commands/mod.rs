//! CLI command implementations

pub mod brief;
pub mod calendar;
pub mod client;
pub mod completions;
pub mod config;
pub mod gallery;
pub mod init;
pub mod project;
pub mod quote;
pub mod recommend;
pub mod survey;
