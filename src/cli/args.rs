//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    brief::BriefCommands, calendar::CalendarArgs, client::ClientCommands,
    completions::CompletionsArgs, config::ConfigCommands, gallery::GalleryCommands,
    init::InitArgs, project::ProjectCommands, quote::QuoteCommands, recommend::RecommendArgs,
    survey::SurveyCommands,
};

#[derive(Parser)]
#[command(name = "agency")]
#[command(author, version, about = "Agency toolkit")]
#[command(
    long_about = "Internal tools for a marketing agency: diagnostic surveys, quotes, creative briefs, the project cronograma and service recommendations."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug logging on stderr)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Workspace root (default: auto-detect by finding .agency/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new agency workspace
    Init(InitArgs),

    /// Diagnostic and quick surveys
    #[command(subcommand)]
    Survey(SurveyCommands),

    /// Cronograma projects of a client
    #[command(subcommand)]
    Project(ProjectCommands),

    /// Month calendar of a client's cronograma
    Calendar(CalendarArgs),

    /// Creative briefs
    #[command(subcommand)]
    Brief(BriefCommands),

    /// Quotations with IVA and print export
    #[command(subcommand)]
    Quote(QuoteCommands),

    /// Recommend agency services for a description of needs
    Recommend(RecommendArgs),

    /// Client lookup by NIT
    #[command(subcommand)]
    Client(ClientCommands),

    /// Client photo galleries behind access codes
    #[command(subcommand)]
    Gallery(GalleryCommands),

    /// View and modify configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Automatically detect based on context (yaml for show, tsv for list)
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Markdown tables
    Md,
    /// Just IDs, one per line
    Id,
}
