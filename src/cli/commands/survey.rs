//! `agency survey` command - Diagnostic and quick surveys

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::helpers::{validator, warn_remote_failure, AppContext};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::remote::RemoteStore;
use crate::core::storage::keys;
use crate::entities::survey::{SurveyKind, SurveyResponse};
use crate::schema::wizard::{extract_fields, NavAction, SubmitError};
use crate::schema::{InteractivePrompter, SurveyWizard, TemplateGenerator, WizardDraft};

#[derive(Subcommand, Debug)]
pub enum SurveyCommands {
    /// Fill in a survey interactively, one step at a time
    Fill(FillArgs),

    /// Submit a survey from a YAML or JSON file
    Submit(SubmitArgs),

    /// List submitted responses
    List(ListArgs),

    /// Show a submitted response
    Show(ShowArgs),

    /// Export a response as delimited text
    Export(ExportArgs),

    /// Show the steps and fields of a survey
    Steps(StepsArgs),
}

#[derive(clap::Args, Debug)]
pub struct FillArgs {
    /// Survey to fill
    #[arg(value_enum)]
    pub survey: SurveyKind,

    /// Continue from the saved draft
    #[arg(long)]
    pub resume: bool,
}

#[derive(clap::Args, Debug)]
pub struct SubmitArgs {
    /// Survey the file answers
    #[arg(value_enum)]
    pub survey: SurveyKind,

    /// Answers file (YAML or JSON)
    #[arg(long, short = 'F')]
    pub file: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only responses to this survey
    #[arg(long, value_enum)]
    pub survey: Option<SurveyKind>,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Response ID or unique prefix
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// Response ID or unique prefix
    pub id: String,

    /// Output file (default: stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Field delimiter (default: export_delimiter from config, else ';')
    #[arg(long, short = 'd')]
    pub delimiter: Option<char>,
}

#[derive(clap::Args, Debug)]
pub struct StepsArgs {
    #[arg(value_enum)]
    pub survey: SurveyKind,
}

/// Column definitions for list output
const LIST_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("id", "ID", 32),
    ColumnDef::new("survey", "SURVEY", 12),
    ColumnDef::new("respondent", "RESPONDENT", 24),
    ColumnDef::new("company", "COMPANY", 28),
    ColumnDef::new("submitted", "SUBMITTED", 18),
];

pub fn run(cmd: SurveyCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        SurveyCommands::Fill(args) => run_fill(args, global),
        SurveyCommands::Submit(args) => run_submit(args, global),
        SurveyCommands::List(args) => run_list(args, global),
        SurveyCommands::Show(args) => run_show(args, global),
        SurveyCommands::Export(args) => run_export(args, global),
        SurveyCommands::Steps(args) => run_steps(args),
    }
}

fn run_fill(args: FillArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = AppContext::open(global)?;
    let validator = validator();
    let draft_key = keys::survey_draft(args.survey.as_str());
    let demo_code = ctx.config.demo_code().to_string();

    let draft = if args.resume {
        match ctx.storage.get::<WizardDraft>(&draft_key) {
            Ok(Some(draft)) => Some(draft),
            Ok(None) => {
                println!(
                    "{} No saved {} draft; starting a new survey",
                    style("!").yellow(),
                    args.survey
                );
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "survey draft unreadable");
                println!(
                    "{} Saved draft could not be read; starting a new survey",
                    style("!").yellow()
                );
                None
            }
        }
    } else {
        None
    };

    let mut wizard = match draft {
        Some(draft) => SurveyWizard::resume(draft, &validator, demo_code),
        None => SurveyWizard::new(args.survey, &validator, demo_code),
    }
    .map_err(|e| miette::miette!("{}", e))?;

    let prompter = InteractivePrompter::new();
    println!(
        "{} {} survey, {} steps",
        style("◆").cyan(),
        style(args.survey).bold(),
        wizard.definition().step_count()
    );

    loop {
        prompter.show_step(&wizard);
        prompter.prompt_step(&mut wizard)?;

        match prompter.choose_action(&wizard)? {
            NavAction::Next => {
                if let Err(errors) = wizard.go_next() {
                    tracing::debug!(count = errors.len(), "step has errors");
                }
            }
            NavAction::Back => {
                wizard.go_prev();
            }
            NavAction::SaveAndQuit => {
                ctx.storage.set(&draft_key, &wizard.to_draft()).into_diagnostic()?;
                println!(
                    "{} Draft saved. Continue with {}",
                    style("✓").green(),
                    style(format!("agency survey fill {} --resume", args.survey)).yellow()
                );
                return Ok(());
            }
            NavAction::Submit => match wizard.submit() {
                Ok(response) => {
                    if finish(&ctx, &response, global)? {
                        ctx.storage.remove_or_warn(&draft_key);
                    } else {
                        ctx.storage.set_or_warn(&draft_key, &wizard.to_draft());
                    }
                    return Ok(());
                }
                Err(SubmitError::Invalid(errors)) => {
                    println!(
                        "{} {} field(s) need attention before submitting",
                        style("✗").red(),
                        errors.len()
                    );
                    if let Some(step) = wizard.first_error_step() {
                        if step != wizard.current_step() {
                            println!(
                                "  Go back to step {} to fix them",
                                style(step + 1).cyan()
                            );
                        }
                    }
                }
                Err(e) => return Err(miette::miette!("{}", e)),
            },
        }

        // Every transition is recoverable with --resume
        ctx.storage.set_or_warn(&draft_key, &wizard.to_draft());
    }
}

fn run_submit(args: SubmitArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = AppContext::open(global)?;
    let validator = validator();

    let content = std::fs::read_to_string(&args.file).into_diagnostic()?;
    let filename = args.file.display().to_string();
    let value = validator.validate_document(&content, &filename, args.survey.definition().schema)?;

    let answers = match value {
        serde_json::Value::Object(map) => map,
        _ => return Err(miette::miette!("{} must contain a mapping of answers", filename)),
    };

    let response = SurveyResponse::new(args.survey, answers);
    if !finish(&ctx, &response, global)? {
        return Err(miette::miette!("Survey was not submitted. Please try again."));
    }
    Ok(())
}

/// Store a response remotely and print its summary. Returns whether it was stored.
fn finish(ctx: &AppContext, response: &SurveyResponse, global: &GlobalOpts) -> Result<bool> {
    let Some(remote) = ctx.remote() else {
        return Ok(false);
    };
    if let Err(e) = remote.insert_survey(response) {
        tracing::warn!(id = %response.id, error = %e, "survey insert failed");
        warn_remote_failure(&e);
        return Ok(false);
    }
    tracing::info!(id = %response.id, survey = %response.survey, "survey submitted");

    if global.quiet {
        println!("{}", response.id);
        return Ok(true);
    }

    println!(
        "{} Submitted {} survey {}",
        style("✓").green(),
        response.survey,
        style(&response.id).cyan()
    );
    println!();
    let generator = TemplateGenerator::new().map_err(|e| miette::miette!("{}", e))?;
    let summary = generator
        .render_survey_summary(response)
        .map_err(|e| miette::miette!("{}", e))?;
    print!("{}", summary);
    Ok(true)
}

fn find_response(ctx: &AppContext, query: &str) -> Result<SurveyResponse> {
    let remote = ctx
        .remote()
        .ok_or_else(|| miette::miette!("Survey responses are unavailable right now. Please try again."))?;
    remote
        .survey(query)
        .map_err(|e| miette::miette!("{}", e))?
        .ok_or_else(|| miette::miette!("No survey response matches '{}'", query))
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = AppContext::open(global)?;
    let remote = ctx
        .remote()
        .ok_or_else(|| miette::miette!("Survey responses are unavailable right now. Please try again."))?;
    let responses = remote.surveys(args.survey).map_err(|e| miette::miette!("{}", e))?;

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&responses).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&responses).into_diagnostic()?);
        }
        format => {
            if responses.is_empty() && format == OutputFormat::Auto {
                println!("No survey responses found.");
                return Ok(());
            }
            let rows = responses.iter().map(|r| {
                TableRow::new(r.id.to_string())
                    .cell("id", CellValue::Id(r.id.to_string()))
                    .cell("survey", CellValue::Text(r.survey.to_string()))
                    .cell("respondent", CellValue::Text(r.respondent().to_string()))
                    .cell("company", CellValue::Text(r.company().to_string()))
                    .cell("submitted", CellValue::DateTime(r.submitted_at))
            });
            TableFormatter::new(LIST_COLUMNS, "response").output(rows, format);
        }
    }
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = AppContext::open(global)?;
    let response = find_response(&ctx, &args.id)?;

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&response).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&response).into_diagnostic()?);
        }
        OutputFormat::Id => println!("{}", response.id),
        _ => {
            let generator = TemplateGenerator::new().map_err(|e| miette::miette!("{}", e))?;
            let summary = generator
                .render_survey_summary(&response)
                .map_err(|e| miette::miette!("{}", e))?;
            print!("{}", summary);
        }
    }
    Ok(())
}

fn run_export(args: ExportArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = AppContext::open(global)?;
    let response = find_response(&ctx, &args.id)?;

    let delimiter = match args.delimiter {
        Some(c) if c.is_ascii() => c as u8,
        Some(c) => return Err(miette::miette!("Delimiter '{}' must be a single ASCII character", c)),
        None => ctx.config.export_delimiter(),
    };

    let bytes = export_rows(&response, delimiter)?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, &bytes).into_diagnostic()?;
            if !global.quiet {
                println!(
                    "{} Exported {} to {}",
                    style("✓").green(),
                    style(&response.id).cyan(),
                    style(path.display()).cyan()
                );
            }
        }
        None => print!("{}", String::from_utf8_lossy(&bytes)),
    }
    Ok(())
}

/// `field<delim>value` lines, header first, in step order
fn export_rows(response: &SurveyResponse, delimiter: u8) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());
    writer.write_record(["field", "value"]).into_diagnostic()?;
    for (field, value) in response.summary_rows() {
        writer.write_record([field, value]).into_diagnostic()?;
    }
    writer.into_inner().map_err(|e| miette::miette!("{}", e))
}

fn run_steps(args: StepsArgs) -> Result<()> {
    let definition = args.survey.definition();
    let registry = crate::schema::SchemaRegistry::default();
    let schema = registry
        .get_json(definition.schema)
        .ok_or_else(|| miette::miette!("No schema for {} survey", args.survey))?;
    let fields = extract_fields(&schema);

    println!(
        "{} {} survey",
        style("◆").cyan(),
        style(args.survey).bold()
    );
    for (i, step) in definition.steps.iter().enumerate() {
        println!();
        println!("{} {}", style(format!("Step {}:", i + 1)).bold(), step.title);
        for name in step.fields {
            let required = fields.get(*name).is_some_and(|f| f.required);
            let marker = if required {
                style("*").red()
            } else {
                style(" ").dim()
            };
            println!("  {} {}", marker, name);
        }
    }
    println!();
    println!("{}", style("* required").dim());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_export_rows_use_delimiter() {
        let answers = json!({
            "name": "Ana; María",
            "email": "ana@example.com",
            "main_goals": ["leads", "sales"]
        });
        let response = SurveyResponse::new(
            SurveyKind::Quick,
            answers.as_object().cloned().unwrap_or_default(),
        );
        let text = String::from_utf8(export_rows(&response, b';').unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "field;value");
        assert_eq!(lines[1], "name;\"Ana; María\"");
        assert!(lines.contains(&"main_goals;leads, sales"));
    }
}
