//! `agency brief` command - Creative briefs that seed cronograma projects

use chrono::{Duration, NaiveDate, Utc};
use clap::Subcommand;
use console::style;
use dialoguer::{theme::ColorfulTheme, Input, MultiSelect};
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::helpers::{parse_nit, validator, warn_remote_failure, AppContext};
use crate::cli::GlobalOpts;
use crate::core::catalog::normalize_nit;
use crate::core::remote::RemoteStore;
use crate::entities::brief::BriefForm;
use crate::entities::project::Cronograma;
use crate::schema::validator::FieldErrors;
use crate::schema::wizard::print_errors;
use crate::schema::TemplateGenerator;

#[derive(Subcommand, Debug)]
pub enum BriefCommands {
    /// Submit a brief, interactively or from a file
    New(NewArgs),

    /// Write a starter brief file to fill in
    Template(TemplateArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Brief file (YAML or JSON) instead of prompts
    #[arg(long, short = 'F')]
    pub file: Option<PathBuf>,

    /// Client NIT (prompted when omitted)
    #[arg(long, short = 'n', env = "AGENCY_NIT")]
    pub nit: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct TemplateArgs {
    /// Client NIT
    #[arg(long, short = 'n', env = "AGENCY_NIT")]
    pub nit: String,

    /// Requester name (default: configured author)
    #[arg(long)]
    pub requester: Option<String>,

    /// Due date (YYYY-MM-DD, default: two weeks from today)
    #[arg(long)]
    pub due: Option<NaiveDate>,

    /// Output file (default: stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

/// Channels offered in the interactive form
const CHANNELS: &[&str] = &[
    "instagram",
    "facebook",
    "tiktok",
    "linkedin",
    "website",
    "email",
    "print",
];

pub fn run(cmd: BriefCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        BriefCommands::New(args) => run_new(args, global),
        BriefCommands::Template(args) => run_template(args, global),
    }
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = AppContext::open(global)?;
    let validator = validator();

    let form: BriefForm = match &args.file {
        Some(path) => {
            let content = std::fs::read_to_string(path).into_diagnostic()?;
            let value = validator.validate_document(&content, &path.display().to_string(), "brief")?;
            serde_json::from_value(value).into_diagnostic()?
        }
        None => prompt_form(&ctx, args.nit.as_deref(), &validator)?,
    };

    let mut form = form;
    form.client_nit = parse_nit(&form.client_nit)?;
    let brief = form
        .into_brief()
        .map_err(|e| miette::miette!("Invalid due date: {}", e))?;

    let mut project = brief.to_project();
    project.ensure_image(ctx.config.placeholder_base_url());

    let remote = ctx.remote();
    let remote_ref = remote.as_ref().map(|r| r as &dyn RemoteStore);
    let mut cronograma = Cronograma::load(&brief.client_nit, &ctx.storage, remote_ref);
    let project_id = cronograma.add(project).id.clone();

    let report = cronograma.save(&ctx.storage, remote_ref);
    if !report.local_saved {
        return Err(miette::miette!("Could not save the cronograma for {}", brief.client_nit));
    }
    if let Some(e) = &report.remote_error {
        warn_remote_failure(e);
    }
    tracing::info!(brief = %brief.id, project = %project_id, nit = %brief.client_nit, "brief submitted");

    if global.quiet {
        println!("{}", project_id);
        return Ok(());
    }
    println!(
        "{} Brief {} received from {}",
        style("✓").green(),
        style(&brief.id).cyan(),
        brief.requester
    );
    println!(
        "  Created project {} due {} on the cronograma of {}",
        style(&project_id).cyan(),
        brief.due_date.format("%Y-%m-%d"),
        style(&brief.client_nit).cyan()
    );
    Ok(())
}

/// Ask every field, then re-ask only the fields the schema rejects
fn prompt_form(ctx: &AppContext, nit: Option<&str>, validator: &crate::schema::Validator) -> Result<BriefForm> {
    let theme = ColorfulTheme::default();
    let default_due = (Utc::now() + Duration::days(14)).date_naive();

    let mut form = BriefForm {
        client_nit: nit.map(normalize_nit).unwrap_or_default(),
        requester: ctx.config.author.clone().unwrap_or_default(),
        due_date: default_due.format("%Y-%m-%d").to_string(),
        ..BriefForm::default()
    };

    let mut pending: Vec<&str> = vec![
        "client_nit",
        "requester",
        "title",
        "description",
        "reason",
        "objective",
        "channels",
        "due_date",
        "reference_url",
    ];
    if nit.is_some() {
        pending.retain(|f| *f != "client_nit");
    }

    loop {
        for field in &pending {
            prompt_field(&theme, &mut form, field)?;
        }
        match validator.validate_value("brief", &form.to_value()) {
            Ok(()) => return Ok(form),
            Err(errors) => {
                println!();
                print_errors(&errors);
                pending = failed_fields(&errors);
                if pending.is_empty() {
                    return Err(miette::miette!("Brief is not valid"));
                }
            }
        }
    }
}

fn failed_fields(errors: &FieldErrors) -> Vec<&'static str> {
    const FIELDS: &[&str] = &[
        "client_nit",
        "requester",
        "title",
        "description",
        "reason",
        "objective",
        "channels",
        "due_date",
        "reference_url",
    ];
    FIELDS
        .iter()
        .copied()
        .filter(|f| errors.contains_key(*f))
        .collect()
}

fn prompt_text(theme: &ColorfulTheme, prompt: &str, current: &str, optional: bool) -> Result<String> {
    let mut input = Input::<String>::with_theme(theme)
        .with_prompt(prompt)
        .allow_empty(optional);
    if !current.is_empty() {
        input = input.default(current.to_string());
    }
    Ok(input.interact_text().into_diagnostic()?.trim().to_string())
}

fn prompt_field(theme: &ColorfulTheme, form: &mut BriefForm, field: &str) -> Result<()> {
    match field {
        "client_nit" => {
            form.client_nit = normalize_nit(&prompt_text(theme, "Client NIT", &form.client_nit, false)?)
        }
        "requester" => form.requester = prompt_text(theme, "Requested by", &form.requester, false)?,
        "title" => form.title = prompt_text(theme, "Title", &form.title, false)?,
        "description" => {
            form.description = prompt_text(theme, "What should be produced", &form.description, false)?
        }
        "reason" => form.reason = prompt_text(theme, "Why is it needed", &form.reason, false)?,
        "objective" => {
            let current = form.objective.clone().unwrap_or_default();
            let value = prompt_text(theme, "Objective (optional)", &current, true)?;
            form.objective = Some(value).filter(|v| !v.is_empty());
        }
        "channels" => {
            let defaults: Vec<bool> = CHANNELS
                .iter()
                .map(|c| form.channels.iter().any(|s| s == c))
                .collect();
            let picked = MultiSelect::with_theme(theme)
                .with_prompt("Channels (space to toggle)")
                .items(CHANNELS)
                .defaults(&defaults)
                .interact()
                .into_diagnostic()?;
            form.channels = picked.into_iter().map(|i| CHANNELS[i].to_string()).collect();
        }
        "due_date" => form.due_date = prompt_text(theme, "Due date (YYYY-MM-DD)", &form.due_date, false)?,
        "reference_url" => {
            let current = form.reference_url.clone().unwrap_or_default();
            let value = prompt_text(theme, "Reference URL (optional)", &current, true)?;
            form.reference_url = Some(value).filter(|v| !v.is_empty());
        }
        _ => {}
    }
    Ok(())
}

fn run_template(args: TemplateArgs, global: &GlobalOpts) -> Result<()> {
    let nit = parse_nit(&args.nit)?;
    let workspace = crate::core::Workspace::locate(global.project.as_deref()).ok();
    let config = crate::core::Config::load_for(workspace.as_ref());

    let requester = args.requester.unwrap_or_else(|| config.author());
    let due = args
        .due
        .unwrap_or_else(|| (Utc::now() + Duration::days(14)).date_naive());

    let generator = TemplateGenerator::new().map_err(|e| miette::miette!("{}", e))?;
    let yaml = generator
        .generate_brief(&nit, &requester, due)
        .map_err(|e| miette::miette!("{}", e))?;

    match args.output {
        Some(path) => {
            std::fs::write(&path, yaml).into_diagnostic()?;
            if !global.quiet {
                println!(
                    "{} Wrote starter brief to {}",
                    style("✓").green(),
                    style(path.display()).cyan()
                );
                println!(
                    "   Fill it in, then run {}",
                    style(format!("agency brief new --file {}", path.display())).yellow()
                );
            }
        }
        None => print!("{}", yaml),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_fields_keep_form_order() {
        let mut errors = FieldErrors::new();
        errors.insert("due_date".to_string(), "bad".to_string());
        errors.insert("title".to_string(), "required".to_string());
        errors.insert("_root".to_string(), "x".to_string());
        assert_eq!(failed_fields(&errors), vec!["title", "due_date"]);
    }
}
