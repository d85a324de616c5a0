//! `agency project` command - Cronograma project management

use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::helpers::{parse_nit, truncate_str, validator, warn_remote_failure, AppContext};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::remote::{RemoteStore, SqliteStore};
use crate::entities::project::{Cronograma, Project, ProjectEdit, ProjectStatus, Transition};
use crate::schema::wizard::print_errors;

#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// List a client's projects
    List(ListArgs),

    /// Add a project to a client's cronograma
    New(NewArgs),

    /// Show a project's details
    Show(TargetArgs),

    /// Edit a project's fields (status is unchanged)
    Edit(EditArgs),

    /// Mark a pending project as urgent
    Prioritize(TargetArgs),

    /// Mark a project as completed
    Complete(TargetArgs),

    /// Archive a project (hidden from the default list)
    Archive(TargetArgs),

    /// Move an archived project back to pending
    Restore(TargetArgs),

    /// Permanently delete a project (requires the admin code)
    Delete(DeleteArgs),

    /// Export a client's projects to JSON
    Export(ExportArgs),

    /// Import projects from an exported JSON file
    Import(ImportArgs),
}

#[derive(clap::Args, Debug)]
pub struct NitArg {
    /// Client NIT
    #[arg(long, short = 'n', env = "AGENCY_NIT")]
    pub nit: String,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub client: NitArg,

    /// Only these statuses (default: everything but archived)
    #[arg(long, short = 's', value_enum, value_delimiter = ',')]
    pub status: Vec<ProjectStatus>,

    /// Include archived projects
    #[arg(long)]
    pub all: bool,

    /// Only projects past their due date that are still open
    #[arg(long)]
    pub overdue: bool,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    #[command(flatten)]
    pub client: NitArg,

    /// Project title
    #[arg(long, short = 't')]
    pub title: String,

    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: NaiveDate,

    #[arg(long, short = 'd', default_value = "")]
    pub description: String,

    /// Why the client needs it
    #[arg(long, default_value = "")]
    pub reason: String,

    /// Image URL (default: generated placeholder)
    #[arg(long)]
    pub image: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct TargetArgs {
    #[command(flatten)]
    pub client: NitArg,

    /// Project ID or unique prefix
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[arg(long, short = 't')]
    pub title: Option<String>,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    #[arg(long)]
    pub reason: Option<String>,

    /// Image URL (empty string removes it)
    #[arg(long)]
    pub image: Option<String>,

    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<NaiveDate>,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Admin code (prompted when omitted)
    #[arg(long)]
    pub code: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    #[command(flatten)]
    pub client: NitArg,

    /// Output file (default: exports/cronograma_<nit>_<date>.json)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    #[command(flatten)]
    pub client: NitArg,

    /// Exported JSON file
    pub file: PathBuf,
}

/// Column definitions for list output
const LIST_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("id", "ID", 32),
    ColumnDef::new("title", "TITLE", 36),
    ColumnDef::new("status", "STATUS", 10),
    ColumnDef::new("due", "DUE", 24),
    ColumnDef::new("reason", "REASON", 30),
];

pub fn run(cmd: ProjectCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ProjectCommands::List(args) => run_list(args, global),
        ProjectCommands::New(args) => run_new(args, global),
        ProjectCommands::Show(args) => run_show(args, global),
        ProjectCommands::Edit(args) => run_edit(args, global),
        ProjectCommands::Prioritize(args) => run_transition(args, Transition::Prioritize, global),
        ProjectCommands::Complete(args) => run_transition(args, Transition::Complete, global),
        ProjectCommands::Archive(args) => run_transition(args, Transition::Archive, global),
        ProjectCommands::Restore(args) => run_transition(args, Transition::Restore, global),
        ProjectCommands::Delete(args) => run_delete(args, global),
        ProjectCommands::Export(args) => run_export(args, global),
        ProjectCommands::Import(args) => run_import(args, global),
    }
}

/// Client board with its remote store, ready to mutate and save
struct Board {
    ctx: AppContext,
    remote: Option<SqliteStore>,
    cronograma: Cronograma,
}

impl Board {
    fn open(nit: &str, global: &GlobalOpts) -> Result<Self> {
        let nit = parse_nit(nit)?;
        let ctx = AppContext::open(global)?;
        let remote = ctx.remote();
        let cronograma = Cronograma::load(
            &nit,
            &ctx.storage,
            remote.as_ref().map(|r| r as &dyn RemoteStore),
        );
        Ok(Self {
            ctx,
            remote,
            cronograma,
        })
    }

    fn remote(&self) -> Option<&dyn RemoteStore> {
        self.remote.as_ref().map(|r| r as &dyn RemoteStore)
    }

    /// Persist to both stores; a remote failure is reported but not fatal
    fn save(&self) -> Result<()> {
        let report = self.cronograma.save(&self.ctx.storage, self.remote());
        if !report.local_saved {
            return Err(miette::miette!(
                "Could not save the cronograma for {} locally",
                self.cronograma.client_nit()
            ));
        }
        if let Some(e) = &report.remote_error {
            warn_remote_failure(e);
        }
        Ok(())
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let board = Board::open(&args.client.nit, global)?;
    let today = Utc::now().date_naive();

    let statuses: Vec<ProjectStatus> = if args.all {
        vec![
            ProjectStatus::Pending,
            ProjectStatus::Urgent,
            ProjectStatus::Completed,
            ProjectStatus::Archived,
        ]
    } else {
        args.status.clone()
    };
    let projects: Vec<&Project> = board
        .cronograma
        .filtered(&statuses)
        .into_iter()
        .filter(|p| !args.overdue || p.is_overdue(today))
        .collect();

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&projects).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&projects).into_diagnostic()?);
        }
        format => {
            if projects.is_empty() && format == OutputFormat::Auto {
                println!(
                    "No projects on the cronograma for {}.",
                    style(board.cronograma.client_nit()).cyan()
                );
                return Ok(());
            }
            let rows = projects.iter().map(|p| {
                TableRow::new(p.id.to_string())
                    .cell("id", CellValue::Id(p.id.to_string()))
                    .cell("title", CellValue::Text(p.title.clone()))
                    .cell("status", CellValue::Status(p.status))
                    .cell(
                        "due",
                        CellValue::Due {
                            date: p.due_date,
                            overdue: p.is_overdue(today),
                        },
                    )
                    .cell(
                        "reason",
                        if p.reason.is_empty() {
                            CellValue::Empty
                        } else {
                            CellValue::Text(p.reason.clone())
                        },
                    )
            });
            TableFormatter::new(LIST_COLUMNS, "project").output(rows, format);
        }
    }
    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let mut board = Board::open(&args.client.nit, global)?;

    let mut project = Project::new(board.cronograma.client_nit(), args.title.trim(), args.due);
    project.description = args.description.trim().to_string();
    project.reason = args.reason.trim().to_string();
    project.image_url = args.image.filter(|s| !s.trim().is_empty());
    project.ensure_image(board.ctx.config.placeholder_base_url());
    check_project(&project)?;

    let id = board.cronograma.add(project).id.clone();
    board.save()?;
    tracing::info!(id = %id, nit = %board.cronograma.client_nit(), "project created");

    if global.quiet {
        println!("{}", id);
    } else {
        println!(
            "{} Added project {} to the cronograma of {}",
            style("✓").green(),
            style(&id).cyan(),
            style(board.cronograma.client_nit()).cyan()
        );
    }
    Ok(())
}

/// Reject a project the `project` schema would not accept back on import
fn check_project(project: &Project) -> Result<()> {
    let value = serde_json::to_value(project).into_diagnostic()?;
    if let Err(errors) = validator().validate_value("project", &value) {
        print_errors(&errors);
        return Err(miette::miette!("Project is not valid"));
    }
    Ok(())
}

fn run_show(args: TargetArgs, global: &GlobalOpts) -> Result<()> {
    let board = Board::open(&args.client.nit, global)?;
    let project = board
        .cronograma
        .find(&args.id)
        .map_err(|e| miette::miette!("{}", e))?;

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(project).into_diagnostic()?);
        }
        OutputFormat::Id => println!("{}", project.id),
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(project).into_diagnostic()?);
        }
        _ => print_project(project),
    }
    Ok(())
}

fn print_project(project: &Project) {
    let today = Utc::now().date_naive();
    println!("{}", style(&project.title).bold());
    println!("{}", style("─".repeat(50)).dim());
    println!("  {:<12} {}", style("ID").dim(), style(&project.id).cyan());
    println!("  {:<12} {}", style("Client").dim(), project.client_nit);
    println!(
        "  {:<12} {}",
        style("Status").dim(),
        CellValue::Status(project.status).format_tsv(0)
    );
    let due = project.due_date.format("%Y-%m-%d").to_string();
    if project.is_overdue(today) {
        println!("  {:<12} {} {}", style("Due").dim(), style(due).red(), style("(overdue)").red());
    } else {
        println!("  {:<12} {}", style("Due").dim(), due);
    }
    if !project.reason.is_empty() {
        println!("  {:<12} {}", style("Reason").dim(), project.reason);
    }
    if let Some(url) = &project.image_url {
        let shown = if project.has_inline_image() {
            "(embedded image)".to_string()
        } else {
            truncate_str(url, 60)
        };
        println!("  {:<12} {}", style("Image").dim(), shown);
    }
    println!(
        "  {:<12} {}",
        style("Created").dim(),
        project.created_at.format("%Y-%m-%d %H:%M")
    );
    if !project.description.is_empty() {
        println!();
        println!("{}", project.description);
    }
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let edit = ProjectEdit {
        title: args.title.map(|s| s.trim().to_string()),
        description: args.description,
        reason: args.reason,
        image_url: args.image,
        due_date: args.due,
    };
    if edit.is_empty() {
        return Err(miette::miette!(
            help = "Pass at least one of --title, --description, --reason, --image, --due",
            "Nothing to change"
        ));
    }

    let mut board = Board::open(&args.target.client.nit, global)?;
    let project = board
        .cronograma
        .edit(&args.target.id, edit)
        .map_err(|e| miette::miette!("{}", e))?;
    check_project(project)?;
    let id = project.id.clone();
    board.save()?;

    if !global.quiet {
        println!("{} Updated project {}", style("✓").green(), style(&id).cyan());
    }
    Ok(())
}

fn run_transition(args: TargetArgs, transition: Transition, global: &GlobalOpts) -> Result<()> {
    let mut board = Board::open(&args.client.nit, global)?;
    let project = board
        .cronograma
        .transition(&args.id, transition)
        .map_err(|e| miette::miette!("{}", e))?;
    let (id, status) = (project.id.clone(), project.status);
    board.save()?;
    tracing::info!(id = %id, status = status.as_str(), "project status changed");

    if !global.quiet {
        println!(
            "{} Project {} is now {}",
            style("✓").green(),
            style(&id).cyan(),
            CellValue::Status(status).format_tsv(0)
        );
    }
    Ok(())
}

fn run_delete(args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    let mut board = Board::open(&args.target.client.nit, global)?;
    // Resolve first so a bad id is reported before asking for the code
    board
        .cronograma
        .find(&args.target.id)
        .map_err(|e| miette::miette!("{}", e))?;

    let code = match args.code {
        Some(code) => code,
        None => dialoguer::Password::with_theme(&dialoguer::theme::ColorfulTheme::default())
            .with_prompt("Admin code")
            .interact()
            .into_diagnostic()?,
    };

    let admin_code = board.ctx.config.admin_code().to_string();
    let removed = board
        .cronograma
        .delete(&args.target.id, &code, &admin_code)
        .map_err(|e| miette::miette!("{}", e))?;

    if let Some(remote) = board.remote() {
        if let Err(e) = remote.delete_project(&removed.id) {
            tracing::warn!(id = %removed.id, error = %e, "remote delete failed");
            warn_remote_failure(&e);
        }
    }
    board.save()?;
    tracing::info!(id = %removed.id, "project deleted");

    if !global.quiet {
        println!(
            "{} Deleted project {} ({})",
            style("✓").green(),
            style(&removed.id).cyan(),
            removed.title
        );
    }
    Ok(())
}

fn run_export(args: ExportArgs, global: &GlobalOpts) -> Result<()> {
    let board = Board::open(&args.client.nit, global)?;
    let export = board.cronograma.export();

    let file_name = format!(
        "cronograma_{}_{}.json",
        export.client_nit,
        export.exported_at.format("%Y-%m-%d")
    );
    let path = board.ctx.export_path(args.output.as_deref(), &file_name)?;
    let json = serde_json::to_string_pretty(&export).into_diagnostic()?;
    std::fs::write(&path, json).into_diagnostic()?;

    if global.quiet {
        println!("{}", path.display());
    } else {
        println!(
            "{} Exported {} project(s) to {}",
            style("✓").green(),
            export.projects.len(),
            style(path.display()).cyan()
        );
    }
    Ok(())
}

fn run_import(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    let mut board = Board::open(&args.client.nit, global)?;

    let content = std::fs::read_to_string(&args.file).into_diagnostic()?;
    let document: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| miette::miette!("{} is not valid JSON: {}", args.file.display(), e))?;

    let placeholder = board.ctx.config.placeholder_base_url().to_string();
    let report = board
        .cronograma
        .import(&document, &validator(), &placeholder)
        .map_err(|e| miette::miette!("{}", e))?;

    if !report.imported.is_empty() {
        board.save()?;
    }

    if !global.quiet {
        println!(
            "{} Imported {} project(s), skipped {} already present",
            style("✓").green(),
            style(report.imported.len()).cyan(),
            report.skipped.len()
        );
        for (index, errors) in &report.rejected {
            println!(
                "{} Entry {} rejected:",
                style("✗").red(),
                style(index + 1).yellow()
            );
            print_errors(errors);
        }
    }

    if report.imported.is_empty() && !report.rejected.is_empty() {
        return Err(miette::miette!("No projects were imported"));
    }
    Ok(())
}
