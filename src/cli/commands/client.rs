//! `agency client` command - Client lookup by NIT

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{parse_nit, truncate_str};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::catalog::Catalog;
use crate::core::storage::{keys, LocalStorage};
use crate::core::workspace::Workspace;
use crate::entities::project::{Project, ProjectStatus};

#[derive(Subcommand, Debug)]
pub enum ClientCommands {
    /// Look up a client by NIT
    Show(ShowArgs),

    /// List known clients
    List,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Client NIT (dots, dashes and check digit are ignored)
    pub nit: String,
}

const LIST_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("nit", "NIT", 14),
    ColumnDef::new("name", "NAME", 36),
    ColumnDef::new("contact", "CONTACT", 24),
];

pub fn run(cmd: ClientCommands, global: &GlobalOpts) -> Result<()> {
    let workspace = Workspace::locate(global.project.as_deref()).ok();
    let catalog = Catalog::load(workspace.as_ref()).map_err(|e| miette::miette!("{}", e))?;

    match cmd {
        ClientCommands::Show(args) => run_show(args, &catalog, workspace.as_ref(), global),
        ClientCommands::List => run_list(&catalog, global),
    }
}

fn run_show(
    args: ShowArgs,
    catalog: &Catalog,
    workspace: Option<&Workspace>,
    global: &GlobalOpts,
) -> Result<()> {
    let nit = parse_nit(&args.nit)?;
    let client = catalog
        .client(&nit)
        .ok_or_else(|| miette::miette!("No client registered with NIT {}", nit))?;

    match global.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(client).into_diagnostic()?),
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(client).into_diagnostic()?),
        OutputFormat::Id => println!("{}", client.nit),
        _ => {
            println!("{}", style(&client.name).bold());
            println!("  {:<10} {}", style("NIT").dim(), client.nit);
            if let Some(contact) = &client.contact {
                println!("  {:<10} {}", style("Contact").dim(), contact);
            }
            if let Some(email) = &client.email {
                println!("  {:<10} {}", style("Email").dim(), email);
            }

            // Local board summary only; no remote round-trip for a lookup
            if let Some(ws) = workspace {
                let storage = LocalStorage::open(ws);
                let projects: Vec<Project> = storage.load_or_default(&keys::cronograma_projects(&nit));
                let open = projects.iter().filter(|p| p.status.is_open()).count();
                let archived = projects
                    .iter()
                    .filter(|p| p.status == ProjectStatus::Archived)
                    .count();
                println!(
                    "  {:<10} {} open, {} archived",
                    style("Projects").dim(),
                    open,
                    archived
                );
            }
            for gallery in catalog.galleries.iter().filter(|g| g.client_nit == client.nit) {
                println!(
                    "  {:<10} {} ({})",
                    style("Gallery").dim(),
                    truncate_str(&gallery.title, 40),
                    style(&gallery.id).cyan()
                );
            }
        }
    }
    Ok(())
}

fn run_list(catalog: &Catalog, global: &GlobalOpts) -> Result<()> {
    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&catalog.clients).into_diagnostic()?)
        }
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(&catalog.clients).into_diagnostic()?),
        format => {
            let rows = catalog.clients.iter().map(|c| {
                TableRow::new(c.nit.clone())
                    .cell("nit", CellValue::Id(c.nit.clone()))
                    .cell("name", CellValue::Text(c.name.clone()))
                    .cell(
                        "contact",
                        c.contact
                            .clone()
                            .map(CellValue::Text)
                            .unwrap_or(CellValue::Empty),
                    )
            });
            TableFormatter::new(LIST_COLUMNS, "client").output(rows, format);
        }
    }
    Ok(())
}
