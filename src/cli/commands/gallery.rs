//! `agency gallery` command - Client photo galleries behind access codes

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{parse_nit, AppContext};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::catalog::Gallery;
use crate::core::storage::{keys, LocalStorage};

#[derive(Subcommand, Debug)]
pub enum GalleryCommands {
    /// List galleries and whether they are unlocked
    List(ListArgs),

    /// Unlock a gallery with its access code
    Unlock(UnlockArgs),

    /// Show the items of an unlocked gallery
    Show(GalleryArg),

    /// Forget a gallery's access
    Lock(GalleryArg),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only galleries of this client
    #[arg(long, short = 'n')]
    pub nit: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct UnlockArgs {
    /// Gallery ID
    pub id: String,

    /// Access code (prompted when omitted)
    #[arg(long)]
    pub code: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct GalleryArg {
    /// Gallery ID
    pub id: String,
}

const LIST_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("id", "ID", 24),
    ColumnDef::new("title", "TITLE", 36),
    ColumnDef::new("client", "CLIENT", 14),
    ColumnDef::new("items", "ITEMS", 7),
    ColumnDef::new("access", "ACCESS", 10),
];

pub fn run(cmd: GalleryCommands, global: &GlobalOpts) -> Result<()> {
    let ctx = AppContext::open(global)?;
    match cmd {
        GalleryCommands::List(args) => run_list(args, &ctx, global),
        GalleryCommands::Unlock(args) => run_unlock(args, &ctx, global),
        GalleryCommands::Show(args) => run_show(args, &ctx, global),
        GalleryCommands::Lock(args) => run_lock(args, &ctx, global),
    }
}

fn is_unlocked(storage: &LocalStorage, gallery: &Gallery) -> bool {
    storage.load_or_default::<bool>(&keys::gallery_access(&gallery.id))
}

fn find<'a>(catalog: &'a crate::core::Catalog, id: &str) -> Result<&'a Gallery> {
    catalog
        .gallery(id)
        .ok_or_else(|| miette::miette!("No gallery named '{}'", id))
}

fn run_list(args: ListArgs, ctx: &AppContext, global: &GlobalOpts) -> Result<()> {
    let catalog = ctx.catalog()?;
    let nit = args.nit.as_deref().map(parse_nit).transpose()?;
    let galleries: Vec<&Gallery> = catalog
        .galleries
        .iter()
        .filter(|g| nit.as_ref().map_or(true, |n| &g.client_nit == n))
        .collect();

    match global.format {
        OutputFormat::Json | OutputFormat::Yaml => {
            // Access codes stay out of machine output
            let listing: Vec<serde_json::Value> = galleries
                .iter()
                .map(|g| {
                    serde_json::json!({
                        "id": g.id,
                        "title": g.title,
                        "client_nit": g.client_nit,
                        "items": g.items.len(),
                        "unlocked": is_unlocked(&ctx.storage, g),
                    })
                })
                .collect();
            if global.format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&listing).into_diagnostic()?);
            } else {
                print!("{}", serde_yml::to_string(&listing).into_diagnostic()?);
            }
        }
        format => {
            let rows = galleries.iter().map(|g| {
                let access = if is_unlocked(&ctx.storage, g) { "unlocked" } else { "locked" };
                TableRow::new(g.id.clone())
                    .cell("id", CellValue::Id(g.id.clone()))
                    .cell("title", CellValue::Text(g.title.clone()))
                    .cell("client", CellValue::Text(g.client_nit.clone()))
                    .cell("items", CellValue::Number(g.items.len() as i64))
                    .cell("access", CellValue::Text(access.to_string()))
            });
            TableFormatter::new(LIST_COLUMNS, "gallery").output(rows, format);
        }
    }
    Ok(())
}

fn run_unlock(args: UnlockArgs, ctx: &AppContext, global: &GlobalOpts) -> Result<()> {
    let catalog = ctx.catalog()?;
    let gallery = find(&catalog, &args.id)?;

    let code = match args.code {
        Some(code) => code,
        None => dialoguer::Password::with_theme(&dialoguer::theme::ColorfulTheme::default())
            .with_prompt(format!("Access code for {}", gallery.title))
            .interact()
            .into_diagnostic()?,
    };

    if !gallery.accepts(&code) {
        tracing::info!(gallery = %gallery.id, "wrong gallery access code");
        return Err(miette::miette!("Invalid access code for gallery '{}'", gallery.id));
    }

    ctx.storage
        .set(&keys::gallery_access(&gallery.id), &true)
        .into_diagnostic()?;

    if !global.quiet {
        println!(
            "{} Gallery {} unlocked ({} item(s))",
            style("✓").green(),
            style(&gallery.id).cyan(),
            gallery.items.len()
        );
    }
    Ok(())
}

fn run_show(args: GalleryArg, ctx: &AppContext, global: &GlobalOpts) -> Result<()> {
    let catalog = ctx.catalog()?;
    let gallery = find(&catalog, &args.id)?;

    if !is_unlocked(&ctx.storage, gallery) {
        return Err(miette::miette!(
            help = format!("Unlock it with 'agency gallery unlock {}'", gallery.id),
            "Gallery '{}' is locked",
            gallery.id
        ));
    }

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&gallery.items).into_diagnostic()?)
        }
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(&gallery.items).into_diagnostic()?),
        OutputFormat::Id => {
            for item in &gallery.items {
                println!("{}", item.url);
            }
        }
        _ => {
            println!("{}", style(&gallery.title).bold());
            for item in &gallery.items {
                println!("  {} {}", style("•").dim(), item.title);
                println!("    {}", style(&item.url).cyan());
            }
        }
    }
    Ok(())
}

fn run_lock(args: GalleryArg, ctx: &AppContext, global: &GlobalOpts) -> Result<()> {
    let catalog = ctx.catalog()?;
    let gallery = find(&catalog, &args.id)?;
    let removed = ctx
        .storage
        .remove(&keys::gallery_access(&gallery.id))
        .into_diagnostic()?;

    if !global.quiet {
        if removed {
            println!("{} Gallery {} locked", style("✓").green(), style(&gallery.id).cyan());
        } else {
            println!("{} Gallery {} was not unlocked", style("!").yellow(), style(&gallery.id).cyan());
        }
    }
    Ok(())
}
