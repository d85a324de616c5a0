//! `agency quote` command - Quotations with IVA and print export

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::helpers::{parse_nit, validator, AppContext};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::storage::keys;
use crate::entities::quote::{format_cop, Quote, QuoteItem};
use crate::schema::TemplateGenerator;

#[derive(Subcommand, Debug)]
pub enum QuoteCommands {
    /// Prepare a quote for printing
    New(NewArgs),

    /// Show the prepared quote with its totals
    Show,

    /// Render the prepared quote as printable HTML
    Print(PrintArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Client name
    #[arg(long, short = 'c', required_unless_present = "file")]
    pub client: Option<String>,

    /// Client NIT
    #[arg(long, short = 'n')]
    pub nit: Option<String>,

    /// Line item as DESCRIPTION:QTY:PRICE[:SECTION] (repeatable)
    #[arg(long = "item", short = 'i', required_unless_present = "file")]
    pub items: Vec<QuoteItem>,

    /// IVA percentage (default: iva_percentage from config, else 19)
    #[arg(long)]
    pub iva: Option<f64>,

    #[arg(long)]
    pub notes: Option<String>,

    /// Quote file (YAML or JSON) instead of flags
    #[arg(long, short = 'F', conflicts_with_all = ["client", "items"])]
    pub file: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct PrintArgs {
    /// Output file (default: exports/quote_<id>.html)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Items per printed page (default: items_per_page from config, else 12)
    #[arg(long)]
    pub per_page: Option<usize>,
}

const ITEM_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("section", "SECTION", 16),
    ColumnDef::new("description", "DESCRIPTION", 40),
    ColumnDef::new("quantity", "QTY", 8),
    ColumnDef::new("price", "PRICE", 16),
    ColumnDef::new("total", "TOTAL", 18),
];

pub fn run(cmd: QuoteCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        QuoteCommands::New(args) => run_new(args, global),
        QuoteCommands::Show => run_show(global),
        QuoteCommands::Print(args) => run_print(args, global),
    }
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = AppContext::open(global)?;
    let default_iva = args.iva.unwrap_or_else(|| ctx.config.iva_percentage());

    let mut quote = match &args.file {
        Some(path) => {
            let content = std::fs::read_to_string(path).into_diagnostic()?;
            let value = validator().validate_document(&content, &path.display().to_string(), "quote")?;
            Quote::from_document(value, default_iva).map_err(|e| miette::miette!("{}", e))?
        }
        None => {
            let client = args.client.clone().unwrap_or_default();
            if client.trim().is_empty() {
                return Err(miette::miette!("A client name is required"));
            }
            let mut quote = Quote::new(client.trim(), default_iva, args.items.clone())
                .map_err(|e| miette::miette!("{}", e))?;
            quote.notes = args.notes.clone().filter(|n| !n.trim().is_empty());
            quote
        }
    };

    if let Some(iva) = args.iva {
        if !(0.0..=100.0).contains(&iva) {
            return Err(miette::miette!("IVA must be between 0 and 100"));
        }
        quote.iva_percentage = iva;
    }
    if let Some(nit) = &args.nit {
        quote.client_nit = Some(parse_nit(nit)?);
    }

    ctx.storage
        .set(keys::QUOTE_PRINT_DATA, &quote)
        .into_diagnostic()?;
    tracing::info!(id = %quote.id, items = quote.items.len(), "quote prepared");

    if global.quiet {
        println!("{}", quote.id);
        return Ok(());
    }
    print_quote(&quote, global.format);
    println!();
    println!(
        "{} Quote {} ready. Print it with {}",
        style("✓").green(),
        style(&quote.id).cyan(),
        style("agency quote print").yellow()
    );
    Ok(())
}

fn load_prepared(ctx: &AppContext) -> Result<Quote> {
    ctx.storage
        .get::<Quote>(keys::QUOTE_PRINT_DATA)
        .map_err(|e| miette::miette!("{}", e))?
        .ok_or_else(|| {
            miette::miette!(
                help = "Prepare one with 'agency quote new'",
                "No quote has been prepared"
            )
        })
}

fn run_show(global: &GlobalOpts) -> Result<()> {
    let ctx = AppContext::open(global)?;
    let quote = load_prepared(&ctx)?;

    match global.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&quote).into_diagnostic()?),
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(&quote).into_diagnostic()?),
        OutputFormat::Id => println!("{}", quote.id),
        format => print_quote(&quote, format),
    }
    Ok(())
}

fn print_quote(quote: &Quote, format: OutputFormat) {
    if matches!(format, OutputFormat::Auto | OutputFormat::Tsv) {
        println!("{} {}", style("Quote").bold(), style(&quote.id).cyan());
        println!("  {:<10} {}", style("Client").dim(), quote.client);
        if let Some(nit) = &quote.client_nit {
            println!("  {:<10} {}", style("NIT").dim(), nit);
        }
        println!("  {:<10} {}", style("Date").dim(), quote.date.format("%Y-%m-%d"));
        println!();
    }

    let rows = quote.sections().into_iter().flat_map(|section| {
        let name = section.name;
        section.items.into_iter().map(move |item| {
            TableRow::new(item.description.clone())
                .cell("section", CellValue::Text(name.to_string()))
                .cell("description", CellValue::Text(item.description.clone()))
                .cell("quantity", CellValue::Text(format_number(item.quantity)))
                .cell("price", CellValue::Money(item.price))
                .cell("total", CellValue::Money(item.line_total()))
        })
    });
    TableFormatter::new(ITEM_COLUMNS, "item")
        .without_summary()
        .output(rows, format);

    if matches!(format, OutputFormat::Auto | OutputFormat::Tsv) {
        println!();
        println!("  {:<18} {:>16}", "Subtotal", format_cop(quote.subtotal()));
        println!(
            "  {:<18} {:>16}",
            format!("IVA ({}%)", format_number(quote.iva_percentage)),
            format_cop(quote.iva())
        );
        println!(
            "  {:<18} {:>16}",
            style("Total").bold(),
            style(format_cop(quote.total())).bold()
        );
        if let Some(notes) = &quote.notes {
            println!();
            println!("  {}", style(notes).dim());
        }
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

fn run_print(args: PrintArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = AppContext::open(global)?;
    let quote = load_prepared(&ctx)?;
    let per_page = args
        .per_page
        .filter(|n| *n > 0)
        .unwrap_or_else(|| ctx.config.items_per_page());

    let generator = TemplateGenerator::new().map_err(|e| miette::miette!("{}", e))?;
    let html = generator
        .render_quote_print(&quote, per_page)
        .map_err(|e| miette::miette!("{}", e))?;

    let path = ctx.export_path(args.output.as_deref(), &format!("quote_{}.html", quote.id))?;
    std::fs::write(&path, html).into_diagnostic()?;

    if global.quiet {
        println!("{}", path.display());
    } else {
        println!(
            "{} Wrote printable quote {} to {}",
            style("✓").green(),
            style(&quote.id).cyan(),
            style(path.display()).cyan()
        );
        println!("   Open it in a browser and print to paper or PDF.");
    }
    Ok(())
}
