//! `agency init` command - Initialize a new agency workspace

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::Path;

use crate::core::remote::SqliteStore;
use crate::core::workspace::{Workspace, WorkspaceError};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: std::path::PathBuf,

    /// Force initialization even if .agency/ already exists
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs) -> Result<()> {
    let path = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    if !path.exists() {
        std::fs::create_dir_all(&path).into_diagnostic()?;
        println!(
            "{} Created directory {}",
            style("✓").green(),
            style(path.display()).cyan()
        );
    }

    let workspace = if args.force {
        Workspace::init_force(&path)
    } else {
        Workspace::init(&path)
    };

    match workspace {
        Ok(workspace) => {
            // Create the shared store up front so the first command finds its tables
            if let Err(e) = SqliteStore::open_for(&workspace) {
                tracing::warn!(error = %e, "remote store not created");
            }

            println!(
                "{} Initialized agency workspace at {}",
                style("✓").green(),
                style(workspace.root().display()).cyan()
            );
            println!();
            println!("Created workspace structure:");
            print_structure(workspace.root());
            println!();
            println!("Next steps:");
            println!(
                "  {} Fill in the diagnostic survey",
                style("agency survey fill diagnostic").yellow()
            );
            println!(
                "  {} Submit a creative brief",
                style("agency brief new").yellow()
            );
            println!(
                "  {} Review a client's cronograma",
                style("agency project list --nit <NIT>").yellow()
            );
            Ok(())
        }
        Err(WorkspaceError::AlreadyExists(path)) => {
            println!(
                "{} Agency workspace already exists at {}",
                style("!").yellow(),
                style(path.display()).cyan()
            );
            println!();
            println!(
                "Use {} to reinitialize",
                style("agency init --force").yellow()
            );
            Ok(())
        }
        Err(e) => Err(miette::miette!("{}", e)),
    }
}

fn print_structure(root: &Path) {
    let entries = [
        ".agency/",
        ".agency/config.yaml",
        ".agency/storage/",
        ".agency/catalog/",
        ".agency/remote.db",
        "exports/",
    ];

    for entry in entries {
        let marker = if root.join(entry).exists() {
            style("•").dim()
        } else {
            style("·").dim()
        };
        println!("  {} {}", marker, entry);
    }
}
