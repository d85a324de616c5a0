//! `agency completions` command - Shell completion scripts
//!
//! ```bash
//! source <(agency completions bash)
//! agency completions fish -o ~/.config/fish/completions/agency.fish
//! ```

use clap::CommandFactory;
use clap_complete::Shell;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::Cli;

#[derive(clap::Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Write the script to a file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

pub fn run(args: CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();

    match args.output {
        Some(path) => {
            let mut script = Vec::new();
            clap_complete::generate(args.shell, &mut cmd, &name, &mut script);
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).into_diagnostic()?;
            }
            std::fs::write(&path, script).into_diagnostic()?;
            eprintln!(
                "{} Wrote {} completions to {}",
                style("✓").green(),
                args.shell,
                style(path.display()).cyan()
            );
        }
        None => clap_complete::generate(args.shell, &mut cmd, &name, &mut std::io::stdout()),
    }
    Ok(())
}
