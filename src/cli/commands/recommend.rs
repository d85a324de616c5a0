//! `agency recommend` command - Service recommendations for a client's needs

use console::style;
use miette::{IntoDiagnostic, Result};
use std::io::Read;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::catalog::Catalog;
use crate::core::config::Config;
use crate::core::workspace::Workspace;
use crate::recommend;

#[derive(clap::Args, Debug)]
pub struct RecommendArgs {
    /// What the business needs, in plain words ("-" reads stdin)
    pub needs: Vec<String>,
}

pub fn run(args: RecommendArgs, global: &GlobalOpts) -> Result<()> {
    let needs = if args.needs.len() == 1 && args.needs[0] == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).into_diagnostic()?;
        buf
    } else {
        args.needs.join(" ")
    };

    // Works outside a workspace with the embedded catalog
    let workspace = Workspace::locate(global.project.as_deref()).ok();
    let config = Config::load_for(workspace.as_ref());
    let catalog = Catalog::load(workspace.as_ref()).map_err(|e| miette::miette!("{}", e))?;

    let backend = recommend::from_config(&config);
    tracing::debug!(backend = backend.name(), "requesting recommendation");

    let recommendation = match backend.recommend(&needs, &catalog) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(backend = backend.name(), "recommendation failed");
            tracing::debug!(error = %e, "recommendation failure detail");
            return Err(miette::miette!("{}", e.user_message()));
        }
    };

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&recommendation).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&recommendation).into_diagnostic()?);
        }
        OutputFormat::Id => {
            for slug in &recommendation.recommended_services {
                println!("{}", slug);
            }
        }
        _ => {
            println!("{}", style(&recommendation.title).bold());
            if !recommendation.summary.is_empty() {
                println!();
                println!("{}", recommendation.summary);
            }
            if !recommendation.recommended_services.is_empty() {
                println!();
                println!("{}", style("Recommended services:").dim());
                for (i, slug) in recommendation.recommended_services.iter().enumerate() {
                    match catalog.service(slug) {
                        Some(service) => println!(
                            "  {}. {} {}",
                            i + 1,
                            style(&service.name).cyan(),
                            style(format!("- {}", service.summary)).dim()
                        ),
                        None => println!("  {}. {}", i + 1, style(slug).cyan()),
                    }
                }
            }
        }
    }
    Ok(())
}
