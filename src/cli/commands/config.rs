//! `agency config` command - Configuration management
//!
//! Provides commands to view and modify agency configuration.

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::path::PathBuf;

use crate::cli::GlobalOpts;
use crate::core::workspace::Workspace;
use crate::core::Config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration values
    Show(ShowArgs),

    /// Set a configuration value
    Set(SetArgs),

    /// Unset (remove) a configuration value
    Unset(UnsetArgs),

    /// Show paths to configuration files
    Path,

    /// List all available configuration keys
    Keys,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Show only this key's value
    pub key: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Configuration key (e.g., iva_percentage, admin_code)
    pub key: String,

    /// Value to set
    pub value: String,

    /// Set in global (user) config instead of workspace config
    #[arg(long, short = 'g')]
    pub global: bool,
}

#[derive(clap::Args, Debug)]
pub struct UnsetArgs {
    /// Configuration key to remove
    pub key: String,

    /// Remove from global (user) config instead of workspace config
    #[arg(long, short = 'g')]
    pub global: bool,
}

/// Valid configuration keys
const VALID_KEYS: &[(&str, &str)] = &[
    ("author", "Default author recorded on quotes and briefs"),
    ("default_format", "Default output format (yaml, json, tsv, etc.)"),
    ("admin_code", "Code required to permanently delete projects"),
    ("demo_code", "Survey name value that loads the sample record"),
    ("iva_percentage", "IVA applied to quote subtotals, 0-100"),
    ("recommender_command", "Shell command answering recommendation prompts"),
    ("placeholder_base_url", "Base URL of generated placeholder images"),
    ("export_delimiter", "Delimiter for survey text exports"),
    ("items_per_page", "Quote items per printed page"),
];

/// Run a config subcommand
pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Show(args) => run_show(args, global),
        ConfigCommands::Set(args) => run_set(args, global),
        ConfigCommands::Unset(args) => run_unset(args, global),
        ConfigCommands::Path => run_path(global),
        ConfigCommands::Keys => run_keys(),
    }
}

fn load_config(global: &GlobalOpts) -> Config {
    let workspace = Workspace::locate(global.project.as_deref()).ok();
    Config::load_for(workspace.as_ref())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global);

    if let Some(key) = &args.key {
        check_key(key)?;
        return match config.get(key) {
            Some(v) => {
                println!("{}", v);
                Ok(())
            }
            None => Err(miette::miette!("Key '{}' is not set", key)),
        };
    }

    println!("{}", style("Effective Configuration").bold().underlined());
    println!();
    for (key, _) in VALID_KEYS {
        print_config_value(key, config.get(key).as_deref());
    }

    println!();
    println!("{}", style("Config Sources (in priority order):").dim());
    println!("  1. Environment variables (AGENCY_AUTHOR, AGENCY_ADMIN_CODE, AGENCY_RECOMMENDER)");
    println!("  2. Workspace config (.agency/config.yaml)");
    println!("  3. Global config (~/.config/agency/config.yaml)");

    Ok(())
}

fn run_set(args: SetArgs, global: &GlobalOpts) -> Result<()> {
    check_key(&args.key)?;
    let value = typed_value(&args.key, &args.value)?;

    let config_path = if args.global {
        get_global_config_path()?
    } else {
        get_workspace_config_path(global)?
    };

    let mut config_map = read_mapping(&config_path)?;
    config_map.insert(serde_yml::Value::String(args.key.clone()), value);

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).into_diagnostic()?;
    }
    let yaml = serde_yml::to_string(&config_map).into_diagnostic()?;
    fs::write(&config_path, yaml).into_diagnostic()?;

    let scope = if args.global { "global" } else { "workspace" };
    println!(
        "{} Set {} {} {} in {} config",
        style("✓").green(),
        style(&args.key).cyan(),
        style("→").dim(),
        style(&args.value).yellow(),
        scope
    );

    Ok(())
}

fn run_unset(args: UnsetArgs, global: &GlobalOpts) -> Result<()> {
    let config_path = if args.global {
        get_global_config_path()?
    } else {
        get_workspace_config_path(global)?
    };

    if !config_path.exists() {
        return Err(miette::miette!(
            "Config file does not exist: {}",
            config_path.display()
        ));
    }

    let mut config_map = read_mapping(&config_path)?;
    if config_map
        .remove(serde_yml::Value::String(args.key.clone()))
        .is_none()
    {
        return Err(miette::miette!("Key '{}' not found in config", args.key));
    }

    let yaml = serde_yml::to_string(&config_map).into_diagnostic()?;
    fs::write(&config_path, yaml).into_diagnostic()?;

    let scope = if args.global { "global" } else { "workspace" };
    println!(
        "{} Removed {} from {} config",
        style("✓").green(),
        style(&args.key).cyan(),
        scope
    );

    Ok(())
}

fn run_path(global: &GlobalOpts) -> Result<()> {
    let global_path = get_global_config_path()?;

    println!("{}", style("Configuration file paths:").bold());
    println!();
    println!("  {} {}", style("Global:").cyan(), global_path.display());
    print_exists(global_path.exists());

    println!();
    match get_workspace_config_path(global) {
        Ok(path) => {
            println!("  {} {}", style("Workspace:").cyan(), path.display());
            print_exists(path.exists());
        }
        Err(_) => println!(
            "  {} {}",
            style("Workspace:").cyan(),
            style("(not in an agency workspace)").dim()
        ),
    }

    Ok(())
}

fn run_keys() -> Result<()> {
    println!("{}", style("Available configuration keys:").bold());
    println!();

    for (key, description) in VALID_KEYS {
        println!("  {:<22} {}", style(key).cyan(), style(description).dim());
    }

    println!();
    println!(
        "{}",
        style("Use 'agency config set <key> <value>' to set a value.").dim()
    );

    Ok(())
}

// Helper functions

fn get_global_config_path() -> Result<PathBuf> {
    Config::global_config_path()
        .ok_or_else(|| miette::miette!("Could not determine global config directory"))
}

fn get_workspace_config_path(global: &GlobalOpts) -> Result<PathBuf> {
    let workspace =
        Workspace::locate(global.project.as_deref()).map_err(|e| miette::miette!("{}", e))?;
    Ok(workspace.agency_dir().join("config.yaml"))
}

fn check_key(key: &str) -> Result<()> {
    if VALID_KEYS.iter().any(|(k, _)| *k == key) {
        Ok(())
    } else {
        Err(miette::miette!(
            help = "Run 'agency config keys' to list valid keys",
            "Unknown configuration key '{}'",
            key
        ))
    }
}

/// Numbers are stored as YAML numbers so the config deserializes
fn typed_value(key: &str, raw: &str) -> Result<serde_yml::Value> {
    match key {
        "iva_percentage" => {
            let pct: f64 = raw
                .trim()
                .parse()
                .map_err(|_| miette::miette!("iva_percentage must be a number, got '{}'", raw))?;
            if !(0.0..=100.0).contains(&pct) {
                return Err(miette::miette!("iva_percentage must be between 0 and 100"));
            }
            Ok(serde_yml::Value::from(pct))
        }
        "items_per_page" => {
            let n: u64 = raw
                .trim()
                .parse()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| miette::miette!("items_per_page must be a positive whole number"))?;
            Ok(serde_yml::Value::from(n))
        }
        "default_format" => {
            const FORMATS: &[&str] = &["auto", "yaml", "tsv", "json", "csv", "md", "id"];
            if !FORMATS.contains(&raw) {
                return Err(miette::miette!(
                    "default_format must be one of: {}",
                    FORMATS.join(", ")
                ));
            }
            Ok(serde_yml::Value::String(raw.to_string()))
        }
        _ => Ok(serde_yml::Value::String(raw.to_string())),
    }
}

fn read_mapping(path: &PathBuf) -> Result<serde_yml::Mapping> {
    if !path.exists() {
        return Ok(serde_yml::Mapping::new());
    }
    let content = fs::read_to_string(path).into_diagnostic()?;
    match serde_yml::from_str::<serde_yml::Value>(&content) {
        Ok(serde_yml::Value::Mapping(map)) => Ok(map),
        Ok(_) => Ok(serde_yml::Mapping::new()),
        Err(e) => Err(miette::miette!(
            "Config file {} is not valid YAML: {}",
            path.display(),
            e
        )),
    }
}

fn print_config_value(key: &str, value: Option<&str>) {
    if let Some(v) = value {
        println!("  {}: {}", style(key).cyan(), style(v).yellow());
    } else {
        println!("  {}: {}", style(key).cyan(), style("(not set)").dim());
    }
}

fn print_exists(exists: bool) {
    if exists {
        println!("         {}", style("(exists)").green());
    } else {
        println!("         {}", style("(not created)").dim());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_values() {
        assert_eq!(typed_value("iva_percentage", "5").unwrap(), serde_yml::Value::from(5.0));
        assert!(typed_value("iva_percentage", "120").is_err());
        assert!(typed_value("iva_percentage", "abc").is_err());
        assert_eq!(typed_value("items_per_page", "10").unwrap(), serde_yml::Value::from(10u64));
        assert!(typed_value("items_per_page", "0").is_err());
        assert!(typed_value("default_format", "xml").is_err());
        assert_eq!(
            typed_value("admin_code", "9999").unwrap(),
            serde_yml::Value::String("9999".to_string())
        );
    }

    #[test]
    fn test_check_key() {
        assert!(check_key("iva_percentage").is_ok());
        assert!(check_key("editor").is_err());
    }
}
