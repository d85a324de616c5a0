use agency::cli::{commands, Cli, Commands, OutputFormat};
use agency::core::{Config, Workspace};
use clap::{Parser, ValueEnum};
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    // Install miette's fancy error handler for diagnostics
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let mut global = cli.global;

    // AGENCY_LOG takes EnvFilter directives; stdout stays clean for piping
    let default_filter = if global.verbose { "agency=debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("AGENCY_LOG")
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();

    if global.format == OutputFormat::Auto {
        let workspace = Workspace::locate(global.project.as_deref()).ok();
        if let Some(format) = Config::load_for(workspace.as_ref())
            .default_format
            .and_then(|f| OutputFormat::from_str(&f, true).ok())
        {
            global.format = format;
        }
    }

    match cli.command {
        Commands::Init(args) => commands::init::run(args),
        Commands::Survey(cmd) => commands::survey::run(cmd, &global),
        Commands::Project(cmd) => commands::project::run(cmd, &global),
        Commands::Calendar(args) => commands::calendar::run(args, &global),
        Commands::Brief(cmd) => commands::brief::run(cmd, &global),
        Commands::Quote(cmd) => commands::quote::run(cmd, &global),
        Commands::Recommend(args) => commands::recommend::run(args, &global),
        Commands::Client(cmd) => commands::client::run(cmd, &global),
        Commands::Gallery(cmd) => commands::gallery::run(cmd, &global),
        Commands::Config(cmd) => commands::config::run(cmd, &global),
        Commands::Completions(args) => commands::completions::run(args),
    }
}
