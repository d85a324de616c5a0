//! `agency calendar` command - Month view of a client's cronograma

use chrono::{Datelike, Utc};
use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use crate::cli::helpers::{parse_nit, truncate_str, AppContext};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::remote::RemoteStore;
use crate::entities::calendar::MonthCalendar;
use crate::entities::project::{Cronograma, ProjectStatus};

#[derive(clap::Args, Debug)]
pub struct CalendarArgs {
    /// Client NIT
    #[arg(long, short = 'n', env = "AGENCY_NIT")]
    pub nit: String,

    /// Month to show (YYYY-MM, default: current month)
    #[arg(long, short = 'm')]
    pub month: Option<String>,
}

#[derive(Serialize)]
struct DayEntry<'a> {
    date: String,
    projects: Vec<ProjectEntry<'a>>,
}

#[derive(Serialize)]
struct ProjectEntry<'a> {
    id: String,
    title: &'a str,
    status: &'static str,
}

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const CELL_WIDTH: usize = 9;

pub fn run(args: CalendarArgs, global: &GlobalOpts) -> Result<()> {
    let nit = parse_nit(&args.nit)?;
    let (year, month) = match &args.month {
        Some(m) => MonthCalendar::parse_month(m)
            .ok_or_else(|| miette::miette!("'{}' is not a month (expected YYYY-MM)", m))?,
        None => {
            let today = Utc::now().date_naive();
            (today.year(), today.month())
        }
    };

    let ctx = AppContext::open(global)?;
    let remote = ctx.remote();
    let cronograma = Cronograma::load(
        &nit,
        &ctx.storage,
        remote.as_ref().map(|r| r as &dyn RemoteStore),
    );
    let calendar = MonthCalendar::build(year, month, cronograma.projects())
        .ok_or_else(|| miette::miette!("Invalid month {}-{:02}", year, month))?;

    match global.format {
        OutputFormat::Json | OutputFormat::Yaml => {
            let days: Vec<DayEntry> = calendar
                .days()
                .filter(|d| !d.projects.is_empty())
                .map(|d| DayEntry {
                    date: d.date.format("%Y-%m-%d").to_string(),
                    projects: d
                        .projects
                        .iter()
                        .map(|p| ProjectEntry {
                            id: p.id.to_string(),
                            title: &p.title,
                            status: p.status.as_str(),
                        })
                        .collect(),
                })
                .collect();
            if global.format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&days).into_diagnostic()?);
            } else {
                print!("{}", serde_yml::to_string(&days).into_diagnostic()?);
            }
        }
        _ => print_month(&calendar, &nit),
    }
    Ok(())
}

fn print_month(calendar: &MonthCalendar, nit: &str) {
    println!(
        "{} {}",
        style(calendar.title()).bold(),
        style(format!("· {}", nit)).dim()
    );
    println!();

    let header: Vec<String> = WEEKDAYS
        .iter()
        .map(|d| format!("{:<width$}", d, width = CELL_WIDTH))
        .collect();
    println!("{}", style(header.join("")).dim());

    for week in &calendar.weeks {
        let line: String = week
            .iter()
            .map(|cell| match cell {
                None => " ".repeat(CELL_WIDTH),
                Some(day) if day.projects.is_empty() => {
                    format!("{:<width$}", day.date.day(), width = CELL_WIDTH)
                }
                Some(day) => {
                    let marker = if day.projects.iter().any(|p| p.status == ProjectStatus::Urgent) {
                        style(format!("{}*{}", day.date.day(), day.projects.len())).red().bold()
                    } else {
                        style(format!("{}*{}", day.date.day(), day.projects.len())).cyan()
                    };
                    let pad = CELL_WIDTH.saturating_sub(format!("{}*{}", day.date.day(), day.projects.len()).len());
                    format!("{}{}", marker, " ".repeat(pad))
                }
            })
            .collect();
        println!("{}", line.trim_end());
    }

    println!();
    if calendar.project_count() == 0 {
        println!("No projects due this month.");
        return;
    }
    for day in calendar.days().filter(|d| !d.projects.is_empty()) {
        for project in &day.projects {
            println!(
                "  {}  {:<10} {}",
                style(day.date.format("%d %a")).bold(),
                project.status.as_str(),
                truncate_str(&project.title, 50)
            );
        }
    }
    println!();
    println!(
        "{} project(s) due in {}. Day*N marks N projects due that day.",
        style(calendar.project_count()).cyan(),
        calendar.title()
    );
}
