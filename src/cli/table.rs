//! Table formatting utilities for CLI list commands
//!
//! List commands describe their columns once with [`ColumnDef`] and push
//! [`TableRow`]s; [`TableFormatter`] renders them as aligned text, CSV,
//! markdown or bare ids.

use chrono::{DateTime, NaiveDate, Utc};
use console::style;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::truncate_str;
use crate::cli::OutputFormat;
use crate::entities::project::ProjectStatus;
use crate::entities::quote::format_cop;

/// A typed cell value with semantic meaning for formatting
#[derive(Debug, Clone)]
pub enum CellValue {
    /// Entity ID (cyan)
    Id(String),
    /// Plain text, truncated to the column width
    Text(String),
    /// Project status with color coding
    Status(ProjectStatus),
    /// Due date, red when overdue
    Due { date: NaiveDate, overdue: bool },
    /// Timestamp displayed as date and time
    DateTime(DateTime<Utc>),
    /// Amount in pesos
    Money(f64),
    Number(i64),
    /// Labels as comma-separated
    Tags(Vec<String>),
    Empty,
}

impl CellValue {
    /// Format for aligned terminal output (colors only on a terminal)
    pub fn format_tsv(&self, width: usize) -> String {
        match self {
            CellValue::Id(id) => format!("{:<width$}", style(id).cyan(), width = width),
            CellValue::Text(s) => {
                let truncated = truncate_str(s, width.saturating_sub(2));
                format!("{:<width$}", truncated, width = width)
            }
            CellValue::Status(status) => {
                let s = status.as_str();
                let styled = match status {
                    ProjectStatus::Pending => style(s).white(),
                    ProjectStatus::Urgent => style(s).red().bold(),
                    ProjectStatus::Completed => style(s).green(),
                    ProjectStatus::Archived => style(s).dim(),
                };
                format!("{:<width$}", styled, width = width)
            }
            CellValue::Due { overdue: true, .. } => {
                format!("{:<width$}", style(self.raw()).red(), width = width)
            }
            CellValue::Empty => format!("{:<width$}", style("-").dim(), width = width),
            _ => format!("{:<width$}", self.raw(), width = width),
        }
    }

    /// Format for markdown output
    pub fn format_md(&self) -> String {
        self.raw().replace('|', "\\|")
    }

    /// Plain text value (no colors, no truncation)
    pub fn raw(&self) -> String {
        match self {
            CellValue::Id(s) | CellValue::Text(s) => s.clone(),
            CellValue::Status(status) => status.as_str().to_string(),
            CellValue::Due { date, overdue } => {
                let d = date.format("%Y-%m-%d").to_string();
                if *overdue {
                    format!("{} (overdue)", d)
                } else {
                    d
                }
            }
            CellValue::DateTime(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
            CellValue::Money(amount) => format_cop(*amount),
            CellValue::Number(n) => n.to_string(),
            CellValue::Tags(tags) => tags.join(", "),
            CellValue::Empty => String::new(),
        }
    }

    /// Display width in characters
    pub fn display_width(&self) -> usize {
        match self {
            CellValue::Empty => 1,
            other => other.raw().chars().count(),
        }
    }
}

/// Column definition for table output
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub key: &'static str,
    pub header: &'static str,
    /// Maximum width in aligned output
    pub width: usize,
}

impl ColumnDef {
    pub const fn new(key: &'static str, header: &'static str, width: usize) -> Self {
        Self { key, header, width }
    }
}

/// One row: the full id plus cells keyed by column
#[derive(Debug, Clone)]
pub struct TableRow {
    pub full_id: String,
    cells: Vec<(&'static str, CellValue)>,
}

impl TableRow {
    pub fn new(full_id: impl Into<String>) -> Self {
        Self {
            full_id: full_id.into(),
            cells: Vec::new(),
        }
    }

    /// Builder-style cell setter
    pub fn cell(mut self, key: &'static str, value: CellValue) -> Self {
        self.cells.push((key, value));
        self
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.cells.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }
}

pub struct TableFormatter<'a> {
    columns: &'a [ColumnDef],
    entity_name: &'static str,
    show_summary: bool,
}

impl<'a> TableFormatter<'a> {
    pub fn new(columns: &'a [ColumnDef], entity_name: &'static str) -> Self {
        Self {
            columns,
            entity_name,
            show_summary: true,
        }
    }

    /// Omit the "N item(s) found" line
    pub fn without_summary(mut self) -> Self {
        self.show_summary = false;
        self
    }

    /// Output rows in the specified format
    pub fn output<I>(&self, rows: I, format: OutputFormat)
    where
        I: IntoIterator<Item = TableRow>,
    {
        let rows: Vec<TableRow> = rows.into_iter().collect();
        match format {
            OutputFormat::Csv => self.output_csv(&rows),
            OutputFormat::Md => println!("{}", self.render_md(&rows)),
            OutputFormat::Id => {
                for row in &rows {
                    println!("{}", row.full_id);
                }
            }
            _ => self.output_tsv(&rows),
        }
    }

    /// Dynamic widths: header or content, capped at the column width
    fn calculate_widths(&self, rows: &[TableRow]) -> Vec<usize> {
        self.columns
            .iter()
            .map(|col| {
                let max_content = rows
                    .iter()
                    .filter_map(|r| r.get(col.key))
                    .map(CellValue::display_width)
                    .max()
                    .unwrap_or(0);
                col.header
                    .len()
                    .max(max_content.saturating_add(2))
                    .min(col.width)
            })
            .collect()
    }

    fn output_tsv(&self, rows: &[TableRow]) {
        let widths = self.calculate_widths(rows);

        let header: Vec<String> = self
            .columns
            .iter()
            .zip(&widths)
            .map(|(col, w)| format!("{:<width$}", style(col.header).bold(), width = *w))
            .collect();
        println!("{}", header.join(" "));

        let total_width: usize = widths.iter().sum::<usize>() + widths.len().saturating_sub(1);
        println!("{}", "-".repeat(total_width));

        for row in rows {
            let parts: Vec<String> = self
                .columns
                .iter()
                .zip(&widths)
                .map(|(col, w)| match row.get(col.key) {
                    Some(value) => value.format_tsv(*w),
                    None => format!("{:<width$}", "-", width = *w),
                })
                .collect();
            println!("{}", parts.join(" ").trim_end());
        }

        if self.show_summary {
            println!();
            println!("{} {}(s) found.", style(rows.len()).cyan(), self.entity_name);
        }
    }

    fn output_csv(&self, rows: &[TableRow]) {
        let mut writer = csv::Writer::from_writer(std::io::stdout());
        let headers: Vec<&str> = self.columns.iter().map(|c| c.key).collect();
        if let Err(e) = writer.write_record(&headers) {
            tracing::warn!(error = %e, "csv header not written");
            return;
        }
        for row in rows {
            let values: Vec<String> = self
                .columns
                .iter()
                .map(|col| row.get(col.key).map(CellValue::raw).unwrap_or_default())
                .collect();
            if let Err(e) = writer.write_record(&values) {
                tracing::warn!(error = %e, "csv row not written");
                return;
            }
        }
        let _ = writer.flush();
    }

    /// Markdown table via tabled
    pub fn render_md(&self, rows: &[TableRow]) -> String {
        let mut builder = Builder::default();
        builder.push_record(self.columns.iter().map(|c| c.header.to_string()));
        for row in rows {
            builder.push_record(self.columns.iter().map(|col| {
                row.get(col.key)
                    .map(CellValue::format_md)
                    .unwrap_or_else(|| "-".to_string())
            }));
        }
        builder.build().with(Style::markdown()).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: &[ColumnDef] = &[
        ColumnDef::new("id", "ID", 32),
        ColumnDef::new("title", "TITLE", 20),
        ColumnDef::new("status", "STATUS", 10),
    ];

    fn row(title: &str) -> TableRow {
        TableRow::new("PRJ-01ABC")
            .cell("id", CellValue::Id("PRJ-01ABC".to_string()))
            .cell("title", CellValue::Text(title.to_string()))
            .cell("status", CellValue::Status(ProjectStatus::Urgent))
    }

    #[test]
    fn test_cell_value_raw() {
        let due = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(
            CellValue::Due { date: due, overdue: true }.raw(),
            "2026-03-01 (overdue)"
        );
        assert_eq!(CellValue::Money(1234567.0).raw(), "$1.234.567");
        assert_eq!(CellValue::Tags(vec!["a".into(), "b".into()]).raw(), "a, b");
        assert_eq!(CellValue::Empty.raw(), "");
    }

    #[test]
    fn test_cell_value_md_escapes_pipes() {
        assert_eq!(CellValue::Text("a|b".to_string()).format_md(), "a\\|b");
    }

    #[test]
    fn test_table_row_builder() {
        let r = row("Launch");
        assert_eq!(r.full_id, "PRJ-01ABC");
        assert!(matches!(r.get("status"), Some(CellValue::Status(ProjectStatus::Urgent))));
        assert!(r.get("missing").is_none());
    }

    #[test]
    fn test_widths_capped_by_column() {
        let formatter = TableFormatter::new(COLUMNS, "project");
        let widths = formatter.calculate_widths(&[row("A title that is far longer than twenty")]);
        assert_eq!(widths[1], 20);
        assert_eq!(widths[2], 8);
    }

    #[test]
    fn test_render_md() {
        let formatter = TableFormatter::new(COLUMNS, "project");
        let md = formatter.render_md(&[row("Launch")]);
        assert!(md.contains("| ID"));
        assert!(md.contains("Launch"));
        assert!(md.contains("urgent"));
    }
}
