//! Document rendering: quote print pages, survey summaries and starter files

use chrono::NaiveDate;
use rust_embed::Embed;
use serde::Serialize;
use tera::Tera;
use thiserror::Error;

use crate::entities::quote::{format_cop, Quote};
use crate::entities::survey::{display_value, SurveyResponse};

#[derive(Embed)]
#[folder = "templates/"]
struct EmbeddedTemplates;

const QUOTE_PRINT: &str = "quote_print.html.tera";
const SURVEY_SUMMARY: &str = "survey_summary.txt.tera";
const BRIEF_STARTER: &str = "brief.yaml.tera";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Template rendering error: {0}")]
    RenderError(String),
}

#[derive(Debug, Serialize)]
struct PrintRow {
    /// Set on the first row of a section on each page
    section: Option<String>,
    description: String,
    quantity: String,
    price: String,
    line_total: String,
}

#[derive(Debug, Serialize)]
struct PrintPage {
    rows: Vec<PrintRow>,
}

#[derive(Debug, Serialize)]
struct SummaryRow {
    label: String,
    value: String,
}

#[derive(Debug, Serialize)]
struct SummaryStep {
    title: &'static str,
    rows: Vec<SummaryRow>,
}

/// Template renderer using Tera
pub struct TemplateGenerator {
    tera: Tera,
}

impl TemplateGenerator {
    /// Create a new generator with the embedded templates
    pub fn new() -> Result<Self, TemplateError> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![".html.tera"]);

        for file in EmbeddedTemplates::iter() {
            let filename = file.as_ref();
            if let Some(content) = EmbeddedTemplates::get(filename) {
                if let Ok(template_str) = std::str::from_utf8(&content.data) {
                    tera.add_raw_template(filename, template_str)
                        .map_err(|e| TemplateError::RenderError(e.to_string()))?;
                }
            }
        }

        Ok(Self { tera })
    }

    fn render(&self, name: &str, context: &tera::Context) -> Result<String, TemplateError> {
        if !self.tera.get_template_names().any(|n| n == name) {
            return Err(TemplateError::NotFound(name.to_string()));
        }
        self.tera
            .render(name, context)
            .map_err(|e| TemplateError::RenderError(e.to_string()))
    }

    /// Printable HTML for a quote, with a page break every `items_per_page` items.
    /// Totals appear on the last page.
    pub fn render_quote_print(&self, quote: &Quote, items_per_page: usize) -> Result<String, TemplateError> {
        let per_page = items_per_page.max(1);

        let pages: Vec<PrintPage> = quote
            .items
            .chunks(per_page)
            .map(|chunk| {
                let mut last_section: Option<&str> = None;
                let rows = chunk
                    .iter()
                    .map(|item| {
                        let section = item.section_name();
                        let header = (last_section != Some(section)).then(|| section.to_string());
                        last_section = Some(section);
                        PrintRow {
                            section: header,
                            description: item.description.clone(),
                            quantity: format_quantity(item.quantity),
                            price: format_cop(item.price),
                            line_total: format_cop(item.line_total()),
                        }
                    })
                    .collect();
                PrintPage { rows }
            })
            .collect();

        let mut context = tera::Context::new();
        context.insert("id", &quote.id.to_string());
        context.insert("client", &quote.client);
        context.insert("client_nit", &quote.client_nit);
        context.insert("date", &quote.date.format("%Y-%m-%d").to_string());
        context.insert("notes", &quote.notes);
        context.insert("page_count", &pages.len());
        context.insert("pages", &pages);
        context.insert("subtotal", &format_cop(quote.subtotal()));
        context.insert("iva_percentage", &format_quantity(quote.iva_percentage));
        context.insert("iva", &format_cop(quote.iva()));
        context.insert("total", &format_cop(quote.total()));

        self.render(QUOTE_PRINT, &context)
    }

    /// Plain-text summary of a submitted response, grouped by step
    pub fn render_survey_summary(&self, response: &SurveyResponse) -> Result<String, TemplateError> {
        let definition = response.survey.definition();
        let steps: Vec<SummaryStep> = definition
            .steps
            .iter()
            .map(|step| SummaryStep {
                title: step.title,
                rows: step
                    .fields
                    .iter()
                    .filter_map(|field| {
                        response.answers.get(*field).map(|v| SummaryRow {
                            label: field.replace('_', " "),
                            value: display_value(v),
                        })
                    })
                    .collect(),
            })
            .filter(|s| !s.rows.is_empty())
            .collect();

        let mut context = tera::Context::new();
        context.insert("survey", response.survey.as_str());
        context.insert("id", &response.id.to_string());
        context.insert(
            "submitted_at",
            &response.submitted_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        );
        context.insert("steps", &steps);

        self.render(SURVEY_SUMMARY, &context)
    }

    /// Starter YAML file for `brief new --file`
    pub fn generate_brief(
        &self,
        client_nit: &str,
        requester: &str,
        due_date: NaiveDate,
    ) -> Result<String, TemplateError> {
        let mut context = tera::Context::new();
        context.insert("client_nit", client_nit);
        context.insert("requester", requester);
        context.insert("due_date", &due_date.format("%Y-%m-%d").to_string());
        self.render(BRIEF_STARTER, &context)
    }
}

/// Quantities without a trailing `.0` when whole
fn format_quantity(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::quote::QuoteItem;
    use crate::entities::survey::{SurveyKind, QUICK};

    fn quote(items: usize) -> Quote {
        let list = (0..items)
            .map(|i| QuoteItem::new(format!("Item {}", i + 1), 1.0, 1000.0, "").unwrap())
            .collect();
        Quote::new("Café <La 14>", 19.0, list).unwrap()
    }

    #[test]
    fn test_quote_print_paginates() {
        let generator = TemplateGenerator::new().unwrap();
        let html = generator.render_quote_print(&quote(25), 12).unwrap();

        assert_eq!(html.matches("class=\"page\"").count(), 3);
        assert!(html.contains("Página 3 de 3"));
        // Totals only once, on the last page
        assert_eq!(html.matches("Subtotal").count(), 1);
        assert!(html.contains("$25.000"));
        assert!(html.contains("$29.750"));
    }

    #[test]
    fn test_quote_print_escapes_html() {
        let generator = TemplateGenerator::new().unwrap();
        let html = generator.render_quote_print(&quote(1), 12).unwrap();
        assert!(html.contains("Café &lt;La 14&gt;"));
        assert!(!html.contains("<La 14>"));
    }

    #[test]
    fn test_section_header_per_page() {
        let generator = TemplateGenerator::new().unwrap();
        let items = vec![
            QuoteItem::new("Logo", 1.0, 10.0, "Branding").unwrap(),
            QuoteItem::new("Manual", 1.0, 10.0, "Branding").unwrap(),
            QuoteItem::new("Posts", 8.0, 10.0, "Social").unwrap(),
        ];
        let quote = Quote::new("Client", 0.0, items).unwrap();
        let html = generator.render_quote_print(&quote, 2).unwrap();
        assert_eq!(html.matches("<tr class=\"section\">").count(), 2);
    }

    #[test]
    fn test_survey_summary() {
        let generator = TemplateGenerator::new().unwrap();
        let response = SurveyResponse::new(SurveyKind::Quick, QUICK.sample_record());
        let text = generator.render_survey_summary(&response).unwrap();
        assert!(text.starts_with("QUICK SURVEY SRV-"));
        assert!(text.contains("[Contact]"));
        assert!(text.contains("  main goals: leads, digital_presence"));
    }

    #[test]
    fn test_brief_starter_is_valid_yaml() {
        let generator = TemplateGenerator::new().unwrap();
        let due = NaiveDate::from_ymd_opt(2026, 11, 30).unwrap();
        let yaml = generator.generate_brief("900123456", "Laura Gómez", due).unwrap();
        let parsed: serde_yml::Value = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(parsed.get("client_nit").unwrap().as_str(), Some("900123456"));
        assert_eq!(parsed.get("due_date").unwrap().as_str(), Some("2026-11-30"));
    }

    #[test]
    fn test_format_quantity() {
        assert_eq!(format_quantity(3.0), "3");
        assert_eq!(format_quantity(2.5), "2.5");
    }
}
