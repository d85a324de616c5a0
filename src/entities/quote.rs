//! Quotations: priced line items with IVA

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::core::identity::{EntityId, EntityPrefix};

/// Section label used for items without one
pub const DEFAULT_SECTION: &str = "General";

#[derive(Debug, Error, PartialEq)]
pub enum QuoteError {
    #[error("quantity of '{0}' must not be negative")]
    NegativeQuantity(String),

    #[error("price of '{0}' must not be negative")]
    NegativePrice(String),

    #[error("amounts of '{0}' are too large")]
    NotFinite(String),

    #[error("IVA must be between 0 and 100, got {0}")]
    InvalidIva(f64),

    #[error("a quote needs at least one item")]
    NoItems,

    #[error("invalid item '{0}': expected DESCRIPTION:QTY:PRICE[:SECTION]")]
    ItemSyntax(String),

    #[error("invalid quote document: {0}")]
    Document(String),
}

/// One priced line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuoteItem {
    pub description: String,
    pub quantity: f64,
    pub price: f64,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub section: String,
}

impl QuoteItem {
    pub fn new(
        description: impl Into<String>,
        quantity: f64,
        price: f64,
        section: impl Into<String>,
    ) -> Result<Self, QuoteError> {
        let item = Self {
            description: description.into(),
            quantity,
            price,
            section: section.into(),
        };
        item.check()?;
        Ok(item)
    }

    fn check(&self) -> Result<(), QuoteError> {
        if !(self.quantity >= 0.0) {
            return Err(QuoteError::NegativeQuantity(self.description.clone()));
        }
        if !(self.price >= 0.0) {
            return Err(QuoteError::NegativePrice(self.description.clone()));
        }
        if !self.line_total().is_finite() {
            return Err(QuoteError::NotFinite(self.description.clone()));
        }
        Ok(())
    }

    pub fn line_total(&self) -> f64 {
        self.quantity * self.price
    }

    pub fn section_name(&self) -> &str {
        if self.section.trim().is_empty() {
            DEFAULT_SECTION
        } else {
            &self.section
        }
    }
}

impl std::str::FromStr for QuoteItem {
    type Err = QuoteError;

    /// Parse `DESCRIPTION:QTY:PRICE[:SECTION]`. The description may itself contain colons.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        let number = |p: &str| p.replace(',', "").parse::<f64>().ok();
        let n = parts.len();
        let syntax = || QuoteError::ItemSyntax(s.to_string());

        if n >= 4 {
            if let (Some(q), Some(p)) = (number(parts[n - 3]), number(parts[n - 2])) {
                let description = parts[..n - 3].join(":");
                if description.is_empty() {
                    return Err(syntax());
                }
                return QuoteItem::new(description, q, p, parts[n - 1]);
            }
        }
        if n >= 3 {
            if let (Some(q), Some(p)) = (number(parts[n - 2]), number(parts[n - 1])) {
                let description = parts[..n - 2].join(":");
                if description.is_empty() {
                    return Err(syntax());
                }
                return QuoteItem::new(description, q, p, "");
            }
        }
        Err(syntax())
    }
}

/// Items of one section with their subtotal
#[derive(Debug)]
pub struct QuoteSection<'a> {
    pub name: &'a str,
    pub items: Vec<&'a QuoteItem>,
    pub subtotal: f64,
}

/// A quotation for a client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quote {
    pub id: EntityId,
    pub client: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_nit: Option<String>,

    pub date: NaiveDate,

    pub iva_percentage: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub items: Vec<QuoteItem>,
}

/// Quote fields accepted from a YAML/JSON document (checked against the `quote` schema)
#[derive(Debug, Deserialize)]
struct QuoteDocument {
    client: String,
    #[serde(default)]
    client_nit: Option<String>,
    #[serde(default)]
    iva_percentage: Option<f64>,
    #[serde(default)]
    notes: Option<String>,
    items: Vec<QuoteItem>,
}

impl Quote {
    pub fn new(
        client: impl Into<String>,
        iva_percentage: f64,
        items: Vec<QuoteItem>,
    ) -> Result<Self, QuoteError> {
        if !(0.0..=100.0).contains(&iva_percentage) {
            return Err(QuoteError::InvalidIva(iva_percentage));
        }
        if items.is_empty() {
            return Err(QuoteError::NoItems);
        }
        items.iter().try_for_each(QuoteItem::check)?;
        let subtotal: f64 = items.iter().map(QuoteItem::line_total).sum();
        if !(subtotal * (1.0 + iva_percentage / 100.0)).is_finite() {
            return Err(QuoteError::NotFinite("total".to_string()));
        }

        Ok(Self {
            id: EntityId::new(EntityPrefix::Quot),
            client: client.into(),
            client_nit: None,
            date: Utc::now().date_naive(),
            iva_percentage,
            notes: None,
            items,
        })
    }

    /// Build from an already schema-validated document; `default_iva` applies when absent
    pub fn from_document(document: Value, default_iva: f64) -> Result<Self, QuoteError> {
        let doc: QuoteDocument =
            serde_json::from_value(document).map_err(|e| QuoteError::Document(e.to_string()))?;
        let mut quote = Quote::new(doc.client, doc.iva_percentage.unwrap_or(default_iva), doc.items)?;
        quote.client_nit = doc.client_nit;
        quote.notes = doc.notes;
        Ok(quote)
    }

    /// Sum of quantity × price
    pub fn subtotal(&self) -> f64 {
        self.items.iter().map(QuoteItem::line_total).sum()
    }

    pub fn iva(&self) -> f64 {
        self.subtotal() * self.iva_percentage / 100.0
    }

    pub fn total(&self) -> f64 {
        self.subtotal() + self.iva()
    }

    /// Items grouped by section, in order of first appearance
    pub fn sections(&self) -> Vec<QuoteSection<'_>> {
        let mut sections: Vec<QuoteSection<'_>> = Vec::new();
        for item in &self.items {
            let name = item.section_name();
            match sections.iter_mut().find(|s| s.name == name) {
                Some(section) => {
                    section.items.push(item);
                    section.subtotal += item.line_total();
                }
                None => sections.push(QuoteSection {
                    name,
                    items: vec![item],
                    subtotal: item.line_total(),
                }),
            }
        }
        sections
    }
}

/// Format an amount as Colombian pesos: `$1.234.567`
pub fn format_cop(amount: f64) -> String {
    let rounded = amount.round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    if negative {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(s: &str) -> QuoteItem {
        s.parse().unwrap()
    }

    #[test]
    fn test_totals() {
        let quote = Quote::new(
            "Café La 14",
            19.0,
            vec![item("Logo design:1:1200000"), item("Social posts:12:85000:Content")],
        )
        .unwrap();

        assert_eq!(quote.subtotal(), 2_220_000.0);
        assert!((quote.iva() - 421_800.0).abs() < 1e-6);
        assert!((quote.total() - 2_641_800.0).abs() < 1e-6);
    }

    #[test]
    fn test_total_identity_over_varied_items() {
        let rates = [0.0, 5.0, 19.0, 100.0];
        let items = [
            (0.0, 0.0),
            (1.0, 0.5),
            (3.0, 1_999.99),
            (2.5, 120_000.0),
            (1000.0, 0.01),
        ];
        for iva in rates {
            let list: Vec<QuoteItem> = items
                .iter()
                .map(|(q, p)| QuoteItem::new("line", *q, *p, "").unwrap())
                .collect();
            let quote = Quote::new("Client", iva, list).unwrap();
            let expected = quote.subtotal() + quote.subtotal() * iva / 100.0;
            assert!((quote.total() - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_rejects_negative_values() {
        assert_eq!(
            QuoteItem::new("Banner", -1.0, 10.0, ""),
            Err(QuoteError::NegativeQuantity("Banner".to_string()))
        );
        assert_eq!(
            QuoteItem::new("Banner", 1.0, -10.0, ""),
            Err(QuoteError::NegativePrice("Banner".to_string()))
        );
        assert!(QuoteItem::new("Banner", f64::NAN, 10.0, "").is_err());
    }

    #[test]
    fn test_rejects_infinite_amounts() {
        assert_eq!(
            "X:inf:1".parse::<QuoteItem>(),
            Err(QuoteError::NotFinite("X".to_string()))
        );
        assert!("X:1:1e309".parse::<QuoteItem>().is_err());
        assert!(QuoteItem::new("Huge", 1e200, 1e200, "").is_err());

        let big = QuoteItem::new("Big", 1.0, f64::MAX, "").unwrap();
        assert_eq!(
            Quote::new("X", 19.0, vec![big.clone(), big]),
            Err(QuoteError::NotFinite("total".to_string()))
        );
    }

    #[test]
    fn test_rejects_bad_quote() {
        assert_eq!(Quote::new("X", 19.0, vec![]), Err(QuoteError::NoItems));
        assert_eq!(
            Quote::new("X", 120.0, vec![item("A:1:1")]),
            Err(QuoteError::InvalidIva(120.0))
        );
    }

    #[test]
    fn test_item_syntax() {
        let parsed = item("Video: reel 30s:2:450000:Video");
        assert_eq!(parsed.description, "Video: reel 30s");
        assert_eq!(parsed.quantity, 2.0);
        assert_eq!(parsed.section, "Video");

        let no_section = item("Hosting 12 months:1:600,000");
        assert_eq!(no_section.price, 600_000.0);
        assert_eq!(no_section.section_name(), DEFAULT_SECTION);

        assert!(matches!(
            "Only a name".parse::<QuoteItem>(),
            Err(QuoteError::ItemSyntax(_))
        ));
        assert!(":1:2".parse::<QuoteItem>().is_err());
    }

    #[test]
    fn test_sections_keep_first_appearance_order() {
        let quote = Quote::new(
            "Client",
            0.0,
            vec![
                item("Logo:1:100:Branding"),
                item("Post:4:10:Social"),
                item("Manual:1:50:Branding"),
            ],
        )
        .unwrap();
        let sections = quote.sections();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].name, "Branding");
        assert_eq!(sections[0].items.len(), 2);
        assert_eq!(sections[0].subtotal, 150.0);
        assert_eq!(sections[1].subtotal, 40.0);
    }

    #[test]
    fn test_from_document_uses_default_iva() {
        let doc = serde_json::json!({
            "client": "Ferretería Castaño",
            "client_nit": "901234567",
            "items": [{ "description": "Catalog", "quantity": 1, "price": 500000 }]
        });
        let quote = Quote::from_document(doc, 19.0).unwrap();
        assert_eq!(quote.iva_percentage, 19.0);
        assert_eq!(quote.client_nit.as_deref(), Some("901234567"));
    }

    #[test]
    fn test_format_cop() {
        assert_eq!(format_cop(0.0), "$0");
        assert_eq!(format_cop(999.0), "$999");
        assert_eq!(format_cop(2_641_800.0), "$2.641.800");
        assert_eq!(format_cop(1234.56), "$1.235");
        assert_eq!(format_cop(-1500.0), "-$1.500");
    }
}
