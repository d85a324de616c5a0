use crate::core::catalog::Catalog;

use super::{RecommendError, Recommendation, MAX_SERVICES};

#[derive(serde::Deserialize)]
struct LlmRecommendation {
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default, alias = "services")]
    recommended_services: Vec<String>,
}

/// Parse raw model output into a recommendation, keeping only services
/// that resolve to catalog entries.
pub fn parse_llm_output(raw: &str, catalog: &Catalog) -> Result<Recommendation, RecommendError> {
    let json_str = extract_json_object(raw)
        .ok_or_else(|| RecommendError::Unparseable("no JSON object in response".to_string()))?;

    let parsed: LlmRecommendation = serde_json::from_str(json_str)
        .map_err(|e| RecommendError::Unparseable(e.to_string()))?;

    if parsed.title.trim().is_empty() {
        return Err(RecommendError::Unparseable("empty title".to_string()));
    }

    let mut services: Vec<String> = Vec::new();
    for name in &parsed.recommended_services {
        if services.len() == MAX_SERVICES {
            break;
        }
        match catalog.service(name) {
            Some(service) if !services.contains(&service.slug) => services.push(service.slug.clone()),
            Some(_) => {}
            None => tracing::debug!(service = %name, "dropping service not in catalog"),
        }
    }

    Ok(Recommendation {
        title: parsed.title.trim().to_string(),
        summary: parsed.summary.trim().to_string(),
        recommended_services: services,
    })
}

/// First balanced `{...}` in the text, ignoring braces inside strings
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in raw[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..=start + i]);
                }
            }
            _ => {}
        }
    }
    None
}
