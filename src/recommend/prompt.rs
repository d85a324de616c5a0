use crate::core::catalog::Catalog;

/// Compact service list for the model
pub fn serialize_catalog(catalog: &Catalog) -> String {
    let mut out = String::with_capacity(1024);
    out.push_str("SERVICES:\n");
    for service in &catalog.services {
        out.push_str("- ");
        out.push_str(&service.slug);
        out.push_str(" \"");
        out.push_str(&service.name);
        out.push_str("\": ");
        out.push_str(&service.summary);
        out.push('\n');
    }
    out
}

pub fn system_prompt(catalog: &Catalog) -> String {
    format!(
        "You are a senior account manager at a marketing agency in Colombia. \
A prospective client describes what their business needs; recommend the agency \
services that address it.\n\n\
Rules:\n\
- Only recommend services from the list below, by slug\n\
- Recommend between one and three services, most important first\n\
- The summary is two or three sentences in plain language addressed to the client\n\
- Do not quote prices or promise results\n\n\
{}\n\
Output ONLY a JSON object: \
{{\"title\":\"<short plan name>\",\"summary\":\"<summary>\",\"recommended_services\":[\"<slug>\"]}}",
        serialize_catalog(catalog)
    )
}

pub fn user_message(needs: &str) -> String {
    format!("CLIENT NEEDS:\n{}\n", needs.trim())
}

/// Full prompt for single-input backends
pub fn build_prompt(needs: &str, catalog: &Catalog) -> String {
    format!("{}\n\n{}", system_prompt(catalog), user_message(needs))
}
