//! Service recommendations from a free-text description of a client's needs
//!
//! Two backends implement [`Recommender`]:
//! - [`CommandRecommender`] pipes a prompt to a configured shell command
//!   (any model CLI) and parses the JSON object it prints.
//! - [`CatalogRecommender`] scores catalog services by keyword overlap and
//!   works offline.

mod parse;
mod prompt;

pub use parse::parse_llm_output;
pub use prompt::build_prompt;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Write;
use std::process::{Command, Stdio};
use thiserror::Error;

use crate::core::catalog::{Catalog, Service};
use crate::core::config::Config;

/// Most services a recommendation lists
pub const MAX_SERVICES: usize = 3;

/// Generated recommendation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub title: String,
    pub summary: String,
    /// Catalog service slugs, most relevant first
    pub recommended_services: Vec<String>,
}

#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("describe what the business needs first")]
    EmptyNeeds,

    #[error("recommendation backend failed: {0}")]
    Backend(String),

    #[error("recommendation response could not be read: {0}")]
    Unparseable(String),
}

impl RecommendError {
    /// Message shown to the user; backend details go to the log
    pub fn user_message(&self) -> &'static str {
        match self {
            RecommendError::EmptyNeeds => "Describe what the business needs first.",
            RecommendError::Backend(_) | RecommendError::Unparseable(_) => {
                "We could not generate a recommendation right now. Please try again."
            }
        }
    }
}

pub trait Recommender {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    fn recommend(&self, needs: &str, catalog: &Catalog) -> Result<Recommendation, RecommendError>;
}

/// Backend chosen from configuration: the command when one is set, else the catalog
pub fn from_config(config: &Config) -> Box<dyn Recommender> {
    match config
        .recommender_command
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
    {
        Some(command) => Box::new(CommandRecommender::new(command)),
        None => Box::new(CatalogRecommender),
    }
}

/// Runs a shell command with the prompt on stdin and reads the answer from stdout
pub struct CommandRecommender {
    command: String,
}

impl CommandRecommender {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    fn shell(&self) -> Command {
        if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", &self.command]);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", &self.command]);
            cmd
        }
    }
}

impl Recommender for CommandRecommender {
    fn name(&self) -> &'static str {
        "command"
    }

    fn recommend(&self, needs: &str, catalog: &Catalog) -> Result<Recommendation, RecommendError> {
        if needs.trim().is_empty() {
            return Err(RecommendError::EmptyNeeds);
        }
        let prompt = build_prompt(needs, catalog);

        let mut child = self
            .shell()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RecommendError::Backend(format!("cannot run '{}': {}", self.command, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(prompt.as_bytes())
                .map_err(|e| RecommendError::Backend(e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| RecommendError::Backend(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RecommendError::Backend(format!(
                "'{}' exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        let raw = String::from_utf8_lossy(&output.stdout);
        tracing::debug!(bytes = raw.len(), "recommender command answered");
        parse_llm_output(&raw, catalog)
    }
}

/// Offline backend: ranks services by how many of their keywords appear in the needs
pub struct CatalogRecommender;

impl CatalogRecommender {
    fn tokens(text: &str) -> HashSet<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.len() > 1)
            .map(str::to_lowercase)
            .collect()
    }

    fn score(service: &Service, tokens: &HashSet<String>) -> usize {
        service
            .keywords
            .iter()
            .filter(|k| {
                let k = k.to_lowercase();
                tokens
                    .iter()
                    .any(|t| *t == k || (k.len() >= 4 && t.starts_with(&k)))
            })
            .count()
    }
}

impl Recommender for CatalogRecommender {
    fn name(&self) -> &'static str {
        "catalog"
    }

    fn recommend(&self, needs: &str, catalog: &Catalog) -> Result<Recommendation, RecommendError> {
        if needs.trim().is_empty() {
            return Err(RecommendError::EmptyNeeds);
        }
        let tokens = Self::tokens(needs);

        let mut scored: Vec<(usize, usize, &Service)> = catalog
            .services
            .iter()
            .enumerate()
            .map(|(i, s)| (Self::score(s, &tokens), i, s))
            .filter(|(score, _, _)| *score > 0)
            .collect();
        // Highest score first; catalog order breaks ties
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        let mut picked: Vec<&Service> = scored.into_iter().take(MAX_SERVICES).map(|(_, _, s)| s).collect();
        if picked.is_empty() {
            if let Some(strategy) = catalog.service("strategy").or(catalog.services.first()) {
                picked.push(strategy);
            }
        }
        let Some(lead) = picked.first() else {
            return Err(RecommendError::Backend("service catalog is empty".to_string()));
        };

        let names: Vec<&str> = picked.iter().map(|s| s.name.as_str()).collect();
        let summary = match names.as_slice() {
            [one] => format!("We suggest starting with {}: {}", one, lead.summary),
            [init @ .., last] => format!(
                "We suggest combining {} and {}. {}",
                init.join(", "),
                last,
                lead.summary
            ),
            [] => String::new(),
        };

        Ok(Recommendation {
            title: format!("{} plan", lead.name),
            summary,
            recommended_services: picked.iter().map(|s| s.slug.clone()).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::embedded().unwrap()
    }

    #[test]
    fn test_catalog_backend_ranks_by_keywords() {
        let rec = CatalogRecommender
            .recommend(
                "We want more Instagram followers and a new logo for our bakery's social networks",
                &catalog(),
            )
            .unwrap();
        assert_eq!(rec.recommended_services[0], "social_media");
        assert!(rec.recommended_services.contains(&"branding".to_string()));
        assert!(rec.recommended_services.len() <= MAX_SERVICES);
        assert_eq!(rec.title, "Social media management plan");
    }

    #[test]
    fn test_catalog_backend_falls_back_to_strategy() {
        let rec = CatalogRecommender.recommend("no idea really", &catalog()).unwrap();
        assert_eq!(rec.recommended_services, vec!["strategy"]);
        assert!(rec.summary.starts_with("We suggest starting with Marketing strategy"));
    }

    #[test]
    fn test_empty_needs_rejected() {
        let err = CatalogRecommender.recommend("   ", &catalog()).unwrap_err();
        assert!(matches!(err, RecommendError::EmptyNeeds));
    }

    #[test]
    fn test_errors_map_to_generic_message() {
        let err = RecommendError::Backend("HTTP 500".to_string());
        assert!(err.user_message().contains("try again"));
        assert!(!err.user_message().contains("500"));
    }

    #[test]
    fn test_from_config_picks_backend() {
        let mut config = Config::default();
        assert_eq!(from_config(&config).name(), "catalog");
        config.recommender_command = Some("  ".to_string());
        assert_eq!(from_config(&config).name(), "catalog");
        config.recommender_command = Some("my-llm --json".to_string());
        assert_eq!(from_config(&config).name(), "command");
    }

    #[cfg(unix)]
    #[test]
    fn test_command_backend_reads_stdout() {
        let command = r#"cat > /dev/null; echo 'Result: {"title":"Web presence","summary":"Build a site.","recommended_services":["web_design","seo"]}'"#;
        let rec = CommandRecommender::new(command)
            .recommend("we have no website", &catalog())
            .unwrap();
        assert_eq!(rec.title, "Web presence");
        assert_eq!(rec.recommended_services, vec!["web_design", "seo"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_command_backend_failure() {
        let err = CommandRecommender::new("cat > /dev/null; exit 3")
            .recommend("anything", &catalog())
            .unwrap_err();
        assert!(matches!(err, RecommendError::Backend(_)));
    }
}
