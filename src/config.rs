use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::fs;

use crate::data::PageNode;

/// top level site configuration holding the page tree
/// and free-form site-wide settings
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SiteConfig {
    pub pages: Vec<PageNode>,

    /// absolute prefix for sitemap entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// sender address for not-found alert mails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_alerts_from: Option<String>,

    /// recipient address for not-found alert mails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_404_alerts_to: Option<String>,

    /// remaining site settings, passed to templates verbatim
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

impl SiteConfig {
    /// Alert mails are only sent when both addresses are configured,
    /// a missing or empty one suppresses them entirely.
    pub fn alert_addresses(&self) -> Option<(&str, &str)> {
        match (
            self.send_alerts_from.as_deref(),
            self.send_404_alerts_to.as_deref(),
        ) {
            (Some(from), Some(to)) if !from.is_empty() && !to.is_empty() => Some((from, to)),
            _ => None,
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read the site configuration at {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("the site configuration at {} is not valid: {source}", .path.display())]
    #[diagnostic(help("the configuration must be a json object with a `pages` array"))]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("page {location} has an empty `path`")]
    EmptyPath { location: String },

    #[error("page {location} ({path}) has an empty `template`")]
    EmptyTemplate { location: String, path: String },

    #[error("the page path {path} is configured more than once")]
    #[diagnostic(help("paths are matched exactly, a duplicate would shadow the other page"))]
    DuplicatePath { path: String },

    #[error("the template {template} referenced by page {path} does not exist")]
    MissingTemplate { template: String, path: String },

    #[error("the not-found template {template} is missing from the template directory")]
    #[diagnostic(help("unmatched request paths are rendered through {template}"))]
    MissingNotFoundTemplate { template: String },
}

/// Reads and validates the site configuration.
///
/// This runs once per request so that configuration edits take effect
/// without a restart.
#[tracing::instrument(level = "trace")]
pub async fn read_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    let raw = fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;

    parse_config(path, &raw)
}

fn parse_config(path: &Path, raw: &str) -> Result<SiteConfig, ConfigError> {
    let config: SiteConfig =
        serde_json::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
    validate(&config)?;

    Ok(config)
}

fn validate(config: &SiteConfig) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    validate_pages(&config.pages, "pages", &mut seen)
}

fn validate_pages(
    nodes: &[PageNode],
    location: &str,
    seen: &mut HashSet<String>,
) -> Result<(), ConfigError> {
    for (index, node) in nodes.iter().enumerate() {
        let location = format!("{location}[{index}]");

        if node.path.is_empty() {
            return Err(ConfigError::EmptyPath { location });
        }
        if node.template.is_empty() {
            return Err(ConfigError::EmptyTemplate {
                location,
                path: node.path.clone(),
            });
        }
        if !seen.insert(node.path.clone()) {
            return Err(ConfigError::DuplicatePath {
                path: node.path.clone(),
            });
        }

        validate_pages(&node.children, &format!("{location}.pages"), seen)?;
    }

    Ok(())
}

/// Source of the configuration snapshot a request is answered from.
///
/// The request handler asks for the configuration once per request,
/// implementations decide how fresh that snapshot is.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn load(&self) -> Result<SiteConfig, ConfigError>;
}

/// Re-reads the configuration file on every request.
#[derive(Debug)]
pub struct JsonConfigSource {
    path: PathBuf,
}

impl JsonConfigSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl ConfigSource for JsonConfigSource {
    async fn load(&self) -> Result<SiteConfig, ConfigError> {
        read_config(&self.path).await
    }
}
