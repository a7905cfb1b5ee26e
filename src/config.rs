//! Configuration: an optional TOML file plus environment variables.
//!
//! Every file setting has a default, so the tool runs without a config
//! file. Secrets and the target drive only come from the environment.
//!
//! ```toml
//! [solr]
//! base_query = "(marc.001b:870970 OR marc.001b:870971)"
//! fields_file = "fields.txt"
//!
//! [sharepoint]
//! folder = "bi"
//! segment_size = 32768000
//! upload_mode = "session"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::sharepoint::segment::validate_segment_size;
use crate::sharepoint::{
    Credentials, Endpoints, DEFAULT_GRAPH_URL, DEFAULT_LOGIN_URL, DEFAULT_SEGMENT_SIZE,
};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub solr: SolrConfig,
    #[serde(default)]
    pub sharepoint: SharepointConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct SolrConfig {
    #[serde(default = "default_base_query")]
    pub base_query: String,
    #[serde(default = "default_since_field")]
    pub since_field: String,
    #[serde(default = "default_id_field")]
    pub id_field: String,
    #[serde(default = "default_fields_file")]
    pub fields_file: PathBuf,
    #[serde(default = "default_rows")]
    pub rows: u64,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for SolrConfig {
    fn default() -> Self {
        Self {
            base_query: default_base_query(),
            since_field: default_since_field(),
            id_field: default_id_field(),
            fields_file: default_fields_file(),
            rows: default_rows(),
            timeout_secs: None,
        }
    }
}

fn default_base_query() -> String {
    "(marc.001b:870970 OR marc.001b:870971)".to_string()
}
fn default_since_field() -> String {
    "marc.001d".to_string()
}
fn default_id_field() -> String {
    "marc.001a001b".to_string()
}
fn default_fields_file() -> PathBuf {
    PathBuf::from("fields.txt")
}
fn default_rows() -> u64 {
    99_999_999
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum UploadMode {
    /// Resumable upload session, sent in segments.
    #[default]
    Session,
    /// One PUT of the whole file (at most 4 MiB).
    Simple,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct SharepointConfig {
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default = "default_segment_size")]
    pub segment_size: u64,
    #[serde(default)]
    pub upload_mode: UploadMode,
    #[serde(default = "default_login_url")]
    pub login_url: String,
    #[serde(default = "default_graph_url")]
    pub graph_url: String,
}

impl Default for SharepointConfig {
    fn default() -> Self {
        Self {
            folder: None,
            segment_size: default_segment_size(),
            upload_mode: UploadMode::default(),
            login_url: default_login_url(),
            graph_url: default_graph_url(),
        }
    }
}

impl SharepointConfig {
    /// Identity-provider and Graph base URLs for the connector.
    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            login: self.login_url.clone(),
            graph: self.graph_url.clone(),
        }
    }
}

fn default_segment_size() -> u64 {
    DEFAULT_SEGMENT_SIZE
}
fn default_login_url() -> String {
    DEFAULT_LOGIN_URL.to_string()
}
fn default_graph_url() -> String {
    DEFAULT_GRAPH_URL.to_string()
}

/// Load and validate the config file, or return defaults when `path` is `None`.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&content).with_context(|| "Failed to parse config file")?
        }
        None => Config::default(),
    };
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.solr.base_query.trim().is_empty() {
        bail!("solr.base_query must not be empty");
    }
    if config.solr.id_field.trim().is_empty() {
        bail!("solr.id_field must not be empty");
    }
    if config.solr.rows == 0 {
        bail!("solr.rows must be > 0");
    }
    validate_segment_size(config.sharepoint.segment_size)
        .with_context(|| "Invalid sharepoint.segment_size")?;
    Ok(())
}

/// Sharepoint settings that come from the environment.
#[derive(Debug, Clone)]
pub struct SharepointEnv {
    pub credentials: Credentials,
    pub drive_id: String,
}

impl SharepointEnv {
    /// Read `SHAREPOINT_TENANT`, `SHAREPOINT_CLIENT_ID`,
    /// `SHAREPOINT_CLIENT_SECRET` and `SHAREPOINT_DRIVE_ID` through `lookup`.
    /// All four are required.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        match (
            get("SHAREPOINT_TENANT"),
            get("SHAREPOINT_CLIENT_ID"),
            get("SHAREPOINT_CLIENT_SECRET"),
            get("SHAREPOINT_DRIVE_ID"),
        ) {
            (Some(tenant), Some(client_id), Some(client_secret), Some(drive_id)) => Ok(Self {
                credentials: Credentials::new(tenant, client_id, client_secret),
                drive_id,
            }),
            _ => bail!("One or more missing sharepoint environment variables"),
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}
