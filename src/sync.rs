//! The extract → export → upload run behind the CLI.
//!
//! # Workflow
//!
//! 1. Check that Sharepoint settings are present if uploading.
//! 2. Normalize the Solr URL and build the query.
//! 3. Count, then fetch, matching documents.
//! 4. Write them as JSON to the output file (or stdout).
//! 5. Upload the file to Sharepoint, when asked to.

use anyhow::{bail, Result};
use std::path::PathBuf;
use tracing::info;

use crate::config::{Config, SharepointEnv, UploadMode};
use crate::export::write_documents;
use crate::retry::RetryPolicy;
use crate::sharepoint::{ProxySettings, SharepointConnector};
use crate::solr::{field_list, format_solr_url, generate_query, read_field_list, SolrClient};

/// Options for one run, as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub solr_url: String,
    pub output: Option<PathBuf>,
    pub since: Option<String>,
    pub upload: bool,
    /// Overrides `sharepoint.folder`.
    pub folder: Option<String>,
    /// Overrides `sharepoint.upload_mode`.
    pub upload_mode: Option<UploadMode>,
    /// Overrides `solr.fields_file`.
    pub fields_file: Option<PathBuf>,
}

pub fn run_sync(config: &Config, opts: &SyncOptions) -> Result<()> {
    let sharepoint = if opts.upload {
        if opts.output.is_none() {
            bail!("--upload requires --output");
        }
        Some(SharepointEnv::from_env()?)
    } else {
        None
    };

    let solr_url = format_solr_url(&opts.solr_url)?;
    let query = generate_query(
        &config.solr.base_query,
        &config.solr.since_field,
        opts.since.as_deref(),
    );
    let fields_file = opts
        .fields_file
        .as_deref()
        .unwrap_or(config.solr.fields_file.as_path());
    let fields = field_list(&config.solr.id_field, &read_field_list(fields_file)?);

    let solr = SolrClient::new(solr_url, config.solr.timeout_secs)?;

    info!("Getting document count ...");
    let count = solr.count(&query)?;
    info!("Found {} documents", count);

    info!("Starting solr extraction ...");
    let docs = solr.fetch_docs(&query, &fields, config.solr.rows)?;
    info!("Solr extraction done");

    info!("Writing result to file ...");
    write_documents(&docs, opts.output.as_deref())?;
    info!("File done");

    if let (Some(env), Some(output)) = (sharepoint, opts.output.as_deref()) {
        info!("Uploading to sharepoint...");
        let folder = opts
            .folder
            .as_deref()
            .or(config.sharepoint.folder.as_deref());
        let mut connector = SharepointConnector::new(
            env.credentials,
            &ProxySettings::from_env(),
            config.sharepoint.endpoints(),
        )?
        .with_uploader(config.sharepoint.segment_size, RetryPolicy::retry_once())?;

        let report = match opts.upload_mode.unwrap_or(config.sharepoint.upload_mode) {
            UploadMode::Session => connector.upload(&env.drive_id, output, folder)?,
            UploadMode::Simple => connector.upload_small(&env.drive_id, output, folder)?,
        };
        if let Some(item) = report.item {
            info!("Stored as {} (id {})", item.name, item.id);
        }
        info!("Upload done");
    }

    info!("All done!");
    Ok(())
}
