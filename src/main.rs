//! # BI Solr Sync CLI (`bi-solr-sync`)
//!
//! Extracts documents from Solr into a JSON file and optionally uploads the
//! file to Sharepoint.
//!
//! ## Examples
//!
//! ```bash
//! # Everything, printed to stdout
//! bi-solr-sync http://solr:8983/solr/basis-collection/select
//!
//! # Changes since a date, written to a file and uploaded
//! SHAREPOINT_TENANT=... SHAREPOINT_CLIENT_ID=... \
//! SHAREPOINT_CLIENT_SECRET=... SHAREPOINT_DRIVE_ID=... \
//! bi-solr-sync http://solr:8983/solr/basis-collection/select \
//!     --since 2021-10-11T07:00:00Z --output delta.json --upload
//!
//! # Shell completions
//! bi-solr-sync --completions bash > /etc/bash_completion.d/bi-solr-sync
//! ```
//!
//! ## Environment
//!
//! | Variable | Purpose |
//! |----------|---------|
//! | `SHAREPOINT_TENANT` | Azure AD tenant name (`<tenant>.onmicrosoft.com`) |
//! | `SHAREPOINT_CLIENT_ID` | App registration client id |
//! | `SHAREPOINT_CLIENT_SECRET` | App registration secret |
//! | `SHAREPOINT_DRIVE_ID` | Target document library |
//! | `SHAREPOINT_PROXY_HOST` | SOCKS5 proxy host (optional) |
//! | `SHAREPOINT_PROXY_PORT` | SOCKS5 proxy port, default `1080` |
//! | `SHAREPOINT_PROXY_USERNAME` | Required with a proxy host |
//! | `SHAREPOINT_PROXY_PASSWORD` | Required with a proxy host |
//! | `RUST_LOG` | Log filter, default `info` |

use bi_solr_sync::config::{self, UploadMode};
use bi_solr_sync::sync::{run_sync, SyncOptions};
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Extracts documents from Solr and formats them in a way the DWH/BI
/// solution understands.
#[derive(Parser)]
#[command(name = "bi-solr-sync", version)]
struct Cli {
    /// Full Solr URL, must include the collection and `/select`.
    #[arg(required_unless_present = "completions")]
    url: Option<String>,

    /// Output file (should end with .json). Printed to stdout when omitted.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Only fetch documents changed since this date, in a format Solr
    /// understands, e.g. `2021-10-11T07:00:00Z`.
    #[arg(long)]
    since: Option<String>,

    /// Upload the output file to Sharepoint. Requires `--output`.
    #[arg(long)]
    upload: bool,

    /// Sharepoint folder to upload into (default: library root).
    #[arg(long)]
    folder: Option<String>,

    /// Upload strategy.
    #[arg(long, value_enum)]
    upload_mode: Option<UploadMode>,

    /// Path to configuration file (TOML). Built-in defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// File listing the extra Solr fields to fetch, one per line.
    #[arg(long)]
    fields_file: Option<PathBuf>,

    /// Print a shell completion script and exit.
    #[arg(long, value_enum, value_name = "SHELL")]
    completions: Option<Shell>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        clap_complete::generate(
            shell,
            &mut Cli::command(),
            "bi-solr-sync",
            &mut std::io::stdout(),
        );
        return Ok(());
    }

    let cfg = config::load_config(cli.config.as_deref())?;
    let opts = SyncOptions {
        solr_url: cli.url.unwrap_or_default(),
        output: cli.output,
        since: cli.since,
        upload: cli.upload,
        folder: cli.folder,
        upload_mode: cli.upload_mode,
        fields_file: cli.fields_file,
    };

    run_sync(&cfg, &opts)
}
