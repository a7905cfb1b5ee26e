//! # BI Solr Sync
//!
//! Extracts bibliographic records from a Solr index, writes them as a JSON
//! export and uploads the export to a Sharepoint document library through
//! Microsoft Graph.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌─────────────────────────────┐
//! │   Solr   │──▶│  Export  │──▶│  Sharepoint (Graph)         │
//! │ /select  │   │   JSON   │   │  token → session → segments │
//! └──────────┘   └──────────┘   └─────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML file and environment settings |
//! | [`solr`] | Query building and document extraction |
//! | [`export`] | JSON output |
//! | [`sharepoint`] | Graph token, upload session and segmented upload |
//! | [`retry`] | Bounded retry combinator |
//! | [`sync`] | The end-to-end run behind the CLI |

pub mod config;
pub mod export;
pub mod retry;
pub mod sharepoint;
pub mod solr;
pub mod sync;
