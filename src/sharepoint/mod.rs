//! Sharepoint upload client (Microsoft Graph).
//!
//! [`SharepointConnector`] is the entry point. It owns the credentials, the
//! cached access token and the HTTP transport, and exposes
//! [`upload`](SharepointConnector::upload) for resumable segmented uploads
//! plus [`upload_small`](SharepointConnector::upload_small) for a single
//! PUT of files up to 4 MiB.
//!
//! ```text
//! upload(drive, file, folder)
//!   ├─ ensure_token            POST login.microsoftonline.com/.../token   (first use only)
//!   ├─ start_upload            POST .../root:/{path}:/createUploadSession
//!   └─ upload_segments         PUT  {uploadUrl}  × N, in order, one retry each
//! ```
//!
//! Execution is blocking and single-threaded. Methods that may touch the
//! token take `&mut self`.

pub mod auth;
pub mod error;
pub mod segment;
pub mod session;
#[cfg(test)]
pub(crate) mod testing;
pub mod transport;

use std::path::Path;

use tracing::info;

pub use auth::{AccessToken, AuthState, Credentials, TokenProvider};
pub use error::{Result, SharepointError};
pub use segment::{
    DriveItem, Segment, SegmentUploader, UploadReport, DEFAULT_SEGMENT_SIZE, SEGMENT_ALIGNMENT,
};
pub use session::UploadSession;
pub use transport::{GraphTransport, HttpResponse, ProxySettings, ReqwestTransport};

use crate::retry::RetryPolicy;
use transport::{GraphRequest, Method, RequestBody};

pub const DEFAULT_LOGIN_URL: &str = "https://login.microsoftonline.com";
pub const DEFAULT_GRAPH_URL: &str = "https://graph.microsoft.com/v1.0";

/// Largest file accepted by [`SharepointConnector::upload_small`].
pub const SIMPLE_UPLOAD_LIMIT: u64 = 4 * 1024 * 1024;

/// Base URLs of the identity provider and Graph.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub login: String,
    pub graph: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login: DEFAULT_LOGIN_URL.to_string(),
            graph: DEFAULT_GRAPH_URL.to_string(),
        }
    }
}

pub struct SharepointConnector<T = ReqwestTransport> {
    transport: T,
    tokens: TokenProvider,
    graph_url: String,
    uploader: SegmentUploader,
}

impl SharepointConnector<ReqwestTransport> {
    /// Connector talking to `endpoints` over HTTP.
    ///
    /// Fails with [`SharepointError::Configuration`] when the proxy settings
    /// are incomplete.
    pub fn new(
        credentials: Credentials,
        proxy: &ProxySettings,
        endpoints: Endpoints,
    ) -> Result<Self> {
        Ok(Self::with_transport(
            credentials,
            ReqwestTransport::new(proxy)?,
            endpoints,
        ))
    }
}

impl<T: GraphTransport> SharepointConnector<T> {
    pub fn with_transport(credentials: Credentials, transport: T, endpoints: Endpoints) -> Self {
        Self {
            transport,
            tokens: TokenProvider::new(credentials, &endpoints.login),
            graph_url: endpoints.graph,
            uploader: SegmentUploader::default(),
        }
    }

    /// Override the segment size (validated) and retry policy.
    pub fn with_uploader(mut self, segment_size: u64, retry: RetryPolicy) -> Result<Self> {
        self.uploader = SegmentUploader::new(segment_size, retry)?;
        Ok(self)
    }

    pub fn auth_state(&self) -> &AuthState {
        self.tokens.state()
    }

    pub fn ensure_token(&mut self) -> Result<String> {
        self.tokens.ensure_token(&self.transport)
    }

    /// Create an upload session for `file_name` (optionally inside
    /// `folder_name`) and return its URL.
    pub fn start_upload(
        &mut self,
        drive_id: &str,
        file_name: &str,
        folder_name: Option<&str>,
    ) -> Result<String> {
        let token = self.ensure_token()?;
        let path = session::target_path(file_name, folder_name);
        let session =
            session::create_upload_session(&self.transport, &self.graph_url, &token, drive_id, &path)?;
        Ok(session.upload_url)
    }

    /// Upload the local file at `file` into an existing session.
    pub fn upload_segments(&mut self, session_url: &str, file: &Path) -> Result<UploadReport> {
        let token = self.ensure_token()?;
        self.uploader
            .upload_file(&self.transport, session_url, &token, file)
    }

    /// Upload `file` to `drive_id`, under `folder_name` when given.
    ///
    /// The remote name is the file's base name.
    pub fn upload(
        &mut self,
        drive_id: &str,
        file: &Path,
        folder_name: Option<&str>,
    ) -> Result<UploadReport> {
        let file_name = remote_name(file)?;
        let session_url = self.start_upload(drive_id, &file_name, folder_name)?;
        let report = self.upload_segments(&session_url, file)?;
        info!(
            "Uploaded {} bytes in {} segment(s) ({} request(s))",
            report.bytes, report.segments, report.attempts
        );
        Ok(report)
    }

    /// Upload `file` with a single `PUT .../content`; limited to
    /// [`SIMPLE_UPLOAD_LIMIT`] bytes.
    pub fn upload_small(
        &mut self,
        drive_id: &str,
        file: &Path,
        folder_name: Option<&str>,
    ) -> Result<UploadReport> {
        let io_err = |source| SharepointError::Io {
            path: file.to_path_buf(),
            source,
        };
        let size = std::fs::metadata(file).map_err(io_err)?.len();
        if size > SIMPLE_UPLOAD_LIMIT {
            return Err(SharepointError::FileTooLarge {
                path: file.to_path_buf(),
                size,
                limit: SIMPLE_UPLOAD_LIMIT,
            });
        }
        let bytes = std::fs::read(file).map_err(io_err)?;

        let token = self.ensure_token()?;
        let path = session::target_path(&remote_name(file)?, folder_name);
        let url = format!("{}/content", session::item_url(&self.graph_url, drive_id, &path));

        let request = GraphRequest::new(Method::Put, &url)
            .bearer(&token)
            .header("Content-Type", "application/json")
            .body(RequestBody::Bytes(&bytes));
        let response = self.transport.send(request)?;

        if !matches!(response.status, 200 | 201) {
            return Err(SharepointError::UploadFailed {
                url,
                status: response.status,
                body: response.body,
            });
        }

        Ok(UploadReport {
            segments: 1,
            bytes: size,
            attempts: 1,
            item: serde_json::from_str(&response.body).ok(),
        })
    }
}

fn remote_name(file: &Path) -> Result<String> {
    file.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            SharepointError::Configuration(format!(
                "{} has no usable file name",
                file.display()
            ))
        })
}
