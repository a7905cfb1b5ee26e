//! Upload session negotiation.
//!
//! `POST {graph}/drives/{drive}/items/root:/{path}:/createUploadSession`
//! returns a pre-authorised `uploadUrl` that accepts the file's segments
//! for a limited time.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde_json::json;
use tracing::info;

use super::error::{Result, SharepointError};
use super::transport::{GraphRequest, GraphTransport, Method, RequestBody};

/// Characters escaped in a drive path segment. `/` never reaches this set
/// because paths are encoded segment by segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'?')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// A negotiated upload session.
#[derive(Debug, Clone)]
pub struct UploadSession {
    pub upload_url: String,
    /// `expirationDateTime` as reported by Graph, if any.
    pub expires: Option<String>,
}

/// `file_name`, or `folder_name/file_name` when a folder is given.
pub fn target_path(file_name: &str, folder_name: Option<&str>) -> String {
    match folder_name.map(|f| f.trim_matches('/')).filter(|f| !f.is_empty()) {
        Some(folder) => format!("{}/{}", folder, file_name),
        None => file_name.to_string(),
    }
}

/// Drive-relative item URL, e.g. `.../drives/{id}/items/root:/reports/x.json:`.
pub fn item_url(graph_base: &str, drive_id: &str, path: &str) -> String {
    let encoded = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/");
    format!(
        "{}/drives/{}/items/root:/{}:",
        graph_base.trim_end_matches('/'),
        drive_id,
        encoded
    )
}

/// Create an upload session for `path` in `drive_id`.
///
/// An existing item at the same path is replaced.
pub fn create_upload_session(
    transport: &dyn GraphTransport,
    graph_base: &str,
    token: &str,
    drive_id: &str,
    path: &str,
) -> Result<UploadSession> {
    let url = format!("{}/createUploadSession", item_url(graph_base, drive_id, path));
    let body = json!({
        "item": {
            "@microsoft.graph.conflictBehavior": "replace"
        }
    });

    let request = GraphRequest::new(Method::Post, &url)
        .bearer(token)
        .body(RequestBody::Json(body));
    let response = transport.send(request)?;

    if response.status != 200 {
        return Err(SharepointError::SessionCreation {
            url,
            status: response.status,
            body: response.body,
        });
    }

    let json = response.json(&url)?;
    let upload_url = json
        .get("uploadUrl")
        .and_then(|v| v.as_str())
        .ok_or_else(|| SharepointError::InvalidResponse {
            url: url.clone(),
            message: "upload session response missing uploadUrl".to_string(),
        })?
        .to_string();
    let expires = json
        .get("expirationDateTime")
        .and_then(|v| v.as_str())
        .map(str::to_string);

    info!("Upload session for {} created: {}", path, upload_url);

    Ok(UploadSession {
        upload_url,
        expires,
    })
}
