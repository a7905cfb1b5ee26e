//! Segmented upload into an upload session.
//!
//! The file is cut into fixed-size segments that are PUT to the session URL
//! strictly in order, each carrying `Content-Range: bytes {start}-{end}/{total}`.
//! Graph rejects concurrent or out-of-order segments for one session, so
//! there is no parallelism here.
//!
//! # Segment size
//!
//! Every segment except the last must be a multiple of
//! [`SEGMENT_ALIGNMENT`] (320 KiB) and no request may exceed 60 MiB.
//! The default, [`DEFAULT_SEGMENT_SIZE`], is 100 × 320 KiB.
//!
//! # Failures
//!
//! A segment that fails (no response, or any status other than 200, 201
//! or 202) is sent again once, unchanged. A second failure aborts the
//! upload; later segments are not attempted.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use super::error::{Result, SharepointError};
use super::transport::{GraphRequest, GraphTransport, Method, RequestBody};
use crate::retry::RetryPolicy;

pub const SEGMENT_ALIGNMENT: u64 = 327_680;
pub const DEFAULT_SEGMENT_SIZE: u64 = SEGMENT_ALIGNMENT * 100;
pub const MAX_SEGMENT_SIZE: u64 = SEGMENT_ALIGNMENT * 192;

/// A contiguous byte range `[start, end)` of the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// 1-based position in the upload sequence.
    pub index: usize,
    pub start: u64,
    pub end: u64,
}

impl Segment {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// `bytes {start}-{last}/{total}` with an inclusive last byte.
    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end - 1, total)
    }
}

/// Split `[0, total)` into consecutive segments of `segment_size` bytes.
///
/// The last segment holds the remainder. `total == 0` yields nothing.
pub fn plan_segments(total: u64, segment_size: u64) -> impl Iterator<Item = Segment> {
    let step = segment_size.max(1);
    (0..total)
        .step_by(step as usize)
        .enumerate()
        .map(move |(i, start)| Segment {
            index: i + 1,
            start,
            end: (start + step).min(total),
        })
}

/// Check a segment size against the session protocol limits.
pub fn validate_segment_size(size: u64) -> Result<u64> {
    if size == 0 || size % SEGMENT_ALIGNMENT != 0 {
        return Err(SharepointError::Configuration(format!(
            "segment size {} must be a non-zero multiple of {}",
            size, SEGMENT_ALIGNMENT
        )));
    }
    if size > MAX_SEGMENT_SIZE {
        return Err(SharepointError::Configuration(format!(
            "segment size {} exceeds the maximum of {}",
            size, MAX_SEGMENT_SIZE
        )));
    }
    Ok(size)
}

/// Graph's answer to one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentAck {
    /// 202: more segments expected.
    Accepted,
    /// 200/201: the file is complete; body is the drive item.
    Completed(String),
}

/// Drive item returned when the last segment lands.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DriveItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Outcome of a finished upload.
#[derive(Debug, Clone, Default)]
pub struct UploadReport {
    pub segments: usize,
    pub bytes: u64,
    /// PUT requests issued, including retries.
    pub attempts: usize,
    pub item: Option<DriveItem>,
}

/// PUT one segment.
pub fn put_segment(
    transport: &dyn GraphTransport,
    session_url: &str,
    token: &str,
    bytes: &[u8],
    offset: u64,
    total_size: u64,
) -> Result<SegmentAck> {
    let segment = Segment {
        index: 0,
        start: offset,
        end: offset + bytes.len() as u64,
    };
    let range = segment.content_range(total_size);

    let request = GraphRequest::new(Method::Put, session_url)
        .bearer(token)
        .header("Content-Length", bytes.len().to_string())
        .header("Content-Range", range.clone())
        .body(RequestBody::Bytes(bytes));
    let response = transport.send(request)?;

    match response.status {
        202 => Ok(SegmentAck::Accepted),
        200 | 201 => Ok(SegmentAck::Completed(response.body)),
        status => Err(SharepointError::SegmentUpload {
            range,
            status,
            body: response.body,
        }),
    }
}

/// Uploads a file's segments in order with a bounded retry per segment.
#[derive(Debug, Clone)]
pub struct SegmentUploader {
    segment_size: u64,
    retry: RetryPolicy,
}

impl Default for SegmentUploader {
    fn default() -> Self {
        Self {
            segment_size: DEFAULT_SEGMENT_SIZE,
            retry: RetryPolicy::retry_once(),
        }
    }
}

impl SegmentUploader {
    pub fn new(segment_size: u64, retry: RetryPolicy) -> Result<Self> {
        Ok(Self {
            segment_size: validate_segment_size(segment_size)?,
            retry,
        })
    }

    pub fn segment_size(&self) -> u64 {
        self.segment_size
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Read `path` segment by segment and PUT each one to `session_url`.
    pub fn upload_file(
        &self,
        transport: &dyn GraphTransport,
        session_url: &str,
        token: &str,
        path: &Path,
    ) -> Result<UploadReport> {
        let io_err = |source| SharepointError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut file = File::open(path).map_err(io_err)?;
        let total = file.metadata().map_err(io_err)?.len();
        let count = total.div_ceil(self.segment_size);

        info!(
            "Uploading {} ({} bytes) in {} segment(s)",
            path.display(),
            total,
            count
        );

        let mut report = UploadReport::default();
        let mut buf = Vec::new();

        for segment in plan_segments(total, self.segment_size) {
            buf.resize(segment.len() as usize, 0);
            file.read_exact(&mut buf).map_err(io_err)?;

            debug!(
                "segment {}/{}: {}",
                segment.index,
                count,
                segment.content_range(total)
            );

            let what = format!("segment {}/{}", segment.index, count);
            let ack = self.retry.run(&what, |_| {
                report.attempts += 1;
                put_segment(transport, session_url, token, &buf, segment.start, total)
            })?;

            report.segments += 1;
            report.bytes += segment.len();

            if let SegmentAck::Completed(body) = ack {
                report.item = serde_json::from_str(&body).ok();
            }
        }

        Ok(report)
    }
}
