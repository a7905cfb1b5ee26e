//! Recording [`GraphTransport`] for unit tests.
//!
//! Requests are answered from a scripted queue first. When the queue is
//! empty and the fake was built with [`FakeTransport::graph`], it behaves
//! like a minimal Graph service: token endpoint, upload session creation
//! and segment PUTs, with per-offset failure injection.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use serde_json::Value;

use super::error::{Result, SharepointError};
use super::transport::{GraphRequest, GraphTransport, HttpResponse, Method, RequestBody};

pub const SESSION_URL: &str = "https://upload.test/session/abc";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: String,
    pub bearer: Option<String>,
    pub headers: Vec<(String, String)>,
    pub form: Option<Vec<(String, String)>>,
    pub json: Option<Value>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Status(u16),
    Reset,
}

#[derive(Default)]
pub struct FakeTransport {
    scripted: RefCell<VecDeque<Result<HttpResponse>>>,
    requests: RefCell<Vec<RecordedRequest>>,
    simulate_graph: bool,
    failures: RefCell<HashMap<u64, (Failure, u32)>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph() -> Self {
        Self {
            simulate_graph: true,
            ..Self::default()
        }
    }

    pub fn push(&self, response: HttpResponse) {
        self.scripted.borrow_mut().push_back(Ok(response));
    }

    pub fn push_err(&self, err: SharepointError) {
        self.scripted.borrow_mut().push_back(Err(err));
    }

    /// Make the next `times` PUTs starting at `offset` fail.
    pub fn fail_segment(&self, offset: u64, failure: Failure, times: u32) {
        self.failures.borrow_mut().insert(offset, (failure, times));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.borrow().clone()
    }

    pub fn puts(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == Method::Put)
            .collect()
    }

    pub fn token_requests(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.url.ends_with("/oauth2/v2.0/token"))
            .count()
    }

    fn simulate(&self, request: &RecordedRequest) -> Result<HttpResponse> {
        if request.url.ends_with("/oauth2/v2.0/token") {
            return Ok(HttpResponse::new(
                200,
                r#"{"token_type":"Bearer","access_token":"tok-1","expires_in":3599}"#,
            ));
        }
        if request.url.ends_with(":/createUploadSession") {
            return Ok(HttpResponse::new(
                200,
                format!(
                    r#"{{"uploadUrl":"{}","expirationDateTime":"2030-01-01T00:00:00Z"}}"#,
                    SESSION_URL
                ),
            ));
        }
        if request.url.ends_with(":/content") {
            return Ok(HttpResponse::new(
                201,
                r#"{"id":"01SMALL","name":"small.json","size":5}"#,
            ));
        }
        if request.method == Method::Put && request.url == SESSION_URL {
            let range = request
                .header("Content-Range")
                .expect("segment PUT without Content-Range");
            let (start, end, total) = parse_content_range(range);

            if let Some((failure, remaining)) = self.failures.borrow_mut().get_mut(&start) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return match failure {
                        Failure::Status(status) => {
                            Ok(HttpResponse::new(*status, "segment rejected"))
                        }
                        Failure::Reset => Err(SharepointError::Transport {
                            url: request.url.clone(),
                            message: "connection reset by peer".to_string(),
                        }),
                    };
                }
            }

            if end + 1 == total {
                return Ok(HttpResponse::new(
                    201,
                    format!(r#"{{"id":"01ITEM","name":"export.json","size":{}}}"#, total),
                ));
            }
            return Ok(HttpResponse::new(
                202,
                format!(r#"{{"nextExpectedRanges":["{}-"]}}"#, end + 1),
            ));
        }
        panic!("unexpected request: {:?} {}", request.method, request.url);
    }
}

/// Parse `bytes {start}-{end}/{total}`.
pub fn parse_content_range(value: &str) -> (u64, u64, u64) {
    let rest = value.strip_prefix("bytes ").expect("range unit");
    let (range, total) = rest.split_once('/').expect("total");
    let (start, end) = range.split_once('-').expect("range");
    (
        start.parse().expect("start"),
        end.parse().expect("end"),
        total.parse().expect("total"),
    )
}

impl GraphTransport for FakeTransport {
    fn send(&self, request: GraphRequest<'_>) -> Result<HttpResponse> {
        let (form, json, body) = match &request.body {
            RequestBody::Empty => (None, None, Vec::new()),
            RequestBody::Form(fields) => (
                Some(
                    fields
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                ),
                None,
                Vec::new(),
            ),
            RequestBody::Json(value) => (None, Some(value.clone()), Vec::new()),
            RequestBody::Bytes(bytes) => (None, None, bytes.to_vec()),
        };
        let recorded = RecordedRequest {
            method: request.method,
            url: request.url.to_string(),
            bearer: request.bearer.map(str::to_string),
            headers: request
                .headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            form,
            json,
            body,
        };
        self.requests.borrow_mut().push(recorded.clone());

        if let Some(scripted) = self.scripted.borrow_mut().pop_front() {
            return scripted;
        }
        if self.simulate_graph {
            return self.simulate(&recorded);
        }
        panic!("no scripted response for {:?} {}", recorded.method, recorded.url);
    }
}
