//! OAuth2 client-credentials token for the Graph API.
//!
//! The token is fetched lazily on first use and cached in [`AuthState`].
//! It is fetched again only when it is about to expire
//! (see [`REFRESH_MARGIN_SECS`]). A token the server rejects anyway
//! surfaces as an HTTP 401 on whatever request used it.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use super::error::{Result, SharepointError};
use super::transport::{GraphRequest, GraphTransport, Method, RequestBody};

pub const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// A cached token is replaced once it is this close to expiry.
pub const REFRESH_MARGIN_SECS: i64 = 60;

/// Lifetime assumed when the token response omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// App registration used for the client-credentials grant.
#[derive(Clone)]
pub struct Credentials {
    pub tenant: String,
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn new(
        tenant: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            tenant: tenant.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("tenant", &self.tenant)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

/// Bearer token plus its nominal expiry.
#[derive(Clone)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(REFRESH_MARGIN_SECS) < self.expires_at
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    Authenticated(AccessToken),
}

/// Owns the credentials and the cached token of one connector.
#[derive(Debug)]
pub struct TokenProvider {
    credentials: Credentials,
    token_url: String,
    state: AuthState,
}

impl TokenProvider {
    pub fn new(credentials: Credentials, login_base: &str) -> Self {
        let token_url = format!(
            "{}/{}.onmicrosoft.com/oauth2/v2.0/token",
            login_base.trim_end_matches('/'),
            credentials.tenant
        );
        Self {
            credentials,
            token_url,
            state: AuthState::Unauthenticated,
        }
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// Return the cached token, fetching a new one if there is none or it
    /// is about to expire.
    pub fn ensure_token(&mut self, transport: &dyn GraphTransport) -> Result<String> {
        if let AuthState::Authenticated(token) = &self.state {
            if token.is_fresh_at(Utc::now()) {
                return Ok(token.value.clone());
            }
            debug!("cached access token expires at {}, refreshing", token.expires_at);
        }

        let token = self.fetch_token(transport)?;
        let value = token.value.clone();
        self.state = AuthState::Authenticated(token);
        Ok(value)
    }

    fn fetch_token(&self, transport: &dyn GraphTransport) -> Result<AccessToken> {
        debug!("requesting access token from {}", self.token_url);

        let form = vec![
            ("grant_type", "client_credentials"),
            ("scope", GRAPH_SCOPE),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
        ];
        let request = GraphRequest::new(Method::Post, &self.token_url).body(RequestBody::Form(form));
        let response = transport.send(request)?;

        if response.status != 200 {
            return Err(SharepointError::Authentication {
                url: self.token_url.clone(),
                status: response.status,
                body: response.body,
            });
        }

        let invalid = |message: String| SharepointError::InvalidResponse {
            url: self.token_url.clone(),
            message,
        };

        let json = response.json(&self.token_url)?;
        let value = json
            .get("access_token")
            .and_then(|v| v.as_str())
            .ok_or_else(|| invalid("token response missing access_token".to_string()))?
            .to_string();

        let expires_in = match json.get("expires_in") {
            Some(raw) => raw
                .as_i64()
                .or_else(|| raw.as_str().and_then(|s| s.trim().parse().ok()))
                .ok_or_else(|| invalid(format!("token response has invalid expires_in {}", raw)))?,
            None => {
                warn!(
                    "token response has no expires_in, assuming {} s",
                    DEFAULT_EXPIRES_IN_SECS
                );
                DEFAULT_EXPIRES_IN_SECS
            }
        };
        let expires_at = Duration::try_seconds(expires_in)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| invalid(format!("token expires_in {} is out of range", expires_in)))?;

        Ok(AccessToken { value, expires_at })
    }

    #[cfg(test)]
    pub(crate) fn set_state(&mut self, state: AuthState) {
        self.state = state;
    }
}
