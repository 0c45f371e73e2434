//! Authenticated transport to the Supabase REST and auth endpoints.
//!
//! Every request carries the service `apikey` header plus an
//! `Authorization: Bearer` header. The bearer is the caller's access token
//! when one is supplied, so the data service applies row-level security for
//! that user; otherwise it is the service credential and the call runs with
//! full privileges.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode, Url};
use secrecy::{ExposeSecret, Secret};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::error::{DataError, DataResult};

pub const REST_PREFIX: &str = "rest/v1";
pub const AUTH_PREFIX: &str = "auth/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const APIKEY_HEADER: &str = "apikey";
const PREFER_HEADER: &str = "Prefer";
const RETURN_REPRESENTATION: &str = "return=representation";
const OBJECT_MEDIA_TYPE: &str = "application/vnd.pgrst.object+json";
const JSON_MEDIA_TYPE: &str = "application/json";

/// PostgREST error code for "single object requested, row count was not 1".
const SINGLE_ROW_MISMATCH: &str = "PGRST116";

#[derive(Debug, Clone)]
pub struct SupabaseSettings {
    pub url: String,
    pub service_key: Secret<String>,
    pub timeout: Duration,
}

/// End-user access token, borrowed for the duration of one call.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

/// One HTTP exchange with the data service, described independently of the
/// transport.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRequest {
    pub method: Method,
    /// Path below the base endpoint, e.g. `rest/v1/items`.
    pub path: String,
    pub params: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Ask the service to echo written rows back.
    pub return_representation: bool,
    /// Ask for a single JSON object instead of an array.
    pub single_object: bool,
}

impl RemoteRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: Vec::new(),
            body: None,
            return_representation: false,
            single_object: false,
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn params(mut self, params: impl IntoIterator<Item = (String, String)>) -> Self {
        self.params.extend(params);
        self
    }

    pub fn json_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn return_representation(mut self, enabled: bool) -> Self {
        self.return_representation = enabled;
        self
    }

    pub fn single_object(mut self, enabled: bool) -> Self {
        self.single_object = enabled;
        self
    }

    /// Value of a query parameter, for inspection in tests and logs.
    pub fn param_value(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct RemoteResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl RemoteResponse {
    pub fn is_empty(&self) -> bool {
        self.body.iter().all(u8::is_ascii_whitespace)
    }

    /// Decodes the body into `T`. A mismatch is a [`DataError::Decode`],
    /// never a remote rejection.
    pub fn json<T: DeserializeOwned>(&self) -> DataResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Error body shapes returned by the auth and REST endpoints.
#[derive(Debug, Default, Deserialize)]
struct RemoteErrorBody {
    error: Option<String>,
    error_description: Option<String>,
    message: Option<String>,
    msg: Option<String>,
    code: Option<Value>,
    details: Option<String>,
}

impl RemoteErrorBody {
    fn message(&self) -> Option<String> {
        if let Some(error) = &self.error {
            return Some(match &self.error_description {
                Some(description) => format!("{}: {}", error, description),
                None => error.clone(),
            });
        }

        let message = self.message.as_ref().or(self.msg.as_ref())?;
        Some(match &self.details {
            Some(details) => format!("{} ({})", message, details),
            None => message.clone(),
        })
    }

    fn is_single_row_mismatch(&self) -> bool {
        matches!(&self.code, Some(Value::String(code)) if code == SINGLE_ROW_MISMATCH)
    }

    fn matched_no_rows(&self) -> bool {
        self.details
            .as_deref()
            .map(|d| d.contains(" 0 rows"))
            .unwrap_or(false)
    }
}

/// Shared handle to the data service. Cloning is cheap and shares the
/// connection pool.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    base_url: String,
    service_key: Secret<String>,
}

impl SupabaseClient {
    pub fn new(settings: SupabaseSettings) -> DataResult<Self> {
        let base_url = settings.url.trim().trim_end_matches('/').to_string();
        let parsed = Url::parse(&base_url)
            .map_err(|e| DataError::invalid(format!("invalid data service URL: {}", e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(DataError::invalid(format!(
                "data service URL must be http(s), got '{}'",
                parsed.scheme()
            )));
        }
        if settings.service_key.expose_secret().trim().is_empty() {
            return Err(DataError::invalid("service credential must not be empty"));
        }
        if settings.timeout.is_zero() {
            return Err(DataError::invalid("request timeout must be positive"));
        }

        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                service_key: settings.service_key,
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub(crate) fn service_key(&self) -> &str {
        self.inner.service_key.expose_secret()
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    /// Absolute URL for `path`, with `params` appended when there are any.
    pub fn url_for(&self, path: &str, params: &[(String, String)]) -> DataResult<Url> {
        let raw = format!("{}/{}", self.inner.base_url, path.trim_start_matches('/'));
        let url = if params.is_empty() {
            Url::parse(&raw)
        } else {
            Url::parse_with_params(&raw, params)
        };
        url.map_err(|e| DataError::invalid(format!("invalid request path '{}': {}", path, e)))
    }

    /// The bearer sent for a call: the caller's token when present and
    /// non-empty, else the service credential.
    pub fn bearer_for<'a>(&'a self, caller: Option<&'a AccessToken>) -> &'a str {
        match caller {
            Some(token) if !token.is_empty() => token.as_str(),
            _ => self.service_key(),
        }
    }

    /// Sends one authenticated request and returns the raw response, or the
    /// classified failure.
    pub async fn execute(
        &self,
        request: RemoteRequest,
        caller: Option<&AccessToken>,
    ) -> DataResult<RemoteResponse> {
        let url = self.url_for(&request.path, &request.params)?;
        let user_scoped = caller.map(|t| !t.is_empty()).unwrap_or(false);

        let mut builder = self
            .http()
            .request(request.method.clone(), url)
            .header(APIKEY_HEADER, self.service_key())
            .bearer_auth(self.bearer_for(caller));

        if request.method != Method::GET {
            builder = builder.header(CONTENT_TYPE, JSON_MEDIA_TYPE);
        }
        if request.return_representation {
            builder = builder.header(PREFER_HEADER, RETURN_REPRESENTATION);
        }
        if request.single_object {
            builder = builder.header(ACCEPT, OBJECT_MEDIA_TYPE);
        }
        if let Some(body) = &request.body {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::warn!(
                method = %request.method,
                path = %request.path,
                timeout = e.is_timeout(),
                error = %e,
                "Data service request failed"
            );
            DataError::Transport(e)
        })?;

        let status = response.status();
        let body = response.bytes().await?.to_vec();

        tracing::debug!(
            method = %request.method,
            path = %request.path,
            status = status.as_u16(),
            user_scoped,
            "Data service call completed"
        );

        if status.as_u16() >= 400 {
            return Err(classify_failure(status, &body, request.single_object));
        }

        Ok(RemoteResponse { status, body })
    }
}

fn classify_failure(status: StatusCode, body: &[u8], single_object: bool) -> DataError {
    let parsed: Option<RemoteErrorBody> = serde_json::from_slice(body).ok();

    if single_object && status == StatusCode::NOT_ACCEPTABLE {
        if let Some(err) = parsed.as_ref().filter(|e| e.is_single_row_mismatch()) {
            return if err.matched_no_rows() {
                DataError::NotFound
            } else {
                DataError::Ambiguous
            };
        }
    }

    let message = parsed
        .as_ref()
        .and_then(RemoteErrorBody::message)
        .unwrap_or_else(|| {
            let raw = String::from_utf8_lossy(body).trim().to_string();
            if raw.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                raw
            }
        });

    tracing::warn!(status = status.as_u16(), message = %message, "Data service rejected request");

    DataError::Remote {
        status: status.as_u16(),
        message,
    }
}
