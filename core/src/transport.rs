//! Network dispatch for requests built by REST methods.
//!
//! # Design
//! `Transport` is the single seam between the pipeline and the network. The
//! default implementation drives a blocking `ureq` agent configured so that
//! 4xx/5xx statuses come back as `Response` values; only failures to complete
//! the exchange surface as `TransportError`.

use std::time::Duration;

use serde::Deserialize;
use ureq::http;

use crate::error::TransportError;
use crate::http::{Headers, HttpMethod, Request, Response};

const TIMEOUT_ENV: &str = "RESTMETHOD_TIMEOUT_SECS";
const USER_AGENT_ENV: &str = "RESTMETHOD_USER_AGENT";

/// Sends a request and returns the service's response.
pub trait Transport {
    fn execute(&self, request: &Request) -> Result<Response, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &Request) -> Result<Response, TransportError> {
        (**self).execute(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn execute(&self, request: &Request) -> Result<Response, TransportError> {
        (**self).execute(request)
    }
}

/// Settings for `UreqTransport`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Upper bound for a whole exchange, in seconds.
    pub timeout_secs: Option<u64>,
    /// Sent as `User-Agent` unless the request sets its own.
    pub user_agent: Option<String>,
}

impl TransportConfig {
    /// Read `RESTMETHOD_TIMEOUT_SECS` and `RESTMETHOD_USER_AGENT`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let timeout_secs = lookup(TIMEOUT_ENV).and_then(|raw| match raw.trim().parse() {
            Ok(secs) => Some(secs),
            Err(err) => {
                tracing::warn!(target: crate::log::TARGET, value = %raw, error = %err, "ignoring {TIMEOUT_ENV}");
                None
            }
        });
        let user_agent = lookup(USER_AGENT_ENV).filter(|ua| !ua.trim().is_empty());
        Self {
            timeout_secs,
            user_agent,
        }
    }
}

/// Blocking transport backed by a `ureq::Agent`.
pub struct UreqTransport {
    agent: ureq::Agent,
    user_agent: Option<String>,
}

impl UreqTransport {
    pub fn new(config: TransportConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(config.timeout_secs.map(Duration::from_secs))
            .build()
            .new_agent();
        Self {
            agent,
            user_agent: config.user_agent,
        }
    }

    fn to_http_request(&self, request: &Request) -> Result<http::request::Builder, TransportError> {
        let mut builder = http::Request::builder()
            .method(request.method.as_str())
            .uri(target_uri(request)?);
        for (name, values) in &request.headers {
            for value in values {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        if let Some(user_agent) = &self.user_agent {
            if request.header("user-agent").is_none() {
                builder = builder.header("User-Agent", user_agent.as_str());
            }
        }
        Ok(builder)
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(TransportConfig::default())
    }
}

impl std::fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqTransport")
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &Request) -> Result<Response, TransportError> {
        let builder = self.to_http_request(request)?;
        let result = if carries_body(request.method) {
            let http_request = builder
                .body(request.body.as_slice())
                .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
            self.agent.run(http_request)
        } else {
            let http_request = builder
                .body(())
                .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
            self.agent.run(http_request)
        };
        let mut response = result.map_err(|e| TransportError::Connection(e.to_string()))?;

        let status = response.status().as_u16();
        let mut headers = Headers::new();
        for (name, value) in response.headers() {
            headers
                .entry(name.as_str().to_string())
                .or_default()
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }
        let body = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| TransportError::Body(e.to_string()))?;

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

fn carries_body(method: HttpMethod) -> bool {
    matches!(method, HttpMethod::Post | HttpMethod::Put)
}

/// URI to put on the wire. Methods that cannot carry a body send their
/// form-encoded body as extra query parameters instead; such a body must be
/// valid UTF-8.
fn target_uri(request: &Request) -> Result<String, TransportError> {
    if carries_body(request.method) || request.body.is_empty() {
        return Ok(request.uri.to_string());
    }
    let extra = std::str::from_utf8(&request.body).map_err(|e| {
        TransportError::InvalidRequest(format!(
            "{} body cannot move into the query string: {e}",
            request.method
        ))
    })?;
    let extra = extra.trim_start_matches('&');
    if extra.is_empty() {
        return Ok(request.uri.to_string());
    }
    let mut uri = request.uri.clone();
    let query = match uri.query() {
        Some(existing) if !existing.is_empty() => format!("{existing}&{extra}"),
        _ => extra.to_string(),
    };
    uri.set_query(Some(&query));
    Ok(uri.to_string())
}
