//! Bundled REST methods for the reddit API.
//!
//! # Design
//! `RedditApi` holds the base URL and the credential context, and hands out
//! one `RestMethod` value per call. Login opts out of authorization so that a
//! stale session is never presented; the returned `Login` converts into the
//! `Credential` later calls are authorized with.
//!
//! Form bodies are assembled with `build_query_string` over form-encoded
//! values.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::auth::Credential;
use crate::error::ApiError;
use crate::http::{HttpMethod, Request};
use crate::method::RestMethod;
use crate::query::{build_query_string, form_encode};

pub const DEFAULT_BASE_URL: &str = "https://www.reddit.com";
pub const DEFAULT_CONTEXT: &str = "default";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Session returned by a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Login {
    pub modhash: String,
    pub cookie: String,
}

impl From<Login> for Credential {
    fn from(login: Login) -> Self {
        Credential::new(login.cookie, login.modhash)
    }
}

/// The authenticated account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(default)]
    pub link_karma: i64,
    #[serde(default)]
    pub comment_karma: i64,
}

/// A comment the service accepted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Comment {
    pub id: String,
}

/// Factory for reddit REST methods bound to one base URL and context.
#[derive(Debug, Clone)]
pub struct RedditApi {
    base_url: String,
    context: String,
}

impl RedditApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            context: DEFAULT_CONTEXT.to_string(),
        }
    }

    /// Authenticate as the named credential context instead of the default.
    pub fn with_context(mut self, context: &str) -> Self {
        self.context = context.to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn login(&self, user: &str, passwd: &str) -> LoginMethod {
        LoginMethod {
            api: self.clone(),
            user: user.to_string(),
            passwd: passwd.to_string(),
        }
    }

    pub fn me(&self) -> ProfileMethod {
        ProfileMethod { api: self.clone() }
    }

    pub fn comment(&self, thing_id: &str, text: &str) -> CommentMethod {
        CommentMethod {
            api: self.clone(),
            thing_id: thing_id.to_string(),
            text: text.to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(Url::parse(&format!("{}{path}", self.base_url))?)
    }

    fn form_post(&self, path: &str, fields: &[(&str, &str)]) -> Result<Request, ApiError> {
        let body = build_query_string(fields.iter().map(|(k, v)| (k, form_encode(v))));
        Ok(Request::new(HttpMethod::Post, self.endpoint(path)?)
            .with_header("Content-Type", FORM_CONTENT_TYPE)
            .with_body(body))
    }
}

impl Default for RedditApi {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// `POST /api/login`.
#[derive(Clone)]
pub struct LoginMethod {
    api: RedditApi,
    user: String,
    passwd: String,
}

impl std::fmt::Debug for LoginMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginMethod")
            .field("api", &self.api)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

impl RestMethod for LoginMethod {
    type Resource = Login;

    fn log_tag(&self) -> &str {
        "LoginMethod"
    }

    fn context(&self) -> &str {
        &self.api.context
    }

    fn build_request(&self) -> Result<Request, ApiError> {
        self.api.form_post(
            "/api/login",
            &[
                ("user", self.user.as_str()),
                ("passwd", self.passwd.as_str()),
                ("api_type", "json"),
            ],
        )
    }

    fn parse_response_body(&self, body: &str) -> Result<Login, ApiError> {
        parse_json_envelope(body)
    }

    fn requires_authorization(&self) -> bool {
        false
    }
}

/// `GET /api/me.json`.
#[derive(Debug, Clone)]
pub struct ProfileMethod {
    api: RedditApi,
}

impl RestMethod for ProfileMethod {
    type Resource = Profile;

    fn log_tag(&self) -> &str {
        "ProfileMethod"
    }

    fn context(&self) -> &str {
        &self.api.context
    }

    fn build_request(&self) -> Result<Request, ApiError> {
        Ok(Request::new(HttpMethod::Get, self.api.endpoint("/api/me.json")?))
    }

    fn parse_response_body(&self, body: &str) -> Result<Profile, ApiError> {
        parse_thing(body, "t2")
    }
}

/// `POST /api/comment`.
#[derive(Debug, Clone)]
pub struct CommentMethod {
    api: RedditApi,
    thing_id: String,
    text: String,
}

impl RestMethod for CommentMethod {
    type Resource = Comment;

    fn log_tag(&self) -> &str {
        "CommentMethod"
    }

    fn context(&self) -> &str {
        &self.api.context
    }

    fn build_request(&self) -> Result<Request, ApiError> {
        self.api.form_post(
            "/api/comment",
            &[
                ("thing_id", self.thing_id.as_str()),
                ("text", self.text.as_str()),
                ("api_type", "json"),
            ],
        )
    }

    fn parse_response_body(&self, body: &str) -> Result<Comment, ApiError> {
        parse_json_envelope(body)
    }
}

#[derive(Deserialize)]
struct Envelope<D> {
    json: EnvelopeBody<D>,
}

#[derive(Deserialize)]
struct EnvelopeBody<D> {
    #[serde(default)]
    errors: Vec<Value>,
    data: Option<D>,
}

#[derive(Deserialize)]
struct Thing<D> {
    kind: String,
    data: D,
}

/// Unwrap `{"json":{"errors":[...],"data":...}}`, rejecting reported errors.
fn parse_json_envelope<D: DeserializeOwned>(body: &str) -> Result<D, ApiError> {
    let envelope: Envelope<D> = serde_json::from_str(body)?;
    if !envelope.json.errors.is_empty() {
        let reasons: Vec<String> = envelope.json.errors.iter().map(describe_error).collect();
        return Err(ApiError::Rejected(reasons.join("; ")));
    }
    envelope
        .json
        .data
        .ok_or_else(|| ApiError::Deserialization("missing field `data`".to_string()))
}

fn parse_thing<D: DeserializeOwned>(body: &str, kind: &str) -> Result<D, ApiError> {
    let thing: Thing<D> = serde_json::from_str(body)?;
    if thing.kind != kind {
        return Err(ApiError::Deserialization(format!(
            "expected kind `{kind}`, got `{}`",
            thing.kind
        )));
    }
    Ok(thing.data)
}

/// Errors arrive as `[code, message, field]` triples.
fn describe_error(error: &Value) -> String {
    match error {
        Value::Array(parts) => {
            let parts: Vec<&str> = parts.iter().take(2).filter_map(Value::as_str).collect();
            parts.join(": ")
        }
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
