//! Typed REST method execution against a single web service.
//!
//! # Overview
//! A `RestMethod` describes one endpoint: how to build its `Request` and how
//! to parse the decoded response body into a typed resource. `Executor` runs
//! it through a fixed pipeline (build, authorize with the current session,
//! dispatch through a `Transport`, build the result) and classifies every
//! local failure into a uniform `RestMethodResult`.
//!
//! # Design
//! - Execution is synchronous and blocking; run it on a background thread if
//!   the caller must not block.
//! - Decode and parse failures become status 506 (`UNPARSEABLE_RESPONSE`);
//!   connection failures come back as `TransportError`.
//! - Authorization is fail-open: no credential means the request goes out
//!   unchanged.
//! - `reddit` bundles the login, profile and comment endpoints.

pub mod auth;
pub mod error;
pub mod http;
pub mod log;
pub mod method;
pub mod query;
pub mod reddit;
pub mod result;
pub mod transport;

pub use auth::{Credential, CredentialProvider, MemoryCredentialStore, NoCredentials};
pub use error::{ApiError, TransportError};
pub use http::{Headers, HttpMethod, Request, Response};
pub use method::{Executor, RestMethod};
pub use query::build_query_string;
pub use reddit::{Comment, Login, Profile, RedditApi};
pub use result::{RestMethodResult, UNPARSEABLE_RESPONSE};
pub use transport::{Transport, TransportConfig, UreqTransport};
