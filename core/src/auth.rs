//! Session credentials and their injection into outgoing requests.
//!
//! # Design
//! A credential is fetched once per execution, written into the request and
//! dropped. Authorization is fail-open: with no credential available the
//! request goes out exactly as its builder produced it.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::http::Request;

pub const COOKIE_HEADER: &str = "Cookie";
const SESSION_COOKIE: &str = "reddit_session";
const MODHASH_PARAM: &str = "uh";

/// Session token plus the secondary hash that accompanies state-changing calls.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    session_token: String,
    secondary_hash: String,
}

impl Credential {
    pub fn new(session_token: impl Into<String>, secondary_hash: impl Into<String>) -> Self {
        Self {
            session_token: session_token.into(),
            secondary_hash: secondary_hash.into(),
        }
    }

    pub fn session_token(&self) -> &str {
        &self.session_token
    }

    pub fn secondary_hash(&self) -> &str {
        &self.secondary_hash
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("session_token", &"<redacted>")
            .field("secondary_hash", &"<redacted>")
            .finish()
    }
}

/// Source of the credential for a named context.
pub trait CredentialProvider {
    fn current_credential(&self, context: &str) -> Option<Credential>;
}

impl<P: CredentialProvider + ?Sized> CredentialProvider for Arc<P> {
    fn current_credential(&self, context: &str) -> Option<Credential> {
        (**self).current_credential(context)
    }
}

impl<P: CredentialProvider + ?Sized> CredentialProvider for &P {
    fn current_credential(&self, context: &str) -> Option<Credential> {
        (**self).current_credential(context)
    }
}

/// Provider for callers that never authenticate.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCredentials;

impl CredentialProvider for NoCredentials {
    fn current_credential(&self, _context: &str) -> Option<Credential> {
        None
    }
}

/// In-memory credentials keyed by context name.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    credentials: RwLock<HashMap<String, Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the credential for `context`.
    pub fn store(&self, context: &str, credential: Credential) {
        let mut credentials = self
            .credentials
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        credentials.insert(context.to_string(), credential);
    }

    pub fn clear(&self, context: &str) -> Option<Credential> {
        let mut credentials = self
            .credentials
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        credentials.remove(context)
    }
}

impl CredentialProvider for MemoryCredentialStore {
    fn current_credential(&self, context: &str) -> Option<Credential> {
        let credentials = self
            .credentials
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        credentials.get(context).cloned()
    }
}

/// Attach `credential` to `request`: a session cookie header value and the
/// secondary hash appended to the end of the body.
pub fn authorize(request: &mut Request, credential: &Credential) {
    request.add_header(
        COOKIE_HEADER,
        [format!("{SESSION_COOKIE}={}", credential.session_token)],
    );

    request
        .body
        .extend_from_slice(format!("&{MODHASH_PARAM}={}", credential.secondary_hash).as_bytes());
}
