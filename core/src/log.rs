//! Debug logging hook for REST methods, backed by `tracing`.
//!
//! Events go to the `restmethod` target with the method's log tag attached
//! as a field. Without an installed subscriber they are dropped.

use std::fmt::Display;

use crate::http::Request;

pub const TARGET: &str = "restmethod";

pub fn debug(tag: &str, message: impl Display) {
    tracing::debug!(target: TARGET, tag = %tag, "{message}");
}

pub(crate) fn log_request(tag: &str, request: &Request) {
    debug(tag, format_args!("Request: {} {}", request.method, request.uri));
}

pub(crate) fn log_response(tag: &str, status: u16, body: &str) {
    debug(tag, format_args!("Response: status={status}, body={body}"));
}
