//! Key-value encoding for query strings and form bodies.

use std::fmt::{Display, Write};

/// Join `params` as `key=value` pairs separated by `&`.
///
/// Pairs appear in the iteration order of `params`. Keys and values are
/// emitted verbatim; callers encode anything containing reserved characters.
pub fn build_query_string<I, K, V>(params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: Display,
    V: Display,
{
    let mut query = String::new();
    for (key, value) in params {
        if !query.is_empty() {
            query.push('&');
        }
        let _ = write!(query, "{key}={value}");
    }
    query
}

/// Percent-encode `value` for use inside a form body or query string.
pub fn form_encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
