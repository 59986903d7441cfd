//! The value every REST method execution produces.

/// Internal status for a response that could not be decoded or parsed.
///
/// HTTP defines server statuses only up to 505, so a service never sends it.
pub const UNPARSEABLE_RESPONSE: u16 = 506;

/// Outcome of executing a REST method.
///
/// A result is built through one of three constructors, which keeps the
/// resource present only for non-error statuses and the message non-empty
/// only for the unparseable sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestMethodResult<T> {
    status: u16,
    status_msg: String,
    resource: Option<T>,
}

impl<T> RestMethodResult<T> {
    pub fn success(status: u16, resource: T) -> Self {
        Self {
            status,
            status_msg: String::new(),
            resource: Some(resource),
        }
    }

    /// Status of 400 or above reported by the service itself.
    pub fn service_error(status: u16) -> Self {
        Self {
            status,
            status_msg: String::new(),
            resource: None,
        }
    }

    /// Local decode or parse failure, reported as `UNPARSEABLE_RESPONSE`.
    pub fn unparseable(message: impl Into<String>) -> Self {
        let mut status_msg = message.into();
        if status_msg.is_empty() {
            status_msg.push_str("unparseable response");
        }
        Self {
            status: UNPARSEABLE_RESPONSE,
            status_msg,
            resource: None,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn status_msg(&self) -> &str {
        &self.status_msg
    }

    pub fn resource(&self) -> Option<&T> {
        self.resource.as_ref()
    }

    pub fn into_resource(self) -> Option<T> {
        self.resource
    }

    pub fn is_success(&self) -> bool {
        self.resource.is_some()
    }
}
