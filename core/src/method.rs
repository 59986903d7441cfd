//! The REST method capability and the pipeline that executes it.
//!
//! # Design
//! Each endpoint implements `RestMethod`: it builds its `Request`, parses the
//! decoded body into its resource, and names its log tag and credential
//! context. `Executor` owns the collaborators (credential provider and
//! transport) and runs every method through the same fixed steps:
//! build, authorize, dispatch, build result.
//!
//! Local failures never escape `execute`; they become a result with the 506
//! sentinel. A `TransportError` is not a local failure and is returned as
//! `Err` for the caller to handle.

use crate::auth::{authorize, CredentialProvider};
use crate::error::{ApiError, TransportError};
use crate::http::{Headers, Request, Response};
use crate::log;
use crate::result::RestMethodResult;
use crate::transport::{Transport, UreqTransport};

pub const DEFAULT_ENCODING: &str = "UTF-8";

/// One typed call against the service.
pub trait RestMethod {
    type Resource;

    /// Tag attached to every log line this method emits.
    fn log_tag(&self) -> &str;

    /// Name of the credential context this method authenticates as.
    fn context(&self) -> &str;

    fn build_request(&self) -> Result<Request, ApiError>;

    fn parse_response_body(&self, body: &str) -> Result<Self::Resource, ApiError>;

    /// Endpoints that must not present a session (login, registration)
    /// return `false`.
    fn requires_authorization(&self) -> bool {
        true
    }

    /// Turn the transport's response into a result. Override for custom
    /// inspection such as reading response headers.
    fn build_result(&self, response: Response) -> RestMethodResult<Self::Resource> {
        default_build_result(self, response)
    }
}

/// Decode the body, log it, and parse it. Decode and parse failures yield
/// the 506 sentinel whatever the transport status; a parsed body under an
/// error status still carries no resource.
pub fn default_build_result<M>(method: &M, response: Response) -> RestMethodResult<M::Resource>
where
    M: RestMethod + ?Sized,
{
    let encoding = character_encoding(&response.headers);
    let body = match decode_body(response.body, encoding) {
        Ok(body) => body,
        Err(err) => return RestMethodResult::unparseable(err.to_string()),
    };
    log::log_response(method.log_tag(), response.status, &body);

    match method.parse_response_body(&body) {
        Ok(_) if response.status >= 400 => RestMethodResult::service_error(response.status),
        Ok(resource) => RestMethodResult::success(response.status, resource),
        Err(err) => RestMethodResult::unparseable(err.to_string()),
    }
}

// TODO: honor the charset parameter of Content-Type once a non-UTF-8
// service needs it.
fn character_encoding(_headers: &Headers) -> &'static str {
    DEFAULT_ENCODING
}

fn decode_body(body: Vec<u8>, encoding: &'static str) -> Result<String, ApiError> {
    String::from_utf8(body).map_err(|err| ApiError::Decode {
        encoding,
        reason: err.utf8_error().to_string(),
    })
}

/// Runs REST methods against a credential provider and a transport.
///
/// The transport is not shared across threads by the executor; callers that
/// share one executor must serialize calls or supply a thread-safe transport.
#[derive(Debug)]
pub struct Executor<C, T = UreqTransport> {
    credentials: C,
    transport: T,
}

impl<C: CredentialProvider> Executor<C> {
    /// Executor using the default `UreqTransport`.
    pub fn new(credentials: C) -> Self {
        Self::with_transport(credentials, UreqTransport::default())
    }
}

impl<C: CredentialProvider, T: Transport> Executor<C, T> {
    pub fn with_transport(credentials: C, transport: T) -> Self {
        Self {
            credentials,
            transport,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn credentials(&self) -> &C {
        &self.credentials
    }

    pub fn execute<M>(&self, method: &M) -> Result<RestMethodResult<M::Resource>, TransportError>
    where
        M: RestMethod + ?Sized,
    {
        let mut request = match method.build_request() {
            Ok(request) => request,
            Err(err) => {
                log::debug(method.log_tag(), format_args!("Request not built: {err}"));
                return Ok(RestMethodResult::unparseable(err.to_string()));
            }
        };

        if method.requires_authorization() {
            if let Some(credential) = self.credentials.current_credential(method.context()) {
                authorize(&mut request, &credential);
            }
        }

        log::log_request(method.log_tag(), &request);
        let response = self.transport.execute(&request)?;
        Ok(method.build_result(response))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde::Deserialize;
    use url::Url;

    use super::*;
    use crate::auth::{Credential, MemoryCredentialStore, NoCredentials};
    use crate::http::HttpMethod;
    use crate::result::UNPARSEABLE_RESPONSE;

    /// Transport that records every dispatched request and replays one
    /// canned response.
    struct RecordingTransport {
        response: Response,
        sent: Mutex<Vec<Request>>,
    }

    impl RecordingTransport {
        fn new(response: Response) -> Self {
            Self {
                response,
                sent: Mutex::new(Vec::new()),
            }
        }

        fn last(&self) -> Request {
            self.sent.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl Transport for RecordingTransport {
        fn execute(&self, request: &Request) -> Result<Response, TransportError> {
            self.sent.lock().unwrap().push(request.clone());
            Ok(self.response.clone())
        }
    }

    struct FailingTransport;

    impl Transport for FailingTransport {
        fn execute(&self, _request: &Request) -> Result<Response, TransportError> {
            Err(TransportError::Connection("connection refused".to_string()))
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
    struct Item {
        id: u32,
    }

    struct GetItem {
        body: &'static str,
        auth: bool,
    }

    impl GetItem {
        fn new() -> Self {
            Self { body: "", auth: true }
        }
    }

    impl RestMethod for GetItem {
        type Resource = Item;

        fn log_tag(&self) -> &str {
            "GetItem"
        }

        fn context(&self) -> &str {
            "default"
        }

        fn build_request(&self) -> Result<Request, ApiError> {
            let uri = Url::parse("https://api.example.com/item/1")?;
            Ok(Request::new(HttpMethod::Get, uri).with_body(self.body))
        }

        fn parse_response_body(&self, body: &str) -> Result<Item, ApiError> {
            Ok(serde_json::from_str(body)?)
        }

        fn requires_authorization(&self) -> bool {
            self.auth
        }
    }

    struct Unbuildable;

    impl RestMethod for Unbuildable {
        type Resource = ();

        fn log_tag(&self) -> &str {
            "Unbuildable"
        }

        fn context(&self) -> &str {
            "default"
        }

        fn build_request(&self) -> Result<Request, ApiError> {
            Err(ApiError::Serialization("missing field".to_string()))
        }

        fn parse_response_body(&self, _body: &str) -> Result<(), ApiError> {
            Ok(())
        }
    }

    fn logged_in() -> MemoryCredentialStore {
        let store = MemoryCredentialStore::new();
        store.store("default", Credential::new("tok", "hash"));
        store
    }

    #[test]
    fn successful_response_yields_resource() {
        let executor = Executor::with_transport(
            NoCredentials,
            RecordingTransport::new(Response::new(200, r#"{"id":1}"#)),
        );
        let result = executor.execute(&GetItem::new()).unwrap();
        assert_eq!(result.status(), 200);
        assert_eq!(result.status_msg(), "");
        assert_eq!(result.resource(), Some(&Item { id: 1 }));
    }

    #[test]
    fn unparseable_body_yields_sentinel() {
        let executor = Executor::with_transport(
            NoCredentials,
            RecordingTransport::new(Response::new(200, "not-json")),
        );
        let result = executor.execute(&GetItem::new()).unwrap();
        let expected = ApiError::from(serde_json::from_str::<Item>("not-json").unwrap_err());
        assert_eq!(result.status(), UNPARSEABLE_RESPONSE);
        assert_eq!(result.status_msg(), expected.to_string());
        assert!(result.resource().is_none());
    }

    #[test]
    fn invalid_utf8_yields_sentinel() {
        let executor = Executor::with_transport(
            NoCredentials,
            RecordingTransport::new(Response::new(200, vec![0xff, 0xfe, b'{'])),
        );
        let result = executor.execute(&GetItem::new()).unwrap();
        assert_eq!(result.status(), UNPARSEABLE_RESPONSE);
        assert!(result.status_msg().starts_with("response body is not valid UTF-8"));
    }

    #[test]
    fn service_error_keeps_status_and_drops_resource() {
        let executor = Executor::with_transport(
            NoCredentials,
            RecordingTransport::new(Response::new(404, r#"{"id":1}"#)),
        );
        let result = executor.execute(&GetItem::new()).unwrap();
        assert_eq!(result.status(), 404);
        assert_eq!(result.status_msg(), "");
        assert!(result.resource().is_none());
    }

    #[test]
    fn unparseable_error_body_yields_sentinel() {
        for status in [404, 500] {
            let executor = Executor::with_transport(
                NoCredentials,
                RecordingTransport::new(Response::new(status, "<html>down</html>")),
            );
            let result = executor.execute(&GetItem::new()).unwrap();
            assert_eq!(result.status(), UNPARSEABLE_RESPONSE, "status {status}");
            assert!(result.status_msg().starts_with("deserialization failed: "));
            assert!(result.resource().is_none());
        }
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn request_and_response_are_logged_with_tag() {
        let store = MemoryCredentialStore::new();
        store.store("default", Credential::new("s3cr3t-session", "s3cr3t-modhash"));
        let executor = Executor::with_transport(
            store,
            RecordingTransport::new(Response::new(200, r#"{"id":1}"#)),
        );
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            executor.execute(&GetItem::new()).unwrap();
        });

        let output = logs.contents();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2, "{output}");
        assert!(lines[0].contains("restmethod: Request: GET https://api.example.com/item/1"));
        assert!(lines[1].contains(r#"restmethod: Response: status=200, body={"id":1}"#));
        for line in &lines {
            assert!(line.contains("tag=GetItem"), "{line}");
        }
        assert!(!output.contains("s3cr3t"), "{output}");
    }

    #[test]
    fn credential_is_injected_when_required() {
        let executor = Executor::with_transport(
            logged_in(),
            RecordingTransport::new(Response::new(200, r#"{"id":1}"#)),
        );
        let method = GetItem {
            body: "text=hi",
            auth: true,
        };
        executor.execute(&method).unwrap();

        let sent = executor.transport().last();
        assert_eq!(sent.header("Cookie").unwrap(), ["reddit_session=tok"]);
        assert_eq!(sent.body, b"text=hi&uh=hash");
    }

    #[test]
    fn opting_out_leaves_request_untouched() {
        let executor = Executor::with_transport(
            logged_in(),
            RecordingTransport::new(Response::new(200, r#"{"id":1}"#)),
        );
        let method = GetItem {
            body: "text=hi",
            auth: false,
        };
        executor.execute(&method).unwrap();

        let sent = executor.transport().last();
        assert_eq!(sent, method.build_request().unwrap());
    }

    #[test]
    fn missing_credential_is_fail_open() {
        let executor = Executor::with_transport(
            MemoryCredentialStore::new(),
            RecordingTransport::new(Response::new(200, r#"{"id":1}"#)),
        );
        let method = GetItem::new();
        let result = executor.execute(&method).unwrap();

        assert_eq!(result.status(), 200);
        assert_eq!(executor.transport().last(), method.build_request().unwrap());
    }

    #[test]
    fn credential_is_applied_once_per_execution() {
        let executor = Executor::with_transport(
            logged_in(),
            RecordingTransport::new(Response::new(200, r#"{"id":1}"#)),
        );
        let method = GetItem::new();
        let first = executor.execute(&method).unwrap();
        let second = executor.execute(&method).unwrap();
        assert_eq!(first, second);

        let sent = executor.transport().sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        for req in sent.iter() {
            assert_eq!(req.body, b"&uh=hash");
            assert_eq!(req.header("Cookie").unwrap().len(), 1);
        }
    }

    #[test]
    fn builder_failure_skips_dispatch() {
        let executor = Executor::with_transport(
            logged_in(),
            RecordingTransport::new(Response::new(200, "")),
        );
        let result = executor.execute(&Unbuildable).unwrap();
        assert_eq!(result.status(), UNPARSEABLE_RESPONSE);
        assert_eq!(result.status_msg(), "serialization failed: missing field");
        assert!(executor.transport().sent.lock().unwrap().is_empty());
    }

    #[test]
    fn transport_failure_propagates() {
        let executor = Executor::with_transport(NoCredentials, FailingTransport);
        let err = executor.execute(&GetItem::new()).unwrap_err();
        assert!(matches!(err, TransportError::Connection(_)));
    }

    #[test]
    fn build_result_can_be_overridden() {
        struct HeaderOnly;

        impl RestMethod for HeaderOnly {
            type Resource = String;

            fn log_tag(&self) -> &str {
                "HeaderOnly"
            }

            fn context(&self) -> &str {
                "default"
            }

            fn build_request(&self) -> Result<Request, ApiError> {
                Ok(Request::new(
                    HttpMethod::Get,
                    Url::parse("https://api.example.com/")?,
                ))
            }

            fn parse_response_body(&self, _body: &str) -> Result<String, ApiError> {
                Err(ApiError::Deserialization("unused".to_string()))
            }

            fn build_result(&self, response: Response) -> RestMethodResult<String> {
                match response.header("x-ratelimit-remaining") {
                    Some(values) => RestMethodResult::success(response.status, values.join(",")),
                    None => RestMethodResult::unparseable("missing rate limit header"),
                }
            }
        }

        let mut response = Response::new(200, "");
        response
            .headers
            .insert("X-Ratelimit-Remaining".to_string(), vec!["59".to_string()]);
        let executor = Executor::with_transport(NoCredentials, RecordingTransport::new(response));
        let result = executor.execute(&HeaderOnly).unwrap();
        assert_eq!(result.resource().map(String::as_str), Some("59"));
    }
}
