//! HTTP exchange execution.
//!
//! [`Transport`] is the seam to the HTTP client. [`ExchangeExecutor`] turns a
//! [`TransferContext`] into a request, attaches the per-request headers and
//! hands response bodies to caller-supplied callbacks. Every failure is
//! returned as a [`TransportError`]; nothing is retried.

use log::{debug, trace};
use ocs_status::TransportError;
use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;

use crate::transfer::{Method, TransferContext};

/// Largest error body kept for translation.
pub const MAX_ERROR_BODY: u64 = 64 * 1024;

/// Request body handed to a [`Transport`].
pub enum RequestBody {
    /// No body.
    Empty,
    /// A fully buffered body.
    Bytes(Vec<u8>),
    /// A body streamed from a reader until end-of-stream.
    Stream(Box<dyn Read + Send>),
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestBody::Empty => f.write_str("Empty"),
            RequestBody::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            RequestBody::Stream(_) => f.write_str("Stream"),
        }
    }
}

/// A fully resolved HTTP request.
#[derive(Debug)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl HttpRequest {
    /// First header value with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Response status and streaming body.
pub struct HttpResponse {
    pub status: u16,
    pub body: Box<dyn Read + Send>,
}

impl HttpResponse {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Read at most [`MAX_ERROR_BODY`] bytes of the body as text.
    pub fn error_body(&mut self) -> String {
        let mut text = Vec::new();
        // The body is diagnostic only, so a read failure just shortens it.
        let _ = (&mut self.body).take(MAX_ERROR_BODY).read_to_end(&mut text);
        String::from_utf8_lossy(&text).into_owned()
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Executes HTTP requests. Implementations must be usable from any thread.
pub trait Transport: Send + Sync {
    /// Send `request` and return the response once its headers have arrived.
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

/// Builds requests from transfer contexts and runs them on a [`Transport`].
#[derive(Clone)]
pub struct ExchangeExecutor {
    transport: Arc<dyn Transport>,
}

impl ExchangeExecutor {
    /// Create an executor over `transport`.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Build the request for `ctx`. Headers are derived from `ctx` alone.
    pub fn prepare(&self, ctx: &TransferContext, body: RequestBody) -> HttpRequest {
        let mut headers = Vec::with_capacity(ctx.headers.len() + 3);
        headers.push((
            "Authorization".to_string(),
            ctx.credentials.basic_auth_header(),
        ));
        if matches!(body, RequestBody::Stream(_)) || ctx.method == Method::Get {
            headers.push(("Connection".to_string(), "keep-alive".to_string()));
        }
        if let Some(content_type) = &ctx.content_type {
            headers.push(("Content-Type".to_string(), content_type.clone()));
        }
        headers.extend(ctx.headers.iter().cloned());

        HttpRequest {
            method: ctx.method,
            url: ctx.resolved_locator(),
            headers,
            body,
        }
    }

    /// Send the request for `ctx` and return the raw response, whatever its status.
    pub fn send(
        &self,
        ctx: &TransferContext,
        body: RequestBody,
    ) -> Result<HttpResponse, TransportError> {
        let request = self.prepare(ctx, body);
        trace!("{} {} as '{}'", request.method, request.url, ctx.credentials.username());
        self.transport.execute(request)
    }

    /// Streaming exchange: non-2xx statuses fail, 2xx bodies go to `on_response`.
    pub fn execute<F>(
        &self,
        ctx: &TransferContext,
        body: RequestBody,
        on_response: F,
    ) -> Result<(), TransportError>
    where
        F: FnOnce(&mut HttpResponse) -> io::Result<()>,
    {
        let mut response = self.send(ctx, body)?;
        debug!("{} {} -> {}", ctx.method, ctx.locator, response.status);
        if !response.is_success() {
            return Err(TransportError::Status {
                status: response.status,
                body: response.error_body(),
            });
        }
        on_response(&mut response).map_err(TransportError::Io)
    }

    /// Buffered exchange: returns status and body without judging the status.
    pub fn fetch(
        &self,
        ctx: &TransferContext,
        body: RequestBody,
    ) -> Result<(u16, Vec<u8>), TransportError> {
        let mut response = self.send(ctx, body)?;
        let mut data = Vec::new();
        response.body.read_to_end(&mut data)?;
        debug!(
            "{} {} -> {} ({} bytes)",
            ctx.method,
            ctx.locator,
            response.status,
            data.len()
        );
        Ok((response.status, data))
    }
}

impl fmt::Debug for ExchangeExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeExecutor").finish_non_exhaustive()
    }
}

#[cfg(feature = "reqwest")]
pub use self::reqwest_transport::ReqwestTransport;

#[cfg(feature = "reqwest")]
mod reqwest_transport {
    use super::{HttpRequest, HttpResponse, RequestBody, Transport};
    use crate::config::TransportConfig;
    use crate::transfer::Method;
    use ocs_status::TransportError;
    use reqwest::blocking::{Body, Client};

    /// [`Transport`] backed by a blocking `reqwest` client.
    #[derive(Debug, Clone)]
    pub struct ReqwestTransport {
        client: Client,
    }

    impl ReqwestTransport {
        /// Build a client honouring the configured timeouts.
        pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
            let client = Client::builder()
                .connect_timeout(config.connect_timeout())
                .timeout(config.read_timeout())
                .user_agent(config.user_agent.clone())
                .build()
                .map_err(|e| TransportError::Client(e.to_string()))?;
            Ok(Self { client })
        }

        /// Wrap an existing client.
        pub fn with_client(client: Client) -> Self {
            Self { client }
        }

        fn convert_method(method: Method) -> reqwest::Method {
            match method {
                Method::Get => reqwest::Method::GET,
                Method::Put => reqwest::Method::PUT,
                Method::Post => reqwest::Method::POST,
                Method::Delete => reqwest::Method::DELETE,
            }
        }
    }

    impl Transport for ReqwestTransport {
        fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            let mut builder = self
                .client
                .request(Self::convert_method(request.method), &request.url);
            for (name, value) in request.headers {
                builder = builder.header(name, value);
            }
            builder = match request.body {
                RequestBody::Empty => builder,
                RequestBody::Bytes(bytes) => builder.body(bytes),
                RequestBody::Stream(reader) => builder.body(Body::new(reader)),
            };

            let response = builder.send().map_err(|e| {
                if e.is_connect() {
                    TransportError::Client(format!("connection failed: {}", e))
                } else if e.is_timeout() {
                    TransportError::Client(format!("request timed out: {}", e))
                } else {
                    TransportError::Client(e.to_string())
                }
            })?;

            Ok(HttpResponse {
                status: response.status().as_u16(),
                body: Box::new(response),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::Credentials;
    use std::io::Cursor;
    use std::sync::Mutex;

    struct Canned {
        status: u16,
        body: &'static [u8],
        seen: Mutex<Vec<(Method, String, Vec<(String, String)>)>>,
    }

    impl Transport for Canned {
        fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.seen
                .lock()
                .unwrap()
                .push((request.method, request.url, request.headers));
            Ok(HttpResponse {
                status: self.status,
                body: Box::new(Cursor::new(self.body)),
            })
        }
    }

    fn canned(status: u16, body: &'static [u8]) -> Arc<Canned> {
        Arc::new(Canned {
            status,
            body,
            seen: Mutex::new(Vec::new()),
        })
    }

    #[test]
    fn test_prepare_attaches_headers() {
        let executor = ExchangeExecutor::new(canned(200, b""));
        let ctx = TransferContext::put("http://host/dav/a.txt", Credentials::new("u", "p"))
            .with_content_type("text/plain")
            .with_header("OC-Checksum", "SHA1:abc");

        let request = executor.prepare(&ctx, RequestBody::Stream(Box::new(Cursor::new(Vec::new()))));
        assert_eq!(request.header("authorization"), Some("Basic dTpw"));
        assert_eq!(request.header("Connection"), Some("keep-alive"));
        assert_eq!(request.header("Content-Type"), Some("text/plain"));
        assert_eq!(request.header("OC-Checksum"), Some("SHA1:abc"));
        assert_eq!(request.url, "http://host/dav/a.txt");
    }

    #[test]
    fn test_buffered_requests_skip_keep_alive() {
        let executor = ExchangeExecutor::new(canned(200, b""));
        let ctx = TransferContext::new(Method::Post, "http://host/ocs", Credentials::new("u", "p"));
        let request = executor.prepare(&ctx, RequestBody::Bytes(b"a=b".to_vec()));
        assert_eq!(request.header("Connection"), None);
    }

    #[test]
    fn test_execute_hands_body_to_callback() {
        let transport = canned(200, b"payload");
        let executor = ExchangeExecutor::new(transport.clone());
        let ctx = TransferContext::get("http://host/a", Credentials::new("u", "p"));

        let mut received = Vec::new();
        executor
            .execute(&ctx, RequestBody::Empty, |response| {
                response.body.read_to_end(&mut received).map(|_| ())
            })
            .unwrap();
        assert_eq!(received, b"payload");
        assert_eq!(transport.seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_execute_captures_error_status() {
        let executor = ExchangeExecutor::new(canned(507, b"quota"));
        let ctx = TransferContext::put("http://host/a", Credentials::new("u", "p"));

        let err = executor
            .execute(&ctx, RequestBody::Empty, |_| panic!("callback must not run"))
            .unwrap_err();
        assert!(matches!(err, TransportError::Status { status: 507, ref body } if body == "quota"));
    }

    #[test]
    fn test_callback_error_becomes_io_error() {
        let executor = ExchangeExecutor::new(canned(200, b"x"));
        let ctx = TransferContext::get("http://host/a", Credentials::new("u", "p"));
        let err = executor
            .execute(&ctx, RequestBody::Empty, |_| {
                Err(io::Error::new(io::ErrorKind::Other, "disk full"))
            })
            .unwrap_err();
        assert!(matches!(err, TransportError::Io(_)));
    }

    #[test]
    fn test_fetch_keeps_status() {
        let executor = ExchangeExecutor::new(canned(500, b"{}"));
        let ctx = TransferContext::new(Method::Delete, "http://host/x", Credentials::new("u", "p"));
        let (status, body) = executor.fetch(&ctx, RequestBody::Empty).unwrap();
        assert_eq!(status, 500);
        assert_eq!(body, b"{}");
    }
}
