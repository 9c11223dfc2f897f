//! The seam between the client and an HTTP implementation.
//!
//! # Design
//! Everything above this module works on `HttpRequest` / `HttpResponse`
//! values. A `Transport` executes one request and returns the response as
//! data, whatever its status code; only failures of the round-trip itself are
//! errors. `UreqTransport` is the production implementation and owns the
//! cookie jar that carries the login session.

use std::io::Read;
use std::time::Duration;

use ureq::typestate::WithBody;

use crate::error::{TransportError, TransportErrorKind};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, RequestBody};

/// Executes HTTP requests. Implementations must keep cookies between calls.
pub trait Transport: Send + Sync {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Blocking transport backed by a shared `ureq::Agent` with a cookie store.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UreqTransport {
    /// Status codes are returned as data, not as `Err`, so the normalizer
    /// can interpret them.
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
            timeout,
        } = request;

        let result = match (method, body) {
            (HttpMethod::Get, None) => prepare(self.agent.get(&url), &headers, timeout).call(),
            (HttpMethod::Get, Some(body)) => send(
                prepare(self.agent.get(&url).force_send_body(), &headers, timeout),
                Some(body),
            ),
            (HttpMethod::Post, body) => {
                send(prepare(self.agent.post(&url), &headers, timeout), body)
            }
        };

        let mut response = result.map_err(classify)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
            .collect();

        let mut bytes = Vec::new();
        response
            .body_mut()
            .as_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| TransportError::new(TransportErrorKind::Other, e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

fn prepare<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
    timeout: Duration,
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name, value);
    }
    builder.config().timeout_global(Some(timeout)).build()
}

fn send(
    builder: ureq::RequestBuilder<WithBody>,
    body: Option<RequestBody>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => {
            let encoded = body.encode();
            builder
                .content_type(&encoded.content_type)
                .send(&encoded.bytes[..])
        }
        None => builder.send_empty(),
    }
}

fn classify(err: ureq::Error) -> TransportError {
    let kind = match &err {
        ureq::Error::Timeout(_) => TransportErrorKind::Timeout,
        ureq::Error::HostNotFound | ureq::Error::ConnectionFailed => TransportErrorKind::Connect,
        ureq::Error::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => {
            TransportErrorKind::Timeout
        }
        ureq::Error::Io(io) if io.kind() == std::io::ErrorKind::ConnectionRefused => {
            TransportErrorKind::Connect
        }
        _ => TransportErrorKind::Other,
    };
    TransportError::new(kind, err.to_string())
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted transport for unit tests.

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use super::*;

    pub const LOGIN_PAGE: &str = r#"<form action="/login/index.php" method="post" id="login">
        <input id="anchor" type="hidden" name="anchor" value="">
        <input type="hidden" name="logintoken" value="tok123">
        </form>"#;

    /// A login form carrying `token`.
    pub fn login_page(token: &str) -> String {
        LOGIN_PAGE.replace("tok123", token)
    }

    pub const LANDING_PAGE: &str = r#"<div id="page-footer"><div>
        <div class="logininfo">Вы зашли под именем
        <a href="http://localhost/user/profile.php?id=42">Test</a></div></div></div>"#;

    /// Replays queued responses in order and records every request it sees.
    #[derive(Default)]
    pub struct StubTransport {
        responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
        pub requests: Mutex<Vec<HttpRequest>>,
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl StubTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(self, status: u16, body: &str) -> Self {
            self.responses
                .lock()
                .push_back(Ok(HttpResponse::new(status, body)));
            self
        }

        pub fn fail(self, kind: TransportErrorKind) -> Self {
            self.responses
                .lock()
                .push_back(Err(TransportError::new(kind, "stubbed failure")));
            self
        }

        /// Hold every call for `delay` after recording it.
        pub fn slow(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// Script a successful login handshake for user 42.
        pub fn logged_in() -> Self {
            Self::new()
                .respond(200, LOGIN_PAGE)
                .respond(200, LANDING_PAGE)
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Transport for StubTransport {
        fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().push(request);
            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }
            self.responses.lock().pop_front().unwrap_or_else(|| {
                Err(TransportError::new(
                    TransportErrorKind::Other,
                    "no scripted response",
                ))
            })
        }
    }
}
