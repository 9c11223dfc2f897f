//! Request dispatcher for the JSON backend.

use std::fmt::Display;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, RequestBody};
use crate::routes::{self, Origin};
use crate::session::Session;
use crate::transport::Transport;

impl<T: Transport> Session<T> {
    /// Send one request to a backend route and return the raw response.
    ///
    /// Fails with `Unauthorized` before touching the network when nobody is
    /// logged in. Any status code is returned as data; only a failed
    /// round-trip is an error. Nothing is retried.
    pub fn dispatch(
        &self,
        route: &str,
        params: &[&dyn Display],
        method: HttpMethod,
        body: Option<RequestBody>,
    ) -> Result<HttpResponse, ApiError> {
        self.require_user()?;

        let url = routes::resolve(&self.config, route, Origin::Backend, params)?;
        // The body travels with either method; the transport sends it as is.
        let request = HttpRequest {
            method,
            body,
            ..HttpRequest::get(url, self.config.timeout)
        }
        .with_header("accept", "application/json");

        tracing::debug!(route, method = ?request.method, url = %request.url, "dispatching");
        let response = self.transport.execute(request)?;
        tracing::debug!(route, status = response.status, bytes = response.body.len(), "response");
        Ok(response)
    }

    /// `dispatch` for a GET without a body.
    pub fn get(&self, route: &str, params: &[&dyn Display]) -> Result<HttpResponse, ApiError> {
        self.dispatch(route, params, HttpMethod::Get, None)
    }
}
