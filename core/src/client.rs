//! Endpoint client for the judge backend.
//!
//! # Design
//! `InformaticsClient` wraps a [`Session`] and gives each backend endpoint a
//! method that dispatches the request and normalizes the response with the
//! endpoint's schema. `Err` means the call could not be made (transport
//! failure, not logged in, bad file); everything the backend answered comes
//! back as a [`TypedResult`].

use std::fmt::Display;
use std::path::Path;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, Multipart, RequestBody};
use crate::normalize::{normalize, TypedResult};
use crate::schema::{Ack, Run, RunSource, RunsList, SourceRun, TestReport, TestsList};
use crate::session::Session;
use crate::transport::{Transport, UreqTransport};
use crate::user::User;

/// Query parameters of the run filter. `-1` and `0` mean "any".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunsFilter {
    pub from_timestamp: i64,
    pub to_timestamp: i64,
    pub group_id: i64,
    pub lang_id: i64,
    pub status_id: i64,
    pub statement_id: i64,
    pub count: u32,
    pub with_comment: String,
    pub page: u32,
}

impl Default for RunsFilter {
    fn default() -> Self {
        Self {
            from_timestamp: -1,
            to_timestamp: -1,
            group_id: 0,
            lang_id: -1,
            status_id: -1,
            statement_id: 0,
            count: 20,
            with_comment: String::new(),
            page: 1,
        }
    }
}

pub struct InformaticsClient<T: Transport = UreqTransport> {
    session: Session<T>,
}

impl InformaticsClient<UreqTransport> {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, UreqTransport::new())
    }
}

impl<T: Transport> InformaticsClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            session: Session::new(config, transport),
        }
    }

    pub fn session(&self) -> &Session<T> {
        &self.session
    }

    pub fn login(&self, username: &str, password: &str) -> Result<bool, ApiError> {
        self.session.login(username, password)
    }

    pub fn user(&self) -> Option<User> {
        self.session.current_user()
    }

    /// Submit a source file for judging.
    ///
    /// Never retried: a timeout may still have produced a submission.
    pub fn submit_problem(
        &self,
        problem_id: u64,
        path: impl AsRef<Path>,
        lang_id: i64,
    ) -> Result<TypedResult<serde_json::Value>, ApiError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map_or_else(|| "source".to_string(), |n| n.to_string_lossy().into_owned());
        self.submit_source(problem_id, &file_name, bytes, lang_id)
    }

    /// Submit in-memory source code as `file_name`.
    pub fn submit_source(
        &self,
        problem_id: u64,
        file_name: &str,
        source: Vec<u8>,
        lang_id: i64,
    ) -> Result<TypedResult<serde_json::Value>, ApiError> {
        let body = Multipart::new()
            .text("lang_id", lang_id)
            .file("file", file_name, source);
        let response = self.session.dispatch(
            "submit",
            &[&problem_id],
            HttpMethod::Post,
            Some(RequestBody::Multipart(body)),
        )?;
        Ok(normalize(&response, &Ack))
    }

    /// Runs of `user_id` on a problem.
    pub fn get_runs(
        &self,
        problem_id: u64,
        user_id: u64,
        filter: &RunsFilter,
    ) -> Result<TypedResult<Vec<Run>>, ApiError> {
        let params: [&dyn Display; 11] = [
            &problem_id,
            &user_id,
            &filter.from_timestamp,
            &filter.to_timestamp,
            &filter.group_id,
            &filter.lang_id,
            &filter.status_id,
            &filter.statement_id,
            &filter.count,
            &filter.with_comment,
            &filter.page,
        ];
        let response = self.session.get("filter", &params)?;
        Ok(normalize(&response, &RunsList))
    }

    /// Runs of the logged-in user on a problem.
    pub fn get_self_runs(
        &self,
        problem_id: u64,
        filter: &RunsFilter,
    ) -> Result<TypedResult<Vec<Run>>, ApiError> {
        let user = self.session.require_user()?;
        self.get_runs(problem_id, user.id, filter)
    }

    pub fn get_run_source(&self, run_id: u64) -> Result<TypedResult<RunSource>, ApiError> {
        let response = self.session.get("source", &[&run_id])?;
        Ok(normalize(&response, &SourceRun))
    }

    /// Per-test verdicts of a run.
    pub fn get_protocol(&self, run_id: u64) -> Result<TypedResult<Vec<TestReport>>, ApiError> {
        let response = self.session.get("protocol", &[&run_id])?;
        Ok(normalize(&response, &TestsList))
    }
}
