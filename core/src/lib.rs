//! Client for the informatics.msk.ru judge.
//!
//! # Overview
//! Logs in through the site's HTML login form, then talks to the JSON backend
//! behind it. The backend is undocumented and inconsistent, so every response
//! goes through one normalizer that reconciles its quirks into an
//! [`Envelope`] before a per-endpoint [`Schema`] turns the payload into
//! records.
//!
//! # Design
//! - `Session` owns the transport (and with it the cookie jar) and the
//!   logged-in identity. `dispatch` refuses to send anything without one.
//! - Requests and responses are plain data (`http.rs`); the `Transport` trait
//!   is the only place that performs I/O, so everything above it is tested
//!   with a scripted transport.
//! - Backend failures are data (`success` / `reason`), never `Err`. `Err` is
//!   reserved for calls that could not be made or payloads of the wrong shape.
//! - Everything the site's HTML structure dictates lives in `scrape.rs`.

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod normalize;
pub mod routes;
pub mod schema;
pub mod scrape;
pub mod session;
pub mod transport;
pub mod user;

pub use client::{InformaticsClient, RunsFilter};
pub use config::ClientConfig;
pub use error::{ApiError, SchemaMismatch, TransportError, TransportErrorKind};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Multipart, RequestBody};
pub use normalize::{normalize, Envelope, Payload, TypedResult};
pub use routes::Origin;
pub use schema::{Ack, Run, RunSource, RunsList, Schema, SourceRun, TestReport, TestsList};
pub use session::Session;
pub use transport::{Transport, UreqTransport};
pub use user::{User, UserKind};
