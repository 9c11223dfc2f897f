//! Response normalizer: raw backend responses into a uniform envelope.
//!
//! # Design
//! The backend mixes conventions across endpoints: some answer with
//! `result` instead of `status`, some omit the status entirely and rely on
//! the HTTP code, some return HTML error pages. All of that is reconciled
//! here, once, so schemas only ever see a clean JSON object.
//!
//! Normalization never fails. Undecodable bodies become a synthetic error
//! envelope and backend errors are reported through `success` / `reason`.

use serde_json::{Map, Value};

use crate::error::{ApiError, SchemaMismatch};
use crate::http::HttpResponse;
use crate::schema::Schema;

pub const STATUS_KEY: &str = "status";
pub const ERROR_KEY: &str = "error";
pub const SUCCESS: &str = "success";
pub const PARSE_FAILURE: &str = "Failed to parse";
const UNKNOWN_ERROR: &str = "Unknown error";

/// Keys some endpoints use in place of a canonical one.
/// Applied in order; an alias overrides the canonical key when both exist.
pub struct AliasRule {
    pub alias: &'static str,
    pub canonical: &'static str,
}

pub static ALIAS_RULES: &[AliasRule] = &[AliasRule {
    alias: "result",
    canonical: STATUS_KEY,
}];

/// One backend response, reconciled.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub success: bool,
    /// `"Success"` on success, the backend's error text otherwise.
    pub reason: String,
    pub status_code: u16,
    /// The reconciled JSON body; always carries a `status` key.
    pub body: Map<String, Value>,
}

impl Envelope {
    pub fn from_response(response: &HttpResponse) -> Self {
        let mut body = match serde_json::from_str::<Value>(&response.body) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                tracing::debug!(status = response.status, "response body is not a JSON object");
                parse_failure()
            }
        };

        for rule in ALIAS_RULES {
            if let Some(value) = body.remove(rule.alias) {
                body.insert(rule.canonical.to_string(), value);
            }
        }

        if !body.contains_key(STATUS_KEY) {
            let inferred = if response.status == 200 { SUCCESS } else { "error" };
            body.insert(STATUS_KEY.to_string(), Value::from(inferred));
        }

        let success = body.get(STATUS_KEY).and_then(Value::as_str) == Some(SUCCESS);
        let reason = if success {
            "Success".to_string()
        } else {
            match body.get(ERROR_KEY) {
                Some(Value::String(text)) => text.clone(),
                Some(Value::Null) | None => UNKNOWN_ERROR.to_string(),
                Some(other) => other.to_string(),
            }
        };

        Self {
            success,
            reason,
            status_code: response.status,
            body,
        }
    }

    /// The section stored under `key`, if the backend sent one.
    pub fn section(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }
}

fn parse_failure() -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(STATUS_KEY.to_string(), Value::from("error"));
    map.insert(ERROR_KEY.to_string(), Value::from(PARSE_FAILURE));
    map
}

/// What became of the schema's section of the body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload<T> {
    /// The body has no section under the schema's route key.
    Absent,
    Parsed(T),
    /// The section exists but does not match the schema.
    Mismatch(SchemaMismatch),
}

/// An envelope plus the schema-specific payload.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedResult<T> {
    pub envelope: Envelope,
    /// Key the schema reads its section from.
    pub route_key: &'static str,
    pub payload: Payload<T>,
}

impl<T> TypedResult<T> {
    pub fn success(&self) -> bool {
        self.envelope.success
    }

    pub fn reason(&self) -> &str {
        &self.envelope.reason
    }

    pub fn data(&self) -> Option<&T> {
        match &self.payload {
            Payload::Parsed(value) => Some(value),
            Payload::Absent | Payload::Mismatch(_) => None,
        }
    }

    /// Collapse into the parsed value, or the reason there is none.
    ///
    /// A parsed payload wins even if the backend flagged the call as failed;
    /// otherwise a backend error is reported before a missing section.
    pub fn into_data(self) -> Result<T, ApiError> {
        match self.payload {
            Payload::Parsed(value) => Ok(value),
            Payload::Mismatch(err) => Err(err.into()),
            Payload::Absent if !self.envelope.success => Err(ApiError::Backend {
                reason: self.envelope.reason,
            }),
            Payload::Absent => Err(ApiError::MissingPayload {
                route_key: self.route_key,
            }),
        }
    }
}

/// Normalize a response and run `schema` over its section.
pub fn normalize<S: Schema>(response: &HttpResponse, schema: &S) -> TypedResult<S::Output> {
    let envelope = Envelope::from_response(response);
    let payload = match envelope.section(S::ROUTE_KEY) {
        Some(raw) => match schema.transform(raw) {
            Ok(value) => Payload::Parsed(value),
            Err(err) => {
                tracing::warn!(%err, "payload does not match schema");
                Payload::Mismatch(err)
            }
        },
        None => Payload::Absent,
    };
    TypedResult {
        envelope,
        route_key: S::ROUTE_KEY,
        payload,
    }
}
