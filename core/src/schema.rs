//! Typed result models.
//!
//! A schema names the key its section lives under and turns that section into
//! records. Adding an endpoint means adding a `Schema` implementation; the
//! normalizer does not change.

use std::cmp::Ordering;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SchemaMismatch;

pub trait Schema {
    type Output;

    /// Name used in [`SchemaMismatch`] reports.
    const NAME: &'static str;

    /// Key of the response body holding this schema's section.
    const ROUTE_KEY: &'static str = "data";

    fn transform(&self, raw: &Value) -> Result<Self::Output, SchemaMismatch>;
}

fn records<S: Schema, T: DeserializeOwned>(raw: &Value) -> Result<T, SchemaMismatch> {
    T::deserialize(raw).map_err(|e| SchemaMismatch::new(S::NAME, e.to_string()))
}

/// Acknowledgement-only endpoints: the section is passed through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ack;

impl Schema for Ack {
    type Output = Value;
    const NAME: &'static str = "ack";

    fn transform(&self, raw: &Value) -> Result<Value, SchemaMismatch> {
        Ok(raw.clone())
    }
}

/// One submission as listed by the run filter.
///
/// The judge-result fields are `null` while a run is still being judged, but
/// the keys themselves must be present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub id: u64,
    pub create_time: String,
    #[serde(rename(deserialize = "ejudge_language_id"))]
    pub language_id: i64,
    #[serde(
        rename(deserialize = "ejudge_score"),
        deserialize_with = "Option::deserialize"
    )]
    pub score: Option<i64>,
    #[serde(
        rename(deserialize = "ejudge_status"),
        deserialize_with = "Option::deserialize"
    )]
    pub status: Option<i64>,
    #[serde(
        rename(deserialize = "ejudge_test_num"),
        deserialize_with = "Option::deserialize"
    )]
    pub test_num: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunsList;

impl Schema for RunsList {
    type Output = Vec<Run>;
    const NAME: &'static str = "runs";

    fn transform(&self, raw: &Value) -> Result<Vec<Run>, SchemaMismatch> {
        records::<Self, _>(raw)
    }
}

/// Source code of one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSource {
    #[serde(rename(deserialize = "language_id"))]
    pub lang_id: i64,
    pub source: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SourceRun;

impl Schema for SourceRun {
    type Output = RunSource;
    const NAME: &'static str = "source";

    fn transform(&self, raw: &Value) -> Result<RunSource, SchemaMismatch> {
        records::<Self, _>(raw)
    }
}

/// Judge verdict for one test of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestReport {
    /// Key of the test in the protocol, usually its 1-based number.
    #[serde(skip_deserializing)]
    pub number: String,
    pub max_memory_used: i64,
    pub real_time: i64,
    pub status: String,
    pub string_status: String,
    pub time: i64,
}

/// Testing protocol. The backend sends tests as an object keyed by test
/// number; reports come back ordered by that number.
#[derive(Debug, Clone, Copy, Default)]
pub struct TestsList;

impl Schema for TestsList {
    type Output = Vec<TestReport>;
    const NAME: &'static str = "tests";
    const ROUTE_KEY: &'static str = "tests";

    fn transform(&self, raw: &Value) -> Result<Vec<TestReport>, SchemaMismatch> {
        let tests = raw
            .as_object()
            .ok_or_else(|| SchemaMismatch::new(Self::NAME, "expected an object keyed by test number"))?;

        let mut reports = tests
            .iter()
            .map(|(number, test)| -> Result<TestReport, SchemaMismatch> {
                let mut report: TestReport = records::<Self, _>(test)
                    .map_err(|e| SchemaMismatch::new(Self::NAME, format!("test {number}: {}", e.detail)))?;
                report.number = number.clone();
                Ok(report)
            })
            .collect::<Result<Vec<_>, _>>()?;

        reports.sort_by(|a, b| by_test_number(&a.number, &b.number));
        Ok(reports)
    }
}

fn by_test_number(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}
