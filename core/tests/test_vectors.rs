//! Verify the normalizer against JSON test vectors stored in `test-vectors/`.
//!
//! Each case gives a raw backend response, the schema to apply, and the
//! expected envelope and payload. Parsed payloads are compared as JSON values
//! to keep the vectors independent of field order.

use informatics_core::{
    normalize, Ack, HttpResponse, Payload, RunsList, Schema, SourceRun, TestsList,
};
use serde::Serialize;
use serde_json::Value;

fn check<S>(name: &str, schema: &S, response: &HttpResponse, expected: &Value)
where
    S: Schema,
    S::Output: Serialize + PartialEq + std::fmt::Debug,
{
    let result = normalize(response, schema);

    assert_eq!(result.success(), expected["success"].as_bool().unwrap(), "{name}: success");
    assert_eq!(result.reason(), expected["reason"].as_str().unwrap(), "{name}: reason");
    assert_eq!(result.envelope.status_code, response.status, "{name}: status code");
    assert_eq!(result, normalize(response, schema), "{name}: idempotent");

    match (expected["payload"].as_str().unwrap(), &result.payload) {
        ("absent", Payload::Absent) => {}
        ("mismatch", Payload::Mismatch(err)) => assert_eq!(err.schema, S::NAME, "{name}: schema"),
        ("parsed", Payload::Parsed(data)) => {
            let actual = serde_json::to_value(data).unwrap();
            assert_eq!(actual, expected["data"], "{name}: data");
        }
        (want, got) => panic!("{name}: expected {want} payload, got {got:?}"),
    }
}

#[test]
fn normalize_test_vectors() {
    let raw = include_str!("../../test-vectors/normalize.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let sim = &case["response"];
        let response = HttpResponse::new(
            sim["status"].as_u64().unwrap() as u16,
            sim["body"].as_str().unwrap(),
        );
        let expected = &case["expected"];

        match case["schema"].as_str().unwrap() {
            "ack" => check(name, &Ack, &response, expected),
            "runs" => check(name, &RunsList, &response, expected),
            "source" => check(name, &SourceRun, &response, expected),
            "tests" => check(name, &TestsList, &response, expected),
            other => panic!("{name}: unknown schema {other}"),
        }
    }
}
