//! Verify response decoding against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector names an operation, a simulated backend response and the
//! outcome it must decode to. Successful payloads are compared as JSON
//! values so field order never matters.

use serde_json::{json, Value};
use story_core::{response, HttpResponse, StoryError};

/// Decode `response` with the parser for `operation`, rendering the success
/// payload as JSON.
fn decode(operation: &str, response: &HttpResponse) -> Result<Value, StoryError> {
    match operation {
        "authenticate" => response::parse_authenticate(response).map(Value::String),
        "upload_story" => {
            response::parse_upload_story(response).map(|s| serde_json::to_value(s).unwrap())
        }
        "fetch_stories" => {
            response::parse_fetch_stories(response).map(|s| serde_json::to_value(s).unwrap())
        }
        "toggle_like" => response::parse_toggle_like(response)
            .map(|l| json!({ "isLiked": l.is_liked, "likesCount": l.likes_count })),
        "delete_story" => response::parse_delete_story(response).map(|()| Value::Null),
        other => panic!("unknown operation: {other}"),
    }
}

#[test]
fn envelope_test_vectors() {
    let raw = include_str!("../../test-vectors/envelopes.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let response = HttpResponse::new(
            case["status"].as_u64().unwrap() as u16,
            case["body"].as_str().unwrap(),
        );
        let outcome = decode(case["operation"].as_str().unwrap(), &response);
        let expected = &case["expected"];

        if let Some(payload) = expected.get("ok") {
            assert_eq!(outcome.as_ref().ok(), Some(payload), "{name}: payload");
        } else if let Some(message) = expected.get("domain") {
            let message = message.as_str().unwrap().to_string();
            assert_eq!(outcome, Err(StoryError::Domain(message)), "{name}: domain error");
        } else if expected.get("decode").is_some() {
            assert!(
                matches!(outcome, Err(StoryError::Decode(_))),
                "{name}: expected decode error, got {outcome:?}"
            );
        } else {
            panic!("{name}: vector has no expectation");
        }
    }
}
