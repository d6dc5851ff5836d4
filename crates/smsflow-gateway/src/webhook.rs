// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound webhook handler.
//!
//! Checks run in a fixed order: the events field must be present, then the
//! signature must verify (unless debug mode), then the field must parse as a
//! JSON array. Once those pass the request always succeeds, whatever happens
//! to individual events.

use std::collections::HashMap;

use axum::{
    extract::{rejection::FormRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Form,
};
use smsflow_engine::EventDispatcher;
use tracing::{debug, info, warn};

use crate::error::status_for;
use crate::server::AppState;

/// Short per-request id used to correlate log lines.
fn request_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// POST {webhook.path}
pub async fn receive_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: Result<Form<HashMap<String, String>>, FormRejection>,
) -> Response {
    let request_id = request_id();
    info!(request_id = %request_id, "webhook request received");

    let field = match form {
        Ok(Form(mut fields)) => fields.remove(&state.webhook.form_field),
        Err(e) => {
            debug!(request_id = %request_id, error = %e, "form body rejected");
            None
        }
    };
    let Some(raw) = field.filter(|v| !v.is_empty()) else {
        warn!(request_id = %request_id, field = %state.webhook.form_field, "events field missing");
        return (
            StatusCode::BAD_REQUEST,
            format!("missing '{}' field", state.webhook.form_field),
        )
            .into_response();
    };

    let signature = headers
        .get(state.webhook.signature_header.as_str())
        .and_then(|v| v.to_str().ok());
    if let Err(e) = state.webhook.verifier.check(raw.as_bytes(), signature) {
        warn!(request_id = %request_id, error = %e, "signature check failed");
        return (status_for(&e), e.to_string()).into_response();
    }

    let events = match EventDispatcher::parse_batch(&raw) {
        Ok(events) => events,
        Err(e) => {
            warn!(request_id = %request_id, error = %e, "events payload rejected");
            return (status_for(&e), e.to_string()).into_response();
        }
    };

    state.dispatcher.dispatch(&events, &request_id).await;
    (StatusCode::OK, "OK").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use smsflow_test_utils::{form_body, TestHarness, TEST_SECRET};
    use tower::ServiceExt;

    use crate::server::build_router;
    use crate::signature::sign;

    async fn post(
        harness: &TestHarness,
        body: String,
        signature: Option<String>,
    ) -> (StatusCode, String) {
        let state = AppState::new(
            harness.storage.clone(),
            harness.mock_gateway.clone(),
            &harness.config,
        );
        let app = build_router(state, &harness.config);
        let mut req = Request::post("/sms_auto_reply")
            .header("content-type", "application/x-www-form-urlencoded");
        if let Some(sig) = signature {
            req = req.header("X-SG-SIGNATURE", sig);
        }
        let resp = app.oneshot(req.body(Body::from(body)).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    fn signed(value: &str) -> (String, Option<String>) {
        (
            form_body("messages", value),
            Some(sign(TEST_SECRET.as_bytes(), value.as_bytes())),
        )
    }

    #[test]
    fn request_ids_are_short() {
        assert_eq!(request_id().len(), 8);
    }

    #[tokio::test]
    async fn missing_field_is_400_before_signature() {
        let harness = TestHarness::builder().build().await.unwrap();
        let (status, text) = post(&harness, form_body("other", "[]"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(text.contains("messages"));

        let (status, _) = post(&harness, form_body("messages", ""), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn bad_or_missing_signature_is_403_even_for_bad_json() {
        let harness = TestHarness::builder().build().await.unwrap();
        let (status, _) = post(&harness, form_body("messages", "{oops"), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = post(
            &harness,
            form_body("messages", "[]"),
            Some(sign(b"wrong-secret", b"[]")),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn malformed_json_and_non_array_are_400() {
        let harness = TestHarness::builder().build().await.unwrap();
        let (body, sig) = signed("{oops");
        let (status, _) = post(&harness, body, sig).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (body, sig) = signed(r#"{"ID":"1"}"#);
        let (status, _) = post(&harness, body, sig).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn accepted_batch_is_queued() {
        let harness = TestHarness::builder().build().await.unwrap();
        let (body, sig) =
            signed(r#"[{"ID":"a1","number":"+33600000001","deviceID":"5"},{"ID":"a2"}]"#);
        let (status, text) = post(&harness, body, sig).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(text, "OK");
        assert_eq!(harness.task_count("pending").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn debug_mode_skips_signature() {
        let harness = TestHarness::builder().debug_mode(true).build().await.unwrap();
        let (status, _) = post(&harness, form_body("messages", "[]"), None).await;
        assert_eq!(status, StatusCode::OK);
    }
}
