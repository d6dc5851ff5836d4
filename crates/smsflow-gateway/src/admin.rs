// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator JSON API handlers, mounted under `/admin`.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use smsflow_core::script::ReplyScript;
use smsflow_core::{
    Batch, BatchSummary, ContactNumber, ContactRecord, Conversation, DeviceId, DeviceInfo,
    DeviceStats, PoolStatus, SmsflowError,
};
use smsflow_campaign::ImportSummary;

use crate::error::ApiError;
use crate::server::AppState;

type ApiResult<T> = Result<Json<T>, ApiError>;

// --- Script ---

/// GET /admin/script
pub async fn get_script(State(state): State<AppState>) -> ApiResult<ReplyScript> {
    Ok(Json(state.storage.load_script().await?))
}

/// PUT /admin/script
pub async fn put_script(
    State(state): State<AppState>,
    Json(script): Json<ReplyScript>,
) -> ApiResult<ReplyScript> {
    state.storage.save_script(&script).await?;
    tracing::info!(
        enabled = script.enabled,
        steps = script.reply_mode.step_count(),
        "reply script updated"
    );
    Ok(Json(script))
}

// --- Device stats ---

/// GET /admin/stats
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<Vec<DeviceStats>> {
    Ok(Json(state.storage.list_device_stats().await?))
}

/// POST /admin/stats/{device}/cycle
pub async fn cycle_device(
    State(state): State<AppState>,
    Path(device): Path<String>,
) -> ApiResult<DeviceStats> {
    Ok(Json(state.storage.advance_cycle(&DeviceId(device)).await?))
}

/// POST /admin/stats/cycle
pub async fn cycle_all(State(state): State<AppState>) -> ApiResult<Vec<DeviceStats>> {
    Ok(Json(state.storage.advance_all_cycles().await?))
}

/// GET /admin/devices
pub async fn get_devices(State(state): State<AppState>) -> ApiResult<Vec<DeviceInfo>> {
    Ok(Json(state.gateway.list_devices().await?))
}

// --- Campaign pool ---

/// GET /admin/pool
pub async fn get_pool(State(state): State<AppState>) -> ApiResult<PoolStatus> {
    Ok(Json(state.campaign.status().await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct ImportQuery {
    /// Header of the number column for CSV bodies.
    #[serde(default)]
    pub number_column: Option<String>,
}

/// POST /admin/pool/import
///
/// A `text/csv` body is parsed as CSV; anything else must be a JSON array
/// of `{ "number": ..., "fields": {...} }` records.
pub async fn import_pool(
    State(state): State<AppState>,
    Query(query): Query<ImportQuery>,
    headers: HeaderMap,
    body: String,
) -> ApiResult<ImportSummary> {
    let is_csv = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/csv"));

    let summary = if is_csv {
        state
            .campaign
            .import_csv(&body, query.number_column.as_deref())
            .await?
    } else {
        let records: Vec<ContactRecord> = serde_json::from_str(&body)
            .map_err(|e| SmsflowError::Validation(format!("invalid records: {e}")))?;
        state.campaign.import(records).await?
    };
    Ok(Json(summary))
}

#[derive(Debug, Deserialize)]
pub struct ReserveRequest {
    pub devices: Vec<String>,
    pub per_device: u32,
}

/// POST /admin/batches
pub async fn reserve_batch(
    State(state): State<AppState>,
    Json(req): Json<ReserveRequest>,
) -> Result<(StatusCode, Json<Batch>), ApiError> {
    let devices: Vec<DeviceId> = req.devices.into_iter().map(DeviceId).collect();
    let batch = state.campaign.reserve(&devices, req.per_device).await?;
    Ok((StatusCode::CREATED, Json(batch)))
}

/// GET /admin/batches
pub async fn list_batches(State(state): State<AppState>) -> ApiResult<Vec<BatchSummary>> {
    Ok(Json(state.campaign.batches().await?))
}

/// GET /admin/batches/{id}
pub async fn get_batch(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    Ok(match state.campaign.batch(id).await? {
        Some(batch) => Json(batch).into_response(),
        None => ApiError::not_found(format!("batch {id}")),
    })
}

/// GET /admin/batches/{id}/csv
pub async fn get_batch_csv(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    Ok(match state.campaign.export_csv(id).await? {
        Some(csv) => ([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], csv).into_response(),
        None => ApiError::not_found(format!("batch {id}")),
    })
}

// --- Conversations ---

#[derive(Debug, Serialize)]
pub struct ConversationView {
    pub number: String,
    pub archived: bool,
    pub conversation: Option<Conversation>,
}

/// GET /admin/conversations/{number}
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> ApiResult<ConversationView> {
    let contact = ContactNumber(number);
    let archived = state.storage.is_archived(&contact).await?;
    let conversation = state.storage.get_conversation(&contact).await?;
    Ok(Json(ConversationView {
        number: contact.0,
        archived,
        conversation,
    }))
}

#[derive(Debug, Serialize)]
pub struct UnarchiveResponse {
    pub number: String,
    pub removed: bool,
}

/// DELETE /admin/archive/{number}
pub async fn unarchive(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> ApiResult<UnarchiveResponse> {
    let contact = ContactNumber(number);
    let removed = state.storage.unarchive(&contact).await?;
    if removed {
        tracing::info!(number = %contact, "number removed from archive");
    }
    Ok(Json(UnarchiveResponse {
        number: contact.0,
        removed,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::Router;
    use http_body_util::BodyExt;
    use smsflow_test_utils::{TestHarness, TEST_ADMIN_TOKEN};
    use tower::ServiceExt;

    use crate::server::build_router;

    fn router(harness: &TestHarness) -> Router {
        let state = AppState::new(
            harness.storage.clone(),
            harness.mock_gateway.clone(),
            &harness.config,
        );
        build_router(state, &harness.config)
    }

    async fn call(
        harness: &TestHarness,
        method: &str,
        uri: &str,
        content_type: &str,
        body: &str,
    ) -> (StatusCode, Vec<u8>) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {TEST_ADMIN_TOKEN}"))
            .header("content-type", content_type)
            .body(Body::from(body.to_string()))
            .unwrap();
        let resp = router(harness).oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
        (status, bytes)
    }

    async fn call_json(
        harness: &TestHarness,
        method: &str,
        uri: &str,
        body: &str,
    ) -> (StatusCode, serde_json::Value) {
        let (status, bytes) = call(harness, method, uri, "application/json", body).await;
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn requires_bearer_token() {
        let harness = TestHarness::builder().build().await.unwrap();
        let resp = router(&harness)
            .oneshot(Request::get("/admin/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = router(&harness)
            .oneshot(
                Request::get("/admin/stats")
                    .header("authorization", "Bearer nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn script_round_trip() {
        let harness = TestHarness::builder().build().await.unwrap();
        let (status, json) = call_json(
            &harness,
            "PUT",
            "/admin/script",
            r#"{"enabled":true,"reply_mode":1,"step0_type":"sms","step0_text":"Hello"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["reply_mode"], 1);

        let (_, json) = call_json(&harness, "GET", "/admin/script", "").await;
        assert_eq!(json["step0_text"], "Hello");
        assert_eq!(json["step0_type"], "sms");
    }

    #[tokio::test]
    async fn pool_import_reserve_and_export() {
        let harness = TestHarness::builder().build().await.unwrap();
        let (status, bytes) = call(
            &harness,
            "POST",
            "/admin/pool/import",
            "text/csv",
            "phone,name\n+1,Ann\n+2,Bob\n+3,Cy\n",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let summary: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(summary["imported"], 3);

        let (status, _) = call_json(
            &harness,
            "POST",
            "/admin/pool/import",
            r#"[{"number":"+4","fields":{"name":"Di"}}]"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, batch) = call_json(
            &harness,
            "POST",
            "/admin/batches",
            r#"{"devices":["d1","d2"],"per_device":3}"#,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(batch["taken_total"], 4);
        assert_eq!(batch["requested_total"], 6);
        let id = batch["batch_id"].as_i64().unwrap();

        let (status, bytes) =
            call(&harness, "GET", &format!("/admin/batches/{id}/csv"), "text/plain", "").await;
        assert_eq!(status, StatusCode::OK);
        let csv = String::from_utf8(bytes).unwrap();
        assert!(csv.starts_with("number,name\n+1,Ann\n"));

        let (status, json) = call_json(
            &harness,
            "POST",
            "/admin/batches",
            r#"{"devices":["d1"],"per_device":1}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("empty"));

        let (status, _) = call_json(&harness, "GET", "/admin/batches/999", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (_, list) = call_json(&harness, "GET", "/admin/batches", "").await;
        assert_eq!(list.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stats_cycle_and_archive_routes() {
        let harness = TestHarness::builder().build().await.unwrap();
        harness
            .storage
            .record_received(&DeviceId("7".into()))
            .await
            .unwrap();

        let (_, stats) = call_json(&harness, "GET", "/admin/stats", "").await;
        assert_eq!(stats[0]["received"], 1);
        let (status, cycled) = call_json(&harness, "POST", "/admin/stats/7/cycle", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cycled["cycle"], 1);
        assert_eq!(cycled["cycle_received"], 0);

        let (_, view) = call_json(&harness, "GET", "/admin/conversations/+100", "").await;
        assert_eq!(view["archived"], false);
        assert!(view["conversation"].is_null());

        let (_, removed) = call_json(&harness, "DELETE", "/admin/archive/+100", "").await;
        assert_eq!(removed["removed"], false);
    }

    #[tokio::test]
    async fn devices_come_from_the_gateway() {
        let harness = TestHarness::builder().build().await.unwrap();
        let (status, json) = call_json(&harness, "GET", "/admin/devices", "").await;
        assert_eq!(status, StatusCode::OK);
        assert!(json.is_array());
    }
}
