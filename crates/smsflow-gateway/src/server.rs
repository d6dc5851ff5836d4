// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use smsflow_campaign::CampaignPool;
use smsflow_config::model::SmsflowConfig;
use smsflow_core::{HealthStatus, SmsGateway, SmsflowError, StorageAdapter};
use smsflow_engine::EventDispatcher;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::admin;
use crate::auth::{admin_auth_middleware, AdminAuth};
use crate::signature::SignatureVerifier;
use crate::webhook;

/// Webhook request handling settings.
#[derive(Debug, Clone)]
pub struct WebhookSettings {
    /// Form field carrying the JSON event array.
    pub form_field: String,
    /// Header carrying the base64 signature.
    pub signature_header: String,
    pub verifier: SignatureVerifier,
}

impl WebhookSettings {
    pub fn from_config(config: &SmsflowConfig) -> Self {
        Self {
            form_field: config.webhook.form_field.clone(),
            signature_header: config.webhook.signature_header.clone(),
            verifier: SignatureVerifier::new(
                config.signing_secret().map(str::to_string),
                config.webhook.debug_mode,
            ),
        }
    }
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn StorageAdapter>,
    pub gateway: Arc<dyn SmsGateway>,
    pub dispatcher: Arc<EventDispatcher>,
    pub campaign: Arc<CampaignPool>,
    pub webhook: WebhookSettings,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        gateway: Arc<dyn SmsGateway>,
        config: &SmsflowConfig,
    ) -> Self {
        Self {
            dispatcher: Arc::new(EventDispatcher::from_config(storage.clone(), config)),
            campaign: Arc::new(CampaignPool::new(storage.clone())),
            webhook: WebhookSettings::from_config(config),
            storage,
            gateway,
            start_time: Instant::now(),
        }
    }
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub storage: String,
    pub version: &'static str,
    pub uptime_secs: u64,
}

/// GET /health
pub async fn get_health(State(state): State<AppState>) -> Response {
    let (status, code, storage) = match state.storage.health_check().await {
        Ok(HealthStatus::Healthy) => ("ok", StatusCode::OK, "healthy".to_string()),
        Ok(HealthStatus::Degraded(why)) => ("degraded", StatusCode::OK, why),
        Ok(HealthStatus::Unhealthy(why)) => ("unhealthy", StatusCode::SERVICE_UNAVAILABLE, why),
        Err(e) => ("unhealthy", StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
    };
    let body = HealthResponse {
        status,
        storage,
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.start_time.elapsed().as_secs(),
    };
    (code, Json(body)).into_response()
}

/// Builds the application router.
///
/// The admin API is mounted only when `admin.bearer_token` is set.
pub fn build_router(state: AppState, config: &SmsflowConfig) -> Router {
    let public_routes = Router::new()
        .route("/health", get(get_health))
        .route(&config.webhook.path, post(webhook::receive_events))
        .with_state(state.clone());

    let mut app = Router::new().merge(public_routes);

    if let Some(token) = config.admin.bearer_token.clone() {
        let admin_routes = Router::new()
            .route("/script", get(admin::get_script).put(admin::put_script))
            .route("/stats", get(admin::get_stats))
            .route("/stats/cycle", post(admin::cycle_all))
            .route("/stats/{device}/cycle", post(admin::cycle_device))
            .route("/devices", get(admin::get_devices))
            .route("/pool", get(admin::get_pool))
            .route("/pool/import", post(admin::import_pool))
            .route(
                "/batches",
                get(admin::list_batches).post(admin::reserve_batch),
            )
            .route("/batches/{id}", get(admin::get_batch))
            .route("/batches/{id}/csv", get(admin::get_batch_csv))
            .route("/conversations/{number}", get(admin::get_conversation))
            .route("/archive/{number}", delete(admin::unarchive))
            .route_layer(axum_middleware::from_fn_with_state(
                AdminAuth {
                    bearer_token: token,
                },
                admin_auth_middleware,
            ))
            .with_state(state);
        app = app.nest("/admin", admin_routes);
    } else {
        tracing::info!("admin.bearer_token not set, operator API disabled");
    }

    app.layer(TraceLayer::new_for_http())
}

/// Binds the configured address and serves until `cancel` fires.
pub async fn start_server(
    config: &SmsflowConfig,
    state: AppState,
    cancel: CancellationToken,
) -> Result<(), SmsflowError> {
    let app = build_router(state, config);

    let addr = format!("{}:{}", config.webhook.host, config.webhook.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| SmsflowError::Internal(format!("failed to bind {addr}: {e}")))?;

    tracing::info!(addr = %addr, path = %config.webhook.path, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(|e| SmsflowError::Internal(format!("HTTP server error: {e}")))?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use smsflow_test_utils::TestHarness;
    use tower::ServiceExt;

    fn test_state(harness: &TestHarness) -> AppState {
        AppState::new(
            harness.storage.clone(),
            harness.mock_gateway.clone(),
            &harness.config,
        )
    }

    #[tokio::test]
    async fn health_reports_storage() {
        let harness = TestHarness::builder().build().await.unwrap();
        let app = build_router(test_state(&harness), &harness.config);

        let resp = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn admin_is_absent_without_token() {
        let harness = TestHarness::builder().build().await.unwrap();
        let mut config = harness.config.clone();
        config.admin.bearer_token = None;
        let app = build_router(test_state(&harness), &config);

        let resp = app
            .oneshot(Request::get("/admin/pool").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn webhook_settings_fall_back_to_api_key() {
        let mut config = SmsflowConfig::default();
        config.sms.api_key = Some("k".into());
        let settings = WebhookSettings::from_config(&config);
        assert!(!settings.verifier.is_bypassed());
        let sig = crate::signature::sign(b"k", b"[]");
        assert!(settings.verifier.check(b"[]", Some(&sig)).is_ok());
    }
}
