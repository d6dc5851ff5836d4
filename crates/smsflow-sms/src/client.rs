// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the carrier gateway.
//!
//! Every call is a single attempt bounded by the configured timeout. There is
//! no retry loop: a failed send is reported to the caller, which counts it.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use smsflow_config::model::SmsConfig;
use smsflow_core::{
    AdapterType, DeviceInfo, HealthStatus, OutboundSms, PluginAdapter, SmsGateway, SmsflowError,
};
use tracing::{debug, warn};

use crate::types::{GatewayResponse, SendForm};

/// Gateway client implementing [`SmsGateway`].
#[derive(Clone)]
pub struct HttpSmsGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    send_path: String,
    devices_path: String,
    prioritize: bool,
    timeout: Duration,
}

impl std::fmt::Debug for HttpSmsGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSmsGateway")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpSmsGateway {
    /// Build a client from the `[sms]` configuration section.
    ///
    /// Both `server` and `api_key` are required.
    pub fn new(config: &SmsConfig) -> Result<Self, SmsflowError> {
        let base_url = config
            .server
            .as_deref()
            .ok_or_else(|| SmsflowError::Config("sms.server is not set".into()))?
            .trim_end_matches('/')
            .to_string();
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| SmsflowError::Config("sms.api_key is not set".into()))?;
        let timeout = Duration::from_secs(config.timeout_secs);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SmsflowError::Delivery {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url,
            api_key,
            send_path: config.send_path.clone(),
            devices_path: config.devices_path.clone(),
            prioritize: config.prioritize,
            timeout,
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn transport_error(&self, e: reqwest::Error) -> SmsflowError {
        let message = if e.is_timeout() {
            format!("gateway call timed out after {:?}", self.timeout)
        } else {
            format!("gateway request failed: {e}")
        };
        SmsflowError::Delivery {
            message,
            source: Some(Box::new(e)),
        }
    }

    /// Reads a gateway envelope, requiring a 2xx status and `success == true`.
    async fn read_envelope(
        &self,
        response: reqwest::Response,
    ) -> Result<GatewayResponse, SmsflowError> {
        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        debug!(status = %status, "gateway response received");

        if !status.is_success() {
            let detail = serde_json::from_str::<GatewayResponse>(&body)
                .map(|r| r.error_message())
                .unwrap_or(body);
            return Err(SmsflowError::delivery(format!(
                "gateway returned {status}: {detail}"
            )));
        }

        let envelope: GatewayResponse =
            serde_json::from_str(&body).map_err(|e| SmsflowError::Delivery {
                message: format!("unparsable gateway response: {e}"),
                source: Some(Box::new(e)),
            })?;
        if !envelope.success {
            return Err(SmsflowError::delivery(envelope.error_message()));
        }
        Ok(envelope)
    }
}

/// Device descriptors from a listing payload: `data` is either the array
/// itself or an object holding it under `devices`.
fn extract_devices(data: Option<Value>) -> Result<Vec<DeviceInfo>, SmsflowError> {
    let list = match data {
        Some(Value::Array(items)) => items,
        Some(Value::Object(mut obj)) => match obj.remove("devices") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    list.into_iter()
        .map(|item| {
            serde_json::from_value(item).map_err(|e| SmsflowError::Delivery {
                message: format!("unparsable device descriptor: {e}"),
                source: Some(Box::new(e)),
            })
        })
        .collect()
}

#[async_trait]
impl PluginAdapter for HttpSmsGateway {
    fn name(&self) -> &str {
        "sms-gateway"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Gateway
    }

    async fn health_check(&self) -> Result<HealthStatus, SmsflowError> {
        Ok(match self.list_devices().await {
            Ok(_) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Degraded(e.to_string()),
        })
    }

    async fn shutdown(&self) -> Result<(), SmsflowError> {
        Ok(())
    }
}

#[async_trait]
impl SmsGateway for HttpSmsGateway {
    async fn send_message(&self, msg: &OutboundSms) -> Result<(), SmsflowError> {
        let message_type = msg.message_type.to_string();
        let form = SendForm {
            number: &msg.number.0,
            message: &msg.message,
            devices: &msg.device.0,
            message_type: &message_type,
            prioritize: u8::from(self.prioritize),
            key: &self.api_key,
        };

        let response = self
            .client
            .post(self.url(&self.send_path))
            .form(&form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        match self.read_envelope(response).await {
            Ok(_) => {
                debug!(number = %msg.number, device = %msg.device, "gateway accepted message");
                Ok(())
            }
            Err(e) => {
                warn!(number = %msg.number, device = %msg.device, error = %e, "gateway rejected message");
                Err(e)
            }
        }
    }

    async fn list_devices(&self) -> Result<Vec<DeviceInfo>, SmsflowError> {
        let response = self
            .client
            .get(self.url(&self.devices_path))
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let envelope = self.read_envelope(response).await?;
        extract_devices(envelope.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smsflow_core::{ContactNumber, DeviceId, MessageType};
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_gateway(base_url: &str) -> HttpSmsGateway {
        let config = SmsConfig {
            server: Some("https://unused.example".into()),
            api_key: Some("test-key".into()),
            timeout_secs: 2,
            ..SmsConfig::default()
        };
        HttpSmsGateway::new(&config).unwrap().with_base_url(base_url)
    }

    fn outbound() -> OutboundSms {
        OutboundSms {
            number: ContactNumber("+15550001".into()),
            message: "hello there".into(),
            device: DeviceId("12".into()),
            message_type: MessageType::Sms,
        }
    }

    #[test]
    fn new_requires_server_and_key() {
        let err = HttpSmsGateway::new(&SmsConfig::default()).unwrap_err();
        assert!(matches!(err, SmsflowError::Config(_)));
        let config = SmsConfig {
            server: Some("https://sms.example".into()),
            ..SmsConfig::default()
        };
        assert!(HttpSmsGateway::new(&config).is_err());
    }

    #[test]
    fn debug_redacts_api_key() {
        let gw = test_gateway("http://localhost");
        assert!(!format!("{gw:?}").contains("test-key"));
    }

    #[tokio::test]
    async fn send_posts_form_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/send.php"))
            .and(body_string_contains("number=%2B15550001"))
            .and(body_string_contains("devices=12"))
            .and(body_string_contains("type=sms"))
            .and(body_string_contains("prioritize=1"))
            .and(body_string_contains("key=test-key"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"success": true, "data": {"messages": []}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        test_gateway(&server.uri()).send_message(&outbound()).await.unwrap();
    }

    #[tokio::test]
    async fn explicit_failure_flag_is_delivery_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false,
                "error": {"code": 401, "message": "Invalid API key"}
            })))
            .mount(&server)
            .await;

        let err = test_gateway(&server.uri())
            .send_message(&outbound())
            .await
            .unwrap_err();
        match err {
            SmsflowError::Delivery { message, .. } => assert_eq!(message, "Invalid API key"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn non_2xx_is_delivery_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = test_gateway(&server.uri())
            .send_message(&outbound())
            .await
            .unwrap_err();
        assert!(matches!(err, SmsflowError::Delivery { .. }));
        assert!(err.to_string().contains("502"));
    }

    #[tokio::test]
    async fn unparsable_body_is_delivery_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let err = test_gateway(&server.uri())
            .send_message(&outbound())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unparsable"));
    }

    #[tokio::test]
    async fn timeout_is_delivery_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"success": true}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let err = test_gateway(&server.uri())
            .send_message(&outbound())
            .await
            .unwrap_err();
        assert!(matches!(err, SmsflowError::Delivery { .. }));
        assert!(err.to_string().contains("timed out"), "{err}");
    }

    #[tokio::test]
    async fn list_devices_reads_nested_array() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/services/get-devices.php"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "data": {"devices": [
                    {"ID": 1, "name": "Pixel", "model": "Pixel 7", "sim": 2},
                    {"ID": 2, "name": null, "model": "Galaxy"}
                ]}
            })))
            .mount(&server)
            .await;

        let devices = test_gateway(&server.uri()).list_devices().await.unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].name.as_deref(), Some("Pixel"));
        assert_eq!(devices[1].model.as_deref(), Some("Galaxy"));
        assert_eq!(devices[0].extra.get("sim"), Some(&serde_json::json!(2)));
    }

    #[test]
    fn extract_devices_accepts_flat_array() {
        let devices =
            extract_devices(Some(serde_json::json!([{"id": "a"}]))).unwrap();
        assert_eq!(devices[0].id, serde_json::json!("a"));
        assert!(extract_devices(None).unwrap().is_empty());
    }
}
