// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation engine: one queued event in, at most one reply out.
//!
//! The reply script is read once per job and treated as an immutable
//! snapshot. The state transition itself is applied atomically by the store;
//! the reply is sent only after that transition has committed.

use std::sync::Arc;

use smsflow_core::script::{ReplyScript, Transition};
use smsflow_core::{InboundEvent, OutboundSms, SmsGateway, SmsflowError, StorageAdapter};
use tracing::{debug, info, warn};

use crate::outbound::{DispatchOutcome, OutboundDispatcher};

/// What one job did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The script is disabled; the event was dropped untouched.
    Disabled,
    /// The payload was not a usable event.
    Malformed(String),
    /// The event was applied to the contact's conversation.
    Applied {
        transition: Transition,
        dispatch: Option<DispatchOutcome>,
    },
}

pub struct ConversationEngine {
    storage: Arc<dyn StorageAdapter>,
    outbound: OutboundDispatcher,
    processed_ids_cap: usize,
}

impl ConversationEngine {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        gateway: Arc<dyn SmsGateway>,
        processed_ids_cap: usize,
    ) -> Self {
        Self {
            outbound: OutboundDispatcher::new(gateway, storage.clone()),
            storage,
            processed_ids_cap: processed_ids_cap.max(1),
        }
    }

    /// Processes one queued payload (the raw JSON of a webhook element).
    ///
    /// Errors are store failures only; the caller decides whether to retry.
    /// Malformed payloads and delivery failures are reported in the outcome.
    pub async fn process_payload(&self, payload: &str) -> Result<JobOutcome, SmsflowError> {
        let script = self.storage.load_script().await?;
        if !script.enabled {
            debug!("script disabled, event dropped");
            return Ok(JobOutcome::Disabled);
        }

        let event = match InboundEvent::from_json(payload) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "malformed event dropped");
                return Ok(JobOutcome::Malformed(e.to_string()));
            }
        };

        self.process_event(&event, &script).await
    }

    /// Applies `event` under the given script snapshot and sends any reply.
    pub async fn process_event(
        &self,
        event: &InboundEvent,
        script: &ReplyScript,
    ) -> Result<JobOutcome, SmsflowError> {
        let event_id = event.id.short();
        let transition = self
            .storage
            .apply_inbound(event, script, self.processed_ids_cap)
            .await?;

        let mut dispatch = None;
        match &transition {
            Transition::AlreadyArchived => {
                debug!(event_id, number = %event.number, "contact archived, event ignored");
            }
            Transition::Duplicate => {
                debug!(event_id, number = %event.number, "event already processed");
            }
            Transition::BelowThreshold {
                in_count,
                threshold,
            } => {
                debug!(event_id, number = %event.number, in_count, threshold, "waiting for inbound threshold");
            }
            Transition::ForceArchived { step } => {
                info!(event_id, number = %event.number, step, "stored step beyond script, contact archived");
            }
            Transition::Advanced {
                from_step,
                to_step,
                reply,
                archived,
            } => {
                info!(
                    event_id,
                    number = %event.number,
                    device = %event.device,
                    from_step,
                    to_step,
                    archived,
                    silent = reply.is_none(),
                    "conversation advanced"
                );
                if let Some(reply) = reply {
                    let msg = OutboundSms {
                        number: event.number.clone(),
                        message: reply.text.clone(),
                        device: event.device.clone(),
                        message_type: reply.message_type,
                    };
                    dispatch = Some(self.outbound.dispatch(&msg).await);
                }
            }
        }

        Ok(JobOutcome::Applied {
            transition,
            dispatch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{open_storage, RecordingGateway};
    use smsflow_core::script::ReplyMode;
    use smsflow_core::{ContactNumber, DeviceId, MessageType};

    fn payload(id: &str, number: &str) -> String {
        serde_json::json!({"ID": id, "number": number, "deviceID": 9}).to_string()
    }

    fn two_step() -> ReplyScript {
        ReplyScript {
            reply_mode: ReplyMode::TwoStep,
            step0_type: MessageType::Sms,
            step0_text: "Hi {number}".into(),
            step1_type: MessageType::Mms,
            step1_text: "Bye".into(),
            ..ReplyScript::default()
        }
    }

    async fn engine() -> (
        ConversationEngine,
        Arc<smsflow_storage::SqliteStorage>,
        Arc<RecordingGateway>,
        tempfile::TempDir,
    ) {
        let (storage, dir) = open_storage().await;
        storage.save_script(&two_step()).await.unwrap();
        let gateway = Arc::new(RecordingGateway::default());
        let engine = ConversationEngine::new(storage.clone(), gateway.clone(), 10);
        (engine, storage, gateway, dir)
    }

    #[tokio::test]
    async fn first_event_sends_step_zero() {
        let (engine, storage, gateway, _dir) = engine().await;
        let outcome = engine.process_payload(&payload("a", "+15")).await.unwrap();
        assert!(matches!(
            outcome,
            JobOutcome::Applied {
                transition: Transition::Advanced { from_step: 0, to_step: 1, archived: false, .. },
                dispatch: Some(DispatchOutcome::Sent),
            }
        ));

        let sent = gateway.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].message, "Hi +15");
        assert_eq!(sent[0].message_type, MessageType::Sms);
        assert_eq!(sent[0].device, DeviceId("9".into()));

        let conv = storage
            .get_conversation(&ContactNumber("+15".into()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conv.step, 1);
    }

    #[tokio::test]
    async fn disabled_script_drops_without_marking() {
        let (engine, storage, gateway, _dir) = engine().await;
        let mut script = two_step();
        script.enabled = false;
        storage.save_script(&script).await.unwrap();

        let outcome = engine.process_payload(&payload("a", "+16")).await.unwrap();
        assert_eq!(outcome, JobOutcome::Disabled);
        assert!(gateway.sent().is_empty());
        assert!(storage
            .get_conversation(&ContactNumber("+16".into()))
            .await
            .unwrap()
            .is_none());

        // Re-enabled, the same event is processed normally.
        storage.save_script(&two_step()).await.unwrap();
        let outcome = engine.process_payload(&payload("a", "+16")).await.unwrap();
        assert!(matches!(outcome, JobOutcome::Applied { dispatch: Some(DispatchOutcome::Sent), .. }));
    }

    #[tokio::test]
    async fn malformed_payloads_are_reported() {
        let (engine, _storage, gateway, _dir) = engine().await;
        for bad in ["not json", r#"{"ID":"x"}"#, "7"] {
            let outcome = engine.process_payload(bad).await.unwrap();
            assert!(matches!(outcome, JobOutcome::Malformed(_)), "{bad}");
        }
        assert!(gateway.sent().is_empty());
    }

    #[tokio::test]
    async fn delivery_failure_still_advances() {
        let (engine, storage, gateway, _dir) = engine().await;
        gateway.set_failing(true);
        let outcome = engine.process_payload(&payload("a", "+17")).await.unwrap();
        assert!(matches!(
            outcome,
            JobOutcome::Applied { dispatch: Some(DispatchOutcome::Failed(_)), .. }
        ));
        let conv = storage
            .get_conversation(&ContactNumber("+17".into()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conv.step, 1);
        let stats = storage.device_stats(&DeviceId("9".into())).await.unwrap().unwrap();
        assert_eq!(stats.errors, 1);
    }

    #[tokio::test]
    async fn silent_step_advances_without_sending() {
        let (engine, storage, gateway, _dir) = engine().await;
        let mut script = two_step();
        script.step0_text = "   ".into();
        storage.save_script(&script).await.unwrap();

        let outcome = engine.process_payload(&payload("a", "+18")).await.unwrap();
        assert!(matches!(
            outcome,
            JobOutcome::Applied {
                transition: Transition::Advanced { reply: None, to_step: 1, .. },
                dispatch: None,
            }
        ));
        assert!(gateway.sent().is_empty());
    }

    #[tokio::test]
    async fn shrinking_script_force_archives_mid_conversation() {
        let (engine, storage, gateway, _dir) = engine().await;
        engine.process_payload(&payload("a", "+19")).await.unwrap();

        let mut script = two_step();
        script.reply_mode = ReplyMode::OneStep;
        storage.save_script(&script).await.unwrap();

        let outcome = engine.process_payload(&payload("b", "+19")).await.unwrap();
        assert!(matches!(
            outcome,
            JobOutcome::Applied { transition: Transition::ForceArchived { step: 1 }, dispatch: None }
        ));
        assert_eq!(gateway.sent().len(), 1);
        assert!(storage.is_archived(&ContactNumber("+19".into())).await.unwrap());
    }
}
