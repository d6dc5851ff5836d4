// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The auto-reply script and the per-contact conversation state machine.
//!
//! [`plan_transition`] is a pure function from the stored state of one contact
//! and one inbound event to the outcome plus the state write to perform. The
//! storage adapter runs it inside a single transaction so the read, the
//! decision, and the write are never interleaved with another worker handling
//! the same contact.

use serde::{Deserialize, Serialize};

use crate::types::{Conversation, ContactNumber, DeviceId, InboundEvent, MessageType};

/// Number of scripted steps before a contact is archived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ReplyMode {
    /// Reply once, then archive.
    OneStep,
    /// Reply twice, then archive.
    #[default]
    TwoStep,
}

impl ReplyMode {
    /// Script length in steps.
    pub fn step_count(self) -> u32 {
        match self {
            Self::OneStep => 1,
            Self::TwoStep => 2,
        }
    }
}

impl TryFrom<u8> for ReplyMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::OneStep),
            2 => Ok(Self::TwoStep),
            other => Err(format!("reply_mode must be 1 or 2, got {other}")),
        }
    }
}

impl From<ReplyMode> for u8 {
    fn from(mode: ReplyMode) -> Self {
        match mode {
            ReplyMode::OneStep => 1,
            ReplyMode::TwoStep => 2,
        }
    }
}

/// The operator-edited reply script, stored as one JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplyScript {
    pub enabled: bool,
    pub reply_mode: ReplyMode,
    pub step0_type: MessageType,
    pub step0_text: String,
    pub step1_type: MessageType,
    pub step1_text: String,
    /// Reply only once this many inbound events have been seen for a contact.
    pub min_in_before_reply: Option<u32>,
}

impl Default for ReplyScript {
    fn default() -> Self {
        Self {
            enabled: true,
            reply_mode: ReplyMode::TwoStep,
            step0_type: MessageType::Mms,
            step0_text: String::new(),
            step1_type: MessageType::Mms,
            step1_text: String::new(),
            min_in_before_reply: None,
        }
    }
}

/// Text and type of one script step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptStep<'a> {
    pub message_type: MessageType,
    pub text: &'a str,
}

impl ReplyScript {
    /// Script length in steps.
    pub fn step_count(&self) -> u32 {
        self.reply_mode.step_count()
    }

    /// Step `n`, or `None` when `n` is beyond the configured mode.
    ///
    /// `step1_text` is never returned in one-step mode.
    pub fn step(&self, n: u32) -> Option<ScriptStep<'_>> {
        if n >= self.step_count() {
            return None;
        }
        match n {
            0 => Some(ScriptStep {
                message_type: self.step0_type,
                text: &self.step0_text,
            }),
            1 => Some(ScriptStep {
                message_type: self.step1_type,
                text: &self.step1_text,
            }),
            _ => None,
        }
    }
}

/// Substitutes `{number}` and `{device}` in a reply template.
pub fn render(template: &str, number: &ContactNumber, device: &DeviceId) -> String {
    template
        .replace("{number}", &number.0)
        .replace("{device}", &device.0)
}

/// A reply selected for sending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    pub message_type: MessageType,
}

/// What happened to one inbound event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Transition {
    /// The contact was already archived; nothing changed.
    AlreadyArchived,
    /// The event id was already processed; nothing changed.
    Duplicate,
    /// The inbound threshold is not met yet; the event was recorded without a reply.
    BelowThreshold { in_count: u32, threshold: u32 },
    /// The stored step is beyond the current script; the contact was archived
    /// without a reply.
    ForceArchived { step: u32 },
    /// The step advanced. `reply` is `None` for a silent (blank) step.
    Advanced {
        from_step: u32,
        to_step: u32,
        reply: Option<Reply>,
        archived: bool,
    },
}

/// The state write that accompanies a [`Transition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateWrite {
    /// Leave the store untouched.
    Nothing,
    /// Insert or replace the conversation record.
    Upsert(Conversation),
    /// Add the number to the archived set and delete its conversation record.
    ArchiveAndDelete,
}

/// The outcome of [`plan_transition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub transition: Transition,
    pub write: StateWrite,
}

impl Plan {
    fn unchanged(transition: Transition) -> Self {
        Self {
            transition,
            write: StateWrite::Nothing,
        }
    }
}

/// Decides how one inbound event moves a contact through the script.
///
/// `archived` and `existing` are the stored state of `event.number`. The
/// enabled flag is not consulted here: a disabled script drops events before
/// the store is touched.
pub fn plan_transition(
    archived: bool,
    existing: Option<Conversation>,
    event: &InboundEvent,
    script: &ReplyScript,
    processed_ids_cap: usize,
) -> Plan {
    if archived {
        return Plan::unchanged(Transition::AlreadyArchived);
    }

    let mut conv = existing.unwrap_or_else(|| Conversation::new(event.number.clone()));
    if conv.has_processed(&event.id) {
        return Plan::unchanged(Transition::Duplicate);
    }

    conv.in_count = conv.in_count.saturating_add(1);
    if let Some(threshold) = script.min_in_before_reply {
        if conv.in_count < threshold {
            conv.mark_processed(&event.id, processed_ids_cap);
            return Plan {
                transition: Transition::BelowThreshold {
                    in_count: conv.in_count,
                    threshold,
                },
                write: StateWrite::Upsert(conv),
            };
        }
    }

    conv.device = Some(event.device.clone());

    let from_step = conv.step;
    let Some(step) = script.step(from_step) else {
        return Plan {
            transition: Transition::ForceArchived { step: from_step },
            write: StateWrite::ArchiveAndDelete,
        };
    };

    let reply = if step.text.trim().is_empty() {
        None
    } else {
        Some(Reply {
            text: render(step.text, &event.number, &event.device),
            message_type: step.message_type,
        })
    };

    let to_step = from_step + 1;
    let archived = to_step >= script.step_count();
    let write = if archived {
        StateWrite::ArchiveAndDelete
    } else {
        conv.step = to_step;
        conv.mark_processed(&event.id, processed_ids_cap);
        StateWrite::Upsert(conv)
    };

    Plan {
        transition: Transition::Advanced {
            from_step,
            to_step,
            reply,
            archived,
        },
        write,
    }
}
