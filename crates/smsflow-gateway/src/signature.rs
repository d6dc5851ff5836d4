// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook signature verification.
//!
//! The gateway signs the raw value of the events form field with
//! HMAC-SHA256 under the shared secret and sends the base64 digest in a
//! header.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use smsflow_core::SmsflowError;

type HmacSha256 = Hmac<Sha256>;

/// Base64 HMAC-SHA256 of `body` under `secret`.
pub fn sign(secret: &[u8], body: &[u8]) -> String {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return String::new();
    };
    mac.update(body);
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Checks `header` against the signature of `body`.
///
/// The comparison runs in constant time. A header that is not valid base64
/// is a mismatch.
pub fn verify(secret: &[u8], body: &[u8], header: &str) -> bool {
    let Ok(expected) = STANDARD.decode(header.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Deployment-level signature policy.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Option<String>,
    bypass: bool,
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .field("bypass", &self.bypass)
            .finish()
    }
}

impl SignatureVerifier {
    pub fn new(secret: Option<String>, bypass: bool) -> Self {
        Self { secret, bypass }
    }

    /// Verification disabled (debug mode).
    pub fn bypassed() -> Self {
        Self::new(None, true)
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypass
    }

    /// Authorizes `body` given the received signature header.
    pub fn check(&self, body: &[u8], header: Option<&str>) -> Result<(), SmsflowError> {
        if self.bypass {
            return Ok(());
        }
        let secret = self
            .secret
            .as_deref()
            .ok_or_else(|| SmsflowError::Authorization("no signing secret configured".into()))?;
        let header = header
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| SmsflowError::Authorization("signature required".into()))?;
        if verify(secret.as_bytes(), body, header) {
            Ok(())
        } else {
            Err(SmsflowError::Authorization("invalid signature".into()))
        }
    }
}
