use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::domain::{ExternalSessionId, Money, RequestId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Created,
    Succeeded,
    Cancelled,
}

impl SessionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Succeeded => "succeeded",
            Self::Cancelled => "cancelled",
        }
    }
}

/// One attempt to collect payment for a request through the processor's hosted checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSession {
    pub external_id: ExternalSessionId,
    pub request_id: RequestId,
    pub amount: Money,
    pub currency: String,
    pub status: SessionStatus,
    pub checkout_url: String,
    pub created_at: DateTime<Utc>,
    pub finalized_at: Option<DateTime<Utc>>,
}

/// Where to send the client to pay. Opening checkout never changes request status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutReference {
    pub external_session_id: ExternalSessionId,
    pub redirect_url: String,
    pub amount: Money,
    pub currency: String,
}

impl From<&PaymentSession> for CheckoutReference {
    fn from(session: &PaymentSession) -> Self {
        Self {
            external_session_id: session.external_id.clone(),
            redirect_url: session.checkout_url.clone(),
            amount: session.amount,
            currency: session.currency.clone(),
        }
    }
}

/// Outcome reported by the processor for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Succeeded,
    Cancelled,
    Failed,
    Expired,
}

impl PaymentOutcome {
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// What a callback delivery did. Every variant is a success from the processor's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackResolution {
    /// State changed as a result of this delivery.
    Applied,
    /// Replay of an outcome that was already applied.
    Duplicate,
    /// Outcome contradicts an already-final session and was discarded.
    Ignored,
    /// Money moved but the booking cannot absorb it; an operator alert was raised.
    RequiresOperator,
}
