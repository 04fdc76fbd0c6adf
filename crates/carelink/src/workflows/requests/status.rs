use serde::{Deserialize, Serialize};

use crate::workflows::domain::Role;

/// Lifecycle of a booking. `Accepted` doubles as "awaiting payment".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
    Paid,
    InProgress,
    Completed,
    CancelledByClient,
}

impl RequestStatus {
    pub const fn ordered() -> [Self; 7] {
        [
            Self::Pending,
            Self::Accepted,
            Self::Rejected,
            Self::Paid,
            Self::InProgress,
            Self::Completed,
            Self::CancelledByClient,
        ]
    }

    /// Stable integer code exposed to clients.
    pub const fn code(self) -> u8 {
        match self {
            Self::Pending => 1,
            Self::Accepted => 2,
            Self::Rejected => 3,
            Self::Paid => 4,
            Self::InProgress => 5,
            Self::Completed => 6,
            Self::CancelledByClient => 7,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ordered()
            .into_iter()
            .find(|status| status.code() == code)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Accepted => "Accepted - awaiting payment",
            Self::Rejected => "Rejected",
            Self::Paid => "Paid",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::CancelledByClient => "Cancelled by client",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Rejected | Self::Completed | Self::CancelledByClient
        )
    }

    /// Statuses that still hold a date on the provider's calendar.
    pub const fn blocks_calendar(self) -> bool {
        matches!(self, Self::Pending | Self::Accepted)
    }

    /// Single source of truth for legal moves.
    pub const fn apply(self, action: RequestAction) -> Option<RequestStatus> {
        use RequestAction as A;
        use RequestStatus as S;

        match (self, action) {
            (S::Pending, A::Accept) => Some(S::Accepted),
            (S::Pending, A::Reject) => Some(S::Rejected),
            (S::Pending, A::Cancel) | (S::Accepted, A::Cancel) => Some(S::CancelledByClient),
            (S::Accepted, A::ConfirmPayment) => Some(S::Paid),
            (S::Paid, A::Start) => Some(S::InProgress),
            (S::InProgress, A::Complete) => Some(S::Completed),
            _ => None,
        }
    }
}

/// Who may drive a given action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Performer {
    Party(Role),
    /// Only the trusted payment-processor integration.
    Processor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestAction {
    Accept,
    Reject,
    Cancel,
    ConfirmPayment,
    Start,
    Complete,
}

impl RequestAction {
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Reject => "reject",
            Self::Cancel => "cancel",
            Self::ConfirmPayment => "confirm payment for",
            Self::Start => "start",
            Self::Complete => "complete",
        }
    }

    pub const fn performer(self) -> Performer {
        match self {
            Self::Accept | Self::Reject | Self::Start | Self::Complete => {
                Performer::Party(Role::Provider)
            }
            Self::Cancel => Performer::Party(Role::Client),
            Self::ConfirmPayment => Performer::Processor,
        }
    }
}
