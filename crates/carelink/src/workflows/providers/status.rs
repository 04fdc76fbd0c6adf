use serde::{Deserialize, Serialize};

/// Vetting status of a provider application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    UnderReview,
    Approved,
    Rejected,
    RequiresMoreInfo,
}

impl ApplicationStatus {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Pending,
            Self::UnderReview,
            Self::Approved,
            Self::Rejected,
            Self::RequiresMoreInfo,
        ]
    }

    pub const fn code(self) -> u8 {
        match self {
            Self::Pending => 1,
            Self::UnderReview => 2,
            Self::Approved => 3,
            Self::Rejected => 4,
            Self::RequiresMoreInfo => 5,
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
            Self::UnderReview => "Under Review",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::RequiresMoreInfo => "Requires More Info",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    /// Applications in these states still occupy the provider's single open slot.
    pub const fn is_open(self) -> bool {
        !matches!(self, Self::Rejected)
    }

    pub const fn apply(self, action: ApplicationAction) -> Option<ApplicationStatus> {
        use ApplicationAction as A;
        use ApplicationStatus as S;

        match (self, action) {
            (S::Pending, A::BeginReview) => Some(S::UnderReview),
            (S::Pending | S::UnderReview, A::Approve) => Some(S::Approved),
            (S::Pending | S::UnderReview, A::Reject) => Some(S::Rejected),
            (S::Pending | S::UnderReview, A::RequestMoreInfo) => Some(S::RequiresMoreInfo),
            (S::RequiresMoreInfo, A::Resubmit) => Some(S::UnderReview),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationAction {
    BeginReview,
    Approve,
    Reject,
    RequestMoreInfo,
    Resubmit,
}

impl ApplicationAction {
    pub const fn verb(self) -> &'static str {
        match self {
            Self::BeginReview => "begin review of",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::RequestMoreInfo => "request more info on",
            Self::Resubmit => "resubmit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decided_applications_accept_no_action() {
        for status in [ApplicationStatus::Approved, ApplicationStatus::Rejected] {
            for action in [
                ApplicationAction::BeginReview,
                ApplicationAction::Approve,
                ApplicationAction::Reject,
                ApplicationAction::RequestMoreInfo,
                ApplicationAction::Resubmit,
            ] {
                assert_eq!(status.apply(action), None, "{status:?} {action:?}");
            }
        }
    }

    #[test]
    fn more_info_cycles_back_into_review() {
        let status = ApplicationStatus::UnderReview
            .apply(ApplicationAction::RequestMoreInfo)
            .and_then(|status| status.apply(ApplicationAction::Resubmit));
        assert_eq!(status, Some(ApplicationStatus::UnderReview));
        assert_eq!(
            ApplicationStatus::RequiresMoreInfo.apply(ApplicationAction::Approve),
            None
        );
    }
}
