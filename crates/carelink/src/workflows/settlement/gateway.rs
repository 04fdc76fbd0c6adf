use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use super::repository::{PaymentGateway, ProcessorSession};
use crate::workflows::domain::{ExternalSessionId, Money};
use crate::workflows::error::GatewayError;
use crate::workflows::requests::ServiceRequest;

/// Hosted-checkout adapter that mints session ids locally and points clients at
/// `{base_url}/{session}`. Used by the demo server and tests; a processor SDK slots in
/// behind the same trait.
pub struct HostedCheckoutGateway {
    base_url: String,
    sequence: AtomicU64,
}

impl HostedCheckoutGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            sequence: AtomicU64::new(1),
        }
    }
}

impl PaymentGateway for HostedCheckoutGateway {
    fn create_checkout(
        &self,
        request: &ServiceRequest,
        amount: Money,
        currency: &str,
    ) -> Result<ProcessorSession, GatewayError> {
        if amount.is_zero() {
            return Err(GatewayError::Rejected(format!(
                "request {} has nothing to charge",
                request.id
            )));
        }
        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        let external_id = ExternalSessionId(format!("cs_{id:06}"));
        debug!(request_id = %request.id, session = %external_id, %amount, currency, "hosted checkout created");
        Ok(ProcessorSession {
            checkout_url: format!("{}/{}", self.base_url, external_id),
            external_id,
        })
    }

    fn expire_checkout(&self, id: &ExternalSessionId) -> Result<(), GatewayError> {
        debug!(session = %id, "hosted checkout expired");
        Ok(())
    }
}
