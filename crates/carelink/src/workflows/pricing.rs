use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::domain::{CategoryId, Money, ShiftType};
use super::error::{MarketplaceError, RepositoryError};

/// Catalog entry for one category × shift combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingRule {
    pub category_id: CategoryId,
    pub shift_type: ShiftType,
    pub price: Money,
    pub active: bool,
}

/// Read side of the admin-managed pricing catalog.
pub trait PricingCatalog: Send + Sync {
    fn rule(
        &self,
        category: &CategoryId,
        shift: ShiftType,
    ) -> Result<Option<PricingRule>, RepositoryError>;
}

/// Price resolved for a booking; copied onto the request at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub category_id: CategoryId,
    pub shift_type: ShiftType,
    pub total: Money,
}

/// Computes booking prices from the catalog and what a provider offers.
#[derive(Clone)]
pub struct PricingResolver {
    catalog: Arc<dyn PricingCatalog>,
}

impl PricingResolver {
    pub fn new(catalog: Arc<dyn PricingCatalog>) -> Self {
        Self { catalog }
    }

    pub fn quote(
        &self,
        offered: &[CategoryId],
        category: &CategoryId,
        shift: ShiftType,
    ) -> Result<PriceQuote, MarketplaceError> {
        if !offered.contains(category) {
            return Err(MarketplaceError::validation(format!(
                "provider does not offer category {category}"
            )));
        }

        let rule = self
            .catalog
            .rule(category, shift)?
            .filter(|rule| rule.active && !rule.price.is_zero())
            .ok_or_else(|| {
                MarketplaceError::validation(format!(
                    "no active pricing for category {category} ({})",
                    shift.label()
                ))
            })?;

        Ok(PriceQuote {
            category_id: rule.category_id,
            shift_type: rule.shift_type,
            total: rule.price,
        })
    }
}
