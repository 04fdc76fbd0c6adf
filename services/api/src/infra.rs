use carelink::config::MarketplaceConfig;
use carelink::workflows::memory::InMemoryBackend;
use carelink::workflows::settlement::HostedCheckoutGateway;
use carelink::workflows::{
    CategoryId, LoggingEventPublisher, Marketplace, Money, PricingRule, RepositoryError,
    ShiftType,
};
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub(crate) const ELDERLY_CARE: &str = "elderly-care";
pub(crate) const CHILD_CARE: &str = "child-care";
pub(crate) const HOME_NURSING: &str = "home-nursing";

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Starter catalog in whole currency units per shift.
pub(crate) fn default_pricing_rules() -> Vec<PricingRule> {
    let table: [(&str, [u64; 3]); 3] = [
        (ELDERLY_CARE, [60, 200, 350]),
        (CHILD_CARE, [45, 150, 260]),
        (HOME_NURSING, [80, 280, 480]),
    ];
    table
        .into_iter()
        .flat_map(|(category, prices)| {
            ShiftType::ordered()
                .into_iter()
                .zip(prices)
                .map(move |(shift_type, units)| PricingRule {
                    category_id: CategoryId(category.to_string()),
                    shift_type,
                    price: Money::from_units(units),
                    active: true,
                })
        })
        .collect()
}

pub(crate) fn seed_catalog(backend: &InMemoryBackend) -> Result<(), RepositoryError> {
    for rule in default_pricing_rules() {
        backend.pricing.upsert(rule)?;
    }
    Ok(())
}

/// Server wiring: in-memory stores, hosted checkout, and log-backed notifications.
pub(crate) fn build_marketplace(
    config: &MarketplaceConfig,
) -> Result<(Arc<Marketplace>, InMemoryBackend), RepositoryError> {
    let backend = InMemoryBackend::default();
    seed_catalog(&backend)?;

    let gateway = Arc::new(HostedCheckoutGateway::new(config.checkout_base_url.clone()));
    let mut collaborators = backend.collaborators(gateway);
    collaborators.events = Arc::new(LoggingEventPublisher);

    Ok((Arc::new(Marketplace::new(collaborators, config)), backend))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_prices_every_category_and_shift() {
        let rules = default_pricing_rules();
        assert_eq!(rules.len(), 9);
        assert!(rules.iter().all(|rule| rule.active && !rule.price.is_zero()));
    }

    #[test]
    fn dates_parse_in_iso_format() {
        assert_eq!(
            parse_date(" 2025-12-01 "),
            Ok(NaiveDate::from_ymd_opt(2025, 12, 1).expect("valid"))
        );
        assert!(parse_date("12/01/2025").is_err());
    }
}
