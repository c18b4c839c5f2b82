use serde::Serialize;
use shopfront_core::{OrderLimits, ShopSettings};
use std::sync::Arc;

use crate::CatalogError;

/// Why a custom order falls outside the configured bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum LimitViolation {
    #[error("data volume and duration must be positive")]
    NonPositive,

    #[error("data less than minimum allowed ({min} GB)")]
    DataBelowMinimum { min: i64 },

    #[error("data greater than maximum allowed ({max} GB)")]
    DataAboveMaximum { max: i64 },

    #[error("days less than minimum allowed ({min})")]
    DaysBelowMinimum { min: i64 },

    #[error("days greater than maximum allowed ({max})")]
    DaysAboveMaximum { max: i64 },
}

/// Check a custom allotment against the bounds.
///
/// Checks run in a fixed order (data before days, minimum before maximum) and
/// the first violation is reported.
pub fn check_limits(limits: &OrderLimits, data_gb: i64, days: i64) -> Result<(), LimitViolation> {
    if data_gb <= 0 || days <= 0 {
        return Err(LimitViolation::NonPositive);
    }

    let limits = limits.normalized();

    if let Some(min) = limits.min_gb {
        if data_gb < min {
            return Err(LimitViolation::DataBelowMinimum { min });
        }
    }
    if let Some(max) = limits.max_gb {
        if data_gb > max {
            return Err(LimitViolation::DataAboveMaximum { max });
        }
    }
    if let Some(min) = limits.min_days {
        if days < min {
            return Err(LimitViolation::DaysBelowMinimum { min });
        }
    }
    if let Some(max) = limits.max_days {
        if days > max {
            return Err(LimitViolation::DaysAboveMaximum { max });
        }
    }

    Ok(())
}

/// `data_gb * rate`, with unset or negative rates priced at zero
pub fn price_for(rate: Option<i64>, data_gb: i64) -> i64 {
    let rate = rate.unwrap_or(0).max(0);
    data_gb.max(0).saturating_mul(rate)
}

/// Validated and priced custom allotment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub data_gb: i64,
    pub days: i64,
    pub price: i64,
}

/// Prices custom orders from the live shop settings
pub struct PricingEngine {
    settings: Arc<dyn ShopSettings>,
}

impl PricingEngine {
    pub fn new(settings: Arc<dyn ShopSettings>) -> Self {
        Self { settings }
    }

    /// Validate a custom order against the configured bounds.
    ///
    /// If the bounds cannot be read the order is checked without them.
    pub async fn validate_custom_order(&self, data_gb: i64, days: i64) -> Result<(), CatalogError> {
        let limits = match self.settings.order_limits().await {
            Ok(limits) => limits,
            Err(e) => {
                tracing::warn!("Shop limits unavailable, validating without bounds: {}", e);
                OrderLimits::unbounded()
            }
        };

        check_limits(&limits, data_gb, days)?;
        Ok(())
    }

    pub async fn calculate_custom_price(&self, data_gb: i64) -> Result<i64, CatalogError> {
        let rate = self
            .settings
            .price_per_gb()
            .await
            .map_err(|e| CatalogError::ConfigUnavailable(e.to_string()))?;

        Ok(price_for(rate, data_gb))
    }

    /// Validate then price
    pub async fn quote(&self, data_gb: i64, days: i64) -> Result<Quote, CatalogError> {
        self.validate_custom_order(data_gb, days).await?;
        let price = self.calculate_custom_price(data_gb).await?;
        Ok(Quote { data_gb, days, price })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use shopfront_core::{CoreError, CoreResult};
    use shopfront_store::app_config::ShopRules;
    use shopfront_store::StaticSettings;

    fn limits() -> OrderLimits {
        OrderLimits {
            min_gb: Some(10),
            max_gb: Some(100),
            min_days: Some(7),
            max_days: Some(365),
        }
    }

    struct BrokenSettings;

    #[async_trait::async_trait]
    impl ShopSettings for BrokenSettings {
        async fn order_limits(&self) -> CoreResult<OrderLimits> {
            Err(CoreError::ConfigUnavailable("settings table unreachable".to_string()))
        }

        async fn price_per_gb(&self) -> CoreResult<Option<i64>> {
            Err(CoreError::ConfigUnavailable("settings table unreachable".to_string()))
        }
    }

    fn engine(rules: ShopRules) -> PricingEngine {
        PricingEngine::new(Arc::new(StaticSettings::new(rules)))
    }

    #[test]
    fn test_bounds_produce_distinct_reasons() {
        assert_eq!(
            check_limits(&limits(), 5, 30),
            Err(LimitViolation::DataBelowMinimum { min: 10 })
        );
        assert_eq!(
            check_limits(&limits(), 500, 30),
            Err(LimitViolation::DataAboveMaximum { max: 100 })
        );
        assert_eq!(
            check_limits(&limits(), 50, 3),
            Err(LimitViolation::DaysBelowMinimum { min: 7 })
        );
        assert_eq!(
            check_limits(&limits(), 50, 400),
            Err(LimitViolation::DaysAboveMaximum { max: 365 })
        );
        assert_eq!(check_limits(&limits(), 50, 30), Ok(()));
    }

    #[test]
    fn test_bounds_are_inclusive() {
        assert_eq!(check_limits(&limits(), 10, 7), Ok(()));
        assert_eq!(check_limits(&limits(), 100, 365), Ok(()));
    }

    #[test]
    fn test_unset_bounds_allow_anything_positive() {
        assert_eq!(check_limits(&OrderLimits::unbounded(), 100_000, 9_999), Ok(()));
        assert_eq!(
            check_limits(&OrderLimits::unbounded(), 0, 30),
            Err(LimitViolation::NonPositive)
        );
    }

    #[test]
    fn test_negative_rate_is_clamped() {
        assert_eq!(price_for(Some(-500), 40), 0);
        assert_eq!(price_for(None, 40), 0);
        assert_eq!(price_for(Some(3_000), 40), 120_000);
    }

    #[test]
    fn test_violation_serializes_with_reason_tag() {
        let json = serde_json::to_value(LimitViolation::DaysAboveMaximum { max: 365 }).unwrap();
        assert_eq!(json["reason"], "days_above_maximum");
        assert_eq!(json["max"], 365);
    }

    proptest! {
        #[test]
        fn prop_price_is_monotonic(rate in 0i64..1_000_000, a in 0i64..1_000_000, b in 0i64..1_000_000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(price_for(Some(rate), lo) <= price_for(Some(rate), hi));
        }

        #[test]
        fn prop_price_is_never_negative(rate in any::<i64>(), data_gb in any::<i64>()) {
            prop_assert!(price_for(Some(rate), data_gb) >= 0);
        }
    }

    #[tokio::test]
    async fn test_quote_uses_configured_rate() {
        let engine = engine(ShopRules {
            min_gb: Some(10),
            max_gb: Some(100),
            min_days: Some(7),
            max_days: Some(365),
            price_per_gb: Some(2_500),
        });

        let quote = engine.quote(50, 30).await.unwrap();
        assert_eq!(quote, Quote { data_gb: 50, days: 30, price: 125_000 });

        let err = engine.quote(5, 30).await.unwrap_err();
        assert!(matches!(
            err,
            CatalogError::OutOfRange(LimitViolation::DataBelowMinimum { min: 10 })
        ));
    }

    #[tokio::test]
    async fn test_unreadable_rate_is_config_unavailable() {
        let engine = PricingEngine::new(Arc::new(BrokenSettings));

        // bounds fall back to none, the price cannot
        engine.validate_custom_order(5_000, 1).await.unwrap();
        let err = engine.calculate_custom_price(10).await.unwrap_err();
        assert!(matches!(err, CatalogError::ConfigUnavailable(_)));
    }
}
