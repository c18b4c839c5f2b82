use serde::Serialize;
use shopfront_core::{InboundSource, ShopInboundRepository};
use shopfront_shared::{Inbound, ShopInbound};
use std::collections::HashMap;
use std::sync::Arc;

use crate::CatalogError;

/// How the override table is interpreted for one query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisibilityMode {
    /// No override rows: every configured inbound is offered
    DefaultAllow,
    /// Override rows are authoritative; inbounds without a row are hidden
    Explicit,
}

impl VisibilityMode {
    pub fn from_overrides(overrides: &[ShopInbound]) -> Self {
        if overrides.is_empty() {
            VisibilityMode::DefaultAllow
        } else {
            VisibilityMode::Explicit
        }
    }
}

/// An inbound together with its storefront availability
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InboundOption {
    pub id: i64,
    pub remark: String,
    pub protocol: String,
    pub port: i64,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InboundListing {
    pub mode: VisibilityMode,
    /// Sorted by inbound id, ascending
    pub options: Vec<InboundOption>,
}

/// Compute the enabled state of every inbound
pub fn resolve_listing(inbounds: Vec<Inbound>, overrides: &[ShopInbound]) -> InboundListing {
    let mode = VisibilityMode::from_overrides(overrides);
    let enabled_by_inbound: HashMap<i64, bool> = overrides
        .iter()
        .map(|row| (row.inbound_id, row.enabled))
        .collect();

    let mut options: Vec<InboundOption> = inbounds
        .into_iter()
        .map(|inbound| {
            let enabled = match mode {
                VisibilityMode::DefaultAllow => true,
                VisibilityMode::Explicit => {
                    enabled_by_inbound.get(&inbound.id).copied().unwrap_or(false)
                }
            };
            InboundOption {
                id: inbound.id,
                remark: inbound.remark,
                protocol: inbound.protocol,
                port: inbound.port,
                enabled,
            }
        })
        .collect();

    options.sort_by_key(|option| option.id);

    InboundListing { mode, options }
}

/// Storefront visibility of panel inbounds
pub struct InboundVisibility {
    source: Arc<dyn InboundSource>,
    overrides: Arc<dyn ShopInboundRepository>,
}

impl InboundVisibility {
    pub fn new(source: Arc<dyn InboundSource>, overrides: Arc<dyn ShopInboundRepository>) -> Self {
        Self { source, overrides }
    }

    pub async fn listing(&self) -> Result<InboundListing, CatalogError> {
        let inbounds = self
            .source
            .list_inbounds()
            .await
            .map_err(|e| CatalogError::Source(e.to_string()))?;

        let overrides = self
            .overrides
            .list_overrides()
            .await
            .map_err(|e| CatalogError::Persistence(e.to_string()))?;

        Ok(resolve_listing(inbounds, &overrides))
    }

    pub async fn list_inbound_options(&self) -> Result<Vec<InboundOption>, CatalogError> {
        Ok(self.listing().await?.options)
    }

    /// Ids of the inbounds currently offered, ascending
    pub async fn enabled_inbound_ids(&self) -> Result<Vec<i64>, CatalogError> {
        Ok(self
            .list_inbound_options()
            .await?
            .into_iter()
            .filter(|option| option.enabled)
            .map(|option| option.id)
            .collect())
    }

    /// Upsert the override row of a configured inbound
    pub async fn set_inbound_enabled(
        &self,
        inbound_id: i64,
        enabled: bool,
    ) -> Result<ShopInbound, CatalogError> {
        let inbounds = self
            .source
            .list_inbounds()
            .await
            .map_err(|e| CatalogError::Source(e.to_string()))?;

        if !inbounds.iter().any(|inbound| inbound.id == inbound_id) {
            return Err(CatalogError::NotFound("Inbound", inbound_id));
        }

        let row = self
            .overrides
            .upsert_override(inbound_id, enabled)
            .await
            .map_err(|e| CatalogError::Persistence(e.to_string()))?;

        tracing::info!("Storefront inbound {} enabled={}", inbound_id, enabled);
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopfront_store::memory::{MemoryShopInboundRepository, StaticInboundSource};

    fn inbound(id: i64, port: i64) -> Inbound {
        Inbound {
            id,
            remark: format!("inbound-{}", id),
            protocol: "vless".to_string(),
            port,
        }
    }

    fn visibility() -> (InboundVisibility, Arc<MemoryShopInboundRepository>) {
        let source = Arc::new(StaticInboundSource::new(vec![
            inbound(5, 8443),
            inbound(1, 443),
            inbound(3, 2053),
        ]));
        let overrides = Arc::new(MemoryShopInboundRepository::new());
        (InboundVisibility::new(source, overrides.clone()), overrides)
    }

    #[tokio::test]
    async fn test_no_overrides_enables_everything() {
        let (visibility, _) = visibility();

        let listing = visibility.listing().await.unwrap();
        assert_eq!(listing.mode, VisibilityMode::DefaultAllow);
        assert!(listing.options.iter().all(|o| o.enabled));
        let ids: Vec<i64> = listing.options.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![1, 3, 5]);
    }

    #[tokio::test]
    async fn test_single_override_switches_to_explicit() {
        let (visibility, _) = visibility();

        visibility.set_inbound_enabled(3, true).await.unwrap();

        let listing = visibility.listing().await.unwrap();
        assert_eq!(listing.mode, VisibilityMode::Explicit);
        let enabled: Vec<(i64, bool)> = listing.options.iter().map(|o| (o.id, o.enabled)).collect();
        assert_eq!(enabled, vec![(1, false), (3, true), (5, false)]);
        assert_eq!(visibility.enabled_inbound_ids().await.unwrap(), vec![3]);
    }

    #[tokio::test]
    async fn test_disabling_only_override_hides_everything() {
        let (visibility, _) = visibility();

        visibility.set_inbound_enabled(1, false).await.unwrap();

        assert!(visibility.enabled_inbound_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_inbound_enabled_updates_existing_row() {
        let (visibility, overrides) = visibility();

        let first = visibility.set_inbound_enabled(5, true).await.unwrap();
        let second = visibility.set_inbound_enabled(5, false).await.unwrap();

        assert_eq!(first.id, second.id);
        assert!(!second.enabled);
        assert_eq!(overrides.list_overrides().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_inbound_is_not_found() {
        let (visibility, overrides) = visibility();

        let err = visibility.set_inbound_enabled(99, true).await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound("Inbound", 99)));
        assert!(overrides.list_overrides().await.unwrap().is_empty());
    }

    #[test]
    fn test_resolve_listing_ignores_rows_for_missing_inbounds() {
        let now = chrono::Utc::now();
        let overrides = vec![ShopInbound {
            id: 1,
            inbound_id: 42,
            enabled: true,
            created_at: now,
            updated_at: now,
        }];

        let listing = resolve_listing(vec![inbound(1, 443)], &overrides);
        assert_eq!(listing.mode, VisibilityMode::Explicit);
        assert_eq!(listing.options.len(), 1);
        assert!(!listing.options[0].enabled);
    }
}
