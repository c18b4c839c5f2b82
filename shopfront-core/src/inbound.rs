use async_trait::async_trait;
use shopfront_shared::Inbound;

use crate::RepoResult;

/// Source of the inbounds currently configured on the proxy panel
#[async_trait]
pub trait InboundSource: Send + Sync {
    async fn list_inbounds(&self) -> RepoResult<Vec<Inbound>>;
}
