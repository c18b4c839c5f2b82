use async_trait::async_trait;
use shopfront_shared::{Order, ProvisionedAccount};

use crate::BoxError;

/// Why a provisioning call did not yield an account
#[derive(Debug, thiserror::Error)]
pub enum ProvisioningFault {
    /// The create request never took effect; retrying is safe
    #[error("{0}")]
    Refused(BoxError),

    /// The create request may have been applied; the account may exist
    #[error("outcome unknown: {0}")]
    Indeterminate(BoxError),
}

impl ProvisioningFault {
    pub fn refused(err: impl Into<BoxError>) -> Self {
        ProvisioningFault::Refused(err.into())
    }

    pub fn indeterminate(err: impl Into<BoxError>) -> Self {
        ProvisioningFault::Indeterminate(err.into())
    }
}

#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Create the proxy account that fulfills `order` on the given inbounds.
    ///
    /// `Refused` guarantees no account was created. Anything that fails after
    /// the create request may have reached the remote side is `Indeterminate`.
    /// Implementations own their transport-level timeouts; the caller applies
    /// an overall deadline too.
    async fn provision(
        &self,
        order: &Order,
        inbound_ids: &[i64],
    ) -> Result<ProvisionedAccount, ProvisioningFault>;
}
