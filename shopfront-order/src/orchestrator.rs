use shopfront_core::{Provisioner, ProvisioningFault};
use shopfront_shared::{Order, ProvisionedAccount};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// The provisioner reported that no account was created
    #[error("provisioner failed: {0}")]
    Failed(String),

    /// The provisioner may have acted before failing
    #[error("provisioner outcome unknown: {0}")]
    Indeterminate(String),

    #[error("provisioner did not answer within {0:?}")]
    TimedOut(Duration),

    #[error("provisioner returned an incomplete account identity")]
    Incomplete,
}

impl ProvisionError {
    /// Whether an account may exist despite the error
    pub fn is_ambiguous(&self) -> bool {
        !matches!(self, ProvisionError::Failed(_))
    }
}

/// Calls the provisioner under a deadline
pub struct ProvisioningOrchestrator {
    provisioner: Arc<dyn Provisioner>,
    timeout: Duration,
}

impl ProvisioningOrchestrator {
    pub fn new(provisioner: Arc<dyn Provisioner>, timeout: Duration) -> Self {
        Self { provisioner, timeout }
    }

    pub async fn provision(
        &self,
        order: &Order,
        inbound_ids: &[i64],
    ) -> Result<ProvisionedAccount, ProvisionError> {
        let account = tokio::time::timeout(self.timeout, self.provisioner.provision(order, inbound_ids))
            .await
            .map_err(|_| ProvisionError::TimedOut(self.timeout))?
            .map_err(|fault| match fault {
                ProvisioningFault::Refused(e) => ProvisionError::Failed(e.to_string()),
                ProvisioningFault::Indeterminate(e) => ProvisionError::Indeterminate(e.to_string()),
            })?;

        if !account.is_complete() {
            return Err(ProvisionError::Incomplete);
        }

        Ok(account)
    }
}
