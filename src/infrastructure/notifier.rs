use crate::infrastructure::error::InfraError;
use async_trait::async_trait;

/// Delivery channel for phase-completion messages. The core treats
/// delivery as fire-and-forget: failures from either method are ignored
/// by callers.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Ask the platform for permission to show notifications. Called once
    /// at startup.
    async fn request_permission(&self) -> Result<(), InfraError>;

    async fn notify(&self, message: &str) -> Result<(), InfraError>;
}

/// Swallows every notification. Stands in when the composition shell has
/// no delivery channel wired up.
#[derive(Debug, Default)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn request_permission(&self) -> Result<(), InfraError> {
        Ok(())
    }

    async fn notify(&self, _message: &str) -> Result<(), InfraError> {
        Ok(())
    }
}
