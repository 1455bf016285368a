use crate::{errors::ServiceError, events::EventSender, store::RecordStore};
use async_trait::async_trait;
use std::sync::Arc;

/// Command trait for implementing the Command Pattern
///
/// Each pipeline operation is a validated command object that performs all of
/// its checks before the first write and publishes domain events on success.
#[async_trait]
pub trait Command: Send + Sync {
    /// The return type of the command when executed successfully
    type Result;

    /// Execute the command with the given dependencies
    ///
    /// # Arguments
    /// * `store` - Record store gateway for persistence operations
    /// * `event_sender` - Channel to publish domain events
    async fn execute(
        &self,
        store: Arc<dyn RecordStore>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError>;
}

pub mod breakdown;
pub mod orders;
pub mod propagation;
pub mod purchaseorders;
pub mod quality;
pub mod receiving;
pub mod shipments;
