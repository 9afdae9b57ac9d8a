//! In-process event bus backed by a frozen [`HandlerRegistry`].

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::bus::{EventBus, PublishError};
use crate::{Event, HandlerRegistry};

/// In-process pub/sub bus.
///
/// - No IO, no background tasks
/// - Handlers resolved per publish from an immutable registry (no locks)
/// - Sequential dispatch, first failure wins
#[derive(Debug, Clone)]
pub struct InProcessEventBus {
    registry: Arc<HandlerRegistry>,
}

impl InProcessEventBus {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }
}

impl Default for InProcessEventBus {
    fn default() -> Self {
        Self::new(Arc::new(HandlerRegistry::empty()))
    }
}

#[async_trait]
impl EventBus for InProcessEventBus {
    async fn publish<E: Event>(&self, event: &E, cancel: &CancellationToken) -> Result<(), PublishError> {
        let event_type = event.event_type();
        let handlers = self.registry.handlers_for::<E>();

        if handlers.is_empty() {
            debug!(event_type, "no handlers registered; event dropped");
            return Ok(());
        }

        for (position, entry) in handlers.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!(event_type, position, "publish cancelled; remaining handlers skipped");
                return Err(PublishError::Cancelled {
                    event_type,
                    position,
                });
            }

            debug!(event_type, handler = entry.name(), position, "dispatching event");
            if let Err(source) = entry.handler().handle(event, cancel).await {
                warn!(
                    event_type,
                    handler = entry.name(),
                    position,
                    error = %source,
                    "event handler failed; remaining handlers skipped"
                );
                return Err(PublishError::Handler {
                    event_type,
                    handler: entry.name(),
                    position,
                    source,
                });
            }
        }

        debug!(event_type, handlers = handlers.len(), "event dispatched");
        Ok(())
    }
}
