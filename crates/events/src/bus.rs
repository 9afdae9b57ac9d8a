//! Event publishing abstraction.
//!
//! The bus is in-process and non-durable:
//!
//! - **Exact-type dispatch**: a handler bound to `A` never sees a `B`
//! - **Sequential**: handler *i+1* starts only after handler *i* completes
//! - **Shared failure**: the first failing handler aborts the dispatch; later
//!   handlers are skipped and the error surfaces to the publisher
//! - **At-most-once**: no outbox, no retry, no persistence. An event published
//!   with no handlers (or lost to a crash) is gone
//!
//! Publishing an event nobody listens to is a successful no-op.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::Event;

/// Failure of a single publish call.
#[derive(Debug, Error)]
pub enum PublishError {
    /// A handler failed; handlers after `position` were not invoked.
    #[error("handler `{handler}` (position {position}) failed for event `{event_type}`")]
    Handler {
        event_type: &'static str,
        handler: &'static str,
        position: usize,
        #[source]
        source: anyhow::Error,
    },

    /// Cancellation was observed before invoking the handler at `position`.
    #[error("publish of `{event_type}` cancelled before handler at position {position}")]
    Cancelled {
        event_type: &'static str,
        position: usize,
    },
}

impl PublishError {
    pub fn event_type(&self) -> &'static str {
        match self {
            PublishError::Handler { event_type, .. } | PublishError::Cancelled { event_type, .. } => {
                *event_type
            }
        }
    }

    /// Number of handlers that completed successfully before the failure.
    pub fn completed_handlers(&self) -> usize {
        match self {
            PublishError::Handler { position, .. } | PublishError::Cancelled { position, .. } => {
                *position
            }
        }
    }
}

/// Domain-agnostic event bus.
///
/// `publish` is synchronous from the caller's point of view: it returns once
/// every resolved handler has completed, or as soon as one fails. Its latency
/// is the sum of the handlers' latencies.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish<E: Event>(&self, event: &E, cancel: &CancellationToken) -> Result<(), PublishError>;
}

#[async_trait]
impl<B> EventBus for Arc<B>
where
    B: EventBus,
{
    async fn publish<E: Event>(&self, event: &E, cancel: &CancellationToken) -> Result<(), PublishError> {
        (**self).publish(event, cancel).await
    }
}
