use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::Event;

/// Reacts to one event type.
///
/// Handlers are bound to exactly one `E` at registration time and are invoked
/// by the bus for every published `E` (and never for any other type).
///
/// ## Failure
///
/// Returning an error stops dispatch of the current event: handlers registered
/// after this one are skipped and the error surfaces to the publisher. The
/// publishing operation has usually committed its own writes already, so a
/// handler is frequently the only thing standing between a completed business
/// action and the modules that should observe it. Handlers must tolerate being
/// invoked once and only once (delivery is at-most-once).
///
/// ## Cancellation
///
/// The token is advisory. Check it at natural suspension points; the bus
/// already checks it before invoking each handler.
#[async_trait]
pub trait EventHandler<E: Event>: Send + Sync {
    async fn handle(&self, event: &E, cancel: &CancellationToken) -> anyhow::Result<()>;

    /// Name used in logs and errors.
    fn name(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}
