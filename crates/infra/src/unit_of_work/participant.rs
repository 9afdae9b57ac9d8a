use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// A persistence boundary with pending writes for the current logical operation.
///
/// Participants are created per operation and shared (via `Arc`) between the
/// module's repositories, which stage changes, and the unit of work, which
/// commits them. They are never reused across operations.
///
/// ## Implementation requirements
///
/// - `commit` with nothing pending must succeed as a no-op
/// - if `cancel` is already cancelled when `commit` starts, abort without
///   applying anything
/// - a participant commits only its own changes; it must not assume anything
///   about the participants committed before or after it
#[async_trait]
pub trait Participant: Send + Sync {
    /// Name of the persistence boundary (used in logs and errors).
    fn name(&self) -> &str;

    /// Whether any changes are staged. Informational; `commit` is called regardless.
    fn has_pending_changes(&self) -> bool;

    async fn commit(&self, cancel: &CancellationToken) -> anyhow::Result<()>;
}

#[async_trait]
impl<P> Participant for Arc<P>
where
    P: Participant + ?Sized,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    fn has_pending_changes(&self) -> bool {
        (**self).has_pending_changes()
    }

    async fn commit(&self, cancel: &CancellationToken) -> anyhow::Result<()> {
        (**self).commit(cancel).await
    }
}
