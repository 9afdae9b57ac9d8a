//! One logical business operation: staged writes across participants plus the
//! events to announce once those writes are committed.

use std::any::Any;
use std::sync::Arc;

use agora_core::OperationId;
use agora_events::{Event, EventBus, InProcessEventBus, PublishError};
use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::modules::services::ScopedParticipant;
use crate::unit_of_work::{CommitError, CommitReport, CompositeUnitOfWork, Participant};

#[derive(Debug, Error)]
pub enum OperationError {
    /// Nothing was published; see [`CommitError`] for what did commit.
    #[error(transparent)]
    Commit(#[from] CommitError),

    /// Every participant committed; announcing the outcome failed.
    ///
    /// `undelivered` lists the raised events after the failing one, which
    /// were never published.
    #[error("committed, but publishing `{}` failed; {} later event(s) not delivered", .source.event_type(), .undelivered.len())]
    Publish {
        #[source]
        source: PublishError,
        undelivered: Vec<&'static str>,
    },
}

/// An event waiting for its operation to commit.
#[async_trait]
trait PendingEvent: Send + Sync {
    fn event_type(&self) -> &'static str;

    async fn publish(self: Box<Self>, bus: &InProcessEventBus, cancel: &CancellationToken) -> Result<(), PublishError>;
}

struct Queued<E>(E);

#[async_trait]
impl<E: Event> PendingEvent for Queued<E> {
    fn event_type(&self) -> &'static str {
        self.0.event_type()
    }

    async fn publish(self: Box<Self>, bus: &InProcessEventBus, cancel: &CancellationToken) -> Result<(), PublishError> {
        bus.publish(&self.0, cancel).await
    }
}

/// Scope of one logical operation.
///
/// Events raised here are published only after every participant commits
/// successfully, in the order they were raised. If the commit fails they are
/// discarded.
pub struct OperationScope {
    id: OperationId,
    unit_of_work: CompositeUnitOfWork,
    /// Participants by the name they were attached under.
    typed: Vec<(String, Arc<dyn Any + Send + Sync>)>,
    events: Vec<Box<dyn PendingEvent>>,
    bus: InProcessEventBus,
}

impl OperationScope {
    pub fn new(bus: InProcessEventBus) -> Self {
        Self {
            id: OperationId::new(),
            unit_of_work: CompositeUnitOfWork::new(),
            typed: Vec::new(),
            events: Vec::new(),
            bus,
        }
    }

    pub fn id(&self) -> OperationId {
        self.id
    }

    /// Attach an additional participant; it commits after those already attached.
    pub fn attach<P>(&mut self, participant: Arc<P>) -> &mut Self
    where
        P: Participant + 'static,
    {
        let name = participant.name().to_string();
        self.unit_of_work.attach(participant.clone());
        self.typed.push((name, participant));
        self
    }

    pub(crate) fn attach_scoped(&mut self, scoped: ScopedParticipant) {
        self.unit_of_work.attach(scoped.participant);
        self.typed.push((scoped.name.to_string(), scoped.typed));
    }

    /// The participant attached under `name`, if it is a `P`.
    ///
    /// Factories registered through the service registry are attached under
    /// their registered name; [`OperationScope::attach`] uses `Participant::name`.
    pub fn participant<P>(&self, name: &str) -> Option<Arc<P>>
    where
        P: Send + Sync + 'static,
    {
        self.typed
            .iter()
            .find(|(attached, _)| attached == name)
            .and_then(|(_, any)| any.clone().downcast::<P>().ok())
    }

    pub fn participant_names(&self) -> Vec<String> {
        self.unit_of_work.participant_names()
    }

    /// Queue `event` for publication after a successful commit.
    pub fn raise<E: Event>(&mut self, event: E) -> &mut Self {
        self.events.push(Box::new(Queued(event)));
        self
    }

    pub fn pending_events(&self) -> Vec<&'static str> {
        self.events.iter().map(|e| e.event_type()).collect()
    }

    /// Commit every participant, then publish the raised events.
    pub async fn complete(self, cancel: &CancellationToken) -> Result<CommitReport, OperationError> {
        let OperationScope {
            id,
            unit_of_work,
            events,
            bus,
            ..
        } = self;

        let report = match unit_of_work.commit(cancel).await {
            Ok(report) => report,
            Err(err) => {
                warn!(
                    operation_id = %id,
                    dropped_events = events.len(),
                    error = %err,
                    "operation commit failed; raised events discarded"
                );
                return Err(err.into());
            }
        };

        let mut events = events.into_iter();
        while let Some(event) = events.next() {
            if let Err(source) = event.publish(&bus, cancel).await {
                let undelivered: Vec<&'static str> = events.map(|e| e.event_type()).collect();
                warn!(
                    operation_id = %id,
                    event_type = source.event_type(),
                    undelivered = undelivered.len(),
                    error = %source,
                    "operation committed but event publication failed"
                );
                return Err(OperationError::Publish { source, undelivered });
            }
        }

        debug!(operation_id = %id, participants = report.committed.len(), "operation completed");
        Ok(report)
    }
}

impl core::fmt::Debug for OperationScope {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OperationScope")
            .field("id", &self.id)
            .field("participants", &self.participant_names())
            .field("pending_events", &self.pending_events())
            .finish()
    }
}
