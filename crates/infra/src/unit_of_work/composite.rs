use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::Participant;

/// Outcome of a fully successful composite commit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommitReport {
    /// Participants in the order they committed.
    pub committed: Vec<String>,
}

/// Failure of a composite commit.
///
/// ## Partial commits
///
/// Participants before `position` **have already committed and are not rolled
/// back**; participants after it were never invoked. Nothing in this crate
/// retries or compensates. Callers must:
///
/// - treat a failure with [`CommitError::is_partial`] as requiring
///   reconciliation (the names are in [`CommitError::committed`]), and
/// - only retry the whole logical operation when every participant's writes
///   are idempotent.
///
/// Keep changes that must be atomic inside a single participant.
#[derive(Debug, Error)]
pub enum CommitError {
    #[error(
        "participant `{participant}` (position {position}) failed to commit; {} earlier participant(s) remain committed",
        .committed.len()
    )]
    Participant {
        position: usize,
        participant: String,
        committed: Vec<String>,
        #[source]
        source: anyhow::Error,
    },

    #[error(
        "commit cancelled before position {position}; {} earlier participant(s) remain committed",
        .committed.len()
    )]
    Cancelled { position: usize, committed: Vec<String> },
}

impl CommitError {
    /// Participants that committed before the failure, in commit order.
    pub fn committed(&self) -> &[String] {
        match self {
            CommitError::Participant { committed, .. } | CommitError::Cancelled { committed, .. } => {
                committed
            }
        }
    }

    /// Whether some participants committed (the operation's effects are partial).
    pub fn is_partial(&self) -> bool {
        !self.committed().is_empty()
    }

    /// Position of the participant that failed or was not started.
    pub fn position(&self) -> usize {
        match self {
            CommitError::Participant { position, .. } | CommitError::Cancelled { position, .. } => {
                *position
            }
        }
    }

    pub fn failed_participant(&self) -> Option<&str> {
        match self {
            CommitError::Participant { participant, .. } => Some(participant.as_str()),
            CommitError::Cancelled { .. } => None,
        }
    }
}

/// Ordered set of participants for one logical operation.
///
/// Attachment order is commit order. `commit` consumes the unit of work, so a
/// set of participants cannot be committed twice.
#[derive(Default)]
pub struct CompositeUnitOfWork {
    participants: Vec<Arc<dyn Participant>>,
}

impl CompositeUnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a participant; it commits after every participant attached before it.
    pub fn attach(&mut self, participant: Arc<dyn Participant>) -> &mut Self {
        self.participants.push(participant);
        self
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn participant_names(&self) -> Vec<String> {
        self.participants.iter().map(|p| p.name().to_string()).collect()
    }

    /// Commit every participant sequentially, stopping at the first failure.
    ///
    /// Cancellation is checked before each participant is invoked.
    pub async fn commit(self, cancel: &CancellationToken) -> Result<CommitReport, CommitError> {
        let total = self.participants.len();
        let mut committed = Vec::with_capacity(total);

        for (position, participant) in self.participants.into_iter().enumerate() {
            let name = participant.name().to_string();

            if cancel.is_cancelled() {
                warn!(
                    participant = %name,
                    position,
                    committed = committed.len(),
                    "composite commit cancelled"
                );
                return Err(CommitError::Cancelled { position, committed });
            }

            debug!(
                participant = %name,
                position,
                pending = participant.has_pending_changes(),
                "committing participant"
            );

            if let Err(source) = participant.commit(cancel).await {
                error!(
                    participant = %name,
                    position,
                    committed = committed.len(),
                    error = %source,
                    "participant commit failed; earlier participants stay committed"
                );
                return Err(CommitError::Participant {
                    position,
                    participant: name,
                    committed,
                    source,
                });
            }

            committed.push(name);
        }

        debug!(participants = total, "composite commit completed");
        Ok(CommitReport { committed })
    }
}

impl core::fmt::Debug for CompositeUnitOfWork {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CompositeUnitOfWork")
            .field("participants", &self.participant_names())
            .finish()
    }
}
