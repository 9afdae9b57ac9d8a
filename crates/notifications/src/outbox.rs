use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agora_core::{CommunityId, UserId};
use agora_infra::unit_of_work::{InMemoryParticipant, InMemoryTable};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: UserId,
    pub community_id: CommunityId,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

type OutboxKey = (UserId, CommunityId);

/// Notifications waiting to be delivered, one per recipient and community.
#[derive(Debug, Clone, Default)]
pub struct NotificationOutbox {
    table: Arc<InMemoryTable<OutboxKey, Notification>>,
}

impl NotificationOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_recipient(&self, recipient: UserId) -> Vec<Notification> {
        let mut found = self.table.filter(|(user, _), _| *user == recipient);
        found.sort_by_key(|n| n.created_at);
        found
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub(crate) fn participant(&self) -> InMemoryParticipant<OutboxKey, Notification> {
        InMemoryParticipant::new("notifications.outbox", self.table.clone())
    }
}
