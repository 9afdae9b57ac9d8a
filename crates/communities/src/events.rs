use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agora_core::{CommunityId, UserId};
use agora_events::Event;

/// Event: CommunityCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityCreated {
    pub community_id: CommunityId,
    pub name: String,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

impl Event for CommunityCreated {
    fn event_type(&self) -> &'static str {
        "communities.community.created"
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

/// Event: MemberJoined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberJoined {
    pub community_id: CommunityId,
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

impl Event for MemberJoined {
    fn event_type(&self) -> &'static str {
        "communities.member.joined"
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}
