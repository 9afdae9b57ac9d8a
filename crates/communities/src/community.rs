use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agora_core::{CommunityId, DomainError, DomainResult, Entity, UserId};

use crate::events::{CommunityCreated, MemberJoined};

/// Longest accepted community name, in characters.
pub const MAX_NAME_LEN: usize = 80;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Community {
    id: CommunityId,
    name: String,
    created_by: UserId,
    created_at: DateTime<Utc>,
}

impl Entity for Community {
    type Id = CommunityId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub community_id: CommunityId,
    pub user_id: UserId,
    pub joined_at: DateTime<Utc>,
}

/// Command: CreateCommunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCommunity {
    pub community_id: CommunityId,
    pub name: String,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: JoinCommunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinCommunity {
    pub community_id: CommunityId,
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

impl Community {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_by(&self) -> UserId {
        self.created_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Validate a creation request. The creator does not become a member implicitly.
    pub fn create(cmd: &CreateCommunity) -> DomainResult<(Community, CommunityCreated)> {
        let name = cmd.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(DomainError::validation(format!(
                "name cannot exceed {MAX_NAME_LEN} characters"
            )));
        }

        let community = Community {
            id: cmd.community_id,
            name: name.to_string(),
            created_by: cmd.created_by,
            created_at: cmd.occurred_at,
        };
        let event = CommunityCreated {
            community_id: cmd.community_id,
            name: community.name.clone(),
            created_by: cmd.created_by,
            occurred_at: cmd.occurred_at,
        };
        Ok((community, event))
    }

    /// Validate a join request against the community's current membership.
    pub fn join(
        &self,
        cmd: &JoinCommunity,
        already_member: bool,
        member_count: usize,
        max_members: usize,
    ) -> DomainResult<(Membership, MemberJoined)> {
        if cmd.community_id != self.id {
            return Err(DomainError::invariant("community_id mismatch"));
        }
        if already_member {
            return Err(DomainError::conflict("user is already a member"));
        }
        if member_count >= max_members {
            return Err(DomainError::invariant(format!(
                "community is full ({max_members} members)"
            )));
        }

        let membership = Membership {
            community_id: self.id,
            user_id: cmd.user_id,
            joined_at: cmd.occurred_at,
        };
        let event = MemberJoined {
            community_id: self.id,
            user_id: cmd.user_id,
            occurred_at: cmd.occurred_at,
        };
        Ok((membership, event))
    }
}
