//! Persistence boundary of the communities module.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use agora_core::{CommunityId, Entity, UserId};
use agora_infra::unit_of_work::{InMemoryParticipant, InMemoryTable, Participant};

use crate::community::{Community, Membership};

type CommunityTable = InMemoryTable<CommunityId, Community>;
type MembershipTable = InMemoryTable<(CommunityId, UserId), Membership>;

/// Committed communities and memberships, shared across operations.
///
/// Registered as a service so other modules can read the directory; writes go
/// through a [`CommunitiesContext`].
#[derive(Debug, Clone, Default)]
pub struct CommunitiesStore {
    communities: Arc<CommunityTable>,
    memberships: Arc<MembershipTable>,
}

impl CommunitiesStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn community(&self, id: &CommunityId) -> Option<Community> {
        self.communities.get(id)
    }

    pub fn is_member(&self, community_id: CommunityId, user_id: UserId) -> bool {
        self.memberships.contains(&(community_id, user_id))
    }

    pub fn members(&self, community_id: CommunityId) -> Vec<Membership> {
        let mut members = self
            .memberships
            .filter(|(community, _), _| *community == community_id);
        members.sort_by_key(|m| m.joined_at);
        members
    }

    pub fn community_count(&self) -> usize {
        self.communities.len()
    }

    /// Open a per-operation context over this store.
    pub fn context(&self) -> CommunitiesContext {
        CommunitiesContext {
            communities: InMemoryParticipant::new("communities", self.communities.clone()),
            memberships: InMemoryParticipant::new("memberships", self.memberships.clone()),
        }
    }
}

/// Staged community writes for one operation; reads see them first.
#[derive(Debug)]
pub struct CommunitiesContext {
    communities: InMemoryParticipant<CommunityId, Community>,
    memberships: InMemoryParticipant<(CommunityId, UserId), Membership>,
}

impl CommunitiesContext {
    /// Name the context is registered and committed under.
    pub const NAME: &'static str = "communities";

    pub fn community(&self, id: &CommunityId) -> Option<Community> {
        self.communities.get(id)
    }

    pub fn is_member(&self, community_id: CommunityId, user_id: UserId) -> bool {
        self.memberships.get(&(community_id, user_id)).is_some()
    }

    /// Committed members plus memberships staged in this operation.
    pub fn member_count(&self, community_id: CommunityId) -> usize {
        let in_community = |key: &(CommunityId, UserId), _: &Membership| key.0 == community_id;
        self.memberships.table().filter(in_community).len() + self.memberships.staged(in_community).len()
    }

    pub fn stage_community(&self, community: Community) -> anyhow::Result<()> {
        self.communities.stage_upsert(*community.id(), community)
    }

    pub fn stage_membership(&self, membership: Membership) -> anyhow::Result<()> {
        self.memberships
            .stage_upsert((membership.community_id, membership.user_id), membership)
    }
}

#[async_trait]
impl Participant for CommunitiesContext {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn has_pending_changes(&self) -> bool {
        self.communities.has_pending_changes() || self.memberships.has_pending_changes()
    }

    /// Cancellation is checked once for both tables, so either both are applied
    /// or neither is. Communities go first: a membership never references a
    /// community that failed to apply.
    async fn commit(&self, cancel: &CancellationToken) -> anyhow::Result<()> {
        if cancel.is_cancelled() {
            anyhow::bail!("{}: cancelled before commit; nothing applied", Self::NAME);
        }
        self.communities.apply_pending()?;
        self.memberships.apply_pending()
    }
}
