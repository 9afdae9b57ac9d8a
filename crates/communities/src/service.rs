use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::info;

use agora_core::{CommunityId, DomainError, UserId};
use agora_infra::OperationScope;

use crate::community::{Community, CreateCommunity, JoinCommunity, Membership};
use crate::store::CommunitiesContext;

#[derive(Debug, Error)]
pub enum CommunityError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The operation was not started from a provider that includes the communities module.
    #[error("operation {0} has no communities context attached")]
    NotAttached(agora_core::OperationId),

    #[error("failed to stage community changes")]
    Staging(#[source] anyhow::Error),
}

/// Community use cases, run inside an [`OperationScope`].
///
/// Nothing is persisted or announced until the caller completes the scope.
#[derive(Debug, Clone)]
pub struct CommunityService {
    max_members: usize,
}

impl CommunityService {
    pub fn new(max_members: usize) -> Self {
        Self { max_members }
    }

    pub fn max_members(&self) -> usize {
        self.max_members
    }

    fn context(scope: &OperationScope) -> Result<Arc<CommunitiesContext>, CommunityError> {
        scope
            .participant::<CommunitiesContext>(CommunitiesContext::NAME)
            .ok_or(CommunityError::NotAttached(scope.id()))
    }

    pub fn create_community(
        &self,
        scope: &mut OperationScope,
        name: &str,
        created_by: UserId,
    ) -> Result<CommunityId, CommunityError> {
        let context = Self::context(scope)?;
        let (community, event) = Community::create(&CreateCommunity {
            community_id: CommunityId::new(),
            name: name.to_string(),
            created_by,
            occurred_at: Utc::now(),
        })?;

        let id = event.community_id;
        context
            .stage_community(community)
            .map_err(CommunityError::Staging)?;
        scope.raise(event);

        info!(operation_id = %scope.id(), community_id = %id, "community staged");
        Ok(id)
    }

    pub fn join(
        &self,
        scope: &mut OperationScope,
        community_id: CommunityId,
        user_id: UserId,
    ) -> Result<Membership, CommunityError> {
        let context = Self::context(scope)?;
        let community = context
            .community(&community_id)
            .ok_or_else(DomainError::not_found)?;

        let (membership, event) = community.join(
            &JoinCommunity {
                community_id,
                user_id,
                occurred_at: Utc::now(),
            },
            context.is_member(community_id, user_id),
            context.member_count(community_id),
            self.max_members,
        )?;

        context
            .stage_membership(membership.clone())
            .map_err(CommunityError::Staging)?;
        scope.raise(event);

        info!(operation_id = %scope.id(), community_id = %community_id, user_id = %user_id, "membership staged");
        Ok(membership)
    }
}
