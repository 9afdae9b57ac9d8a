use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use agora_communities::{CommunitiesStore, MemberJoined};
use agora_events::EventHandler;
use agora_infra::unit_of_work::CompositeUnitOfWork;

use crate::outbox::{Notification, NotificationOutbox};

/// Queues a welcome notification for every new member.
///
/// Runs after the join has committed, so the community is always readable
/// from the shared directory.
pub struct WelcomeNotificationHandler {
    directory: Arc<CommunitiesStore>,
    outbox: NotificationOutbox,
}

impl WelcomeNotificationHandler {
    pub fn new(directory: Arc<CommunitiesStore>, outbox: NotificationOutbox) -> Self {
        Self { directory, outbox }
    }
}

#[async_trait]
impl EventHandler<MemberJoined> for WelcomeNotificationHandler {
    async fn handle(&self, event: &MemberJoined, cancel: &CancellationToken) -> anyhow::Result<()> {
        let community = self
            .directory
            .community(&event.community_id)
            .with_context(|| format!("community {} not found in directory", event.community_id))?;

        let outbox = Arc::new(self.outbox.participant());
        outbox.stage_upsert(
            (event.user_id, event.community_id),
            Notification {
                recipient: event.user_id,
                community_id: event.community_id,
                message: format!("Welcome to {}!", community.name()),
                created_at: Utc::now(),
            },
        )?;

        let mut unit_of_work = CompositeUnitOfWork::new();
        unit_of_work.attach(outbox);
        unit_of_work.commit(cancel).await?;

        tracing::debug!(user_id = %event.user_id, community_id = %event.community_id, "welcome notification queued");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "notifications.welcome"
    }
}
