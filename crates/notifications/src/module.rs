use std::sync::Arc;

use agora_communities::{CommunitiesStore, MemberJoined};
use agora_infra::{Configuration, Module, ServiceRegistry};

use crate::handler::WelcomeNotificationHandler;
use crate::outbox::NotificationOutbox;

/// Registers the notification outbox and, unless `notifications.enabled` is
/// false, the welcome handler.
///
/// Must be registered after the communities module: it reads the community
/// directory that module provides.
#[derive(Debug, Clone, Default)]
pub struct NotificationsModule {
    outbox: NotificationOutbox,
}

impl NotificationsModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outbox(outbox: NotificationOutbox) -> Self {
        Self { outbox }
    }
}

impl Module for NotificationsModule {
    fn name(&self) -> &'static str {
        "notifications"
    }

    fn register(&self, services: &mut ServiceRegistry, config: &Configuration) -> anyhow::Result<()> {
        let directory = services.require::<CommunitiesStore>()?;
        services.insert(Arc::new(self.outbox.clone()))?;

        if !config.get_or("notifications.enabled", true)? {
            tracing::info!("welcome notifications disabled");
            return Ok(());
        }

        services
            .handlers()
            .subscribe::<MemberJoined, _>(WelcomeNotificationHandler::new(directory, self.outbox.clone()));
        Ok(())
    }
}
