use std::sync::Arc;

use anyhow::Context;

use agora_infra::{Configuration, Module, ServiceRegistry};

use crate::service::CommunityService;
use crate::store::{CommunitiesContext, CommunitiesStore};

pub const DEFAULT_MAX_MEMBERS: usize = 1000;

/// `communities.*` configuration keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunitiesSettings {
    pub max_members: usize,
}

impl CommunitiesSettings {
    pub fn from_config(config: &Configuration) -> anyhow::Result<Self> {
        let max_members = config.get_or("communities.max_members", DEFAULT_MAX_MEMBERS)?;
        if max_members == 0 {
            anyhow::bail!("communities.max_members must be greater than zero");
        }
        Ok(Self { max_members })
    }
}

/// Registers the communities directory, its persistence boundary and
/// [`CommunityService`].
#[derive(Debug, Clone, Default)]
pub struct CommunitiesModule {
    store: CommunitiesStore,
}

impl CommunitiesModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an existing store (e.g. one a test keeps a handle to).
    pub fn with_store(store: CommunitiesStore) -> Self {
        Self { store }
    }
}

impl Module for CommunitiesModule {
    fn name(&self) -> &'static str {
        "communities"
    }

    fn register(&self, services: &mut ServiceRegistry, config: &Configuration) -> anyhow::Result<()> {
        let settings = CommunitiesSettings::from_config(config).context("invalid communities configuration")?;

        services.insert(Arc::new(self.store.clone()))?;
        services.insert_value(CommunityService::new(settings.max_members))?;

        let store = self.store.clone();
        services.add_participant_factory(CommunitiesContext::NAME, move || store.context())?;

        tracing::debug!(max_members = settings.max_members, "communities module configured");
        Ok(())
    }
}
