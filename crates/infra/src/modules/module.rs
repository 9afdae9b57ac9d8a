use crate::config::Configuration;

use super::ServiceRegistry;

/// A self-contained feature unit.
///
/// `register` is called exactly once, during startup, by the
/// [`ModuleRegistrar`](super::ModuleRegistrar). It may read services added by
/// modules registered before it; an error aborts bootstrap.
pub trait Module: Send + Sync {
    /// Stable name used in logs and registration errors.
    fn name(&self) -> &'static str;

    fn register(&self, services: &mut ServiceRegistry, config: &Configuration) -> anyhow::Result<()>;
}

impl<M> Module for Box<M>
where
    M: Module + ?Sized,
{
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn register(&self, services: &mut ServiceRegistry, config: &Configuration) -> anyhow::Result<()> {
        (**self).register(services, config)
    }
}
