use thiserror::Error;
use tracing::{error, info};

use crate::config::Configuration;

use super::{Module, ServiceProvider, ServiceRegistry};

/// A module's `register` failed. Bootstrap must not continue.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("module `{module}` (position {position}) failed to register")]
    Module {
        module: &'static str,
        position: usize,
        #[source]
        source: anyhow::Error,
    },
}

impl RegistrationError {
    pub fn module(&self) -> &'static str {
        match self {
            RegistrationError::Module { module, .. } => *module,
        }
    }

    pub fn position(&self) -> usize {
        match self {
            RegistrationError::Module { position, .. } => *position,
        }
    }
}

/// Applies an explicit, ordered list of modules to a registration surface.
///
/// The order is the host's: a module may rely on services registered by any
/// module listed before it, never after.
#[derive(Default)]
pub struct ModuleRegistrar {
    modules: Vec<Box<dyn Module>>,
}

impl ModuleRegistrar {
    pub fn new(modules: Vec<Box<dyn Module>>) -> Self {
        Self { modules }
    }

    pub fn with_module(mut self, module: impl Module + 'static) -> Self {
        self.modules.push(Box::new(module));
        self
    }

    pub fn module_names(&self) -> Vec<&'static str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Call every module's `register`, in order, stopping at the first failure.
    pub fn apply(&self, services: &mut ServiceRegistry, config: &Configuration) -> Result<(), RegistrationError> {
        for (position, module) in self.modules.iter().enumerate() {
            let name = module.name();
            if let Err(source) = module.register(services, config) {
                error!(module = name, position, error = %source, "module registration failed");
                return Err(RegistrationError::Module {
                    module: name,
                    position,
                    source,
                });
            }
            info!(module = name, position, "module registered");
        }
        Ok(())
    }

    /// Apply every module to a fresh registry and freeze the result.
    pub fn compose(&self, config: &Configuration) -> Result<ServiceProvider, RegistrationError> {
        let mut services = ServiceRegistry::new();
        self.apply(&mut services, config)?;
        let provider = services.build();
        info!(
            modules = self.modules.len(),
            services = provider.service_count(),
            participants = provider.participant_names().len(),
            "platform composed"
        );
        Ok(provider)
    }
}

impl core::fmt::Debug for ModuleRegistrar {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModuleRegistrar")
            .field("modules", &self.module_names())
            .finish()
    }
}
