//! Infrastructure layer: module composition, configuration, the composite
//! unit of work and operation scopes.

pub mod config;
pub mod modules;
pub mod operation;
pub mod unit_of_work;

pub use config::{ConfigError, Configuration};
pub use modules::{Module, ModuleRegistrar, RegistrationError, ServiceError, ServiceProvider, ServiceRegistry};
pub use operation::{OperationError, OperationScope};

#[cfg(test)]
mod integration_tests;
