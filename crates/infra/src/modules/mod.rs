//! Module composition: feature modules register services, handlers and
//! persistence boundaries into a shared surface at startup.

pub mod module;
pub mod registrar;
pub mod services;

pub use module::Module;
pub use registrar::{ModuleRegistrar, RegistrationError};
pub use services::{ServiceError, ServiceProvider, ServiceRegistry};
