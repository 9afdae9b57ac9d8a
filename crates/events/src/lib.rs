//! In-process domain events.
//!
//! Modules publish typed facts through an [`EventBus`] and react to facts
//! published by other modules through [`EventHandler`]s registered at startup.
//! Handler lookup is an explicit, typed table ([`HandlerRegistry`]); nothing is
//! discovered implicitly.

pub mod bus;
pub mod event;
pub mod handler;
pub mod in_process_bus;
pub mod registry;

pub use bus::{EventBus, PublishError};
pub use event::Event;
pub use handler::EventHandler;
pub use in_process_bus::InProcessEventBus;
pub use registry::{HandlerEntry, HandlerRegistry, HandlerRegistryBuilder, Subscription};

/// Cooperative cancellation signal passed through publish and commit calls.
pub use tokio_util::sync::CancellationToken;
