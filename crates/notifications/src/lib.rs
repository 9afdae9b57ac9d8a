//! Notifications feature module.
//!
//! Reacts to community events published by other modules; owns its own
//! outbox and never writes to another module's data.

pub mod handler;
pub mod module;
pub mod outbox;

pub use handler::WelcomeNotificationHandler;
pub use module::NotificationsModule;
pub use outbox::{Notification, NotificationOutbox};
