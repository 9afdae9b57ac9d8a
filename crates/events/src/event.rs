use chrono::{DateTime, Utc};

/// A domain event.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - identified by their **concrete Rust type** for dispatch
/// - **not persisted**: an event lives only for the duration of one publish call
///
/// `event_type()` is a stable, human-readable name used in logs and errors;
/// it plays no part in handler resolution.
pub trait Event: core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name (e.g. "communities.member.joined").
    fn event_type(&self) -> &'static str;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
