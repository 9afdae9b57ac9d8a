//! Composite unit of work across independently owned persistence boundaries.
//!
//! Each feature module owns one persistence boundary and exposes it as a
//! [`Participant`]. A logical operation attaches one participant per boundary
//! to a [`CompositeUnitOfWork`] and commits them all at the end, in attachment
//! order.
//!
//! This is **not** a distributed transaction. See [`CommitError`] for what a
//! failure leaves behind.

pub mod composite;
pub mod in_memory;
pub mod participant;

pub use composite::{CommitError, CommitReport, CompositeUnitOfWork};
pub use in_memory::{InMemoryParticipant, InMemoryTable};
pub use participant::Participant;
