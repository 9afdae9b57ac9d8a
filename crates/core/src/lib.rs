//! `agora-core`: shared primitives for platform modules.
//!
//! This crate contains **pure** building blocks (no infrastructure concerns):
//! identifiers that cross module boundaries and the domain error model used by
//! module services.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{CommunityId, OperationId, UserId};
