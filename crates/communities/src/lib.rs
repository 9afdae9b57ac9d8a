//! Communities feature module.
//!
//! Business rules for communities and memberships live in [`community`] as
//! deterministic logic (no IO). [`CommunitiesModule`] wires them into the
//! platform: a persistence boundary per operation, a [`CommunityService`] and
//! the `communities.*` configuration keys.

pub mod community;
pub mod events;
pub mod module;
pub mod service;
pub mod store;

pub use community::{Community, CreateCommunity, JoinCommunity, Membership, MAX_NAME_LEN};
pub use events::{CommunityCreated, MemberJoined};
pub use module::{CommunitiesModule, CommunitiesSettings, DEFAULT_MAX_MEMBERS};
pub use service::{CommunityError, CommunityService};
pub use store::{CommunitiesContext, CommunitiesStore};
