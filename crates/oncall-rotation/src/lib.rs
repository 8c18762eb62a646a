//! On-call rotation: the in-memory rotation store, the identity cache,
//! the permission resolver and the mutation protocol that ties them to
//! inbound commands.

pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod identity;
pub mod permission;
pub mod reply;
pub mod service;
pub mod store;

pub use command::{Command, Mention, Operation};
pub use config::OncallConfig;
pub use context::{Actor, RequestContext};
pub use error::CommandError;
pub use identity::IdentityCache;
pub use permission::{PermissionResolver, Tier};
pub use reply::{Block, Reply};
pub use service::{CommandRequest, OncallService};
pub use store::{AddOutcome, RegisterOutcome, RotationStore};
