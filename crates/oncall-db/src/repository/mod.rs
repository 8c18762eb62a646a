//! SurrealDB repository implementations.

mod team;

pub use team::SurrealTeamStore;
