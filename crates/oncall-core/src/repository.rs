//! Collaborator trait definitions.
//!
//! Both traits are async and implemented outside the core: the durable
//! store by `oncall-db`, the identity provider by the server's Slack
//! client. Tests substitute in-memory fakes.

use crate::error::OncallResult;
use crate::models::identity::ProviderUser;
use crate::models::team::TeamRotation;

/// Durable store for team records, keyed by team.
pub trait TeamStore: Send + Sync {
    /// Every stored team record.
    fn get_all(&self) -> impl Future<Output = OncallResult<Vec<TeamRotation>>> + Send;
    /// Insert or overwrite the record stored under `key`.
    fn put(&self, key: &str, team: &TeamRotation) -> impl Future<Output = OncallResult<()>> + Send;
    fn delete(&self, key: &str) -> impl Future<Output = OncallResult<()>> + Send;
}

/// External source of identities.
pub trait IdentityProvider: Send + Sync {
    /// Look up one identity. `Ok(None)` means the provider confirmed the
    /// identity does not exist; `Err` is a transient failure.
    fn get_by_id(
        &self,
        id: &str,
    ) -> impl Future<Output = OncallResult<Option<ProviderUser>>> + Send;
    /// Full listing of every identity known to the provider.
    fn list_all(&self) -> impl Future<Output = OncallResult<Vec<ProviderUser>>> + Send;
}
