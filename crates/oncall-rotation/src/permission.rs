//! Capability tiers computed from the rotation store and identity cache.

use std::sync::Arc;

use oncall_core::error::{OncallError, OncallResult};
use oncall_core::repository::{IdentityProvider, TeamStore};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::identity::IdentityCache;
use crate::store::RotationStore;

/// Capability tiers, ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Base,
    /// Manager of the team being operated on.
    Manager,
    /// Superuser, or provider admin unless admins are demoted.
    Exempt,
}

pub struct PermissionResolver<S: TeamStore, P: IdentityProvider> {
    store: Arc<RotationStore<S>>,
    identities: Arc<IdentityCache<P>>,
    admin_exempt: bool,
    preloaded: OnceCell<()>,
}

impl<S: TeamStore, P: IdentityProvider> PermissionResolver<S, P> {
    pub fn new(
        store: Arc<RotationStore<S>>,
        identities: Arc<IdentityCache<P>>,
        admin_exempt: bool,
    ) -> Self {
        Self {
            store,
            identities,
            admin_exempt,
            preloaded: OnceCell::new(),
        }
    }

    /// Resolve configured superusers against the provider.
    ///
    /// Succeeds at most once per process; concurrent callers wait on the
    /// same attempt. A failed attempt is retried by the next caller.
    pub async fn initialize(&self) -> OncallResult<()> {
        self.preloaded
            .get_or_try_init(|| async {
                self.identities.preload_configured_exempt().await?;
                Ok::<_, OncallError>(())
            })
            .await?;
        Ok(())
    }

    /// Whether `id` may register and unregister teams.
    ///
    /// Fails closed: a provider error here denies.
    pub async fn is_exempt(&self, id: &str) -> bool {
        if let Err(e) = self.initialize().await {
            warn!(user_id = id, error = %e, "Superuser preload failed, denying exemption");
            return false;
        }
        match self.identities.resolve(id, false).await {
            Ok(Some(record)) => record.is_superuser || (self.admin_exempt && record.is_admin),
            Ok(None) => false,
            Err(e) => {
                warn!(user_id = id, error = %e, "Failed to resolve identity for permission check");
                false
            }
        }
    }

    /// Whether `id` may mutate `team`.
    pub async fn has_permission(&self, id: &str, team: &str) -> bool {
        self.store.is_manager(team, id).await || self.is_exempt(id).await
    }

    /// Highest tier `id` holds for `team`.
    pub async fn tier(&self, id: &str, team: Option<&str>) -> Tier {
        if self.is_exempt(id).await {
            return Tier::Exempt;
        }
        match team {
            Some(team) if self.store.is_manager(team, id).await => Tier::Manager,
            _ => Tier::Base,
        }
    }

    /// Fail with `PermissionDenied` unless `id` holds at least `required`.
    pub async fn authorize(
        &self,
        id: &str,
        team: Option<&str>,
        required: Tier,
    ) -> OncallResult<()> {
        if required == Tier::Base {
            return Ok(());
        }
        let held = self.tier(id, team).await;
        if held < required {
            debug!(user_id = id, team = ?team, ?held, ?required, "Permission denied");
            return Err(OncallError::PermissionDenied);
        }
        Ok(())
    }
}
