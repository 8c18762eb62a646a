//! TTL-bound cache over the external identity provider.
//!
//! Records are created on first miss, replaced wholesale on refresh
//! (keeping the locally derived superuser flag and manager counter) and
//! evicted as soon as the provider reports the identity gone,
//! deactivated or non-human.

use std::collections::HashMap;
use std::time::Duration;

use oncall_core::error::{OncallError, OncallResult};
use oncall_core::models::identity::{IdentityRecord, ProviderUser};
use oncall_core::repository::IdentityProvider;
use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
struct CachedIdentity {
    record: IdentityRecord,
    fetched: Instant,
}

impl CachedIdentity {
    fn new(record: IdentityRecord) -> Self {
        Self {
            record,
            fetched: Instant::now(),
        }
    }
}

/// Identity cache keyed by external id.
///
/// The map lock is only ever held to read, insert, replace or evict a
/// single record; provider calls happen outside it.
pub struct IdentityCache<P: IdentityProvider> {
    provider: P,
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedIdentity>>,
    /// Configured superuser names not yet matched against the provider.
    pending_exempt: Mutex<Vec<String>>,
}

impl<P: IdentityProvider> IdentityCache<P> {
    pub fn new(provider: P, ttl: Duration, exempt_names: Vec<String>) -> Self {
        Self {
            provider,
            ttl,
            entries: RwLock::new(HashMap::new()),
            pending_exempt: Mutex::new(exempt_names),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Resolve an identity.
    ///
    /// Without `force`, a fresh cached record is returned as-is and a
    /// stale one is refreshed; a provider failure during that refresh
    /// returns the stale record. With `force`, the provider is always
    /// asked and a transient failure is propagated with the cache left
    /// untouched. In both modes a provider answer of "gone" evicts the
    /// record and yields `Ok(None)`.
    pub async fn resolve(&self, id: &str, force: bool) -> OncallResult<Option<IdentityRecord>> {
        if force {
            return self.refresh_forced(id).await;
        }

        let cached = self.entries.read().get(id).cloned();
        match cached {
            None => self.fetch_new(id).await,
            Some(entry) if entry.fetched.elapsed() < self.ttl => Ok(Some(entry.record)),
            Some(entry) => self.refresh_stale(id, entry).await,
        }
    }

    /// Peek at the cached record without contacting the provider.
    pub fn cached(&self, id: &str) -> Option<IdentityRecord> {
        self.entries.read().get(id).map(|e| e.record.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Add `delta` to the identity's manager reference counter, floored
    /// at zero. Fails if the identity does not resolve.
    pub async fn adjust_manager_count(&self, id: &str, delta: i64) -> OncallResult<i64> {
        let unknown = || OncallError::UnknownIdentity {
            name: id.to_string(),
        };
        if self.resolve(id, false).await?.is_none() {
            return Err(unknown());
        }

        let mut entries = self.entries.write();
        let entry = entries.get_mut(id).ok_or_else(unknown)?;
        entry.record.manager_refs = (entry.record.manager_refs + delta).max(0);
        debug!(
            user_id = id,
            manager_refs = entry.record.manager_refs,
            "Adjusted manager reference count"
        );
        Ok(entry.record.manager_refs)
    }

    /// Whether any configured superuser name is still unmatched.
    pub fn has_pending_exempt(&self) -> bool {
        !self.pending_exempt.lock().is_empty()
    }

    pub fn pending_exempt(&self) -> Vec<String> {
        self.pending_exempt.lock().clone()
    }

    /// Match configured superuser names against the provider's full
    /// listing and mark the matching identities as superusers.
    ///
    /// Matched names are consumed, so once every name has been seen this
    /// is a no-op that makes no provider call. Bot and deactivated
    /// accounts consume their name but are never marked.
    pub async fn preload_configured_exempt(&self) -> OncallResult<usize> {
        if !self.has_pending_exempt() {
            return Ok(0);
        }

        let users = self.provider.list_all().await.map_err(|e| {
            warn!(error = %e, "Failed to list identities for superuser preload");
            e
        })?;

        let mut pending = self.pending_exempt.lock();
        let mut entries = self.entries.write();
        let mut marked = 0;
        for user in &users {
            let Some(idx) = pending.iter().position(|name| *name == user.name) else {
                continue;
            };
            pending.remove(idx);

            if !user.is_active_human() {
                warn!(name = %user.name, "Configured superuser is a bot or deactivated, ignoring");
            } else {
                let entry = entries
                    .entry(user.id.clone())
                    .or_insert_with(|| CachedIdentity::new(IdentityRecord::from_provider(user)));
                entry.record.is_superuser = true;
                marked += 1;
                info!(name = %user.name, user_id = %user.id, "Loaded superuser");
            }

            if pending.is_empty() {
                break;
            }
        }

        if !pending.is_empty() {
            warn!(unresolved = ?*pending, "Configured superusers not found");
        }
        Ok(marked)
    }

    async fn fetch(&self, id: &str) -> OncallResult<Option<ProviderUser>> {
        let user = self.provider.get_by_id(id).await?;
        Ok(user.filter(ProviderUser::is_active_human))
    }

    async fn fetch_new(&self, id: &str) -> OncallResult<Option<IdentityRecord>> {
        match self.fetch(id).await {
            Ok(Some(user)) => {
                let record = self.store(&user);
                debug!(user_id = id, name = %record.name, "Cached new identity");
                Ok(Some(record))
            }
            Ok(None) => {
                self.evict(id);
                Ok(None)
            }
            Err(e) => {
                warn!(user_id = id, error = %e, "Failed to fetch identity");
                Err(e)
            }
        }
    }

    async fn refresh_stale(
        &self,
        id: &str,
        stale: CachedIdentity,
    ) -> OncallResult<Option<IdentityRecord>> {
        match self.fetch(id).await {
            Ok(Some(user)) => {
                let record = self.store(&user);
                info!(user_id = id, name = %record.name, "Refreshed stale identity");
                Ok(Some(record))
            }
            Ok(None) => {
                self.evict(id);
                Ok(None)
            }
            Err(e) => {
                warn!(
                    user_id = id,
                    age_secs = stale.fetched.elapsed().as_secs(),
                    error = %e,
                    "Failed to refresh identity, returning cached data"
                );
                Ok(Some(stale.record))
            }
        }
    }

    async fn refresh_forced(&self, id: &str) -> OncallResult<Option<IdentityRecord>> {
        match self.fetch(id).await {
            Ok(Some(user)) => Ok(Some(self.store(&user))),
            Ok(None) => {
                self.evict(id);
                Ok(None)
            }
            Err(e) => {
                warn!(user_id = id, error = %e, "Forced identity refresh failed");
                Err(e)
            }
        }
    }

    /// Insert or replace a record, carrying the locally derived fields
    /// over from whatever is cached at write time.
    fn store(&self, user: &ProviderUser) -> IdentityRecord {
        let mut record = IdentityRecord::from_provider(user);
        let mut entries = self.entries.write();
        if let Some(previous) = entries.get(&user.id) {
            record.is_superuser = previous.record.is_superuser;
            record.manager_refs = previous.record.manager_refs;
        }
        entries.insert(user.id.clone(), CachedIdentity::new(record.clone()));
        record
    }

    fn evict(&self, id: &str) {
        if self.entries.write().remove(id).is_some() {
            warn!(user_id = id, "Identity no longer exists, evicted");
        }
    }
}
