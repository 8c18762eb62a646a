//! In-memory fakes for the durable store and the identity provider.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use oncall_core::error::{OncallError, OncallResult};
use oncall_core::models::identity::ProviderUser;
use oncall_core::models::team::{ManagerRef, RotationEntry, TeamRotation};
use oncall_core::repository::{IdentityProvider, TeamStore};
use parking_lot::Mutex;

#[derive(Default)]
pub struct FakeTeamStore {
    records: Mutex<HashMap<String, TeamRotation>>,
    fail_writes: AtomicBool,
    puts: AtomicUsize,
    deletes: AtomicUsize,
}

impl FakeTeamStore {
    pub fn with_teams(teams: Vec<TeamRotation>) -> Self {
        let store = Self::default();
        for team in teams {
            store.records.lock().insert(team.storage_key(), team);
        }
        store
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn stored(&self, key: &str) -> Option<TeamRotation> {
        self.records.lock().get(key).cloned()
    }
}

impl TeamStore for FakeTeamStore {
    async fn get_all(&self) -> OncallResult<Vec<TeamRotation>> {
        Ok(self.records.lock().values().cloned().collect())
    }

    async fn put(&self, key: &str, team: &TeamRotation) -> OncallResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(OncallError::External("store unavailable".into()));
        }
        let mut stored = team.clone();
        stored.key = Some(key.to_string());
        self.records.lock().insert(key.to_string(), stored);
        Ok(())
    }

    async fn delete(&self, key: &str) -> OncallResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(OncallError::External("store unavailable".into()));
        }
        self.records.lock().remove(key);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeProvider {
    users: Mutex<HashMap<String, ProviderUser>>,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
    lookups: AtomicUsize,
    listings: AtomicUsize,
}

impl FakeProvider {
    pub fn with_users(users: Vec<ProviderUser>) -> Self {
        let provider = Self::default();
        for user in users {
            provider.upsert(user);
        }
        provider
    }

    pub fn upsert(&self, user: ProviderUser) {
        self.users.lock().insert(user.id.clone(), user);
    }

    pub fn remove(&self, id: &str) {
        self.users.lock().remove(id);
    }

    pub fn deactivate(&self, id: &str) {
        if let Some(user) = self.users.lock().get_mut(id) {
            user.deleted = true;
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make every call sleep for `delay` before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn listings(&self) -> usize {
        self.listings.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl IdentityProvider for FakeProvider {
    async fn get_by_id(&self, id: &str) -> OncallResult<Option<ProviderUser>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.failing.load(Ordering::SeqCst) {
            return Err(OncallError::External("provider unavailable".into()));
        }
        Ok(self.users.lock().get(id).cloned())
    }

    async fn list_all(&self) -> OncallResult<Vec<ProviderUser>> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.failing.load(Ordering::SeqCst) {
            return Err(OncallError::External("provider unavailable".into()));
        }
        let mut users: Vec<_> = self.users.lock().values().cloned().collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(users)
    }
}

pub fn user(id: &str, name: &str, phone: &str) -> ProviderUser {
    ProviderUser {
        id: id.into(),
        name: name.into(),
        phone: phone.into(),
        is_admin: false,
        is_bot: false,
        deleted: false,
    }
}

pub fn admin(id: &str, name: &str) -> ProviderUser {
    ProviderUser {
        is_admin: true,
        ..user(id, name, "")
    }
}

pub fn bot(id: &str, name: &str) -> ProviderUser {
    ProviderUser {
        is_bot: true,
        ..user(id, name, "")
    }
}

pub fn entry(id: &str, name: &str, label: Option<&str>) -> RotationEntry {
    RotationEntry {
        name: name.into(),
        id: id.into(),
        label: label.map(str::to_string),
    }
}

pub fn manager(id: &str, name: &str) -> ManagerRef {
    ManagerRef {
        name: name.into(),
        id: id.into(),
    }
}

/// A stored team with a fixed timestamp.
pub fn team(name: &str, managers: Vec<ManagerRef>, rotation: Vec<RotationEntry>) -> TeamRotation {
    TeamRotation {
        key: Some(name.into()),
        team: name.into(),
        rotation,
        managers,
        updated: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 0).unwrap(),
        updated_by: "seed".into(),
    }
}
