//! In-memory rotation store.
//!
//! Holds the authoritative team list for this process. Every mutation
//! works on a private copy of the team record: the copy is persisted
//! first and only swapped into the list once the durable store accepts
//! it, all under a single write-lock acquisition.

use std::collections::HashSet;

use oncall_core::error::{OncallError, OncallResult};
use oncall_core::models::team::{ManagerRef, RotationEntry, TeamRotation};
use oncall_core::repository::TeamStore;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Result of a successful `register`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Created,
    ManagerAdded,
}

/// Result of a successful `add`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Appended to the end of the rotation.
    Added,
    /// Already present; name or label updated in place.
    Updated,
}

pub struct RotationStore<S: TeamStore> {
    store: S,
    /// Sorted by team name.
    teams: RwLock<Vec<TeamRotation>>,
}

fn position(teams: &[TeamRotation], team: &str) -> Result<usize, usize> {
    teams.binary_search_by(|t| t.team.as_str().cmp(team))
}

fn not_found(team: &str) -> OncallError {
    OncallError::TeamNotFound {
        team: team.to_string(),
    }
}

impl<S: TeamStore> RotationStore<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            teams: RwLock::new(Vec::new()),
        }
    }

    pub fn backend(&self) -> &S {
        &self.store
    }

    /// Replace the in-memory list with everything the durable store holds.
    pub async fn load(&self) -> OncallResult<usize> {
        let mut loaded = self.store.get_all().await?;
        loaded.sort_by(|a, b| a.team.cmp(&b.team));
        loaded.dedup_by(|b, a| {
            let dup = a.team == b.team;
            if dup {
                warn!(team = %b.team, "Duplicate team record in store, keeping the first");
            }
            dup
        });
        for team in &mut loaded {
            if team.key.is_none() {
                team.key = Some(team.team.clone());
            }
        }

        let count = loaded.len();
        *self.teams.write().await = loaded;
        info!(teams = count, "Loaded rotation state");
        Ok(count)
    }

    /// Snapshot of every team.
    pub async fn list_teams(&self) -> Vec<TeamRotation> {
        self.teams.read().await.clone()
    }

    pub async fn get_team(&self, team: &str) -> OncallResult<TeamRotation> {
        let teams = self.teams.read().await;
        match position(&teams, team) {
            Ok(idx) => Ok(teams[idx].clone()),
            Err(_) => Err(not_found(team)),
        }
    }

    /// Whether `id` manages `team`. Unknown teams have no managers.
    pub async fn is_manager(&self, team: &str, id: &str) -> bool {
        let teams = self.teams.read().await;
        position(&teams, team)
            .map(|idx| teams[idx].has_manager(id))
            .unwrap_or(false)
    }

    /// Create `team`, or add `manager` to an existing one.
    pub async fn register(
        &self,
        actor: &str,
        team: &str,
        manager: Option<ManagerRef>,
    ) -> OncallResult<(RegisterOutcome, TeamRotation)> {
        let mut teams = self.teams.write().await;
        match position(&teams, team) {
            Err(slot) => {
                let mut created = TeamRotation::new(team, actor);
                created.managers.extend(manager);
                created.key = Some(created.storage_key());
                self.persist(&created).await?;

                teams.insert(slot, created.clone());
                info!(team, actor, "Team registered");
                Ok((RegisterOutcome::Created, created))
            }
            Ok(idx) => {
                let Some(manager) = manager else {
                    return Err(OncallError::AlreadyRegistered {
                        team: team.to_string(),
                    });
                };
                if teams[idx].has_manager(&manager.id) {
                    return Err(OncallError::AlreadyManager {
                        team: team.to_string(),
                        name: manager.name,
                    });
                }

                let mut next = teams[idx].clone();
                next.managers.push(manager);
                next.touch(actor);
                self.persist(&next).await?;

                teams[idx] = next.clone();
                info!(team, actor, managers = next.managers.len(), "Manager added");
                Ok((RegisterOutcome::ManagerAdded, next))
            }
        }
    }

    /// Delete the whole team, or only `manager` from its manager list.
    ///
    /// Returns the record as it was removed, or as updated.
    pub async fn unregister(
        &self,
        actor: &str,
        team: &str,
        manager: Option<&ManagerRef>,
    ) -> OncallResult<TeamRotation> {
        let Some(manager) = manager else {
            let mut teams = self.teams.write().await;
            let idx = position(&teams, team).map_err(|_| not_found(team))?;
            let key = teams[idx].storage_key();
            self.store.delete(&key).await.map_err(|e| external("delete", team, e))?;

            let removed = teams.remove(idx);
            info!(team, actor, "Team unregistered");
            return Ok(removed);
        };

        let (_, next) = self
            .commit(actor, team, |record| {
                let before = record.managers.len();
                record.managers.retain(|m| m.id != manager.id);
                if record.managers.len() == before {
                    return Err(OncallError::NotManager {
                        team: record.team.clone(),
                        name: manager.name.clone(),
                    });
                }
                Ok(())
            })
            .await?;
        info!(team, actor, manager = %manager.id, "Manager removed");
        Ok(next)
    }

    /// Append `entry` to the rotation, or update its name/label in place.
    pub async fn add(
        &self,
        actor: &str,
        team: &str,
        entry: RotationEntry,
    ) -> OncallResult<(AddOutcome, TeamRotation)> {
        self.commit(actor, team, move |record| {
            match record.position_of(&entry.id) {
                Some(idx) if record.rotation[idx] == entry => Err(OncallError::AlreadyAssigned {
                    team: record.team.clone(),
                    name: entry.name,
                }),
                Some(idx) => {
                    record.rotation[idx] = entry;
                    Ok(AddOutcome::Updated)
                }
                None => {
                    record.rotation.push(entry);
                    Ok(AddOutcome::Added)
                }
            }
        })
        .await
    }

    /// Drop the entry for `id`, keeping the order of everyone else.
    pub async fn remove(
        &self,
        actor: &str,
        team: &str,
        id: &str,
        name: &str,
    ) -> OncallResult<TeamRotation> {
        let (_, next) = self
            .commit(actor, team, |record| {
                if record.rotation.is_empty() {
                    return Err(OncallError::EmptyRotation {
                        team: record.team.clone(),
                    });
                }
                let idx = record.position_of(id).ok_or_else(|| OncallError::NotInRotation {
                    team: record.team.clone(),
                    name: name.to_string(),
                })?;
                record.rotation.remove(idx);
                Ok(())
            })
            .await?;
        Ok(next)
    }

    /// Exchange two 1-based rotation positions.
    pub async fn swap(
        &self,
        actor: &str,
        team: &str,
        a: usize,
        b: usize,
    ) -> OncallResult<TeamRotation> {
        let (_, next) = self
            .commit(actor, team, |record| {
                let len = record.rotation.len();
                if len < 2 || a == 0 || b == 0 || a > len || b > len {
                    return Err(OncallError::PositionOutOfRange {
                        team: record.team.clone(),
                        a,
                        b,
                    });
                }
                if a == b {
                    return Err(OncallError::SamePosition);
                }
                record.rotation.swap(a - 1, b - 1);
                Ok(())
            })
            .await?;
        Ok(next)
    }

    /// Empty the rotation. Persists even when it is already empty.
    pub async fn flush(&self, actor: &str, team: &str) -> OncallResult<TeamRotation> {
        let (_, next) = self
            .commit(actor, team, |record| {
                record.rotation.clear();
                Ok(())
            })
            .await?;
        Ok(next)
    }

    /// Remove every manager and rotation entry whose id is in `gone`
    /// from the live record.
    ///
    /// The last-updated stamp is left alone. Returns `None` when nothing
    /// had to be removed.
    pub async fn prune(
        &self,
        team: &str,
        gone: &HashSet<String>,
    ) -> OncallResult<Option<TeamRotation>> {
        if gone.is_empty() {
            return Ok(None);
        }

        let mut teams = self.teams.write().await;
        let idx = position(&teams, team).map_err(|_| not_found(team))?;
        let mut next = teams[idx].clone();
        next.managers.retain(|m| !gone.contains(&m.id));
        next.rotation.retain(|e| !gone.contains(&e.id));
        if next == teams[idx] {
            return Ok(None);
        }

        self.persist(&next).await?;
        info!(
            team,
            managers_before = teams[idx].managers.len(),
            managers_after = next.managers.len(),
            rotation_before = teams[idx].rotation.len(),
            rotation_after = next.rotation.len(),
            "Pruned identities that no longer exist"
        );
        teams[idx] = next.clone();
        Ok(Some(next))
    }

    /// Apply `mutate` to a copy of `team`, persist the copy and commit it.
    ///
    /// If `mutate` fails nothing is persisted. If the persist fails the
    /// copy is discarded and the live record is left untouched.
    async fn commit<T, F>(
        &self,
        actor: &str,
        team: &str,
        mutate: F,
    ) -> OncallResult<(T, TeamRotation)>
    where
        T: Send,
        F: FnOnce(&mut TeamRotation) -> OncallResult<T> + Send,
    {
        let mut teams = self.teams.write().await;
        let idx = position(&teams, team).map_err(|_| not_found(team))?;

        let mut next = teams[idx].clone();
        let out = mutate(&mut next)?;
        next.touch(actor);
        self.persist(&next).await?;

        teams[idx] = next.clone();
        info!(team, actor, rotation = next.rotation.len(), "Team updated");
        Ok((out, next))
    }

    async fn persist(&self, record: &TeamRotation) -> OncallResult<()> {
        self.store
            .put(&record.storage_key(), record)
            .await
            .map_err(|e| external("put", &record.team, e))
    }
}

/// Log a durable-store failure and normalize it to the external tier.
fn external(op: &str, team: &str, err: OncallError) -> OncallError {
    warn!(team, op, error = %err, "Durable store call failed, state left unchanged");
    match err {
        OncallError::External(_) => err,
        other => OncallError::External(other.to_string()),
    }
}
