//! SurrealDB implementation of [`TeamStore`].

use chrono::{DateTime, Utc};
use oncall_core::error::OncallResult;
use oncall_core::models::team::{ManagerRef, RotationEntry, TeamRotation};
use oncall_core::repository::TeamStore;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;

use crate::error::DbError;

/// DB-side row struct that includes the record key via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct TeamRowWithId {
    record_id: String,
    team: String,
    managers: serde_json::Value,
    rotation: serde_json::Value,
    updated: DateTime<Utc>,
    updated_by: String,
}

impl TeamRowWithId {
    fn try_into_team(self) -> Result<TeamRotation, DbError> {
        let managers: Vec<ManagerRef> =
            serde_json::from_value(self.managers).map_err(|e| DbError::Decode {
                key: self.record_id.clone(),
                reason: format!("managers: {e}"),
            })?;
        let rotation: Vec<RotationEntry> =
            serde_json::from_value(self.rotation).map_err(|e| DbError::Decode {
                key: self.record_id.clone(),
                reason: format!("rotation: {e}"),
            })?;
        Ok(TeamRotation {
            key: Some(self.record_id),
            team: self.team,
            rotation,
            managers,
            updated: self.updated,
            updated_by: self.updated_by,
        })
    }
}

fn to_json<T: serde::Serialize>(
    key: &str,
    field: &str,
    value: &T,
) -> Result<serde_json::Value, DbError> {
    serde_json::to_value(value).map_err(|e| DbError::Decode {
        key: key.to_string(),
        reason: format!("{field}: {e}"),
    })
}

/// SurrealDB implementation of the durable team store.
#[derive(Clone)]
pub struct SurrealTeamStore<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTeamStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> TeamStore for SurrealTeamStore<C> {
    async fn get_all(&self) -> OncallResult<Vec<TeamRotation>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM team_rotation \
                 ORDER BY team ASC",
            )
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TeamRowWithId> = result.take(0).map_err(DbError::from)?;

        let teams = rows
            .into_iter()
            .map(|row| row.try_into_team())
            .collect::<Result<Vec<_>, DbError>>()?;
        debug!(count = teams.len(), "Loaded team records");
        Ok(teams)
    }

    async fn put(&self, key: &str, team: &TeamRotation) -> OncallResult<()> {
        let managers = to_json(key, "managers", &team.managers)?;
        let rotation = to_json(key, "rotation", &team.rotation)?;

        let result = self
            .db
            .query(
                "UPSERT type::record('team_rotation', $key) SET \
                 team = $team, managers = $managers, \
                 rotation = $rotation, updated = $updated, \
                 updated_by = $updated_by",
            )
            .bind(("key", key.to_string()))
            .bind(("team", team.team.clone()))
            .bind(("managers", managers))
            .bind(("rotation", rotation))
            .bind(("updated", team.updated))
            .bind(("updated_by", team.updated_by.clone()))
            .await
            .map_err(DbError::from)?;

        result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        debug!(key, team = %team.team, "Stored team record");
        Ok(())
    }

    async fn delete(&self, key: &str) -> OncallResult<()> {
        self.db
            .query("DELETE type::record('team_rotation', $key)")
            .bind(("key", key.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        debug!(key, "Deleted team record");
        Ok(())
    }
}
