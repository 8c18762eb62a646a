//! Team rotation domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One identity in a team's on-call rotation.
///
/// Position in the owning list is significant: it defines the numbered
/// slots used by `swap`, `remove` and rendering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RotationEntry {
    pub name: String,
    pub id: String,
    /// Optional area-of-responsibility label, stored lower-cased.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManagerRef {
    pub name: String,
    pub id: String,
}

/// Per-team state: manager list plus ordered rotation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamRotation {
    /// Durable-store key. `None` until the record is saved for the first time.
    pub key: Option<String>,
    /// Upper-cased team name, unique across the team list.
    pub team: String,
    pub rotation: Vec<RotationEntry>,
    pub managers: Vec<ManagerRef>,
    pub updated: DateTime<Utc>,
    pub updated_by: String,
}

impl TeamRotation {
    pub fn new(team: impl Into<String>, updated_by: impl Into<String>) -> Self {
        Self {
            key: None,
            team: team.into(),
            rotation: Vec::new(),
            managers: Vec::new(),
            updated: Utc::now(),
            updated_by: updated_by.into(),
        }
    }

    /// Key under which this record is (or will be) stored: the assigned
    /// key if present, the team name otherwise.
    pub fn storage_key(&self) -> String {
        self.key.clone().unwrap_or_else(|| self.team.clone())
    }

    pub fn has_manager(&self, id: &str) -> bool {
        self.managers.iter().any(|m| m.id == id)
    }

    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.rotation.iter().position(|e| e.id == id)
    }

    pub fn touch(&mut self, actor: &str) {
        self.updated = Utc::now();
        self.updated_by = actor.to_string();
    }
}
