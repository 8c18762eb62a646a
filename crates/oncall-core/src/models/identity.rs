//! Identity domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An account as reported by the external identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderUser {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_bot: bool,
    /// Deactivated accounts are reported by the provider but unusable.
    #[serde(default)]
    pub deleted: bool,
}

impl ProviderUser {
    /// Bot/service accounts and deactivated accounts count as not found.
    pub fn is_active_human(&self) -> bool {
        !self.is_bot && !self.deleted
    }
}

/// Locally cached view of a provider identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRecord {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub is_admin: bool,
    /// Derived locally from configuration; never reported by the provider.
    pub is_superuser: bool,
    /// Number of teams this identity manages. Bookkeeping only.
    pub manager_refs: i64,
    pub retrieved_at: DateTime<Utc>,
}

impl IdentityRecord {
    pub fn from_provider(user: &ProviderUser) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            phone: user.phone.clone(),
            is_admin: user.is_admin,
            is_superuser: false,
            manager_refs: 0,
            retrieved_at: Utc::now(),
        }
    }

    pub fn phone(&self) -> Option<&str> {
        if self.phone.is_empty() {
            None
        } else {
            Some(&self.phone)
        }
    }
}
