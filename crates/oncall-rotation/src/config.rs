//! Service configuration.

use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};

/// Configuration for the on-call service.
#[derive(Debug, Clone)]
pub struct OncallConfig {
    /// Slash command that triggers operations (default: `/oncall`).
    pub command: String,
    /// Deadline shared by every external call one request makes
    /// (default: 3 seconds).
    pub operation_timeout: Duration,
    /// Age after which a cached identity is refreshed (default: 1 day).
    pub cache_ttl: Duration,
    /// Offset used when rendering the last-updated timestamp.
    pub timezone: FixedOffset,
    /// Provider account names treated as superusers.
    pub superusers: Vec<String>,
    /// Stop treating provider admins as exempt. Only honoured when at
    /// least one superuser is configured.
    pub demote_admins: bool,
    /// Provider group mentioned in external error notices.
    pub admin_sub_team_id: Option<String>,
    pub input_error_emoji: String,
    pub external_error_emoji: String,
    /// Block colour (hex, no leading `#`).
    pub color: String,
}

impl Default for OncallConfig {
    fn default() -> Self {
        Self {
            command: "/oncall".into(),
            operation_timeout: Duration::from_secs(3),
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            timezone: Utc.fix(),
            superusers: Vec::new(),
            demote_admins: false,
            admin_sub_team_id: None,
            input_error_emoji: ":exclamation:".into(),
            external_error_emoji: ":negative_squared_cross_mark:".into(),
            color: "EF203D".into(),
        }
    }
}

impl OncallConfig {
    /// Whether provider admins count as exempt.
    pub fn admin_exemption_enabled(&self) -> bool {
        !(self.demote_admins && !self.superusers.is_empty())
    }

    /// Mention used to point users at the admin group.
    pub fn admin_mention(&self) -> String {
        match &self.admin_sub_team_id {
            Some(id) => format!("<!subteam^{id}|@admin>"),
            None => "@admin".into(),
        }
    }
}
