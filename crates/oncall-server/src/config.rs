//! Command-line and environment configuration.

use std::net::SocketAddr;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use clap::Parser;
use oncall_db::DbConfig;
use oncall_rotation::OncallConfig;
use tracing::warn;

#[derive(Parser, Debug)]
#[command(
    name = "oncall-server",
    about = "Slack slash-command service for per-team on-call rotations",
    version
)]
pub struct Args {
    /// Address the slash-command endpoint listens on
    #[arg(long, default_value = "0.0.0.0:8080", env = "ONCALL_LISTEN")]
    pub listen: SocketAddr,

    /// Path the slash-command endpoint is served under
    #[arg(long, default_value = "/", env = "ONCALL_COMMAND_ENDPOINT")]
    pub command_endpoint: String,

    /// Verification token Slack sends with every command
    #[arg(long, env = "SLACK_COMMAND_TOKEN", hide_env_values = true)]
    pub slack_command_token: String,

    /// Bot token used for the Slack Web API
    #[arg(long, env = "SLACK_API_TOKEN", hide_env_values = true)]
    pub slack_api_token: String,

    #[arg(long, default_value = "https://slack.com/api", env = "SLACK_API_URL")]
    pub slack_api_url: String,

    /// Slash command this service answers to
    #[arg(long, default_value = "/oncall", env = "ONCALL_COMMAND")]
    pub command: String,

    /// Deadline for all external calls one request makes (e.g. "3s")
    #[arg(long, default_value = "3s", env = "ONCALL_OPERATION_TIMEOUT")]
    pub operation_timeout: String,

    /// Age after which a cached Slack profile is refreshed (e.g. "1d")
    #[arg(long, default_value = "1d", env = "ONCALL_USER_CACHE_TIMEOUT")]
    pub user_cache_timeout: String,

    /// UTC offset used for timestamps (e.g. "+09:00")
    #[arg(long, default_value = "+00:00", env = "ONCALL_TIMEZONE")]
    pub timezone: String,

    /// Slack user names allowed to register and unregister teams
    #[arg(long, value_delimiter = ',', env = "ONCALL_SUPERUSERS")]
    pub superusers: Vec<String>,

    /// Stop treating Slack admins as superusers
    #[arg(long, env = "ONCALL_DEMOTE_ADMINS")]
    pub demote_admins: bool,

    /// Slack user group mentioned in error notices
    #[arg(long, env = "ONCALL_ADMIN_SUB_TEAM_ID")]
    pub admin_sub_team_id: Option<String>,

    #[arg(long, default_value = ":exclamation:", env = "ONCALL_INPUT_ERROR_EMOJI")]
    pub input_error_emoji: String,

    #[arg(
        long,
        default_value = ":negative_squared_cross_mark:",
        env = "ONCALL_EXTERNAL_ERROR_EMOJI"
    )]
    pub external_error_emoji: String,

    #[arg(long, default_value = "127.0.0.1:8000", env = "ONCALL_DB_URL")]
    pub db_url: String,

    #[arg(long, default_value = "oncall", env = "ONCALL_DB_NAMESPACE")]
    pub db_namespace: String,

    #[arg(long, default_value = "main", env = "ONCALL_DB_DATABASE")]
    pub db_database: String,

    #[arg(long, default_value = "root", env = "ONCALL_DB_USERNAME")]
    pub db_username: String,

    #[arg(long, default_value = "root", env = "ONCALL_DB_PASSWORD", hide_env_values = true)]
    pub db_password: String,
}

impl Args {
    /// Service configuration. Unparsable durations and offsets fall back
    /// to their defaults with a warning.
    pub fn oncall_config(&self) -> OncallConfig {
        let defaults = OncallConfig::default();
        let superusers: Vec<String> = self
            .superusers
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if self.demote_admins && superusers.is_empty() {
            warn!("demote_admins is ignored because no superusers are configured");
        }

        OncallConfig {
            command: self.command.clone(),
            operation_timeout: duration_or(
                "operation_timeout",
                &self.operation_timeout,
                defaults.operation_timeout,
            ),
            cache_ttl: duration_or(
                "user_cache_timeout",
                &self.user_cache_timeout,
                defaults.cache_ttl,
            ),
            timezone: offset_or(&self.timezone, defaults.timezone),
            superusers,
            demote_admins: self.demote_admins,
            admin_sub_team_id: self.admin_sub_team_id.clone().filter(|s| !s.is_empty()),
            input_error_emoji: self.input_error_emoji.clone(),
            external_error_emoji: self.external_error_emoji.clone(),
            ..defaults
        }
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig {
            url: self.db_url.clone(),
            namespace: self.db_namespace.clone(),
            database: self.db_database.clone(),
            username: self.db_username.clone(),
            password: self.db_password.clone(),
        }
    }
}

fn duration_or(name: &str, value: &str, default: Duration) -> Duration {
    match humantime::parse_duration(value.trim()) {
        Ok(d) if !d.is_zero() => d,
        Ok(_) => {
            warn!(option = name, value, "Zero duration, using default");
            default
        }
        Err(e) => {
            warn!(option = name, value, error = %e, "Invalid duration, using default");
            default
        }
    }
}

fn offset_or(value: &str, default: FixedOffset) -> FixedOffset {
    let value = value.trim();
    if value.eq_ignore_ascii_case("utc") || value == "Z" {
        return Utc.fix();
    }
    value.parse::<FixedOffset>().unwrap_or_else(|e| {
        warn!(value, error = %e, "Invalid timezone offset, using default");
        default
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec![
            "oncall-server",
            "--slack-command-token",
            "cmd-token",
            "--slack-api-token",
            "api-token",
        ];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults() {
        let config = parse(&[]).oncall_config();
        assert_eq!(config.command, "/oncall");
        assert_eq!(config.operation_timeout, Duration::from_secs(3));
        assert_eq!(config.cache_ttl, Duration::from_secs(86_400));
        assert_eq!(config.timezone, Utc.fix());
        assert!(config.superusers.is_empty());
        assert!(config.admin_exemption_enabled());
    }

    #[test]
    fn parses_humantime_and_offsets() {
        let config = parse(&[
            "--operation-timeout",
            "500ms",
            "--user-cache-timeout",
            "2h",
            "--timezone",
            "+09:00",
            "--superusers",
            "alice, bob",
            "--demote-admins",
        ])
        .oncall_config();

        assert_eq!(config.operation_timeout, Duration::from_millis(500));
        assert_eq!(config.cache_ttl, Duration::from_secs(7200));
        assert_eq!(config.timezone, FixedOffset::east_opt(9 * 3600).unwrap());
        assert_eq!(config.superusers, vec!["alice", "bob"]);
        assert!(!config.admin_exemption_enabled());
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config =
            parse(&["--operation-timeout", "soon", "--timezone", "Mars/Olympus"]).oncall_config();
        assert_eq!(config.operation_timeout, Duration::from_secs(3));
        assert_eq!(config.timezone, Utc.fix());
    }

    #[test]
    fn db_config_from_args() {
        let db = parse(&["--db-url", "db:8000", "--db-namespace", "ops"]).db_config();
        assert_eq!(db.url, "db:8000");
        assert_eq!(db.namespace, "ops");
        assert_eq!(db.database, "main");
    }
}
