//! Outbound reply model and the text rendered into it.

use chrono::{DateTime, FixedOffset, Utc};
use oncall_core::error::OncallError;
use oncall_core::models::team::RotationEntry;
use serde::Serialize;

use crate::command::{self, Operation};
use crate::config::OncallConfig;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// One rendered block of a reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Block {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub color: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub footer: String,
}

/// A plain-text summary plus zero or more blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Block>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_blocks(text: impl Into<String>, attachments: Vec<Block>) -> Self {
        Self {
            text: text.into(),
            attachments,
        }
    }

    /// Text of every block, in order, joined by newlines.
    pub fn block_text(&self) -> String {
        self.attachments
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// User-facing wording, fixed once from configuration.
#[derive(Debug, Clone)]
pub struct Messages {
    command: String,
    emoji: String,
    external: String,
    color: String,
    timezone: FixedOffset,
}

impl Messages {
    pub fn new(config: &OncallConfig) -> Self {
        Self {
            command: config.command.clone(),
            emoji: config.input_error_emoji.clone(),
            external: format!(
                "Unexpected error occurred, please contact {} {}",
                config.admin_mention(),
                config.external_error_emoji
            ),
            color: config.color.clone(),
            timezone: config.timezone,
        }
    }

    pub fn usage(&self, operation: Option<Operation>) -> String {
        command::usage(&self.command, operation)
    }

    pub fn external(&self) -> &str {
        &self.external
    }

    pub fn denied(&self) -> String {
        format!("Sorry! you can't do that {}", self.emoji)
    }

    pub fn no_phone(&self) -> String {
        format!("Phone not set {}", self.emoji)
    }

    pub fn no_manager(&self) -> String {
        format!("Manager not set {}", self.emoji)
    }

    pub fn no_rotation(&self) -> String {
        format!("On-call list not set {}", self.emoji)
    }

    pub fn caller_unknown(&self) -> String {
        format!("Sorry! You don't exist in Slack {}", self.emoji)
    }

    /// Message for a domain error.
    pub fn domain(&self, err: &OncallError) -> String {
        let e = &self.emoji;
        match err {
            OncallError::TeamNotFound { team } => format!("Sorry, team {team} does not exist {e}"),
            OncallError::UnknownIdentity { name } => {
                format!("<@{name}> doesn't exist in Slack {e}")
            }
            OncallError::AlreadyRegistered { team } => {
                format!("Team {team} has already been registered {e}")
            }
            OncallError::AlreadyManager { team, name } => {
                format!("Team {team}, manager <@{name}> has already been registered {e}")
            }
            OncallError::NotManager { team, name } => {
                format!("Sorry, <@{name}> is not a manager of team {team} {e}")
            }
            OncallError::AlreadyAssigned { team, name } => {
                format!("<@{name}> already assigned {team} rotation {e}")
            }
            OncallError::NotInRotation { team, name } => {
                format!("Sorry, <@{name}> is not in the on-call list for {team} {e}")
            }
            OncallError::EmptyRotation { team } => {
                format!("Team {team} doesn't have anyone in list {e}")
            }
            OncallError::PositionOutOfRange { .. } => {
                format!(
                    "Sorry, swap could not be completed! Check _position_a_ and _position_b_ {e}"
                )
            }
            OncallError::SamePosition => {
                "position_A and position_B are same, nothing to do!".into()
            }
            other => other.to_string(),
        }
    }

    pub fn manager_line(&self, name: &str, phone: Option<&str>) -> String {
        format!("Manager: {name} {}", self.phone_or_placeholder(phone))
    }

    /// `position` is 1-based.
    pub fn rotation_line(
        &self,
        position: usize,
        entry: &RotationEntry,
        phone: Option<&str>,
    ) -> String {
        let mut line = format!("{position}: {} {}", entry.name, self.phone_or_placeholder(phone));
        if let Some(label) = entry.label.as_deref().filter(|l| !l.is_empty()) {
            line.push_str(&format!(" ({label})"));
        }
        line
    }

    pub fn overview_line(&self, team: &str, manager: Option<(&str, Option<&str>)>) -> String {
        match manager {
            Some((name, phone)) => format!("{team}: {name} {}", self.phone_or_placeholder(phone)),
            None => format!("{team}: {}", self.no_manager()),
        }
    }

    pub fn footer(&self, updated: DateTime<Utc>, by: &str) -> String {
        format!(
            "updated: {} by {by}",
            updated.with_timezone(&self.timezone).format(DATE_FORMAT)
        )
    }

    /// A block carrying the configured colour.
    pub fn block(&self, title: impl Into<String>, lines: Vec<String>, empty: String) -> Block {
        Block {
            title: title.into(),
            text: if lines.is_empty() { empty } else { lines.join("\n") },
            color: self.color.clone(),
            footer: String::new(),
        }
    }

    fn phone_or_placeholder(&self, phone: Option<&str>) -> String {
        match phone {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => self.no_phone(),
        }
    }
}
