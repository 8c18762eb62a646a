//! Inbound command grammar.
//!
//! A command is a whitespace-separated token sequence; the first token
//! selects the operation:
//!
//! | op | positional params | minimum tier |
//! |---|---|---|
//! | list | [team] | base |
//! | update | | base |
//! | add | team, mention, [label] | manager |
//! | remove | team, mention | manager |
//! | swap | team, pos_a, pos_b | manager |
//! | flush | team | manager |
//! | register | team, [mention] | exempt |
//! | unregister | team, [mention] | exempt |
//!
//! Team names are upper-cased and labels lower-cased on the way in.

use std::fmt;

use oncall_core::models::team::{ManagerRef, RotationEntry};

use crate::error::CommandError;
use crate::permission::Tier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Update,
    Add,
    Remove,
    Swap,
    Flush,
    Register,
    Unregister,
}

impl Operation {
    pub const ALL: [Operation; 8] = [
        Operation::List,
        Operation::Add,
        Operation::Remove,
        Operation::Swap,
        Operation::Flush,
        Operation::Register,
        Operation::Unregister,
        Operation::Update,
    ];

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_lowercase().as_str() {
            "list" => Some(Operation::List),
            "update" => Some(Operation::Update),
            "add" => Some(Operation::Add),
            "remove" => Some(Operation::Remove),
            "swap" => Some(Operation::Swap),
            "flush" => Some(Operation::Flush),
            "register" => Some(Operation::Register),
            "unregister" => Some(Operation::Unregister),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Update => "update",
            Operation::Add => "add",
            Operation::Remove => "remove",
            Operation::Swap => "swap",
            Operation::Flush => "flush",
            Operation::Register => "register",
            Operation::Unregister => "unregister",
        }
    }

    pub fn required_tier(self) -> Tier {
        match self {
            Operation::List | Operation::Update => Tier::Base,
            Operation::Add | Operation::Remove | Operation::Swap | Operation::Flush => {
                Tier::Manager
            }
            Operation::Register | Operation::Unregister => Tier::Exempt,
        }
    }

    /// Usage lines for this operation, prefixed with the slash command.
    pub fn usage(self, command: &str) -> String {
        match self {
            Operation::List => format!(
                "`{command} list`\n\tDisplay list of teams and their managers\n\
                 `{command} list {{team}}`\n\tDisplay on-call list for _team_"
            ),
            Operation::Add => format!(
                "`{command} add {{team}} {{@username}} {{label}}`\n\t\
                 Add _@username_ to on-call list for _team_ with optional _label_"
            ),
            Operation::Remove => format!(
                "`{command} remove {{team}} {{@username}}`\n\t\
                 Remove _@username_ from on-call list for _team_"
            ),
            Operation::Swap => format!(
                "`{command} swap {{team}} {{position_a}} {{position_b}}`\n\t\
                 Swap _position_a_ and _position_b_ in the on-call list for _team_"
            ),
            Operation::Flush => format!(
                "`{command} flush {{team}}`\n\tFlush the entire on-call list for _team_"
            ),
            Operation::Register => format!(
                "`{command} register {{team}} {{@username}}`\n\t\
                 Register a new _team_ with _@username_ as its manager"
            ),
            Operation::Unregister => format!(
                "`{command} unregister {{team}} {{@username}}`\n\t\
                 Unregister _team_, or remove _@username_ from the _team_ manager list"
            ),
            Operation::Update => format!("`{command} update`\n\tRefresh your cached profile"),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Usage text for one operation, or for all of them.
pub fn usage(command: &str, operation: Option<Operation>) -> String {
    let body = match operation {
        Some(op) => op.usage(command),
        None => Operation::ALL
            .iter()
            .map(|op| op.usage(command))
            .collect::<Vec<_>>()
            .join("\n"),
    };
    format!("Usage:\n{body}")
}

/// A user reference of the form `<@ID|DISPLAYNAME>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    pub id: String,
    pub name: String,
}

impl Mention {
    pub fn parse(token: &str) -> Option<Self> {
        let inner = token.strip_prefix("<@")?.strip_suffix('>')?;
        let (id, name) = inner.split_once('|')?;
        if id.is_empty() || name.is_empty() || name.contains('|') {
            return None;
        }
        Some(Self {
            id: id.to_string(),
            name: name.to_string(),
        })
    }

    pub fn to_manager(&self) -> ManagerRef {
        ManagerRef {
            name: self.name.clone(),
            id: self.id.clone(),
        }
    }

    pub fn to_entry(&self, label: Option<String>) -> RotationEntry {
        RotationEntry {
            name: self.name.clone(),
            id: self.id.clone(),
            label,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List {
        team: Option<String>,
    },
    Update,
    Add {
        team: String,
        member: Mention,
        label: Option<String>,
    },
    Remove {
        team: String,
        member: Mention,
    },
    Swap {
        team: String,
        a: usize,
        b: usize,
    },
    Flush {
        team: String,
    },
    Register {
        team: String,
        manager: Option<Mention>,
    },
    Unregister {
        team: String,
        manager: Option<Mention>,
    },
    /// Empty or unknown operation.
    Help,
}

impl Command {
    pub fn parse(text: &str) -> Result<Self, CommandError> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let Some((keyword, args)) = tokens.split_first() else {
            return Ok(Command::Help);
        };
        let Some(operation) = Operation::from_keyword(keyword) else {
            return Ok(Command::Help);
        };

        let arity = |min: usize, max: usize| {
            if args.len() < min || args.len() > max {
                Err(CommandError::Arity {
                    operation,
                    got: args.len(),
                })
            } else {
                Ok(())
            }
        };
        let mention = |token: &str| {
            Mention::parse(token).ok_or_else(|| CommandError::Mention {
                operation,
                token: token.to_string(),
            })
        };
        let position = |token: &str| match token.parse::<usize>() {
            Ok(n) if n >= 1 => Ok(n),
            _ => Err(CommandError::Position {
                operation,
                token: token.to_string(),
            }),
        };
        let team = |token: &str| token.to_uppercase();

        let command = match operation {
            Operation::List => {
                arity(0, 1)?;
                Command::List {
                    team: args.first().map(|t| team(*t)),
                }
            }
            Operation::Update => Command::Update,
            Operation::Add => {
                arity(2, 3)?;
                Command::Add {
                    team: team(args[0]),
                    member: mention(args[1])?,
                    label: args.get(2).map(|l| l.to_lowercase()),
                }
            }
            Operation::Remove => {
                arity(2, 2)?;
                Command::Remove {
                    team: team(args[0]),
                    member: mention(args[1])?,
                }
            }
            Operation::Swap => {
                arity(3, 3)?;
                Command::Swap {
                    team: team(args[0]),
                    a: position(args[1])?,
                    b: position(args[2])?,
                }
            }
            Operation::Flush => {
                arity(1, 1)?;
                Command::Flush {
                    team: team(args[0]),
                }
            }
            Operation::Register => {
                arity(1, 2)?;
                Command::Register {
                    team: team(args[0]),
                    manager: args.get(1).map(|m| mention(*m)).transpose()?,
                }
            }
            Operation::Unregister => {
                arity(1, 2)?;
                Command::Unregister {
                    team: team(args[0]),
                    manager: args.get(1).map(|m| mention(*m)).transpose()?,
                }
            }
        };
        Ok(command)
    }

    pub fn operation(&self) -> Option<Operation> {
        match self {
            Command::List { .. } => Some(Operation::List),
            Command::Update => Some(Operation::Update),
            Command::Add { .. } => Some(Operation::Add),
            Command::Remove { .. } => Some(Operation::Remove),
            Command::Swap { .. } => Some(Operation::Swap),
            Command::Flush { .. } => Some(Operation::Flush),
            Command::Register { .. } => Some(Operation::Register),
            Command::Unregister { .. } => Some(Operation::Unregister),
            Command::Help => None,
        }
    }

    /// Team the command targets, if any.
    pub fn team(&self) -> Option<&str> {
        match self {
            Command::List { team } => team.as_deref(),
            Command::Add { team, .. }
            | Command::Remove { team, .. }
            | Command::Swap { team, .. }
            | Command::Flush { team }
            | Command::Register { team, .. }
            | Command::Unregister { team, .. } => Some(team),
            Command::Update | Command::Help => None,
        }
    }
}
