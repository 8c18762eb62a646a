//! Command grammar errors.

use oncall_core::error::OncallError;
use thiserror::Error;

use crate::command::Operation;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("{operation}: wrong number of arguments ({got})")]
    Arity { operation: Operation, got: usize },

    #[error("{operation}: {token} is not a user mention")]
    Mention { operation: Operation, token: String },

    #[error("{operation}: {token} is not a position")]
    Position { operation: Operation, token: String },
}

impl CommandError {
    pub fn operation(&self) -> Operation {
        match self {
            CommandError::Arity { operation, .. }
            | CommandError::Mention { operation, .. }
            | CommandError::Position { operation, .. } => *operation,
        }
    }
}

impl From<CommandError> for OncallError {
    fn from(err: CommandError) -> Self {
        OncallError::Input {
            operation: err.operation().to_string(),
        }
    }
}
