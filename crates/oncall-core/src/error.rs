//! Error types for the on-call system.

use thiserror::Error;

/// Coarse classification of an [`OncallError`].
///
/// Input and Permission errors are raised before any mutation starts,
/// Domain errors before the persist call, External errors only once a
/// durable-store or identity-provider call has actually been issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    Permission,
    External,
    Domain,
}

#[derive(Debug, Error)]
pub enum OncallError {
    #[error("invalid input for operation {operation}")]
    Input { operation: String },

    #[error("permission denied")]
    PermissionDenied,

    #[error("external failure: {0}")]
    External(String),

    #[error("team {team} is not registered")]
    TeamNotFound { team: String },

    #[error("identity {name} does not exist")]
    UnknownIdentity { name: String },

    #[error("team {team} is already registered")]
    AlreadyRegistered { team: String },

    #[error("{name} is already a manager of team {team}")]
    AlreadyManager { team: String, name: String },

    #[error("{name} is not a manager of team {team}")]
    NotManager { team: String, name: String },

    #[error("{name} is already assigned to the {team} rotation")]
    AlreadyAssigned { team: String, name: String },

    #[error("{name} is not in the {team} rotation")]
    NotInRotation { team: String, name: String },

    #[error("team {team} has nobody in its rotation")]
    EmptyRotation { team: String },

    #[error("positions {a} and {b} are out of range for team {team}")]
    PositionOutOfRange { team: String, a: usize, b: usize },

    #[error("positions are identical, nothing to swap")]
    SamePosition,
}

impl OncallError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OncallError::Input { .. } => ErrorKind::Input,
            OncallError::PermissionDenied => ErrorKind::Permission,
            OncallError::External(_) => ErrorKind::External,
            OncallError::TeamNotFound { .. }
            | OncallError::UnknownIdentity { .. }
            | OncallError::AlreadyRegistered { .. }
            | OncallError::AlreadyManager { .. }
            | OncallError::NotManager { .. }
            | OncallError::AlreadyAssigned { .. }
            | OncallError::NotInRotation { .. }
            | OncallError::EmptyRotation { .. }
            | OncallError::PositionOutOfRange { .. }
            | OncallError::SamePosition => ErrorKind::Domain,
        }
    }

    pub fn is_external(&self) -> bool {
        self.kind() == ErrorKind::External
    }
}

pub type OncallResult<T> = Result<T, OncallError>;
