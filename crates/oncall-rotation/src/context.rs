//! Per-request context: who is asking, and by when the answer is due.

use std::time::Duration;

use oncall_core::error::{OncallError, OncallResult};
use tokio::time::Instant;
use tracing::warn;

/// The identity issuing a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub name: String,
}

/// One inbound request. Every external call the request triggers runs
/// under the same deadline.
#[derive(Debug, Clone)]
pub struct RequestContext {
    actor: Actor,
    deadline: Instant,
}

impl RequestContext {
    pub fn new(actor: Actor, timeout: Duration) -> Self {
        Self {
            actor,
            deadline: Instant::now() + timeout,
        }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Drive `fut` to completion or fail closed once the deadline passes.
    ///
    /// A future cut off by the deadline is dropped mid-flight; the
    /// rotation store only commits after a successful persist, so
    /// in-memory state is left as it was.
    pub async fn within<F, T>(&self, fut: F) -> OncallResult<T>
    where
        F: Future<Output = OncallResult<T>>,
    {
        match tokio::time::timeout_at(self.deadline, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(actor = %self.actor.id, "Request deadline exceeded");
                Err(OncallError::External("request deadline exceeded".into()))
            }
        }
    }
}
