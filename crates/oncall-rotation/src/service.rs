//! Command handling: permission gate, mutation protocol and rendering.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use oncall_core::error::{ErrorKind, OncallError, OncallResult};
use oncall_core::models::team::TeamRotation;
use oncall_core::repository::{IdentityProvider, TeamStore};
use tracing::{Instrument, debug, info, info_span, warn};

use crate::command::{Command, Mention, Operation};
use crate::config::OncallConfig;
use crate::context::{Actor, RequestContext};
use crate::identity::IdentityCache;
use crate::permission::PermissionResolver;
use crate::reply::{Block, Messages, Reply};
use crate::store::{AddOutcome, RegisterOutcome, RotationStore};

/// An inbound command as received from the transport.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub user_id: String,
    pub user_name: String,
    pub text: String,
}

/// The on-call service.
///
/// Generic over the durable store and identity provider so tests can
/// substitute in-memory fakes.
pub struct OncallService<S: TeamStore, P: IdentityProvider> {
    store: Arc<RotationStore<S>>,
    identities: Arc<IdentityCache<P>>,
    permissions: PermissionResolver<S, P>,
    messages: Messages,
    timeout: Duration,
}

impl<S: TeamStore, P: IdentityProvider> OncallService<S, P> {
    pub fn new(store: S, provider: P, config: &OncallConfig) -> Self {
        let store = Arc::new(RotationStore::new(store));
        let identities = Arc::new(IdentityCache::new(
            provider,
            config.cache_ttl,
            config.superusers.clone(),
        ));
        let permissions = PermissionResolver::new(
            Arc::clone(&store),
            Arc::clone(&identities),
            config.admin_exemption_enabled(),
        );
        Self {
            store,
            identities,
            permissions,
            messages: Messages::new(config),
            timeout: config.operation_timeout,
        }
    }

    pub fn store(&self) -> &RotationStore<S> {
        &self.store
    }

    pub fn identities(&self) -> &IdentityCache<P> {
        &self.identities
    }

    pub fn permissions(&self) -> &PermissionResolver<S, P> {
        &self.permissions
    }

    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    /// Load persisted state, warm manager counters and resolve the
    /// configured superusers.
    ///
    /// Only a failed load is fatal; the other two steps are retried
    /// lazily and their failures are logged.
    pub async fn bootstrap(&self) -> OncallResult<()> {
        self.store.load().await?;

        for team in self.store.list_teams().await {
            for manager in &team.managers {
                if let Err(e) = self.identities.adjust_manager_count(&manager.id, 1).await {
                    warn!(
                        team = %team.team,
                        manager = %manager.id,
                        error = %e,
                        "Failed to warm manager count"
                    );
                }
            }
        }

        if let Err(e) = self.permissions.initialize().await {
            warn!(error = %e, "Superuser preload failed, will retry on first permission check");
        }
        Ok(())
    }

    /// Handle one command end to end. Never fails: every error is
    /// rendered into the reply.
    pub async fn handle(&self, request: CommandRequest) -> Reply {
        let command = match Command::parse(&request.text) {
            Ok(command) => command,
            Err(e) => {
                debug!(error = %e, "Rejected malformed command");
                return Reply::text(self.messages.usage(Some(e.operation())));
            }
        };
        let Some(operation) = command.operation() else {
            return Reply::text(self.messages.usage(None));
        };

        let ctx = RequestContext::new(
            Actor {
                id: request.user_id,
                name: request.user_name,
            },
            self.timeout,
        );
        let span = info_span!("command", %operation, actor = %ctx.actor().id);
        let result = ctx
            .within(self.run(&ctx, operation, command))
            .instrument(span)
            .await;

        match result {
            Ok(reply) => reply,
            Err(e) => self.error_reply(operation, &e),
        }
    }

    fn error_reply(&self, operation: Operation, err: &OncallError) -> Reply {
        match err.kind() {
            ErrorKind::Input => Reply::text(self.messages.usage(Some(operation))),
            ErrorKind::Permission => Reply::text(self.messages.denied()),
            ErrorKind::External => {
                warn!(%operation, error = %err, "Command failed on an external call");
                Reply::text(self.messages.external())
            }
            ErrorKind::Domain => Reply::text(self.messages.domain(err)),
        }
    }

    async fn run(
        &self,
        ctx: &RequestContext,
        operation: Operation,
        command: Command,
    ) -> OncallResult<Reply> {
        let actor = ctx.actor();
        self.permissions
            .authorize(&actor.id, command.team(), operation.required_tier())
            .await?;

        match command {
            Command::List { team: None } => self.overview().await,
            Command::List { team: Some(team) } => {
                let blocks = self.roster(&team).await?;
                Ok(Reply::with_blocks(format!("On-call list for: {team}"), blocks))
            }
            Command::Update => match self.identities.resolve(&actor.id, true).await? {
                Some(_) => Ok(Reply::text("Success! Your information is now up to date!")),
                None => Ok(Reply::text(self.messages.caller_unknown())),
            },
            Command::Add { team, member, label } => {
                self.ensure_exists(&member).await?;
                let (outcome, _) = self
                    .store
                    .add(&actor.name, &team, member.to_entry(label))
                    .await?;
                let text = match outcome {
                    AddOutcome::Added => format!(
                        "Success! <@{}> added to the on-call list for {team}\nNew list:",
                        member.name
                    ),
                    AddOutcome::Updated => {
                        format!("Success! Information updated for <@{}>\nNew list:", member.name)
                    }
                };
                self.with_roster(text, &team).await
            }
            Command::Remove { team, member } => {
                self.store
                    .remove(&actor.name, &team, &member.id, &member.name)
                    .await?;
                let text = format!(
                    "Success! <@{}> removed from the on-call list for {team}\nNew list:",
                    member.name
                );
                self.with_roster(text, &team).await
            }
            Command::Swap { team, a, b } => {
                self.store.swap(&actor.name, &team, a, b).await?;
                let text = format!(
                    "Success! Swapped position {a} and {b} in the on-call list for {team}\nNew list:"
                );
                self.with_roster(text, &team).await
            }
            Command::Flush { team } => {
                self.store.flush(&actor.name, &team).await?;
                Ok(Reply::text(format!("Success! Removed all on-call list from {team}")))
            }
            Command::Register { team, manager } => self.register(actor, &team, manager).await,
            Command::Unregister { team, manager } => self.unregister(actor, &team, manager).await,
            Command::Help => Ok(Reply::text(self.messages.usage(None))),
        }
    }

    async fn register(
        &self,
        actor: &Actor,
        team: &str,
        manager: Option<Mention>,
    ) -> OncallResult<Reply> {
        if let Some(manager) = &manager {
            self.ensure_exists(manager).await?;
        }
        let (outcome, _) = self
            .store
            .register(&actor.name, team, manager.as_ref().map(Mention::to_manager))
            .await?;
        if let Some(manager) = &manager {
            self.bump_manager_count(&manager.id, 1).await;
        }

        let text = match (outcome, manager) {
            (RegisterOutcome::Created, None) => format!("Success! New team {team} registered"),
            (RegisterOutcome::Created, Some(m)) => {
                format!("Success! New team {team} registered, with manager <@{}>", m.name)
            }
            (RegisterOutcome::ManagerAdded, m) => format!(
                "Success! <@{}> added as a manager of team {team}",
                m.map(|m| m.name).unwrap_or_default()
            ),
        };
        Ok(Reply::text(text))
    }

    async fn unregister(
        &self,
        actor: &Actor,
        team: &str,
        manager: Option<Mention>,
    ) -> OncallResult<Reply> {
        match manager {
            None => {
                let removed = self.store.unregister(&actor.name, team, None).await?;
                for m in &removed.managers {
                    self.bump_manager_count(&m.id, -1).await;
                }
                Ok(Reply::text(format!("Success! Team {team} removed from oncall command")))
            }
            Some(manager) => {
                self.store
                    .unregister(&actor.name, team, Some(&manager.to_manager()))
                    .await?;
                self.bump_manager_count(&manager.id, -1).await;
                Ok(Reply::text(format!(
                    "Success! Manager <@{}> removed as a manager from team {team}",
                    manager.name
                )))
            }
        }
    }

    async fn ensure_exists(&self, member: &Mention) -> OncallResult<()> {
        match self.identities.resolve(&member.id, false).await? {
            Some(_) => Ok(()),
            None => Err(OncallError::UnknownIdentity {
                name: member.name.clone(),
            }),
        }
    }

    async fn bump_manager_count(&self, id: &str, delta: i64) {
        if let Err(e) = self.identities.adjust_manager_count(id, delta).await {
            warn!(user_id = id, delta, error = %e, "Failed to adjust manager count");
        }
    }

    async fn with_roster(&self, text: String, team: &str) -> OncallResult<Reply> {
        let blocks = self.roster(team).await?;
        Ok(Reply::with_blocks(text, blocks))
    }

    /// One block per team listing each manager, or a placeholder.
    async fn overview(&self) -> OncallResult<Reply> {
        let mut lines = Vec::new();
        for team in self.store.list_teams().await {
            if team.managers.is_empty() {
                lines.push(self.messages.overview_line(&team.team, None));
                continue;
            }
            for manager in &team.managers {
                let phone = self.phone_of(&manager.id).await;
                lines.push(
                    self.messages
                        .overview_line(&team.team, Some((&manager.name, phone.as_deref()))),
                );
            }
        }
        let block = self.messages.block("", lines, String::new());
        Ok(Reply::with_blocks("List of Teams and Managers:", vec![block]))
    }

    /// Phone of a cached or fetched identity; `None` on any failure.
    async fn phone_of(&self, id: &str) -> Option<String> {
        match self.identities.resolve(id, false).await {
            Ok(record) => record.and_then(|r| r.phone().map(str::to_string)),
            Err(e) => {
                debug!(user_id = id, error = %e, "Phone lookup failed");
                None
            }
        }
    }

    /// Render a team's manager block and rotation block.
    ///
    /// Every manager and entry is re-resolved; those the provider
    /// reports gone are left out of the rendering and pruned from the
    /// live record.
    async fn roster(&self, team: &str) -> OncallResult<Vec<Block>> {
        let record = self.store.get_team(team).await?;
        let mut gone = HashSet::new();

        let mut managers = Vec::new();
        for manager in &record.managers {
            match self.identities.resolve(&manager.id, false).await {
                Ok(Some(identity)) => {
                    managers.push(self.messages.manager_line(&manager.name, identity.phone()))
                }
                Ok(None) => {
                    gone.insert(manager.id.clone());
                }
                Err(e) => {
                    debug!(user_id = %manager.id, error = %e, "Rendering manager without profile");
                    managers.push(self.messages.manager_line(&manager.name, None));
                }
            }
        }

        let mut rotation = Vec::new();
        for entry in &record.rotation {
            let position = rotation.len() + 1;
            match self.identities.resolve(&entry.id, false).await {
                Ok(Some(identity)) => {
                    rotation.push(self.messages.rotation_line(position, entry, identity.phone()))
                }
                Ok(None) => {
                    gone.insert(entry.id.clone());
                }
                Err(e) => {
                    debug!(user_id = %entry.id, error = %e, "Rendering entry without profile");
                    rotation.push(self.messages.rotation_line(position, entry, None));
                }
            }
        }

        if !gone.is_empty() {
            self.heal(&record, &gone).await;
        }

        let manager_block = self.messages.block("", managers, self.messages.no_manager());
        let mut rotation_block = self.messages.block("", rotation, self.messages.no_rotation());
        rotation_block.footer = self.messages.footer(record.updated, &record.updated_by);
        Ok(vec![manager_block, rotation_block])
    }

    async fn heal(&self, record: &TeamRotation, gone: &HashSet<String>) {
        match self.store.prune(&record.team, gone).await {
            Ok(Some(_)) => {
                for m in record.managers.iter().filter(|m| gone.contains(&m.id)) {
                    info!(
                        team = %record.team,
                        manager = %m.id,
                        "Dropped manager that no longer exists"
                    );
                }
            }
            Ok(None) => {}
            Err(e) => warn!(team = %record.team, error = %e, "Failed to persist pruned team"),
        }
    }
}
