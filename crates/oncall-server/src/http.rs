//! Slash-command endpoint.

use std::sync::Arc;

use axum::extract::{Form, State};
use axum::routing::post;
use axum::{Json, Router};
use oncall_core::repository::{IdentityProvider, TeamStore};
use oncall_rotation::{CommandRequest, OncallService, Reply};
use serde::Deserialize;
use tracing::{Instrument, info_span, warn};
use uuid::Uuid;

/// Form fields Slack posts for a slash command.
#[derive(Debug, Deserialize)]
pub struct SlashCommand {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
}

pub struct AppState<S: TeamStore, P: IdentityProvider> {
    pub service: OncallService<S, P>,
    /// Verification token every request must carry.
    pub token: String,
    /// Slash command this endpoint answers to.
    pub command: String,
}

pub fn router<S, P>(state: Arc<AppState<S, P>>, endpoint: &str) -> Router
where
    S: TeamStore + 'static,
    P: IdentityProvider + 'static,
{
    Router::new()
        .route(endpoint, post(handle_command::<S, P>))
        .with_state(state)
}

async fn handle_command<S, P>(
    State(state): State<Arc<AppState<S, P>>>,
    Form(form): Form<SlashCommand>,
) -> Json<Reply>
where
    S: TeamStore + 'static,
    P: IdentityProvider + 'static,
{
    if form.token != state.token {
        warn!(user_id = %form.user_id, "Rejected command with invalid token");
        return Json(Reply::text(state.service.messages().external()));
    }
    if form.command != state.command {
        warn!(
            command = %form.command,
            expected = %state.command,
            "Rejected unsupported command"
        );
        return Json(Reply::text(state.service.messages().external()));
    }

    let span = info_span!(
        "slash_command",
        request_id = %Uuid::new_v4(),
        user_id = %form.user_id,
    );
    let request = CommandRequest {
        user_id: form.user_id,
        user_name: form.user_name,
        text: form.text,
    };
    Json(state.service.handle(request).instrument(span).await)
}
