//! Slack Web API identity provider.

use std::time::Duration;

use oncall_core::error::{OncallError, OncallResult};
use oncall_core::models::identity::ProviderUser;
use oncall_core::repository::IdentityProvider;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

const PAGE_SIZE: &str = "200";

#[derive(Debug, Error)]
pub enum SlackError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Slack API error on {method}: {error}")]
    Api { method: &'static str, error: String },
}

impl From<SlackError> for OncallError {
    fn from(err: SlackError) -> Self {
        OncallError::External(err.to_string())
    }
}

#[derive(Debug, Default, Deserialize)]
struct Profile {
    #[serde(default)]
    phone: String,
}

#[derive(Debug, Deserialize)]
struct Member {
    id: String,
    name: String,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    is_admin: bool,
    #[serde(default)]
    is_bot: bool,
    #[serde(default)]
    profile: Profile,
}

impl From<Member> for ProviderUser {
    fn from(m: Member) -> Self {
        // Slackbot is reported as a regular member.
        let is_bot = m.is_bot || m.id == "USLACKBOT";
        ProviderUser {
            id: m.id,
            name: m.name,
            phone: m.profile.phone,
            is_admin: m.is_admin,
            is_bot,
            deleted: m.deleted,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    user: Option<Member>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Debug, Deserialize)]
struct UserListResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    members: Vec<Member>,
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

/// Interpret a `users.info` response. `user_not_found` means the
/// identity does not exist.
fn user_from_info(resp: UserInfoResponse) -> Result<Option<ProviderUser>, SlackError> {
    match (resp.ok, resp.user) {
        (true, Some(user)) => Ok(Some(user.into())),
        (true, None) => Ok(None),
        (false, _) if resp.error.as_deref() == Some("user_not_found") => Ok(None),
        (false, _) => Err(SlackError::Api {
            method: "users.info",
            error: resp.error.unwrap_or_else(|| "unknown".into()),
        }),
    }
}

/// Slack Web API client authenticated with a bot token.
#[derive(Clone)]
pub struct SlackClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl SlackClient {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, SlackError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        query: &[(&str, &str)],
    ) -> Result<T, SlackError> {
        let resp = self
            .http
            .get(format!("{}/{method}", self.base_url))
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json::<T>().await?)
    }

    pub async fn user_info(&self, id: &str) -> Result<Option<ProviderUser>, SlackError> {
        let resp: UserInfoResponse = self.call("users.info", &[("user", id)]).await?;
        user_from_info(resp)
    }

    /// Every workspace member, following the pagination cursor.
    pub async fn users(&self) -> Result<Vec<ProviderUser>, SlackError> {
        let mut users = Vec::new();
        let mut cursor = String::new();
        loop {
            let mut query = vec![("limit", PAGE_SIZE)];
            if !cursor.is_empty() {
                query.push(("cursor", cursor.as_str()));
            }
            let page: UserListResponse = self.call("users.list", &query).await?;
            if !page.ok {
                return Err(SlackError::Api {
                    method: "users.list",
                    error: page.error.unwrap_or_else(|| "unknown".into()),
                });
            }
            users.extend(page.members.into_iter().map(ProviderUser::from));

            if page.response_metadata.next_cursor.is_empty() {
                break;
            }
            cursor = page.response_metadata.next_cursor;
        }
        debug!(count = users.len(), "Listed Slack users");
        Ok(users)
    }
}

impl IdentityProvider for SlackClient {
    async fn get_by_id(&self, id: &str) -> OncallResult<Option<ProviderUser>> {
        Ok(self.user_info(id).await?)
    }

    async fn list_all(&self) -> OncallResult<Vec<ProviderUser>> {
        Ok(self.users().await?)
    }
}
