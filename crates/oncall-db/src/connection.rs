//! SurrealDB connection management.

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::{debug, info};

/// Where the team store lives and how to log in to it.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// WebSocket address, `host:port`.
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "oncall".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

/// Authenticated handle on the on-call database.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    pub async fn connect(config: &DbConfig) -> Result<Self, surrealdb::Error> {
        let db = Surreal::new::<Ws>(config.url.as_str()).await?;
        debug!(url = %config.url, "Opened SurrealDB socket");

        let credentials = Root {
            username: config.username.clone(),
            password: config.password.clone(),
        };
        db.signin(credentials).await?;
        db.use_ns(&config.namespace).use_db(&config.database).await?;

        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Connected to team store"
        );
        Ok(Self { db })
    }

    /// Round-trip to the server to confirm the connection is usable.
    pub async fn ping(&self) -> Result<(), surrealdb::Error> {
        self.db.health().await
    }

    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }
}
