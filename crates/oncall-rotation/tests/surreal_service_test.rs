//! End-to-end tests against the SurrealDB team store (in-memory engine).

mod common;

use common::{FakeProvider, user};
use oncall_db::repository::SurrealTeamStore;
use oncall_rotation::{CommandRequest, OncallConfig, OncallService, Reply};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

type Service = OncallService<SurrealTeamStore<Db>, FakeProvider>;

fn provider() -> FakeProvider {
    FakeProvider::with_users(vec![
        user("U0", "root", "555-0100"),
        user("U1", "alice", "555-0101"),
        user("U2", "bob", "555-0102"),
    ])
}

async fn service(db: &Surreal<Db>) -> Service {
    let config = OncallConfig {
        superusers: vec!["root".into()],
        ..Default::default()
    };
    let service = OncallService::new(SurrealTeamStore::new(db.clone()), provider(), &config);
    service.bootstrap().await.unwrap();
    service
}

async fn send(service: &Service, user_id: &str, user_name: &str, text: &str) -> Reply {
    service
        .handle(CommandRequest {
            user_id: user_id.into(),
            user_name: user_name.into(),
            text: text.into(),
        })
        .await
}

#[tokio::test]
async fn state_survives_a_restart() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    oncall_db::run_migrations(&db).await.unwrap();

    let first = service(&db).await;
    send(&first, "U0", "root", "register ENG <@U1|alice>").await;
    send(&first, "U1", "alice", "add ENG <@U2|bob> oncall").await;
    let reply = send(&first, "U1", "alice", "list ENG").await;
    assert!(reply.attachments[0].text.contains("Manager: alice 555-0101"));
    assert_eq!(reply.attachments[1].text, "1: bob 555-0102 (oncall)");

    let restarted = service(&db).await;
    let team = restarted.store().get_team("ENG").await.unwrap();
    assert_eq!(team.key.as_deref(), Some("ENG"));
    assert_eq!(team.rotation.len(), 1);
    assert_eq!(team.rotation[0].label.as_deref(), Some("oncall"));
    assert_eq!(restarted.identities().cached("U1").unwrap().manager_refs, 1);

    let reply = send(&restarted, "U1", "alice", "list ENG").await;
    assert_eq!(reply.attachments[1].text, "1: bob 555-0102 (oncall)");
}

#[tokio::test]
async fn unregister_deletes_the_stored_record() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    oncall_db::run_migrations(&db).await.unwrap();

    let svc = service(&db).await;
    send(&svc, "U0", "root", "register OPS").await;
    let reply = send(&svc, "U0", "root", "unregister OPS").await;
    assert_eq!(reply.text, "Success! Team OPS removed from oncall command");

    let restarted = service(&db).await;
    assert!(restarted.store().list_teams().await.is_empty());
}
