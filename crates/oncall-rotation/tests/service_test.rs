//! End-to-end tests for command handling against in-memory fakes.

mod common;

use std::time::Duration;

use common::{FakeProvider, FakeTeamStore, entry, manager, team, user};
use oncall_rotation::{CommandRequest, OncallConfig, OncallService, Reply};

type Service = OncallService<FakeTeamStore, FakeProvider>;

fn config() -> OncallConfig {
    OncallConfig {
        superusers: vec!["root".into()],
        ..Default::default()
    }
}

fn provider() -> FakeProvider {
    FakeProvider::with_users(vec![
        user("U0", "root", "555-0100"),
        user("U1", "alice", "555-0101"),
        user("U2", "bob", "555-0102"),
        user("U3", "carol", ""),
        user("U9", "mallory", "555-0109"),
    ])
}

async fn service(store: FakeTeamStore) -> Service {
    let service = OncallService::new(store, provider(), &config());
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
async fn register_add_list_round_trip() {
    let svc = service(FakeTeamStore::default()).await;

    let reply = send(&svc, "U0", "root", "register ENG <@U1|alice>").await;
    assert_eq!(reply.text, "Success! New team ENG registered, with manager <@alice>");

    let reply = send(&svc, "U1", "alice", "add ENG <@U2|bob> oncall").await;
    assert!(reply.text.starts_with("Success! <@bob> added to the on-call list for ENG"));

    let reply = send(&svc, "U9", "mallory", "list ENG").await;
    assert_eq!(reply.text, "On-call list for: ENG");
    assert_eq!(reply.attachments.len(), 2);
    assert!(reply.attachments[0].text.contains("Manager: alice 555-0101"));
    assert_eq!(reply.attachments[1].text, "1: bob 555-0102 (oncall)");
    assert!(reply.attachments[1].footer.ends_with("by alice"));
}

#[tokio::test]
async fn team_names_and_labels_are_normalized() {
    let svc = service(FakeTeamStore::default()).await;

    send(&svc, "U0", "root", "register eng <@U1|alice>").await;
    send(&svc, "U1", "alice", "ADD Eng <@U3|carol> Support").await;

    let reply = send(&svc, "U1", "alice", "list eng").await;
    assert_eq!(
        reply.attachments[1].text,
        "1: carol Phone not set :exclamation: (support)"
    );
}

#[tokio::test]
async fn outsider_cannot_mutate_but_can_read() {
    let store = FakeTeamStore::with_teams(vec![team(
        "ENG",
        vec![manager("U1", "alice")],
        vec![entry("U2", "bob", None), entry("U3", "carol", None)],
    )]);
    let svc = service(store).await;
    let denied = "Sorry! you can't do that :exclamation:";

    for text in [
        "add ENG <@U9|mallory>",
        "remove ENG <@U2|bob>",
        "swap ENG 1 2",
        "flush ENG",
        "register ENG <@U9|mallory>",
        "unregister ENG",
    ] {
        let reply = send(&svc, "U9", "mallory", text).await;
        assert_eq!(reply.text, denied, "command: {text}");
    }
    assert_eq!(svc.store().backend().puts(), 0);
    assert_eq!(svc.store().get_team("ENG").await.unwrap().rotation.len(), 2);

    let reply = send(&svc, "U9", "mallory", "list ENG").await;
    assert_eq!(reply.attachments[1].text, "1: bob 555-0102\n2: carol Phone not set :exclamation:");
    let reply = send(&svc, "U9", "mallory", "update").await;
    assert_eq!(reply.text, "Success! Your information is now up to date!");
}

#[tokio::test]
async fn manager_of_one_team_cannot_touch_another() {
    let store = FakeTeamStore::with_teams(vec![
        team("ENG", vec![manager("U1", "alice")], vec![]),
        team("OPS", vec![manager("U2", "bob")], vec![]),
    ]);
    let svc = service(store).await;

    let reply = send(&svc, "U1", "alice", "flush OPS").await;
    assert_eq!(reply.text, "Sorry! you can't do that :exclamation:");
    let reply = send(&svc, "U1", "alice", "flush ENG").await;
    assert_eq!(reply.text, "Success! Removed all on-call list from ENG");
}

#[tokio::test]
async fn rendering_prunes_identities_that_no_longer_exist() {
    let store = FakeTeamStore::with_teams(vec![team(
        "GHOST",
        vec![manager("U404", "vanished")],
        vec![entry("U405", "departed", Some("db"))],
    )]);
    let svc = service(store).await;

    let reply = send(&svc, "U0", "root", "list GHOST").await;
    assert_eq!(reply.attachments[0].text, "Manager not set :exclamation:");
    assert_eq!(reply.attachments[1].text, "On-call list not set :exclamation:");

    let stored = svc.store().backend().stored("GHOST").unwrap();
    assert!(stored.managers.is_empty());
    assert!(stored.rotation.is_empty());
    let live = svc.store().get_team("GHOST").await.unwrap();
    assert!(live.managers.is_empty());
    assert!(live.rotation.is_empty());
    assert_eq!(live.updated_by, "seed");
}

#[tokio::test]
async fn pruning_renumbers_remaining_entries() {
    let store = FakeTeamStore::with_teams(vec![team(
        "ENG",
        vec![manager("U1", "alice")],
        vec![entry("U404", "gone", None), entry("U2", "bob", Some("oncall"))],
    )]);
    let svc = service(store).await;

    let reply = send(&svc, "U1", "alice", "list ENG").await;
    assert_eq!(reply.attachments[1].text, "1: bob 555-0102 (oncall)");
    assert_eq!(svc.store().get_team("ENG").await.unwrap().rotation.len(), 1);
}

#[tokio::test]
async fn store_failure_reports_external_error_and_keeps_state() {
    let store = FakeTeamStore::with_teams(vec![team(
        "ENG",
        vec![manager("U1", "alice")],
        vec![entry("U2", "bob", None), entry("U3", "carol", None)],
    )]);
    let svc = service(store).await;
    let before = svc.store().get_team("ENG").await.unwrap();
    svc.store().backend().fail_writes(true);

    let reply = send(&svc, "U1", "alice", "swap ENG 1 2").await;
    assert_eq!(
        reply.text,
        "Unexpected error occurred, please contact @admin :negative_squared_cross_mark:"
    );
    assert_eq!(svc.store().get_team("ENG").await.unwrap(), before);
}

#[tokio::test]
async fn domain_errors_use_specific_messages() {
    let store = FakeTeamStore::with_teams(vec![team(
        "ENG",
        vec![manager("U1", "alice")],
        vec![entry("U2", "bob", None), entry("U3", "carol", None)],
    )]);
    let svc = service(store).await;

    let reply = send(&svc, "U1", "alice", "add ENG <@U2|bob>").await;
    assert_eq!(reply.text, "<@bob> already assigned ENG rotation :exclamation:");

    let reply = send(&svc, "U1", "alice", "swap ENG 2 2").await;
    assert_eq!(reply.text, "position_A and position_B are same, nothing to do!");

    let reply = send(&svc, "U1", "alice", "swap ENG 1 5").await;
    assert!(reply.text.starts_with("Sorry, swap could not be completed!"));

    let reply = send(&svc, "U1", "alice", "add ENG <@U777|nobody>").await;
    assert_eq!(reply.text, "<@nobody> doesn't exist in Slack :exclamation:");

    let reply = send(&svc, "U0", "root", "list NOPE").await;
    assert_eq!(reply.text, "Sorry, team NOPE does not exist :exclamation:");

    let reply = send(&svc, "U0", "root", "register ENG").await;
    assert_eq!(reply.text, "Team ENG has already been registered :exclamation:");
}

#[tokio::test]
async fn malformed_and_unknown_commands_show_usage() {
    let svc = service(FakeTeamStore::default()).await;

    let reply = send(&svc, "U0", "root", "swap ENG one two").await;
    assert!(reply.text.starts_with("Usage:\n`/oncall swap"));
    assert!(!reply.text.contains("flush"));

    let reply = send(&svc, "U0", "root", "add ENG bob").await;
    assert!(reply.text.starts_with("Usage:\n`/oncall add"));

    let reply = send(&svc, "U0", "root", "dance").await;
    assert!(reply.text.contains("`/oncall register"));
    assert!(reply.text.contains("`/oncall flush"));

    let reply = send(&svc, "U0", "root", "").await;
    assert!(reply.text.starts_with("Usage:\n"));
}

#[tokio::test]
async fn team_overview_lists_managers() {
    let store = FakeTeamStore::with_teams(vec![
        team("ENG", vec![manager("U1", "alice"), manager("U3", "carol")], vec![]),
        team("OPS", vec![], vec![]),
    ]);
    let svc = service(store).await;

    let reply = send(&svc, "U9", "mallory", "list").await;
    assert_eq!(reply.text, "List of Teams and Managers:");
    assert_eq!(
        reply.attachments[0].text,
        "ENG: alice 555-0101\nENG: carol Phone not set :exclamation:\nOPS: Manager not set :exclamation:"
    );
}

#[tokio::test]
async fn register_and_unregister_track_manager_counts() {
    let store = FakeTeamStore::with_teams(vec![team("ENG", vec![manager("U1", "alice")], vec![])]);
    let svc = service(store).await;
    assert_eq!(svc.identities().cached("U1").unwrap().manager_refs, 1);

    send(&svc, "U0", "root", "register OPS <@U1|alice>").await;
    assert_eq!(svc.identities().cached("U1").unwrap().manager_refs, 2);

    let reply = send(&svc, "U0", "root", "unregister OPS <@U1|alice>").await;
    assert_eq!(reply.text, "Success! Manager <@alice> removed as a manager from team OPS");
    assert_eq!(svc.identities().cached("U1").unwrap().manager_refs, 1);

    let reply = send(&svc, "U0", "root", "unregister ENG").await;
    assert_eq!(reply.text, "Success! Team ENG removed from oncall command");
    assert_eq!(svc.identities().cached("U1").unwrap().manager_refs, 0);
    assert!(svc.store().backend().stored("ENG").is_none());
}

#[tokio::test]
async fn update_refreshes_caller_profile() {
    let svc = service(FakeTeamStore::default()).await;
    send(&svc, "U3", "carol", "list").await;

    svc.identities().provider().upsert(user("U3", "carol", "555-0303"));
    let reply = send(&svc, "U3", "carol", "update").await;
    assert_eq!(reply.text, "Success! Your information is now up to date!");
    assert_eq!(svc.identities().cached("U3").unwrap().phone, "555-0303");

    let reply = send(&svc, "U404", "ghost", "update").await;
    assert_eq!(reply.text, "Sorry! You don't exist in Slack :exclamation:");
}

#[tokio::test(start_paused = true)]
async fn slow_provider_hits_the_request_deadline() {
    let store = FakeTeamStore::with_teams(vec![team("ENG", vec![manager("U1", "alice")], vec![])]);
    let svc = service(store).await;
    svc.identities().provider().set_delay(Duration::from_secs(10));

    let reply = send(&svc, "U1", "alice", "add ENG <@U2|bob>").await;
    assert!(reply.text.starts_with("Unexpected error occurred"));
    assert!(svc.store().get_team("ENG").await.unwrap().rotation.is_empty());
    assert_eq!(svc.store().backend().puts(), 0);
}
