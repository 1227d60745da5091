use serde_json::json;
use shrike_adapters::rest::RestBridge;
use shrike_core::browse::NamespaceBrowseState;
use shrike_core::dispatcher::{DispatchError, QueryDispatcher};
use shrike_core::profiles::ConnectionProfile;
use shrike_core::query_spec::{parse, ParseContext, QuerySpec};
use shrike_core::session::{SessionController, SessionError};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn bridge_profile() -> ConnectionProfile {
    let mut profile = ConnectionProfile::new("bridge-test", "10.0.0.1:3000,10.0.0.2:3000");
    profile.username = Some("admin".to_string());
    profile.password = Some("hunter2".to_string());
    profile
}

async fn mount_happy_connect(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/connect"))
        .and(body_json(json!({
            "hosts": "10.0.0.1:3000,10.0.0.2:3000",
            "port": 3000,
            "username": "admin",
            "password": "hunter2",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/cluster/nodes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "BB9020011AC4202", "namespaces": ["test", "bar"]}
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn connect_builds_a_session_from_the_bridge() {
    let server = MockServer::start().await;
    mount_happy_connect(&server).await;

    let mut controller = SessionController::new(RestBridge::new(server.uri()));
    controller
        .connect(bridge_profile(), None)
        .await
        .expect("connect should succeed");

    let session = controller.session().expect("session should be active");
    assert_eq!(session.namespaces(), vec!["test", "bar"]);
    assert_eq!(session.nickname.as_deref(), Some("bridge-test"));
}

#[tokio::test]
async fn connection_refusal_surfaces_the_bridge_message_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/connect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": false,
            "message": "Invalid user name or password",
        })))
        .mount(&server)
        .await;

    let mut controller = SessionController::new(RestBridge::new(server.uri()));
    let error = controller
        .connect(bridge_profile(), None)
        .await
        .expect_err("connect should be refused");

    let SessionError::Connector(connector_error) = error else {
        panic!("expected a connector error");
    };
    assert_eq!(connector_error.to_string(), "Invalid user name or password");
}

#[tokio::test]
async fn browse_query_and_scan_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/namespaces/test/sets"))
        .and(query_param("node", "BB9020011AC4202"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"set": "users", "objects": 2, "size_bytes": 4096},
            {"set": "events", "objects": 10, "size_bytes": 1048576}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/query"))
        .and(body_json(json!({
            "$pk": ["user-1"],
            "$select": ["name"],
            "ns": "test",
            "set": "users",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "ada"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/scan/test/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"kind": "click", "at": 17},
            {"kind": "view"}
        ])))
        .mount(&server)
        .await;

    let bridge = RestBridge::new(server.uri());
    let mut browse = NamespaceBrowseState::enter(
        &bridge,
        "10.0.0.1:3000",
        "test",
        Some("BB9020011AC4202"),
    )
    .await
    .expect("enter should succeed");
    assert_eq!(browse.sets().len(), 2);

    let mut dispatcher = QueryDispatcher::new(bridge);

    // Validated pk lookup against the first set.
    let spec = parse(
        r#"{"$pk": ["user-1"], "$select": ["name"]}"#,
        &ParseContext::default(),
    )
    .expect("document should validate");
    let ticket = dispatcher
        .begin(browse.snapshot().expect("context should exist"))
        .expect("begin should succeed");
    let rows = dispatcher
        .execute(&spec, &ticket)
        .await
        .expect("query should succeed");
    let set = ticket.context().set.clone();
    let results = dispatcher
        .complete(ticket, rows)
        .expect("ticket should still be current");
    assert_eq!(results.header_keys, vec!["name"]);
    assert!(browse.attach_results(&set, results));

    // Scan against the second set through the dedicated entry point.
    browse.select_set(1).expect("index 1 is valid");
    let ticket = dispatcher
        .begin(browse.snapshot().expect("context should exist"))
        .expect("begin should succeed");
    let rows = dispatcher
        .execute(&QuerySpec::Scan, &ticket)
        .await
        .expect("scan should succeed");
    let set = ticket.context().set.clone();
    let results = dispatcher
        .complete(ticket, rows)
        .expect("ticket should still be current");
    assert_eq!(results.header_keys, vec!["at", "kind"]);
    assert_eq!(results.row_cells(1), vec!["", "view"]);
    assert!(browse.attach_results(&set, results));

    assert!(browse.sets()[0].records.is_some());
    assert!(browse.sets()[1].records.is_some());
}

#[tokio::test]
async fn http_failures_map_onto_remote_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/query"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut dispatcher = QueryDispatcher::new(RestBridge::new(server.uri()));
    let ticket = dispatcher
        .begin(shrike_core::browse::BrowseContext {
            ns: "test".to_string(),
            set: "users".to_string(),
            set_index: 0,
        })
        .expect("begin should succeed");

    let spec = parse(r#"{"$pk": ["user-1"]}"#, &ParseContext::default())
        .expect("document should validate");
    let error = dispatcher
        .execute(&spec, &ticket)
        .await
        .expect_err("execute should fail");
    assert!(matches!(error, DispatchError::Remote(_)));

    dispatcher.fail(&ticket);
}
