//! Integration tests for clocklockd
//!
//! These tests verify the end-to-end behavior of the daemon components:
//! config seeding, the session facade over a real SQLite store, and the
//! socket protocol.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use clocklock_api::{
    ClientInfo, ClientRole, Command, ErrorCode, ErrorInfo, Event, EventPayload,
    GetStatusRequest, Response, ResponsePayload, ResponseResult, RuleView, TrackTimeRequest,
};
use clocklock_config::parse_config;
use clocklock_core::{SessionFacade, TrackingEngine};
use clocklock_ipc::{IpcClient, IpcError, IpcServer, ServerMessage};
use clocklock_store::{SqliteStore, Store};
use clocklock_util::Domain;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 12, 26, 15, 0, 0).unwrap()
}

fn at(ms: i64) -> DateTime<Utc> {
    t0() + TimeDelta::milliseconds(ms)
}

fn facade_over(store: Arc<dyn Store>) -> SessionFacade {
    let mut facade = SessionFacade::new(TrackingEngine::new(store));
    facade.reload().unwrap();
    facade
}

fn admin() -> ClientInfo {
    ClientInfo::new(ClientRole::Admin)
}

fn a_com_rule() -> RuleView {
    RuleView {
        domain: Domain::new("a.com"),
        time_limit_ms: 1000,
        cooldown_ms: 5000,
        track_in_background: false,
    }
}

fn set_rule(facade: &mut SessionFacade, rule: RuleView) {
    let dispatch = facade.handle(&admin(), Command::SetRule { rule }, t0());
    assert!(matches!(
        dispatch.result,
        ResponseResult::Ok(ResponsePayload::RuleSaved)
    ));
}

fn track(facade: &mut SessionFacade, domain: &str, delta_ms: i64, now: DateTime<Utc>) -> bool {
    let (resp, _) = facade.track_time(
        &TrackTimeRequest {
            domain: Domain::new(domain),
            delta_ms,
        },
        now,
    );
    assert_eq!(resp.error, None);
    resp.blocked
}

fn status_of(facade: &SessionFacade, domain: &str, now: DateTime<Utc>) -> clocklock_api::StatusResponse {
    facade.get_status(
        &GetStatusRequest {
            domain: Domain::new(domain),
        },
        now,
    )
}

#[test]
fn test_budget_cooldown_and_reset_scenario() {
    let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
    let mut facade = facade_over(store);
    set_rule(&mut facade, a_com_rule());

    assert!(!track(&mut facade, "a.com", 500, at(0)));
    assert_eq!(status_of(&facade, "a.com", at(0)).time_left_ms, Some(500));

    assert!(track(&mut facade, "a.com", 500, at(0)));

    let mid = status_of(&facade, "a.com", at(4000));
    assert!(mid.blocked);
    assert_eq!(mid.cooldown_remaining_ms, Some(1000));

    // Ticks during the cooldown are discarded
    assert!(track(&mut facade, "a.com", 10_000, at(4500)));

    assert!(!status_of(&facade, "a.com", at(5001)).blocked);

    assert!(!track(&mut facade, "a.com", 100, at(5001)));
    assert_eq!(status_of(&facade, "a.com", at(5001)).time_left_ms, Some(900));
}

#[test]
fn test_zero_cooldown_never_blocks() {
    let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
    let mut facade = facade_over(store);
    set_rule(
        &mut facade,
        RuleView {
            cooldown_ms: 0,
            ..a_com_rule()
        },
    );

    for i in 0..20 {
        assert!(!track(&mut facade, "a.com", 1000, at(i * 1000)));
        assert!(!status_of(&facade, "a.com", at(i * 1000)).blocked);
    }

    // The bootstrap rule is inert too
    assert!(!track(&mut facade, "www.youtube.com", 60_000, t0()));
}

#[test]
fn test_unknown_domain_is_neutral() {
    let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
    let mut facade = facade_over(store.clone());

    assert!(!track(&mut facade, "unknown.com", 500, t0()));

    let status = status_of(&facade, "unknown.com", t0());
    assert!(!status.blocked);
    assert_eq!(status.track_in_background, None);
    assert_eq!(status.time_left_ms, None);
    assert!(
        !store
            .load()
            .unwrap()
            .site_states
            .contains_key(&Domain::new("unknown.com"))
    );
}

#[test]
fn test_negative_ticks_through_dispatch() {
    let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
    let mut facade = facade_over(store);
    set_rule(&mut facade, a_com_rule());
    let tracker = ClientInfo::new(ClientRole::Tracker);

    let tick = |facade: &mut SessionFacade, delta_ms: i64, now: DateTime<Utc>| {
        let dispatch = facade.handle(
            &tracker,
            Command::TrackTime(TrackTimeRequest {
                domain: Domain::new("a.com"),
                delta_ms,
            }),
            now,
        );
        match dispatch.result {
            ResponseResult::Ok(ResponsePayload::TrackTime(resp)) => resp,
            other => panic!("unexpected result: {other:?}"),
        }
    };

    // Unblocked: the tick takes time back
    assert!(!tick(&mut facade, 800, at(0)).blocked);
    assert!(!tick(&mut facade, -300, at(0)).blocked);
    assert_eq!(status_of(&facade, "a.com", at(0)).time_left_ms, Some(500));

    // Blocked: any tick, whatever its sign, answers blocked
    assert!(tick(&mut facade, 500, at(0)).blocked);
    for delta_ms in [-1, -10_000, i64::MIN] {
        let resp = tick(&mut facade, delta_ms, at(1000));
        assert!(resp.blocked);
        assert_eq!(resp.error, None);
        assert_eq!(resp.cooldown_remaining_ms, Some(4000));
    }
    assert!(status_of(&facade, "a.com", at(1000)).blocked);
}

#[test]
fn test_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("clocklock.db");

    {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::open(&db_path).unwrap());
        let mut facade = facade_over(store);
        set_rule(&mut facade, a_com_rule());
        assert!(track(&mut facade, "a.com", 1000, t0()));
    }

    let store: Arc<dyn Store> = Arc::new(SqliteStore::open(&db_path).unwrap());
    let facade = facade_over(store);

    assert_eq!(facade.rule(&Domain::new("a.com")), Some(a_com_rule()));
    let after_restart = status_of(&facade, "a.com", at(2000));
    assert!(after_restart.blocked);
    assert_eq!(after_restart.cooldown_remaining_ms, Some(3000));
}

#[test]
fn test_two_facades_share_a_store_through_reload() {
    let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
    let mut editor = facade_over(store.clone());
    let mut tracker = facade_over(store);

    set_rule(&mut editor, a_com_rule());

    // Not visible until the tracker reloads
    assert!(!track(&mut tracker, "a.com", 1000, t0()));
    tracker.handle(&admin(), Command::ReloadRules, t0());
    assert!(track(&mut tracker, "a.com", 1000, t0()));
}

#[test]
fn test_config_seeds_rules_once() {
    let config = parse_config(
        r#"
            config_version = 1

            [[rules]]
            domain = "reddit.com"
            time_limit_seconds = 1
            cooldown_seconds = 10
        "#,
    )
    .unwrap();

    let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
    let mut facade = facade_over(store.clone());
    assert_eq!(facade.seed_rules(&config.rules).unwrap(), 1);
    assert!(track(&mut facade, "reddit.com", 1000, t0()));

    // A user edit survives the next start
    set_rule(
        &mut facade,
        RuleView {
            domain: Domain::new("reddit.com"),
            time_limit_ms: 60_000,
            cooldown_ms: 10_000,
            track_in_background: false,
        },
    );

    let mut restarted = facade_over(store);
    assert_eq!(restarted.seed_rules(&config.rules).unwrap(), 0);
    assert_eq!(
        restarted.rule(&Domain::new("reddit.com")).unwrap().time_limit_ms,
        60_000
    );
}

/// Minimal daemon loop: the same dispatch clocklockd runs, without signals
fn serve(server: Arc<IpcServer>, facade: Arc<Mutex<SessionFacade>>) {
    tokio::spawn({
        let server = server.clone();
        async move {
            let _ = server.run().await;
        }
    });

    tokio::spawn(async move {
        let Some(mut rx) = server.take_message_receiver().await else {
            return;
        };
        while let Some(msg) = rx.recv().await {
            let ServerMessage::Request { client_id, request } = msg else {
                continue;
            };
            let Some(info) = server.get_client_info(&client_id).await else {
                continue;
            };

            let now = clocklock_util::now();
            let dispatch = facade.lock().await.handle(&info, request.command, now);
            for event in dispatch.events {
                server.broadcast_event(Event::new(event.to_payload(now)));
            }
            let _ = server
                .send_response(&client_id, Response::new(request.request_id, dispatch.result))
                .await;
        }
    });
}

#[tokio::test]
async fn test_ipc_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("clocklockd.sock");

    let mut server = IpcServer::new(&socket_path);
    server.start().await.unwrap();

    let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
    let facade = Arc::new(Mutex::new(facade_over(store)));
    serve(Arc::new(server), facade);

    let mut client = IpcClient::connect(&socket_path).await.unwrap();

    // Same uid as the test process, so this client is an admin
    let saved = client
        .call(Command::SetRule { rule: a_com_rule() })
        .await
        .unwrap();
    assert!(matches!(saved, ResponsePayload::RuleSaved));

    let watcher = IpcClient::connect(&socket_path).await.unwrap();
    let mut events = watcher.subscribe().await.unwrap();

    let first = client
        .call(Command::TrackTime(TrackTimeRequest {
            domain: Domain::new("www.a.com"),
            delta_ms: 500,
        }))
        .await
        .unwrap();
    assert!(matches!(first, ResponsePayload::TrackTime(ref r) if !r.blocked));

    let resp = match client
        .call(Command::TrackTime(TrackTimeRequest {
            domain: Domain::new("A.com"),
            delta_ms: 500,
        }))
        .await
        .unwrap()
    {
        ResponsePayload::TrackTime(resp) => resp,
        other => panic!("unexpected payload: {other:?}"),
    };
    assert!(resp.blocked);
    assert!(resp.cooldown_remaining_ms.unwrap() <= 5000);

    let event = tokio::time::timeout(Duration::from_secs(5), events.next())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(
        event.payload,
        EventPayload::DomainBlocked { ref domain, .. } if domain.as_str() == "a.com"
    ));

    let status = client
        .call(Command::GetStatus(GetStatusRequest {
            domain: Domain::new("a.com"),
        }))
        .await
        .unwrap();
    assert!(matches!(status, ResponsePayload::Status(ref s) if s.blocked));

    // A negative tick during the cooldown must not release the page
    let negative = client
        .call(Command::TrackTime(TrackTimeRequest {
            domain: Domain::new("a.com"),
            delta_ms: -5,
        }))
        .await
        .unwrap();
    assert!(matches!(
        negative,
        ResponsePayload::TrackTime(ref r)
            if r.blocked && r.error.is_none() && r.cooldown_remaining_ms.is_some()
    ));

    assert!(matches!(
        client.call(Command::Ping).await.unwrap(),
        ResponsePayload::Pong
    ));
}

#[tokio::test]
async fn test_ipc_reports_command_errors() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("clocklockd.sock");

    let mut server = IpcServer::new(&socket_path);
    server.start().await.unwrap();

    let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
    serve(Arc::new(server), Arc::new(Mutex::new(facade_over(store))));

    let mut client = IpcClient::connect(&socket_path).await.unwrap();

    let response = client
        .send(Command::SetRule {
            rule: RuleView {
                domain: Domain::new(""),
                ..a_com_rule()
            },
        })
        .await
        .unwrap();
    assert!(matches!(
        response.result,
        ResponseResult::Err(ErrorInfo {
            code: ErrorCode::InvalidRequest,
            ..
        })
    ));

    let result = client
        .call(Command::SetRule {
            rule: RuleView {
                domain: Domain::new(""),
                ..a_com_rule()
            },
        })
        .await;
    assert!(matches!(
        result,
        Err(IpcError::Rejected(ErrorInfo {
            code: ErrorCode::InvalidRequest,
            ..
        }))
    ));
}
