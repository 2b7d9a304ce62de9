//! Integration tests for the authenticated request pipeline.
//!
//! Each test runs against a wiremock server standing in for the Tally
//! backend. Refresh endpoints are usually delayed so that concurrent 401s
//! land inside the same refresh window.

use std::time::Duration;

use futures::future::join_all;
use serde_json::json;
use tally_client::{
    CategoryRequest, Error, LoginRequest, LogoutReason, SessionEvent, TallyClient,
};
use tokio::sync::broadcast;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Upper bound for any single test scenario; nothing should ever hang.
const SCENARIO_TIMEOUT: Duration = Duration::from_secs(10);

fn client_for(server: &MockServer) -> TallyClient {
    TallyClient::builder()
        .base_url(server.uri())
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

fn token_body(token: &str) -> serde_json::Value {
    json!({ "accessToken": token, "expiresIn": 900 })
}

async fn mock_categories(server: &MockServer, token: &str, status: u16, times: u64) {
    let response = if status == 200 {
        ResponseTemplate::new(200).set_body_json(json!([]))
    } else {
        ResponseTemplate::new(status).set_body_json(json!({ "message": "Unauthorized" }))
    };
    Mock::given(method("GET"))
        .and(path("/api/categories"))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(response)
        .expect(times)
        .mount(server)
        .await;
}

async fn mock_refresh(server: &MockServer, response: ResponseTemplate, times: u64) {
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(response)
        .expect(times)
        .mount(server)
        .await;
}

fn drain(events: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

fn forced_logouts(events: &[SessionEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, SessionEvent::ForcedLogout { .. }))
        .count()
}

// ─────────────────────────────────────────────────────────────────────────────
// Single-flight refresh
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let server = MockServer::start().await;
    mock_categories(&server, "T1", 401, 3).await;
    mock_categories(&server, "T2", 200, 3).await;
    mock_refresh(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(token_body("T2"))
            .set_delay(Duration::from_millis(300)),
        1,
    )
    .await;

    let client = client_for(&server);
    client.tokens().set("T1");

    let calls = (0..3).map(|_| {
        let client = client.clone();
        async move { client.categories().list().await }
    });
    let results = tokio::time::timeout(SCENARIO_TIMEOUT, join_all(calls))
        .await
        .expect("requests hung");

    for result in results {
        assert!(result.unwrap().is_empty());
    }
    assert_eq!(client.tokens().get().as_deref(), Some("T2"));
    assert!(!client.refresh_coordinator().is_refreshing());
    server.verify().await;
}

#[tokio::test]
async fn test_single_request_refresh_and_replay() {
    let server = MockServer::start().await;
    mock_categories(&server, "T1", 401, 1).await;
    mock_categories(&server, "T2", 200, 1).await;
    mock_refresh(
        &server,
        ResponseTemplate::new(200).set_body_json(token_body("T2")),
        1,
    )
    .await;

    let client = client_for(&server);
    client.tokens().set("T1");
    let mut events = client.session().subscribe();

    client.categories().list().await.unwrap();

    assert_eq!(client.tokens().get().as_deref(), Some("T2"));
    assert!(drain(&mut events).is_empty());
    server.verify().await;
}

#[tokio::test]
async fn test_replay_resends_method_and_body() {
    let server = MockServer::start().await;
    let body = json!({ "name": "Food", "color": "#ff0000", "icon": "utensils" });

    Mock::given(method("POST"))
        .and(path("/api/categories"))
        .and(header("authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/categories"))
        .and(header("authorization", "Bearer T2"))
        .and(body_json(&body))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    mock_refresh(
        &server,
        ResponseTemplate::new(200).set_body_json(token_body("T2")),
        1,
    )
    .await;

    let client = client_for(&server);
    client.tokens().set("T1");

    client
        .categories()
        .create(&CategoryRequest {
            name: "Food".into(),
            color: "#ff0000".into(),
            icon: "utensils".into(),
            budget_limit: None,
        })
        .await
        .unwrap();

    server.verify().await;
}

#[tokio::test]
async fn test_later_expiry_starts_a_new_window() {
    let server = MockServer::start().await;
    mock_categories(&server, "T1", 401, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/categories"))
        .and(header("authorization", "Bearer T2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mock_categories(&server, "T2", 401, 1).await;
    mock_categories(&server, "T3", 200, 1).await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("T2")))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mock_refresh(
        &server,
        ResponseTemplate::new(200).set_body_json(token_body("T3")),
        1,
    )
    .await;

    let client = client_for(&server);
    client.tokens().set("T1");

    client.categories().list().await.unwrap();
    assert_eq!(client.tokens().get().as_deref(), Some("T2"));

    // T2 has expired by now; the finished window must not be reused.
    client.categories().list().await.unwrap();
    assert_eq!(client.tokens().get().as_deref(), Some("T3"));
    server.verify().await;
}

// ─────────────────────────────────────────────────────────────────────────────
// Exemption and pass-through
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_auth_route_401_never_refreshes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Invalid credentials" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    mock_refresh(&server, ResponseTemplate::new(200), 0).await;

    let client = client_for(&server);
    // Even with a token around, auth routes are left alone.
    client.tokens().set("T1");

    let err = client
        .auth()
        .login(&LoginRequest {
            email: "me@example.com".into(),
            password: "wrong".into(),
            remember_me: false,
        })
        .await
        .unwrap_err();

    match err {
        Error::Api { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Invalid credentials");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    server.verify().await;
}

#[tokio::test]
async fn test_auth_routes_sent_without_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/forgot-password"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    mock_refresh(&server, ResponseTemplate::new(200), 0).await;

    let client = client_for(&server);
    client.tokens().set("T1");

    let err = client.auth().forgot_password("me@example.com").await.unwrap_err();
    assert!(err.is_unauthorized());

    let received = server.received_requests().await.unwrap();
    assert!(
        received
            .iter()
            .all(|r| !r.headers.contains_key("authorization"))
    );
    server.verify().await;
}

#[tokio::test]
async fn test_401_without_bearer_passes_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/categories"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "Login required" })))
        .expect(1)
        .mount(&server)
        .await;
    mock_refresh(&server, ResponseTemplate::new(200), 0).await;

    let client = client_for(&server);
    let mut events = client.session().subscribe();

    let err = client.categories().list().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(err.user_message(), "Login required");
    assert!(drain(&mut events).is_empty());

    let received = server.received_requests().await.unwrap();
    assert!(!received[0].headers.contains_key("authorization"));
    server.verify().await;
}

#[tokio::test]
async fn test_non_401_failures_are_not_intercepted() {
    let server = MockServer::start().await;
    mock_categories(&server, "T1", 403, 1).await;
    mock_refresh(&server, ResponseTemplate::new(200), 0).await;

    let client = client_for(&server);
    client.tokens().set("T1");

    let err = client.categories().list().await.unwrap_err();
    assert_eq!(err.status(), Some(403));
    assert_eq!(client.tokens().get().as_deref(), Some("T1"));
    server.verify().await;
}

#[tokio::test]
async fn test_transport_failure_propagates() {
    let client = TallyClient::builder()
        .base_url("http://127.0.0.1:9")
        .timeout(Duration::from_millis(500))
        .build()
        .unwrap();
    client.tokens().set("T1");

    let err = client.categories().list().await.unwrap_err();
    assert!(matches!(err, Error::Http(_)));
    assert_eq!(client.tokens().get().as_deref(), Some("T1"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Termination
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_replay_401_is_final() {
    let server = MockServer::start().await;
    mock_categories(&server, "T1", 401, 1).await;
    mock_categories(&server, "T2", 401, 1).await;
    mock_refresh(
        &server,
        ResponseTemplate::new(200).set_body_json(token_body("T2")),
        1,
    )
    .await;

    let client = client_for(&server);
    client.tokens().set("T1");
    let mut events = client.session().subscribe();

    let err = tokio::time::timeout(SCENARIO_TIMEOUT, client.categories().list())
        .await
        .expect("replay looped")
        .unwrap_err();

    assert!(err.is_unauthorized());
    // The refresh itself worked, so the session is intact.
    assert_eq!(client.tokens().get().as_deref(), Some("T2"));
    assert_eq!(forced_logouts(&drain(&mut events)), 0);
    server.verify().await;
}

// ─────────────────────────────────────────────────────────────────────────────
// Refresh failure
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_refresh_failure_ends_session_and_fails_waiters() {
    let server = MockServer::start().await;
    mock_categories(&server, "T1", 401, 3).await;
    mock_categories(&server, "T2", 200, 0).await;
    mock_refresh(
        &server,
        ResponseTemplate::new(400)
            .set_body_json(json!({ "message": "Refresh token expired" }))
            .set_delay(Duration::from_millis(300)),
        1,
    )
    .await;

    let client = client_for(&server);
    client.tokens().set("T1");
    let mut events = client.session().subscribe();

    let calls = (0..3).map(|_| {
        let client = client.clone();
        async move { client.categories().list().await }
    });
    let results = tokio::time::timeout(SCENARIO_TIMEOUT, join_all(calls))
        .await
        .expect("waiters hung after refresh failure");

    // Every caller sees the refresh error, not the original 401.
    for result in results {
        let err = result.unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.user_message(), "Refresh token expired");
    }

    assert!(!client.tokens().exists());
    assert!(!client.session().is_logged_in());
    assert!(!client.refresh_coordinator().is_refreshing());

    let seen = drain(&mut events);
    assert_eq!(forced_logouts(&seen), 1);
    assert!(seen.contains(&SessionEvent::ForcedLogout {
        reason: LogoutReason::Expired
    }));
    server.verify().await;
}

#[tokio::test]
async fn test_refresh_transport_failure_is_fatal() {
    let server = MockServer::start().await;
    mock_categories(&server, "T1", 401, 1).await;
    mock_refresh(
        &server,
        ResponseTemplate::new(500).set_body_string("boom"),
        1,
    )
    .await;

    let client = client_for(&server);
    client.tokens().set("T1");

    let err = client.categories().list().await.unwrap_err();
    assert!(err.is_server_error());
    assert_eq!(err.user_message(), "HTTP 500");
    assert!(!client.tokens().exists());
}

// ─────────────────────────────────────────────────────────────────────────────
// Concurrent logout during refresh
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_logout_during_refresh_is_not_undone() {
    let server = MockServer::start().await;
    mock_categories(&server, "T1", 401, 1).await;
    mock_categories(&server, "T2", 200, 0).await;
    mock_refresh(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(token_body("T2"))
            .set_delay(Duration::from_millis(400)),
        1,
    )
    .await;

    let client = client_for(&server);
    client.tokens().set("T1");
    let mut events = client.session().subscribe();

    let categories = client.categories();
    let request = categories.list();
    let logout = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        client.session().clear_session();
    };
    let (result, ()) = tokio::join!(request, logout);

    assert!(matches!(result, Err(Error::SessionEnded)));
    assert!(!client.tokens().exists());
    assert_eq!(forced_logouts(&drain(&mut events)), 0);
    server.verify().await;
}

#[tokio::test]
async fn test_failed_refresh_spares_session_started_meanwhile() {
    let server = MockServer::start().await;
    mock_categories(&server, "T1", 401, 1).await;
    mock_refresh(
        &server,
        ResponseTemplate::new(401)
            .set_body_json(json!({ "message": "Refresh token expired" }))
            .set_delay(Duration::from_millis(400)),
        1,
    )
    .await;

    let client = client_for(&server);
    client.tokens().set("T1");
    let mut events = client.session().subscribe();

    let categories = client.categories();
    let request = categories.list();
    let relogin = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        client.session().clear_session();
        client.session().set_access_token("NEW");
    };
    let (result, ()) = tokio::time::timeout(SCENARIO_TIMEOUT, async {
        tokio::join!(request, relogin)
    })
    .await
    .unwrap();

    assert!(matches!(result, Err(Error::SessionEnded)));
    assert_eq!(client.tokens().get().as_deref(), Some("NEW"));
    let seen = drain(&mut events);
    assert_eq!(forced_logouts(&seen), 0);
    assert!(seen.iter().any(|e| matches!(e, SessionEvent::SignedIn)));
    server.verify().await;
}

#[tokio::test]
async fn test_dropped_leader_releases_waiters() {
    let server = MockServer::start().await;
    mock_categories(&server, "T1", 401, 2).await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body("T2"))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.tokens().set("T1");

    let categories = client.categories();
    let leader = tokio::time::timeout(Duration::from_millis(300), categories.list());
    let waiter = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        client.categories().list().await
    };
    let (leader, waiter) = tokio::join!(leader, waiter);

    assert!(leader.is_err(), "leader should have been cut off");
    assert!(matches!(waiter, Err(Error::RefreshAborted)));
    assert!(!client.refresh_coordinator().is_refreshing());
}

// ─────────────────────────────────────────────────────────────────────────────
// Session flows
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_stores_token_and_cookie_reaches_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({
            "email": "me@example.com",
            "password": "secret",
            "rememberMe": true
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body("T1"))
                .insert_header("set-cookie", "refresh_token=R1; HttpOnly"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .and(header("cookie", "refresh_token=R1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("T2")))
        .expect(1)
        .mount(&server)
        .await;
    mock_categories(&server, "T1", 401, 1).await;
    mock_categories(&server, "T2", 200, 1).await;

    let client = client_for(&server);
    let mut events = client.session().subscribe();

    let issued = client
        .auth()
        .login(&LoginRequest {
            email: "me@example.com".into(),
            password: "secret".into(),
            remember_me: true,
        })
        .await
        .unwrap();
    assert_eq!(issued.access_token, "T1");
    assert!(client.auth().is_logged_in());
    assert_eq!(events.try_recv().unwrap(), SessionEvent::SignedIn);

    client.categories().list().await.unwrap();
    assert_eq!(client.tokens().get().as_deref(), Some("T2"));
    server.verify().await;
}

#[tokio::test]
async fn test_logout_clears_even_when_backend_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.tokens().set("T1");
    let mut events = client.session().subscribe();

    client.auth().logout().await;

    assert!(!client.tokens().exists());
    assert_eq!(drain(&mut events), vec![SessionEvent::SignedOut]);
    server.verify().await;
}

#[tokio::test]
async fn test_logout_when_anonymous_still_signals() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut events = client.session().subscribe();

    client.auth().logout().await;
    client.session().force_logout(LogoutReason::Unauthorized);

    assert!(!client.tokens().exists());
    assert_eq!(
        drain(&mut events),
        vec![
            SessionEvent::SignedOut,
            SessionEvent::ForcedLogout {
                reason: LogoutReason::Unauthorized
            }
        ]
    );
}

#[tokio::test]
async fn test_logout_everywhere_clears_and_reports_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout-all"))
        .and(header("authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.tokens().set("T1");

    let err = client.auth().logout_everywhere().await.unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert!(!client.tokens().exists());
    server.verify().await;
}

#[tokio::test]
async fn test_change_password_ends_local_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/change-password"))
        .and(header("authorization", "Bearer T1"))
        .and(body_json(json!({
            "currentPassword": "old",
            "newPassword": "new"
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.tokens().set("T1");

    client.auth().change_password("old", "new").await.unwrap();
    assert!(!client.tokens().exists());
    server.verify().await;
}
