//! HTTP-level integration tests for login, logout and session expiry.

mod common;

use axum::http::{header, Method, StatusCode};
use common::{body_json, session_cookie, session_id, TestApp, ALICE};

#[tokio::test]
async fn login_sets_a_session_cookie_and_logs_the_event() {
    let app = TestApp::new().await;

    let response = app
        .call(
            Method::POST,
            "/auth/login",
            None,
            Some(serde_json::json!({ "username": "alice", "password": "alice-pass" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Max-Age=900"));
    assert!(session_cookie(&response).is_some());

    let json = body_json(response).await;
    assert_eq!(json["username"], "alice");
    assert_eq!(json["role"], "user");
    assert_eq!(json["oracle_configured"], true);

    let events = app.events().await;
    assert_eq!(events.last().unwrap().username, "alice");
    assert_eq!(events.last().unwrap().event, "Logged in");
}

#[tokio::test]
async fn bad_credentials_are_rejected() {
    let app = TestApp::new().await;

    for (username, password) in [("alice", "wrong"), ("nobody", "alice-pass")] {
        let response = app
            .call(
                Method::POST,
                "/auth/login",
                None,
                Some(serde_json::json!({ "username": username, "password": password })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(session_cookie(&response).is_none());
    }

    let response = app
        .call(
            Method::POST,
            "/auth/login",
            None,
            Some(serde_json::json!({ "username": " ", "password": "" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.events().await.is_empty());
}

#[tokio::test]
async fn protected_routes_need_a_live_session() {
    let app = TestApp::new().await;

    let response = app.call(Method::GET, "/project", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let forged = format!("session={}", uuid::Uuid::new_v4());
    let response = app.call(Method::GET, "/project", Some(&forged), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = TestApp::new().await;
    let cookie = app.login(ALICE).await;

    let response = app.call(Method::POST, "/auth/logout", Some(&cookie), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .contains("Max-Age=0"));

    let response = app.call(Method::GET, "/project", Some(&cookie), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.events().await.last().unwrap().event, "Logged out");
}

#[tokio::test]
async fn idle_sessions_expire() {
    let app = TestApp::new().await;
    let cookie = app.login(ALICE).await;

    let session = app.state.sessions.get(session_id(&cookie)).await.unwrap();
    let sixteen_minutes_ago = chrono::Utc::now().timestamp_millis() - 16 * 60 * 1000;
    session.touch(sixteen_minutes_ago);

    let response = app.call(Method::GET, "/project", Some(&cookie), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(app.state.sessions.get(session_id(&cookie)).await.is_none());

    let last = app.events().await.pop().unwrap();
    assert_eq!(last.username, "alice");
    assert_eq!(last.event, "Session expired");
}

#[tokio::test]
async fn activity_keeps_a_session_alive() {
    let app = TestApp::new().await;
    let cookie = app.login(ALICE).await;

    let session = app.state.sessions.get(session_id(&cookie)).await.unwrap();
    let ten_minutes_ago = chrono::Utc::now().timestamp_millis() - 10 * 60 * 1000;
    session.touch(ten_minutes_ago);

    let response = app.call(Method::GET, "/project", Some(&cookie), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(session.last_activity_millis() > ten_minutes_ago);
}

#[tokio::test]
async fn activity_refreshes_the_session_cookie() {
    let app = TestApp::new().await;
    let cookie = app.login(ALICE).await;

    let response = app.call(Method::GET, "/project", Some(&cookie), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(set_cookie.contains("Max-Age=900"));
    assert!(set_cookie.contains("HttpOnly"));
    assert_eq!(session_cookie(&response).as_deref(), Some(cookie.as_str()));
}

#[tokio::test]
async fn abandoned_sessions_are_swept_at_the_next_login() {
    let app = TestApp::new().await;
    for _ in 0..3 {
        let cookie = app.login(ALICE).await;
        app.state
            .sessions
            .get(session_id(&cookie))
            .await
            .unwrap()
            .touch(0);
    }

    let cookie = app.login(ALICE).await;

    assert_eq!(app.state.sessions.count().await, 1);
    assert!(app.state.sessions.get(session_id(&cookie)).await.is_some());
    let expired = app
        .events()
        .await
        .into_iter()
        .filter(|e| e.event == "Session expired")
        .count();
    assert_eq!(expired, 3);
}
