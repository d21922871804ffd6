//! Test login, session cookies and access rules over HTTP.

use axum::http::{Method, StatusCode, header};
use serde_json::json;

use crate::auth::ADMIN_USERNAME;
use crate::e2e_tests::helpers::*;

#[tokio::test]
async fn test_login_sets_session_cookie() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/auth",
            Some(json!({ "username": EDITOR_USERNAME, "password": EDITOR_PASSWORD })),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.result()["username"], EDITOR_USERNAME);
    assert!(response.result()["token"].is_string());

    let cookie = response
        .headers
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .expect("Set-Cookie header");
    assert!(cookie.starts_with("authToken="));
    assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn test_bad_credentials_are_401() {
    let app = TestApp::new().await;

    for (username, password) in [(EDITOR_USERNAME, "wrong"), ("nobody", "anything")] {
        let response = app
            .request(
                Method::POST,
                "/auth",
                Some(json!({ "username": username, "password": password })),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.error(), "invalid username or password");
        assert!(response.headers.get(header::SET_COOKIE).is_none());
    }

    let malformed = app
        .request(Method::POST, "/auth", Some(json!({ "username": "x" })), None)
        .await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_anonymous_edits_are_401() {
    let app = TestApp::new().await;
    let page = app.service().create(page_data("Existing", None)).await.expect("create");
    let page_uri = format!("/api/page/{}", page.id);

    let attempts = [
        (Method::PUT, "/api/page", Some(json!({ "title": "T", "body": {} }))),
        (Method::POST, page_uri.as_str(), Some(json!({ "title": "T" }))),
        (Method::DELETE, page_uri.as_str(), None),
    ];

    for (method, uri, body) in attempts {
        for cookie in [None, Some("authToken=forged.token.value")] {
            let response = app.request(method.clone(), uri, body.clone(), cookie).await;
            assert_eq!(response.status, StatusCode::UNAUTHORIZED, "{method} {uri}");
            assert_eq!(response.error(), "authentication required");
        }
    }

    let stored = app.service().pages().get(&page.id).await.expect("get").expect("page");
    assert_eq!(stored.title, "Existing");
}

#[tokio::test]
async fn test_user_management_is_admin_only() {
    let app = TestApp::new().await;

    let anonymous = app.request(Method::GET, "/api/users", None, None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let editor = app.login_editor().await;
    let forbidden = app.request(Method::GET, "/api/users", None, Some(&editor)).await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
    assert_eq!(forbidden.error(), "admin access required");

    let forbidden = app
        .request(
            Method::PUT,
            "/api/user",
            Some(json!({ "username": "mallory", "password": "pw" })),
            Some(&editor),
        )
        .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_manages_users_without_leaking_hashes() {
    let app = TestApp::new().await;
    let admin = app.login_admin().await;

    let created = app
        .request(
            Method::PUT,
            "/api/user",
            Some(json!({ "username": "writer", "password": "writer-pw" })),
            Some(&admin),
        )
        .await;
    assert_eq!(created.status, StatusCode::OK);
    assert_eq!(created.result()["username"], "writer");
    assert!(created.result().get("password_hash").is_none());
    let writer_id = created.result()["_id"].as_str().expect("id").to_string();

    let duplicate = app
        .request(
            Method::PUT,
            "/api/user",
            Some(json!({ "username": "writer", "password": "again" })),
            Some(&admin),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let missing_password = app
        .request(
            Method::PUT,
            "/api/user",
            Some(json!({ "username": "nopass" })),
            Some(&admin),
        )
        .await;
    assert_eq!(missing_password.status, StatusCode::BAD_REQUEST);

    let listed = app.request(Method::GET, "/api/users", None, Some(&admin)).await;
    let users = listed.result().as_array().expect("user list");
    assert_eq!(users.len(), 3);
    for user in users {
        assert!(user.get("password_hash").is_none(), "leaked: {user}");
    }

    // The new user can sign in and edit.
    let writer = app.login("writer", "writer-pw").await;
    let page = app
        .request(
            Method::PUT,
            "/api/page",
            Some(json!({ "title": "By writer", "body": {} })),
            Some(&writer),
        )
        .await;
    assert_eq!(page.status, StatusCode::OK);

    let removed = app
        .request(
            Method::DELETE,
            &format!("/api/user/{writer_id}"),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(removed.status, StatusCode::OK);
    assert_eq!(removed.result(), &json!(writer_id));

    let again = app
        .request(
            Method::DELETE,
            &format!("/api/user/{writer_id}"),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_user_cannot_be_removed() {
    let app = TestApp::new().await;
    let admin = app.login_admin().await;

    let admin_id = app
        .state
        .users
        .get_by_username(ADMIN_USERNAME)
        .await
        .expect("lookup")
        .expect("admin seeded")
        .id;

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/user/{admin_id}"),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let listed = app.request(Method::GET, "/api/users", None, Some(&admin)).await;
    let users = listed.result().as_array().expect("user list");
    assert!(users.iter().any(|user| user["username"] == ADMIN_USERNAME));
}
