//! Test the page, menu and alias endpoints over HTTP.

use axum::http::{Method, StatusCode};
use serde_json::json;

use crate::e2e_tests::helpers::*;

#[tokio::test]
async fn test_create_then_get_page() {
    let app = TestApp::new().await;
    let cookie = app.login_editor().await;

    let created = app
        .request(
            Method::PUT,
            "/api/page",
            Some(json!({ "title": "Welcome", "body": { "text": "hello" } })),
            Some(&cookie),
        )
        .await;
    assert_eq!(created.status, StatusCode::OK);
    let page = created.result().clone();
    assert_eq!(page["title"], "Welcome");
    assert_eq!(page["body"], json!({ "text": "hello" }));
    assert_eq!(page["parent"], "0");
    assert_eq!(page["uri"], "welcome");

    let id = page["_id"].as_str().expect("page id");
    let fetched = app
        .request(Method::GET, &format!("/api/page/{id}"), None, None)
        .await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.result(), &page);

    let listed = app.request(Method::GET, "/api/pages", None, None).await;
    assert_eq!(listed.result(), &json!([page]));
}

#[tokio::test]
async fn test_unknown_page_is_404() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api/page/does-not-exist", None, None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.error(), "page 'does-not-exist' not found");

    let cookie = app.login_editor().await;
    let response = app
        .request(
            Method::POST,
            "/api/page/does-not-exist",
            Some(json!({ "title": "x" })),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app
        .request(Method::DELETE, "/api/page/does-not-exist", None, Some(&cookie))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_input_is_400() {
    let app = TestApp::new().await;
    let cookie = app.login_editor().await;

    let missing_body = app
        .request(
            Method::PUT,
            "/api/page",
            Some(json!({ "title": "No body" })),
            Some(&cookie),
        )
        .await;
    assert_eq!(missing_body.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing_body.error(), "page is missing required fields: body");

    let wrong_type = app
        .request(
            Method::PUT,
            "/api/page",
            Some(json!({ "title": 42, "body": {} })),
            Some(&cookie),
        )
        .await;
    assert_eq!(wrong_type.status, StatusCode::BAD_REQUEST);
    assert!(wrong_type.error().starts_with("invalid request"));

    let listed = app.request(Method::GET, "/api/pages", None, None).await;
    assert_eq!(listed.result(), &json!([]));
}

#[tokio::test]
async fn test_update_and_delete_page() {
    let app = TestApp::new().await;
    let cookie = app.login_editor().await;

    let parent = app.service().create(page_data("Parent", None)).await.expect("create");
    let child = app.service().create(page_data("Child", None)).await.expect("create");

    let updated = app
        .request(
            Method::POST,
            &format!("/api/page/{}", child.id),
            Some(json!({ "title": "Moved child", "parent": parent.id })),
            Some(&cookie),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.result()["title"], "Moved child");
    assert_eq!(updated.result()["parent"], json!(parent.id));

    let menu = app.request(Method::GET, "/api/menu", None, None).await;
    assert_eq!(menu_ids(menu.result()), vec![parent.id.clone()]);
    assert_eq!(menu_ids(&menu.result()[0]["children"]), vec![child.id.clone()]);

    let deleted = app
        .request(
            Method::DELETE,
            &format!("/api/page/{}", parent.id),
            None,
            Some(&cookie),
        )
        .await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.result(), &json!([parent.id, child.id]));

    let menu = app.request(Method::GET, "/api/menu", None, None).await;
    assert_eq!(menu.result(), &json!([]));
}

#[tokio::test]
async fn test_moving_below_itself_is_409() {
    let app = TestApp::new().await;
    let cookie = app.login_editor().await;
    let page = app.service().create(page_data("Loop", None)).await.expect("create");

    let response = app
        .request(
            Method::POST,
            &format!("/api/page/{}", page.id),
            Some(json!({ "parent": page.id })),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_alias_resolution() {
    let app = TestApp::new().await;
    let page = app.service().create(page_data("API Reference", None)).await.expect("create");

    let response = app
        .request(Method::GET, "/api/alias/api-reference", None, None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let result = response.result();
    assert_eq!(result["alias"]["slug"], "api-reference");
    assert_eq!(result["alias"]["type"], "page");
    assert_eq!(result["alias"]["id"], json!(page.id));
    assert_eq!(result["page"]["title"], "API Reference");

    let missing = app.request(Method::GET, "/api/alias/nope", None, None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.error(), "alias 'nope' not found");
}

#[tokio::test]
async fn test_unknown_route_uses_envelope() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/api/nothing-here", None, None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.error(), "route not found");
}
