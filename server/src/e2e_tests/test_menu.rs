//! Test the navigation tree built from pages created through the service.

use axum::http::{Method, StatusCode};

use crate::e2e_tests::helpers::*;
use crate::models::{PageOrderData, ROOT_PARENT_ID};

#[tokio::test]
async fn test_two_level_scenario() {
    let app = TestApp::new().await;
    let service = app.service();

    let a = service.create(page_data("A", None)).await.expect("create A");
    let b = service
        .create(page_data("B", Some(&a.id)))
        .await
        .expect("create B");

    let source = service.load_menu().await.expect("load menu");
    let tree = source.tree(2);

    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].page.id, a.id);
    assert_eq!(tree[0].children.len(), 1);
    assert_eq!(tree[0].children[0].page.id, b.id);
    assert!(tree[0].children[0].children.is_empty());
}

#[tokio::test]
async fn test_depth_three_page_is_cut_at_depth_two() {
    let app = TestApp::new().await;
    let service = app.service();

    let a = service.create(page_data("A", None)).await.expect("create");
    let b = service.create(page_data("B", Some(&a.id))).await.expect("create");
    let c = service.create(page_data("C", Some(&b.id))).await.expect("create");

    let source = service.load_menu().await.expect("load menu");

    let shallow = source.tree(2);
    assert_eq!(shallow[0].children[0].page.id, b.id);
    assert!(shallow[0].children[0].children.is_empty());

    let deep = source.tree(3);
    assert_eq!(deep[0].children[0].children[0].page.id, c.id);
}

#[tokio::test]
async fn test_stale_order_entry_is_omitted() {
    let app = TestApp::new().await;
    let service = app.service();

    let a = service.create(page_data("A", None)).await.expect("create");
    service
        .orders()
        .push(ROOT_PARENT_ID, "ghost-page")
        .await
        .expect("push stale id");

    let source = service.load_menu().await.expect("load menu");
    let ids: Vec<&str> = source
        .tree(2)
        .iter()
        .map(|node| node.page.id.as_str())
        .collect();
    assert_eq!(ids, vec![a.id.as_str()]);
}

#[tokio::test]
async fn test_menu_follows_page_order_after_reorder() {
    let app = TestApp::new().await;
    let service = app.service();

    let first = service.create(page_data("First", None)).await.expect("create");
    let second = service.create(page_data("Second", None)).await.expect("create");
    let third = service.create(page_data("Third", None)).await.expect("create");

    let order = service
        .orders()
        .get_by_parent(ROOT_PARENT_ID)
        .await
        .expect("get order")
        .expect("root order");
    service
        .orders()
        .update(
            &order.id,
            &PageOrderData {
                order: Some(vec![third.id.clone(), first.id.clone(), second.id.clone()]),
                ..PageOrderData::default()
            },
        )
        .await
        .expect("reorder");

    let source = service.load_menu().await.expect("load menu");
    let first_build = source.tree(2);
    let second_build = source.tree(2);
    assert_eq!(first_build, second_build);

    let ids: Vec<&str> = first_build.iter().map(|node| node.page.id.as_str()).collect();
    assert_eq!(ids, vec![third.id.as_str(), first.id.as_str(), second.id.as_str()]);
}

#[tokio::test]
async fn test_menu_endpoint_uses_configured_depth() {
    let app = TestApp::with_menu_depth(1).await;
    let service = app.service();

    let a = service.create(page_data("A", None)).await.expect("create");
    service.create(page_data("B", Some(&a.id))).await.expect("create");

    let response = app.request(Method::GET, "/api/menu", None, None).await;
    assert_eq!(response.status, StatusCode::OK);

    let menu = response.result();
    assert_eq!(menu_ids(menu), vec![a.id.clone()]);
    assert_eq!(menu[0]["title"], "A");
    assert!(menu_ids(&menu[0]["children"]).is_empty());
}
