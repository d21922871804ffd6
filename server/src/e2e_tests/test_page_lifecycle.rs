//! Test creating, moving, renaming and deleting pages through the service.

use crate::e2e_tests::helpers::*;
use crate::models::{ModelError, PageData, ROOT_PARENT_ID};
use crate::services::PageUpdate;

async fn order_of(app: &TestApp, parent: &str) -> Vec<String> {
    app.service()
        .orders()
        .get_by_parent(parent)
        .await
        .expect("get order")
        .map(|order| order.order)
        .unwrap_or_default()
}

fn move_to(parent: &str) -> PageUpdate {
    PageUpdate {
        data: PageData {
            parent: Some(parent.to_string()),
            ..PageData::default()
        },
        put_above: None,
    }
}

#[tokio::test]
async fn test_create_links_order_and_alias() {
    let app = TestApp::new().await;
    let service = app.service();

    let page = service
        .create(page_data("Getting Started", None))
        .await
        .expect("create");

    assert_eq!(page.parent, ROOT_PARENT_ID);
    assert_eq!(page.uri.as_deref(), Some("getting-started"));
    assert_eq!(order_of(&app, ROOT_PARENT_ID).await, vec![page.id.clone()]);

    let resolved = service
        .resolve_alias("getting-started")
        .await
        .expect("resolve")
        .expect("alias exists");
    assert_eq!(resolved.alias.entity_id, page.id);
    assert_eq!(resolved.page, Some(page));
}

#[tokio::test]
async fn test_duplicate_titles_get_distinct_slugs() {
    let app = TestApp::new().await;
    let service = app.service();

    let first = service.create(page_data("FAQ", None)).await.expect("create");
    let second = service.create(page_data("FAQ", None)).await.expect("create");
    let third = service.create(page_data("faq!", None)).await.expect("create");

    assert_eq!(first.uri.as_deref(), Some("faq"));
    assert_eq!(second.uri.as_deref(), Some("faq-2"));
    assert_eq!(third.uri.as_deref(), Some("faq-3"));
}

#[tokio::test]
async fn test_create_under_missing_parent_fails() {
    let app = TestApp::new().await;
    let service = app.service();

    let result = service.create(page_data("Orphan", Some("missing"))).await;
    assert!(matches!(result, Err(ModelError::NotFound { entity: "page", .. })));
    assert!(service.pages().get_all().await.expect("get_all").is_empty());
    assert!(service.aliases().get_all().await.expect("get_all").is_empty());
}

#[tokio::test]
async fn test_move_updates_both_orders() {
    let app = TestApp::new().await;
    let service = app.service();

    let a = service.create(page_data("A", None)).await.expect("create");
    let b = service.create(page_data("B", None)).await.expect("create");

    let moved = service.update(&b.id, move_to(&a.id)).await.expect("move");

    assert_eq!(moved.parent, a.id);
    assert_eq!(order_of(&app, ROOT_PARENT_ID).await, vec![a.id.clone()]);
    assert_eq!(order_of(&app, &a.id).await, vec![b.id.clone()]);
}

#[tokio::test]
async fn test_move_below_own_descendant_is_rejected() {
    let app = TestApp::new().await;
    let service = app.service();

    let a = service.create(page_data("A", None)).await.expect("create");
    let b = service.create(page_data("B", Some(&a.id))).await.expect("create");

    for target in [&a.id, &b.id] {
        let result = service.update(&a.id, move_to(target)).await;
        assert!(
            matches!(result, Err(ModelError::Conflict { entity: "page", .. })),
            "moving below {target} gave {result:?}"
        );
    }

    let a_after = service.pages().get(&a.id).await.expect("get").expect("page");
    assert_eq!(a_after.parent, ROOT_PARENT_ID);
}

#[tokio::test]
async fn test_put_above_reorders_siblings() {
    let app = TestApp::new().await;
    let service = app.service();

    let first = service.create(page_data("First", None)).await.expect("create");
    let second = service.create(page_data("Second", None)).await.expect("create");
    let third = service.create(page_data("Third", None)).await.expect("create");

    service
        .update(
            &third.id,
            PageUpdate {
                put_above: Some(first.id.clone()),
                ..PageUpdate::default()
            },
        )
        .await
        .expect("reorder");

    assert_eq!(
        order_of(&app, ROOT_PARENT_ID).await,
        vec![third.id.clone(), first.id.clone(), second.id.clone()]
    );

    let result = service
        .update(
            &second.id,
            PageUpdate {
                put_above: Some("not-a-sibling".to_string()),
                ..PageUpdate::default()
            },
        )
        .await;
    assert!(matches!(
        result,
        Err(ModelError::NotFound {
            entity: "page order entry",
            ..
        })
    ));
    assert_eq!(
        order_of(&app, ROOT_PARENT_ID).await,
        vec![third.id, first.id, second.id]
    );
}

#[tokio::test]
async fn test_rename_deprecates_old_alias() {
    let app = TestApp::new().await;
    let service = app.service();

    let page = service.create(page_data("Setup", None)).await.expect("create");

    let renamed = service
        .update(
            &page.id,
            PageUpdate {
                data: PageData {
                    title: Some("Installation".to_string()),
                    uri: Some("Installation Guide".to_string()),
                    ..PageData::default()
                },
                put_above: None,
            },
        )
        .await
        .expect("rename");
    assert_eq!(renamed.title, "Installation");
    assert_eq!(renamed.uri.as_deref(), Some("installation-guide"));

    let old = service
        .resolve_alias("setup")
        .await
        .expect("resolve")
        .expect("old alias kept");
    assert!(old.alias.deprecated);
    assert_eq!(old.page.map(|p| p.id), Some(page.id.clone()));

    let new = service
        .resolve_alias("installation-guide")
        .await
        .expect("resolve")
        .expect("new alias");
    assert!(!new.alias.deprecated);

    // Renaming back reactivates the original alias instead of duplicating it.
    service
        .update(
            &page.id,
            PageUpdate {
                data: PageData {
                    uri: Some("setup".to_string()),
                    ..PageData::default()
                },
                put_above: None,
            },
        )
        .await
        .expect("rename back");
    let aliases = service
        .aliases()
        .get_by_entity(&page.id)
        .await
        .expect("aliases");
    assert_eq!(aliases.len(), 2);
    let setup = aliases.iter().find(|a| a.slug == "setup").expect("setup alias");
    assert!(!setup.deprecated);
}

#[tokio::test]
async fn test_rename_to_taken_slug_conflicts() {
    let app = TestApp::new().await;
    let service = app.service();

    service.create(page_data("Taken", None)).await.expect("create");
    let other = service.create(page_data("Other", None)).await.expect("create");

    let result = service
        .update(
            &other.id,
            PageUpdate {
                data: PageData {
                    uri: Some("taken".to_string()),
                    ..PageData::default()
                },
                put_above: None,
            },
        )
        .await;
    assert!(matches!(result, Err(ModelError::Conflict { entity: "alias", .. })));
}

#[tokio::test]
async fn test_rejected_rename_leaves_aliases_unchanged() {
    let app = TestApp::new().await;
    let service = app.service();

    let page = service.create(page_data("Intro", None)).await.expect("create");

    let result = service
        .update(
            &page.id,
            PageUpdate {
                data: PageData {
                    title: Some("   ".to_string()),
                    uri: Some("renamed".to_string()),
                    ..PageData::default()
                },
                put_above: None,
            },
        )
        .await;
    assert!(matches!(result, Err(ModelError::Validation { .. })));

    assert!(service.aliases().get("renamed").await.expect("get").is_none());
    let intro = service
        .aliases()
        .get("intro")
        .await
        .expect("get")
        .expect("alias kept");
    assert!(!intro.deprecated);

    let stored = service.pages().get(&page.id).await.expect("get").expect("page");
    assert_eq!(stored, page);
}

#[tokio::test]
async fn test_remove_deletes_subtree_and_links() {
    let app = TestApp::new().await;
    let service = app.service();

    let keep = service.create(page_data("Keep", None)).await.expect("create");
    let a = service.create(page_data("A", None)).await.expect("create");
    let b = service.create(page_data("B", Some(&a.id))).await.expect("create");
    let c = service.create(page_data("C", Some(&b.id))).await.expect("create");

    let mut removed = service.remove(&a.id).await.expect("remove");
    assert_eq!(removed[0], a.id);
    removed.sort();
    let mut expected = vec![a.id.clone(), b.id.clone(), c.id.clone()];
    expected.sort();
    assert_eq!(removed, expected);

    let remaining = service.pages().get_all().await.expect("get_all");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, keep.id);

    assert_eq!(order_of(&app, ROOT_PARENT_ID).await, vec![keep.id.clone()]);
    assert!(order_of(&app, &a.id).await.is_empty());
    assert!(order_of(&app, &b.id).await.is_empty());

    let aliases = service.aliases().get_all().await.expect("aliases");
    assert_eq!(aliases.len(), 1);
    assert_eq!(aliases[0].entity_id, keep.id);

    assert!(matches!(
        service.remove(&a.id).await,
        Err(ModelError::NotFound { entity: "page", .. })
    ));
}
