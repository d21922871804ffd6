//! Test that the embedded store keeps the wiki across restarts.

use std::io::Write;
use std::sync::Arc;

use crate::database::{Driver, LocalDriver};
use crate::e2e_tests::helpers::*;
use crate::models::page::PAGES_COLLECTION;
use crate::services::PageService;

fn open_service(dir: &tempfile::TempDir) -> PageService {
    let driver: Arc<dyn Driver> = Arc::new(LocalDriver::open(dir.path()).expect("open driver"));
    PageService::new(driver)
}

#[tokio::test]
async fn test_wiki_survives_reopen() {
    let dir = tempfile::tempdir().expect("temp dir");

    let (a, b) = {
        let service = open_service(&dir);
        let a = service.create(page_data("A", None)).await.expect("create");
        let b = service.create(page_data("B", Some(&a.id))).await.expect("create");
        (a, b)
    };

    let service = open_service(&dir);
    let source = service.load_menu().await.expect("load menu");
    let tree = source.tree(2);
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].page, &a);
    assert_eq!(tree[0].children[0].page, &b);

    let resolved = service
        .resolve_alias("b")
        .await
        .expect("resolve")
        .expect("alias persisted");
    assert_eq!(resolved.page, Some(b));
}

#[tokio::test]
async fn test_torn_write_is_discarded_on_reopen() {
    let dir = tempfile::tempdir().expect("temp dir");

    let page = {
        let service = open_service(&dir);
        service.create(page_data("Kept", None)).await.expect("create")
    };

    // Simulate a crash part way through appending a record.
    let path = dir.path().join(format!("{PAGES_COLLECTION}.db"));
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(&path)
        .expect("open log");
    file.write_all(&[0x40, 0, 0, 0, 0xde, 0xad]).expect("append garbage");
    drop(file);

    let service = open_service(&dir);
    let pages = service.pages().get_all().await.expect("get_all");
    assert_eq!(pages, vec![page]);

    let added = service.create(page_data("After", None)).await.expect("create");
    drop(service);

    let reopened = open_service(&dir);
    assert_eq!(reopened.pages().get_all().await.expect("get_all").len(), 2);
    assert!(reopened.pages().get(&added.id).await.expect("get").is_some());
}
