use gim_storage::{
    connect,
    group::{Group, GroupType},
    sqlite::SqliteEngine,
    storetest, GroupStore, GroupStoreImpl,
};

async fn store() -> GroupStoreImpl<SqliteEngine> {
    GroupStoreImpl::new(SqliteEngine::open_in_memory().await.unwrap())
}

#[tokio::test]
async fn group_store_conformance() {
    let store = store().await;
    storetest::test_group_store(&store).await;
}

#[tokio::test]
async fn save() {
    storetest::test_group_store_save(&store().await).await;
}

#[tokio::test]
async fn get() {
    storetest::test_group_store_get(&store().await).await;
}

#[tokio::test]
async fn get_all_page() {
    storetest::test_group_store_get_all_page(&store().await).await;
}

#[tokio::test]
async fn delete() {
    storetest::test_group_store_delete(&store().await).await;
}

#[tokio::test]
async fn create_member() {
    storetest::test_group_create_member(&store().await).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_save() {
    storetest::test_group_store_concurrent_save(&store().await).await;
}

#[tokio::test]
async fn page_is_exact_on_fresh_store() {
    let store = store().await;
    assert!(store.get_all_page(0, 10).await.unwrap().is_empty());

    let mut ids = Vec::new();
    for i in 0..4 {
        let saved = store
            .save(Group::new(
                format!("group-{}", i),
                format!("Group {}", i),
                GroupType::Ldap,
            ))
            .await
            .unwrap();
        ids.push(saved.id);
    }
    store.delete(&ids[1]).await.unwrap();

    let page = store.get_all_page(0, 10).await.unwrap();
    assert!(page
        .windows(2)
        .all(|w| (w[0].create_at, &w[0].id) < (w[1].create_at, &w[1].id)));
    let mut listed = page.into_iter().map(|g| g.id).collect::<Vec<_>>();
    listed.sort();
    let mut expected = vec![ids[0].clone(), ids[2].clone(), ids[3].clone()];
    expected.sort();
    assert_eq!(listed, expected);
    assert_eq!(store.get_all_page(2, 10).await.unwrap().len(), 1);
    assert!(store.get_all_page(3, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn connect_picks_sqlite_from_url() {
    // a pool size above one must still share the single migrated database
    let store = connect("sqlite::memory:", 50, 1, true).await.unwrap();
    let saved = store
        .save(Group::new("connected", "Connected", GroupType::Ldap))
        .await
        .unwrap();
    assert_eq!(store.get(&saved.id).await.unwrap(), saved);
    assert_eq!(store.get_all_page(0, 10).await.unwrap(), vec![saved]);
}

#[tokio::test]
async fn connect_conformance() {
    let store = connect("sqlite::memory:", 1, 1, true).await.unwrap();
    storetest::test_group_store(store.as_ref()).await;
}
