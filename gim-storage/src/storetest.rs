//! Behavioural checks any [`GroupStore`] must pass.
//!
//! Each function panics on the first violated expectation, so it can be
//! driven directly from a `#[tokio::test]` of a backend crate:
//!
//! ```ignore
//! #[tokio::test]
//! async fn conformance() {
//!     let store = GroupStoreImpl::new(SqliteEngine::open_in_memory().await.unwrap());
//!     gim_storage::storetest::test_group_store(&store).await;
//! }
//! ```
//!
//! The checks only assume that they are not racing other writers on the
//! same groups; other rows may exist in the backing engine.

use std::collections::HashSet;

use futures::future::join_all;

use gim_slo::{new_id, ID_LENGTH};

use crate::{
    group::{
        Group, GroupType, GROUP_DESCRIPTION_ERROR, GROUP_DESCRIPTION_MAX_LENGTH,
        GROUP_DISPLAY_NAME_ERROR, GROUP_DISPLAY_NAME_MAX_LENGTH,
        GROUP_NAME_ERROR, GROUP_NAME_MAX_LENGTH, GROUP_TYPE_ERROR,
        GROUP_TYPE_PROPS_ERROR, GROUP_TYPE_PROPS_MAX_LENGTH,
    },
    group_member::{GroupMember, GROUP_MEMBER_USER_ID_ERROR},
    store::{
        GroupStore, GET_ERROR, SAVE_INSERT_ERROR, SAVE_MEMBER_EXISTS_ERROR,
        SAVE_MISSING_ERROR,
    },
};

pub async fn test_group_store(store: &dyn GroupStore) {
    test_group_store_save(store).await;
    test_group_store_get(store).await;
    test_group_store_get_by_name(store).await;
    test_group_store_get_all_page(store).await;
    test_group_store_delete(store).await;
    test_group_create_member(store).await;
    test_group_get_members(store).await;
    test_group_store_concurrent_save(store).await;
}

fn random_group() -> Group {
    Group {
        description: new_id(),
        type_props: new_id(),
        ..Group::new(new_id(), new_id(), GroupType::Ldap)
    }
}

async fn page_ids(store: &dyn GroupStore, offset: u64, limit: u64) -> Vec<String> {
    store
        .get_all_page(offset, limit)
        .await
        .expect("listing groups")
        .into_iter()
        .map(|g| g.id)
        .collect()
}

pub async fn test_group_store_save(store: &dyn GroupStore) {
    // happy path
    let g1 = random_group();
    let d1 = store.save(g1.clone()).await.expect("saving a valid group");
    assert_eq!(d1.id.len(), ID_LENGTH);
    assert_eq!(d1.name, g1.name);
    assert_eq!(d1.display_name, g1.display_name);
    assert_eq!(d1.description, g1.description);
    assert_eq!(d1.type_props, g1.type_props);
    assert_ne!(d1.create_at, 0);
    assert_eq!(d1.create_at, d1.update_at);
    assert_eq!(d1.delete_at, 0);

    // requires name and display name
    let mut g2 = Group::new("", new_id(), GroupType::Ldap);
    let err = store.save(g2.clone()).await.unwrap_err();
    assert_eq!(err.id(), GROUP_NAME_ERROR);
    assert_eq!(err.field(), Some("group.name"));

    g2.name = new_id();
    g2.display_name = String::new();
    let err = store.save(g2.clone()).await.unwrap_err();
    assert_eq!(err.id(), GROUP_DISPLAY_NAME_ERROR);
    assert!(store.get_by_name(&g2.name).await.is_err());

    // can't invent an id and save it
    let g3 = Group {
        id: new_id(),
        create_at: 1,
        update_at: 1,
        ..Group::new(new_id(), new_id(), GroupType::Ldap)
    };
    let err = store.save(g3.clone()).await.unwrap_err();
    assert_eq!(err.id(), SAVE_MISSING_ERROR);
    assert_eq!(store.get(&g3.id).await.unwrap_err().id(), GET_ERROR);
    assert_eq!(store.get_by_name(&g3.name).await.unwrap_err().id(), GET_ERROR);

    // won't accept a duplicate name
    let g4 = Group::new(new_id(), new_id(), GroupType::Ldap);
    let d4 = store.save(g4.clone()).await.expect("saving a valid group");
    let g4b = Group::new(g4.name.clone(), new_id(), GroupType::Ldap);
    let err = store.save(g4b).await.unwrap_err();
    assert_eq!(err.id(), SAVE_INSERT_ERROR);
    let kept = store.get(&d4.id).await.expect("first group kept");
    assert_eq!(kept, d4);

    // names are compared case-sensitively
    let g4c = Group::new(d4.name.to_uppercase(), new_id(), GroupType::Ldap);
    let d4c = store.save(g4c).await.expect("saving a case variant name");
    assert_ne!(d4c.id, d4.id);
    assert_eq!(store.get_by_name(&d4.name).await.unwrap().id, d4.id);
    assert_eq!(store.get_by_name(&d4c.name).await.unwrap().id, d4c.id);

    // fields cannot be greater than max values
    let mut g5 = Group {
        name: "x".repeat(GROUP_NAME_MAX_LENGTH),
        display_name: "x".repeat(GROUP_DISPLAY_NAME_MAX_LENGTH),
        description: "x".repeat(GROUP_DESCRIPTION_MAX_LENGTH),
        type_props: "x".repeat(GROUP_TYPE_PROPS_MAX_LENGTH),
        group_type: GroupType::Ldap.to_string(),
        ..Default::default()
    };
    assert!(g5.validate_for_create().is_ok());

    g5.name.push('x');
    assert_eq!(g5.validate_for_create().unwrap_err().id(), GROUP_NAME_ERROR);
    g5.name = new_id();
    assert!(g5.validate_for_create().is_ok());

    g5.display_name.push('x');
    assert_eq!(
        g5.validate_for_create().unwrap_err().id(),
        GROUP_DISPLAY_NAME_ERROR
    );
    g5.display_name = new_id();
    assert!(g5.validate_for_create().is_ok());

    g5.description.push('x');
    assert_eq!(
        g5.validate_for_create().unwrap_err().id(),
        GROUP_DESCRIPTION_ERROR
    );
    g5.description = new_id();
    assert!(g5.validate_for_create().is_ok());

    g5.type_props.push('x');
    assert_eq!(
        g5.validate_for_create().unwrap_err().id(),
        GROUP_TYPE_PROPS_ERROR
    );
    g5.type_props = new_id();
    assert!(g5.validate_for_create().is_ok());

    // must use a valid type
    let g6 = Group {
        group_type: "fake".to_owned(),
        ..random_group()
    };
    assert_eq!(g6.validate_for_create().unwrap_err().id(), GROUP_TYPE_ERROR);
    assert_eq!(store.save(g6).await.unwrap_err().id(), GROUP_TYPE_ERROR);
}

pub async fn test_group_store_get(store: &dyn GroupStore) {
    let d1 = store.save(random_group()).await.expect("saving a valid group");
    assert_eq!(d1.id.len(), ID_LENGTH);

    let d2 = store.get(&d1.id).await.expect("fetching a saved group");
    assert_eq!(d1.id, d2.id);
    assert_eq!(d1.name, d2.name);
    assert_eq!(d1.display_name, d2.display_name);
    assert_eq!(d1.description, d2.description);
    assert_eq!(d1.group_type, d2.group_type);
    assert_eq!(d1.type_props, d2.type_props);
    assert_eq!(d1.create_at, d2.create_at);
    assert_eq!(d1.update_at, d2.update_at);
    assert_eq!(d1.delete_at, d2.delete_at);

    // get an invalid group
    let err = store.get(&new_id()).await.unwrap_err();
    assert_eq!(err.id(), GET_ERROR);
}

pub async fn test_group_store_get_by_name(store: &dyn GroupStore) {
    let d1 = store.save(random_group()).await.expect("saving a valid group");
    assert_eq!(store.get_by_name(&d1.name).await.unwrap(), d1);

    let err = store.get_by_name(&new_id()).await.unwrap_err();
    assert_eq!(err.id(), GET_ERROR);
}

pub async fn test_group_store_get_all_page(store: &dyn GroupStore) {
    let num_groups = 10;

    let mut created = Vec::with_capacity(num_groups);
    for _ in 0..num_groups {
        let g = store.save(random_group()).await.expect("saving a valid group");
        created.push(g.id);
    }

    // returns all the groups
    let all = page_ids(store, 0, 999).await;
    assert!(all.len() >= num_groups);
    for id in &created {
        assert!(all.contains(id), "group {} missing from listing", id);
    }

    // returns the correct number based on limit
    assert_eq!(page_ids(store, 0, 2).await.len(), 2);
    assert!(page_ids(store, 0, 0).await.is_empty());

    // result sets are different using an offset
    let first = page_ids(store, 0, 5).await;
    let second = page_ids(store, 5, 5).await;
    assert_eq!(first.len(), 5);
    let first_set = first.iter().collect::<HashSet<_>>();
    for id in &second {
        assert!(!first_set.contains(id), "group {} on two pages", id);
    }

    // walking every page covers each active group exactly once
    let mut walked = Vec::new();
    let mut offset = 0;
    loop {
        let page = page_ids(store, offset, 3).await;
        if page.is_empty() {
            break;
        }
        assert!(page.len() <= 3);
        offset += page.len() as u64;
        walked.extend(page);
    }
    assert!(walked.starts_with(&all));
    assert_eq!(walked.iter().collect::<HashSet<_>>().len(), walked.len());
}

pub async fn test_group_store_delete(store: &dyn GroupStore) {
    let d1 = store.save(random_group()).await.expect("saving a valid group");
    assert_eq!(d1.id.len(), ID_LENGTH);

    // check the group is retrievable
    store.get(&d1.id).await.expect("fetching a saved group");

    let before = page_ids(store, 0, 999).await;
    assert!(before.contains(&d1.id));

    let deleted = store.delete(&d1.id).await.expect("deleting a group");
    assert_ne!(deleted.delete_at, 0);

    // still retrievable by id, now marked
    let d2 = store.get(&d1.id).await.expect("fetching a deleted group");
    assert_ne!(d2.delete_at, 0);
    assert_eq!(d2.name, d1.name);

    let after = page_ids(store, 0, 999).await;
    assert_eq!(before.len(), after.len() + 1);
    assert!(!after.contains(&d1.id));

    // deleting again is not an error
    store.delete(&d1.id).await.expect("deleting a deleted group");
    assert_ne!(store.get(&d1.id).await.unwrap().delete_at, 0);
    assert_eq!(page_ids(store, 0, 999).await.len(), after.len());

    // the name stays taken after a soft delete
    let reuse = Group::new(d1.name.clone(), new_id(), GroupType::Ldap);
    assert_eq!(store.save(reuse).await.unwrap_err().id(), SAVE_INSERT_ERROR);

    // try and delete a nonexistent group
    let err = store.delete(&new_id()).await.unwrap_err();
    assert_eq!(err.id(), GET_ERROR);
}

pub async fn test_group_create_member(store: &dyn GroupStore) {
    let gm1 = GroupMember::new(new_id(), new_id());

    // happy path
    let d1 = store
        .create_member(gm1.clone())
        .await
        .expect("creating a membership");
    assert_eq!(d1.group_id, gm1.group_id);
    assert_eq!(d1.user_id, gm1.user_id);
    assert_ne!(d1.create_at, 0);
    assert_eq!(d1.delete_at, 0);

    // duplicate composite key (group_id, user_id)
    let err = store.create_member(gm1.clone()).await.unwrap_err();
    assert_eq!(err.id(), SAVE_MEMBER_EXISTS_ERROR);

    // same user in another group is a different key
    let other = GroupMember::new(new_id(), gm1.user_id.clone());
    store.create_member(other).await.expect("creating a membership");

    let err = store
        .create_member(GroupMember::new(gm1.group_id.clone(), ""))
        .await
        .unwrap_err();
    assert_eq!(err.id(), GROUP_MEMBER_USER_ID_ERROR);
}

pub async fn test_group_get_members(store: &dyn GroupStore) {
    let group = store.save(random_group()).await.expect("saving a valid group");
    assert!(store.get_members(&group.id).await.unwrap().is_empty());

    let mut users = Vec::new();
    for _ in 0..3 {
        let member = store
            .create_member(GroupMember::new(group.id.clone(), new_id()))
            .await
            .expect("creating a membership");
        users.push(member.user_id);
    }

    let members = store.get_members(&group.id).await.unwrap();
    assert_eq!(members.len(), 3);
    assert!(members.iter().all(|m| m.group_id == group.id));
    for user in &users {
        assert!(members.iter().any(|m| &m.user_id == user));
    }
}

pub async fn test_group_store_concurrent_save(store: &dyn GroupStore) {
    let name = new_id();
    let handles = (0..8)
        .map(|_| store.save(Group::new(name.clone(), new_id(), GroupType::Ldap)))
        .collect::<Vec<_>>();
    let results = join_all(handles).await;

    let saved = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(saved, 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(err.id(), SAVE_INSERT_ERROR);
    }

    let member = GroupMember::new(new_id(), new_id());
    let handles = (0..8)
        .map(|_| store.create_member(member.clone()))
        .collect::<Vec<_>>();
    let results = join_all(handles).await;
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(err.id(), SAVE_MEMBER_EXISTS_ERROR);
    }
}
