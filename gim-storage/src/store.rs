use std::{fmt, sync::Arc};

use chrono::Utc;
use mockall::automock;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use gim_slo::{errors, new_id, IdGenerator};

use crate::{
    group::Group, group_member::GroupMember, GroupEngine, StoreChannel,
};

pub const SAVE_MISSING_ERROR: &str = "store.sql_group.save.missing.app_error";
pub const SAVE_INSERT_ERROR: &str = "store.sql_group.save.insert.app_error";
pub const GET_ERROR: &str = "store.sql_group.get.app_error";
pub const SAVE_MEMBER_EXISTS_ERROR: &str =
    "store.sql_group.save_member.exists.app_error";

/// Storage contract for groups and their memberships.
///
/// Every operation runs independently and completes its [`StoreChannel`]
/// exactly once.
#[automock]
pub trait GroupStore: Send + Sync {
    /// Inserts a brand-new group. The store assigns `id` and the timestamps.
    fn save(&self, group: Group) -> StoreChannel<Group>;
    /// Looks a group up by id, soft-deleted ones included.
    fn get(&self, id: &str) -> StoreChannel<Group>;
    fn get_by_name(&self, name: &str) -> StoreChannel<Group>;
    /// A page of active groups in creation order.
    fn get_all_page(&self, offset: u64, limit: u64) -> StoreChannel<Vec<Group>>;
    /// Soft-deletes a group and completes with its deleted state.
    fn delete(&self, id: &str) -> StoreChannel<Group>;
    fn create_member(&self, member: GroupMember) -> StoreChannel<GroupMember>;
    fn get_members(&self, group_id: &str) -> StoreChannel<Vec<GroupMember>>;
}

/// [`GroupStore`] over any [`GroupEngine`].
///
/// Workers run on the runtime captured at construction, so a built store can
/// be used from any thread.
pub struct GroupStoreImpl<E> {
    engine: Arc<E>,
    id_generator: IdGenerator,
    handle: Handle,
}

impl<E> Clone for GroupStoreImpl<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            id_generator: Arc::clone(&self.id_generator),
            handle: self.handle.clone(),
        }
    }
}

impl<E> fmt::Debug for GroupStoreImpl<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupStoreImpl").finish()
    }
}

impl<E: GroupEngine> GroupStoreImpl<E> {
    /// Must be called within a tokio runtime; see [`Self::with_handle`].
    pub fn new(engine: E) -> Self {
        Self::with_id_generator(engine, Arc::new(new_id))
    }

    /// Must be called within a tokio runtime; see [`Self::with_handle`].
    pub fn with_id_generator(engine: E, id_generator: IdGenerator) -> Self {
        Self::with_handle(engine, id_generator, Handle::current())
    }

    pub fn with_handle(
        engine: E,
        id_generator: IdGenerator,
        handle: Handle,
    ) -> Self {
        Self {
            engine: Arc::new(engine),
            id_generator,
            handle,
        }
    }
}

impl<E: GroupEngine> GroupStore for GroupStoreImpl<E> {
    fn save(&self, group: Group) -> StoreChannel<Group> {
        let engine = Arc::clone(&self.engine);
        let id_generator = Arc::clone(&self.id_generator);
        StoreChannel::spawn(&self.handle, async move {
            group.validate_for_create()?;
            if !group.id.is_empty() {
                return Err(errors::missing_record(
                    SAVE_MISSING_ERROR,
                    &format!("id={}", group.id),
                ));
            }
            let now = Utc::now().timestamp_millis();
            let group = Group {
                id: id_generator(),
                create_at: now,
                update_at: now,
                delete_at: 0,
                ..group
            };
            if !engine.insert_group(&group).await? {
                warn!("group name {} already taken", group.name);
                return Err(errors::insert_conflict(
                    SAVE_INSERT_ERROR,
                    &format!("name={}", group.name),
                ));
            }
            debug!("saved group {}", group.id);
            Ok(group)
        })
    }

    fn get(&self, id: &str) -> StoreChannel<Group> {
        let engine = Arc::clone(&self.engine);
        let id = id.to_owned();
        StoreChannel::spawn(&self.handle, async move {
            fetch(engine.as_ref(), &id).await
        })
    }

    fn get_by_name(&self, name: &str) -> StoreChannel<Group> {
        let engine = Arc::clone(&self.engine);
        let name = name.to_owned();
        StoreChannel::spawn(&self.handle, async move {
            engine.find_group_by_name(&name).await?.ok_or_else(|| {
                errors::not_found(GET_ERROR, &format!("name={}", name))
            })
        })
    }

    fn get_all_page(&self, offset: u64, limit: u64) -> StoreChannel<Vec<Group>> {
        let engine = Arc::clone(&self.engine);
        StoreChannel::spawn(&self.handle, async move {
            if limit == 0 {
                return Ok(Vec::new());
            }
            engine.page_active_groups(offset, limit).await
        })
    }

    fn delete(&self, id: &str) -> StoreChannel<Group> {
        let engine = Arc::clone(&self.engine);
        let id = id.to_owned();
        StoreChannel::spawn(&self.handle, async move {
            let mut group = fetch(engine.as_ref(), &id).await?;
            group.delete_at = Utc::now().timestamp_millis();
            engine.mark_group_deleted(&group.id, group.delete_at).await?;
            debug!("soft deleted group {}", group.id);
            Ok(group)
        })
    }

    fn create_member(&self, member: GroupMember) -> StoreChannel<GroupMember> {
        let engine = Arc::clone(&self.engine);
        StoreChannel::spawn(&self.handle, async move {
            member.validate_for_create()?;
            let member = GroupMember {
                create_at: Utc::now().timestamp_millis(),
                delete_at: 0,
                ..member
            };
            if !engine.insert_member(&member).await? {
                warn!(
                    "user {} is already a member of group {}",
                    member.user_id, member.group_id
                );
                return Err(errors::exists_conflict(
                    SAVE_MEMBER_EXISTS_ERROR,
                    &format!(
                        "group_id={}, user_id={}",
                        member.group_id, member.user_id
                    ),
                ));
            }
            debug!("user {} joined group {}", member.user_id, member.group_id);
            Ok(member)
        })
    }

    fn get_members(&self, group_id: &str) -> StoreChannel<Vec<GroupMember>> {
        let engine = Arc::clone(&self.engine);
        let group_id = group_id.to_owned();
        StoreChannel::spawn(&self.handle, async move {
            engine.active_members(&group_id).await
        })
    }
}

// Delete reports absence exactly like get.
async fn fetch<E: GroupEngine + ?Sized>(
    engine: &E,
    id: &str,
) -> gim_slo::Result<Group> {
    engine
        .find_group(id)
        .await?
        .ok_or_else(|| errors::not_found(GET_ERROR, &format!("id={}", id)))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use gim_slo::ID_LENGTH;

    use super::*;
    use crate::{group::GroupType, MockGroupEngine};

    fn candidate() -> Group {
        Group {
            description: new_id(),
            type_props: new_id(),
            ..Group::new(new_id(), new_id(), GroupType::Ldap)
        }
    }

    #[tokio::test]
    async fn save_stamps_id_and_times() {
        let mut engine = MockGroupEngine::new();
        engine
            .expect_insert_group()
            .withf(|g: &Group| g.id.len() == ID_LENGTH && g.create_at > 0)
            .times(1)
            .returning(|_| Ok(true));
        let store = GroupStoreImpl::new(engine);

        let input = candidate();
        let saved = store.save(input.clone()).await.unwrap();
        assert_eq!(saved.id.len(), ID_LENGTH);
        assert_eq!(saved.name, input.name);
        assert_eq!(saved.create_at, saved.update_at);
        assert_eq!(saved.delete_at, 0);
    }

    #[tokio::test]
    async fn save_uses_injected_generator() {
        let mut engine = MockGroupEngine::new();
        engine.expect_insert_group().returning(|_| Ok(true));
        let counter = Arc::new(AtomicUsize::new(0));
        let seq = Arc::clone(&counter);
        let store = GroupStoreImpl::with_id_generator(
            engine,
            Arc::new(move || {
                format!("{:026}", seq.fetch_add(1, Ordering::SeqCst))
            }),
        );

        let first = store.save(candidate()).await.unwrap();
        let second = store.save(candidate()).await.unwrap();
        assert_eq!(first.id, "0".repeat(26));
        assert_eq!(second.id, format!("{:026}", 1));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalid_group_never_reaches_engine() {
        // no expectations: any engine call panics the worker
        let store = GroupStoreImpl::new(MockGroupEngine::new());
        let err = store
            .save(Group {
                group_type: "fake".to_owned(),
                ..candidate()
            })
            .await
            .unwrap_err();
        assert_eq!(err.id(), crate::group::GROUP_TYPE_ERROR);
    }

    #[tokio::test]
    async fn preset_id_is_rejected() {
        let store = GroupStoreImpl::new(MockGroupEngine::new());
        let err = store
            .save(Group {
                id: new_id(),
                create_at: 1,
                update_at: 1,
                ..candidate()
            })
            .await
            .unwrap_err();
        assert_eq!(err.id(), SAVE_MISSING_ERROR);
    }

    #[tokio::test]
    async fn name_conflict() {
        let mut engine = MockGroupEngine::new();
        engine.expect_insert_group().returning(|_| Ok(false));
        let store = GroupStoreImpl::new(engine);
        let err = store.save(candidate()).await.unwrap_err();
        assert_eq!(err.id(), SAVE_INSERT_ERROR);
    }

    #[tokio::test]
    async fn engine_fault_is_generic() {
        let mut engine = MockGroupEngine::new();
        engine.expect_find_group().returning(|_| {
            Err(errors::anyhow(anyhow::anyhow!("connection refused")))
        });
        let store = GroupStoreImpl::new(engine);
        let err = store.get("abc").await.unwrap_err();
        assert_eq!(err.id(), errors::ENGINE_ERROR_ID);
    }

    #[tokio::test]
    async fn delete_missing_reports_get_error() {
        let mut engine = MockGroupEngine::new();
        engine.expect_find_group().returning(|_| Ok(None));
        engine.expect_mark_group_deleted().never();
        let store = GroupStoreImpl::new(engine);
        assert_eq!(store.get("abc").await.unwrap_err().id(), GET_ERROR);
        assert_eq!(store.delete("abc").await.unwrap_err().id(), GET_ERROR);
    }

    #[tokio::test]
    async fn delete_marks_found_group() {
        let mut engine = MockGroupEngine::new();
        engine.expect_find_group().returning(|id| {
            Ok(Some(Group {
                id: id.to_owned(),
                ..candidate()
            }))
        });
        engine
            .expect_mark_group_deleted()
            .withf(|id: &str, at: &i64| id == "abc" && *at > 0)
            .times(1)
            .returning(|_, _| Ok(()));
        let store = GroupStoreImpl::new(engine);
        let deleted = store.delete("abc").await.unwrap();
        assert!(deleted.is_deleted());
    }

    #[tokio::test]
    async fn zero_limit_is_empty_page() {
        let store = GroupStoreImpl::new(MockGroupEngine::new());
        assert!(store.get_all_page(0, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn member_conflict() {
        let mut engine = MockGroupEngine::new();
        engine.expect_insert_member().returning(|_| Ok(false));
        let store = GroupStoreImpl::new(engine);
        let err = store
            .create_member(GroupMember::new(new_id(), new_id()))
            .await
            .unwrap_err();
        assert_eq!(err.id(), SAVE_MEMBER_EXISTS_ERROR);
    }

    #[test]
    fn usable_from_threads_outside_the_runtime() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let store = rt.block_on(async {
            let mut engine = MockGroupEngine::new();
            engine.expect_find_group().returning(|_| Ok(None));
            GroupStoreImpl::new(engine)
        });

        let err = std::thread::spawn(move || store.get("abc").blocking_recv())
            .join()
            .unwrap()
            .unwrap_err();
        assert_eq!(err.id(), GET_ERROR);
    }

    #[test]
    fn built_with_explicit_handle() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let mut engine = MockGroupEngine::new();
        engine.expect_insert_group().returning(|_| Ok(true));
        let store = GroupStoreImpl::with_handle(
            engine,
            Arc::new(new_id),
            rt.handle().clone(),
        );

        let saved = store.save(candidate()).blocking_recv().unwrap();
        assert_eq!(saved.id.len(), ID_LENGTH);
    }

    #[tokio::test]
    async fn mock_store_replays_canned_results() {
        let mut store = MockGroupStore::new();
        store
            .expect_get()
            .withf(|id: &str| id == "known")
            .returning(|id| {
                StoreChannel::ready(Ok(Group {
                    id: id.to_owned(),
                    ..Group::new("eng", "Engineering", GroupType::Ldap)
                }))
            });
        store
            .expect_get()
            .withf(|id: &str| id != "known")
            .returning(|id| {
                StoreChannel::ready(Err(errors::not_found(GET_ERROR, id)))
            });

        let store: &dyn GroupStore = &store;
        assert_eq!(store.get("known").await.unwrap().name, "eng");
        assert_eq!(store.get("other").await.unwrap_err().id(), GET_ERROR);
    }
}
