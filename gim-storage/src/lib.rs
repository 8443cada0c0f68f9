mod channel;
pub mod group;
pub mod group_member;
pub mod mariadb;
mod pool;
pub mod sqlite;
pub mod store;
pub mod storetest;

pub use channel::StoreChannel;
pub use pool::{connect, mysql_connection_manager, sqlite_connection_manager};
pub use store::{GroupStore, GroupStoreImpl, MockGroupStore};

use async_trait::async_trait;
use mockall::automock;

use gim_slo::Result;

use crate::{group::Group, group_member::GroupMember};

/// Persistence engine behind a [`GroupStore`].
///
/// Uniqueness of `name` and of `(group_id, user_id)` is enforced by the
/// engine's own constraints; the insert methods report a violation by
/// returning `false` instead of an error.
#[automock]
#[async_trait]
pub trait GroupEngine: Send + Sync + 'static {
    async fn insert_group(&self, group: &Group) -> Result<bool>;
    async fn find_group(&self, id: &str) -> Result<Option<Group>>;
    async fn find_group_by_name(&self, name: &str) -> Result<Option<Group>>;
    /// Active groups ordered by `(create_at, id)`.
    async fn page_active_groups(
        &self,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Group>>;
    async fn mark_group_deleted(&self, id: &str, delete_at: i64) -> Result<()>;
    async fn insert_member(&self, member: &GroupMember) -> Result<bool>;
    /// Active members of a group ordered by `(create_at, user_id)`.
    async fn active_members(&self, group_id: &str) -> Result<Vec<GroupMember>>;
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}

/// `u64` bounds clamped to what SQL `LIMIT`/`OFFSET` binds accept.
pub(crate) fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
