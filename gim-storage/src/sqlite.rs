use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use gim_slo::{errors, Result};

use crate::{
    clamp_i64, group::Group, group_member::GroupMember, is_unique_violation,
    sqlite_connection_manager, GroupEngine,
};

#[derive(Clone, Debug)]
pub struct SqliteEngine {
    pool: SqlitePool,
}

impl SqliteEngine {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// A private, migrated in-memory database.
    pub async fn open_in_memory() -> anyhow::Result<Self> {
        let pool =
            sqlite_connection_manager("sqlite::memory:", 1, 1, true).await?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl GroupEngine for SqliteEngine {
    async fn insert_group(&self, group: &Group) -> Result<bool> {
        match sqlx::query(
            r#"INSERT INTO user_groups
            (id,name,display_name,description,source,type_props,create_at,update_at,delete_at)
            VALUES(?,?,?,?,?,?,?,?,?);"#,
        )
        .bind(&group.id)
        .bind(&group.name)
        .bind(&group.display_name)
        .bind(&group.description)
        .bind(&group.group_type)
        .bind(&group.type_props)
        .bind(group.create_at)
        .bind(group.update_at)
        .bind(group.delete_at)
        .execute(&self.pool)
        .await
        {
            Ok(_) => Ok(true),
            Err(err) if is_unique_violation(&err) => Ok(false),
            Err(err) => Err(errors::any(err)),
        }
    }

    async fn find_group(&self, id: &str) -> Result<Option<Group>> {
        let row = sqlx::query(
            r#"SELECT id,name,display_name,description,source,type_props,create_at,update_at,delete_at
                FROM user_groups
                WHERE id = ?;"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(errors::any)?;
        row.as_ref().map(group_from_row).transpose()
    }

    async fn find_group_by_name(&self, name: &str) -> Result<Option<Group>> {
        let row = sqlx::query(
            r#"SELECT id,name,display_name,description,source,type_props,create_at,update_at,delete_at
                FROM user_groups
                WHERE name = ?;"#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(errors::any)?;
        row.as_ref().map(group_from_row).transpose()
    }

    async fn page_active_groups(
        &self,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Group>> {
        let rows = sqlx::query(
            r#"SELECT id,name,display_name,description,source,type_props,create_at,update_at,delete_at
                FROM user_groups
                WHERE delete_at = 0
                ORDER BY create_at,id
                LIMIT ? OFFSET ?;"#,
        )
        .bind(clamp_i64(limit))
        .bind(clamp_i64(offset))
        .fetch_all(&self.pool)
        .await
        .map_err(errors::any)?;
        rows.iter().map(group_from_row).collect()
    }

    async fn mark_group_deleted(&self, id: &str, delete_at: i64) -> Result<()> {
        sqlx::query(r#"UPDATE user_groups SET delete_at = ? WHERE id = ?;"#)
            .bind(delete_at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(errors::any)?;
        Ok(())
    }

    async fn insert_member(&self, member: &GroupMember) -> Result<bool> {
        match sqlx::query(
            r#"INSERT INTO group_members
            (group_id,user_id,create_at,delete_at)
            VALUES(?,?,?,?);"#,
        )
        .bind(&member.group_id)
        .bind(&member.user_id)
        .bind(member.create_at)
        .bind(member.delete_at)
        .execute(&self.pool)
        .await
        {
            Ok(_) => Ok(true),
            Err(err) if is_unique_violation(&err) => Ok(false),
            Err(err) => Err(errors::any(err)),
        }
    }

    async fn active_members(&self, group_id: &str) -> Result<Vec<GroupMember>> {
        let rows = sqlx::query(
            r#"SELECT group_id,user_id,create_at,delete_at
                FROM group_members
                WHERE group_id = ? AND delete_at = 0
                ORDER BY create_at,user_id;"#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await
        .map_err(errors::any)?;
        rows.iter().map(member_from_row).collect()
    }
}

fn group_from_row(row: &SqliteRow) -> Result<Group> {
    Ok(Group {
        id: row.try_get("id").map_err(errors::any)?,
        name: row.try_get("name").map_err(errors::any)?,
        display_name: row.try_get("display_name").map_err(errors::any)?,
        description: row.try_get("description").map_err(errors::any)?,
        group_type: row.try_get("source").map_err(errors::any)?,
        type_props: row.try_get("type_props").map_err(errors::any)?,
        create_at: row.try_get("create_at").map_err(errors::any)?,
        update_at: row.try_get("update_at").map_err(errors::any)?,
        delete_at: row.try_get("delete_at").map_err(errors::any)?,
    })
}

fn member_from_row(row: &SqliteRow) -> Result<GroupMember> {
    Ok(GroupMember {
        group_id: row.try_get("group_id").map_err(errors::any)?,
        user_id: row.try_get("user_id").map_err(errors::any)?,
        create_at: row.try_get("create_at").map_err(errors::any)?,
        delete_at: row.try_get("delete_at").map_err(errors::any)?,
    })
}
