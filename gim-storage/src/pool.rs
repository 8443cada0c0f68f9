use std::{str::FromStr, sync::Arc};

use anyhow::Context;
use sqlx::{
    migrate::Migrator,
    mysql::MySqlPoolOptions,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    MySqlPool, SqlitePool,
};
use tracing::info;

use crate::{
    mariadb::MariadbEngine, sqlite::SqliteEngine, GroupStore, GroupStoreImpl,
};

static MYSQL_MIGRATOR: Migrator = sqlx::migrate!("./migrations/mysql");
static SQLITE_MIGRATOR: Migrator = sqlx::migrate!("./migrations/sqlite");

pub async fn mysql_connection_manager(
    uri: &str,
    max_size: u32,
    min_idle: u32,
    run_migrations: bool,
) -> anyhow::Result<MySqlPool> {
    let pool = MySqlPoolOptions::new()
        .max_connections(max_size)
        .min_connections(min_idle)
        .connect(uri)
        .await
        .context("error while initializing the database connection pool")?;

    if run_migrations {
        info!("migrations enabled, running...");
        MYSQL_MIGRATOR
            .run(&pool)
            .await
            .context("error while running database migrations")?;
    }

    Ok(pool)
}

pub async fn sqlite_connection_manager(
    uri: &str,
    max_size: u32,
    min_idle: u32,
    run_migrations: bool,
) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(uri)
        .context("invalid sqlite database url")?
        .create_if_missing(true);
    // each connection to an in-memory database sees its own empty database,
    // which also lives only as long as that connection
    let (max_size, min_idle) = if is_in_memory(uri) {
        (1, 1)
    } else {
        (max_size, min_idle)
    };
    let pool = SqlitePoolOptions::new()
        .max_connections(max_size)
        .min_connections(min_idle)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .context("error while initializing the database connection pool")?;

    if run_migrations {
        info!("migrations enabled, running...");
        SQLITE_MIGRATOR
            .run(&pool)
            .await
            .context("error while running database migrations")?;
    }

    Ok(pool)
}

fn is_in_memory(uri: &str) -> bool {
    uri.contains(":memory:") || uri.contains("mode=memory")
}

/// Opens a group store, picking the engine from the url scheme.
pub async fn connect(
    uri: &str,
    max_size: u32,
    min_idle: u32,
    run_migrations: bool,
) -> anyhow::Result<Arc<dyn GroupStore>> {
    if uri.starts_with("sqlite:") {
        info!("using sqlite engine");
        let pool =
            sqlite_connection_manager(uri, max_size, min_idle, run_migrations)
                .await?;
        Ok(Arc::new(GroupStoreImpl::new(SqliteEngine::new(pool))))
    } else {
        info!("using mariadb engine");
        let pool =
            mysql_connection_manager(uri, max_size, min_idle, run_migrations)
                .await?;
        Ok(Arc::new(GroupStoreImpl::new(MariadbEngine::new(pool))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_urls() {
        assert!(is_in_memory("sqlite::memory:"));
        assert!(is_in_memory("sqlite://groups.db?mode=memory"));
        assert!(!is_in_memory("sqlite://groups.db"));
        assert!(!is_in_memory("mysql://root@localhost/groups"));
    }

    #[tokio::test]
    async fn in_memory_pool_is_single_connection() {
        let pool = sqlite_connection_manager("sqlite::memory:", 50, 10, true)
            .await
            .unwrap();
        assert_eq!(pool.options().get_max_connections(), 1);
    }
}
