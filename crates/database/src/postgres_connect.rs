use anyhow::Result;
use sqlx::postgres::{PgPool, PgPoolOptions};

use armory_common::EnvVars;

use crate::{PostgresEnv, SqlxSchema};

pub async fn connect_pool(env: &PostgresEnv) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(env.max_connections)
        .connect(&env.database_url)
        .await?;
    tracing::info!("[Postgres] connected with up to {} connections", env.max_connections);
    Ok(pool)
}

pub async fn connect_pool_from_env() -> Result<PgPool> {
    let env = PostgresEnv::load()?;
    connect_pool(&env).await
}

/// Drops the given tables last-to-first. Failures are logged and swallowed so a reset
/// can proceed past tables that were never created.
pub async fn drop_tables(pool: &PgPool, tables: &[(&'static str, String)]) {
    for (table_name, sql) in tables.iter().rev() {
        if let Err(e) = sqlx::query(sql).execute(pool).await {
            tracing::warn!("[Postgres] failed to drop table '{}': {:?}", table_name, e);
        }
    }
}

/// Creates the table of `T` and its indexes.
pub async fn create_table<T: SqlxSchema>(pool: &PgPool) -> Result<()> {
    let create_sql = T::create_table_sql();
    if !create_sql.trim().is_empty() {
        sqlx::query(&create_sql).execute(pool).await
            .map_err(|e| anyhow::anyhow!("failed to create table '{}': {:?}", T::TABLE_NAME, e))?;
    }

    for index_sql in T::INDEXES_SQL {
        sqlx::query(index_sql).execute(pool).await
            .map_err(|e| anyhow::anyhow!("failed to create index for '{}'. SQL: {}. Error: {:?}", T::TABLE_NAME, index_sql, e))?;
    }
    tracing::debug!("[Postgres] table '{}' ready", T::TABLE_NAME);
    Ok(())
}

/// Declares the process-wide connection pool and the tables it owns.
///
/// Types are created in the order listed and dropped in reverse, so list parents before
/// the tables that reference them.
///
/// # Generated Functions
/// - `async fn connect(drop_tables: bool, create_tables: bool) -> anyhow::Result<&'static PgPool>`
///
/// # Example
/// ```rust,ignore
/// init_databases!(
///     default: [Character, MagicItem]
/// );
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let pool = connect(false, true).await?;
///     // ... use pool
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! init_databases {
    (
        default: [$($default_type:ty),* $(,)?]
    ) => {
        static POOL: $crate::tokio::sync::OnceCell<$crate::sqlx::PgPool> = $crate::tokio::sync::OnceCell::const_new();

        async fn connect(drop_tables: bool, create_tables: bool) -> $crate::anyhow::Result<&'static $crate::sqlx::PgPool> {
            POOL.get_or_try_init(|| async {
                let pool = $crate::connect_pool_from_env().await?;

                if drop_tables {
                    $crate::drop_tables(&pool, &[
                        $( (
                            <$default_type as $crate::SqlxSchema>::TABLE_NAME,
                            <$default_type as $crate::SqlxSchema>::drop_table_sql(),
                        ) ),*
                    ]).await;
                }

                if create_tables {
                    $( $crate::create_table::<$default_type>(&pool).await?; )*
                }

                Ok::<_, $crate::anyhow::Error>(pool)
            }).await
        }
    };
}
