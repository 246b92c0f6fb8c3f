mod env;
mod postgres_connect;
mod sqlx_postgres;

pub use env::PostgresEnv;
pub use postgres_connect::{connect_pool, connect_pool_from_env, create_table, drop_tables};
pub use sqlx_postgres::*;

// Paths used by `init_databases!` in the calling crate.
#[doc(hidden)]
pub use anyhow;
#[doc(hidden)]
pub use sqlx;
#[doc(hidden)]
pub use tokio;
