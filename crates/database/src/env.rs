use anyhow::Result;

use armory_common::{env_or, require_env, EnvVars};

pub struct PostgresEnv {
    pub database_url: String,
    pub max_connections: u32,
}

impl EnvVars for PostgresEnv {
    const NAME: &'static str = "postgres";
    const REQUIRED: &'static [&'static str] = &["DATABASE_URL"];

    fn load() -> Result<Self> {
        Self::validate_env()?;
        Ok(Self {
            database_url: require_env("DATABASE_URL")?,
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", 5)?,
        })
    }
}
