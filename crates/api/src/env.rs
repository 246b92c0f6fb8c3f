use anyhow::Result;

use armory_common::{env_or, EnvVars};

pub struct ApiServerEnv {
    pub port: u16,
    pub request_timeout_secs: u64,
}

impl EnvVars for ApiServerEnv {
    const NAME: &'static str = "api-server";
    const REQUIRED: &'static [&'static str] = &[];

    fn load() -> Result<Self> {
        Self::validate_env()?;
        Ok(Self {
            port: env_or("PORT", 3333)?,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 30)?,
        })
    }
}
