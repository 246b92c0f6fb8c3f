use std::str::FromStr;

use anyhow::{anyhow, Result};

/// Configuration loaded from process environment variables.
pub trait EnvVars: Sized {
    const NAME: &'static str;
    /// Variables that must be present for `load` to succeed.
    const REQUIRED: &'static [&'static str];

    fn load() -> Result<Self>;

    /// Reports every missing variable at once instead of failing on the first.
    fn validate_env() -> Result<()> {
        let missing_vars: Vec<&'static str> = Self::REQUIRED
            .iter()
            .cloned()
            .filter(|var| std::env::var(var).is_err())
            .collect();

        if missing_vars.is_empty() {
            return Ok(());
        }

        let vars_str = missing_vars.join(", ");
        tracing::error!("[Env: {}] Required environment variables are not set: [{}]", Self::NAME, &vars_str);
        Err(anyhow!("[Env: {}] missing environment variables: {}", Self::NAME, vars_str))
    }
}

pub fn require_env(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow!("{} is not set", key))
}

/// Reads `key` and parses it, falling back to `default` when the variable is absent.
pub fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("{} has an invalid value {:?}: {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}
