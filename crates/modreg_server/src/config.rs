//! Server configuration from the environment (`.env` honoured).

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use modreg_core::hydrate::{HydrationPolicy, DEFAULT_DEADLINE};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:4200";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub jwt_secret: String,
    /// In-memory stores when unset.
    pub database_url: Option<String>,
    pub hydration_policy: HydrationPolicy,
    pub hydration_timeout: Duration,
    pub seed_path: Option<PathBuf>,
}

impl ServerConfig {
    /// Reads:
    ///   MODREG_BIND_ADDR             — listen address (default: 0.0.0.0:4200)
    ///   MODREG_JWT_SECRET            — JWT HMAC secret (required)
    ///   MODREG_DATABASE_URL          — Postgres connection string (optional)
    ///   MODREG_HYDRATION_POLICY      — `degrade` (default) or `fail_fast`
    ///   MODREG_HYDRATION_TIMEOUT_MS  — whole-call hydration deadline (default: 5000)
    ///   MODREG_SEED_PATH             — YAML seed bundle applied at startup (optional)
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let jwt_secret = var("MODREG_JWT_SECRET").context("MODREG_JWT_SECRET must be set")?;

        let hydration_policy = match var("MODREG_HYDRATION_POLICY") {
            Some(raw) => raw
                .trim()
                .parse::<HydrationPolicy>()
                .with_context(|| format!("invalid MODREG_HYDRATION_POLICY `{raw}`"))?,
            None => HydrationPolicy::default(),
        };

        let hydration_timeout = match var("MODREG_HYDRATION_TIMEOUT_MS") {
            Some(raw) => Duration::from_millis(
                raw.trim()
                    .parse::<u64>()
                    .with_context(|| format!("invalid MODREG_HYDRATION_TIMEOUT_MS `{raw}`"))?,
            ),
            None => DEFAULT_DEADLINE,
        };

        Ok(Self {
            bind_addr: var("MODREG_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into()),
            jwt_secret,
            database_url: var("MODREG_DATABASE_URL"),
            hydration_policy,
            hydration_timeout,
            seed_path: var("MODREG_SEED_PATH").map(PathBuf::from),
        })
    }
}
