use secrecy::Secret;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

use crate::supabase::SupabaseSettings;

#[derive(Debug, Clone, Deserialize)]
pub struct ItemsConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub allowed_origins: Vec<String>,
    pub supabase: SupabaseConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseConfig {
    pub url: String,
    /// Service credential; full privileges, never sent to clients.
    pub service_key: Secret<String>,
    /// HMAC secret used to verify access tokens.
    pub jwt_secret: Secret<String>,
    pub jwt_audience: Option<String>,
    pub timeout_secs: u64,
}

impl SupabaseConfig {
    pub fn settings(&self) -> SupabaseSettings {
        SupabaseSettings {
            url: self.url.clone(),
            service_key: self.service_key.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

impl ItemsConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        Self::from_lookup(common, |key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment: Environment = lookup("ENVIRONMENT")
            .unwrap_or_else(|| "dev".to_string())
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;
        let get = |key: &str, default: Option<&str>| get_env(&lookup, key, default, is_prod);

        let config = ItemsConfig {
            common,
            environment: environment.clone(),
            service_name: get("SERVICE_NAME", Some("items-service"))?,
            log_level: get("LOG_LEVEL", Some("info"))?,
            otlp_endpoint: lookup("OTLP_ENDPOINT").filter(|v| !v.trim().is_empty()),
            allowed_origins: get("ALLOWED_ORIGINS", Some("http://localhost:3000"))?
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            supabase: SupabaseConfig {
                url: get("SUPABASE_URL", None)?,
                service_key: Secret::new(get("SUPABASE_KEY", None)?),
                jwt_secret: Secret::new(get("SUPABASE_JWT_SECRET", None)?),
                jwt_audience: lookup("SUPABASE_JWT_AUDIENCE").filter(|v| !v.trim().is_empty()),
                timeout_secs: get("SUPABASE_TIMEOUT_SECS", Some("30"))?
                    .parse()
                    .map_err(|e: std::num::ParseIntError| {
                        AppError::ConfigError(anyhow::anyhow!(
                            "SUPABASE_TIMEOUT_SECS is not a number: {}",
                            e
                        ))
                    })?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        use secrecy::ExposeSecret;

        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.supabase.url.trim().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "SUPABASE_URL must not be empty"
            )));
        }

        if self.supabase.service_key.expose_secret().trim().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "SUPABASE_KEY must not be empty"
            )));
        }

        if self.supabase.jwt_secret.expose_secret().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "SUPABASE_JWT_SECRET must not be empty"
            )));
        }

        if self.supabase.timeout_secs == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "SUPABASE_TIMEOUT_SECS must be positive"
            )));
        }

        if self.environment == Environment::Prod {
            if self.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
                )));
            }

            if self.supabase.url.starts_with("http://") {
                tracing::warn!("SUPABASE_URL is not https in production");
            }
        }

        Ok(())
    }
}

fn get_env<F>(lookup: &F, key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => Ok(val),
        None => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}
