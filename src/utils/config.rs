//! Portal configuration, read from the environment (after `.env` is loaded).

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

const DEV_JWT_SECRET: &str = "placement-portal-development-secret";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),

    #[error("Invalid value for {name}: '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Server and behaviour configuration.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub host: String,
    pub port: u16,
    /// SQLite file; `:memory:` opens a throwaway database
    pub database_path: String,
    pub jwt_secret: String,
    /// Argon2 pepper, empty disables it
    pub hash_secret: String,
    pub token_ttl: Duration,
    pub uploads_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub cors_origins: Vec<String>,
    pub environment: String,
    /// Reject applications without a cover letter
    pub cover_letter_required: bool,
    /// Answer `GET /api/jobs` with 404 instead of an empty list
    pub empty_job_list_not_found: bool,
    /// Reject applications submitted after the job's `applyBy` date
    pub enforce_apply_deadline: bool,
    pub admin_seed: Option<AdminSeed>,
}

/// Credentials for the administrator account created at startup.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database_path: "portal.db".to_string(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            hash_secret: String::new(),
            token_ttl: Duration::from_secs(24 * 60 * 60),
            uploads_dir: PathBuf::from("./uploads"),
            max_upload_bytes: 5 * 1024 * 1024,
            cors_origins: vec!["*".to_string()],
            environment: "development".to_string(),
            cover_letter_required: true,
            empty_job_list_not_found: false,
            enforce_apply_deadline: false,
            admin_seed: None,
        }
    }
}

impl PortalConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let environment = lookup("ENVIRONMENT").unwrap_or(defaults.environment);
        let production = environment.eq_ignore_ascii_case("production");

        let jwt_secret = match lookup("JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None if production => return Err(ConfigError::Missing("JWT_SECRET")),
            None => defaults.jwt_secret,
        };

        let ttl_hours: u64 = parse_var(&lookup, "TOKEN_TTL_HOURS", 24)?;

        let admin_seed = match (lookup("ADMIN_EMAIL"), lookup("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed {
                name: lookup("ADMIN_NAME").unwrap_or_else(|| "Administrator".to_string()),
                email,
                password,
            }),
            _ => None,
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT", defaults.port)?,
            database_path: lookup("DATABASE_PATH").unwrap_or(defaults.database_path),
            jwt_secret,
            hash_secret: lookup("HASH_SECRET").unwrap_or_default(),
            token_ttl: Duration::from_secs(ttl_hours * 60 * 60),
            uploads_dir: lookup("UPLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.uploads_dir),
            max_upload_bytes: parse_var(&lookup, "MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            cors_origins: lookup("CORS_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.cors_origins),
            environment,
            cover_letter_required: parse_flag(&lookup, "COVER_LETTER_REQUIRED", defaults.cover_letter_required)?,
            empty_job_list_not_found: parse_flag(
                &lookup,
                "EMPTY_JOB_LIST_NOT_FOUND",
                defaults.empty_job_list_not_found,
            )?,
            enforce_apply_deadline: parse_flag(
                &lookup,
                "ENFORCE_APPLY_DEADLINE",
                defaults.enforce_apply_deadline,
            )?,
            admin_seed,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|o| o == "*")
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

fn parse_flag(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    match lookup(name) {
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { name, value }),
        },
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_without_variables() {
        let config = PortalConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.cover_letter_required);
        assert!(!config.empty_job_list_not_found);
        assert!(!config.enforce_apply_deadline);
        assert!(config.allows_any_origin());
        assert!(config.admin_seed.is_none());
    }

    #[test]
    fn reads_overrides() {
        let config = PortalConfig::from_lookup(lookup_from(&[
            ("PORT", "9000"),
            ("TOKEN_TTL_HOURS", "2"),
            ("COVER_LETTER_REQUIRED", "false"),
            ("CORS_ORIGINS", "http://a.test, http://b.test"),
            ("ADMIN_EMAIL", "root@portal.test"),
            ("ADMIN_PASSWORD", "hunter22"),
        ]))
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.token_ttl, Duration::from_secs(7200));
        assert!(!config.cover_letter_required);
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.admin_seed.unwrap().name, "Administrator");
    }

    #[test]
    fn production_requires_jwt_secret() {
        let err = PortalConfig::from_lookup(lookup_from(&[("ENVIRONMENT", "production")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));
    }

    #[test]
    fn rejects_malformed_values() {
        let err = PortalConfig::from_lookup(lookup_from(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
        assert!(PortalConfig::from_lookup(lookup_from(&[("ENFORCE_APPLY_DEADLINE", "maybe")])).is_err());
    }
}
