//! Application settings loaded via OrthoConfig.
//!
//! Values merge from CLI flags, `AVATAR_*` environment variables and config
//! files. Optional values fall back to defaults through the accessors below;
//! the provider key and bucket are required. The stale lock TTL must outlast
//! the slowest possible pipeline run, or the sweeper would reclaim live locks.

use std::net::SocketAddr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;
use zeroize::Zeroizing;

use crate::domain::generation_policy::{
    DEFAULT_GENERATION_COST, DEFAULT_MAX_ENTRIES, DEFAULT_MAX_IN_FLIGHT,
};
use crate::domain::{GenerationPolicy, GenerationPolicyError};
use crate::outbound::openai::OpenAiConfig;
use crate::outbound::s3::S3StoreConfig;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_ANALYSIS_MODEL: &str = "gpt-4o-mini";
const DEFAULT_IMAGE_MODEL: &str = "dall-e-3";
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 120;
const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 60;
const DEFAULT_STALE_LOCK_TTL_SECS: u64 = 900;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Errors raised while turning raw settings into typed configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// A required value is absent.
    #[error("missing required setting `{name}`")]
    Missing {
        /// Setting name.
        name: &'static str,
    },
    /// A value failed to parse.
    #[error("invalid setting `{name}`: {message}")]
    Invalid {
        /// Setting name.
        name: &'static str,
        /// Parser message.
        message: String,
    },
    /// Cost and capacity limits are inconsistent.
    #[error(transparent)]
    Policy(#[from] GenerationPolicyError),
}

fn invalid(name: &'static str, err: impl std::fmt::Display) -> SettingsError {
    SettingsError::Invalid {
        name,
        message: err.to_string(),
    }
}

fn parse_url(name: &'static str, raw: &str) -> Result<Url, SettingsError> {
    Url::parse(raw).map_err(|err| invalid(name, err))
}

fn parse_optional_url(name: &'static str, raw: Option<&str>) -> Result<Option<Url>, SettingsError> {
    raw.map(|value| parse_url(name, value)).transpose()
}

/// Runtime configuration for the avatar backend.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "AVATAR")]
pub struct AppSettings {
    /// Listen address, e.g. `0.0.0.0:8080`.
    pub bind_addr: Option<String>,
    /// PostgreSQL URL. The in-memory store is used when absent.
    pub database_url: Option<String>,
    /// Pool size.
    #[ortho_config(default = 10)]
    pub db_max_connections: u32,
    /// Credits debited per successful run.
    pub generation_cost: Option<u32>,
    /// Entries after which a generation is finalized.
    pub max_entries: Option<u32>,
    /// Concurrent runs per user.
    pub max_in_flight: Option<u32>,
    /// Bearer token for the provider.
    pub openai_api_key: Option<String>,
    /// Provider API root.
    pub openai_base_url: Option<String>,
    /// Vision model used for analysis.
    pub analysis_model: Option<String>,
    /// Image model used for synthesis.
    pub image_model: Option<String>,
    /// Per-request provider timeout in seconds. Also bounds image fetches.
    pub provider_timeout_secs: Option<u64>,
    /// Object store upload timeout in seconds.
    pub upload_timeout_secs: Option<u64>,
    /// Bucket for generated avatars.
    pub s3_bucket: Option<String>,
    /// Bucket region.
    pub s3_region: Option<String>,
    /// Custom endpoint for S3-compatible stores.
    pub s3_endpoint: Option<String>,
    /// Public origin serving the bucket.
    pub s3_public_base_url: Option<String>,
    /// Image CDN used for format conversion.
    pub cdn_base_url: Option<String>,
    /// Age after which an in-progress lock counts as abandoned.
    pub stale_lock_ttl_secs: Option<u64>,
    /// Sweeper period.
    pub sweep_interval_secs: Option<u64>,
}

impl AppSettings {
    /// Socket address to listen on.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] when the address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        self.bind_addr
            .as_deref()
            .unwrap_or(DEFAULT_BIND_ADDR)
            .parse()
            .map_err(|err| invalid("bind_addr", err))
    }

    /// Database URL, when persistence is configured.
    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref()
    }

    /// Connection pool size.
    pub const fn db_max_connections(&self) -> u32 {
        self.db_max_connections
    }

    /// Cost and capacity limits.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Policy`] when a cap is zero.
    pub fn generation_policy(&self) -> Result<GenerationPolicy, SettingsError> {
        GenerationPolicy::new(
            self.generation_cost.unwrap_or(DEFAULT_GENERATION_COST),
            self.max_entries.unwrap_or(DEFAULT_MAX_ENTRIES),
            self.max_in_flight.unwrap_or(DEFAULT_MAX_IN_FLIGHT),
        )
        .map_err(SettingsError::from)
    }

    /// Provider timeout.
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(
            self.provider_timeout_secs
                .unwrap_or(DEFAULT_PROVIDER_TIMEOUT_SECS),
        )
    }

    /// Object store upload timeout.
    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs.unwrap_or(DEFAULT_UPLOAD_TIMEOUT_SECS))
    }

    /// Longest a run can hold its lock: analysis, synthesis and the result
    /// fetch at the provider timeout each, plus one upload.
    pub fn pipeline_budget(&self) -> Duration {
        self.provider_timeout()
            .saturating_mul(3)
            .saturating_add(self.upload_timeout())
    }

    /// Provider adapter configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when the key is missing or the base URL is
    /// malformed.
    pub fn openai_config(&self) -> Result<OpenAiConfig, SettingsError> {
        let api_key = self
            .openai_api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or(SettingsError::Missing {
                name: "openai_api_key",
            })?;
        let base_url = parse_url(
            "openai_base_url",
            self.openai_base_url
                .as_deref()
                .unwrap_or(DEFAULT_OPENAI_BASE_URL),
        )?;
        Ok(OpenAiConfig {
            base_url,
            api_key: Zeroizing::new(api_key),
            analysis_model: self
                .analysis_model
                .clone()
                .unwrap_or_else(|| DEFAULT_ANALYSIS_MODEL.to_owned()),
            image_model: self
                .image_model
                .clone()
                .unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_owned()),
            timeout: self.provider_timeout(),
        })
    }

    /// Object store configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when the bucket is missing or a URL is
    /// malformed.
    pub fn s3_config(&self) -> Result<S3StoreConfig, SettingsError> {
        let bucket = self
            .s3_bucket
            .clone()
            .filter(|bucket| !bucket.trim().is_empty())
            .ok_or(SettingsError::Missing { name: "s3_bucket" })?;
        Ok(S3StoreConfig {
            bucket,
            region: self.s3_region.clone(),
            endpoint: parse_optional_url("s3_endpoint", self.s3_endpoint.as_deref())?,
            public_base_url: parse_optional_url(
                "s3_public_base_url",
                self.s3_public_base_url.as_deref(),
            )?,
            upload_timeout: self.upload_timeout(),
        })
    }

    /// Image CDN base, when configured.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] when the URL is malformed.
    pub fn cdn_base_url(&self) -> Result<Option<Url>, SettingsError> {
        parse_optional_url("cdn_base_url", self.cdn_base_url.as_deref())
    }

    /// Lock age treated as abandoned.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] unless the TTL exceeds
    /// [`Self::pipeline_budget`].
    pub fn stale_lock_ttl(&self) -> Result<Duration, SettingsError> {
        let ttl =
            Duration::from_secs(self.stale_lock_ttl_secs.unwrap_or(DEFAULT_STALE_LOCK_TTL_SECS));
        let budget = self.pipeline_budget();
        if ttl <= budget {
            return Err(invalid(
                "stale_lock_ttl_secs",
                format!(
                    "{}s does not exceed the {}s a pipeline run may take",
                    ttl.as_secs(),
                    budget.as_secs()
                ),
            ));
        }
        Ok(ttl)
    }

    /// Sweeper period.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS))
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for settings parsing and defaults.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 19] = [
        "AVATAR_BIND_ADDR",
        "AVATAR_DATABASE_URL",
        "AVATAR_DB_MAX_CONNECTIONS",
        "AVATAR_GENERATION_COST",
        "AVATAR_MAX_ENTRIES",
        "AVATAR_MAX_IN_FLIGHT",
        "AVATAR_OPENAI_API_KEY",
        "AVATAR_OPENAI_BASE_URL",
        "AVATAR_ANALYSIS_MODEL",
        "AVATAR_IMAGE_MODEL",
        "AVATAR_PROVIDER_TIMEOUT_SECS",
        "AVATAR_UPLOAD_TIMEOUT_SECS",
        "AVATAR_S3_BUCKET",
        "AVATAR_S3_REGION",
        "AVATAR_S3_ENDPOINT",
        "AVATAR_S3_PUBLIC_BASE_URL",
        "AVATAR_CDN_BASE_URL",
        "AVATAR_STALE_LOCK_TTL_SECS",
        "AVATAR_SWEEP_INTERVAL_SECS",
    ];

    fn cleared_with(overrides: &[(&str, &str)]) -> Vec<(&'static str, Option<String>)> {
        VARS.iter()
            .map(|name| {
                let value = overrides
                    .iter()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| (*value).to_owned());
                (*name, value)
            })
            .collect()
    }

    fn load_from_empty_args() -> AppSettings {
        AppSettings::load_from_iter([OsString::from("avatar-backend")])
            .expect("config should load")
    }

    #[rstest]
    fn defaults_apply_when_unset() {
        let _guard = lock_env(cleared_with(&[]));

        let settings = load_from_empty_args();

        assert_eq!(
            settings.bind_addr(),
            Ok("0.0.0.0:8080".parse().expect("valid address"))
        );
        assert!(settings.database_url().is_none());
        assert_eq!(settings.db_max_connections(), 10);
        assert_eq!(
            settings.generation_policy(),
            Ok(GenerationPolicy::new(5, 3, 1).expect("valid policy"))
        );
        assert_eq!(settings.provider_timeout(), Duration::from_secs(120));
        assert_eq!(settings.upload_timeout(), Duration::from_secs(60));
        assert_eq!(settings.pipeline_budget(), Duration::from_secs(420));
        assert_eq!(settings.stale_lock_ttl(), Ok(Duration::from_secs(900)));
        assert_eq!(settings.sweep_interval(), Duration::from_secs(60));
        assert_eq!(settings.cdn_base_url(), Ok(None));
    }

    #[rstest]
    fn provider_key_and_bucket_are_required() {
        let _guard = lock_env(cleared_with(&[]));

        let settings = load_from_empty_args();

        assert!(matches!(
            settings.openai_config(),
            Err(SettingsError::Missing {
                name: "openai_api_key"
            })
        ));
        assert_eq!(
            settings.s3_config().map(|config| config.bucket),
            Err(SettingsError::Missing { name: "s3_bucket" })
        );
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env(cleared_with(&[
            ("AVATAR_BIND_ADDR", "127.0.0.1:9000"),
            ("AVATAR_GENERATION_COST", "2"),
            ("AVATAR_MAX_ENTRIES", "5"),
            ("AVATAR_OPENAI_API_KEY", "sk-test"),
            ("AVATAR_OPENAI_BASE_URL", "http://localhost:4010/v1"),
            ("AVATAR_IMAGE_MODEL", "gpt-image-1"),
            ("AVATAR_S3_BUCKET", "avatars"),
            ("AVATAR_S3_ENDPOINT", "http://localhost:9000"),
            ("AVATAR_CDN_BASE_URL", "https://cdn.test"),
        ]));

        let settings = load_from_empty_args();

        assert_eq!(
            settings.bind_addr(),
            Ok("127.0.0.1:9000".parse().expect("valid address"))
        );
        let policy = settings.generation_policy().expect("policy");
        assert_eq!(policy.cost(), 2);
        assert_eq!(policy.max_entries(), 5);
        let openai = settings.openai_config().expect("openai config");
        assert_eq!(openai.base_url.as_str(), "http://localhost:4010/v1");
        assert_eq!(openai.image_model, "gpt-image-1");
        assert_eq!(openai.analysis_model, "gpt-4o-mini");
        let s3 = settings.s3_config().expect("s3 config");
        assert_eq!(s3.bucket, "avatars");
        assert_eq!(
            s3.endpoint.map(String::from).as_deref(),
            Some("http://localhost:9000/")
        );
        assert_eq!(
            settings.cdn_base_url().map(|url| url.map(String::from)),
            Ok(Some("https://cdn.test/".to_owned()))
        );
    }

    #[rstest]
    #[case("AVATAR_MAX_ENTRIES", "0")]
    #[case("AVATAR_MAX_IN_FLIGHT", "0")]
    fn zero_caps_are_rejected(#[case] name: &str, #[case] value: &str) {
        let _guard = lock_env(cleared_with(&[(name, value)]));

        let settings = load_from_empty_args();

        assert!(matches!(
            settings.generation_policy(),
            Err(SettingsError::Policy(_))
        ));
    }

    #[rstest]
    #[case::equal_to_budget(&[("AVATAR_STALE_LOCK_TTL_SECS", "420")])]
    #[case::slow_provider(&[("AVATAR_PROVIDER_TIMEOUT_SECS", "300")])]
    #[case::slow_upload(&[
        ("AVATAR_STALE_LOCK_TTL_SECS", "600"),
        ("AVATAR_UPLOAD_TIMEOUT_SECS", "240"),
    ])]
    fn lock_ttl_must_outlast_a_pipeline_run(#[case] overrides: &[(&str, &str)]) {
        let _guard = lock_env(cleared_with(overrides));

        let settings = load_from_empty_args();

        assert!(matches!(
            settings.stale_lock_ttl(),
            Err(SettingsError::Invalid {
                name: "stale_lock_ttl_secs",
                ..
            })
        ));
    }

    #[rstest]
    fn lock_ttl_above_budget_is_accepted() {
        let _guard = lock_env(cleared_with(&[
            ("AVATAR_PROVIDER_TIMEOUT_SECS", "30"),
            ("AVATAR_UPLOAD_TIMEOUT_SECS", "10"),
            ("AVATAR_STALE_LOCK_TTL_SECS", "101"),
        ]));

        let settings = load_from_empty_args();

        assert_eq!(settings.pipeline_budget(), Duration::from_secs(100));
        assert_eq!(settings.stale_lock_ttl(), Ok(Duration::from_secs(101)));
    }

    #[rstest]
    fn malformed_urls_name_the_setting() {
        let _guard = lock_env(cleared_with(&[("AVATAR_CDN_BASE_URL", "not a url")]));

        let settings = load_from_empty_args();

        assert!(matches!(
            settings.cdn_base_url(),
            Err(SettingsError::Invalid {
                name: "cdn_base_url",
                ..
            })
        ));
    }
}
