//! Session configuration: signing secret and token lifetimes.

// std
use std::env;
// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

/// Environment variable holding the HMAC signing secret.
pub const ENV_SIGNING_SECRET: &str = "JWT_SECRET";
/// Environment variable overriding the access-token lifetime in seconds.
pub const ENV_ACCESS_TTL: &str = "ACCESS_TOKEN_TTL_SECS";
/// Environment variable overriding the refresh-token lifetime in seconds.
pub const ENV_REFRESH_TTL: &str = "REFRESH_TOKEN_TTL_SECS";

const DEFAULT_ACCESS_TTL_SECS: i64 = 12 * 60 * 60;
const DEFAULT_REFRESH_TTL_SECS: i64 = 43_200 * 60;

/// Signing secret and token lifetimes used by the codec and session manager.
///
/// Lifetimes default to 12 hours for access tokens and 30 days for refresh tokens.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
	/// HMAC-SHA256 signing secret. Absent or empty secrets fail validation.
	#[serde(default)]
	pub signing_secret: Option<TokenSecret>,
	/// Access-token lifetime in seconds.
	#[serde(default = "default_access_ttl_secs")]
	pub access_ttl_secs: i64,
	/// Refresh-token lifetime in seconds.
	#[serde(default = "default_refresh_ttl_secs")]
	pub refresh_ttl_secs: i64,
}
impl SessionConfig {
	/// Creates a configuration with the provided secret and default lifetimes.
	pub fn new(signing_secret: impl Into<String>) -> Self {
		Self { signing_secret: Some(TokenSecret::new(signing_secret)), ..Default::default() }
	}

	/// Overrides the access-token lifetime.
	pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
		self.access_ttl_secs = ttl.whole_seconds();

		self
	}

	/// Overrides the refresh-token lifetime.
	pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
		self.refresh_ttl_secs = ttl.whole_seconds();

		self
	}

	/// Access-token lifetime.
	pub fn access_ttl(&self) -> Duration {
		Duration::seconds(self.access_ttl_secs)
	}

	/// Refresh-token lifetime.
	pub fn refresh_ttl(&self) -> Duration {
		Duration::seconds(self.refresh_ttl_secs)
	}

	/// Loads the configuration from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_env_with(|name| env::var(name).ok())
	}

	/// Loads the configuration through a caller-provided variable lookup.
	pub fn from_env_with<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let mut config = Self {
			signing_secret: lookup(ENV_SIGNING_SECRET).map(TokenSecret::new),
			..Default::default()
		};

		if let Some(value) = lookup(ENV_ACCESS_TTL) {
			config.access_ttl_secs = parse_secs(ENV_ACCESS_TTL, value)?;
		}
		if let Some(value) = lookup(ENV_REFRESH_TTL) {
			config.refresh_ttl_secs = parse_secs(ENV_REFRESH_TTL, value)?;
		}

		config.validate()?;

		Ok(config)
	}

	/// Parses a JSON document, reporting the failing field path on error.
	pub fn from_json(document: &str) -> Result<Self, ConfigError> {
		let deserializer = &mut serde_json::Deserializer::from_str(document);
		let config: Self = serde_path_to_error::deserialize(deserializer)
			.map_err(|source| ConfigError::InvalidDocument { source })?;

		config.validate()?;

		Ok(config)
	}

	/// Checks the secret is present and both lifetimes are positive.
	pub fn validate(&self) -> Result<(), ConfigError> {
		self.signing_secret()?;

		if self.access_ttl_secs <= 0 {
			return Err(ConfigError::NonPositiveTtl { name: "access token TTL" });
		}
		if self.refresh_ttl_secs <= 0 {
			return Err(ConfigError::NonPositiveTtl { name: "refresh token TTL" });
		}

		Ok(())
	}

	pub(crate) fn signing_secret(&self) -> Result<&TokenSecret, ConfigError> {
		self.signing_secret
			.as_ref()
			.filter(|secret| !secret.is_empty())
			.ok_or(ConfigError::MissingSigningSecret)
	}
}
impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			signing_secret: None,
			access_ttl_secs: DEFAULT_ACCESS_TTL_SECS,
			refresh_ttl_secs: DEFAULT_REFRESH_TTL_SECS,
		}
	}
}

fn default_access_ttl_secs() -> i64 {
	DEFAULT_ACCESS_TTL_SECS
}

fn default_refresh_ttl_secs() -> i64 {
	DEFAULT_REFRESH_TTL_SECS
}

fn parse_secs(name: &'static str, value: String) -> Result<i64, ConfigError> {
	value.trim().parse().map_err(|_| ConfigError::InvalidEnv { name, value })
}
