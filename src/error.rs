//! Crate-level error types shared across the codec, ledger, session manager, and limiter.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical error exposed by public APIs.
///
/// [`Error::InvalidToken`] and [`Error::Unauthorized`] are deliberately indistinguishable to
/// callers: both map to the same status and public message, and neither carries the reason a
/// token was rejected.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem; fatal at startup.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Storage-layer failure (ledger or user store); safe to retry.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),

	/// Token is malformed, badly signed, expired, or of the wrong kind.
	#[error("Token is invalid.")]
	InvalidToken,
	/// Token verified but the ledger no longer considers it valid.
	#[error("Token is not authorized.")]
	Unauthorized,
	/// Identifier or password did not match a known user.
	#[error("Invalid credentials.")]
	InvalidCredentials,
	/// The password was changed but outstanding sessions could not be revoked.
	#[error("Password changed, but existing sessions could not be revoked.")]
	SessionsNotRevoked {
		/// Ledger failure raised by the bulk revocation.
		#[source]
		source: crate::store::StoreError,
	},
	/// Admission rejected by the rate limiter.
	#[error("Too many requests.")]
	RateLimited,
}
impl Error {
	/// Returns the HTTP-equivalent status code for this error.
	pub const fn status_code(&self) -> u16 {
		match self {
			Self::InvalidToken | Self::Unauthorized | Self::InvalidCredentials => 401,
			Self::RateLimited => 429,
			Self::Config(_) | Self::Storage(_) | Self::SessionsNotRevoked { .. } => 500,
		}
	}

	/// Returns a message that is safe to show to the remote caller.
	pub const fn public_message(&self) -> &'static str {
		match self {
			Self::InvalidToken | Self::Unauthorized => "unauthorized",
			Self::InvalidCredentials => "invalid credentials",
			Self::RateLimited => "too many requests",
			Self::SessionsNotRevoked { .. } =>
				"password changed, but existing sessions may still be active",
			Self::Config(_) | Self::Storage(_) => "internal server error",
		}
	}

	/// Returns `true` when the caller is being refused on identity grounds.
	pub const fn is_unauthorized(&self) -> bool {
		self.status_code() == 401
	}

	/// Returns `true` when the same request may succeed if retried later.
	pub const fn is_retryable(&self) -> bool {
		matches!(self, Self::Storage(_))
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// No signing secret was configured, or it is empty.
	#[error("JWT_SECRET is not configured.")]
	MissingSigningSecret,
	/// A token lifetime is zero or negative.
	#[error("The {name} must be positive.")]
	NonPositiveTtl {
		/// Name of the offending setting.
		name: &'static str,
	},
	/// An admission window is not positive or is longer than the supported maximum.
	#[error("Admission window of {window_secs} seconds is outside 1..={max_secs}.")]
	InvalidAdmissionWindow {
		/// Configured window length in seconds.
		window_secs: i64,
		/// Longest supported window in seconds.
		max_secs: i64,
	},
	/// An environment variable holds a value that cannot be parsed.
	#[error("Environment variable {name} has an invalid value: {value}.")]
	InvalidEnv {
		/// Variable name.
		name: &'static str,
		/// Raw value that failed to parse.
		value: String,
	},
	/// A JSON configuration document could not be parsed.
	#[error("Configuration document is invalid.")]
	InvalidDocument {
		/// Structured parsing failure including the offending field path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Claims could not be signed with the configured key.
	#[error("Token could not be signed.")]
	TokenEncoding {
		/// Underlying signer failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
	/// A freshly minted token failed its own verification (codec/TTL drift).
	#[error("Freshly minted {kind} token did not verify.")]
	TokenSelfCheck {
		/// Kind of the token that failed.
		kind: crate::auth::TokenKind,
	},
}
