//! Signed, self-describing session tokens (HS256 JWTs).
//!
//! The codec is a pure, kind-agnostic primitive: [`TokenCodec::verify`] checks the signature,
//! algorithm, structure, and expiry, and callers assert the expected [`TokenKind`] afterwards via
//! [`TokenClaims::expect_kind`].

// crates.io
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{
	_prelude::*,
	auth::{SubjectId, TokenClaims, TokenKind, TokenSecret},
	config::SessionConfig,
	error::ConfigError,
	obs,
};

const TOKEN_ID_LEN: usize = 22;

/// Claim set as it appears on the wire.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct WireClaims {
	sub: String,
	token_type: TokenKind,
	iat: i64,
	exp: i64,
	jti: String,
}

/// Issues and verifies HS256-signed session tokens with a single shared secret.
#[derive(Clone)]
pub struct TokenCodec {
	encoding_key: EncodingKey,
	decoding_key: DecodingKey,
	validation: Validation,
}
impl TokenCodec {
	/// Builds a codec for `secret`; an empty secret is a [`ConfigError::MissingSigningSecret`].
	pub fn new(secret: &TokenSecret) -> Result<Self, ConfigError> {
		if secret.is_empty() {
			return Err(ConfigError::MissingSigningSecret);
		}

		let bytes = secret.expose().as_bytes();
		let mut validation = Validation::new(Algorithm::HS256);

		// Expiry is checked against the caller's clock in `verify_at`, without leeway.
		validation.validate_exp = false;
		validation.leeway = 0;
		validation.set_required_spec_claims(&["exp", "sub"]);

		Ok(Self {
			encoding_key: EncodingKey::from_secret(bytes),
			decoding_key: DecodingKey::from_secret(bytes),
			validation,
		})
	}

	/// Validates `config` and builds a codec from its signing secret.
	pub fn from_config(config: &SessionConfig) -> Result<Self, ConfigError> {
		config.validate()?;

		Self::new(config.signing_secret()?)
	}

	/// Issues a token for `subject` that expires `ttl` from now.
	pub fn issue(&self, subject: &SubjectId, kind: TokenKind, ttl: Duration) -> Result<TokenSecret> {
		self.issue_at(subject, kind, ttl, OffsetDateTime::now_utc())
	}

	/// Issues a token as if the current instant were `now`.
	///
	/// Timestamps are truncated to whole seconds. Every token carries a random `jti`, so two
	/// tokens minted for the same subject and kind within one second still differ.
	pub fn issue_at(
		&self,
		subject: &SubjectId,
		kind: TokenKind,
		ttl: Duration,
		now: OffsetDateTime,
	) -> Result<TokenSecret> {
		if !ttl.is_positive() {
			return Err(ConfigError::NonPositiveTtl { name: "token TTL" }.into());
		}

		let iat = now.unix_timestamp();
		let claims = WireClaims {
			sub: subject.to_string(),
			token_type: kind,
			iat,
			exp: iat.saturating_add(ttl.whole_seconds().max(1)),
			jti: random_token_id(),
		};
		let token =
			jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
				.map_err(|source| ConfigError::TokenEncoding { source })?;

		Ok(TokenSecret::new(token))
	}

	/// Verifies `token` against the current clock.
	pub fn verify(&self, token: &str) -> Result<TokenClaims> {
		self.verify_at(token, OffsetDateTime::now_utc())
	}

	/// Verifies `token` as if the current instant were `now`.
	///
	/// Any failure (bad signature, unexpected algorithm, malformed structure or claims, expiry)
	/// yields [`Error::InvalidToken`]; the specific reason is only logged.
	pub fn verify_at(&self, token: &str, now: OffsetDateTime) -> Result<TokenClaims> {
		let data = jsonwebtoken::decode::<WireClaims>(token, &self.decoding_key, &self.validation)
			.map_err(|_| reject("signature, algorithm, or structure check failed"))?;
		let wire = data.claims;
		let claims = TokenClaims {
			subject: SubjectId::new(&wire.sub).map_err(|_| reject("subject is not a valid id"))?,
			kind: wire.token_type,
			issued_at: OffsetDateTime::from_unix_timestamp(wire.iat)
				.map_err(|_| reject("issued-at is out of range"))?,
			expires_at: OffsetDateTime::from_unix_timestamp(wire.exp)
				.map_err(|_| reject("expiry is out of range"))?,
			token_id: wire.jti,
		};

		if claims.is_expired_at(now) {
			return Err(reject("token expired"));
		}

		Ok(claims)
	}
}
impl Debug for TokenCodec {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCodec").field("algorithm", &Algorithm::HS256).finish_non_exhaustive()
	}
}

fn reject(reason: &'static str) -> Error {
	obs::log_rejection(reason);

	Error::InvalidToken
}

fn random_token_id() -> String {
	rand::rng().sample_iter(Alphanumeric).take(TOKEN_ID_LEN).map(char::from).collect()
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	const NOW: OffsetDateTime = macros::datetime!(2025-06-01 12:00 UTC);

	fn codec() -> TokenCodec {
		TokenCodec::new(&TokenSecret::new("test-secret")).expect("Codec fixture should build.")
	}

	fn subject() -> SubjectId {
		SubjectId::new("123").expect("Subject fixture should be valid.")
	}

	#[test]
	fn issued_tokens_verify_with_same_subject_and_kind() {
		let codec = codec();

		for kind in [TokenKind::Access, TokenKind::Refresh] {
			let token = codec
				.issue_at(&subject(), kind, Duration::hours(12), NOW)
				.expect("Issuing should succeed.");
			let claims = codec.verify_at(token.expose(), NOW).expect("Fresh token should verify.");

			assert_eq!(claims.subject, subject());
			assert_eq!(claims.kind, kind);
			assert_eq!(claims.issued_at, NOW);
			assert_eq!(claims.expires_at, NOW + Duration::hours(12));
		}
	}

	#[test]
	fn expiry_boundary_is_consistent() {
		let codec = codec();
		let token = codec
			.issue_at(&subject(), TokenKind::Access, Duration::minutes(5), NOW)
			.expect("Issuing should succeed.");
		let expires_at = NOW + Duration::minutes(5);

		assert!(codec.verify_at(token.expose(), expires_at - Duration::seconds(1)).is_ok());
		assert!(matches!(codec.verify_at(token.expose(), expires_at), Err(Error::InvalidToken)));
		assert!(matches!(
			codec.verify_at(token.expose(), expires_at + Duration::days(1)),
			Err(Error::InvalidToken)
		));
	}

	#[test]
	fn verify_uses_the_real_clock() {
		let codec = codec();
		let stale = codec
			.issue_at(&subject(), TokenKind::Access, Duration::hours(1), NOW - Duration::days(365))
			.expect("Issuing should succeed.");
		let fresh = codec
			.issue(&subject(), TokenKind::Access, Duration::hours(1))
			.expect("Issuing should succeed.");

		assert!(codec.verify(stale.expose()).is_err());
		assert!(codec.verify(fresh.expose()).is_ok());
	}

	#[test]
	fn codec_is_kind_agnostic() {
		let codec = codec();
		let refresh = codec
			.issue_at(&subject(), TokenKind::Refresh, Duration::days(30), NOW)
			.expect("Issuing should succeed.");
		let claims = codec.verify_at(refresh.expose(), NOW).expect("Refresh token should verify.");

		assert!(matches!(claims.clone().expect_kind(TokenKind::Access), Err(Error::InvalidToken)));
		assert!(claims.expect_kind(TokenKind::Refresh).is_ok());
	}

	#[test]
	fn same_second_tokens_differ() {
		let codec = codec();
		let a = codec
			.issue_at(&subject(), TokenKind::Refresh, Duration::days(30), NOW)
			.expect("Issuing should succeed.");
		let b = codec
			.issue_at(&subject(), TokenKind::Refresh, Duration::days(30), NOW)
			.expect("Issuing should succeed.");

		assert_ne!(a, b);
	}

	#[test]
	fn foreign_secret_and_tampering_are_rejected() {
		let other = TokenCodec::new(&TokenSecret::new("other-secret"))
			.expect("Second codec fixture should build.");
		let token = other
			.issue_at(&subject(), TokenKind::Access, Duration::hours(1), NOW)
			.expect("Issuing should succeed.");

		assert!(matches!(codec().verify_at(token.expose(), NOW), Err(Error::InvalidToken)));

		let own = codec()
			.issue_at(&subject(), TokenKind::Access, Duration::hours(1), NOW)
			.expect("Issuing should succeed.");
		let mut tampered = own.expose().to_owned();

		tampered.push('x');

		assert!(matches!(codec().verify_at(&tampered, NOW), Err(Error::InvalidToken)));
		assert!(matches!(codec().verify_at("not-a-token", NOW), Err(Error::InvalidToken)));
		assert!(matches!(codec().verify_at("", NOW), Err(Error::InvalidToken)));
	}

	#[test]
	fn other_algorithms_are_rejected() {
		let claims = WireClaims {
			sub: "123".into(),
			token_type: TokenKind::Access,
			iat: NOW.unix_timestamp(),
			exp: (NOW + Duration::hours(1)).unix_timestamp(),
			jti: "jti".into(),
		};
		let hs512 = jsonwebtoken::encode(
			&Header::new(Algorithm::HS512),
			&claims,
			&EncodingKey::from_secret(b"test-secret"),
		)
		.expect("HS512 fixture should encode.");

		assert!(matches!(codec().verify_at(&hs512, NOW), Err(Error::InvalidToken)));
	}

	#[test]
	fn missing_secret_and_bad_ttl_are_config_errors() {
		assert!(matches!(
			TokenCodec::new(&TokenSecret::new("")),
			Err(ConfigError::MissingSigningSecret)
		));
		assert!(matches!(
			TokenCodec::from_config(&SessionConfig::default()),
			Err(ConfigError::MissingSigningSecret)
		));
		assert!(matches!(
			codec().issue_at(&subject(), TokenKind::Access, Duration::ZERO, NOW),
			Err(Error::Config(ConfigError::NonPositiveTtl { .. }))
		));
	}
}
