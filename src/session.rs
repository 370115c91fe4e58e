//! Session orchestration: pair issuance, refresh rotation, logout, bulk revocation, and access
//! identity extraction.
//!
//! [`SessionManager`] combines the pure [`TokenCodec`] with a [`RevocationLedger`] and a
//! [`UserStore`]. Every ledger call is attempted at most once per operation; retry policy belongs
//! to the caller. Refresh tokens move through `issued -> valid -> {rotated | revoked | expired}`
//! and never return to valid.

mod metrics;

pub use metrics::SessionMetrics;

// self
use crate::{
	_prelude::*,
	auth::{RevocationRecord, SubjectId, TokenClaims, TokenKind, TokenPair, TokenSecret},
	codec::TokenCodec,
	config::SessionConfig,
	error::ConfigError,
	obs::{self, OpOutcome, SessionOp},
	store::{RevocationLedger, RevokeOutcome, StoreError},
	user::{UserRecord, UserStore},
};

type RotationGuards = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// Issues, rotates, and revokes session tokens.
///
/// The manager depends only on the ledger and user-store capabilities, so the same protocols run
/// against [`MemoryLedger`](crate::store::MemoryLedger), [`FileLedger`](crate::store::FileLedger),
/// or any external backend. Revocation state is never cached in-process.
#[derive(Clone)]
pub struct SessionManager {
	/// Ledger of issued refresh tokens.
	pub ledger: Arc<dyn RevocationLedger>,
	/// User-store collaborator used by login and change-password.
	pub users: Arc<dyn UserStore>,
	/// Token codec shared by all operations.
	pub codec: TokenCodec,
	/// Lifetime of minted access tokens.
	pub access_ttl: Duration,
	/// Lifetime of minted refresh tokens.
	pub refresh_ttl: Duration,
	/// Shared counters for session outcomes.
	pub metrics: Arc<SessionMetrics>,
	rotation_guards: RotationGuards,
}
impl SessionManager {
	/// Creates a manager; fails at startup when the configuration is unusable.
	pub fn new(
		config: &SessionConfig,
		ledger: Arc<dyn RevocationLedger>,
		users: Arc<dyn UserStore>,
	) -> Result<Self, ConfigError> {
		Ok(Self {
			ledger,
			users,
			codec: TokenCodec::from_config(config)?,
			access_ttl: config.access_ttl(),
			refresh_ttl: config.refresh_ttl(),
			metrics: Default::default(),
			rotation_guards: Default::default(),
		})
	}

	/// Mints and records a pair for a subject that was just registered.
	///
	/// If the refresh record cannot be persisted no pair is returned, since an unrecorded refresh
	/// token could never be revoked.
	pub async fn issue_on_register(&self, subject: &SubjectId) -> Result<TokenPair> {
		self.observe(SessionOp::Register, "issue_on_register", self.issue(subject)).await
	}

	/// Authenticates `identifier` (email first, then username) and mints a recorded pair.
	///
	/// `verify_password` receives the stored user and decides whether the presented password
	/// matches its hash. Unknown identifiers and mismatches both yield
	/// [`Error::InvalidCredentials`].
	pub async fn issue_on_login<F>(
		&self,
		identifier: &str,
		verify_password: F,
	) -> Result<(UserRecord, TokenPair)>
	where
		F: Send + FnOnce(&UserRecord) -> bool,
	{
		self.observe(SessionOp::Login, "issue_on_login", async move {
			let Some(user) = self.users.find_by_identifier(identifier).await? else {
				obs::log_rejection("unknown login identifier");

				return Err(Error::InvalidCredentials);
			};

			if !verify_password(&user) {
				obs::log_rejection("password mismatch");

				return Err(Error::InvalidCredentials);
			}

			let pair = self.issue(&user.subject).await?;

			Ok((user, pair))
		})
		.await
	}

	/// Rotates a refresh token into a new recorded pair and revokes the presented token.
	///
	/// Rejections: [`Error::InvalidToken`] when the token fails verification or is not a refresh
	/// token, [`Error::Unauthorized`] when the ledger no longer considers it valid. If the old
	/// token was revoked but the new one could not be recorded the call fails and the old token
	/// stays gone; the subject has to authenticate again.
	pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
		self.observe(SessionOp::Refresh, "refresh", async move {
			let claims = self.verify_kind(refresh_token, TokenKind::Refresh)?;
			let presented = TokenSecret::new(refresh_token);
			let slot = RotationSlot::acquire(&self.rotation_guards, &presented);
			let _singleflight = slot.lock.lock().await;

			self.rotate(&presented, claims.subject).await
		})
		.await
	}

	/// Revokes the presented refresh token.
	///
	/// Always reports success: unknown and already-revoked tokens are ignored, and a ledger
	/// failure is only logged.
	pub async fn logout(&self, refresh_token: &str) -> Result<()> {
		self.observe(SessionOp::Logout, "logout", async move {
			match self.ledger.revoke(&TokenSecret::new(refresh_token)).await {
				Ok(true) => self.metrics.record_revoked(1),
				Ok(false) => (),
				Err(e) => obs::log_partial_failure(
					SessionOp::Logout,
					"refresh token may still be valid after logout",
					&e,
				),
			}

			Ok(())
		})
		.await
	}

	/// Changes the password of `subject` and then revokes every outstanding refresh token.
	///
	/// `verify_current` checks the presented current password against the stored user. The bulk
	/// revocation only runs after the password write committed; if it fails the call returns
	/// [`Error::SessionsNotRevoked`] even though the password did change.
	pub async fn change_password<F>(
		&self,
		subject: &SubjectId,
		verify_current: F,
		new_password_hash: &str,
	) -> Result<()>
	where
		F: Send + FnOnce(&UserRecord) -> bool,
	{
		self.observe(SessionOp::ChangePassword, "change_password", async move {
			let Some(user) = self.users.find_by_subject(subject).await? else {
				obs::log_rejection("subject no longer exists");

				return Err(Error::Unauthorized);
			};

			if !verify_current(&user) {
				obs::log_rejection("current password mismatch");

				return Err(Error::InvalidCredentials);
			}

			self.users.update_password_hash(subject, new_password_hash).await?;
			self.revoke_all(subject).await?;

			Ok(())
		})
		.await
	}

	/// Revokes every outstanding refresh token of `subject`, returning how many flipped.
	///
	/// For callers that commit the password write themselves; must run after that write.
	pub async fn revoke_all_sessions(&self, subject: &SubjectId) -> Result<usize> {
		self.observe(SessionOp::ChangePassword, "revoke_all_sessions", self.revoke_all(subject))
			.await
	}

	/// Verifies an access token and returns only its subject.
	pub fn authenticate(&self, access_token: &str) -> Result<SubjectId> {
		const OP: SessionOp = SessionOp::Authenticate;

		obs::in_op_span(OP, "authenticate", || {
			obs::record_op_outcome(OP, OpOutcome::Attempt);

			let result =
				self.verify_kind(access_token, TokenKind::Access).map(|claims| claims.subject);

			self.finish(OP, &result);

			result
		})
	}

	/// Extracts the bearer token from an `Authorization` header value and authenticates it.
	pub fn authenticate_header(&self, authorization: Option<&str>) -> Result<SubjectId> {
		match authorization.and_then(bearer_token) {
			Some(token) => self.authenticate(token),
			None => {
				obs::log_rejection("missing bearer token");
				self.metrics.record_rejected();

				Err(Error::InvalidToken)
			},
		}
	}

	async fn issue(&self, subject: &SubjectId) -> Result<TokenPair> {
		let pair = self.mint(subject)?;

		self.record_refresh(&pair).await?;
		self.metrics.record_issued();

		Ok(pair)
	}

	async fn rotate(&self, presented: &TokenSecret, subject: SubjectId) -> Result<TokenPair> {
		if !self.ledger.is_valid(presented).await? {
			obs::log_rejection("refresh token is revoked, expired, or unknown");

			return Err(Error::Unauthorized);
		}

		let pair = self.mint(&subject)?;

		// A concurrent rotation may have revoked the token since the check above.
		if self.ledger.revoke_if_valid(presented).await? == RevokeOutcome::NotValid {
			obs::log_rejection("refresh token was rotated concurrently");

			return Err(Error::Unauthorized);
		}

		self.record_refresh(&pair).await.map_err(|e| {
			obs::log_partial_failure(
				SessionOp::Refresh,
				"old refresh token revoked but replacement not recorded",
				&e,
			);

			Error::from(e)
		})?;
		self.metrics.record_rotated();

		Ok(pair)
	}

	async fn revoke_all(&self, subject: &SubjectId) -> Result<usize> {
		match self.ledger.revoke_all(subject).await {
			Ok(count) => {
				self.metrics.record_revoked(count as u64);

				Ok(count)
			},
			Err(source) => {
				obs::log_partial_failure(
					SessionOp::ChangePassword,
					"password changed but sessions not revoked",
					&source,
				);

				Err(Error::SessionsNotRevoked { source })
			},
		}
	}

	fn mint(&self, subject: &SubjectId) -> Result<TokenPair> {
		let access_token = self.codec.issue(subject, TokenKind::Access, self.access_ttl)?;
		let refresh_token = self.codec.issue(subject, TokenKind::Refresh, self.refresh_ttl)?;
		// Expiries come from the minted tokens themselves, not from the configured TTLs.
		let access_claims = self.self_check(&access_token, TokenKind::Access)?;
		let refresh_claims = self.self_check(&refresh_token, TokenKind::Refresh)?;

		Ok(TokenPair {
			subject: subject.clone(),
			access_token,
			refresh_token,
			access_expires_at: access_claims.expires_at,
			refresh_expires_at: refresh_claims.expires_at,
		})
	}

	fn self_check(&self, token: &TokenSecret, kind: TokenKind) -> Result<TokenClaims> {
		self.codec
			.verify(token.expose())
			.and_then(|claims| claims.expect_kind(kind))
			.map_err(|_| ConfigError::TokenSelfCheck { kind }.into())
	}

	async fn record_refresh(&self, pair: &TokenPair) -> Result<(), StoreError> {
		let record = RevocationRecord::new(
			pair.subject.clone(),
			&pair.refresh_token,
			pair.refresh_expires_at,
		);

		self.ledger.record(record).await
	}

	fn verify_kind(&self, token: &str, kind: TokenKind) -> Result<TokenClaims> {
		self.codec
			.verify(token)?
			.expect_kind(kind)
			.inspect_err(|_| obs::log_rejection("token kind mismatch"))
	}

	async fn observe<T, Fut>(&self, op: SessionOp, stage: &'static str, fut: Fut) -> Result<T>
	where
		Fut: Future<Output = Result<T>>,
	{
		obs::record_op_outcome(op, OpOutcome::Attempt);

		let result = obs::instrument_op(op, stage, fut).await;

		self.finish(op, &result);

		result
	}

	fn finish<T>(&self, op: SessionOp, result: &Result<T>) {
		match result {
			Ok(_) => obs::record_op_outcome(op, OpOutcome::Success),
			Err(e) => {
				if e.is_unauthorized() {
					self.metrics.record_rejected();
				}

				obs::record_op_outcome(op, OpOutcome::Failure);
			},
		}
	}
}
impl Debug for SessionManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionManager")
			.field("codec", &self.codec)
			.field("access_ttl", &self.access_ttl)
			.field("refresh_ttl", &self.refresh_ttl)
			.finish_non_exhaustive()
	}
}

/// Per-token singleflight slot; dropping it releases the map entry once nobody else holds it.
struct RotationSlot<'a> {
	guards: &'a RotationGuards,
	key: String,
	lock: Arc<AsyncMutex<()>>,
}
impl<'a> RotationSlot<'a> {
	fn acquire(guards: &'a RotationGuards, token: &TokenSecret) -> Self {
		let key = token.fingerprint();
		let lock = guards
			.lock()
			.entry(key.clone())
			.or_insert_with(|| Arc::new(AsyncMutex::new(())))
			.clone();

		Self { guards, key, lock }
	}
}
impl Drop for RotationSlot<'_> {
	fn drop(&mut self) {
		let mut guards = self.guards.lock();

		// One handle in the map plus ours means nobody else is waiting.
		if Arc::strong_count(&self.lock) <= 2 {
			guards.remove(&self.key);
		}
	}
}

/// Returns the token from an `Authorization: Bearer <token>` header value.
///
/// The scheme is matched case-insensitively; empty tokens are rejected.
pub fn bearer_token(header: &str) -> Option<&str> {
	let (scheme, token) = header.trim().split_once(' ')?;
	let token = token.trim();

	(scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		_preludet::*,
		store::{MemoryLedger, StoreFuture},
	};

	#[test]
	fn bearer_token_parsing() {
		assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
		assert_eq!(bearer_token("bearer   abc"), Some("abc"));
		assert_eq!(bearer_token("Basic abc"), None);
		assert_eq!(bearer_token("Bearer "), None);
		assert_eq!(bearer_token("Bearer"), None);
		assert_eq!(bearer_token(""), None);
	}

	#[tokio::test]
	async fn register_records_refresh_but_not_access() {
		let (manager, ledger, _) = build_test_manager();
		let pair = manager
			.issue_on_register(&subject("alice"))
			.await
			.expect("Registration issuance should succeed.");
		let record =
			ledger.get(&pair.refresh_token).expect("Refresh token should be recorded in the ledger.");

		assert_eq!(record.subject, subject("alice"));
		assert_eq!(record.expires_at, pair.refresh_expires_at);
		assert!(ledger.get(&pair.access_token).is_none());
		assert_eq!(ledger.len(), 1);
		assert_eq!(manager.metrics.issued(), 1);
	}

	#[tokio::test]
	async fn pair_expiries_follow_configured_lifetimes() {
		let (manager, _, _) = build_test_manager();
		let before = OffsetDateTime::now_utc().replace_nanosecond(0).expect("Zero is valid.");
		let pair = manager
			.issue_on_register(&subject("alice"))
			.await
			.expect("Registration issuance should succeed.");
		let after = OffsetDateTime::now_utc();

		assert!(pair.access_expires_at >= before + Duration::hours(12));
		assert!(pair.access_expires_at <= after + Duration::hours(12));
		assert!(pair.refresh_expires_at >= before + Duration::days(30));
		assert!(pair.refresh_expires_at <= after + Duration::days(30));
	}

	#[tokio::test]
	async fn authenticate_accepts_only_access_tokens() {
		let (manager, _, _) = build_test_manager();
		let pair = manager
			.issue_on_register(&subject("999"))
			.await
			.expect("Registration issuance should succeed.");

		assert_eq!(
			manager.authenticate(pair.access_token.expose()).expect("Access token should pass."),
			subject("999")
		);
		assert!(matches!(
			manager.authenticate(pair.refresh_token.expose()),
			Err(Error::InvalidToken)
		));

		let header = format!("Bearer {}", pair.access_token.expose());

		assert_eq!(
			manager.authenticate_header(Some(&header)).expect("Bearer header should pass."),
			subject("999")
		);
		assert!(matches!(manager.authenticate_header(None), Err(Error::InvalidToken)));
		assert_eq!(manager.metrics.rejected(), 2);
	}

	#[tokio::test]
	async fn refresh_rejects_access_tokens() {
		let (manager, _, _) = build_test_manager();
		let pair = manager
			.issue_on_register(&subject("alice"))
			.await
			.expect("Registration issuance should succeed.");
		let err = manager
			.refresh(pair.access_token.expose())
			.await
			.expect_err("Access tokens must not rotate.");

		assert!(matches!(err, Error::InvalidToken));
	}

	#[tokio::test]
	async fn login_checks_identifier_and_password() {
		let (manager, _, users) = build_test_manager();

		users.insert(user("1", "alice", "alice@example.com", "correct horse"));

		let (found, pair) = manager
			.issue_on_login("alice@example.com", check_password("correct horse"))
			.await
			.expect("Login by email should succeed.");

		assert_eq!(found.subject, subject("1"));
		assert_eq!(pair.subject, subject("1"));

		manager
			.issue_on_login("alice", check_password("correct horse"))
			.await
			.expect("Login by username should succeed.");

		let wrong = manager
			.issue_on_login("alice", check_password("battery staple"))
			.await
			.expect_err("Wrong password should fail.");
		let unknown = manager
			.issue_on_login("mallory", check_password("correct horse"))
			.await
			.expect_err("Unknown identifier should fail.");

		assert!(matches!(wrong, Error::InvalidCredentials));
		assert!(matches!(unknown, Error::InvalidCredentials));
		assert_eq!(wrong.public_message(), unknown.public_message());
	}

	/// Ledger whose validity checks never complete, standing in for a hung backend.
	#[derive(Default)]
	struct StallingLedger(MemoryLedger);
	impl RevocationLedger for StallingLedger {
		fn record(&self, record: RevocationRecord) -> StoreFuture<'_, ()> {
			self.0.record(record)
		}

		fn revoke<'a>(&'a self, token: &'a TokenSecret) -> StoreFuture<'a, bool> {
			self.0.revoke(token)
		}

		fn revoke_all<'a>(&'a self, subject: &'a SubjectId) -> StoreFuture<'a, usize> {
			self.0.revoke_all(subject)
		}

		fn is_valid<'a>(&'a self, _: &'a TokenSecret) -> StoreFuture<'a, bool> {
			Box::pin(std::future::pending())
		}
	}

	#[tokio::test]
	async fn abandoned_refresh_releases_its_rotation_slot() {
		let ledger: Arc<dyn RevocationLedger> = Arc::new(StallingLedger::default());
		let users: Arc<dyn UserStore> = Arc::new(crate::user::MemoryUserStore::default());
		let manager = SessionManager::new(&test_config(), ledger, users)
			.expect("Test configuration should build a session manager.");
		let token = manager
			.codec
			.issue(&subject("alice"), TokenKind::Refresh, Duration::days(1))
			.expect("Issuing should succeed.");
		let outcome = tokio::time::timeout(
			std::time::Duration::from_millis(20),
			manager.refresh(token.expose()),
		)
		.await;

		assert!(outcome.is_err(), "Refresh should still be waiting on the ledger.");
		assert!(manager.rotation_guards.lock().is_empty());
	}

	#[tokio::test]
	async fn finished_refreshes_leave_no_rotation_slots() {
		let (manager, _, _) = build_test_manager();
		let pair = manager
			.issue_on_register(&subject("alice"))
			.await
			.expect("Registration issuance should succeed.");

		manager.refresh(pair.refresh_token.expose()).await.expect("Rotation should succeed.");
		assert!(manager.refresh(pair.refresh_token.expose()).await.is_err());
		assert!(manager.rotation_guards.lock().is_empty());
	}

	#[tokio::test]
	async fn logout_counts_only_tokens_it_revoked() {
		let (manager, _, _) = build_test_manager();
		let pair = manager
			.issue_on_register(&subject("alice"))
			.await
			.expect("Registration issuance should succeed.");

		manager.logout(pair.refresh_token.expose()).await.expect("Logout should succeed.");
		manager.logout(pair.refresh_token.expose()).await.expect("Repeated logout should succeed.");
		manager.logout("never-issued").await.expect("Unknown logout should succeed.");

		assert_eq!(manager.metrics.revoked(), 1);
	}

	#[test]
	fn construction_requires_a_secret() {
		let ledger: Arc<dyn RevocationLedger> = Arc::new(MemoryLedger::default());
		let users: Arc<dyn UserStore> = Arc::new(crate::user::MemoryUserStore::default());
		let err = SessionManager::new(&SessionConfig::default(), ledger, users)
			.expect_err("Missing secret must fail at startup.");

		assert!(matches!(err, ConfigError::MissingSigningSecret));
	}
}
