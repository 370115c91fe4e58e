//! Token lifecycle and request-admission core: signed access/refresh sessions, rotation with
//! server-side revocation, and fixed-window rate limiting in one crate.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod admission;
pub mod auth;
pub mod codec;
pub mod config;
pub mod error;
pub mod obs;
pub mod session;
pub mod store;
pub mod user;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for tests; enabled via `cfg(test)` or the `test` crate
	//! feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{SubjectId, TokenSecret},
		config::SessionConfig,
		session::SessionManager,
		store::{MemoryLedger, RevocationLedger},
		user::{MemoryUserStore, UserRecord, UserStore},
	};

	/// Signing secret shared by every test fixture.
	pub const TEST_SIGNING_SECRET: &str = "test-secret";

	/// Builds a configuration with the test secret and the default TTLs.
	pub fn test_config() -> SessionConfig {
		SessionConfig::new(TEST_SIGNING_SECRET)
	}

	/// Builds a validated subject identifier fixture.
	pub fn subject(value: &str) -> SubjectId {
		SubjectId::new(value).expect("Subject fixture should be valid.")
	}

	/// Builds a user fixture whose "hash" is the plain password prefixed with `hash:`.
	pub fn user(id: &str, username: &str, email: &str, password: &str) -> UserRecord {
		UserRecord::new(subject(id), username, email, TokenSecret::new(format!("hash:{password}")))
	}

	/// Password check matching the fixture hashing scheme used by [`user`].
	pub fn check_password(password: &str) -> impl FnOnce(&UserRecord) -> bool {
		let expected = format!("hash:{password}");

		move |record| record.password_hash.expose() == expected
	}

	/// Constructs a [`SessionManager`] backed by in-memory ledger and user store doubles.
	pub fn build_test_manager() -> (SessionManager, Arc<MemoryLedger>, Arc<MemoryUserStore>) {
		let ledger_backend = Arc::new(MemoryLedger::default());
		let users_backend = Arc::new(MemoryUserStore::default());
		let ledger: Arc<dyn RevocationLedger> = ledger_backend.clone();
		let users: Arc<dyn UserStore> = users_backend.clone();
		let manager = SessionManager::new(&test_config(), ledger, users)
			.expect("Test configuration should build a session manager.");

		(manager, ledger_backend, users_backend)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};

	pub use crate::error::{Error, Result};
}

#[cfg(test)] use color_eyre as _;
