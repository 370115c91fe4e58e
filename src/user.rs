//! User-store collaborator boundary consumed by the session manager.
//!
//! Registration, password hashing, and durable user storage live outside this crate; only the
//! lookups and the password write needed by login and change-password are modeled here.

// self
use crate::{
	_prelude::*,
	auth::{SubjectId, TokenSecret},
	store::{StoreError, StoreFuture},
};

/// User fields the session protocols need.
#[derive(Clone, Serialize, Deserialize)]
pub struct UserRecord {
	/// Stable subject identifier placed in tokens.
	pub subject: SubjectId,
	/// Unique username.
	pub username: String,
	/// Unique email address.
	pub email: String,
	/// Opaque password hash produced by the external hasher.
	pub password_hash: TokenSecret,
}
impl UserRecord {
	/// Creates a user record.
	pub fn new(
		subject: SubjectId,
		username: impl Into<String>,
		email: impl Into<String>,
		password_hash: TokenSecret,
	) -> Self {
		Self { subject, username: username.into(), email: email.into(), password_hash }
	}
}
impl Debug for UserRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("UserRecord")
			.field("subject", &self.subject)
			.field("username", &self.username)
			.field("email", &self.email)
			.field("password_hash", &"<redacted>")
			.finish()
	}
}

/// Storage contract for user lookups and password updates.
pub trait UserStore
where
	Self: Send + Sync,
{
	/// Finds a user by email first, then by username. `Ok(None)` means no such user.
	fn find_by_identifier<'a>(
		&'a self,
		identifier: &'a str,
	) -> StoreFuture<'a, Option<UserRecord>>;

	/// Finds a user by subject identifier.
	fn find_by_subject<'a>(&'a self, subject: &'a SubjectId) -> StoreFuture<'a, Option<UserRecord>>;

	/// Replaces the stored password hash. Must commit before returning `Ok`.
	fn update_password_hash<'a>(
		&'a self,
		subject: &'a SubjectId,
		password_hash: &'a str,
	) -> StoreFuture<'a, ()>;
}

/// In-process user store double for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryUserStore(Arc<RwLock<HashMap<SubjectId, UserRecord>>>);
impl MemoryUserStore {
	/// Inserts or replaces a user.
	pub fn insert(&self, record: UserRecord) {
		self.0.write().insert(record.subject.clone(), record);
	}

	/// Returns a snapshot of the user stored under `subject`.
	pub fn get(&self, subject: &SubjectId) -> Option<UserRecord> {
		self.0.read().get(subject).cloned()
	}
}
impl UserStore for MemoryUserStore {
	fn find_by_identifier<'a>(
		&'a self,
		identifier: &'a str,
	) -> StoreFuture<'a, Option<UserRecord>> {
		Box::pin(async move {
			let guard = self.0.read();
			let found = guard
				.values()
				.find(|user| user.email == identifier)
				.or_else(|| guard.values().find(|user| user.username == identifier))
				.cloned();

			Ok(found)
		})
	}

	fn find_by_subject<'a>(&'a self, subject: &'a SubjectId) -> StoreFuture<'a, Option<UserRecord>> {
		Box::pin(async move { Ok(self.get(subject)) })
	}

	fn update_password_hash<'a>(
		&'a self,
		subject: &'a SubjectId,
		password_hash: &'a str,
	) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			match self.0.write().get_mut(subject) {
				Some(user) => {
					user.password_hash = TokenSecret::new(password_hash);

					Ok(())
				},
				None => Err(StoreError::Backend { message: format!("user {subject} does not exist") }),
			}
		})
	}
}
