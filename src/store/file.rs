//! File-backed [`RevocationLedger`] for single-node deployments.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{RevocationRecord, SubjectId, TokenSecret},
	store::{RevocationLedger, RevokeOutcome, StoreError, StoreFuture},
};

type LedgerMap = HashMap<String, RevocationRecord>;

/// Persists ledger records to a JSON file after each mutation.
///
/// Every write lands in a sibling `.tmp` file that is synced and renamed over the snapshot, so a
/// crash leaves either the old or the new snapshot on disk.
#[derive(Clone, Debug)]
pub struct FileLedger {
	path: PathBuf,
	inner: Arc<RwLock<LedgerMap>>,
}
impl FileLedger {
	/// Opens (or creates) a ledger at the provided path, eagerly loading existing records.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the snapshot file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<LedgerMap, StoreError> {
		if !path.exists() {
			return Ok(HashMap::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.is_empty() {
			return Ok(HashMap::new());
		}

		let records: Vec<RevocationRecord> =
			serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
				message: format!("Failed to parse {}: {e}", path.display()),
			})?;

		Ok(records.into_iter().map(|record| (record.token_hash.clone(), record)).collect())
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create ledger directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	/// Persists revocations of `flipped`, or reverts them in memory if the write fails.
	fn persist_or_restore(
		&self,
		contents: &mut LedgerMap,
		flipped: &[String],
	) -> Result<(), StoreError> {
		let result = self.persist_locked(contents);

		if result.is_err() {
			for key in flipped {
				if let Some(record) = contents.get_mut(key) {
					record.revoked_at = None;
				}
			}
		}

		result
	}

	fn persist_locked(&self, contents: &LedgerMap) -> Result<(), StoreError> {
		let snapshot: Vec<_> = contents.values().collect();
		let serialized =
			serde_json::to_vec_pretty(&snapshot).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize ledger snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl RevocationLedger for FileLedger {
	fn record(&self, record: RevocationRecord) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let key = record.token_hash.clone();

			if guard.contains_key(&key) {
				return Err(StoreError::Conflict {
					message: "refresh token is already recorded".into(),
				});
			}

			guard.insert(key.clone(), record);

			// An unpersisted record must not stay visible in memory.
			if let Err(e) = self.persist_locked(&guard) {
				guard.remove(&key);

				return Err(e);
			}

			Ok(())
		})
	}

	fn revoke<'a>(&'a self, token: &'a TokenSecret) -> StoreFuture<'a, bool> {
		Box::pin(async move {
			let key = token.fingerprint();
			let mut guard = self.inner.write();
			let changed = guard
				.get_mut(&key)
				.is_some_and(|record| record.revoke(OffsetDateTime::now_utc()));

			if changed {
				self.persist_or_restore(&mut guard, &[key])?;
			}

			Ok(changed)
		})
	}

	fn revoke_all<'a>(&'a self, subject: &'a SubjectId) -> StoreFuture<'a, usize> {
		Box::pin(async move {
			let now = OffsetDateTime::now_utc();
			let mut guard = self.inner.write();
			let flipped = guard
				.iter_mut()
				.filter(|(_, record)| &record.subject == subject)
				.filter_map(|(key, record)| record.revoke(now).then(|| key.clone()))
				.collect::<Vec<_>>();

			if !flipped.is_empty() {
				self.persist_or_restore(&mut guard, &flipped)?;
			}

			Ok(flipped.len())
		})
	}

	fn is_valid<'a>(&'a self, token: &'a TokenSecret) -> StoreFuture<'a, bool> {
		Box::pin(async move {
			let key = token.fingerprint();
			let now = OffsetDateTime::now_utc();

			Ok(self.inner.read().get(&key).is_some_and(|record| record.is_valid_at(now)))
		})
	}

	fn revoke_if_valid<'a>(&'a self, token: &'a TokenSecret) -> StoreFuture<'a, RevokeOutcome> {
		Box::pin(async move {
			let key = token.fingerprint();
			let now = OffsetDateTime::now_utc();
			let mut guard = self.inner.write();
			let outcome = match guard.get_mut(&key) {
				Some(record) if record.is_valid_at(now) => {
					record.revoke(now);

					RevokeOutcome::Revoked
				},
				_ => RevokeOutcome::NotValid,
			};

			if matches!(outcome, RevokeOutcome::Revoked) {
				self.persist_or_restore(&mut guard, &[key])?;
			}

			Ok(outcome)
		})
	}
}
