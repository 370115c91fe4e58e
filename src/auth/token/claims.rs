//! Verified token claims handed out by the codec.

// self
use crate::{
	_prelude::*,
	auth::{SubjectId, TokenKind},
};

/// Claims recovered from a token whose signature and expiry have been checked.
///
/// The codec is kind-agnostic; consumers must call [`TokenClaims::expect_kind`] before trusting
/// the claims for a particular purpose.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenClaims {
	/// Subject the token was issued to.
	pub subject: SubjectId,
	/// Access or refresh.
	pub kind: TokenKind,
	/// Issued-at instant (second precision).
	pub issued_at: OffsetDateTime,
	/// Expiry instant (second precision).
	pub expires_at: OffsetDateTime,
	/// Random identifier that makes every minted token unique.
	pub token_id: String,
}
impl TokenClaims {
	/// Returns the claims if they were minted for `expected`, otherwise [`Error::InvalidToken`].
	pub fn expect_kind(self, expected: TokenKind) -> Result<Self> {
		if self.kind == expected { Ok(self) } else { Err(Error::InvalidToken) }
	}

	/// Returns `true` once `instant` reaches the expiry.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}
}
