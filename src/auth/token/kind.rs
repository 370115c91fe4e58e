//! Token kind discriminator.

// self
use crate::_prelude::*;

/// Purpose a token was minted for; immutable once issued.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
	/// Short-lived credential presented on protected requests.
	Access,
	/// Long-lived credential used only to mint new pairs.
	Refresh,
}
impl TokenKind {
	/// Returns the stable label embedded in token claims.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenKind::Access => "access",
			TokenKind::Refresh => "refresh",
		}
	}
}
impl Display for TokenKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn serde_uses_lowercase_labels() {
		assert_eq!(
			serde_json::to_string(&TokenKind::Refresh).expect("Kind should serialize."),
			"\"refresh\""
		);
		assert_eq!(
			serde_json::from_str::<TokenKind>("\"access\"").expect("Kind should deserialize."),
			TokenKind::Access
		);
		assert!(serde_json::from_str::<TokenKind>("\"Access\"").is_err());
	}
}
