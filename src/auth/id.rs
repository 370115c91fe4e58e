//! Strongly typed subject identifier carried by every session token.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

const IDENTIFIER_MAX_LEN: usize = 128;

/// Error returned when subject validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("Subject identifier cannot be empty.")]
	Empty,
	/// The identifier contains whitespace characters.
	#[error("Subject identifier contains whitespace.")]
	ContainsWhitespace,
	/// The identifier exceeded the allowed character count.
	#[error("Subject identifier exceeds {max} characters.")]
	TooLong {
		/// Maximum permitted character count.
		max: usize,
	},
}

/// Opaque user identifier, encoded as a string inside tokens and ledger records.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubjectId(String);
impl SubjectId {
	/// Creates a new identifier after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
		let view = value.as_ref();

		validate_view(view)?;

		Ok(Self(view.to_owned()))
	}
}
impl Deref for SubjectId {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for SubjectId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Borrow<str> for SubjectId {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl From<SubjectId> for String {
	fn from(value: SubjectId) -> Self {
		value.0
	}
}
impl TryFrom<String> for SubjectId {
	type Error = IdentifierError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate_view(&value)?;

		Ok(Self(value))
	}
}
impl Debug for SubjectId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Subject({})", self.0)
	}
}
impl Display for SubjectId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl FromStr for SubjectId {
	type Err = IdentifierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

fn validate_view(view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty);
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace);
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn subjects_reject_blank_and_whitespace() {
		assert_eq!(SubjectId::new(""), Err(IdentifierError::Empty));
		assert_eq!(SubjectId::new(" 42"), Err(IdentifierError::ContainsWhitespace));
		assert_eq!(SubjectId::new("4\u{00A0}2"), Err(IdentifierError::ContainsWhitespace));

		let subject = SubjectId::new("42").expect("Numeric subject should be valid.");

		assert_eq!(subject.as_ref(), "42");
		assert_eq!(subject.to_string(), "42");
	}

	#[test]
	fn length_limit_is_inclusive() {
		SubjectId::new("a".repeat(IDENTIFIER_MAX_LEN)).expect("Exact length should succeed.");

		assert_eq!(
			SubjectId::new("a".repeat(IDENTIFIER_MAX_LEN + 1)),
			Err(IdentifierError::TooLong { max: IDENTIFIER_MAX_LEN })
		);
	}

	#[test]
	fn serde_round_trip_enforces_validation() {
		let subject: SubjectId =
			serde_json::from_str("\"alice\"").expect("Subject should deserialize successfully.");

		assert_eq!(subject.as_ref(), "alice");
		assert!(serde_json::from_str::<SubjectId>("\"with space\"").is_err());
		assert!(serde_json::from_str::<SubjectId>("\"\"").is_err());
	}

	#[test]
	fn borrow_supports_str_lookup() {
		let map: HashMap<SubjectId, u8> =
			HashMap::from_iter([(SubjectId::new("alice").expect("Subject should be valid."), 7)]);

		assert_eq!(map.get("alice"), Some(&7));
	}
}
