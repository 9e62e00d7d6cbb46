//! Strongly typed identifiers used to address the messaging API.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal, $max:expr) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Maximum accepted length, in bytes.
			pub const MAX_LEN: usize = $max;

			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				validate_view($kind, view, $max)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate_view($kind, &value, $max)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (project, device).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (project, device).
		kind: &'static str,
	},
	/// The identifier contains a path separator and cannot be embedded in a URL path.
	#[error("{kind} identifier contains a path separator.")]
	ContainsSeparator {
		/// Kind of identifier (project, device).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (project, device).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
}

def_id! { ProjectId, "Cloud project that owns the messaging endpoint.", "Project", 128 }
def_id! { DeviceToken, "Registration token addressing a single device installation.", "Device", 4096 }

fn validate_view(kind: &'static str, view: &str, max: usize) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.contains('/') {
		return Err(IdentifierError::ContainsSeparator { kind });
	}
	if view.len() > max {
		return Err(IdentifierError::TooLong { kind, max });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn identifiers_reject_padding_and_separators() {
		assert!(ProjectId::new(" push-demo").is_err(), "Leading whitespace must be rejected.");
		assert!(ProjectId::new("push-demo ").is_err(), "Trailing whitespace must be rejected.");
		assert_eq!(
			ProjectId::new("projects/push-demo"),
			Err(IdentifierError::ContainsSeparator { kind: "Project" })
		);

		let project = ProjectId::new("push-demo").expect("Project fixture should be valid.");

		assert_eq!(project.as_ref(), "push-demo");
		assert!(DeviceToken::new("").is_err());
	}

	#[test]
	fn serde_enforces_validation() {
		let project: ProjectId = serde_json::from_str("\"vruksha-4ffd6\"")
			.expect("Project should deserialize successfully.");

		assert_eq!(project.as_ref(), "vruksha-4ffd6");
		assert!(serde_json::from_str::<ProjectId>("\"with space\"").is_err());
	}

	#[test]
	fn length_limits_follow_the_identifier_kind() {
		ProjectId::new("a".repeat(ProjectId::MAX_LEN)).expect("Exact length should succeed.");

		assert!(ProjectId::new("a".repeat(ProjectId::MAX_LEN + 1)).is_err());

		let registration = format!("f2aNJFLSSbKpTcmNMzHpCZ:APA91b{}", "x".repeat(140));

		DeviceToken::new(&registration).expect("Registration tokens exceed project limits.");
	}
}
