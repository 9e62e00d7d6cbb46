//! Permission scopes requested during the token exchange.

// std
use std::{collections::BTreeSet, sync::OnceLock};
// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// Scope granting send access to the cloud messaging API.
pub const MESSAGING_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";

/// Errors emitted when validating scopes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ScopeValidationError {
	/// At least one scope must be requested.
	#[error("At least one scope must be requested.")]
	NoScopes,
	/// Empty scope entries are not allowed.
	#[error("Scope entries cannot be empty.")]
	Empty,
	/// Scopes cannot contain embedded whitespace characters.
	#[error("Scope contains whitespace: {scope}.")]
	ContainsWhitespace {
		/// The offending scope string.
		scope: String,
	},
	/// Scopes are absolute URIs.
	#[error("Scope is not an absolute URI: {scope}.")]
	NotAUri {
		/// The offending scope string.
		scope: String,
	},
}

/// Non-empty, normalized set of scope URIs.
///
/// Entries are deduplicated and sorted, so two sets requesting the same permissions compare
/// equal and produce the same space-delimited `scope` claim. The
/// [`fingerprint`](Self::fingerprint) is a base64 (no padding) SHA-256 digest of that claim,
/// cached on first use; spans log it instead of the raw list.
pub struct ScopeSet {
	scopes: Arc<[String]>,
	fingerprint_cache: OnceLock<String>,
}
impl ScopeSet {
	/// Creates a normalized scope set from any iterator.
	pub fn new<I, S>(scopes: I) -> Result<Self, ScopeValidationError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Ok(Self { scopes: normalize(scopes)?, fingerprint_cache: OnceLock::new() })
	}

	/// Scope set holding only [`MESSAGING_SCOPE`].
	pub fn messaging() -> Self {
		Self { scopes: Arc::from([MESSAGING_SCOPE.to_owned()]), fingerprint_cache: OnceLock::new() }
	}

	/// Number of distinct scopes.
	pub fn len(&self) -> usize {
		self.scopes.len()
	}

	/// Always `false`; construction rejects empty sets.
	pub fn is_empty(&self) -> bool {
		self.scopes.is_empty()
	}

	/// Returns true if the normalized set contains the provided scope.
	pub fn contains(&self, scope: &str) -> bool {
		self.scopes.binary_search_by(|candidate| candidate.as_str().cmp(scope)).is_ok()
	}

	/// Iterator over normalized scopes.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.scopes.iter().map(|s| s.as_str())
	}

	/// Space-delimited representation used as the assertion's `scope` claim.
	pub fn normalized(&self) -> String {
		self.scopes.join(" ")
	}

	/// Stable fingerprint derived from the normalized scope list.
	pub fn fingerprint(&self) -> &str {
		self.fingerprint_cache.get_or_init(|| compute_fingerprint(&self.scopes))
	}
}
impl Clone for ScopeSet {
	fn clone(&self) -> Self {
		Self { scopes: self.scopes.clone(), fingerprint_cache: OnceLock::new() }
	}
}
impl PartialEq for ScopeSet {
	fn eq(&self, other: &Self) -> bool {
		self.scopes == other.scopes
	}
}
impl Eq for ScopeSet {}
impl Hash for ScopeSet {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.fingerprint().hash(state);
	}
}
impl Debug for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("ScopeSet").field(&self.scopes).finish()
	}
}
impl Display for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.normalized())
	}
}
impl FromStr for ScopeSet {
	type Err = ScopeValidationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s.split_whitespace())
	}
}
impl Default for ScopeSet {
	fn default() -> Self {
		Self::messaging()
	}
}

fn normalize<I, S>(scopes: I) -> Result<Arc<[String]>, ScopeValidationError>
where
	I: IntoIterator<Item = S>,
	S: Into<String>,
{
	let mut set = BTreeSet::new();

	for scope in scopes {
		let owned: String = scope.into();

		if owned.is_empty() {
			return Err(ScopeValidationError::Empty);
		}
		if owned.chars().any(char::is_whitespace) {
			return Err(ScopeValidationError::ContainsWhitespace { scope: owned });
		}
		if Url::parse(&owned).is_err() {
			return Err(ScopeValidationError::NotAUri { scope: owned });
		}

		set.insert(owned);
	}

	if set.is_empty() {
		return Err(ScopeValidationError::NoScopes);
	}

	Ok(Arc::from(set.into_iter().collect::<Vec<_>>()))
}

fn compute_fingerprint(scopes: &[String]) -> String {
	let mut hasher = Sha256::new();

	hasher.update(scopes.join(" ").as_bytes());

	STANDARD_NO_PAD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const CLOUD: &str = "https://www.googleapis.com/auth/cloud-platform";

	#[test]
	fn scopes_normalize_and_fingerprint_stably() {
		let lhs = ScopeSet::new([MESSAGING_SCOPE, CLOUD, CLOUD])
			.expect("Left-hand scope set should be valid.");
		let rhs = ScopeSet::new([CLOUD, MESSAGING_SCOPE])
			.expect("Right-hand scope set should be valid.");

		assert_eq!(lhs, rhs);
		assert_eq!(lhs.len(), 2);
		assert_eq!(lhs.normalized(), format!("{CLOUD} {MESSAGING_SCOPE}"));
		assert_eq!(lhs.fingerprint(), rhs.fingerprint());
	}

	#[test]
	fn scopes_reject_invalid_entries() {
		assert_eq!(ScopeSet::new(Vec::<String>::new()), Err(ScopeValidationError::NoScopes));
		assert_eq!(ScopeSet::from_str("   "), Err(ScopeValidationError::NoScopes));
		assert_eq!(ScopeSet::new([""]), Err(ScopeValidationError::Empty));
		assert!(matches!(
			ScopeSet::new([" https://example.com/a "]),
			Err(ScopeValidationError::ContainsWhitespace { .. })
		));
		assert!(matches!(
			ScopeSet::new(["firebase.messaging"]),
			Err(ScopeValidationError::NotAUri { .. })
		));
	}

	#[test]
	fn default_requests_messaging() {
		let scopes = ScopeSet::default();

		assert!(scopes.contains(MESSAGING_SCOPE));
		assert!(!scopes.is_empty());
		assert_eq!(scopes.iter().collect::<Vec<_>>(), vec![MESSAGING_SCOPE]);
		assert_eq!(
			ScopeSet::from_str(MESSAGING_SCOPE).expect("Messaging scope should parse."),
			scopes
		);
	}
}
