//! Signed JWT assertions for the `urn:ietf:params:oauth:grant-type:jwt-bearer` grant.

// crates.io
use jsonwebtoken::{Algorithm, Header};
// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, ServiceAccountKey},
	error::CredentialError,
};

/// Lifetime the identity provider accepts for an assertion (one hour at most).
pub const ASSERTION_LIFETIME: Duration = Duration::hours(1);

/// Claims carried by the assertion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
	/// Service account email.
	pub iss: String,
	/// Space-delimited scopes requested for the access token.
	pub scope: String,
	/// Token endpoint the assertion is addressed to.
	pub aud: String,
	/// Issued-at, seconds since the Unix epoch.
	pub iat: i64,
	/// Expiry, seconds since the Unix epoch.
	pub exp: i64,
	/// User to impersonate under domain-wide delegation.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sub: Option<String>,
}
impl AssertionClaims {
	/// Builds the claims for `key` and `scope` issued at `issued_at`.
	pub fn new(
		key: &ServiceAccountKey,
		scope: &ScopeSet,
		subject: Option<&str>,
		issued_at: OffsetDateTime,
	) -> Self {
		let iat = issued_at.unix_timestamp();

		Self {
			iss: key.client_email.clone(),
			scope: scope.normalized(),
			aud: key.token_uri.to_string(),
			iat,
			exp: iat + ASSERTION_LIFETIME.whole_seconds(),
			sub: subject.map(ToOwned::to_owned),
		}
	}
}

/// Signs the assertion with the key's RSA private key (RS256, `kid` = `private_key_id`).
pub fn sign_assertion(
	key: &ServiceAccountKey,
	scope: &ScopeSet,
	subject: Option<&str>,
	issued_at: OffsetDateTime,
) -> Result<String, CredentialError> {
	let mut header = Header::new(Algorithm::RS256);

	header.kid = key.private_key_id.clone();

	let claims = AssertionClaims::new(key, scope, subject, issued_at);

	jsonwebtoken::encode(&header, &claims, key.signing_key())
		.map_err(|source| CredentialError::Signing { source })
}
