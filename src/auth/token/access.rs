//! Short-lived bearer tokens minted by the token exchange.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, token::secret::TokenSecret},
};

/// Lifecycle status of an [`AccessToken`] at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenStatus {
	/// Token can be presented.
	Active,
	/// Token reached its expiry instant.
	Expired,
}

/// Errors produced by [`AccessTokenBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum AccessTokenBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
}

/// Bearer token plus the instant it stops being valid.
#[derive(Clone)]
pub struct AccessToken {
	/// Token value; callers must avoid logging it.
	pub secret: TokenSecret,
	/// Scopes the token was requested for.
	pub scope: ScopeSet,
	/// Local instant the exchange started.
	pub issued_at: OffsetDateTime,
	/// Instant the token expires (`issued_at + expires_in`).
	pub expires_at: OffsetDateTime,
}
impl AccessToken {
	/// Returns a builder for the provided scope set.
	pub fn builder(scope: ScopeSet) -> AccessTokenBuilder {
		AccessTokenBuilder::new(scope)
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		if instant >= self.expires_at { TokenStatus::Expired } else { TokenStatus::Active }
	}

	/// Returns `true` if the token has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), TokenStatus::Expired)
	}

	/// Returns `true` if the token is expired relative to the current clock.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}

	/// Lifetime left at `instant`, clamped at zero.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		let remaining = self.expires_at - instant;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}

	/// `Authorization` header value: `Bearer <token>`.
	pub fn authorization(&self) -> String {
		format!("Bearer {}", self.secret.expose())
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("secret", &"<redacted>")
			.field("scope", &self.scope)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Builder for [`AccessToken`].
#[derive(Clone, Debug)]
pub struct AccessTokenBuilder {
	scope: ScopeSet,
	secret: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl AccessTokenBuilder {
	fn new(scope: ScopeSet) -> Self {
		Self { scope, secret: None, issued_at: None, expires_at: None, expires_in: None }
	}

	/// Sets the issued-at instant.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.secret = Some(TokenSecret::new(token));

		self
	}

	/// Consumes the builder and produces an [`AccessToken`].
	pub fn build(self) -> Result<AccessToken, AccessTokenBuilderError> {
		let secret = self.secret.ok_or(AccessTokenBuilderError::MissingAccessToken)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) => issued_at + delta,
			(None, None) => return Err(AccessTokenBuilderError::MissingExpiry),
		};

		Ok(AccessToken { secret, scope: self.scope, issued_at, expires_at })
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn status_flips_at_the_expiry_instant() {
		let token = AccessToken::builder(ScopeSet::messaging())
			.access_token("ya29.active")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_at(macros::datetime!(2025-01-01 01:00 UTC))
			.build()
			.expect("Token builder should succeed for status checks.");

		assert_eq!(token.status_at(macros::datetime!(2025-01-01 00:59 UTC)), TokenStatus::Active);
		assert_eq!(token.status_at(macros::datetime!(2025-01-01 01:00 UTC)), TokenStatus::Expired);
		assert_eq!(token.remaining_at(macros::datetime!(2025-01-01 00:30 UTC)), Duration::minutes(30));
		assert_eq!(token.remaining_at(macros::datetime!(2025-01-01 02:00 UTC)), Duration::ZERO);
	}

	#[test]
	fn builder_handles_relative_expiry() {
		let token = AccessToken::builder(ScopeSet::messaging())
			.access_token("ya29.relative")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_in(Duration::seconds(3599))
			.build()
			.expect("Token builder should support relative expiry.");

		assert_eq!(token.expires_at, macros::datetime!(2025-01-01 00:59:59 UTC));
		assert_eq!(token.authorization(), "Bearer ya29.relative");
	}

	#[test]
	fn builder_requires_secret_and_expiry() {
		let err = AccessToken::builder(ScopeSet::messaging())
			.expires_in(Duration::hours(1))
			.build()
			.expect_err("Missing secret must be rejected.");

		assert_eq!(err, AccessTokenBuilderError::MissingAccessToken);

		let err = AccessToken::builder(ScopeSet::messaging())
			.access_token("ya29.no-expiry")
			.build()
			.expect_err("Missing expiry must be rejected.");

		assert_eq!(err, AccessTokenBuilderError::MissingExpiry);
	}

	#[test]
	fn debug_redacts_secret() {
		let token = AccessToken::builder(ScopeSet::messaging())
			.access_token("ya29.hidden")
			.expires_in(Duration::hours(1))
			.build()
			.expect("Token builder should succeed.");

		assert!(!format!("{token:?}").contains("ya29.hidden"));
		assert!(!token.is_expired());
	}
}
