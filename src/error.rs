//! Error taxonomy shared by token exchange, authenticated requests, and configuration.

// std
use std::path::PathBuf;
// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Credential or token-exchange failure.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Authenticated request failure (transport level only).
	#[error(transparent)]
	Request(#[from] RequestError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
}

/// Failures raised while turning a service-account credential into an access token.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// Credential could not be parsed or is malformed. No network call was made.
	#[error("Service account credential is invalid.")]
	InvalidCredential(#[from] CredentialError),
	/// Identity provider rejected the exchange or could not be reached.
	#[error("Token exchange failed.")]
	ExchangeFailed(#[from] ExchangeFailure),
}

/// Reasons a service-account credential is rejected before any network call.
#[derive(Debug, ThisError)]
pub enum CredentialError {
	/// Credential JSON could not be parsed.
	#[error("Credential JSON is malformed.")]
	Json {
		/// Structured parsing failure, including the offending path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Credential describes something other than a service account.
	#[error("Credential type `{kind}` is not a service account.")]
	UnsupportedType {
		/// The `type` field found in the credential.
		kind: String,
	},
	/// A required field is empty.
	#[error("Credential field `{field}` is empty.")]
	EmptyField {
		/// Name of the empty field.
		field: &'static str,
	},
	/// The private key is not a PEM-encoded RSA key.
	#[error("Credential private key cannot be parsed.")]
	PrivateKey {
		/// Underlying key parsing failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
	/// The `project_id` field is not a usable identifier.
	#[error("Credential project_id is invalid.")]
	ProjectId(#[source] crate::auth::IdentifierError),
	/// The token URI is not a valid absolute URL.
	#[error("Credential token_uri is invalid.")]
	TokenUri {
		/// Underlying URL parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// The signed assertion could not be produced.
	#[error("Signing the token assertion failed.")]
	Signing {
		/// Underlying signing failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
}

/// Reasons the identity provider did not hand out a usable token.
#[derive(Debug, ThisError)]
pub enum ExchangeFailure {
	/// Token endpoint answered with an HTTP error.
	#[error("Token endpoint rejected the exchange with HTTP {status}: {reason}.")]
	Rejected {
		/// HTTP status code returned by the token endpoint.
		status: u16,
		/// OAuth `error` code, when the body carried one.
		error: Option<String>,
		/// Human-readable reason (OAuth `error_description`, `error`, or a body preview).
		reason: String,
	},
	/// Token endpoint could not be reached.
	#[error(transparent)]
	Transport(#[from] RequestError),
	/// Token endpoint responded with JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	MalformedResponse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the response.
		status: u16,
	},
	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token endpoint returned a non-positive duration.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
	/// Token endpoint returned an empty access token.
	#[error("Token endpoint returned an empty access token.")]
	EmptyAccessToken,
	/// The granted lifetime ran out before the exchange completed.
	#[error("Token expired at {expires_at} before the exchange completed.")]
	ExpiredOnArrival {
		/// Expiry instant of the discarded token.
		expires_at: OffsetDateTime,
	},
}

/// Transport-level failures of an authenticated request.
///
/// HTTP error statuses are not represented here; they come back as regular responses.
#[derive(Debug, ThisError)]
pub enum RequestError {
	/// DNS, TCP, TLS, or I/O failure.
	#[error("Connection to the remote endpoint failed.")]
	ConnectionFailed {
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
	/// The caller-supplied deadline elapsed before the response completed.
	#[error("Request did not complete before the deadline.")]
	Timeout {
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
	/// The bearer token had already expired, so no request was built.
	#[error("Access token expired at {expired_at}.")]
	ExpiredToken {
		/// Expiry instant of the rejected token.
		expired_at: OffsetDateTime,
	},
	/// Only `http` and `https` targets are accepted.
	#[error("Target URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// The rejected URL.
		url: String,
	},
	/// HTTP request could not be constructed.
	#[error("HTTP request could not be constructed.")]
	InvalidRequest {
		/// Underlying construction failure.
		#[source]
		source: BoxError,
	},
}
impl RequestError {
	/// Wraps a transport-specific connection failure.
	pub fn connection_failed(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::ConnectionFailed { source: Box::new(src) }
	}

	/// Wraps a transport-specific deadline failure.
	pub fn timeout(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Timeout { source: Box::new(src) }
	}

	/// Wraps a request construction failure.
	pub fn invalid_request(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::InvalidRequest { source: Box::new(src) }
	}
}
impl From<std::io::Error> for RequestError {
	fn from(e: std::io::Error) -> Self {
		Self::connection_failed(e)
	}
}
impl From<oauth2::http::Error> for RequestError {
	fn from(e: oauth2::http::Error) -> Self {
		Self::invalid_request(e)
	}
}

/// Configuration and validation failures raised before any request is sent.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Required environment variable is unset or empty.
	#[error("Environment variable `{var}` is not set.")]
	MissingEnv {
		/// Variable name.
		var: &'static str,
	},
	/// Credential file could not be read.
	#[error("Credential file `{}` cannot be read.", .path.display())]
	CredentialFile {
		/// Path that was attempted.
		path: PathBuf,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// An endpoint URL cannot be parsed or joined.
	#[error("Endpoint URL is invalid.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Project identifier failed validation.
	#[error("Project identifier is invalid.")]
	InvalidProjectId(#[from] crate::auth::IdentifierError),
	/// Neither the configuration nor the credential names a project.
	#[error("No project identifier configured and the credential does not carry one.")]
	MissingProjectId,
	/// Message payload could not be serialized.
	#[error("Message payload could not be serialized.")]
	Serialize(#[from] serde_json::Error),
}
impl From<CredentialError> for Error {
	fn from(e: CredentialError) -> Self {
		AuthError::from(e).into()
	}
}
impl From<ExchangeFailure> for Error {
	fn from(e: ExchangeFailure) -> Self {
		AuthError::from(e).into()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn nested_errors_lift_into_crate_error() {
		let err: Error = CredentialError::EmptyField { field: "client_email" }.into();

		assert!(matches!(err, Error::Auth(AuthError::InvalidCredential(_))));

		let err: Error = ExchangeFailure::MissingExpiresIn.into();

		assert!(matches!(err, Error::Auth(AuthError::ExchangeFailed(_))));
	}

	#[test]
	fn rejection_message_carries_status_and_reason() {
		let err = ExchangeFailure::Rejected {
			status: 400,
			error: Some("invalid_grant".into()),
			reason: "Invalid JWT Signature".into(),
		};

		assert_eq!(
			err.to_string(),
			"Token endpoint rejected the exchange with HTTP 400: Invalid JWT Signature."
		);
	}
}
