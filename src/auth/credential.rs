//! Service-account key material loaded from the JSON file issued by the cloud console.

// std
use std::path::Path;
// crates.io
use jsonwebtoken::EncodingKey;
// self
use crate::{_prelude::*, auth::ProjectId, error::{ConfigError, CredentialError}};

/// Token endpoint used when the key file does not name one.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const SERVICE_ACCOUNT_TYPE: &str = "service_account";

#[derive(Deserialize)]
struct KeyFile {
	#[serde(rename = "type")]
	kind: String,
	#[serde(default)]
	project_id: Option<String>,
	#[serde(default)]
	private_key_id: Option<String>,
	private_key: String,
	client_email: String,
	#[serde(default)]
	token_uri: Option<String>,
}

/// Parsed, immutable service-account credential.
///
/// Parsing validates everything the exchange needs (account email, RSA key, token
/// endpoint), so a key that loads successfully can always sign an assertion.
#[derive(Clone)]
pub struct ServiceAccountKey {
	/// Account identity; becomes the assertion issuer.
	pub client_email: String,
	/// Project the account belongs to, if the key file names one.
	pub project_id: Option<ProjectId>,
	/// Key identifier placed in the assertion header as `kid`.
	pub private_key_id: Option<String>,
	/// Token endpoint and assertion audience.
	pub token_uri: Url,
	signing_key: EncodingKey,
}
impl ServiceAccountKey {
	/// Parses a key from its JSON text.
	pub fn from_json(json: &str) -> Result<Self, CredentialError> {
		Self::from_slice(json.as_bytes())
	}

	/// Parses a key from raw JSON bytes.
	pub fn from_slice(bytes: &[u8]) -> Result<Self, CredentialError> {
		let mut de = serde_json::Deserializer::from_slice(bytes);
		let file: KeyFile = serde_path_to_error::deserialize(&mut de)
			.map_err(|source| CredentialError::Json { source })?;

		if file.kind != SERVICE_ACCOUNT_TYPE {
			return Err(CredentialError::UnsupportedType { kind: file.kind });
		}
		if file.client_email.trim().is_empty() {
			return Err(CredentialError::EmptyField { field: "client_email" });
		}
		if file.private_key.trim().is_empty() {
			return Err(CredentialError::EmptyField { field: "private_key" });
		}

		let signing_key = EncodingKey::from_rsa_pem(file.private_key.as_bytes())
			.map_err(|source| CredentialError::PrivateKey { source })?;
		let token_uri = Url::parse(file.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI))
			.map_err(|source| CredentialError::TokenUri { source })?;
		let project_id = file
			.project_id
			.filter(|value| !value.is_empty())
			.map(ProjectId::new)
			.transpose()
			.map_err(CredentialError::ProjectId)?;

		Ok(Self {
			client_email: file.client_email,
			project_id,
			private_key_id: file.private_key_id.filter(|value| !value.is_empty()),
			token_uri,
			signing_key,
		})
	}

	/// Reads and parses a key file.
	///
	/// A missing or unreadable file is a [`ConfigError::CredentialFile`]; a file that reads
	/// but does not parse is an [`AuthError::InvalidCredential`](crate::error::AuthError).
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let bytes = std::fs::read(path)
			.map_err(|source| ConfigError::CredentialFile { path: path.to_path_buf(), source })?;

		Ok(Self::from_slice(&bytes)?)
	}

	/// Replaces the token endpoint (and assertion audience).
	pub fn with_token_uri(mut self, token_uri: Url) -> Self {
		self.token_uri = token_uri;

		self
	}

	pub(crate) fn signing_key(&self) -> &EncodingKey {
		&self.signing_key
	}
}
impl Debug for ServiceAccountKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ServiceAccountKey")
			.field("client_email", &self.client_email)
			.field("project_id", &self.project_id)
			.field("private_key_id", &self.private_key_id)
			.field("token_uri", &self.token_uri.as_str())
			.field("signing_key", &"<redacted>")
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::{AuthError, Error};

	const FIXTURE: &str = include_str!("../../tests/fixtures/service_account.json");

	fn fixture_with(field: &str, value: serde_json::Value) -> String {
		let mut json: serde_json::Value =
			serde_json::from_str(FIXTURE).expect("Fixture should be valid JSON.");

		json[field] = value;

		json.to_string()
	}

	#[test]
	fn parses_console_key_file() {
		let key = ServiceAccountKey::from_json(FIXTURE).expect("Fixture key should parse.");

		assert_eq!(key.client_email, "push-sender@push-fixture.iam.gserviceaccount.com");
		assert_eq!(key.project_id.as_deref(), Some("push-fixture"));
		assert_eq!(key.token_uri.as_str(), DEFAULT_TOKEN_URI);
		assert!(key.private_key_id.is_some());
		assert!(!format!("{key:?}").contains("PRIVATE KEY"));
	}

	#[test]
	fn missing_token_uri_falls_back_to_default() {
		let mut json: serde_json::Value =
			serde_json::from_str(FIXTURE).expect("Fixture should be valid JSON.");

		json.as_object_mut().expect("Fixture should be an object.").remove("token_uri");

		let key = ServiceAccountKey::from_json(&json.to_string())
			.expect("Key without token_uri should parse.");

		assert_eq!(key.token_uri.as_str(), DEFAULT_TOKEN_URI);
	}

	#[test]
	fn malformed_keys_are_rejected() {
		assert!(matches!(
			ServiceAccountKey::from_json("{\"type\":\"service_account\""),
			Err(CredentialError::Json { .. })
		));
		assert!(matches!(
			ServiceAccountKey::from_json(&fixture_with("type", "authorized_user".into())),
			Err(CredentialError::UnsupportedType { kind }) if kind == "authorized_user"
		));
		assert!(matches!(
			ServiceAccountKey::from_json(&fixture_with("client_email", "".into())),
			Err(CredentialError::EmptyField { field: "client_email" })
		));
		assert!(matches!(
			ServiceAccountKey::from_json(&fixture_with("private_key", "not a pem".into())),
			Err(CredentialError::PrivateKey { .. })
		));
		assert!(matches!(
			ServiceAccountKey::from_json(&fixture_with("token_uri", "relative/token".into())),
			Err(CredentialError::TokenUri { .. })
		));
	}

	#[test]
	fn json_errors_report_the_failing_path() {
		let err = ServiceAccountKey::from_json(&fixture_with("client_email", 42.into()))
			.expect_err("Numeric client_email must be rejected.");

		match err {
			CredentialError::Json { source } => assert_eq!(source.path().to_string(), "client_email"),
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}

	#[test]
	fn missing_file_is_a_configuration_error() {
		let err = ServiceAccountKey::from_file("/nonexistent/service-account.json")
			.expect_err("Missing key file must be rejected.");

		assert!(matches!(err, Error::Config(ConfigError::CredentialFile { .. })));

		let dir = std::env::temp_dir().join("oauth2-push-credential-test.json");

		std::fs::write(&dir, "{}").expect("Temporary key file should be writable.");

		let err = ServiceAccountKey::from_file(&dir).expect_err("Empty object must be rejected.");

		assert!(matches!(err, Error::Auth(AuthError::InvalidCredential(_))));

		let _ = std::fs::remove_file(&dir);
	}
}
