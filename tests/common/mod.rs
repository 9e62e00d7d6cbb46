//! Shared fixtures for the reqwest-backed integration tests.

#![allow(dead_code)]

// std
use std::path::PathBuf;
// crates.io
use httpmock::prelude::*;
use time::Duration;
use url::Url;
// self
use oauth2_push::{
	auth::{AccessToken, ScopeSet, ServiceAccountKey},
	http::{ReqwestHttpClient, ReqwestTransportErrorMapper},
	provider::{ReqwestTokenProvider, TokenProvider},
	requester::{AuthenticatedRequester, ReqwestRequester},
	reqwest::Client as ReqwestClient,
};

/// Service-account fixture with a real RSA key.
pub const KEY_JSON: &str = include_str!("../fixtures/service_account.json");
/// Public half of the fixture key.
pub const PUBLIC_PEM: &str = include_str!("../fixtures/service_account_public.pem");

/// Token endpoint body returned by the mock identity provider.
pub fn token_body(access_token: &str, expires_in: i64) -> String {
	format!(r#"{{"access_token":"{access_token}","expires_in":{expires_in},"token_type":"Bearer"}}"#)
}

/// Absolute URL on the mock server.
pub fn mock_url(server: &MockServer, path: &str) -> Url {
	Url::parse(&server.url(path)).expect("Mock server URL should parse.")
}

/// Fixture key whose token endpoint points at `server`.
pub fn fixture_key(server: &MockServer) -> ServiceAccountKey {
	ServiceAccountKey::from_json(KEY_JSON)
		.expect("Fixture key should parse.")
		.with_token_uri(mock_url(server, "/token"))
}

/// Reqwest transport that accepts the self-signed certificates served by `httpmock`.
pub fn test_http_client() -> ReqwestHttpClient {
	let client = ReqwestClient::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()
		.expect("Insecure reqwest client should build.");

	ReqwestHttpClient::with_client(client)
}

/// Provider for the messaging scope backed by `server`.
pub fn provider(server: &MockServer) -> ReqwestTokenProvider {
	TokenProvider::with_http_client(
		fixture_key(server),
		ScopeSet::messaging(),
		test_http_client(),
		ReqwestTransportErrorMapper,
	)
}

/// Requester over the test reqwest transport.
pub fn requester() -> ReqwestRequester {
	AuthenticatedRequester::with_http_client(test_http_client(), ReqwestTransportErrorMapper)
}

/// Locally minted token that is valid for an hour.
pub fn live_token(secret: &str) -> AccessToken {
	AccessToken::builder(ScopeSet::messaging())
		.access_token(secret)
		.expires_in(Duration::hours(1))
		.build()
		.expect("Token fixture should build.")
}

/// Writes `contents` to a per-process temp file and returns its path.
pub fn temp_key_file(name: &str, contents: &str) -> PathBuf {
	let path = std::env::temp_dir().join(format!("oauth2-push-it-{}-{name}", std::process::id()));

	std::fs::write(&path, contents).expect("Temp key file should be written.");

	path
}
