//! JWT-bearer token exchange against the identity provider's token endpoint.

pub use oauth2;

// std
use std::time::Duration as StdDuration;
// crates.io
use oauth2::{
	AsyncHttpClient, HttpRequest, HttpResponse, TokenResponse,
	basic::{BasicErrorResponse, BasicTokenResponse},
	http::{
		Method,
		header::{ACCEPT, CONTENT_TYPE},
	},
};
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ScopeSet, ServiceAccountKey, TokenSecret, sign_assertion},
	error::{AuthError, ExchangeFailure, RequestError},
	http::{HttpTransport, TransportErrorMapper},
	obs::Operation,
};

/// Grant type identifier for RFC 7523 assertions.
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

const BODY_PREVIEW_LIMIT: usize = 256;

/// Everything a single exchange needs, borrowed from the caller.
pub(crate) struct JwtBearerExchange<'a, C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) http_client: &'a C,
	pub(crate) transport_mapper: &'a M,
	pub(crate) key: &'a ServiceAccountKey,
	pub(crate) scope: &'a ScopeSet,
	pub(crate) subject: Option<&'a str>,
	pub(crate) timeout: Option<StdDuration>,
}
impl<C, M> JwtBearerExchange<'_, C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Signs an assertion, posts it to the key's token endpoint, and maps the response.
	///
	/// Signing happens before any I/O, so a key that cannot sign never reaches the network.
	pub(crate) async fn execute(&self) -> Result<AccessToken, AuthError> {
		let issued_at = OffsetDateTime::now_utc();
		let assertion = sign_assertion(self.key, self.scope, self.subject, issued_at)?;
		let request = build_token_request(&self.key.token_uri, &assertion)
			.map_err(|e| ExchangeFailure::Transport(RequestError::from(e)))?;
		let handle = self.http_client.with_deadline(self.timeout);
		let response = handle.call(request).await.map_err(|err| {
			ExchangeFailure::Transport(
				self.transport_mapper.map_transport_error(Operation::TokenExchange, err),
			)
		})?;

		let token = map_token_response(self.scope, issued_at, response)?;

		Ok(ensure_unexpired(token, OffsetDateTime::now_utc())?)
	}
}

/// Builds the form-encoded exchange request for `assertion`.
pub(crate) fn build_token_request(
	token_uri: &Url,
	assertion: &str,
) -> Result<HttpRequest, oauth2::http::Error> {
	let body = form_urlencoded::Serializer::new(String::new())
		.append_pair("grant_type", JWT_BEARER_GRANT)
		.append_pair("assertion", assertion)
		.finish();

	oauth2::http::Request::builder()
		.method(Method::POST)
		.uri(token_uri.as_str())
		.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
		.header(ACCEPT, "application/json")
		.body(body.into_bytes())
}

/// Turns a token endpoint response into an [`AccessToken`] or an [`ExchangeFailure`].
pub(crate) fn map_token_response(
	scope: &ScopeSet,
	issued_at: OffsetDateTime,
	response: HttpResponse,
) -> Result<AccessToken, ExchangeFailure> {
	let status = response.status().as_u16();

	if !response.status().is_success() {
		return Err(map_error_response(status, response.body()));
	}

	let mut de = serde_json::Deserializer::from_slice(response.body());
	let token: BasicTokenResponse = serde_path_to_error::deserialize(&mut de)
		.map_err(|source| ExchangeFailure::MalformedResponse { source, status })?;
	let expires_in = token.expires_in().ok_or(ExchangeFailure::MissingExpiresIn)?.as_secs();
	let expires_in = i64::try_from(expires_in).map_err(|_| ExchangeFailure::ExpiresInOutOfRange)?;

	if expires_in <= 0 {
		return Err(ExchangeFailure::NonPositiveExpiresIn);
	}

	let secret = token.access_token().secret();

	if secret.is_empty() {
		return Err(ExchangeFailure::EmptyAccessToken);
	}

	let expires_at = issued_at
		.checked_add(Duration::seconds(expires_in))
		.ok_or(ExchangeFailure::ExpiresInOutOfRange)?;

	Ok(AccessToken {
		secret: TokenSecret::new(secret.as_str()),
		scope: scope.clone(),
		issued_at,
		expires_at,
	})
}

/// Discards a token whose lifetime was used up by signing and transport latency.
pub(crate) fn ensure_unexpired(
	token: AccessToken,
	now: OffsetDateTime,
) -> Result<AccessToken, ExchangeFailure> {
	if token.is_expired_at(now) {
		return Err(ExchangeFailure::ExpiredOnArrival { expires_at: token.expires_at });
	}

	Ok(token)
}

fn map_error_response(status: u16, body: &[u8]) -> ExchangeFailure {
	match serde_json::from_slice::<BasicErrorResponse>(body) {
		Ok(response) => {
			let error = response.error().as_ref().to_owned();
			let reason = response.error_description().cloned().unwrap_or_else(|| error.clone());

			ExchangeFailure::Rejected { status, error: Some(error), reason }
		},
		Err(_) => ExchangeFailure::Rejected { status, error: None, reason: body_preview(body) },
	}
}

fn body_preview(body: &[u8]) -> String {
	let text = String::from_utf8_lossy(body);
	let trimmed = text.trim();

	if trimmed.is_empty() {
		return "empty response body".into();
	}

	trimmed.chars().take(BODY_PREVIEW_LIMIT).collect()
}
