//! Authenticated JSON POSTs.
//!
//! [`AuthenticatedRequester::post_json`] sends exactly one request and returns whatever the
//! server answered. HTTP error statuses are results, not errors: deciding what a 404 or 500
//! from the messaging endpoint means is left to the caller.

// std
use std::borrow::Cow;
// crates.io
use oauth2::{
	AsyncHttpClient, HttpRequest,
	http::{
		Method,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	error::RequestError,
	http::{self, HttpTransport, TransportErrorMapper},
	obs::{self, OpSpan, Operation, Outcome},
};
#[cfg(feature = "reqwest")]
use crate::http::{ReqwestHttpClient, ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Requester specialized for the crate's default reqwest transport stack.
pub type ReqwestRequester = AuthenticatedRequester<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// One JSON POST: target, entity body, and an optional deadline.
#[derive(Clone, Debug)]
pub struct JsonPost {
	/// Absolute `http` or `https` target.
	pub url: Url,
	/// Entity body, sent verbatim.
	pub body: Vec<u8>,
	/// Deadline for the whole exchange; falls back to the requester's default.
	pub timeout: Option<Duration>,
}
impl JsonPost {
	/// Creates a request for `url` carrying `body`.
	pub fn new(url: Url, body: impl Into<Vec<u8>>) -> Self {
		Self { url, body: body.into(), timeout: None }
	}

	/// Sets the deadline for this request only; negative values clamp to zero.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(if timeout.is_negative() { Duration::ZERO } else { timeout });

		self
	}
}

/// Status and complete body of a response.
#[derive(Clone, PartialEq, Eq)]
pub struct JsonResponse {
	/// HTTP status reported by the transport.
	pub status: u16,
	/// Entity body as received.
	pub body: Vec<u8>,
}
impl JsonResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Body decoded as UTF-8, replacing invalid sequences.
	pub fn body_text(&self) -> Cow<'_, str> {
		String::from_utf8_lossy(&self.body)
	}

	/// Body parsed as JSON.
	pub fn json<T>(&self) -> Result<T, serde_json::Error>
	where
		T: for<'de> Deserialize<'de>,
	{
		serde_json::from_slice(&self.body)
	}
}
impl Debug for JsonResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("JsonResponse")
			.field("status", &self.status)
			.field("body", &self.body_text())
			.finish()
	}
}

/// Sends bearer-authenticated JSON POSTs over an [`HttpTransport`].
pub struct AuthenticatedRequester<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every outbound request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Deadline used when a [`JsonPost`] carries none.
	pub default_timeout: Option<Duration>,
}
impl<C, M> AuthenticatedRequester<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a requester that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(http_client: impl Into<Arc<C>>, mapper: impl Into<Arc<M>>) -> Self {
		Self { http_client: http_client.into(), transport_mapper: mapper.into(), default_timeout: None }
	}

	/// Sets the deadline applied to requests without their own.
	pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
		self.default_timeout = Some(timeout);

		self
	}

	/// POSTs `post.body` to `post.url` with `Authorization: Bearer <token>`.
	///
	/// Fails before any I/O when `token` has expired or the URL is not `http(s)`. Transport
	/// failures map to [`RequestError::ConnectionFailed`] or [`RequestError::Timeout`]; every
	/// HTTP status, including 4xx and 5xx, is returned as a [`JsonResponse`].
	pub async fn post_json(
		&self,
		token: &AccessToken,
		post: JsonPost,
	) -> Result<JsonResponse, RequestError> {
		const OP: Operation = Operation::PostJson;

		let span = OpSpan::new(OP, "post_json");

		obs::record_outcome(OP, Outcome::Attempt);

		let result = span
			.instrument(async {
				let now = OffsetDateTime::now_utc();

				if token.is_expired_at(now) {
					return Err(RequestError::ExpiredToken { expired_at: token.expires_at });
				}

				let timeout = post.timeout.or(self.default_timeout).map(http::std_timeout);
				let request = build_request(token, post)?;
				let handle = self.http_client.with_deadline(timeout);
				let response = handle
					.call(request)
					.await
					.map_err(|err| self.transport_mapper.map_transport_error(OP, err))?;
				let status = response.status().as_u16();

				span.record_status(status);

				Ok(JsonResponse { status, body: response.into_body() })
			})
			.await;

		obs::record_result(OP, &result);

		result
	}
}
#[cfg(feature = "reqwest")]
impl AuthenticatedRequester<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a requester backed by a default reqwest transport.
	pub fn new() -> Self {
		Self::with_http_client(ReqwestHttpClient::default(), Arc::new(ReqwestTransportErrorMapper))
	}
}
#[cfg(feature = "reqwest")]
impl Default for AuthenticatedRequester<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	fn default() -> Self {
		Self::new()
	}
}
impl<C, M> Clone for AuthenticatedRequester<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			transport_mapper: self.transport_mapper.clone(),
			default_timeout: self.default_timeout,
		}
	}
}
impl<C, M> Debug for AuthenticatedRequester<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthenticatedRequester")
			.field("default_timeout", &self.default_timeout)
			.finish()
	}
}

fn build_request(token: &AccessToken, post: JsonPost) -> Result<HttpRequest, RequestError> {
	if !matches!(post.url.scheme(), "http" | "https") {
		return Err(RequestError::UnsupportedScheme { url: post.url.to_string() });
	}

	Ok(oauth2::http::Request::builder()
		.method(Method::POST)
		.uri(post.url.as_str())
		.header(AUTHORIZATION, token.authorization())
		.header(CONTENT_TYPE, "application/json")
		.header(ACCEPT, "application/json")
		.body(post.body)?)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::ScopeSet;

	fn token(secret: &str, lifetime: Duration) -> AccessToken {
		AccessToken::builder(ScopeSet::messaging())
			.access_token(secret)
			.expires_in(lifetime)
			.build()
			.expect("Token fixture should build.")
	}

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Fixture URL should parse.")
	}

	#[test]
	fn request_carries_bearer_and_json_headers() {
		let post = JsonPost::new(url("https://fcm.googleapis.com/v1/projects/p/messages:send"), "{}");
		let request = build_request(&token("ya29.header", Duration::hours(1)), post)
			.expect("Request should build.");

		assert_eq!(request.method(), &Method::POST);
		assert_eq!(
			request.headers().get(AUTHORIZATION).map(|v| v.as_bytes()),
			Some(&b"Bearer ya29.header"[..])
		);
		assert_eq!(
			request.headers().get(CONTENT_TYPE).map(|v| v.as_bytes()),
			Some(&b"application/json"[..])
		);
		assert_eq!(request.body(), b"{}");
	}

	#[test]
	fn non_http_targets_are_rejected() {
		let post = JsonPost::new(url("ftp://example.com/upload"), "{}");
		let err = build_request(&token("ya29.ftp", Duration::hours(1)), post)
			.expect_err("FTP targets must be rejected.");

		assert!(matches!(err, RequestError::UnsupportedScheme { .. }));
	}

	#[test]
	fn response_helpers_do_not_interpret_status() {
		let not_found = JsonResponse { status: 404, body: br#"{"error":{"code":404}}"#.to_vec() };

		assert!(!not_found.is_success());
		assert_eq!(not_found.body_text(), r#"{"error":{"code":404}}"#);

		let value: serde_json::Value = not_found.json().expect("Body should be JSON.");

		assert_eq!(value["error"]["code"], 404);
		assert!(JsonResponse { status: 200, body: Vec::new() }.is_success());
	}

	#[test]
	fn negative_post_timeouts_clamp() {
		let post = JsonPost::new(url("https://example.com"), Vec::new())
			.with_timeout(Duration::seconds(-1));

		assert_eq!(post.timeout, Some(Duration::ZERO));
	}

	#[cfg(feature = "reqwest")]
	#[tokio::test]
	async fn expired_tokens_never_reach_the_transport() {
		let requester = ReqwestRequester::new();
		let post = JsonPost::new(url("http://127.0.0.1:9/never"), "{}");
		let err = requester
			.post_json(&token("ya29.expired", Duration::seconds(-1)), post)
			.await
			.expect_err("Expired tokens must be rejected.");

		assert!(matches!(err, RequestError::ExpiredToken { .. }));
	}
}
