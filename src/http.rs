//! Transport primitives shared by the token exchange and authenticated requests.
//!
//! The module exposes [`HttpTransport`], the crate's only dependency on an HTTP stack, plus
//! [`TransportErrorMapper`] which folds transport failures into [`RequestError`]. Every call
//! asks the transport for a fresh handle bound to that call's deadline, so nothing about a
//! deadline outlives the request it was set for.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
use std::time::Duration as StdDuration;
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
// self
use crate::{_prelude::*, error::RequestError, obs::Operation};

/// Abstraction over HTTP transports able to execute one request per handle call.
///
/// Implementations must be `Send + Sync + 'static` so providers and requesters can share
/// them behind `Arc`. The handles they return own whatever state the request needs, which
/// keeps their futures `Send` for the lifetime of the in-flight call.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle bound to a single deadline.
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Builds a handle whose requests give up once `timeout` elapses.
	///
	/// `None` means no deadline beyond whatever the transport enforces on its own. When the
	/// deadline fires the in-flight request must be abandoned and its connection released.
	fn with_deadline(&self, timeout: Option<StdDuration>) -> Self::Handle;
}

/// Maps HTTP transport failures into [`RequestError`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport during `op`.
	fn map_transport_error(&self, op: Operation, error: HttpClientError<E>) -> RequestError;
}

/// Converts a caller deadline into the transport's representation; negatives clamp to zero.
pub fn std_timeout(timeout: Duration) -> StdDuration {
	StdDuration::try_from(timeout).unwrap_or(StdDuration::ZERO)
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestHttpClient {
	type Handle = DeadlineHandle;
	type TransportError = ReqwestError;

	fn with_deadline(&self, timeout: Option<StdDuration>) -> Self::Handle {
		DeadlineHandle { client: self.0.clone(), timeout }
	}
}

/// Handle returned by [`ReqwestHttpClient`]; applies its deadline as reqwest's per-request
/// timeout, which covers connecting, sending, and reading the whole body.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct DeadlineHandle {
	client: ReqwestClient,
	timeout: Option<StdDuration>,
}
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for DeadlineHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = self.client.clone();
		let timeout = self.timeout;

		Box::pin(async move {
			let mut request: reqwest::Request = request.try_into().map_err(Box::new)?;

			*request.timeout_mut() = timeout;

			let response = client.execute(request).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		_op: Operation,
		err: HttpClientError<ReqwestError>,
	) -> RequestError {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(*inner),
			HttpClientError::Http(inner) => inner.into(),
			HttpClientError::Io(inner) => inner.into(),
			HttpClientError::Other(message) =>
				RequestError::connection_failed(std::io::Error::other(message)),
			other => RequestError::connection_failed(std::io::Error::other(other.to_string())),
		}
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(err: ReqwestError) -> RequestError {
	if err.is_timeout() {
		return RequestError::timeout(err);
	}
	if err.is_builder() {
		return RequestError::invalid_request(err);
	}

	RequestError::connection_failed(err)
}
