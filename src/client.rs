//! One-call push sends: token exchange followed by the authenticated POST.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ProjectId},
	config::PushConfig,
	http::{HttpTransport, TransportErrorMapper},
	message::{self, Message},
	provider::TokenProvider,
	requester::{AuthenticatedRequester, JsonPost, JsonResponse},
};
#[cfg(feature = "reqwest")]
use crate::http::{ReqwestHttpClient, ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport stack.
pub type ReqwestPushClient = PushClient<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Sends messages to one project's `messages:send` endpoint.
///
/// The response is returned as received; a 4xx or 5xx from the messaging service is an
/// `Ok` value the caller inspects.
pub struct PushClient<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Token source shared by every send.
	pub provider: TokenProvider<C, M>,
	/// Performs the authenticated POST.
	pub requester: AuthenticatedRequester<C, M>,
	project_id: ProjectId,
	send_url: Url,
}
impl<C, M> PushClient<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Assembles a client from an existing provider and requester.
	pub fn with_parts(
		provider: TokenProvider<C, M>,
		requester: AuthenticatedRequester<C, M>,
		project_id: ProjectId,
		messaging_endpoint: &Url,
	) -> Result<Self> {
		let send_url = message::messages_send_url(messaging_endpoint, &project_id)?;

		Ok(Self { provider, requester, project_id, send_url })
	}

	/// Builds a client from `config` over a caller-provided transport.
	///
	/// Loading the credential never touches the network.
	pub fn from_config_with_http_client(
		config: &PushConfig,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Result<Self> {
		let key = config.load_credential()?;
		let project_id = config.resolve_project_id(&key)?;
		let http_client = http_client.into();
		let mapper = mapper.into();
		let mut provider = TokenProvider::<C, M>::with_http_client(
			key,
			config.scope.clone(),
			http_client.clone(),
			mapper.clone(),
		);
		let mut requester = AuthenticatedRequester::<C, M>::with_http_client(http_client, mapper);

		if let Some(timeout) = config.timeout {
			provider = provider.with_timeout(timeout);
			requester = requester.with_default_timeout(timeout);
		}

		Self::with_parts(provider, requester, project_id, &config.messaging_endpoint)
	}

	/// Project every message is sent to.
	pub fn project_id(&self) -> &ProjectId {
		&self.project_id
	}

	/// Fully resolved `messages:send` URL.
	pub fn send_url(&self) -> &Url {
		&self.send_url
	}

	/// Obtains a token (cached when still fresh).
	pub async fn token(&self) -> Result<AccessToken> {
		Ok(self.provider.obtain_token().await?)
	}

	/// Serializes `message` into the send envelope and posts it.
	pub async fn send(&self, message: &Message) -> Result<JsonResponse> {
		let body = message.to_json_bytes()?;

		self.send_raw(body).await
	}

	/// Posts caller-provided JSON bytes verbatim.
	pub async fn send_raw(&self, body: impl Into<Vec<u8>>) -> Result<JsonResponse> {
		let token = self.token().await?;
		let post = JsonPost::new(self.send_url.clone(), body);

		Ok(self.requester.post_json(&token, post).await?)
	}
}
#[cfg(feature = "reqwest")]
impl PushClient<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Builds a client from `config` over a default reqwest transport.
	pub fn from_config(config: &PushConfig) -> Result<Self> {
		Self::from_config_with_http_client(
			config,
			ReqwestHttpClient::default(),
			ReqwestTransportErrorMapper,
		)
	}
}
impl<C, M> Clone for PushClient<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			provider: self.provider.clone(),
			requester: self.requester.clone(),
			project_id: self.project_id.clone(),
			send_url: self.send_url.clone(),
		}
	}
}
impl<C, M> Debug for PushClient<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PushClient")
			.field("project_id", &self.project_id)
			.field("send_url", &self.send_url.as_str())
			.field("provider", &self.provider)
			.finish()
	}
}
