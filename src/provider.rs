//! Service-account token provider with an in-memory, single-token cache.
//!
//! [`TokenProvider::obtain_token`] returns the cached token while it is comfortably valid and
//! otherwise performs the JWT-bearer exchange. The cache lives only as long as the provider;
//! nothing is persisted and nothing refreshes in the background. Concurrent callers share a
//! singleflight guard, so one expiry triggers one exchange.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ScopeSet, ServiceAccountKey},
	error::AuthError,
	http::{self, HttpTransport, TransportErrorMapper},
	oauth::JwtBearerExchange,
	obs::{self, OpSpan, Operation, Outcome},
};
#[cfg(feature = "reqwest")]
use crate::http::{ReqwestHttpClient, ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Provider specialized for the crate's default reqwest transport stack.
pub type ReqwestTokenProvider = TokenProvider<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Produces bearer tokens for one service account and one scope set.
pub struct TokenProvider<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client used for the token endpoint.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Credential that signs every assertion.
	pub credential: Arc<ServiceAccountKey>,
	/// Scopes requested for every token.
	pub scope: ScopeSet,
	/// Account to impersonate under domain-wide delegation, if any.
	pub subject: Option<String>,
	/// Cached tokens closer than this to expiry are exchanged again.
	pub refresh_skew: Duration,
	/// Default deadline for each exchange.
	pub timeout: Option<Duration>,
	cache: Arc<RwLock<Option<AccessToken>>>,
	exchange_guard: Arc<AsyncMutex<()>>,
}
impl<C, M> TokenProvider<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Window before expiry in which a cached token is no longer handed out.
	pub const DEFAULT_REFRESH_SKEW: Duration = Duration::seconds(60);

	/// Creates a provider that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		credential: impl Into<Arc<ServiceAccountKey>>,
		scope: ScopeSet,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			credential: credential.into(),
			scope,
			subject: None,
			refresh_skew: Self::DEFAULT_REFRESH_SKEW,
			timeout: None,
			cache: Default::default(),
			exchange_guard: Default::default(),
		}
	}

	/// Requests tokens on behalf of `subject` (domain-wide delegation).
	pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
		self.subject = Some(subject.into());

		self
	}

	/// Overrides the refresh skew (defaults to 60 seconds); negative values clamp to zero.
	pub fn with_refresh_skew(mut self, skew: Duration) -> Self {
		self.refresh_skew = if skew.is_negative() { Duration::ZERO } else { skew };

		self
	}

	/// Sets the default deadline applied to each exchange.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Returns a token whose expiry is strictly in the future, exchanging a new one if needed.
	pub async fn obtain_token(&self) -> Result<AccessToken, AuthError> {
		self.obtain(self.timeout).await
	}

	/// Same as [`obtain_token`](Self::obtain_token) with a per-call deadline.
	pub async fn obtain_token_with_timeout(
		&self,
		timeout: Duration,
	) -> Result<AccessToken, AuthError> {
		self.obtain(Some(timeout)).await
	}

	/// Currently cached token, whatever its state.
	pub fn cached(&self) -> Option<AccessToken> {
		self.cache.read().clone()
	}

	/// Drops the cached token so the next call exchanges again.
	pub fn invalidate(&self) {
		self.cache.write().take();
	}

	/// Determines whether `token` must be replaced at `now`.
	pub fn should_refresh(&self, token: &AccessToken, now: OffsetDateTime) -> bool {
		if token.is_expired_at(now) {
			return true;
		}
		// Tokens granted for no longer than the skew are served until they expire.
		if self.refresh_skew.is_zero() || token.expires_at - token.issued_at <= self.refresh_skew {
			return false;
		}

		token.remaining_at(now) <= self.refresh_skew
	}

	async fn obtain(&self, timeout: Option<Duration>) -> Result<AccessToken, AuthError> {
		const OP: Operation = Operation::TokenExchange;

		if let Some(token) = self.fresh_cached(OffsetDateTime::now_utc()) {
			return Ok(token);
		}

		let span = OpSpan::new(OP, "obtain_token");

		obs::record_outcome(OP, Outcome::Attempt);

		let result = span
			.instrument(async {
				let _singleflight = self.exchange_guard.lock().await;

				// Another caller may have finished the exchange while this one waited.
				if let Some(token) = self.fresh_cached(OffsetDateTime::now_utc()) {
					return Ok::<_, AuthError>(token);
				}

				let token = JwtBearerExchange {
					http_client: self.http_client.as_ref(),
					transport_mapper: self.transport_mapper.as_ref(),
					key: self.credential.as_ref(),
					scope: &self.scope,
					subject: self.subject.as_deref(),
					timeout: timeout.map(http::std_timeout),
				}
				.execute()
				.await?;

				*self.cache.write() = Some(token.clone());

				Ok(token)
			})
			.await;

		obs::record_result(OP, &result);

		result
	}

	fn fresh_cached(&self, now: OffsetDateTime) -> Option<AccessToken> {
		self.cache.read().as_ref().filter(|token| !self.should_refresh(token, now)).cloned()
	}
}
#[cfg(feature = "reqwest")]
impl TokenProvider<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a provider backed by a default reqwest transport.
	pub fn new(credential: impl Into<Arc<ServiceAccountKey>>, scope: ScopeSet) -> Self {
		Self::with_http_client(
			credential,
			scope,
			ReqwestHttpClient::default(),
			Arc::new(ReqwestTransportErrorMapper),
		)
	}
}
impl<C, M> Clone for TokenProvider<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			transport_mapper: self.transport_mapper.clone(),
			credential: self.credential.clone(),
			scope: self.scope.clone(),
			subject: self.subject.clone(),
			refresh_skew: self.refresh_skew,
			timeout: self.timeout,
			cache: self.cache.clone(),
			exchange_guard: self.exchange_guard.clone(),
		}
	}
}
impl<C, M> Debug for TokenProvider<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenProvider")
			.field("client_email", &self.credential.client_email)
			.field("scope", &self.scope)
			.field("subject", &self.subject)
			.field("refresh_skew", &self.refresh_skew)
			.field("timeout", &self.timeout)
			.field("cached", &self.cache.read().is_some())
			.finish()
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;

	const FIXTURE: &str = include_str!("../tests/fixtures/service_account.json");

	fn provider() -> ReqwestTokenProvider {
		let key = ServiceAccountKey::from_json(FIXTURE).expect("Fixture key should parse.");

		TokenProvider::new(key, ScopeSet::messaging())
	}

	fn token(lifetime: Duration, now: OffsetDateTime) -> AccessToken {
		AccessToken::builder(ScopeSet::messaging())
			.access_token("ya29.cached")
			.issued_at(now)
			.expires_in(lifetime)
			.build()
			.expect("Token fixture should build.")
	}

	#[test]
	fn refresh_decision_honors_skew() {
		let now = OffsetDateTime::now_utc();
		let provider = provider();

		assert!(!provider.should_refresh(&token(Duration::minutes(30), now), now));
		assert!(provider.should_refresh(
			&token(Duration::minutes(30), now - Duration::seconds(1_770)),
			now
		));
		assert!(provider.should_refresh(&token(Duration::ZERO, now), now));

		let provider = provider.with_refresh_skew(Duration::seconds(-10));

		assert_eq!(provider.refresh_skew, Duration::ZERO);
		assert!(!provider.should_refresh(&token(Duration::seconds(1), now), now));
	}

	#[test]
	fn lifetimes_inside_the_skew_are_served_until_expiry() {
		let now = OffsetDateTime::now_utc();
		let provider = provider();
		let brief = token(Duration::seconds(30), now);

		assert!(!provider.should_refresh(&brief, now));
		assert!(!provider.should_refresh(&brief, now + Duration::seconds(29)));
		assert!(provider.should_refresh(&brief, now + Duration::seconds(30)));

		*provider.cache.write() = Some(brief);

		assert!(provider.fresh_cached(now).is_some(), "Unexpired short-lived tokens are reused.");
		assert!(provider.fresh_cached(now + Duration::seconds(31)).is_none());
	}

	#[test]
	fn invalidate_clears_the_cache() {
		let provider = provider();

		*provider.cache.write() = Some(token(Duration::hours(1), OffsetDateTime::now_utc()));

		assert!(provider.cached().is_some());
		assert!(provider.clone().cached().is_some(), "Clones share the cache.");

		provider.invalidate();

		assert!(provider.cached().is_none());
	}

	#[tokio::test]
	async fn fresh_cached_token_skips_the_network() {
		let provider = provider();

		*provider.cache.write() = Some(token(Duration::hours(1), OffsetDateTime::now_utc()));

		let token = provider.obtain_token().await.expect("Cached token should be returned.");

		assert_eq!(token.secret.expose(), "ya29.cached");
		assert!(!format!("{provider:?}").contains("ya29"));
	}
}
