//! Explicit configuration for [`PushClient`](crate::client::PushClient).
//!
//! Environment access is confined to [`PushConfig::from_env`]; everything else is plain data
//! the caller sets through the builder methods.

// std
use std::{
	env,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{ProjectId, ScopeSet, ServiceAccountKey},
	error::ConfigError,
};

/// Environment variable naming the service-account key file.
pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";
/// Base URL of the production messaging API.
pub const DEFAULT_MESSAGING_ENDPOINT: &str = "https://fcm.googleapis.com/";

/// Where the credential lives and which endpoints and scopes a client talks to.
#[derive(Clone, Debug)]
pub struct PushConfig {
	/// Path of the service-account JSON key.
	pub credentials_path: PathBuf,
	/// Target project; falls back to the credential's `project_id`.
	pub project_id: Option<ProjectId>,
	/// Scopes requested for every token.
	pub scope: ScopeSet,
	/// Base URL the `v1/projects/{project}/messages:send` path is joined onto.
	pub messaging_endpoint: Url,
	/// Replaces the token endpoint named by the credential.
	pub token_endpoint: Option<Url>,
	/// Deadline applied to both the token exchange and the send.
	pub timeout: Option<Duration>,
}
impl PushConfig {
	/// Creates a configuration for the key at `credentials_path` with production defaults.
	pub fn new(credentials_path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
		let messaging_endpoint = Url::parse(DEFAULT_MESSAGING_ENDPOINT)
			.map_err(|source| ConfigError::InvalidEndpoint { source })?;

		Ok(Self {
			credentials_path: credentials_path.into(),
			project_id: None,
			scope: ScopeSet::messaging(),
			messaging_endpoint,
			token_endpoint: None,
			timeout: None,
		})
	}

	/// Reads the key path from `GOOGLE_APPLICATION_CREDENTIALS`.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_env_with(|var| env::var(var).ok())
	}

	/// Same as [`from_env`](Self::from_env) with a caller-supplied variable lookup.
	pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
		let path = lookup(CREDENTIALS_ENV)
			.filter(|value| !value.trim().is_empty())
			.ok_or(ConfigError::MissingEnv { var: CREDENTIALS_ENV })?;

		Self::new(path)
	}

	/// Targets `project_id` instead of the credential's project.
	pub fn with_project_id(mut self, project_id: ProjectId) -> Self {
		self.project_id = Some(project_id);

		self
	}

	/// Requests `scope` instead of the messaging scope.
	pub fn with_scope(mut self, scope: ScopeSet) -> Self {
		self.scope = scope;

		self
	}

	/// Points sends at another messaging base URL (e.g. an emulator).
	pub fn with_messaging_endpoint(mut self, endpoint: Url) -> Self {
		self.messaging_endpoint = endpoint;

		self
	}

	/// Overrides the token endpoint named by the credential.
	pub fn with_token_endpoint(mut self, endpoint: Url) -> Self {
		self.token_endpoint = Some(endpoint);

		self
	}

	/// Sets the per-operation deadline.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Path of the configured key file.
	pub fn credentials_path(&self) -> &Path {
		&self.credentials_path
	}

	/// Loads the key file and applies the token endpoint override.
	///
	/// Never touches the network.
	pub fn load_credential(&self) -> Result<ServiceAccountKey> {
		let key = ServiceAccountKey::from_file(&self.credentials_path)?;

		Ok(match &self.token_endpoint {
			Some(endpoint) => key.with_token_uri(endpoint.clone()),
			None => key,
		})
	}

	/// Explicit project, else the credential's, else [`ConfigError::MissingProjectId`].
	pub fn resolve_project_id(&self, key: &ServiceAccountKey) -> Result<ProjectId, ConfigError> {
		self.project_id.clone().or_else(|| key.project_id.clone()).ok_or(ConfigError::MissingProjectId)
	}
}
