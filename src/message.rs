//! Push message payloads and the `messages:send` endpoint they are posted to.

// self
use crate::{
	_prelude::*,
	auth::{DeviceToken, ProjectId},
	error::ConfigError,
};

/// Visible title and body shown by the device.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
	/// Notification title.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub title: Option<String>,
	/// Notification body text.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub body: Option<String>,
}
impl Notification {
	/// Creates a notification with both title and body.
	pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
		Self { title: Some(title.into()), body: Some(body.into()) }
	}
}

/// Message addressed to one device registration token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
	/// Target registration token.
	pub token: DeviceToken,
	/// Optional display notification.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub notification: Option<Notification>,
	/// Custom key/value payload delivered to the app.
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub data: BTreeMap<String, String>,
}
impl Message {
	/// Creates an empty message for `token`.
	pub fn new(token: DeviceToken) -> Self {
		Self { token, notification: None, data: BTreeMap::new() }
	}

	/// Attaches a display notification.
	pub fn with_notification(mut self, notification: Notification) -> Self {
		self.notification = Some(notification);

		self
	}

	/// Adds one data entry, replacing any previous value for `key`.
	pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.data.insert(key.into(), value.into());

		self
	}

	/// Serializes the `{"message": ...}` envelope expected by `messages:send`.
	pub fn to_json_bytes(&self) -> Result<Vec<u8>, ConfigError> {
		Ok(serde_json::to_vec(&SendRequest { message: self })?)
	}
}

/// Request envelope of the `messages:send` method.
#[derive(Debug, Serialize)]
pub struct SendRequest<'a> {
	/// Message being sent.
	pub message: &'a Message,
}

/// Builds `{endpoint}/v1/projects/{project}/messages:send`.
///
/// A missing trailing slash on `endpoint` is tolerated so path prefixes survive the join.
pub fn messages_send_url(endpoint: &Url, project: &ProjectId) -> Result<Url, ConfigError> {
	let mut base = endpoint.clone();

	if !base.path().ends_with('/') {
		let path = format!("{}/", base.path());

		base.set_path(&path);
	}

	base.join(&format!("v1/projects/{project}/messages:send"))
		.map_err(|source| ConfigError::InvalidEndpoint { source })
}
