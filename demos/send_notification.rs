//! Sends one notification to a device using the key named by `GOOGLE_APPLICATION_CREDENTIALS`.
//!
//! ```sh
//! GOOGLE_APPLICATION_CREDENTIALS=key.json \
//!     cargo run --example send_notification -- <device-token> [title] [body] [key=value...]
//! ```
//!
//! The target project comes from the key file unless `PUSH_PROJECT_ID` is set.

// std
use std::env;
// crates.io
use color_eyre::{Result, eyre::eyre};
use time::Duration;
// self
use oauth2_push::{
	auth::{DeviceToken, ProjectId},
	client::PushClient,
	config::PushConfig,
	message::{Message, Notification},
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let mut args = env::args().skip(1);
	let device = args
		.next()
		.ok_or_else(|| eyre!("usage: send_notification <device-token> [title] [body] [key=value...]"))?;
	let title = args.next().unwrap_or_else(|| "Broadcast Message".into());
	let body = args.next().unwrap_or_else(|| "Hello".into());
	let mut message = Message::new(DeviceToken::new(device)?)
		.with_notification(Notification::new(title, body));

	for pair in args {
		let (key, value) =
			pair.split_once('=').ok_or_else(|| eyre!("data entries must look like key=value"))?;

		message = message.with_data(key, value);
	}

	let mut config = PushConfig::from_env()?.with_timeout(Duration::seconds(30));

	if let Ok(project) = env::var("PUSH_PROJECT_ID") {
		config = config.with_project_id(ProjectId::new(project)?);
	}

	let client = PushClient::from_config(&config)?;
	let token = client.token().await?;

	println!("OAuth2 Access Token: {}", token.secret.expose());

	let response = client.send(&message).await?;

	println!("Push Response Code: {}", response.status);
	println!("{}", response.body_text());

	Ok(())
}
