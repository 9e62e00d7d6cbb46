//! Service-account credentials, scopes, signed assertions, and access tokens.

pub mod assertion;
pub mod credential;
pub mod id;
pub mod scope;
pub mod token {
	//! Access tokens and the redacted secret they carry.

	pub mod access;
	pub mod secret;
}

pub use assertion::*;
pub use credential::*;
pub use id::*;
pub use scope::*;
pub use token::{access::*, secret::*};
