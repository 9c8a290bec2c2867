//! Verification of bearer tokens issued by an external identity provider.

mod jwt;

pub use jwt::{JwtProvider, VerificationKey};

use serde::{Deserialize, Serialize};

use crate::model::Profile;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("invalid token: {0}")]
	Token(#[from] jsonwebtoken::errors::Error),
	#[error("profile lookup failed: {0}")]
	Lookup(#[from] reqwest::Error),
	#[error("profile of {0} has no email address")]
	MissingEmail(String),
	#[error("unknown subject {0}")]
	UnknownSubject(String),
}

/// The claims of a verified token that are relevant to the blog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
	/// The provider's id for the person.
	pub sub: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub picture: Option<String>,
}

impl Claims {
	/// Builds a profile from the token alone.
	pub fn profile(&self) -> Result<Profile, Error> {
		let email = self
			.email
			.clone()
			.ok_or_else(|| Error::MissingEmail(self.sub.clone()))?;

		Ok(Profile {
			name: self.name.clone().unwrap_or_else(|| default_name(&email)),
			email,
			avatar: self.picture.clone(),
		})
	}
}

/// Falls back to the local part of an email address when no name is known.
fn default_name(email: &str) -> String {
	email.split('@').next().unwrap_or(email).to_owned()
}

/// An external identity provider.
#[axum::async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
	/// Verifies the signature, expiry and issuer of `token`.
	fn verify(&self, token: &str) -> Result<Claims, Error>;

	/// Fetches the profile of the person a verified token was issued to.
	async fn profile(&self, claims: &Claims) -> Result<Profile, Error>;
}
