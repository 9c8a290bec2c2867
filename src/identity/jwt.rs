use std::fmt;

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use reqwest::StatusCode;
use serde::Deserialize;

use super::{Claims, Error, IdentityProvider};
use crate::model::Profile;

const MAX_NAME_LENGTH: usize = 50;

/// The key used to verify token signatures.
#[derive(Clone)]
pub enum VerificationKey {
	/// An RSA public key in PEM format, for RS256 tokens.
	RsaPem(String),
	/// A shared secret, for HS256 tokens.
	Secret(String),
}

impl fmt::Debug for VerificationKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::RsaPem(..) => f.write_str("RsaPem(..)"),
			Self::Secret(..) => f.write_str("Secret(..)"),
		}
	}
}

#[derive(Deserialize)]
struct ApiEmailAddress {
	id: String,
	email_address: String,
}

/// A user as returned by the provider's user API.
#[derive(Deserialize)]
struct ApiUser {
	first_name: Option<String>,
	last_name: Option<String>,
	username: Option<String>,
	image_url: Option<String>,
	primary_email_address_id: Option<String>,
	#[serde(default)]
	email_addresses: Vec<ApiEmailAddress>,
}

impl ApiUser {
	fn into_profile(self, subject: &str) -> Result<Profile, Error> {
		let primary = self.primary_email_address_id.as_deref();
		let email = self
			.email_addresses
			.iter()
			.find(|address| Some(address.id.as_str()) == primary)
			.or_else(|| self.email_addresses.first())
			.map(|address| address.email_address.clone())
			.ok_or_else(|| Error::MissingEmail(subject.to_owned()))?;

		let full_name = [self.first_name.as_deref(), self.last_name.as_deref()]
			.into_iter()
			.flatten()
			.filter(|part| !part.trim().is_empty())
			.collect::<Vec<_>>()
			.join(" ");

		let name = if full_name.is_empty() {
			self.username
				.filter(|username| !username.is_empty())
				.unwrap_or_else(|| super::default_name(&email))
		} else {
			full_name
		};

		Ok(Profile {
			name: name.chars().take(MAX_NAME_LENGTH).collect(),
			email,
			avatar: self.image_url,
		})
	}
}

struct ProfileApi {
	client: reqwest::Client,
	url: String,
	key: String,
}

/// Verifies JSON Web Tokens locally and optionally resolves profiles
/// through the provider's user API.
pub struct JwtProvider {
	key: DecodingKey,
	validation: Validation,
	api: Option<ProfileApi>,
}

impl JwtProvider {
	pub fn new(key: &VerificationKey, issuer: Option<&str>) -> Result<Self, Error> {
		let (key, algorithm) = match key {
			VerificationKey::RsaPem(pem) => {
				(DecodingKey::from_rsa_pem(pem.as_bytes())?, Algorithm::RS256)
			}
			VerificationKey::Secret(secret) => {
				(DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256)
			}
		};

		let mut validation = Validation::new(algorithm);
		validation.validate_aud = false;

		if let Some(issuer) = issuer {
			validation.set_issuer(&[issuer]);
		}

		Ok(Self {
			key,
			validation,
			api: None,
		})
	}

	/// Fetches profiles from `{url}/users/{subject}` using `key` as a bearer token.
	#[must_use]
	pub fn with_profile_api(mut self, url: impl Into<String>, key: impl Into<String>) -> Self {
		self.api = Some(ProfileApi {
			client: reqwest::Client::new(),
			url: url.into().trim_end_matches('/').to_owned(),
			key: key.into(),
		});

		self
	}
}

#[axum::async_trait]
impl IdentityProvider for JwtProvider {
	fn verify(&self, token: &str) -> Result<Claims, Error> {
		Ok(decode::<Claims>(token, &self.key, &self.validation)?.claims)
	}

	async fn profile(&self, claims: &Claims) -> Result<Profile, Error> {
		let Some(api) = &self.api else {
			return claims.profile();
		};

		let response = api
			.client
			.get(format!("{}/users/{}", api.url, claims.sub))
			.bearer_auth(&api.key)
			.send()
			.await?;

		if response.status() == StatusCode::NOT_FOUND {
			return Err(Error::UnknownSubject(claims.sub.clone()));
		}

		let user = response.error_for_status()?.json::<ApiUser>().await?;

		tracing::debug!(subject = %claims.sub, "fetched profile from identity provider");

		user.into_profile(&claims.sub)
	}
}

#[cfg(test)]
mod test {
	use axum::{extract::Path, http::HeaderMap, routing::get, Json, Router};
	use chrono::{Duration, Utc};
	use jsonwebtoken::{encode, EncodingKey, Header};
	use serde::Serialize;
	use serde_json::json;

	use super::*;

	const SECRET: &str = "test-secret";

	#[derive(Serialize)]
	struct TestClaims<'a> {
		sub: &'a str,
		email: &'a str,
		iss: &'a str,
		exp: i64,
	}

	fn token(secret: &str, iss: &str, expires_in: Duration) -> String {
		encode(
			&Header::default(),
			&TestClaims {
				sub: "user_1",
				email: "ada@example.com",
				iss,
				exp: (Utc::now() + expires_in).timestamp(),
			},
			&EncodingKey::from_secret(secret.as_bytes()),
		)
		.unwrap()
	}

	fn provider() -> JwtProvider {
		JwtProvider::new(&VerificationKey::Secret(SECRET.into()), Some("https://issuer.test")).unwrap()
	}

	#[test]
	fn test_verify() {
		let claims = provider()
			.verify(&token(SECRET, "https://issuer.test", Duration::hours(1)))
			.unwrap();

		assert_eq!(claims.sub, "user_1");
		assert_eq!(claims.email.as_deref(), Some("ada@example.com"));
	}

	#[test]
	fn test_verify_rejects() {
		let provider = provider();

		assert!(provider
			.verify(&token(SECRET, "https://issuer.test", -Duration::hours(1)))
			.is_err());
		assert!(provider
			.verify(&token("another-secret", "https://issuer.test", Duration::hours(1)))
			.is_err());
		assert!(provider
			.verify(&token(SECRET, "https://elsewhere.test", Duration::hours(1)))
			.is_err());
		assert!(provider.verify("not a token").is_err());
	}

	#[test]
	fn test_debug_is_redacted() {
		let key = VerificationKey::Secret(SECRET.into());

		assert!(!format!("{key:?}").contains(SECRET));
	}

	#[tokio::test]
	async fn test_profile_from_claims() {
		let provider = provider();
		let claims = provider
			.verify(&token(SECRET, "https://issuer.test", Duration::hours(1)))
			.unwrap();

		let profile = provider.profile(&claims).await.unwrap();

		assert_eq!(profile.email, "ada@example.com");
		assert_eq!(profile.name, "ada");
	}

	#[tokio::test]
	async fn test_profile_from_api() {
		async fn user(Path(id): Path<String>, headers: HeaderMap) -> Json<serde_json::Value> {
			assert_eq!(headers["authorization"], "Bearer sk_test");

			Json(json!({
				"id": id,
				"first_name": "Ada",
				"last_name": "Lovelace",
				"username": null,
				"image_url": "https://img.example.com/ada.png",
				"primary_email_address_id": "idn_2",
				"email_addresses": [
					{ "id": "idn_1", "email_address": "old@example.com" },
					{ "id": "idn_2", "email_address": "ada@example.com" },
				],
			}))
		}

		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let address = listener.local_addr().unwrap();

		tokio::spawn(async move {
			axum::serve(listener, Router::new().route("/v1/users/:id", get(user)))
				.await
				.unwrap();
		});

		let provider = provider().with_profile_api(format!("http://{address}/v1/"), "sk_test");
		let claims = Claims {
			sub: "user_1".into(),
			email: None,
			name: None,
			picture: None,
		};

		assert_eq!(
			provider.profile(&claims).await.unwrap(),
			Profile {
				name: "Ada Lovelace".into(),
				email: "ada@example.com".into(),
				avatar: Some("https://img.example.com/ada.png".into()),
			}
		);

		let unknown = Claims {
			sub: "missing/user".into(),
			..claims
		};

		assert!(matches!(
			provider.profile(&unknown).await,
			Err(Error::UnknownSubject(..))
		));
	}
}
