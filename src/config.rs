//! Server configuration, read from environment variables.

use std::{net::IpAddr, path::PathBuf, str::FromStr};

use crate::identity::VerificationKey;

pub const DEFAULT_IDENTITY_API_URL: &str = "https://api.clerk.com/v1";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("one of {0} must be set")]
	Missing(&'static str),
	#[error("{key} has an invalid value: {value:?}")]
	Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
	pub host: IpAddr,
	pub port: u16,
	/// Posts, categories and users are kept in memory when this is not set.
	pub database_url: Option<String>,
	pub database_max_connections: u32,
	pub uploads_dir: PathBuf,
	pub max_upload_bytes: usize,
	pub identity_key: VerificationKey,
	pub identity_issuer: Option<String>,
	pub identity_api_url: String,
	/// Profiles are read from token claims when this is not set.
	pub identity_api_key: Option<String>,
}

impl Config {
	/// Reads the configuration from the process environment.
	pub fn from_env() -> Result<Self, Error> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Reads the configuration using `lookup` to resolve each variable.
	/// Empty values are treated as unset.
	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
		let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

		let identity_key = match (
			get("IDENTITY_JWT_PUBLIC_KEY"),
			get("IDENTITY_JWT_SECRET"),
		) {
			// Keys in a single-line .env value carry escaped newlines.
			(Some(pem), _) => VerificationKey::RsaPem(pem.replace("\\n", "\n")),
			(None, Some(secret)) => VerificationKey::Secret(secret),
			(None, None) => {
				return Err(Error::Missing(
					"IDENTITY_JWT_PUBLIC_KEY or IDENTITY_JWT_SECRET",
				))
			}
		};

		Ok(Self {
			host: parse(&get, "HOST")?.unwrap_or(IpAddr::from([127, 0, 0, 1])),
			port: parse(&get, "PORT")?.unwrap_or(5000),
			database_url: get("DATABASE_URL"),
			database_max_connections: parse(&get, "DATABASE_MAX_CONNECTIONS")?.unwrap_or(10),
			uploads_dir: get("UPLOADS_DIR").map_or_else(|| PathBuf::from("uploads"), PathBuf::from),
			max_upload_bytes: parse(&get, "MAX_UPLOAD_BYTES")?.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
			identity_key,
			identity_issuer: get("IDENTITY_ISSUER"),
			identity_api_url: get("IDENTITY_API_URL")
				.unwrap_or_else(|| DEFAULT_IDENTITY_API_URL.to_owned()),
			identity_api_key: get("IDENTITY_API_KEY"),
		})
	}
}

fn parse<T: FromStr>(
	get: &impl Fn(&str) -> Option<String>,
	key: &'static str,
) -> Result<Option<T>, Error> {
	get(key)
		.map(|value| {
			value
				.trim()
				.parse()
				.map_err(|_| Error::Invalid { key, value })
		})
		.transpose()
}

#[cfg(test)]
mod test {
	use std::collections::HashMap;

	use super::*;

	fn config(vars: &[(&str, &str)]) -> Result<Config, Error> {
		let vars = vars
			.iter()
			.map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
			.collect::<HashMap<_, _>>();

		Config::from_lookup(|key| vars.get(key).cloned())
	}

	#[test]
	fn test_defaults() {
		let config = config(&[("IDENTITY_JWT_SECRET", "secret")]).unwrap();

		assert_eq!(config.host, IpAddr::from([127, 0, 0, 1]));
		assert_eq!(config.port, 5000);
		assert_eq!(config.database_url, None);
		assert_eq!(config.database_max_connections, 10);
		assert_eq!(config.uploads_dir, PathBuf::from("uploads"));
		assert_eq!(config.max_upload_bytes, 5 * 1024 * 1024);
		assert_eq!(config.identity_api_url, DEFAULT_IDENTITY_API_URL);
		assert!(config.identity_api_key.is_none());
		assert!(matches!(config.identity_key, VerificationKey::Secret(ref secret) if secret == "secret"));
	}

	#[test]
	fn test_overrides() {
		let config = config(&[
			("HOST", "0.0.0.0"),
			("PORT", "8080"),
			("DATABASE_URL", "postgres://localhost/blog"),
			("UPLOADS_DIR", "/var/blog/uploads"),
			("MAX_UPLOAD_BYTES", "1024"),
			("IDENTITY_JWT_PUBLIC_KEY", "-----BEGIN PUBLIC KEY-----\\nabc"),
			("IDENTITY_JWT_SECRET", "ignored"),
			("IDENTITY_API_KEY", ""),
		])
		.unwrap();

		assert_eq!(config.host, IpAddr::from([0, 0, 0, 0]));
		assert_eq!(config.port, 8080);
		assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/blog"));
		assert_eq!(config.uploads_dir, PathBuf::from("/var/blog/uploads"));
		assert_eq!(config.max_upload_bytes, 1024);
		assert!(config.identity_api_key.is_none());
		assert!(
			matches!(config.identity_key, VerificationKey::RsaPem(ref pem) if pem == "-----BEGIN PUBLIC KEY-----\nabc")
		);
	}

	#[test]
	fn test_errors() {
		assert!(matches!(config(&[]), Err(Error::Missing(..))));
		assert!(matches!(
			config(&[("IDENTITY_JWT_SECRET", "secret"), ("PORT", "http")]),
			Err(Error::Invalid { key: "PORT", .. })
		));
	}
}
