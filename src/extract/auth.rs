use aide::OperationInput;
use axum::{
	extract::{FromRef, FromRequestParts},
	http::{header, request},
};

use crate::{
	error::RouteError,
	model::User,
	openapi::SECURITY_SCHEME_BEARER,
	route::auth,
	store, Database, Identity,
};

pub const AUTHORIZATION_PREFIX: &str = "Bearer ";

/// Extracts the authenticated user from the request.
///
/// The bearer token is verified with the identity provider. The first time a
/// provider subject is seen, its profile is fetched and a local user is created.
///
/// If the header is missing, a [`auth::Error::MissingToken`] is returned.
/// If the token cannot be verified, a [`auth::Error::Verification`] is returned.
///
/// ```rust,ignore
/// async fn route(auth: Auth) {
///   println!("{:?}", auth.user);
/// }
/// ```
#[derive(Debug)]
pub struct Auth {
	pub user: User,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Auth
where
	Database: FromRef<S>,
	Identity: FromRef<S>,
	S: Sync + Send,
{
	type Rejection = RouteError<auth::Error>;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let header = parts
			.headers
			.get(header::AUTHORIZATION)
			.ok_or(auth::Error::MissingToken)?;

		let token = header
			.to_str()
			.ok()
			.and_then(|value| value.strip_prefix(AUTHORIZATION_PREFIX))
			.map(str::trim)
			.filter(|token| !token.is_empty())
			.ok_or(auth::Error::MalformedHeader)?;

		let identity = Identity::from_ref(state);
		let claims = identity.verify(token).map_err(|error| {
			tracing::debug!(%error, "rejected bearer token");
			auth::Error::Verification
		})?;

		let database = Database::from_ref(state);

		if let Some(user) = database.find_user_by_provider(&claims.sub).await? {
			return Ok(Self { user });
		}

		let profile = identity.profile(&claims).await.map_err(|error| {
			tracing::warn!(%error, subject = %claims.sub, "failed to fetch profile");
			auth::Error::Profile
		})?;

		let user = User::new(claims.sub.clone(), profile);

		match database.insert_user(&user).await {
			Ok(()) => {
				tracing::info!(user = %user.id, subject = %claims.sub, "created user");
				Ok(Self { user })
			}
			// Another request created the user first.
			Err(store::Error::Duplicate {
				field: "providerId",
				..
			}) => database
				.find_user_by_provider(&claims.sub)
				.await?
				.map(|user| Self { user })
				.ok_or_else(|| auth::Error::Profile.into()),
			Err(store::Error::Duplicate { field: "email", .. }) => {
				Err(auth::Error::EmailTaken.into())
			}
			Err(error) => Err(error.into()),
		}
	}
}

impl OperationInput for Auth {
	/// Operation input for the auth extractor.
	///
	/// This adds a bearer token requirement to the `OpenAPI` operation.
	fn operation_input(_ctx: &mut aide::gen::GenContext, operation: &mut aide::openapi::Operation) {
		operation.security.push(
			[(SECURITY_SCHEME_BEARER.to_string(), Vec::new())]
				.into_iter()
				.collect(),
		);
	}
}
