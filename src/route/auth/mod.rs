use aide::axum::{routing::get_with, ApiRouter};
use axum::http::StatusCode;

use crate::{error, AppState};

pub mod model;
pub mod route;

/// An error that can occur during authentication.
///
/// Note that the messages are presented to the client, so they should not contain
/// sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Not authorized to access this route")]
	MissingToken,
	#[error("Authorization header must use the Bearer scheme")]
	MalformedHeader,
	#[error("Invalid or expired token")]
	Verification,
	#[error("Could not resolve the user profile")]
	Profile,
	#[error("A user with this email already exists")]
	EmailTaken,
}

pub type RouteError = error::RouteError<Error>;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new().api_route("/me", get_with(get_me, get_me_docs))
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		StatusCode::UNAUTHORIZED
	}
}
