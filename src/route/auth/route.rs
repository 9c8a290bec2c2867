use macros::route;

use crate::{extract::Auth, extract::Json, openapi::tag, route::model::Data};

use super::model;

/// Get user
/// Returns the authenticated user. The user is created from the identity provider's
/// profile the first time their token is seen.
#[route(tag = tag::AUTH, secure)]
pub async fn get_me(auth: Auth) -> Json<Data<model::Profile>> {
	Json(Data::new(auth.user.into()))
}
