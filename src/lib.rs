#![warn(clippy::pedantic)]

pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod identity;
pub mod model;
pub mod openapi;
pub mod route;
pub mod slug;
pub mod store;
pub mod trace;
pub mod upload;

#[cfg(test)]
mod test;

use std::sync::Arc;

use aide::{axum::ApiRouter, openapi::OpenApi};
use axum::{extract::DefaultBodyLimit, http::Uri, Extension, Router};
use tower::ServiceBuilder;
use tower_http::{
	compression::CompressionLayer,
	cors::CorsLayer,
	request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
	services::ServeDir,
	trace::TraceLayer,
};

pub use error::AppError;

use crate::{identity::IdentityProvider, store::Store, upload::Uploads};

pub type Database = Arc<dyn Store>;
pub type Identity = Arc<dyn IdentityProvider>;
pub type AppState = State;

/// Multipart framing around an uploaded file.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// The shared application state.
///
/// This should contain all shared dependencies that handlers need to access,
/// such as the document store or the identity provider.
#[derive(Clone, axum::extract::FromRef)]
pub struct State {
	pub database: Database,
	pub identity: Identity,
	pub uploads: Uploads,
}

async fn fallback(uri: Uri) -> AppError {
	AppError::UnknownRoute(
		uri.path_and_query()
			.map_or_else(|| uri.path().to_owned(), ToString::to_string),
	)
}

/// Builds the HTTP application: the JSON API, its documentation, uploaded files
/// and the request middleware.
pub fn app(state: State) -> Router {
	let mut api = OpenApi::default();
	let body_limit = state.uploads.max_bytes + MULTIPART_OVERHEAD;
	let uploads = ServeDir::new(&state.uploads.dir);

	ApiRouter::new()
		.merge(route::info::routes())
		.nest("/api/posts", route::post::routes())
		.nest("/api/categories", route::category::routes())
		.nest("/api/auth", route::auth::routes())
		.nest("/docs", route::docs::routes())
		.finish_api_with(&mut api, openapi::docs)
		.nest_service(upload::URL_PREFIX, uploads)
		.fallback(fallback)
		.layer(Extension(Arc::new(api)))
		.layer(DefaultBodyLimit::max(body_limit))
		.layer(
			ServiceBuilder::new()
				.layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
				.layer(TraceLayer::new_for_http())
				.layer(PropagateRequestIdLayer::x_request_id())
				.layer(CorsLayer::permissive())
				.layer(CompressionLayer::new()),
		)
		.with_state(state)
}
