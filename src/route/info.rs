use aide::axum::{routing::get_with, ApiRouter};
use macros::route;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::extract::Json;

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct Endpoints {
	pub posts: String,
	pub categories: String,
	pub auth: String,
	pub docs: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ApiInfo {
	pub success: bool,
	pub message: String,
	pub version: String,
	pub endpoints: Endpoints,
}

pub fn routes<S>() -> ApiRouter<S>
where
	S: Clone + Send + Sync + 'static,
{
	ApiRouter::new().api_route("/", get_with(get_info, get_info_docs))
}

/// API information
/// Lists the version of the server and where each group of endpoints lives.
#[route]
pub async fn get_info() -> Json<ApiInfo> {
	Json(ApiInfo {
		success: true,
		message: "Blog API is running".into(),
		version: env!("CARGO_PKG_VERSION").into(),
		endpoints: Endpoints {
			posts: "/api/posts".into(),
			categories: "/api/categories".into(),
			auth: "/api/auth".into(),
			docs: "/docs".into(),
		},
	})
}
