use aide::axum::{routing::get_with, ApiRouter};
use axum::http::StatusCode;

use crate::{error, AppState};

pub mod model;
pub mod route;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Category not found with id/slug of {0}")]
	UnknownCategory(String),
	#[error("Category with this name already exists")]
	Exists,
}

pub type RouteError = error::RouteError<Error>;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route(
			"/",
			get_with(get_categories, get_categories_docs)
				.post_with(create_category, create_category_docs),
		)
		.api_route("/:id", get_with(get_category, get_category_docs))
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownCategory(..) => StatusCode::NOT_FOUND,
			Self::Exists => StatusCode::BAD_REQUEST,
		}
	}
}

#[cfg(test)]
mod test {
	use serde_json::Value;

	use crate::test::*;

	#[tokio::test]
	async fn test_create_and_get() {
		let app = TestApp::new();

		let response = app
			.server
			.post("/api/categories")
			.add_header(AUTHORIZATION, app.bearer(ALICE))
			.json(&json!({
				"name": "  Web Development ",
				"description": "Everything about the web",
			}))
			.await;

		assert_eq!(response.status_code(), 201);

		let category = response.json::<Value>()["data"].clone();

		assert_eq!(category["name"], "Web Development");
		assert_eq!(category["slug"], "web-development");
		assert_eq!(category["color"], "#667eea");

		let id = category["_id"].as_str().unwrap();

		let by_id = app.server.get(&format!("/api/categories/{id}")).await;
		let by_slug = app.server.get("/api/categories/web-development").await;

		assert_eq!(by_id.json::<Value>()["data"], by_slug.json::<Value>()["data"]);

		let response = app.server.get("/api/categories/nothing-here").await;

		assert_eq!(response.status_code(), 404);
		assert_eq!(
			response.json::<Value>()["error"],
			"Category not found with id/slug of nothing-here"
		);
	}

	#[tokio::test]
	async fn test_duplicate_name() {
		let app = TestApp::new();

		app.category("Rust").await;

		let response = app
			.server
			.post("/api/categories")
			.add_header(AUTHORIZATION, app.bearer(BOB))
			.json(&json!({ "name": "Rust" }))
			.await;

		assert_eq!(response.status_code(), 400);
		assert_eq!(
			response.json::<Value>()["error"],
			"Category with this name already exists"
		);

		let response = app
			.server
			.post("/api/categories")
			.add_header(AUTHORIZATION, app.bearer(BOB))
			.json(&json!({ "name": "Rust!" }))
			.await;

		assert_eq!(response.status_code(), 400);
		assert_eq!(
			response.json::<Value>()["error"],
			"Category with this name already exists"
		);
	}

	#[tokio::test]
	async fn test_list_sorted_by_name() {
		let app = TestApp::new();

		for name in ["Rust", "Go", "Python"] {
			app.category(name).await;
		}

		let response = app.server.get("/api/categories").await;
		let body = response.json::<Value>();
		let names = body["data"]
			.as_array()
			.unwrap()
			.iter()
			.map(|category| category["name"].as_str().unwrap())
			.collect::<Vec<_>>();

		assert_eq!(body["count"], 3);
		assert_eq!(names, ["Go", "Python", "Rust"]);
	}

	#[tokio::test]
	async fn test_list_sorted_bytewise() {
		let app = TestApp::new();

		for name in ["rust", "Zig", "Élan", "Ada"] {
			app.category(name).await;
		}

		let response = app.server.get("/api/categories").await;
		let names = response.json::<Value>()["data"]
			.as_array()
			.unwrap()
			.iter()
			.map(|category| category["name"].as_str().unwrap().to_owned())
			.collect::<Vec<_>>();

		assert_eq!(names, ["Ada", "Zig", "rust", "Élan"]);
	}

	#[tokio::test]
	async fn test_validation() {
		let app = TestApp::new();

		let response = app
			.server
			.post("/api/categories")
			.add_header(AUTHORIZATION, app.bearer(ALICE))
			.json(&json!({ "name": "R", "color": "purple" }))
			.await;

		assert_eq!(response.status_code(), 400);

		let body = response.json::<Value>();

		assert_eq!(body["error"], "Validation failed");
		assert_eq!(
			body["details"],
			json!([
				{
					"field": "color",
					"message": "Color must be a valid hex color (e.g., #667eea or #f0f)",
				},
				{
					"field": "name",
					"message": "Category name must be between 2 and 50 characters",
				},
			])
		);

		for name in ["   ", "  R  "] {
			let response = app
				.server
				.post("/api/categories")
				.add_header(AUTHORIZATION, app.bearer(ALICE))
				.json(&json!({ "name": name }))
				.await;

			assert_eq!(response.status_code(), 400);
			assert_eq!(
				response.json::<Value>()["details"],
				json!([{
					"field": "name",
					"message": "Category name must be between 2 and 50 characters",
				}])
			);
		}

		let response = app
			.server
			.post("/api/categories")
			.add_header(AUTHORIZATION, app.bearer(ALICE))
			.json(&json!({ "name": "  Go  " }))
			.await;

		assert_eq!(response.status_code(), 201);
		assert_eq!(response.json::<Value>()["data"]["name"], "Go");

		let response = app
			.server
			.post("/api/categories")
			.json(&json!({ "name": "Anonymous" }))
			.await;

		assert_eq!(response.status_code(), 401);
	}
}
