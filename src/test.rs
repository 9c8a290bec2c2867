//! Helpers shared by the HTTP tests.

use std::sync::Arc;

use axum::{http::HeaderValue, Router};
use axum_test::TestServer;
use jsonwebtoken::{encode, EncodingKey, Header};
use tempfile::TempDir;

pub use axum::http::header::AUTHORIZATION;
pub use serde_json::json;

use crate::{
	identity::{JwtProvider, VerificationKey},
	model::{Profile, Role, User},
	store::MemoryStore,
	upload::Uploads,
	Database, State,
};

const SECRET: &str = "test-secret";
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// A person known to the identity provider.
#[derive(Debug, Clone, Copy)]
pub struct Who {
	pub subject: &'static str,
	pub name: &'static str,
	pub email: Option<&'static str>,
}

pub const ALICE: Who = Who {
	subject: "user_alice",
	name: "Alice",
	email: Some("alice@example.com"),
};

pub const BOB: Who = Who {
	subject: "user_bob",
	name: "Bob",
	email: Some("bob@example.com"),
};

pub const CAROL: Who = Who {
	subject: "user_carol",
	name: "Carol",
	email: Some("carol@example.com"),
};

pub const NO_EMAIL: Who = Who {
	subject: "user_anonymous",
	name: "Anonymous",
	email: None,
};

pub struct TestApp {
	pub server: TestServer,
	pub database: Database,
	pub uploads: TempDir,
}

/// Builds the application around an empty in-memory store and a temporary uploads directory.
fn app() -> (Router, Database, TempDir) {
	let database: Database = Arc::new(MemoryStore::new());
	let uploads = tempfile::tempdir().unwrap();
	let identity = JwtProvider::new(&VerificationKey::Secret(SECRET.into()), None).unwrap();

	let app = crate::app(State {
		database: database.clone(),
		identity: Arc::new(identity),
		uploads: Uploads::new(uploads.path(), MAX_UPLOAD_BYTES),
	});

	(app, database, uploads)
}

/// The application served on an ephemeral local port, for tests that go through a real HTTP client.
pub struct LiveApp {
	pub url: String,
	_uploads: TempDir,
}

impl LiveApp {
	pub async fn spawn() -> Self {
		let (app, _, uploads) = app();
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let address = listener.local_addr().unwrap();

		tokio::spawn(async move { axum::serve(listener, app).await });

		Self {
			url: format!("http://{address}"),
			_uploads: uploads,
		}
	}
}

impl TestApp {
	pub fn new() -> Self {
		let (app, database, uploads) = app();

		Self {
			server: TestServer::new(app).unwrap(),
			database,
			uploads,
		}
	}

	/// Signs a token for `who` that expires in an hour.
	pub fn token(who: Who) -> String {
		let exp = chrono::Utc::now().timestamp() + 3600;

		encode(
			&Header::default(),
			&json!({
				"sub": who.subject,
				"name": who.name,
				"email": who.email,
				"exp": exp,
			}),
			&EncodingKey::from_secret(SECRET.as_bytes()),
		)
		.unwrap()
	}

	pub fn bearer(&self, who: Who) -> HeaderValue {
		HeaderValue::from_str(&format!("Bearer {}", Self::token(who))).unwrap()
	}

	/// Registers `who` as an admin before their first request.
	pub async fn admin(&self, who: Who) {
		let mut user = User::new(
			who.subject.into(),
			Profile {
				name: who.name.into(),
				email: who.email.unwrap().into(),
				avatar: None,
			},
		);

		user.role = Role::Admin;
		self.database.insert_user(&user).await.unwrap();
	}

	/// Creates a category as Alice and returns its id.
	pub async fn category(&self, name: &str) -> String {
		let response = self
			.server
			.post("/api/categories")
			.add_header(AUTHORIZATION, self.bearer(ALICE))
			.json(&json!({ "name": name }))
			.await;

		assert_eq!(response.status_code(), 201);
		response.json::<serde_json::Value>()["data"]["_id"]
			.as_str()
			.unwrap()
			.to_owned()
	}

	/// Creates a post by `who` and returns its id.
	pub async fn post(&self, who: Who, category: &str, title: &str, published: bool) -> String {
		let response = self
			.server
			.post("/api/posts")
			.add_header(AUTHORIZATION, self.bearer(who))
			.json(&json!({
				"title": title,
				"content": format!("The content of {title}."),
				"category": category,
				"isPublished": published,
			}))
			.await;

		assert_eq!(response.status_code(), 201);
		response.json::<serde_json::Value>()["data"]["_id"]
			.as_str()
			.unwrap()
			.to_owned()
	}
}

#[tokio::test]
async fn test_unknown_route() {
	let app = TestApp::new();
	let response = app.server.get("/api/nothing?page=2").await;

	assert_eq!(response.status_code(), 404);
	assert_eq!(
		response.json::<serde_json::Value>(),
		json!({ "success": false, "error": "Route /api/nothing?page=2 not found" })
	);
}

#[tokio::test]
async fn test_api_info() {
	let app = TestApp::new();
	let response = app.server.get("/").await;

	assert_eq!(response.status_code(), 200);

	let body = response.json::<serde_json::Value>();

	assert_eq!(body["success"], true);
	assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
	assert_eq!(body["endpoints"]["posts"], "/api/posts");
}

#[tokio::test]
async fn test_openapi_document() {
	let app = TestApp::new();
	let response = app.server.get("/docs/private/api.json").await;

	assert_eq!(response.status_code(), 200);

	let body = response.json::<serde_json::Value>();

	assert_eq!(body["info"]["title"], "Blog API");
	assert!(body["paths"]["/api/posts/{id}"].is_object());
	assert!(body["components"]["securitySchemes"]["Bearer"].is_object());
}

#[tokio::test]
async fn test_request_id_is_propagated() {
	let app = TestApp::new();
	let response = app.server.get("/api/categories").await;

	assert!(response.headers().contains_key("x-request-id"));
}
