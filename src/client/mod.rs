//! A typed client for the blog API.
//!
//! Every endpoint has one method on [`ApiClient`]. Requests are authenticated
//! with the [`AuthContext`] the client was built with, and [`PostFeed`] keeps
//! the post list a reader is looking at, including optimistic edits.

mod feed;

pub use feed::{Pagination, PostFeed, Snapshot, PAGE_SIZE};

use reqwest::{multipart, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use crate::{
	error::{ErrorBody, FieldError},
	model::{Category, Id},
	route::{
		auth::model::Profile,
		category::model::CreateCategoryInput,
		info::ApiInfo,
		model::{Data, Listing, Page},
		post::model::{
			CommentInput, CommentView, CreatePostInput, PostQuery, PostView, UpdatePostInput,
			UploadOutput,
		},
	},
	upload,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("request failed: {0}")]
	Http(#[from] reqwest::Error),
	#[error("{message} ({status})")]
	Api {
		status: StatusCode,
		message: String,
		details: Vec<FieldError>,
	},
}

impl Error {
	/// The message shown to a reader, or `fallback` when the server sent none.
	pub fn message_or(&self, fallback: &str) -> String {
		match self {
			Self::Api { message, .. } if !message.is_empty() => message.clone(),
			_ => fallback.to_owned(),
		}
	}
}

/// Who the client is acting as.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthContext {
	#[default]
	Anonymous,
	/// A token issued by the identity provider.
	Bearer(String),
}

impl AuthContext {
	pub fn bearer(token: impl Into<String>) -> Self {
		Self::Bearer(token.into())
	}

	pub fn is_authenticated(&self) -> bool {
		matches!(self, Self::Bearer(..))
	}

	fn apply(&self, request: RequestBuilder) -> RequestBuilder {
		match self {
			Self::Anonymous => request,
			Self::Bearer(token) => request.bearer_auth(token),
		}
	}
}

#[derive(Debug, Clone)]
pub struct ApiClient {
	base_url: String,
	http: reqwest::Client,
	auth: AuthContext,
}

impl ApiClient {
	/// Creates an anonymous client for the server at `base_url`, e.g. `http://localhost:5000`.
	pub fn new(base_url: impl Into<String>) -> Self {
		Self {
			base_url: base_url.into().trim_end_matches('/').to_owned(),
			http: reqwest::Client::new(),
			auth: AuthContext::Anonymous,
		}
	}

	/// Returns a client that sends requests as `auth`.
	#[must_use]
	pub fn with_auth(mut self, auth: AuthContext) -> Self {
		self.auth = auth;
		self
	}

	pub fn auth(&self) -> &AuthContext {
		&self.auth
	}

	fn url(&self, path: &str) -> String {
		format!("{}{path}", self.base_url)
	}

	async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, Error> {
		let response = self.auth.apply(request).send().await?;
		let status = response.status();

		if status.is_success() {
			return Ok(response.json().await?);
		}

		let body = response.json::<ErrorBody>().await.ok();

		tracing::debug!(%status, "request rejected");

		Err(match body {
			Some(body) => Error::Api {
				status,
				message: body.error,
				details: body.details,
			},
			None => Error::Api {
				status,
				message: status
					.canonical_reason()
					.unwrap_or("Request failed")
					.to_owned(),
				details: Vec::new(),
			},
		})
	}

	pub async fn info(&self) -> Result<ApiInfo, Error> {
		self.send(self.http.get(self.url("/"))).await
	}

	pub async fn list_posts(&self, query: &PostQuery) -> Result<Page<PostView>, Error> {
		self.send(self.http.get(self.url("/api/posts")).query(query))
			.await
	}

	/// Fetches a post by id or slug. Each call counts as a view.
	pub async fn get_post(&self, id_or_slug: &str) -> Result<PostView, Error> {
		let response: Data<PostView> = self
			.send(self.http.get(self.url(&format!("/api/posts/{id_or_slug}"))))
			.await?;

		Ok(response.data)
	}

	pub async fn create_post(&self, input: &CreatePostInput) -> Result<PostView, Error> {
		let response: Data<PostView> = self
			.send(self.http.post(self.url("/api/posts")).json(input))
			.await?;

		Ok(response.data)
	}

	pub async fn update_post(&self, id: &Id, input: &UpdatePostInput) -> Result<PostView, Error> {
		let response: Data<PostView> = self
			.send(self.http.put(self.url(&format!("/api/posts/{id}"))).json(input))
			.await?;

		Ok(response.data)
	}

	pub async fn delete_post(&self, id: &Id) -> Result<(), Error> {
		self.send::<serde_json::Value>(self.http.delete(self.url(&format!("/api/posts/{id}"))))
			.await?;

		Ok(())
	}

	pub async fn add_comment(&self, post: &Id, content: &str) -> Result<CommentView, Error> {
		let input = CommentInput {
			content: content.to_owned(),
		};
		let response: Data<CommentView> = self
			.send(
				self.http
					.post(self.url(&format!("/api/posts/{post}/comments")))
					.json(&input),
			)
			.await?;

		Ok(response.data)
	}

	/// Uploads an image to use as a post's featured image.
	pub async fn upload_image(
		&self,
		file_name: &str,
		content_type: &str,
		bytes: Vec<u8>,
	) -> Result<UploadOutput, Error> {
		let part = multipart::Part::bytes(bytes)
			.file_name(file_name.to_owned())
			.mime_str(content_type)?;
		let form = multipart::Form::new().part(upload::FIELD_NAME, part);

		let response: Data<UploadOutput> = self
			.send(self.http.post(self.url("/api/posts/upload")).multipart(form))
			.await?;

		Ok(response.data)
	}

	pub async fn list_categories(&self) -> Result<Vec<Category>, Error> {
		let response: Listing<Category> =
			self.send(self.http.get(self.url("/api/categories"))).await?;

		Ok(response.data)
	}

	pub async fn get_category(&self, id_or_slug: &str) -> Result<Category, Error> {
		let response: Data<Category> = self
			.send(self.http.get(self.url(&format!("/api/categories/{id_or_slug}"))))
			.await?;

		Ok(response.data)
	}

	pub async fn create_category(&self, input: &CreateCategoryInput) -> Result<Category, Error> {
		let response: Data<Category> = self
			.send(self.http.post(self.url("/api/categories")).json(input))
			.await?;

		Ok(response.data)
	}

	/// Fetches the signed-in user.
	pub async fn me(&self) -> Result<Profile, Error> {
		let response: Data<Profile> = self.send(self.http.get(self.url("/api/auth/me"))).await?;

		Ok(response.data)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::test::*;

	#[tokio::test]
	async fn test_anonymous_and_authenticated_requests() {
		let app = LiveApp::spawn().await;
		let anonymous = ApiClient::new(&app.url);

		assert_eq!(anonymous.info().await.unwrap().version, env!("CARGO_PKG_VERSION"));

		let error = anonymous.me().await.unwrap_err();

		assert!(matches!(
			error,
			Error::Api { status, ref message, .. }
				if status == StatusCode::UNAUTHORIZED && message == "Not authorized to access this route"
		));

		let alice = anonymous.with_auth(AuthContext::bearer(TestApp::token(ALICE)));

		assert!(alice.auth().is_authenticated());
		assert_eq!(alice.me().await.unwrap().email, "alice@example.com");
	}

	#[tokio::test]
	async fn test_posts_and_categories() {
		let app = LiveApp::spawn().await;
		let client = ApiClient::new(&app.url).with_auth(AuthContext::bearer(TestApp::token(ALICE)));

		let category = client
			.create_category(&CreateCategoryInput {
				name: "Systems".into(),
				description: Some("Low level things".into()),
				color: Some("#000".into()),
			})
			.await
			.unwrap();

		assert_eq!(client.get_category("systems").await.unwrap().id, category.id);
		assert_eq!(client.list_categories().await.unwrap().len(), 1);

		let post = client
			.create_post(&CreatePostInput {
				title: "Writing a client".into(),
				content: "Requests, responses and errors.".into(),
				excerpt: None,
				category: category.id.to_string(),
				tags: vec!["http".into()],
				is_published: true,
				featured_image: None,
			})
			.await
			.unwrap();

		let comment = client.add_comment(&post.id, "First!").await.unwrap();

		assert_eq!(comment.user.unwrap().name, "Alice");

		let fetched = client.get_post(&post.slug).await.unwrap();

		assert_eq!(fetched.view_count, 1);
		assert_eq!(fetched.comments.len(), 1);

		let page = client
			.list_posts(&PostQuery {
				search: Some("CLIENT".into()),
				..PostQuery::default()
			})
			.await
			.unwrap();

		assert_eq!(page.total, 1);

		let error = client
			.create_post(&CreatePostInput {
				title: "No".into(),
				content: "short".into(),
				excerpt: None,
				category: category.id.to_string(),
				tags: Vec::new(),
				is_published: false,
				featured_image: None,
			})
			.await
			.unwrap_err();

		let Error::Api { status, details, .. } = error else {
			panic!("expected an API error");
		};

		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(details.len(), 2);

		let uploaded = client
			.upload_image("cover.png", "image/png", vec![0x89, b'P', b'N', b'G'])
			.await
			.unwrap();

		assert!(uploaded.filename.ends_with(".png"));

		client.delete_post(&post.id).await.unwrap();

		assert!(client.get_post(&post.slug).await.is_err());
	}
}
