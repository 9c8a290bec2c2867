use std::collections::HashMap;

use aide::axum::{
	routing::{get_with, post_with},
	ApiRouter,
};
use axum::http::StatusCode;

use crate::{error, model::Id, model::Post, store, AppState, Database};

pub mod model;
pub mod route;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Post not found with id/slug of {0}")]
	UnknownPost(String),
	#[error("Post not found with id of {0}")]
	UnknownPostId(Id),
	#[error("Category not found with id of {0}")]
	UnknownCategory(Id),
	#[error("Category must be a valid id")]
	InvalidCategory,
	#[error("Not authorized to {0} this post")]
	Forbidden(&'static str),
	#[error("Comment content is required")]
	EmptyComment,
}

pub type RouteError = error::RouteError<Error>;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route(
			"/",
			get_with(get_posts, get_posts_docs).post_with(create_post, create_post_docs),
		)
		.api_route("/upload", post_with(upload_image, upload_image_docs))
		.api_route(
			"/:id",
			get_with(get_post, get_post_docs)
				.put_with(update_post, update_post_docs)
				.delete_with(delete_post, delete_post_docs),
		)
		.api_route("/:id/comments", post_with(add_comment, add_comment_docs))
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownPost(..) | Self::UnknownPostId(..) | Self::UnknownCategory(..) => {
				StatusCode::NOT_FOUND
			}
			Self::Forbidden(..) => StatusCode::FORBIDDEN,
			Self::InvalidCategory | Self::EmptyComment => StatusCode::BAD_REQUEST,
		}
	}
}

/// Fills in the authors, categories and commenters of `posts`.
async fn populate(database: &Database, posts: Vec<Post>) -> store::Result<Vec<model::PostView>> {
	let mut user_ids = posts
		.iter()
		.flat_map(|post| {
			std::iter::once(&post.author).chain(post.comments.iter().map(|comment| &comment.user))
		})
		.cloned()
		.collect::<Vec<_>>();
	let mut category_ids = posts
		.iter()
		.map(|post| post.category.clone())
		.collect::<Vec<_>>();

	user_ids.sort_unstable();
	user_ids.dedup();
	category_ids.sort_unstable();
	category_ids.dedup();

	let users = database
		.find_users(&user_ids)
		.await?
		.into_iter()
		.map(|user| (user.id.clone(), model::UserSummary::from(user)))
		.collect::<HashMap<_, _>>();
	let categories = database
		.find_categories(&category_ids)
		.await?
		.into_iter()
		.map(|category| (category.id.clone(), model::CategorySummary::from(category)))
		.collect::<HashMap<_, _>>();

	Ok(posts
		.into_iter()
		.map(|post| model::PostView::new(post, &users, &categories))
		.collect())
}

async fn populate_one(database: &Database, post: Post) -> store::Result<model::PostView> {
	let mut views = populate(database, vec![post.clone()]).await?;

	Ok(views
		.pop()
		.unwrap_or_else(|| model::PostView::new(post, &HashMap::new(), &HashMap::new())))
}
