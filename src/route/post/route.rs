use axum::extract::State;
use chrono::Utc;
use macros::route;

use crate::{
	extract::{Auth, Created, ImageUpload, Json, Path, Query},
	model::{Comment, Id, Post},
	openapi::tag,
	route::model::{Data, IdInput, IdOrSlugInput, Lookup, Page},
	store::PostFilter,
	upload::Uploads,
	Database,
};

use super::{model, populate, populate_one, Error, RouteError};

fn non_empty(value: Option<String>) -> Option<String> {
	value.filter(|value| !value.trim().is_empty())
}

/// Get all posts
/// Returns a page of posts, newest first. Posts can be filtered by category slug,
/// by a case-insensitive search on the title and content, and by published state.
#[route(tag = tag::POST)]
pub async fn get_posts(
	State(database): State<Database>,
	Query(query): Query<model::PostQuery>,
) -> Result<Json<Page<model::PostView>>, RouteError> {
	let paginate = query.paginate();
	let mut filter = PostFilter {
		category: None,
		published_only: query.is_published,
		search: non_empty(query.search),
	};

	if let Some(slug) = non_empty(query.category) {
		let Some(category) = database.find_category_by_slug(&slug).await? else {
			return Ok(Json(Page::new(Vec::new(), paginate, 0)));
		};

		filter.category = Some(category.id);
	}

	let total = database.count_posts(&filter).await?;
	let posts = database
		.list_posts(&filter, paginate.offset(), paginate.limit())
		.await?;

	Ok(Json(Page::new(
		populate(&database, posts).await?,
		paginate,
		total,
	)))
}

/// Get single post
/// Returns a single post by its id or slug, and counts the read as a view.
#[route(tag = tag::POST)]
pub async fn get_post(
	State(database): State<Database>,
	Path(input): Path<IdOrSlugInput>,
) -> Result<Json<Data<model::PostView>>, RouteError> {
	let id_or_slug = input.id.clone();
	let post = match input.lookup() {
		Lookup::Id(id) => database.find_post(&id).await?,
		Lookup::Slug(slug) => database.find_post_by_slug(&slug).await?,
	}
	.ok_or_else(|| Error::UnknownPost(id_or_slug.clone()))?;

	let post = database
		.increment_views(&post.id)
		.await?
		.ok_or(Error::UnknownPost(id_or_slug))?;

	Ok(Json(Data::new(populate_one(&database, post).await?)))
}

/// Create post
/// Creates a new post written by the authenticated user. The slug is derived from the title.
#[route(tag = tag::POST, secure)]
pub async fn create_post(
	State(database): State<Database>,
	auth: Auth,
	Json(input): Json<model::CreatePostInput>,
) -> Result<Created<Data<model::PostView>>, RouteError> {
	let category = Id::parse(&input.category).ok_or(Error::InvalidCategory)?;

	if database.find_category(&category).await?.is_none() {
		return Err(Error::UnknownCategory(category).into());
	}

	let mut post = Post::new(auth.user.id, category, input.title, input.content);

	post.excerpt = input.excerpt;
	post.tags = input.tags;
	post.is_published = input.is_published;

	if let Some(image) = non_empty(input.featured_image) {
		post.featured_image = image;
	}

	database.insert_post(&post).await?;

	tracing::info!(post = %post.id, slug = %post.slug, "created post");

	Ok(Created(Data::new(populate_one(&database, post).await?)))
}

/// Update post
/// Updates a post by its id. Only the author or an admin may update a post.
/// Changing the title derives a new slug unless `slug` is given.
#[route(tag = tag::POST, secure)]
pub async fn update_post(
	State(database): State<Database>,
	auth: Auth,
	Path(IdInput { id }): Path<IdInput>,
	Json(input): Json<model::UpdatePostInput>,
) -> Result<Json<Data<model::PostView>>, RouteError> {
	let mut post = database
		.find_post(&id)
		.await?
		.ok_or_else(|| Error::UnknownPostId(id.clone()))?;

	if !post.is_editable_by(&auth.user) {
		return Err(Error::Forbidden("update").into());
	}

	if let Some(category) = input.category {
		let category = Id::parse(&category).ok_or(Error::InvalidCategory)?;

		if database.find_category(&category).await?.is_none() {
			return Err(Error::UnknownCategory(category).into());
		}

		post.category = category;
	}

	if let Some(title) = input.title {
		post.set_title(title);
	}

	if let Some(slug) = input.slug {
		post.set_slug(&slug);
	}

	if let Some(content) = input.content {
		post.content = content;
	}

	if let Some(excerpt) = input.excerpt {
		post.excerpt = Some(excerpt);
	}

	if let Some(tags) = input.tags {
		post.tags = tags;
	}

	if let Some(is_published) = input.is_published {
		post.is_published = is_published;
	}

	if let Some(image) = non_empty(input.featured_image) {
		post.featured_image = image;
	}

	post.updated_at = Utc::now();

	let post = database
		.update_post(&post)
		.await?
		.ok_or(Error::UnknownPostId(id))?;

	Ok(Json(Data::new(populate_one(&database, post).await?)))
}

/// Delete post
/// Deletes a post by its id. Only the author or an admin may delete a post.
#[route(tag = tag::POST, secure)]
pub async fn delete_post(
	State(database): State<Database>,
	auth: Auth,
	Path(IdInput { id }): Path<IdInput>,
) -> Result<Json<model::Deleted>, RouteError> {
	let post = database
		.find_post(&id)
		.await?
		.ok_or_else(|| Error::UnknownPostId(id.clone()))?;

	if !post.is_editable_by(&auth.user) {
		return Err(Error::Forbidden("delete").into());
	}

	if !database.delete_post(&id).await? {
		return Err(Error::UnknownPostId(id).into());
	}

	tracing::info!(post = %id, user = %auth.user.id, "deleted post");

	Ok(Json(model::Deleted {
		success: true,
		data: model::Empty::default(),
		message: "Post deleted successfully".into(),
	}))
}

/// Add comment
/// Adds a comment by the authenticated user to a post.
#[route(tag = tag::POST, secure)]
pub async fn add_comment(
	State(database): State<Database>,
	auth: Auth,
	Path(IdInput { id }): Path<IdInput>,
	Json(input): Json<model::CommentInput>,
) -> Result<Created<Data<model::CommentView>>, RouteError> {
	if input.content.trim().is_empty() {
		return Err(Error::EmptyComment.into());
	}

	let comment = Comment::new(auth.user.id.clone(), &input.content);

	if !database.push_comment(&id, &comment).await? {
		return Err(Error::UnknownPostId(id).into());
	}

	Ok(Created(Data::new(model::CommentView::new(
		comment,
		Some(auth.user.into()),
	))))
}

/// Upload image
/// Uploads an image for use as a post's featured image. The image must be sent in the `image`
/// field of a multipart body and may not exceed the configured size limit.
#[route(tag = tag::POST, secure, response(status = 400, description = "The file is missing, too large or not an image."))]
pub async fn upload_image(
	State(uploads): State<Uploads>,
	_auth: Auth,
	ImageUpload(image): ImageUpload,
) -> Result<Json<Data<model::UploadOutput>>, RouteError> {
	let stored = uploads.store(&image).await?;

	Ok(Json(Data::new(stored.into())))
}
