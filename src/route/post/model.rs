use std::collections::HashMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::{
	model::{Category, Comment, Id, Post, User},
	route::model::{one, ten, trimmed, trimmed_option, yes, Paginate},
	upload::StoredImage,
};

fn validate_category(category: &str) -> Result<(), ValidationError> {
	let message = if category.is_empty() {
		"Category is required"
	} else if Id::parse(category).is_none() {
		"Category must be a valid id"
	} else {
		return Ok(());
	};

	let mut error = ValidationError::new("category");
	error.message = Some(message.into());

	Err(error)
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostQuery {
	/// The page number to return (1-indexed).
	#[validate(range(min = 1, message = "Page must be at least 1"))]
	#[serde(default = "one")]
	pub page: i64,
	/// The number of posts to return per page.
	#[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
	#[serde(default = "ten")]
	pub limit: i64,
	/// Only return posts in the category with this slug.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub category: Option<String>,
	/// Only return posts whose title or content contains this text, ignoring case.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub search: Option<String>,
	/// Only return published posts. Set to `false` to include drafts.
	#[serde(default = "yes")]
	pub is_published: bool,
}

impl Default for PostQuery {
	fn default() -> Self {
		Self {
			page: one(),
			limit: ten(),
			category: None,
			search: None,
			is_published: yes(),
		}
	}
}

impl PostQuery {
	pub fn paginate(&self) -> Paginate {
		Paginate {
			page: self.page,
			limit: self.limit,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostInput {
	#[validate(length(min = 3, max = 100, message = "Title must be between 3 and 100 characters"))]
	#[serde(default, deserialize_with = "trimmed")]
	#[schemars(with = "String")]
	pub title: String,
	/// The body of the post.
	#[validate(length(min = 10, message = "Content must be at least 10 characters"))]
	#[serde(default)]
	pub content: String,
	/// A short summary shown in post listings.
	#[validate(length(max = 200, message = "Excerpt cannot exceed 200 characters"))]
	pub excerpt: Option<String>,
	/// The id of an existing category.
	#[validate(custom(function = "validate_category"))]
	#[serde(default)]
	pub category: String,
	#[serde(default)]
	pub tags: Vec<String>,
	#[serde(default)]
	pub is_published: bool,
	/// The filename of a previously uploaded image.
	pub featured_image: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostInput {
	#[validate(length(min = 3, max = 100, message = "Title must be between 3 and 100 characters"))]
	#[serde(default, deserialize_with = "trimmed_option")]
	#[schemars(with = "Option<String>")]
	pub title: Option<String>,
	#[validate(length(min = 10, message = "Content must be at least 10 characters"))]
	pub content: Option<String>,
	#[validate(length(max = 200, message = "Excerpt cannot exceed 200 characters"))]
	pub excerpt: Option<String>,
	#[validate(custom(function = "validate_category"))]
	pub category: Option<String>,
	pub tags: Option<Vec<String>>,
	pub is_published: Option<bool>,
	pub featured_image: Option<String>,
	/// Replaces the slug derived from the title.
	#[validate(length(min = 1, message = "Slug cannot be empty"))]
	pub slug: Option<String>,
}

/// Blank content is rejected by the handler with its own message rather than
/// as a field error, so there are no rules to check here.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, JsonSchema)]
pub struct CommentInput {
	#[serde(default)]
	pub content: String,
}

/// The public part of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UserSummary {
	#[serde(rename = "_id")]
	pub id: Id,
	pub name: String,
	pub email: String,
}

impl From<User> for UserSummary {
	fn from(user: User) -> Self {
		Self {
			id: user.id,
			name: user.name,
			email: user.email,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CategorySummary {
	#[serde(rename = "_id")]
	pub id: Id,
	pub name: String,
	pub slug: String,
	pub color: String,
}

impl From<Category> for CategorySummary {
	fn from(category: Category) -> Self {
		Self {
			id: category.id,
			name: category.name,
			slug: category.slug,
			color: category.color,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
	#[serde(rename = "_id")]
	pub id: Id,
	/// The commenter, or `null` if they no longer exist.
	pub user: Option<UserSummary>,
	pub content: String,
	pub created_at: DateTime<Utc>,
}

impl CommentView {
	pub fn new(comment: Comment, user: Option<UserSummary>) -> Self {
		Self {
			id: comment.id,
			user,
			content: comment.content,
			created_at: comment.created_at,
		}
	}
}

/// A post with its author, category and commenters filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
	#[serde(rename = "_id")]
	pub id: Id,
	pub title: String,
	pub content: String,
	pub excerpt: Option<String>,
	pub slug: String,
	pub author: Option<UserSummary>,
	pub category: Option<CategorySummary>,
	pub tags: Vec<String>,
	pub is_published: bool,
	pub view_count: i64,
	pub comments: Vec<CommentView>,
	pub featured_image: String,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl PostView {
	pub fn new(
		post: Post,
		users: &HashMap<Id, UserSummary>,
		categories: &HashMap<Id, CategorySummary>,
	) -> Self {
		Self {
			author: users.get(&post.author).cloned(),
			category: categories.get(&post.category).cloned(),
			comments: post
				.comments
				.into_iter()
				.map(|comment| {
					let user = users.get(&comment.user).cloned();
					CommentView::new(comment, user)
				})
				.collect(),
			id: post.id,
			title: post.title,
			content: post.content,
			excerpt: post.excerpt,
			slug: post.slug,
			tags: post.tags,
			is_published: post.is_published,
			view_count: post.view_count,
			featured_image: post.featured_image,
			created_at: post.created_at,
			updated_at: post.updated_at,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UploadOutput {
	/// The name of the stored file, usable as a post's `featuredImage`.
	pub filename: String,
	/// The URL path the file is served from.
	pub path: String,
}

impl From<StoredImage> for UploadOutput {
	fn from(image: StoredImage) -> Self {
		Self {
			filename: image.filename,
			path: image.path,
		}
	}
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct Empty {}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct Deleted {
	pub success: bool,
	pub data: Empty,
	pub message: String,
}
