//! Persistence for users, categories and posts.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::model::{Category, Comment, Id, Post, User};

#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// A unique field already holds `value`.
	#[error("duplicate {field} {value}")]
	Duplicate { field: &'static str, value: String },
	/// A referenced record does not exist.
	#[error("unknown {entity} {id}")]
	MissingReference { entity: &'static str, id: Id },
	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),
	#[error("migration error: {0}")]
	Migrate(#[from] sqlx::migrate::MigrateError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Restricts which posts are listed. Every set condition must hold.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
	pub category: Option<Id>,
	pub published_only: bool,
	/// A case-insensitive substring of the title or content.
	pub search: Option<String>,
}

impl PostFilter {
	#[must_use]
	pub fn matches(&self, post: &Post) -> bool {
		if self.category.as_ref().is_some_and(|id| *id != post.category) {
			return false;
		}

		if self.published_only && !post.is_published {
			return false;
		}

		self.search.as_ref().map_or(true, |search| {
			let search = search.to_lowercase();

			post.title.to_lowercase().contains(&search)
				|| post.content.to_lowercase().contains(&search)
		})
	}
}

/// A document store for the blog.
///
/// Implementations enforce uniqueness of user email and provider id,
/// category name and slug, and post slug, reporting violations as
/// [`Error::Duplicate`]. Posts must reference an existing author and
/// category, otherwise [`Error::MissingReference`] is returned.
#[axum::async_trait]
pub trait Store: Send + Sync + 'static {
	async fn find_user(&self, id: &Id) -> Result<Option<User>>;
	async fn find_user_by_provider(&self, provider_id: &str) -> Result<Option<User>>;
	/// Returns the users with the given ids, skipping unknown ones.
	async fn find_users(&self, ids: &[Id]) -> Result<Vec<User>>;
	async fn insert_user(&self, user: &User) -> Result<()>;

	/// Returns every category, sorted by name.
	async fn list_categories(&self) -> Result<Vec<Category>>;
	async fn find_category(&self, id: &Id) -> Result<Option<Category>>;
	async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>>;
	/// Returns the categories with the given ids, skipping unknown ones.
	async fn find_categories(&self, ids: &[Id]) -> Result<Vec<Category>>;
	async fn insert_category(&self, category: &Category) -> Result<()>;

	/// Returns a page of posts matching `filter`, newest first.
	async fn list_posts(&self, filter: &PostFilter, offset: i64, limit: i64)
		-> Result<Vec<Post>>;
	async fn count_posts(&self, filter: &PostFilter) -> Result<i64>;
	async fn find_post(&self, id: &Id) -> Result<Option<Post>>;
	async fn find_post_by_slug(&self, slug: &str) -> Result<Option<Post>>;
	async fn insert_post(&self, post: &Post) -> Result<()>;
	/// Replaces a stored post, returning `None` if it does not exist.
	async fn update_post(&self, post: &Post) -> Result<Option<Post>>;
	/// Returns whether a post was deleted.
	async fn delete_post(&self, id: &Id) -> Result<bool>;
	/// Atomically increments the view count, returning the updated post.
	async fn increment_views(&self, id: &Id) -> Result<Option<Post>>;
	/// Appends a comment, returning whether the post exists.
	async fn push_comment(&self, id: &Id, comment: &Comment) -> Result<bool>;
}
