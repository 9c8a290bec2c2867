//! In-memory store, used when no database is configured and in tests.
//!
//! Data is lost when the process exits.

use tokio::sync::RwLock;

use super::{Error, PostFilter, Result, Store};
use crate::model::{Category, Comment, Id, Post, User};

#[derive(Default)]
struct Collections {
	users: Vec<User>,
	categories: Vec<Category>,
	posts: Vec<Post>,
}

impl Collections {
	fn check_user(&self, user: &User) -> Result<()> {
		for other in &self.users {
			if other.provider_id == user.provider_id {
				return Err(Error::Duplicate {
					field: "providerId",
					value: user.provider_id.clone(),
				});
			}

			if other.email == user.email {
				return Err(Error::Duplicate {
					field: "email",
					value: user.email.clone(),
				});
			}
		}

		Ok(())
	}

	fn check_category(&self, category: &Category) -> Result<()> {
		for other in &self.categories {
			if other.name == category.name {
				return Err(Error::Duplicate {
					field: "name",
					value: category.name.clone(),
				});
			}

			if other.slug == category.slug {
				return Err(Error::Duplicate {
					field: "slug",
					value: category.slug.clone(),
				});
			}
		}

		Ok(())
	}

	/// Checks the references and slug of `post`, ignoring the stored post with the same id.
	fn check_post(&self, post: &Post) -> Result<()> {
		if !self.users.iter().any(|user| user.id == post.author) {
			return Err(Error::MissingReference {
				entity: "User",
				id: post.author.clone(),
			});
		}

		if !self.categories.iter().any(|c| c.id == post.category) {
			return Err(Error::MissingReference {
				entity: "Category",
				id: post.category.clone(),
			});
		}

		if self
			.posts
			.iter()
			.any(|other| other.id != post.id && other.slug == post.slug)
		{
			return Err(Error::Duplicate {
				field: "slug",
				value: post.slug.clone(),
			});
		}

		Ok(())
	}

	fn post_mut(&mut self, id: &Id) -> Option<&mut Post> {
		self.posts.iter_mut().find(|post| post.id == *id)
	}
}

#[derive(Default)]
pub struct MemoryStore {
	collections: RwLock<Collections>,
}

impl MemoryStore {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}
}

#[axum::async_trait]
impl Store for MemoryStore {
	async fn find_user(&self, id: &Id) -> Result<Option<User>> {
		let collections = self.collections.read().await;

		Ok(collections.users.iter().find(|user| user.id == *id).cloned())
	}

	async fn find_user_by_provider(&self, provider_id: &str) -> Result<Option<User>> {
		let collections = self.collections.read().await;

		Ok(collections
			.users
			.iter()
			.find(|user| user.provider_id == provider_id)
			.cloned())
	}

	async fn find_users(&self, ids: &[Id]) -> Result<Vec<User>> {
		let collections = self.collections.read().await;

		Ok(collections
			.users
			.iter()
			.filter(|user| ids.contains(&user.id))
			.cloned()
			.collect())
	}

	async fn insert_user(&self, user: &User) -> Result<()> {
		let mut collections = self.collections.write().await;

		collections.check_user(user)?;
		collections.users.push(user.clone());

		Ok(())
	}

	async fn list_categories(&self) -> Result<Vec<Category>> {
		let collections = self.collections.read().await;
		let mut categories = collections.categories.clone();

		// Byte order, the same as `COLLATE "C"` in the PostgreSQL store.
		categories.sort_by(|a, b| a.name.cmp(&b.name));
		Ok(categories)
	}

	async fn find_category(&self, id: &Id) -> Result<Option<Category>> {
		let collections = self.collections.read().await;

		Ok(collections.categories.iter().find(|c| c.id == *id).cloned())
	}

	async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
		let collections = self.collections.read().await;

		Ok(collections
			.categories
			.iter()
			.find(|c| c.slug == slug)
			.cloned())
	}

	async fn find_categories(&self, ids: &[Id]) -> Result<Vec<Category>> {
		let collections = self.collections.read().await;

		Ok(collections
			.categories
			.iter()
			.filter(|c| ids.contains(&c.id))
			.cloned()
			.collect())
	}

	async fn insert_category(&self, category: &Category) -> Result<()> {
		let mut collections = self.collections.write().await;

		collections.check_category(category)?;
		collections.categories.push(category.clone());

		Ok(())
	}

	async fn list_posts(
		&self,
		filter: &PostFilter,
		offset: i64,
		limit: i64,
	) -> Result<Vec<Post>> {
		let collections = self.collections.read().await;
		let mut posts = collections
			.posts
			.iter()
			.filter(|post| filter.matches(post))
			.collect::<Vec<_>>();

		posts.sort_by(|a, b| (&b.created_at, &b.id).cmp(&(&a.created_at, &a.id)));

		Ok(posts
			.into_iter()
			.skip(usize::try_from(offset).unwrap_or(0))
			.take(usize::try_from(limit).unwrap_or(0))
			.cloned()
			.collect())
	}

	async fn count_posts(&self, filter: &PostFilter) -> Result<i64> {
		let collections = self.collections.read().await;
		let count = collections
			.posts
			.iter()
			.filter(|post| filter.matches(post))
			.count();

		Ok(i64::try_from(count).unwrap_or(i64::MAX))
	}

	async fn find_post(&self, id: &Id) -> Result<Option<Post>> {
		let collections = self.collections.read().await;

		Ok(collections.posts.iter().find(|post| post.id == *id).cloned())
	}

	async fn find_post_by_slug(&self, slug: &str) -> Result<Option<Post>> {
		let collections = self.collections.read().await;

		Ok(collections
			.posts
			.iter()
			.find(|post| post.slug == slug)
			.cloned())
	}

	async fn insert_post(&self, post: &Post) -> Result<()> {
		let mut collections = self.collections.write().await;

		collections.check_post(post)?;
		collections.posts.push(post.clone());

		Ok(())
	}

	async fn update_post(&self, post: &Post) -> Result<Option<Post>> {
		let mut collections = self.collections.write().await;

		if collections.post_mut(&post.id).is_none() {
			return Ok(None);
		}

		collections.check_post(post)?;

		// Views and comments have their own atomic operations.
		Ok(collections.post_mut(&post.id).map(|stored| {
			*stored = Post {
				view_count: stored.view_count,
				comments: std::mem::take(&mut stored.comments),
				..post.clone()
			};
			stored.clone()
		}))
	}

	async fn delete_post(&self, id: &Id) -> Result<bool> {
		let mut collections = self.collections.write().await;
		let before = collections.posts.len();

		collections.posts.retain(|post| post.id != *id);

		Ok(collections.posts.len() != before)
	}

	async fn increment_views(&self, id: &Id) -> Result<Option<Post>> {
		let mut collections = self.collections.write().await;

		Ok(collections.post_mut(id).map(|post| {
			post.view_count += 1;
			post.clone()
		}))
	}

	async fn push_comment(&self, id: &Id, comment: &Comment) -> Result<bool> {
		let mut collections = self.collections.write().await;

		Ok(collections
			.post_mut(id)
			.map(|post| post.comments.push(comment.clone()))
			.is_some())
	}
}
