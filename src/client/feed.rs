use chrono::Utc;

use super::{ApiClient, Error};
use crate::{
	model::{Id, DEFAULT_FEATURED_IMAGE},
	route::{
		model::Page,
		post::model::{CreatePostInput, PostQuery, PostView, UpdatePostInput},
	},
	slug,
};

/// The number of posts shown per page of the feed.
pub const PAGE_SIZE: i64 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
	pub page: i64,
	pub total_pages: i64,
	pub total: i64,
}

impl Default for Pagination {
	fn default() -> Self {
		Self {
			page: 1,
			total_pages: 1,
			total: 0,
		}
	}
}

/// The post list as it was before an optimistic change.
#[derive(Debug, Clone)]
pub struct Snapshot(Vec<PostView>);

/// The list of posts a reader is browsing.
///
/// Changes made through [`PostFeed::create`], [`PostFeed::update`] and
/// [`PostFeed::delete`] are shown before the server confirms them and
/// undone if it does not.
#[derive(Debug, Default)]
pub struct PostFeed {
	posts: Vec<PostView>,
	pagination: Pagination,
	loading: bool,
	error: Option<String>,
}

impl PostFeed {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn posts(&self) -> &[PostView] {
		&self.posts
	}

	pub fn pagination(&self) -> Pagination {
		self.pagination
	}

	pub fn is_loading(&self) -> bool {
		self.loading
	}

	/// The message of the last failed request, cleared when a load starts.
	pub fn error(&self) -> Option<&str> {
		self.error.as_deref()
	}

	/// Replaces the feed with a page of published posts.
	pub async fn load(
		&mut self,
		client: &ApiClient,
		page: i64,
		category: Option<&str>,
		search: Option<&str>,
	) -> Result<(), Error> {
		self.loading = true;
		self.error = None;

		let query = PostQuery {
			page,
			limit: PAGE_SIZE,
			category: category.map(ToOwned::to_owned),
			search: search.map(ToOwned::to_owned),
			..PostQuery::default()
		};
		let result = client.list_posts(&query).await;

		self.loading = false;

		match result {
			Ok(page) => {
				self.apply(page);
				Ok(())
			}
			Err(error) => Err(self.fail(error, "Failed to load posts")),
		}
	}

	pub fn apply(&mut self, page: Page<PostView>) {
		self.pagination = Pagination {
			page: page.page,
			total_pages: page.pages.max(1),
			total: page.total,
		};
		self.posts = page.data;
	}

	fn snapshot(&self) -> Snapshot {
		Snapshot(self.posts.clone())
	}

	fn fail(&mut self, error: Error, fallback: &str) -> Error {
		self.error = Some(error.message_or(fallback));
		error
	}

	fn put(&mut self, post: PostView) {
		if let Some(slot) = self.posts.iter_mut().find(|slot| slot.id == post.id) {
			*slot = post;
		}
	}

	/// Shows `post` at the top of the feed.
	pub fn insert(&mut self, post: PostView) -> Snapshot {
		let snapshot = self.snapshot();

		self.posts.insert(0, post);
		snapshot
	}

	/// Replaces the post with the same id, if it is in the feed.
	pub fn replace(&mut self, post: PostView) -> Snapshot {
		let snapshot = self.snapshot();

		self.put(post);
		snapshot
	}

	pub fn remove(&mut self, id: &Id) -> Snapshot {
		let snapshot = self.snapshot();

		self.posts.retain(|post| &post.id != id);
		snapshot
	}

	pub fn rollback(&mut self, snapshot: Snapshot) {
		self.posts = snapshot.0;
	}

	/// Creates a post, showing a placeholder until the server returns the stored one.
	pub async fn create(
		&mut self,
		client: &ApiClient,
		input: &CreatePostInput,
	) -> Result<PostView, Error> {
		let placeholder = placeholder(input);
		let temporary = placeholder.id.clone();
		let snapshot = self.insert(placeholder);

		match client.create_post(input).await {
			Ok(post) => {
				if let Some(slot) = self.posts.iter_mut().find(|slot| slot.id == temporary) {
					*slot = post.clone();
				}

				Ok(post)
			}
			Err(error) => {
				self.rollback(snapshot);
				Err(self.fail(error, "Failed to save post"))
			}
		}
	}

	pub async fn update(
		&mut self,
		client: &ApiClient,
		id: &Id,
		input: &UpdatePostInput,
	) -> Result<PostView, Error> {
		let snapshot = match self.posts.iter().find(|post| &post.id == id).cloned() {
			Some(mut post) => {
				apply_changes(&mut post, input);
				self.replace(post)
			}
			None => self.snapshot(),
		};

		match client.update_post(id, input).await {
			Ok(post) => {
				self.put(post.clone());
				Ok(post)
			}
			Err(error) => {
				self.rollback(snapshot);
				Err(self.fail(error, "Failed to save post"))
			}
		}
	}

	pub async fn delete(&mut self, client: &ApiClient, id: &Id) -> Result<(), Error> {
		let snapshot = self.remove(id);

		match client.delete_post(id).await {
			Ok(()) => Ok(()),
			Err(error) => {
				self.rollback(snapshot);
				Err(self.fail(error, "Failed to delete post"))
			}
		}
	}
}

/// The post as it will probably look once stored.
fn placeholder(input: &CreatePostInput) -> PostView {
	let now = Utc::now();

	PostView {
		id: Id::new(),
		title: input.title.clone(),
		content: input.content.clone(),
		excerpt: input.excerpt.clone(),
		slug: slug::derive(&input.title, "post"),
		author: None,
		category: None,
		tags: input.tags.clone(),
		is_published: input.is_published,
		view_count: 0,
		comments: Vec::new(),
		featured_image: input
			.featured_image
			.clone()
			.filter(|image| !image.is_empty())
			.unwrap_or_else(|| DEFAULT_FEATURED_IMAGE.to_owned()),
		created_at: now,
		updated_at: now,
	}
}

fn apply_changes(post: &mut PostView, input: &UpdatePostInput) {
	if let Some(title) = &input.title {
		post.title.clone_from(title);
	}

	if let Some(content) = &input.content {
		post.content.clone_from(content);
	}

	if let Some(excerpt) = &input.excerpt {
		post.excerpt = Some(excerpt.clone());
	}

	if let Some(tags) = &input.tags {
		post.tags.clone_from(tags);
	}

	if let Some(is_published) = input.is_published {
		post.is_published = is_published;
	}

	post.updated_at = Utc::now();
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::{
		client::AuthContext,
		test::{LiveApp, TestApp, ALICE, BOB},
	};

	fn input(title: &str, category: &Id) -> CreatePostInput {
		CreatePostInput {
			title: title.into(),
			content: "Enough content to be valid.".into(),
			excerpt: None,
			category: category.to_string(),
			tags: Vec::new(),
			is_published: true,
			featured_image: None,
		}
	}

	#[test]
	fn test_optimistic_changes_roll_back() {
		let mut feed = PostFeed::new();
		let first = placeholder(&input("First", &Id::new()));
		let second = placeholder(&input("Second", &Id::new()));

		let _ = feed.insert(first.clone());
		let before_insert = feed.insert(second.clone());

		assert_eq!(feed.posts()[0].title, "Second");

		let mut renamed = first.clone();
		renamed.title = "Renamed".into();

		let before_rename = feed.replace(renamed);

		assert_eq!(feed.posts()[1].title, "Renamed");

		feed.rollback(before_rename);

		assert_eq!(feed.posts()[1].title, "First");

		let before_remove = feed.remove(&first.id);

		assert_eq!(feed.posts().len(), 1);

		feed.rollback(before_remove);

		assert_eq!(feed.posts().len(), 2);

		feed.rollback(before_insert);

		assert_eq!(feed.posts().len(), 1);
		assert_eq!(feed.posts()[0].id, first.id);
	}

	#[tokio::test]
	async fn test_feed_against_server() {
		let app = LiveApp::spawn().await;
		let alice = ApiClient::new(&app.url).with_auth(AuthContext::bearer(TestApp::token(ALICE)));
		let bob = ApiClient::new(&app.url).with_auth(AuthContext::bearer(TestApp::token(BOB)));
		let anonymous = ApiClient::new(&app.url);

		let category = alice
			.create_category(&crate::route::category::model::CreateCategoryInput {
				name: "Feeds".into(),
				..Default::default()
			})
			.await
			.unwrap();

		let mut feed = PostFeed::new();

		feed.load(&anonymous, 1, None, None).await.unwrap();

		assert!(feed.posts().is_empty());
		assert_eq!(feed.pagination(), Pagination::default());

		let created = feed
			.create(&alice, &input("Optimism", &category.id))
			.await
			.unwrap();

		assert_eq!(feed.posts().len(), 1);
		assert_eq!(feed.posts()[0].id, created.id);
		assert_eq!(feed.posts()[0].author.as_ref().unwrap().name, "Alice");

		let error = feed
			.create(&anonymous, &input("Rejected", &category.id))
			.await
			.unwrap_err();

		assert!(matches!(error, Error::Api { .. }));
		assert_eq!(feed.posts().len(), 1);
		assert_eq!(feed.error(), Some("Not authorized to access this route"));

		let changes = UpdatePostInput {
			title: Some("Pessimism".into()),
			..UpdatePostInput::default()
		};

		assert!(feed.update(&bob, &created.id, &changes).await.is_err());
		assert_eq!(feed.posts()[0].title, "Optimism");
		assert_eq!(feed.error(), Some("Not authorized to update this post"));

		let updated = feed.update(&alice, &created.id, &changes).await.unwrap();

		assert_eq!(updated.slug, "pessimism");
		assert_eq!(feed.posts()[0].slug, "pessimism");

		assert!(feed.delete(&bob, &created.id).await.is_err());
		assert_eq!(feed.posts().len(), 1);

		feed.delete(&alice, &created.id).await.unwrap();

		assert!(feed.posts().is_empty());

		feed.load(&anonymous, 1, Some("feeds"), None).await.unwrap();

		assert!(feed.posts().is_empty());
		assert!(!feed.is_loading());
		assert_eq!(feed.error(), None);
	}
}
