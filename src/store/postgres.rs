use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool};

use super::{Error, PostFilter, Result, Store};
use crate::model::{Category, Comment, Id, Post, User};

/// A constraint whose violation is reported as something other than a database error.
enum Constraint<'a> {
	Unique {
		name: &'static str,
		field: &'static str,
		value: &'a str,
	},
	Reference {
		name: &'static str,
		entity: &'static str,
		id: &'a Id,
	},
}

/// Maps a violation of one of `constraints` to the matching store error.
fn violation(error: sqlx::Error, constraints: &[Constraint<'_>]) -> Error {
	let sqlx::Error::Database(ref database) = error else {
		return error.into();
	};

	let Some(violated) = database.constraint() else {
		return error.into();
	};

	for constraint in constraints {
		match *constraint {
			Constraint::Unique { name, field, value } if name == violated => {
				return Error::Duplicate {
					field,
					value: value.to_owned(),
				};
			}
			Constraint::Reference { name, entity, id } if name == violated => {
				return Error::MissingReference {
					entity,
					id: id.clone(),
				};
			}
			_ => {}
		}
	}

	error.into()
}

fn post_constraints(post: &Post) -> [Constraint<'_>; 3] {
	[
		Constraint::Unique {
			name: "post_slug_key",
			field: "slug",
			value: &post.slug,
		},
		Constraint::Reference {
			name: "post_author_id_fkey",
			entity: "User",
			id: &post.author,
		},
		Constraint::Reference {
			name: "post_category_id_fkey",
			entity: "Category",
			id: &post.category,
		},
	]
}

#[derive(sqlx::FromRow)]
struct PostRow {
	id: Id,
	title: String,
	content: String,
	excerpt: Option<String>,
	slug: String,
	author_id: Id,
	category_id: Id,
	tags: Vec<String>,
	is_published: bool,
	view_count: i64,
	comments: Json<Vec<Comment>>,
	featured_image: String,
	created_at: DateTime<Utc>,
	updated_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
	fn from(row: PostRow) -> Self {
		Self {
			id: row.id,
			title: row.title,
			content: row.content,
			excerpt: row.excerpt,
			slug: row.slug,
			author: row.author_id,
			category: row.category_id,
			tags: row.tags,
			is_published: row.is_published,
			view_count: row.view_count,
			comments: row.comments.0,
			featured_image: row.featured_image,
			created_at: row.created_at,
			updated_at: row.updated_at,
		}
	}
}

fn id_list(ids: &[Id]) -> Vec<String> {
	ids.iter().map(ToString::to_string).collect()
}

/// A store backed by PostgreSQL.
#[derive(Clone)]
pub struct PgStore {
	pool: PgPool,
}

impl PgStore {
	pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
		let pool = PgPoolOptions::new()
			.max_connections(max_connections)
			.connect(url)
			.await?;

		Ok(Self { pool })
	}

	/// Applies any pending migrations.
	pub async fn migrate(&self) -> Result<()> {
		sqlx::migrate!("./migrations").run(&self.pool).await?;
		Ok(())
	}
}

const POST_FILTER: &str = r"
	($1::text IS NULL OR category_id = $1)
	AND (NOT $2 OR is_published)
	AND (
		$3::text IS NULL
		OR strpos(lower(title), lower($3)) > 0
		OR strpos(lower(content), lower($3)) > 0
	)
";

#[axum::async_trait]
impl Store for PgStore {
	async fn find_user(&self, id: &Id) -> Result<Option<User>> {
		Ok(
			sqlx::query_as::<_, User>(r#"SELECT * FROM "user" WHERE id = $1"#)
				.bind(id)
				.fetch_optional(&self.pool)
				.await?,
		)
	}

	async fn find_user_by_provider(&self, provider_id: &str) -> Result<Option<User>> {
		Ok(
			sqlx::query_as::<_, User>(r#"SELECT * FROM "user" WHERE provider_id = $1"#)
				.bind(provider_id)
				.fetch_optional(&self.pool)
				.await?,
		)
	}

	async fn find_users(&self, ids: &[Id]) -> Result<Vec<User>> {
		Ok(
			sqlx::query_as::<_, User>(r#"SELECT * FROM "user" WHERE id = ANY($1)"#)
				.bind(id_list(ids))
				.fetch_all(&self.pool)
				.await?,
		)
	}

	async fn insert_user(&self, user: &User) -> Result<()> {
		sqlx::query(
			r#"
				INSERT INTO "user" (id, provider_id, name, email, role, avatar, created_at, updated_at)
				VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
			"#,
		)
		.bind(&user.id)
		.bind(&user.provider_id)
		.bind(&user.name)
		.bind(&user.email)
		.bind(user.role)
		.bind(&user.avatar)
		.bind(user.created_at)
		.bind(user.updated_at)
		.execute(&self.pool)
		.await
		.map_err(|e| {
			violation(
				e,
				&[
					Constraint::Unique {
						name: "user_provider_id_key",
						field: "providerId",
						value: &user.provider_id,
					},
					Constraint::Unique {
						name: "user_email_key",
						field: "email",
						value: &user.email,
					},
				],
			)
		})?;

		Ok(())
	}

	async fn list_categories(&self) -> Result<Vec<Category>> {
		Ok(
			sqlx::query_as::<_, Category>(r#"SELECT * FROM category ORDER BY name COLLATE "C""#)
				.fetch_all(&self.pool)
				.await?,
		)
	}

	async fn find_category(&self, id: &Id) -> Result<Option<Category>> {
		Ok(
			sqlx::query_as::<_, Category>("SELECT * FROM category WHERE id = $1")
				.bind(id)
				.fetch_optional(&self.pool)
				.await?,
		)
	}

	async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
		Ok(
			sqlx::query_as::<_, Category>("SELECT * FROM category WHERE slug = $1")
				.bind(slug)
				.fetch_optional(&self.pool)
				.await?,
		)
	}

	async fn find_categories(&self, ids: &[Id]) -> Result<Vec<Category>> {
		Ok(
			sqlx::query_as::<_, Category>("SELECT * FROM category WHERE id = ANY($1)")
				.bind(id_list(ids))
				.fetch_all(&self.pool)
				.await?,
		)
	}

	async fn insert_category(&self, category: &Category) -> Result<()> {
		sqlx::query(
			r"
				INSERT INTO category (id, name, slug, description, color, created_at, updated_at)
				VALUES ($1, $2, $3, $4, $5, $6, $7)
			",
		)
		.bind(&category.id)
		.bind(&category.name)
		.bind(&category.slug)
		.bind(&category.description)
		.bind(&category.color)
		.bind(category.created_at)
		.bind(category.updated_at)
		.execute(&self.pool)
		.await
		.map_err(|e| {
			violation(
				e,
				&[
					Constraint::Unique {
						name: "category_name_key",
						field: "name",
						value: &category.name,
					},
					Constraint::Unique {
						name: "category_slug_key",
						field: "slug",
						value: &category.slug,
					},
				],
			)
		})?;

		Ok(())
	}

	async fn list_posts(
		&self,
		filter: &PostFilter,
		offset: i64,
		limit: i64,
	) -> Result<Vec<Post>> {
		let rows = sqlx::query_as::<_, PostRow>(&format!(
			"SELECT * FROM post WHERE {POST_FILTER} ORDER BY created_at DESC, id DESC LIMIT $4 OFFSET $5"
		))
		.bind(filter.category.as_ref())
		.bind(filter.published_only)
		.bind(filter.search.as_deref())
		.bind(limit)
		.bind(offset)
		.fetch_all(&self.pool)
		.await?;

		Ok(rows.into_iter().map(Post::from).collect())
	}

	async fn count_posts(&self, filter: &PostFilter) -> Result<i64> {
		Ok(
			sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM post WHERE {POST_FILTER}"))
				.bind(filter.category.as_ref())
				.bind(filter.published_only)
				.bind(filter.search.as_deref())
				.fetch_one(&self.pool)
				.await?,
		)
	}

	async fn find_post(&self, id: &Id) -> Result<Option<Post>> {
		let row = sqlx::query_as::<_, PostRow>("SELECT * FROM post WHERE id = $1")
			.bind(id)
			.fetch_optional(&self.pool)
			.await?;

		Ok(row.map(Post::from))
	}

	async fn find_post_by_slug(&self, slug: &str) -> Result<Option<Post>> {
		let row = sqlx::query_as::<_, PostRow>("SELECT * FROM post WHERE slug = $1")
			.bind(slug)
			.fetch_optional(&self.pool)
			.await?;

		Ok(row.map(Post::from))
	}

	async fn insert_post(&self, post: &Post) -> Result<()> {
		sqlx::query(
			r"
				INSERT INTO post (
					id, title, content, excerpt, slug, author_id, category_id, tags,
					is_published, view_count, comments, featured_image, created_at, updated_at
				)
				VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
			",
		)
		.bind(&post.id)
		.bind(&post.title)
		.bind(&post.content)
		.bind(&post.excerpt)
		.bind(&post.slug)
		.bind(&post.author)
		.bind(&post.category)
		.bind(&post.tags)
		.bind(post.is_published)
		.bind(post.view_count)
		.bind(Json(&post.comments))
		.bind(&post.featured_image)
		.bind(post.created_at)
		.bind(post.updated_at)
		.execute(&self.pool)
		.await
		.map_err(|e| violation(e, &post_constraints(post)))?;

		Ok(())
	}

	async fn update_post(&self, post: &Post) -> Result<Option<Post>> {
		let row = sqlx::query_as::<_, PostRow>(
			r"
				UPDATE post
				SET title = $2, content = $3, excerpt = $4, slug = $5, category_id = $6,
					tags = $7, is_published = $8, featured_image = $9, updated_at = $10
				WHERE id = $1
				RETURNING *
			",
		)
		.bind(&post.id)
		.bind(&post.title)
		.bind(&post.content)
		.bind(&post.excerpt)
		.bind(&post.slug)
		.bind(&post.category)
		.bind(&post.tags)
		.bind(post.is_published)
		.bind(&post.featured_image)
		.bind(post.updated_at)
		.fetch_optional(&self.pool)
		.await
		.map_err(|e| violation(e, &post_constraints(post)))?;

		Ok(row.map(Post::from))
	}

	async fn delete_post(&self, id: &Id) -> Result<bool> {
		let result = sqlx::query("DELETE FROM post WHERE id = $1")
			.bind(id)
			.execute(&self.pool)
			.await?;

		Ok(result.rows_affected() > 0)
	}

	async fn increment_views(&self, id: &Id) -> Result<Option<Post>> {
		let row = sqlx::query_as::<_, PostRow>(
			"UPDATE post SET view_count = view_count + 1 WHERE id = $1 RETURNING *",
		)
		.bind(id)
		.fetch_optional(&self.pool)
		.await?;

		Ok(row.map(Post::from))
	}

	async fn push_comment(&self, id: &Id, comment: &Comment) -> Result<bool> {
		let result = sqlx::query(
			"UPDATE post SET comments = comments || jsonb_build_array($2::jsonb) WHERE id = $1",
		)
		.bind(id)
		.bind(Json(comment))
		.execute(&self.pool)
		.await?;

		Ok(result.rows_affected() > 0)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::model::Profile;

	/// Connects to `DATABASE_URL`, or returns `None` so the test can be skipped.
	async fn store() -> Option<PgStore> {
		let url = std::env::var("DATABASE_URL").ok()?;
		let store = PgStore::connect(&url, 2).await.unwrap();

		store.migrate().await.unwrap();
		Some(store)
	}

	fn user() -> User {
		let id = Id::new();

		User::new(
			format!("subject_{id}"),
			Profile {
				name: "Ada".into(),
				email: format!("{id}@example.com"),
				avatar: None,
			},
		)
	}

	#[tokio::test]
	async fn test_post_lifecycle() {
		let Some(store) = store().await else {
			return;
		};

		let user = user();
		let category = Category::new(format!("Category {}", Id::new()), None, None);

		store.insert_user(&user).await.unwrap();
		store.insert_category(&category).await.unwrap();

		assert!(matches!(
			store.insert_category(&category).await,
			Err(Error::Duplicate { field: "name", .. })
		));

		let orphan = Post::new(user.id.clone(), Id::new(), "Orphan".into(), "...".into());

		assert!(matches!(
			store.insert_post(&orphan).await,
			Err(Error::MissingReference {
				entity: "Category",
				..
			})
		));

		let mut post = Post::new(
			user.id.clone(),
			category.id.clone(),
			format!("Hello {}", Id::new()),
			"content".into(),
		);
		post.tags = vec!["rust".into()];

		store.insert_post(&post).await.unwrap();

		let first = store.increment_views(&post.id).await.unwrap().unwrap();
		let second = store.increment_views(&post.id).await.unwrap().unwrap();

		assert_eq!(second.view_count, first.view_count + 1);
		assert!(store
			.push_comment(&post.id, &Comment::new(user.id.clone(), "Nice"))
			.await
			.unwrap());

		let found = store.find_post_by_slug(&post.slug).await.unwrap().unwrap();

		assert_eq!(found.id, post.id);
		assert_eq!(found.tags, ["rust"]);
		assert_eq!(found.comments.len(), 1);

		let filter = PostFilter {
			category: Some(category.id.clone()),
			..PostFilter::default()
		};

		assert_eq!(store.count_posts(&filter).await.unwrap(), 1);
		assert_eq!(store.list_posts(&filter, 0, 10).await.unwrap().len(), 1);
		assert!(store.delete_post(&post.id).await.unwrap());
		assert!(store.find_post(&post.id).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_unique_user() {
		let Some(store) = store().await else {
			return;
		};

		let user = user();

		store.insert_user(&user).await.unwrap();

		let mut other = user.clone();
		other.id = Id::new();

		assert!(matches!(
			store.insert_user(&other).await,
			Err(Error::Duplicate {
				field: "providerId",
				..
			})
		));
		assert_eq!(
			store
				.find_user_by_provider(&user.provider_id)
				.await
				.unwrap()
				.map(|u| u.id),
			Some(user.id)
		);
	}
}
