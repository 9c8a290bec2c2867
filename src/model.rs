use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::slug;

pub const DEFAULT_COLOR: &str = "#667eea";
pub const DEFAULT_AVATAR: &str = "default-avatar.png";
pub const DEFAULT_FEATURED_IMAGE: &str = "default-post.jpg";

const ID_LENGTH: usize = 24;

/// A 24 character lowercase hexadecimal identifier.
///
/// The first 8 digits encode the creation time in seconds, so identifiers
/// created later sort after earlier ones. The remaining 16 are random.
#[derive(
	Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, JsonSchema, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct Id(String);

impl Id {
	#[must_use]
	pub fn new() -> Self {
		// Seconds since the epoch fit in 8 hex digits until 2106.
		#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
		let seconds = Utc::now().timestamp() as u32;
		let random = uuid::Uuid::new_v4().simple().to_string();

		Self(format!("{seconds:08x}{}", &random[..ID_LENGTH - 8]))
	}

	/// Parses an identifier, accepting upper or lower case digits.
	#[must_use]
	pub fn parse(value: &str) -> Option<Self> {
		if value.len() != ID_LENGTH || !value.bytes().all(|b| b.is_ascii_hexdigit()) {
			return None;
		}

		Some(Self(value.to_ascii_lowercase()))
	}

	#[must_use]
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl Default for Id {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for Id {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl<'de> Deserialize<'de> for Id {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let value = String::deserialize(deserializer)?;

		Self::parse(&value).ok_or_else(|| {
			de::Error::invalid_value(de::Unexpected::Str(&value), &"a 24 character hex id")
		})
	}
}

#[derive(
	Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
	#[default]
	User,
	Admin,
}

/// The profile of a person as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
	pub name: String,
	pub email: String,
	pub avatar: Option<String>,
}

/// A locally stored user, created the first time a token for
/// its provider subject is verified.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
	pub id: Id,
	/// The subject id assigned by the identity provider.
	pub provider_id: String,
	pub name: String,
	pub email: String,
	pub role: Role,
	pub avatar: String,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl User {
	#[must_use]
	pub fn new(provider_id: String, profile: Profile) -> Self {
		let now = Utc::now();

		Self {
			id: Id::new(),
			provider_id,
			name: profile.name,
			email: profile.email.to_lowercase(),
			role: Role::User,
			avatar: profile.avatar.unwrap_or_else(|| DEFAULT_AVATAR.to_owned()),
			created_at: now,
			updated_at: now,
		}
	}
}

/// A category that posts are filed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
	#[serde(rename = "_id")]
	pub id: Id,
	pub name: String,
	/// Derived from the name, unique across categories.
	pub slug: String,
	pub description: Option<String>,
	/// A hex colour used when rendering the category.
	pub color: String,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Category {
	#[must_use]
	pub fn new(name: String, description: Option<String>, color: Option<String>) -> Self {
		let now = Utc::now();

		Self {
			id: Id::new(),
			slug: slug::derive(&name, "category"),
			name,
			description,
			color: color.unwrap_or_else(|| DEFAULT_COLOR.to_owned()),
			created_at: now,
			updated_at: now,
		}
	}
}

/// A comment embedded in a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
	#[serde(rename = "_id")]
	pub id: Id,
	pub user: Id,
	pub content: String,
	pub created_at: DateTime<Utc>,
}

impl Comment {
	#[must_use]
	pub fn new(user: Id, content: &str) -> Self {
		Self {
			id: Id::new(),
			user,
			content: content.trim().to_owned(),
			created_at: Utc::now(),
		}
	}
}

/// A post as it is stored, with references to its author and category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
	pub id: Id,
	pub title: String,
	pub content: String,
	pub excerpt: Option<String>,
	/// Derived from the title, unique across posts.
	pub slug: String,
	pub author: Id,
	pub category: Id,
	pub tags: Vec<String>,
	pub is_published: bool,
	pub view_count: i64,
	pub comments: Vec<Comment>,
	pub featured_image: String,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Post {
	#[must_use]
	pub fn new(author: Id, category: Id, title: String, content: String) -> Self {
		let now = Utc::now();

		Self {
			id: Id::new(),
			slug: slug::derive(&title, "post"),
			title,
			content,
			excerpt: None,
			author,
			category,
			tags: Vec::new(),
			is_published: false,
			view_count: 0,
			comments: Vec::new(),
			featured_image: DEFAULT_FEATURED_IMAGE.to_owned(),
			created_at: now,
			updated_at: now,
		}
	}

	/// Whether `user` may modify or delete this post.
	#[must_use]
	pub fn is_editable_by(&self, user: &User) -> bool {
		self.author == user.id || user.role == Role::Admin
	}

	/// Changes the title, deriving a new slug only if the title actually changed.
	pub fn set_title(&mut self, title: String) {
		if self.title != title {
			self.slug = slug::derive(&title, "post");
			self.title = title;
		}
	}

	pub fn set_slug(&mut self, slug: &str) {
		self.slug = slug::derive(slug, "post");
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn user(role: Role) -> User {
		let mut user = User::new(
			"user_123".into(),
			Profile {
				name: "Ada".into(),
				email: "Ada@Example.com".into(),
				avatar: None,
			},
		);

		user.role = role;
		user
	}

	#[test]
	fn test_id_shape() {
		let id = Id::new();

		assert_eq!(id.as_str().len(), 24);
		assert!(id.as_str().bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')));
		assert_eq!(Id::parse(id.as_str()), Some(id));
	}

	#[test]
	fn test_id_parse() {
		assert_eq!(
			Id::parse("65A1B2C3D4E5F60718293A4B").map(|id| id.to_string()),
			Some("65a1b2c3d4e5f60718293a4b".into())
		);
		assert!(Id::parse("65a1b2c3d4e5f60718293a4").is_none());
		assert!(Id::parse("hello-world-hello-world!").is_none());
		assert!(serde_json::from_str::<Id>("\"not-an-id\"").is_err());
	}

	#[test]
	fn test_user_defaults() {
		let user = user(Role::User);

		assert_eq!(user.email, "ada@example.com");
		assert_eq!(user.avatar, DEFAULT_AVATAR);
		assert_eq!(user.role, Role::User);
	}

	#[test]
	fn test_is_editable_by() {
		let author = user(Role::User);
		let other = user(Role::User);
		let admin = user(Role::Admin);
		let post = Post::new(author.id.clone(), Id::new(), "Hello".into(), "World".into());

		assert!(post.is_editable_by(&author));
		assert!(!post.is_editable_by(&other));
		assert!(post.is_editable_by(&admin));
	}

	#[test]
	fn test_set_title() {
		let mut post = Post::new(Id::new(), Id::new(), "Hello World".into(), "...".into());

		assert_eq!(post.slug, "hello-world");

		post.set_slug("custom slug");
		post.set_title("Hello World".into());

		assert_eq!(post.slug, "custom-slug");

		post.set_title("Goodbye World".into());

		assert_eq!(post.slug, "goodbye-world");
	}

	#[test]
	fn test_category_defaults() {
		let category = Category::new("Rust & Friends".into(), None, None);

		assert_eq!(category.slug, "rust-friends");
		assert_eq!(category.color, DEFAULT_COLOR);
	}
}
