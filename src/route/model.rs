use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::model::Id;

/// These can be removed when [`serde`] supports
/// literal defaults: <https://github.com/serde-rs/serde/issues/368>
#[inline]
pub(crate) fn one() -> i64 {
	1
}

#[inline]
pub(crate) fn ten() -> i64 {
	10
}

#[inline]
pub(crate) fn yes() -> bool {
	true
}

/// Deserializes a string without its surrounding whitespace, so that
/// length rules apply to what is stored.
pub(crate) fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(String::deserialize(deserializer)?.trim().to_owned())
}

pub(crate) fn trimmed_option<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(Option::<String>::deserialize(deserializer)?.map(|value| value.trim().to_owned()))
}

/// A validated page request.
#[derive(Debug, Clone, Copy)]
pub struct Paginate {
	/// The page number to return (1-indexed).
	pub page: i64,
	/// The number of items to return per page.
	pub limit: i64,
}

impl Paginate {
	pub fn offset(&self) -> i64 {
		(self.page - 1).saturating_mul(self.limit)
	}

	pub fn limit(&self) -> i64 {
		self.limit
	}

	/// The number of pages needed to show `total` items.
	pub fn pages(&self, total: i64) -> i64 {
		(total + self.limit - 1) / self.limit
	}
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct IdInput {
	pub id: Id,
}

/// How a resource is looked up from a path segment.
#[derive(Debug, PartialEq, Eq)]
pub enum Lookup {
	Id(Id),
	Slug(String),
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct IdOrSlugInput {
	/// Either a 24 character hex id or a slug.
	pub id: String,
}

impl IdOrSlugInput {
	pub fn lookup(self) -> Lookup {
		Id::parse(&self.id).map_or(Lookup::Slug(self.id), Lookup::Id)
	}
}

/// A successful response carrying a single item.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct Data<T> {
	pub success: bool,
	pub data: T,
}

impl<T> Data<T> {
	pub fn new(data: T) -> Self {
		Self {
			success: true,
			data,
		}
	}
}

/// A successful response carrying every matching item.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct Listing<T> {
	pub success: bool,
	/// The number of items in `data`.
	pub count: usize,
	pub data: Vec<T>,
}

impl<T> Listing<T> {
	pub fn new(data: Vec<T>) -> Self {
		Self {
			success: true,
			count: data.len(),
			data,
		}
	}
}

/// A successful response carrying one page of items.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct Page<T> {
	pub success: bool,
	/// The number of items in `data`.
	pub count: usize,
	/// The number of items across all pages.
	pub total: i64,
	pub page: i64,
	pub pages: i64,
	pub data: Vec<T>,
}

impl<T> Page<T> {
	pub fn new(data: Vec<T>, paginate: Paginate, total: i64) -> Self {
		Self {
			success: true,
			count: data.len(),
			total,
			page: paginate.page,
			pages: paginate.pages(total),
			data,
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_paginate_offset() {
		let mut paginate = Paginate { page: 1, limit: 10 };

		assert_eq!(paginate.offset(), 0);

		paginate.page = 2;

		assert_eq!(paginate.offset(), 10);

		paginate.limit = 5;

		assert_eq!(paginate.offset(), 5);

		paginate.page = 3;

		assert_eq!(paginate.offset(), 10);
	}

	#[test]
	fn test_paginate_pages() {
		let paginate = Paginate { page: 3, limit: 9 };

		assert_eq!(paginate.limit(), 9);
		assert_eq!(paginate.pages(20), 3);
		assert_eq!(paginate.pages(18), 2);
		assert_eq!(paginate.pages(0), 0);
	}

	#[test]
	fn test_lookup() {
		assert_eq!(
			IdOrSlugInput {
				id: "65a1b2c3d4e5f60718293a4b".into()
			}
			.lookup(),
			Lookup::Id(Id::parse("65a1b2c3d4e5f60718293a4b").unwrap())
		);
		assert_eq!(
			IdOrSlugInput {
				id: "hello-world".into()
			}
			.lookup(),
			Lookup::Slug("hello-world".into())
		);
	}
}
