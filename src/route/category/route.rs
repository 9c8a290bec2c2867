use axum::extract::State;
use macros::route;

use crate::{
	extract::{Auth, Created, Json, Path},
	model::Category,
	openapi::tag,
	route::model::{Data, IdOrSlugInput, Listing, Lookup},
	store, Database,
};

use super::{model, Error, RouteError};

/// Get all categories
/// Returns every category, sorted by name.
#[route(tag = tag::CATEGORY)]
pub async fn get_categories(
	State(database): State<Database>,
) -> Result<Json<Listing<Category>>, RouteError> {
	let categories = database.list_categories().await?;

	Ok(Json(Listing::new(categories)))
}

/// Get single category
/// Returns a single category by its id or slug.
#[route(tag = tag::CATEGORY)]
pub async fn get_category(
	State(database): State<Database>,
	Path(input): Path<IdOrSlugInput>,
) -> Result<Json<Data<Category>>, RouteError> {
	let id_or_slug = input.id.clone();
	let category = match input.lookup() {
		Lookup::Id(id) => database.find_category(&id).await?,
		Lookup::Slug(slug) => database.find_category_by_slug(&slug).await?,
	};

	Ok(Json(Data::new(
		category.ok_or(Error::UnknownCategory(id_or_slug))?,
	)))
}

/// Create category
/// Creates a new category. The slug is derived from the name, and both must be unique.
#[route(tag = tag::CATEGORY, secure)]
pub async fn create_category(
	State(database): State<Database>,
	_auth: Auth,
	Json(input): Json<model::CreateCategoryInput>,
) -> Result<Created<Data<Category>>, RouteError> {
	let category = Category::new(
		input.name,
		input.description.filter(|description| !description.is_empty()),
		input.color.filter(|color| !color.is_empty()),
	);

	database
		.insert_category(&category)
		.await
		.map_err(|error| match error {
			store::Error::Duplicate { .. } => Error::Exists.into(),
			error => RouteError::from(error),
		})?;

	tracing::info!(category = %category.id, slug = %category.slug, "created category");

	Ok(Created(Data::new(category)))
}
