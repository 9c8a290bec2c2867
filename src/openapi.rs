use aide::{
	openapi::{SecurityScheme, Tag},
	transform::TransformOpenApi,
};

use crate::{error, extract::Json};

pub const SECURITY_SCHEME_BEARER: &str = "Bearer";

pub mod tag {
	pub const AUTH: &str = "Auth";
	pub const CATEGORY: &str = "Category";
	pub const POST: &str = "Post";
}

pub fn docs(api: TransformOpenApi) -> TransformOpenApi {
	api.title("Blog API")
		.summary("Posts, categories and comments for a blog")
		.description(include_str!("../README.md"))
		.tag(Tag {
			name: tag::AUTH.into(),
			description: Some("The authenticated user".into()),
			..Default::default()
		})
		.tag(Tag {
			name: tag::CATEGORY.into(),
			description: Some("Category management".into()),
			..Default::default()
		})
		.tag(Tag {
			name: tag::POST.into(),
			description: Some("Posts, comments and image uploads".into()),
			..Default::default()
		})
		.security_scheme(
			SECURITY_SCHEME_BEARER,
			SecurityScheme::Http {
				scheme: "bearer".into(),
				bearer_format: Some("JWT".into()),
				description: Some("A token issued by the identity provider".into()),
				extensions: Default::default(),
			},
		)
		.default_response_with::<Json<error::ErrorBody>, _>(|res| {
			res.example(error::ErrorBody {
				details: vec![error::FieldError {
					field: "title".into(),
					message: "Title must be at least 3 characters".into(),
				}],
				..error::ErrorBody::new("Validation failed")
			})
		})
}
