use aide::{
	openapi::{MediaType, Operation, ReferenceOr, RequestBody},
	OperationInput,
};
use axum::{
	body::Bytes,
	extract::{multipart::MultipartError, FromRef, FromRequest, Multipart, Request},
	http::StatusCode,
};

use crate::{
	error::RouteError,
	upload::{self, Image, Uploads},
};

/// Extracts a single image from a `multipart/form-data` body.
///
/// The image is read from the [`upload::FIELD_NAME`] field and buffered in
/// memory. Bodies over the configured limit, or whose content type is not one
/// of the accepted image types, are rejected before anything is written to disk.
#[derive(Debug)]
pub struct ImageUpload(pub Image);

fn chunk_error(max_bytes: usize) -> impl Fn(MultipartError) -> upload::Error {
	move |error| {
		if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
			upload::Error::TooLarge(max_bytes)
		} else {
			upload::Error::Multipart(error)
		}
	}
}

#[axum::async_trait]
impl<S> FromRequest<S> for ImageUpload
where
	Uploads: FromRef<S>,
	S: Send + Sync,
{
	type Rejection = RouteError<upload::Error>;

	async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
		let max_bytes = Uploads::from_ref(state).max_bytes;
		let mut multipart = Multipart::from_request(req, state)
			.await
			.map_err(upload::Error::from)?;

		while let Some(mut field) = multipart
			.next_field()
			.await
			.map_err(chunk_error(max_bytes))?
		{
			if field.name() != Some(upload::FIELD_NAME) {
				continue;
			}

			let content_type = field.content_type().unwrap_or_default().to_owned();

			if upload::extension_for(&content_type).is_none() {
				return Err(upload::Error::NotAnImage.into());
			}

			let file_name = field.file_name().map(ToOwned::to_owned);
			let mut bytes = Vec::new();

			while let Some(chunk) = field.chunk().await.map_err(chunk_error(max_bytes))? {
				if bytes.len() + chunk.len() > max_bytes {
					return Err(upload::Error::TooLarge(max_bytes).into());
				}

				bytes.extend_from_slice(&chunk);
			}

			return Ok(Self(Image {
				file_name,
				content_type,
				bytes: Bytes::from(bytes),
			}));
		}

		Err(upload::Error::Missing.into())
	}
}

impl OperationInput for ImageUpload {
	fn operation_input(_ctx: &mut aide::gen::GenContext, operation: &mut Operation) {
		operation.request_body = Some(ReferenceOr::Item(RequestBody {
			description: Some(format!(
				"A `multipart/form-data` body with the image in the `{}` field.",
				upload::FIELD_NAME
			)),
			content: [("multipart/form-data".to_owned(), MediaType::default())]
				.into_iter()
				.collect(),
			required: true,
			..Default::default()
		}));
	}
}
