//! Storage of uploaded post images on the local filesystem.

use std::path::PathBuf;

use axum::{
	body::Bytes,
	extract::multipart::{MultipartError, MultipartRejection},
	http::StatusCode,
};
use chrono::Utc;

use crate::error;

/// The multipart field that carries the image.
pub const FIELD_NAME: &str = "image";
/// The URL prefix that uploaded files are served under.
pub const URL_PREFIX: &str = "/uploads";

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Please upload an image file")]
	Missing,
	#[error("Only image files are allowed")]
	NotAnImage,
	#[error("File too large, the limit is {0} bytes")]
	TooLarge(usize),
	#[error("Invalid multipart request: {0}")]
	Multipart(#[from] MultipartError),
	#[error("Invalid multipart request: {0}")]
	Rejected(#[from] MultipartRejection),
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		StatusCode::BAD_REQUEST
	}
}

/// An image received from a client, not yet written to disk.
#[derive(Debug)]
pub struct Image {
	/// The file name reported by the client, if any.
	pub file_name: Option<String>,
	pub content_type: String,
	pub bytes: Bytes,
}

/// The extension a stored image gets for each accepted content type.
/// Anything else is rejected, whatever the client named the file.
const EXTENSIONS: &[(&str, &str)] = &[
	("image/jpeg", "jpg"),
	("image/jpg", "jpg"),
	("image/pjpeg", "jpg"),
	("image/png", "png"),
	("image/gif", "gif"),
	("image/webp", "webp"),
];

/// Returns the file extension for an accepted image content type, ignoring parameters and case.
#[must_use]
pub fn extension_for(content_type: &str) -> Option<&'static str> {
	let essence = content_type.split(';').next().unwrap_or_default().trim();

	EXTENSIONS
		.iter()
		.find(|(mime, _)| mime.eq_ignore_ascii_case(essence))
		.map(|(_, extension)| *extension)
}

impl Image {
	/// The extension of the stored file, including the leading dot.
	fn extension(&self) -> String {
		extension_for(&self.content_type).map_or_else(String::new, |ext| format!(".{ext}"))
	}
}

/// An image that has been written to the uploads directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
	pub filename: String,
	/// The URL path the image is served from.
	pub path: String,
}

/// The uploads directory and the size limit for files written to it.
#[derive(Debug, Clone)]
pub struct Uploads {
	pub dir: PathBuf,
	pub max_bytes: usize,
}

impl Uploads {
	#[must_use]
	pub fn new(dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
		Self {
			dir: dir.into(),
			max_bytes,
		}
	}

	/// Creates the uploads directory if it does not exist yet.
	pub async fn ensure_dir(&self) -> std::io::Result<()> {
		tokio::fs::create_dir_all(&self.dir).await
	}

	/// Writes `image` to a new, uniquely named file.
	pub async fn store(&self, image: &Image) -> std::io::Result<StoredImage> {
		let random = uuid::Uuid::new_v4().as_u128() % 1_000_000_000;
		let filename = format!(
			"image-{}-{random}{}",
			Utc::now().timestamp_millis(),
			image.extension()
		);

		tokio::fs::write(self.dir.join(&filename), &image.bytes).await?;

		tracing::info!(
			%filename,
			original = image.file_name.as_deref().unwrap_or_default(),
			bytes = image.bytes.len(),
			"stored uploaded image"
		);

		Ok(StoredImage {
			path: format!("{URL_PREFIX}/{filename}"),
			filename,
		})
	}
}
