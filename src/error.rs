use aide::{gen::GenContext, openapi, OperationOutput};
use axum::{
	body::Body,
	extract::rejection::{JsonRejection, PathRejection, QueryRejection},
	http::{Response, StatusCode},
	response::IntoResponse,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::store;

const INTERNAL_MESSAGE: &str = "Something went wrong!";

/// A validation failure on a single input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FieldError {
	/// The name of the offending field.
	pub field: String,
	pub message: String,
}

/// The body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ErrorBody {
	/// Always `false`.
	pub success: bool,
	/// A human readable description of the error.
	pub error: String,
	/// Field level failures, present when a request did not validate.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub details: Vec<FieldError>,
}

impl ErrorBody {
	pub fn new(error: impl Into<String>) -> Self {
		Self {
			success: false,
			error: error.into(),
			details: Vec::new(),
		}
	}
}

/// Describes how a route-specific error is presented to the client.
///
/// The [`Display`](std::fmt::Display) output is sent verbatim unless
/// [`ErrorShape::message`] is overridden, so it must not contain anything sensitive.
pub trait ErrorShape: std::error::Error {
	fn status(&self) -> StatusCode;

	fn message(&self) -> String {
		self.to_string()
	}
}

/// Errors shared by every route: extractor rejections, store failures
/// and anything else that is not specific to a single resource.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
	#[error("validation error: {0}")]
	Validation(#[from] validator::ValidationErrors),
	#[error("json error: {0}")]
	Json(#[from] JsonRejection),
	#[error("query error: {0}")]
	Query(#[from] QueryRejection),
	#[error("path error: {0}")]
	Path(#[from] PathRejection),
	#[error("store error: {0}")]
	Store(#[from] store::Error),
	#[error("io error: {0}")]
	Io(#[from] std::io::Error),
	#[error("unknown route {0}")]
	UnknownRoute(String),
}

fn field_errors(errors: &validator::ValidationErrors) -> Vec<FieldError> {
	let mut details = errors
		.field_errors()
		.into_iter()
		.flat_map(|(field, errors)| {
			errors.iter().map(move |error| FieldError {
				field: field.to_string(),
				message: error
					.message
					.as_ref()
					.map_or_else(|| error.code.to_string(), ToString::to_string),
			})
		})
		.collect::<Vec<_>>();

	details.sort_by(|a, b| a.field.cmp(&b.field));
	details
}

const DATA_ERROR_PREFIX: &str = "Failed to deserialize the JSON body into the target type: ";

/// Splits a JSON data error such as `tags: invalid type ...` into the offending
/// field and its message. Errors at the document root have no field.
fn data_error(text: &str) -> Option<FieldError> {
	let (field, message) = text.strip_prefix(DATA_ERROR_PREFIX)?.split_once(": ")?;

	if field.is_empty() || field.contains(char::is_whitespace) {
		return None;
	}

	Some(FieldError {
		field: field.to_owned(),
		message: message.to_owned(),
	})
}

fn internal(error: &dyn std::error::Error) -> (StatusCode, ErrorBody) {
	tracing::error!(%error, "request failed");

	let message = if cfg!(debug_assertions) {
		error.to_string()
	} else {
		INTERNAL_MESSAGE.to_owned()
	};

	(StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::new(message))
}

impl AppError {
	fn shape(&self) -> (StatusCode, ErrorBody) {
		match self {
			Self::Validation(errors) => (
				StatusCode::BAD_REQUEST,
				ErrorBody {
					details: field_errors(errors),
					..ErrorBody::new("Validation failed")
				},
			),
			Self::Json(rejection @ JsonRejection::JsonDataError(..)) => {
				let text = rejection.body_text();

				match data_error(&text) {
					Some(detail) => (
						StatusCode::BAD_REQUEST,
						ErrorBody {
							details: vec![detail],
							..ErrorBody::new("Validation failed")
						},
					),
					None => (StatusCode::BAD_REQUEST, ErrorBody::new(text)),
				}
			}
			Self::Json(rejection) => (StatusCode::BAD_REQUEST, ErrorBody::new(rejection.body_text())),
			Self::Query(rejection) => {
				(StatusCode::BAD_REQUEST, ErrorBody::new(rejection.body_text()))
			}
			Self::Path(rejection) => (rejection.status(), ErrorBody::new(rejection.body_text())),
			Self::Store(store::Error::Duplicate { field, value }) => (
				StatusCode::BAD_REQUEST,
				ErrorBody::new(format!(
					"Duplicate {field} value: {value}. Please use another value!"
				)),
			),
			Self::Store(store::Error::MissingReference { entity, id }) => (
				StatusCode::NOT_FOUND,
				ErrorBody::new(format!("{entity} not found with id of {id}")),
			),
			Self::Store(error) => internal(error),
			Self::Io(error) => internal(error),
			Self::UnknownRoute(path) => (
				StatusCode::NOT_FOUND,
				ErrorBody::new(format!("Route {path} not found")),
			),
		}
	}
}

impl IntoResponse for AppError {
	fn into_response(self) -> Response<Body> {
		let (status, body) = self.shape();

		(status, axum::Json(body)).into_response()
	}
}

/// The error returned by a route handler: either a shared [`AppError`]
/// or the route module's own error type.
#[derive(Debug)]
pub enum RouteError<E> {
	App(AppError),
	Route(E),
}

impl<E: ErrorShape> From<E> for RouteError<E> {
	fn from(error: E) -> Self {
		Self::Route(error)
	}
}

impl<E> From<AppError> for RouteError<E> {
	fn from(error: AppError) -> Self {
		Self::App(error)
	}
}

impl<E> From<store::Error> for RouteError<E> {
	fn from(error: store::Error) -> Self {
		Self::App(AppError::Store(error))
	}
}

impl<E> From<std::io::Error> for RouteError<E> {
	fn from(error: std::io::Error) -> Self {
		Self::App(AppError::Io(error))
	}
}

impl<E: ErrorShape> IntoResponse for RouteError<E> {
	fn into_response(self) -> Response<Body> {
		match self {
			Self::App(error) => error.into_response(),
			Self::Route(error) => {
				let status = error.status();
				let body = if status.is_server_error() {
					internal(&error).1
				} else {
					ErrorBody::new(error.message())
				};

				(status, axum::Json(body)).into_response()
			}
		}
	}
}

impl OperationOutput for AppError {
	type Inner = ErrorBody;

	fn operation_response(
		ctx: &mut GenContext,
		operation: &mut openapi::Operation,
	) -> Option<openapi::Response> {
		axum::Json::<ErrorBody>::operation_response(ctx, operation)
	}
}

impl<E> OperationOutput for RouteError<E> {
	type Inner = ErrorBody;

	fn operation_response(
		ctx: &mut GenContext,
		operation: &mut openapi::Operation,
	) -> Option<openapi::Response> {
		axum::Json::<ErrorBody>::operation_response(ctx, operation)
	}
}
