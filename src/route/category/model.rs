use std::borrow::Cow;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::route::model::trimmed;

/// Accepts `#rgb` and `#rrggbb` colours in any case. An empty string selects the default colour.
fn validate_color(color: &str) -> Result<(), ValidationError> {
	if color.is_empty() {
		return Ok(());
	}

	let valid = color.strip_prefix('#').is_some_and(|digits| {
		matches!(digits.len(), 3 | 6) && digits.bytes().all(|b| b.is_ascii_hexdigit())
	});

	if valid {
		Ok(())
	} else {
		let mut error = ValidationError::new("color");
		error.message = Some(Cow::Borrowed(
			"Color must be a valid hex color (e.g., #667eea or #f0f)",
		));

		Err(error)
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, JsonSchema)]
pub struct CreateCategoryInput {
	#[validate(length(min = 2, max = 50, message = "Category name must be between 2 and 50 characters"))]
	#[serde(default, deserialize_with = "trimmed")]
	#[schemars(with = "String")]
	pub name: String,
	#[validate(length(max = 200, message = "Description cannot exceed 200 characters"))]
	pub description: Option<String>,
	/// A hex colour such as `#667eea`.
	#[validate(custom(function = "validate_color"))]
	pub color: Option<String>,
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_validate_color() {
		assert!(validate_color("").is_ok());
		assert!(validate_color("#667eea").is_ok());
		assert!(validate_color("#F0F").is_ok());
		assert!(validate_color("667eea").is_err());
		assert!(validate_color("#66").is_err());
		assert!(validate_color("#ggg").is_err());
	}
}
