//! URL slugs derived from titles and names.

use chrono::Utc;

/// Converts `source` into a lowercase, hyphen separated slug.
///
/// Only ASCII letters, digits and underscores are kept. Runs of whitespace
/// and hyphens collapse into a single hyphen, and the result never starts
/// or ends with one.
#[must_use]
pub fn slugify(source: &str) -> String {
	let mut slug = String::with_capacity(source.len());
	let mut separator = false;

	for c in source.trim().chars().flat_map(char::to_lowercase) {
		if c.is_ascii_alphanumeric() || c == '_' {
			if separator && !slug.is_empty() {
				slug.push('-');
			}

			separator = false;
			slug.push(c);
		} else if c.is_whitespace() || c == '-' {
			separator = true;
		}
	}

	slug
}

/// Derives a slug for an entity, falling back to `<entity>-<millis>` when
/// nothing usable is left of the source.
#[must_use]
pub fn derive(source: &str, entity: &str) -> String {
	let slug = slugify(source);

	if slug.is_empty() {
		format!("{entity}-{}", Utc::now().timestamp_millis())
	} else {
		slug
	}
}
