use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::{Id, Role, User};

/// The authenticated user, as shown to themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Profile {
	pub id: Id,
	pub name: String,
	pub email: String,
	pub role: Role,
	/// The avatar image, either a URL or a filename under `/uploads`.
	pub avatar: String,
}

impl From<User> for Profile {
	fn from(user: User) -> Self {
		Self {
			id: user.id,
			name: user.name,
			email: user.email,
			role: user.role,
			avatar: user.avatar,
		}
	}
}
