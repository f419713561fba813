// self
use crate::_prelude::*;

/// Names of the unauthenticated auth routes beneath the API base URL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthRoutes {
	/// First path segment shared by every auth route.
	pub prefix: String,
	/// Route that exchanges a refresh token for a new pair.
	pub refresh: String,
	/// Route that exchanges credentials for a pair.
	pub sign_in: String,
	/// Route that registers an account and returns a pair.
	pub sign_up: String,
	/// Route that checks sign-up fields before the account is created.
	pub validate_sign_up: String,
}
impl Default for AuthRoutes {
	fn default() -> Self {
		Self {
			prefix: "auth".into(),
			refresh: "refresh-tokens".into(),
			sign_in: "signin".into(),
			sign_up: "signup".into(),
			validate_sign_up: "validate-signup".into(),
		}
	}
}
