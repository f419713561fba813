//! Immutable access/refresh token pair replaced wholesale on every refresh.

// self
use crate::{_prelude::*, auth::secret::TokenSecret};

/// Access and refresh credentials issued together by the auth endpoint.
///
/// A pair is never mutated in place. Stores swap the whole value, so a reader always sees
/// the access token next to the refresh token it was issued with. The JSON form uses the
/// backend's camel-case keys (`accessToken`, `refreshToken`).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
	/// Short-lived credential attached to protected requests.
	pub access_token: TokenSecret,
	/// Longer-lived credential used solely to obtain a new pair.
	pub refresh_token: TokenSecret,
}
impl TokenPair {
	/// Creates a pair from raw token strings.
	pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
		Self {
			access_token: TokenSecret::new(access_token),
			refresh_token: TokenSecret::new(refresh_token),
		}
	}

	/// Decodes a pair from an auth endpoint response body, reporting the failing JSON path.
	pub fn from_json_slice(
		body: &[u8],
	) -> Result<Self, serde_path_to_error::Error<serde_json::Error>> {
		let mut de = serde_json::Deserializer::from_slice(body);

		serde_path_to_error::deserialize(&mut de)
	}
}
impl Debug for TokenPair {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenPair")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &"<redacted>")
			.finish()
	}
}
