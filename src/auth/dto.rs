//! Request and response bodies for the unauthenticated auth routes.
//!
//! Field names follow the API's camel-case JSON convention.

// self
use crate::_prelude::*;

/// Body of `POST auth/signin`.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
	/// Account username or e-mail address; the server accepts either.
	pub username_or_email: String,
	/// Plain-text password; sent only over the auth route.
	pub password: String,
}
impl Debug for SignInRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SignInRequest")
			.field("username_or_email", &self.username_or_email)
			.field("password", &"<redacted>")
			.finish()
	}
}

/// Body of `POST auth/signup`.
#[derive(Clone, Serialize)]
pub struct SignUpRequest {
	/// Public username.
	pub username: String,
	/// Plain-text password; sent only over the auth route.
	pub password: String,
	/// Account e-mail address.
	pub email: String,
}
impl Debug for SignUpRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SignUpRequest")
			.field("username", &self.username)
			.field("password", &"<redacted>")
			.field("email", &self.email)
			.finish()
	}
}

/// Body of `POST auth/validate-signup` when checking the first sign-up step.
#[derive(Clone, Serialize)]
pub struct ValidateEmailPasswordRequest {
	/// Candidate e-mail address.
	pub email: String,
	/// Candidate password.
	pub password: String,
}
impl Debug for ValidateEmailPasswordRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ValidateEmailPasswordRequest")
			.field("email", &self.email)
			.field("password", &"<redacted>")
			.finish()
	}
}

/// Body of `POST auth/validate-signup` when checking a username.
#[derive(Clone, Debug, Serialize)]
pub struct ValidateUsernameRequest {
	/// Candidate username.
	pub username: String,
}

/// Server verdict for one sign-up field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignUpValidation {
	/// The value can be used.
	Success,
	/// The value is malformed (bad e-mail syntax, weak password, illegal characters).
	InvalidFormat,
	/// The value is already taken by another account.
	Conflict,
}
impl SignUpValidation {
	/// Returns `true` for [`SignUpValidation::Success`].
	pub const fn is_success(self) -> bool {
		matches!(self, SignUpValidation::Success)
	}
}

/// Response of the e-mail/password validation call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailPasswordValidation {
	/// Verdict for the e-mail address.
	pub email: SignUpValidation,
	/// Verdict for the password.
	pub password: SignUpValidation,
}
impl EmailPasswordValidation {
	/// Returns `true` when both fields passed.
	pub const fn is_success(&self) -> bool {
		self.email.is_success() && self.password.is_success()
	}
}

/// Response of the username validation call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsernameValidation {
	/// Verdict for the username.
	pub username: SignUpValidation,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn sign_in_body_uses_camel_case_and_redacts_password() {
		let body = SignInRequest { username_or_email: "ada".into(), password: "hunter2".into() };
		let json = serde_json::to_value(&body).expect("Sign-in body should serialize.");

		assert_eq!(json, serde_json::json!({ "usernameOrEmail": "ada", "password": "hunter2" }));
		assert!(!format!("{body:?}").contains("hunter2"));
	}

	#[test]
	fn validation_verdicts_decode_from_upper_snake_case() {
		let verdict: EmailPasswordValidation =
			serde_json::from_str(r#"{"email":"CONFLICT","password":"INVALID_FORMAT"}"#)
				.expect("Validation response should decode.");

		assert_eq!(verdict.email, SignUpValidation::Conflict);
		assert_eq!(verdict.password, SignUpValidation::InvalidFormat);
		assert!(!verdict.is_success());
		assert!(serde_json::from_str::<SignUpValidation>(r#""MAYBE""#).is_err());
	}
}
