//! Unauthenticated auth-route client: refresh, sign-in, sign-up, and sign-up validation.
//!
//! [`AuthClient`] talks to the raw [`HttpTransport`] and never to the authenticating
//! pipeline. The refresh call therefore cannot be intercepted by the pipeline that asked for
//! it, and auth routes never carry an access token.

// self
use crate::{
	_prelude::*,
	auth::{
		EmailPasswordValidation, SignInRequest, SignUpRequest, SignUpValidation, TokenPair,
		TokenSecret, UsernameValidation, ValidateEmailPasswordRequest, ValidateUsernameRequest,
	},
	descriptor::ApiDescriptor,
	error::{ConfigError, RefreshError, RefreshTransportError},
	http::{ApiRequest, ApiResponse, HttpTransport, StatusCode},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

/// Boxed future returned by [`AuthEndpoint::refresh`].
pub type RefreshFuture<'a> =
	Pin<Box<dyn Future<Output = Result<TokenPair, RefreshError>> + 'a + Send>>;

const BODY_PREVIEW_LIMIT: usize = 256;

/// Exchanges a refresh token for a new pair.
///
/// Implementations must classify a rejected refresh token as
/// [`RefreshError::Unauthorized`] and every other failure as [`RefreshError::Transport`].
/// They must not write to the token store; the coordinator's leader does that once.
pub trait AuthEndpoint
where
	Self: 'static + Send + Sync,
{
	/// Calls the refresh route with `refresh_token` as the bearer credential.
	fn refresh<'a>(&'a self, refresh_token: &'a TokenSecret) -> RefreshFuture<'a>;
}

#[cfg(feature = "reqwest")]
/// Auth client specialized for the crate's default reqwest transport.
pub type ReqwestAuthClient = AuthClient<ReqwestTransport>;

/// HTTP client for the auth routes described by an [`ApiDescriptor`].
pub struct AuthClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Raw transport used for every auth-route call.
	pub transport: Arc<T>,
	/// Descriptor that names the auth routes.
	pub descriptor: ApiDescriptor,
}
impl<T> AuthClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a client over `transport`.
	pub fn new(transport: impl Into<Arc<T>>, descriptor: ApiDescriptor) -> Self {
		Self { transport: transport.into(), descriptor }
	}

	/// Exchanges a username (or e-mail) and password for tokens via `POST {prefix}/signin`.
	pub async fn sign_in(
		&self,
		username_or_email: impl Into<String>,
		password: impl Into<String>,
	) -> Result<TokenPair> {
		let body = SignInRequest {
			username_or_email: username_or_email.into(),
			password: password.into(),
		};

		self.post_unauthenticated(FlowKind::SignIn, "sign_in", self.descriptor.sign_in_url(), &body)
			.await
	}

	/// Registers an account and returns its first pair via `POST {prefix}/signup`.
	pub async fn sign_up(
		&self,
		username: impl Into<String>,
		password: impl Into<String>,
		email: impl Into<String>,
	) -> Result<TokenPair> {
		let body = SignUpRequest {
			username: username.into(),
			password: password.into(),
			email: email.into(),
		};

		self.post_unauthenticated(FlowKind::SignUp, "sign_up", self.descriptor.sign_up_url(), &body)
			.await
	}

	/// Asks the server whether an e-mail address and password are acceptable for a new
	/// account, via `POST {prefix}/validate-signup`.
	///
	/// A verdict other than [`SignUpValidation::Success`] is a normal answer, not an error.
	pub async fn validate_email_password(
		&self,
		email: impl Into<String>,
		password: impl Into<String>,
	) -> Result<EmailPasswordValidation> {
		let body = ValidateEmailPasswordRequest { email: email.into(), password: password.into() };

		self.post_unauthenticated(
			FlowKind::ValidateSignUp,
			"validate_email_password",
			self.descriptor.validate_sign_up_url(),
			&body,
		)
		.await
	}

	/// Asks the server whether `username` is free and well-formed.
	pub async fn validate_username(&self, username: impl Into<String>) -> Result<SignUpValidation> {
		let body = ValidateUsernameRequest { username: username.into() };
		let verdict: UsernameValidation = self
			.post_unauthenticated(
				FlowKind::ValidateSignUp,
				"validate_username",
				self.descriptor.validate_sign_up_url(),
				&body,
			)
			.await?;

		Ok(verdict.username)
	}

	/// Posts `body` as JSON to an auth route and decodes the success body.
	///
	/// The request never carries a bearer token. Non-success statuses become
	/// [`Error::AuthRejected`].
	async fn post_unauthenticated<B, R>(
		&self,
		kind: FlowKind,
		stage: &'static str,
		url: Result<Url, ConfigError>,
		body: &B,
	) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		let span = FlowSpan::new(kind, stage);

		obs::record_flow_outcome(kind, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let request = ApiRequest::post(url?).with_json(body).map_err(ConfigError::from)?;
				let response = self.transport.execute(request).await?;

				if !response.is_success() {
					obs::event!(
						debug,
						flow = kind.as_str(),
						status = response.status.as_u16(),
						"auth route rejected the request"
					);

					return Err(Error::AuthRejected {
						status: response.status.as_u16(),
						message: response.body_preview(BODY_PREVIEW_LIMIT),
					});
				}

				response.json()
			})
			.await;

		obs::record_result(kind, &result);

		result
	}

	async fn request_refresh(
		&self,
		refresh_token: &TokenSecret,
	) -> Result<TokenPair, RefreshError> {
		let url = self.descriptor.refresh_url().map_err(|e| {
			RefreshError::from(RefreshTransportError::network(e))
		})?;
		let request = ApiRequest::post(url).with_bearer(refresh_token).map_err(|_| {
			RefreshError::unauthorized("stored refresh token is not a valid header value")
		})?;
		let response =
			self.transport.execute(request).await.map_err(RefreshTransportError::network)?;

		classify_refresh_response(response)
	}
}
impl<T> AuthEndpoint for AuthClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn refresh<'a>(&'a self, refresh_token: &'a TokenSecret) -> RefreshFuture<'a> {
		Box::pin(self.request_refresh(refresh_token))
	}
}
impl<T> Clone for AuthClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self { transport: Arc::clone(&self.transport), descriptor: self.descriptor.clone() }
	}
}
impl<T> Debug for AuthClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthClient").field("descriptor", &self.descriptor).finish()
	}
}

/// Maps a refresh-route response onto the refresh error taxonomy.
///
/// `401` and `403` mean the refresh token itself was rejected. Any other non-success status
/// is transient, as is a success body that does not decode into a pair.
fn classify_refresh_response(response: ApiResponse) -> Result<TokenPair, RefreshError> {
	match response.status {
		StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN =>
			Err(RefreshError::unauthorized(format_args!(
				"refresh endpoint answered {}",
				response.status
			))),
		status if status.is_success() => TokenPair::from_json_slice(&response.body)
			.map_err(|source| RefreshTransportError::Parse { source: Arc::new(source) }.into()),
		status => Err(RefreshTransportError::Endpoint {
			status: status.as_u16(),
			retry_after: response.retry_after(),
		}
		.into()),
	}
}
