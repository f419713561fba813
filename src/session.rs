//! Application-facing session bundling the token store, auth client, and pipeline.

// self
use crate::{
	_prelude::*,
	auth::{EmailPasswordValidation, SignUpValidation},
	descriptor::ApiDescriptor,
	endpoint::AuthClient,
	http::{ApiRequest, ApiResponse, HttpTransport},
	pipeline::AuthPipeline,
	store::TokenStore,
};
#[cfg(feature = "reqwest")] use crate::{error::ConfigError, http::ReqwestTransport};

#[cfg(feature = "reqwest")]
/// Session specialized for the crate's default reqwest transport.
pub type ReqwestSession = Session<ReqwestTransport>;

/// One signed-in (or signed-out) user of a protected API.
///
/// The session owns exactly one refresh coordinator through its pipeline. Clone the
/// session, or [`Session::pipeline`], to share it across tasks; clones take part in the
/// same refresh waves.
pub struct Session<T>
where
	T: ?Sized + HttpTransport,
{
	auth: Arc<AuthClient<T>>,
	store: Arc<dyn TokenStore>,
	pipeline: AuthPipeline<T>,
}
impl<T> Session<T>
where
	T: ?Sized + HttpTransport,
{
	/// Wires a session over `transport` and `store`.
	///
	/// The auth client and the pipeline share the transport, but auth routes are only ever
	/// called through the auth client.
	pub fn new(transport: Arc<T>, store: Arc<dyn TokenStore>, descriptor: ApiDescriptor) -> Self {
		let auth = Arc::new(AuthClient::new(Arc::clone(&transport), descriptor.clone()));
		let pipeline =
			AuthPipeline::new(transport, Arc::clone(&auth), Arc::clone(&store), descriptor);

		Self { auth, store, pipeline }
	}

	/// Signs in with a username (or e-mail) and password and stores the issued pair.
	pub async fn sign_in(
		&self,
		username_or_email: impl Into<String>,
		password: impl Into<String>,
	) -> Result<()> {
		let pair = self.auth.sign_in(username_or_email, password).await?;

		self.store.save(pair).await?;

		Ok(())
	}

	/// Registers an account and stores the issued pair.
	pub async fn sign_up(
		&self,
		username: impl Into<String>,
		password: impl Into<String>,
		email: impl Into<String>,
	) -> Result<()> {
		let pair = self.auth.sign_up(username, password, email).await?;

		self.store.save(pair).await?;

		Ok(())
	}

	/// Checks an e-mail address and password before [`Session::sign_up`]. Nothing is stored.
	pub async fn validate_email_password(
		&self,
		email: impl Into<String>,
		password: impl Into<String>,
	) -> Result<EmailPasswordValidation> {
		self.auth.validate_email_password(email, password).await
	}

	/// Checks a username before [`Session::sign_up`]. Nothing is stored.
	pub async fn validate_username(&self, username: impl Into<String>) -> Result<SignUpValidation> {
		self.auth.validate_username(username).await
	}

	/// Forgets the stored pair. Call this when a send reports
	/// [`Error::requires_reauthentication`].
	pub async fn sign_out(&self) -> Result<()> {
		self.store.clear().await?;
		crate::obs::event!(info, "session signed out; token pair cleared");

		Ok(())
	}

	/// Returns `true` when an access token is stored.
	pub async fn is_signed_in(&self) -> Result<bool> {
		Ok(self.store.access_token().await?.is_some())
	}

	/// Sends a request through the authenticating pipeline.
	pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		self.pipeline.send(request).await
	}

	/// Authenticating pipeline for protected routes.
	pub fn pipeline(&self) -> &AuthPipeline<T> {
		&self.pipeline
	}

	/// Auth client for the unauthenticated routes.
	pub fn auth(&self) -> &AuthClient<T> {
		&self.auth
	}

	/// Token store backing the session.
	pub fn store(&self) -> &Arc<dyn TokenStore> {
		&self.store
	}
}
#[cfg(feature = "reqwest")]
impl Session<ReqwestTransport> {
	/// Builds a session over a default reqwest client.
	pub fn with_reqwest(store: Arc<dyn TokenStore>, descriptor: ApiDescriptor) -> Result<Self> {
		let client = ReqwestClient::builder().build().map_err(ConfigError::from)?;

		Ok(Self::new(Arc::new(ReqwestTransport::with_client(client)), store, descriptor))
	}
}
impl<T> Clone for Session<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			auth: Arc::clone(&self.auth),
			store: Arc::clone(&self.store),
			pipeline: self.pipeline.clone(),
		}
	}
}
impl<T> Debug for Session<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Session").field("pipeline", &self.pipeline).finish()
	}
}
