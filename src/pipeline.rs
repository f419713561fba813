//! Authenticating request pipeline.
//!
//! [`AuthPipeline`] attaches the stored access token to every request bound for a protected
//! route, and turns a `401 Unauthorized` into one coordinated refresh followed by exactly one
//! retry. Requests for auth routes or for hosts outside the API base are forwarded untouched.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	coordinator::RefreshCoordinator,
	descriptor::{ApiDescriptor, RouteKind},
	endpoint::{AuthClient, AuthEndpoint},
	error::{ConfigError, RefreshError, RefreshTransportError},
	http::{ApiRequest, ApiResponse, HttpTransport},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::TokenStore,
};

/// Protected-route client that drives refresh-and-retry through a shared coordinator.
///
/// Clones share the transport, auth endpoint, store, and coordinator, so every clone takes
/// part in the same refresh waves.
pub struct AuthPipeline<T, A = AuthClient<T>>
where
	T: ?Sized + HttpTransport,
	A: ?Sized + AuthEndpoint,
{
	transport: Arc<T>,
	auth: Arc<A>,
	store: Arc<dyn TokenStore>,
	descriptor: ApiDescriptor,
	coordinator: Arc<RefreshCoordinator>,
}
impl<T, A> AuthPipeline<T, A>
where
	T: ?Sized + HttpTransport,
	A: ?Sized + AuthEndpoint,
{
	/// Creates a pipeline with its own coordinator, bounded by the descriptor's refresh timeout.
	pub fn new(
		transport: Arc<T>,
		auth: Arc<A>,
		store: Arc<dyn TokenStore>,
		descriptor: ApiDescriptor,
	) -> Self {
		let coordinator = Arc::new(RefreshCoordinator::for_descriptor(&descriptor));

		Self { transport, auth, store, descriptor, coordinator }
	}

	/// Replaces the coordinator, e.g. to share one across pipelines that use the same store.
	pub fn with_coordinator(mut self, coordinator: Arc<RefreshCoordinator>) -> Self {
		self.coordinator = coordinator;

		self
	}

	/// Coordinator used for refresh waves.
	pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
		&self.coordinator
	}

	/// Descriptor used to classify and resolve request URLs.
	pub fn descriptor(&self) -> &ApiDescriptor {
		&self.descriptor
	}

	/// Builds a `GET` request for `path` relative to the API base.
	pub fn get(&self, path: &str) -> Result<ApiRequest> {
		Ok(ApiRequest::get(self.descriptor.resolve(path)?))
	}

	/// Builds a JSON `POST` request for `path` relative to the API base.
	pub fn post_json<B>(&self, path: &str, body: &B) -> Result<ApiRequest>
	where
		B: ?Sized + Serialize,
	{
		let url = self.descriptor.resolve(path)?;

		Ok(ApiRequest::post(url).with_json(body).map_err(ConfigError::from)?)
	}

	/// Sends `request` and returns the response.
	///
	/// Protected routes carry the current access token. A `401` triggers one coordinated
	/// refresh and one retry; any other status, the retry's included, is returned as-is
	/// except a second `401`, which becomes [`Error::SecondaryUnauthorized`].
	pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		const KIND: FlowKind = FlowKind::Send;

		match self.descriptor.classify(&request.url) {
			RouteKind::Protected => (),
			RouteKind::AuthEndpoint | RouteKind::External => {
				obs::event!(trace, url = %request.url, "forwarding unauthenticated request");

				return Ok(self.transport.execute(request).await?);
			},
		}

		let span = FlowSpan::new(KIND, "send");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.send_protected(request)).await;

		obs::record_result(KIND, &result);

		result
	}

	/// Sends `request` and decodes a `2xx` JSON body into `R`.
	///
	/// Non-success statuses become [`Error::UnexpectedStatus`].
	pub async fn send_json<R>(&self, request: ApiRequest) -> Result<R>
	where
		R: DeserializeOwned,
	{
		let response = self.send(request).await?;

		if !response.is_success() {
			return Err(Error::UnexpectedStatus { status: response.status.as_u16() });
		}

		response.json()
	}

	async fn send_protected(&self, request: ApiRequest) -> Result<ApiResponse> {
		let access = self.access_token().await?;
		let response = self.transport.execute(authorize(request.clone(), &access)?).await?;

		if !response.is_unauthorized() {
			return Ok(response);
		}

		drop(response);
		obs::event!(debug, "protected request was unauthorized; coordinating refresh");

		let auth = Arc::clone(&self.auth);
		let store = Arc::clone(&self.store);

		self.coordinator.coordinate_refresh(move || rotate_tokens(auth, store)).await?;

		let access = self.access_token().await?;
		let retried = self.transport.execute(authorize(request, &access)?).await?;

		if retried.is_unauthorized() {
			obs::event!(warn, "request remained unauthorized after refresh");

			return Err(Error::SecondaryUnauthorized);
		}

		Ok(retried)
	}

	async fn access_token(&self) -> Result<TokenSecret> {
		self.store.access_token().await?.ok_or(Error::NotAuthenticated)
	}
}
impl<T, A> Clone for AuthPipeline<T, A>
where
	T: ?Sized + HttpTransport,
	A: ?Sized + AuthEndpoint,
{
	fn clone(&self) -> Self {
		Self {
			transport: Arc::clone(&self.transport),
			auth: Arc::clone(&self.auth),
			store: Arc::clone(&self.store),
			descriptor: self.descriptor.clone(),
			coordinator: Arc::clone(&self.coordinator),
		}
	}
}
impl<T, A> Debug for AuthPipeline<T, A>
where
	T: ?Sized + HttpTransport,
	A: ?Sized + AuthEndpoint,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthPipeline")
			.field("descriptor", &self.descriptor)
			.field("coordinator", &self.coordinator)
			.finish()
	}
}

fn authorize(request: ApiRequest, access: &TokenSecret) -> Result<ApiRequest> {
	Ok(request.with_bearer(access).map_err(ConfigError::from)?)
}

/// Leader work for one refresh wave: exchange the stored refresh token and persist the pair.
async fn rotate_tokens<A>(auth: Arc<A>, store: Arc<dyn TokenStore>) -> Result<(), RefreshError>
where
	A: ?Sized + AuthEndpoint,
{
	let refresh_token = store
		.refresh_token()
		.await
		.map_err(RefreshTransportError::Storage)?
		.ok_or_else(|| RefreshError::unauthorized("no refresh token is stored"))?;
	let pair = auth.refresh(&refresh_token).await?;

	store.save(pair).await.map_err(RefreshTransportError::Storage)?;
	obs::event!(debug, "refreshed token pair persisted");

	Ok(())
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;
	use crate::{
		_preludet::{ScriptedTransport, test_descriptor},
		auth::TokenPair,
		endpoint::RefreshFuture,
		http::StatusCode,
		store::MemoryStore,
	};

	/// Auth endpoint fake that counts calls and answers with a fixed outcome.
	struct FakeEndpoint {
		calls: AtomicUsize,
		outcome: Result<TokenPair, RefreshError>,
	}
	impl FakeEndpoint {
		fn new(outcome: Result<TokenPair, RefreshError>) -> Arc<Self> {
			Arc::new(Self { calls: AtomicUsize::new(0), outcome })
		}

		fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}
	}
	impl AuthEndpoint for FakeEndpoint {
		fn refresh<'a>(&'a self, _: &'a TokenSecret) -> RefreshFuture<'a> {
			Box::pin(async move {
				self.calls.fetch_add(1, Ordering::SeqCst);

				self.outcome.clone()
			})
		}
	}

	fn pipeline(
		transport: ScriptedTransport,
		endpoint: Arc<FakeEndpoint>,
		pair: Option<TokenPair>,
	) -> (AuthPipeline<ScriptedTransport, FakeEndpoint>, Arc<ScriptedTransport>, MemoryStore) {
		let transport = Arc::new(transport);
		let store = pair.map(MemoryStore::with_pair).unwrap_or_default();
		let pipeline = AuthPipeline::new(
			transport.clone(),
			endpoint,
			Arc::new(store.clone()),
			test_descriptor("https://api.example.com/"),
		);

		(pipeline, transport, store)
	}

	#[tokio::test]
	async fn first_try_success_skips_the_coordinator() {
		let endpoint = FakeEndpoint::new(Ok(TokenPair::new("A2", "R2")));
		let (pipeline, transport, _) = pipeline(
			ScriptedTransport::accepting("A1"),
			endpoint.clone(),
			Some(TokenPair::new("A1", "R1")),
		);
		let request = pipeline.get("profile/7").expect("Path should resolve.");
		let response = pipeline.send(request).await.expect("Authorized request should succeed.");

		assert_eq!(response.status, StatusCode::OK);
		assert_eq!(transport.calls(), 1);
		assert_eq!(transport.requests()[0].bearer_token(), Some("A1"));
		assert_eq!(endpoint.calls(), 0);
		assert_eq!(pipeline.coordinator().metrics().waves(), 0);
	}

	#[tokio::test]
	async fn unauthorized_response_refreshes_and_retries_once() {
		let endpoint = FakeEndpoint::new(Ok(TokenPair::new("A2", "R2")));
		let (pipeline, transport, store) = pipeline(
			ScriptedTransport::accepting("A2"),
			endpoint.clone(),
			Some(TokenPair::new("A1", "R1")),
		);
		let request = pipeline.get("friends").expect("Path should resolve.");
		let response = pipeline.send(request).await.expect("Retry should succeed.");

		assert_eq!(response.status, StatusCode::OK);
		assert_eq!(endpoint.calls(), 1);
		assert_eq!(
			transport.requests().iter().map(|r| r.bearer_token()).collect::<Vec<_>>(),
			[Some("A1"), Some("A2")]
		);
		assert_eq!(store.snapshot(), Some(TokenPair::new("A2", "R2")));
	}

	#[tokio::test]
	async fn second_unauthorized_is_a_hard_failure() {
		let endpoint = FakeEndpoint::new(Ok(TokenPair::new("A2", "R2")));
		let (pipeline, transport, _) = pipeline(
			ScriptedTransport::accepting("nobody"),
			endpoint.clone(),
			Some(TokenPair::new("A1", "R1")),
		);
		let request = pipeline.get("profile").expect("Path should resolve.");
		let err = pipeline.send(request).await.expect_err("Double 401 should fail.");

		assert!(matches!(err, Error::SecondaryUnauthorized));
		assert_eq!(transport.calls(), 2);
		assert_eq!(endpoint.calls(), 1);
	}

	#[tokio::test]
	async fn rejected_refresh_expires_the_session_without_writing() {
		let endpoint = FakeEndpoint::new(Err(RefreshError::unauthorized("refresh token expired")));
		let (pipeline, transport, store) = pipeline(
			ScriptedTransport::accepting("A2"),
			endpoint,
			Some(TokenPair::new("A1", "R1")),
		);
		let request = pipeline.get("profile").expect("Path should resolve.");
		let err = pipeline.send(request).await.expect_err("Rejected refresh should fail.");

		assert!(err.requires_reauthentication());
		assert!(matches!(err, Error::SessionExpired { .. }));
		assert_eq!(transport.calls(), 1);
		assert_eq!(store.snapshot(), Some(TokenPair::new("A1", "R1")));
	}

	#[tokio::test]
	async fn transient_refresh_failure_is_surfaced_and_not_retried() {
		let endpoint = FakeEndpoint::new(Err(
			RefreshTransportError::Endpoint { status: 502, retry_after: None }.into(),
		));
		let (pipeline, transport, _) = pipeline(
			ScriptedTransport::accepting("A2"),
			endpoint,
			Some(TokenPair::new("A1", "R1")),
		);
		let request = pipeline.get("profile").expect("Path should resolve.");
		let err = pipeline.send(request).await.expect_err("Transient refresh should fail.");

		assert!(err.is_transient());
		assert_eq!(transport.calls(), 1);
		assert!(!pipeline.coordinator().is_refreshing());
	}

	#[tokio::test]
	async fn missing_tokens_are_reported_before_sending() {
		let endpoint = FakeEndpoint::new(Ok(TokenPair::new("A2", "R2")));
		let (pipeline, transport, _) =
			pipeline(ScriptedTransport::always_ok(), endpoint.clone(), None);
		let request = pipeline.get("profile").expect("Path should resolve.");
		let err = pipeline.send(request).await.expect_err("Anonymous sends should fail.");

		assert!(matches!(err, Error::NotAuthenticated));
		assert_eq!(transport.calls(), 0);
		assert_eq!(endpoint.calls(), 0);
	}

	#[tokio::test]
	async fn auth_and_external_routes_bypass_authentication() {
		let endpoint = FakeEndpoint::new(Ok(TokenPair::new("A2", "R2")));
		let (pipeline, transport, _) = pipeline(
			ScriptedTransport::new(|_| Ok(ApiResponse::new(StatusCode::UNAUTHORIZED))),
			endpoint.clone(),
			Some(TokenPair::new("A1", "R1")),
		);

		for url in ["https://api.example.com/auth/signin", "https://tiles.example.com/1/2/3.png"] {
			let request = ApiRequest::get(Url::parse(url).expect("Fixture URL should parse."));
			let response = pipeline.send(request).await.expect("Bypassed requests should pass.");

			assert_eq!(response.status, StatusCode::UNAUTHORIZED);
		}

		assert!(transport.requests().iter().all(|r| r.bearer_token().is_none()));
		assert_eq!(transport.calls(), 2);
		assert_eq!(endpoint.calls(), 0);
		assert_eq!(pipeline.coordinator().metrics().waves(), 0);
	}

	#[tokio::test]
	async fn send_json_decodes_success_and_rejects_other_statuses() {
		#[derive(Debug, Deserialize, PartialEq)]
		struct Profile {
			username: String,
		}

		let endpoint = FakeEndpoint::new(Ok(TokenPair::new("A2", "R2")));
		let (pipeline, _, _) = pipeline(
			ScriptedTransport::new(|request| match request.url.path() {
				"/profile" => Ok(ApiResponse::new(StatusCode::OK)
					.with_body(br#"{"username":"ada"}"#.to_vec())),
				_ => Ok(ApiResponse::new(StatusCode::NOT_FOUND)),
			}),
			endpoint,
			Some(TokenPair::new("A1", "R1")),
		);
		let profile: Profile = pipeline
			.send_json(pipeline.get("/profile").expect("Path should resolve."))
			.await
			.expect("Profile should decode.");

		assert_eq!(profile, Profile { username: "ada".into() });

		let err = pipeline
			.send_json::<Profile>(pipeline.get("/missing").expect("Path should resolve."))
			.await
			.expect_err("404 should fail.");

		assert!(matches!(err, Error::UnexpectedStatus { status: 404 }));
	}

	#[tokio::test]
	async fn post_json_carries_body_and_bearer() {
		let endpoint = FakeEndpoint::new(Ok(TokenPair::new("A2", "R2")));
		let (pipeline, transport, _) = pipeline(
			ScriptedTransport::accepting("A1"),
			endpoint,
			Some(TokenPair::new("A1", "R1")),
		);
		let request = pipeline
			.post_json("friends/requests", &serde_json::json!({ "receiverId": 9 }))
			.expect("Body should serialize.");

		pipeline.send(request).await.expect("Authorized post should succeed.");

		let sent = transport.requests().remove(0);

		assert_eq!(sent.url.as_str(), "https://api.example.com/friends/requests");
		assert_eq!(sent.body, br#"{"receiverId":9}"#);
		assert_eq!(sent.bearer_token(), Some("A1"));
	}
}
