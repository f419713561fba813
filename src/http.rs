//! Transport primitives for protected and auth-route requests.
//!
//! The module exposes [`HttpTransport`] alongside the owned [`ApiRequest`] and
//! [`ApiResponse`] values the pipeline passes through it. Requests are plain data so the
//! pipeline can resend the original request after a refresh without rebuilding it.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
pub use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};
use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, auth::TokenSecret, error::TransportError};

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of sending one request and buffering its response.
///
/// The trait is the pipeline's only dependency on an HTTP client. Implementations must be
/// `Send + Sync + 'static` so a single transport can be shared by the pipeline and the auth
/// client behind `Arc`, and the futures they return must be `Send` so callers can drive
/// requests from any worker thread.
///
/// Implementations must not add credentials on their own: the pipeline decides which
/// requests carry a bearer token.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and buffers the full response body.
	fn execute(&self, request: ApiRequest) -> TransportFuture<'_>;
}

/// Owned outbound request.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute target URL.
	pub url: Url,
	/// Request headers.
	pub headers: HeaderMap,
	/// Request body; empty for body-less requests.
	pub body: Vec<u8>,
}
impl ApiRequest {
	/// Creates a body-less request.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, headers: HeaderMap::new(), body: Vec::new() }
	}

	/// Shorthand for a `GET` request.
	pub fn get(url: Url) -> Self {
		Self::new(Method::GET, url)
	}

	/// Shorthand for a `POST` request.
	pub fn post(url: Url) -> Self {
		Self::new(Method::POST, url)
	}

	/// Inserts (or replaces) a header.
	pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Replaces the body with raw bytes.
	pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = body.into();

		self
	}

	/// Serializes `body` as JSON and sets the matching `content-type`.
	pub fn with_json<B>(mut self, body: &B) -> Result<Self, serde_json::Error>
	where
		B: ?Sized + Serialize,
	{
		self.body = serde_json::to_vec(body)?;
		self.headers
			.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

		Ok(self)
	}

	/// Sets `authorization: Bearer <token>`, replacing any existing credential.
	///
	/// The header value is flagged as sensitive so HTTP stacks skip it when logging.
	pub fn with_bearer(
		mut self,
		token: &TokenSecret,
	) -> Result<Self, http::header::InvalidHeaderValue> {
		let mut value = HeaderValue::from_str(&token.bearer())?;

		value.set_sensitive(true);
		self.headers.insert(header::AUTHORIZATION, value);

		Ok(self)
	}

	/// Returns the bearer credential carried by the request, if any.
	pub fn bearer_token(&self) -> Option<&str> {
		self.headers
			.get(header::AUTHORIZATION)?
			.to_str()
			.ok()?
			.strip_prefix("Bearer ")
	}
}

/// Buffered response returned by an [`HttpTransport`].
#[derive(Clone, Debug)]
pub struct ApiResponse {
	/// Response status code.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Fully buffered response body.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Creates an empty response with the given status.
	pub fn new(status: StatusCode) -> Self {
		Self { status, headers: HeaderMap::new(), body: Vec::new() }
	}

	/// Replaces the body with raw bytes.
	pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = body.into();

		self
	}

	/// Inserts (or replaces) a header.
	pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Returns `true` for `401 Unauthorized`.
	pub fn is_unauthorized(&self) -> bool {
		self.status == StatusCode::UNAUTHORIZED
	}

	/// Returns `true` for any `2xx` status.
	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}

	/// Retry-After hint expressed as a relative duration.
	pub fn retry_after(&self) -> Option<Duration> {
		parse_retry_after(&self.headers)
	}

	/// Decodes the body as JSON, reporting the failing path on mismatch.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut de = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut de)
			.map_err(|source| Error::ResponseParse { source, status: self.status.as_u16() })
	}

	/// Lossy UTF-8 preview of the body, capped at `limit` characters.
	pub fn body_preview(&self, limit: usize) -> String {
		String::from_utf8_lossy(&self.body).chars().take(limit).collect()
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// The wrapper forwards requests verbatim. Configure any custom [`ReqwestClient`] with the
/// timeouts and TLS roots the application needs before passing it to
/// [`ReqwestTransport::with_client`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn execute(&self, request: ApiRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let ApiRequest { method, url, headers, body } = request;
			let response = client.request(method, url).headers(headers).body(body).send().await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body = response.bytes().await?.to_vec();

			Ok(ApiResponse { status, headers, body })
		})
	}
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(header::RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX)));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
