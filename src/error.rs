//! Pipeline-level error types shared across the coordinator, stores, and transports.

// self
use crate::_prelude::*;

/// Pipeline-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;
type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// Authorization failures are classified here; every other failure passes through in
/// the variant of the layer that produced it.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// The refresh attempt failed for a transient reason; retry the whole call later.
	#[error(transparent)]
	RefreshTransport(#[from] RefreshTransportError),
	/// Sending the original or retried request failed.
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// The refresh token was rejected; the application must force a new sign-in.
	#[error("Session expired and requires re-authentication: {reason}.")]
	SessionExpired {
		/// Endpoint- or pipeline-supplied reason string.
		reason: String,
	},
	/// No access token is stored for the session.
	#[error("No access token is stored; sign in first.")]
	NotAuthenticated,
	/// The retried request was still unauthorized after a successful refresh.
	#[error("Request remained unauthorized after a successful token refresh.")]
	SecondaryUnauthorized,
	/// The auth endpoint rejected a sign-in or sign-up request.
	#[error("Auth endpoint rejected the request with status {status}: {message}.")]
	AuthRejected {
		/// HTTP status code returned by the endpoint.
		status: u16,
		/// Truncated response body, when one was returned.
		message: String,
	},
	/// The endpoint answered with a status the caller did not expect.
	#[error("Endpoint returned unexpected status {status}.")]
	UnexpectedStatus {
		/// HTTP status code returned by the endpoint.
		status: u16,
	},
	/// A response body could not be decoded as JSON.
	#[error("Response body is not valid JSON for the expected shape.")]
	ResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the response.
		status: u16,
	},
}
impl Error {
	/// Returns `true` when the only recovery is a fresh sign-in (forced logout).
	pub fn requires_reauthentication(&self) -> bool {
		matches!(self, Self::SessionExpired { .. } | Self::NotAuthenticated)
	}

	/// Returns `true` when retrying the whole call later may succeed.
	pub fn is_transient(&self) -> bool {
		matches!(self, Self::RefreshTransport(_) | Self::Transport(_))
	}
}
impl From<crate::descriptor::DescriptorError> for Error {
	fn from(e: crate::descriptor::DescriptorError) -> Self {
		Self::Config(e.into())
	}
}
impl From<RefreshError> for Error {
	fn from(e: RefreshError) -> Self {
		match e {
			RefreshError::Unauthorized { reason } => Self::SessionExpired { reason },
			RefreshError::Transport(inner) => Self::RefreshTransport(inner),
		}
	}
}

/// Configuration and validation failures raised by the pipeline.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// API descriptor failed validation.
	#[error(transparent)]
	InvalidDescriptor(#[from] crate::descriptor::DescriptorError),
	/// A request path cannot be resolved against the API base URL.
	#[error("Path `{path}` cannot be resolved against the API base URL.")]
	InvalidPath {
		/// Path supplied by the caller.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A token cannot be encoded as an HTTP header value.
	#[error("Token contains characters that are not valid in an HTTP header.")]
	InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),
	/// A request body could not be serialized.
	#[error("Request body could not be serialized to JSON.")]
	RequestBody(#[from] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO) raised while sending a request.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while sending the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while sending the request.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Outcome of a failed refresh wave, delivered to the leader and every follower.
///
/// Values are cheap to clone so one outcome can be broadcast to all waiters.
#[derive(Clone, Debug, ThisError)]
pub enum RefreshError {
	/// The refresh token was rejected or is missing. Terminal for the session.
	#[error("Refresh token was rejected: {reason}.")]
	Unauthorized {
		/// Endpoint- or pipeline-supplied reason string.
		reason: String,
	},
	/// The refresh failed for a transient reason. Token state is unchanged.
	#[error(transparent)]
	Transport(#[from] RefreshTransportError),
}
impl RefreshError {
	/// Builds an [`RefreshError::Unauthorized`] from any displayable reason.
	pub fn unauthorized(reason: impl Display) -> Self {
		Self::Unauthorized { reason: reason.to_string() }
	}
}

/// Transient refresh failures (safe to retry with a later request).
#[derive(Clone, Debug, ThisError)]
pub enum RefreshTransportError {
	/// Refresh request could not be delivered.
	#[error("Network error occurred while calling the refresh endpoint.")]
	Network {
		/// Shared transport failure.
		#[source]
		source: SharedError,
	},
	/// Refresh endpoint answered with a non-success, non-authorization status.
	#[error("Refresh endpoint returned unexpected status {status}.")]
	Endpoint {
		/// HTTP status code.
		status: u16,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Refresh endpoint responded with malformed JSON.
	#[error("Refresh endpoint returned malformed JSON.")]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: Arc<serde_path_to_error::Error<serde_json::Error>>,
	},
	/// Token store could not be read or written during the refresh.
	#[error("Token store failed during refresh: {0}")]
	Storage(#[source] crate::store::StoreError),
	/// Refresh did not finish within the configured timeout.
	#[error("Refresh did not complete within {after}.")]
	Timeout {
		/// Timeout that elapsed.
		after: Duration,
	},
	/// Refresh task stopped (panic or runtime shutdown) before publishing an outcome.
	#[error("Refresh task ended before publishing an outcome.")]
	Abandoned,
}
impl RefreshTransportError {
	/// Wraps a transport failure observed while calling the refresh endpoint.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Arc::new(src) }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn refresh_errors_translate_at_the_pipeline_boundary() {
		let expired: Error = RefreshError::unauthorized("refresh token revoked").into();

		assert!(matches!(
			expired,
			Error::SessionExpired { ref reason } if reason == "refresh token revoked"
		));
		assert!(expired.requires_reauthentication());
		assert!(!expired.is_transient());

		let transient: Error = RefreshError::from(RefreshTransportError::Endpoint {
			status: 503,
			retry_after: Some(Duration::seconds(5)),
		})
		.into();

		assert!(matches!(
			transient,
			Error::RefreshTransport(RefreshTransportError::Endpoint { status: 503, .. })
		));
		assert!(transient.is_transient());
		assert!(!transient.requires_reauthentication());
	}

	#[test]
	fn broadcast_refresh_errors_keep_their_source() {
		let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
		let original = RefreshError::from(RefreshTransportError::network(io));
		let copy = original.clone();
		let source =
			StdError::source(&copy).expect("Network refresh errors should expose a source.");

		assert_eq!(source.to_string(), "reset by peer");
		assert_eq!(original.to_string(), copy.to_string());
	}

	#[test]
	fn secondary_unauthorized_is_a_hard_failure() {
		let err = Error::SecondaryUnauthorized;

		assert!(!err.is_transient());
		assert!(!err.requires_reauthentication());
	}
}
