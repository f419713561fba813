//! Authenticated HTTP request pipeline with single-flight bearer token refresh, atomic token
//! stores, and transport-aware observability.
//!
//! The crate wraps every request bound for a protected API with the current access token,
//! recognizes `401 Unauthorized` responses, and funnels every concurrent caller through one
//! [`coordinator::RefreshCoordinator`] so that a wave of expired requests results in exactly
//! one call to the refresh endpoint. Callers then retry once with the fresh token.
//!
//! Refresh, sign-in, and sign-up calls go through [`endpoint::AuthClient`], which talks to the
//! raw [`http::HttpTransport`] and never through [`pipeline::AuthPipeline`], so the refresh
//! call can never loop back into the pipeline that triggered it.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod coordinator;
pub mod descriptor;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod obs;
pub mod pipeline;
pub mod session;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports, fakes, and helpers for tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::{
		collections::VecDeque,
		sync::atomic::{AtomicUsize, Ordering},
	};
	// self
	use crate::{
		descriptor::ApiDescriptor,
		error::TransportError,
		http::{ApiRequest, ApiResponse, HttpTransport, StatusCode, TransportFuture},
	};

	/// Builds a descriptor rooted at `base`, panicking on invalid fixtures.
	pub fn test_descriptor(base: &str) -> ApiDescriptor {
		ApiDescriptor::builder(Url::parse(base).expect("Test base URL should parse."))
			.build()
			.expect("Test descriptor should validate.")
	}

	type Responder = Box<dyn Fn(&ApiRequest) -> Result<ApiResponse, TransportError> + Send + Sync>;

	/// In-process transport that answers requests through a caller-supplied closure and
	/// records every request it receives.
	pub struct ScriptedTransport {
		responder: Responder,
		requests: Mutex<VecDeque<ApiRequest>>,
		calls: AtomicUsize,
	}
	impl ScriptedTransport {
		/// Creates a transport that answers each request with `responder`.
		pub fn new<F>(responder: F) -> Self
		where
			F: 'static + Send + Sync + Fn(&ApiRequest) -> Result<ApiResponse, TransportError>,
		{
			Self {
				responder: Box::new(responder),
				requests: Default::default(),
				calls: AtomicUsize::new(0),
			}
		}

		/// Answers every request with `200 OK` and an empty body.
		pub fn always_ok() -> Self {
			Self::new(|_| Ok(ApiResponse::new(StatusCode::OK)))
		}

		/// Answers `Bearer <accepted>` with `200 OK` and everything else with `401`.
		pub fn accepting(accepted: &'static str) -> Self {
			Self::new(move |request| {
				if request.bearer_token() == Some(accepted) {
					Ok(ApiResponse::new(StatusCode::OK))
				} else {
					Ok(ApiResponse::new(StatusCode::UNAUTHORIZED))
				}
			})
		}

		/// Returns the number of requests executed so far.
		pub fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}

		/// Returns a copy of every request executed so far, oldest first.
		pub fn requests(&self) -> Vec<ApiRequest> {
			self.requests.lock().iter().cloned().collect()
		}
	}
	impl HttpTransport for ScriptedTransport {
		fn execute(&self, request: ApiRequest) -> TransportFuture<'_> {
			Box::pin(async move {
				self.calls.fetch_add(1, Ordering::SeqCst);

				let response = (self.responder)(&request);

				self.requests.lock().push_back(request);

				response
			})
		}
	}
	impl Debug for ScriptedTransport {
		fn fmt(&self, f: &mut Formatter) -> FmtResult {
			f.debug_struct("ScriptedTransport").field("calls", &self.calls()).finish()
		}
	}
}

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
