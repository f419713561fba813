//! API descriptor: validated configuration shared by the pipeline and the auth client.
//!
//! The descriptor names the protected API's base URL, the unauthenticated auth routes that
//! live beneath it, and the refresh timeout. The pipeline uses it to decide which requests
//! carry a bearer token; the auth client uses it to build the refresh, sign-in, sign-up and
//! sign-up validation URLs.

/// Builder API for assembling API descriptors.
pub mod builder;
/// Auth route names.
pub mod routes;

pub use builder::*;
pub use routes::*;

// self
use crate::{_prelude::*, error::ConfigError};

/// How the pipeline treats a request URL.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RouteKind {
	/// Protected API route; carries the access token and takes part in refresh-and-retry.
	Protected,
	/// Unauthenticated auth route (sign-in, sign-up, refresh); never carries a token.
	AuthEndpoint,
	/// Outside the API base URL; forwarded untouched.
	External,
}

/// Immutable API descriptor consumed by the pipeline and auth client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiDescriptor {
	/// API base URL; always ends with `/`.
	pub base_url: Url,
	/// Auth route names beneath the base URL.
	pub routes: AuthRoutes,
	/// Upper bound for one refresh attempt.
	pub refresh_timeout: Duration,
}
impl ApiDescriptor {
	/// Default upper bound for one refresh attempt.
	pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::seconds(30);

	/// Creates a new builder for the provided base URL.
	pub fn builder(base_url: Url) -> ApiDescriptorBuilder {
		ApiDescriptorBuilder::new(base_url)
	}

	/// Classifies `url` relative to the base URL and auth prefix.
	pub fn classify(&self, url: &Url) -> RouteKind {
		let Some(rest) = url.as_str().strip_prefix(self.base_url.as_str()) else {
			return RouteKind::External;
		};
		let first = rest.split(['/', '?', '#']).next().unwrap_or_default();

		if first == self.routes.prefix { RouteKind::AuthEndpoint } else { RouteKind::Protected }
	}

	/// Resolves a protected API path (leading `/` optional) against the base URL.
	pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
		self.base_url
			.join(path.trim_start_matches('/'))
			.map_err(|source| ConfigError::InvalidPath { path: path.to_owned(), source })
	}

	/// URL of an auth route (`{base}{prefix}/{route}`).
	pub fn auth_url(&self, route: &str) -> Result<Url, ConfigError> {
		self.resolve(&format!("{}/{route}", self.routes.prefix))
	}

	/// URL of the refresh-tokens route.
	pub fn refresh_url(&self) -> Result<Url, ConfigError> {
		self.auth_url(&self.routes.refresh)
	}

	/// URL of the sign-in route.
	pub fn sign_in_url(&self) -> Result<Url, ConfigError> {
		self.auth_url(&self.routes.sign_in)
	}

	/// URL of the sign-up route.
	pub fn sign_up_url(&self) -> Result<Url, ConfigError> {
		self.auth_url(&self.routes.sign_up)
	}

	/// URL of the sign-up validation route.
	pub fn validate_sign_up_url(&self) -> Result<Url, ConfigError> {
		self.auth_url(&self.routes.validate_sign_up)
	}
}
