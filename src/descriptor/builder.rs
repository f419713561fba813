// std
use std::net::IpAddr;
// crates.io
use url::Host;
// self
use crate::{
	_prelude::*,
	descriptor::{ApiDescriptor, AuthRoutes},
};

/// Errors raised while constructing or validating descriptors.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum DescriptorError {
	/// The base URL must use HTTPS unless it points at a loopback host.
	#[error("The API base URL must use HTTPS: {url}.")]
	InsecureBaseUrl {
		/// Base URL that failed validation.
		url: String,
	},
	/// The base URL cannot carry paths (e.g. `mailto:` or `data:` URLs).
	#[error("The API base URL cannot be used as a base: {url}.")]
	NotABaseUrl {
		/// Base URL that failed validation.
		url: String,
	},
	/// The base URL carries a query string or fragment.
	#[error("The API base URL must not carry a query or fragment: {url}.")]
	BaseUrlHasQuery {
		/// Base URL that failed validation.
		url: String,
	},
	/// An auth route name is empty or contains URL delimiters.
	#[error("The {route} route `{value}` must be a non-empty path without `?` or `#`.")]
	InvalidRoute {
		/// Which route failed validation.
		route: &'static str,
		/// Supplied route value.
		value: String,
	},
	/// The auth prefix must be exactly one path segment.
	#[error("The auth prefix `{value}` must be a single path segment.")]
	InvalidPrefix {
		/// Supplied prefix value.
		value: String,
	},
	/// The refresh timeout must be positive.
	#[error("The refresh timeout must be positive.")]
	NonPositiveRefreshTimeout,
}

/// Builder for [`ApiDescriptor`] values.
#[derive(Debug)]
pub struct ApiDescriptorBuilder {
	/// API base URL; a trailing `/` is added when missing.
	pub base_url: Url,
	/// Auth route names.
	pub routes: AuthRoutes,
	/// Upper bound for one refresh attempt.
	pub refresh_timeout: Duration,
}
impl ApiDescriptorBuilder {
	/// Creates a new builder seeded with the provided base URL and default routes.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			routes: AuthRoutes::default(),
			refresh_timeout: ApiDescriptor::DEFAULT_REFRESH_TIMEOUT,
		}
	}

	/// Overrides the first path segment shared by the auth routes (defaults to `auth`).
	pub fn auth_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.routes.prefix = prefix.into();

		self
	}

	/// Overrides the refresh route (defaults to `refresh-tokens`).
	pub fn refresh_route(mut self, route: impl Into<String>) -> Self {
		self.routes.refresh = route.into();

		self
	}

	/// Overrides the sign-in route (defaults to `signin`).
	pub fn sign_in_route(mut self, route: impl Into<String>) -> Self {
		self.routes.sign_in = route.into();

		self
	}

	/// Overrides the sign-up route (defaults to `signup`).
	pub fn sign_up_route(mut self, route: impl Into<String>) -> Self {
		self.routes.sign_up = route.into();

		self
	}

	/// Overrides the sign-up validation route (defaults to `validate-signup`).
	pub fn validate_sign_up_route(mut self, route: impl Into<String>) -> Self {
		self.routes.validate_sign_up = route.into();

		self
	}

	/// Overrides the whole route set.
	pub fn routes(mut self, routes: AuthRoutes) -> Self {
		self.routes = routes;

		self
	}

	/// Overrides the refresh timeout (defaults to 30 seconds).
	pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
		self.refresh_timeout = timeout;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ApiDescriptor, DescriptorError> {
		let mut base_url = self.base_url;

		if !base_url.cannot_be_a_base() && !base_url.path().ends_with('/') {
			let path = format!("{}/", base_url.path());

			base_url.set_path(&path);
		}

		let descriptor =
			ApiDescriptor { base_url, routes: self.routes, refresh_timeout: self.refresh_timeout };

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl ApiDescriptor {
	/// Validates invariants for the descriptor.
	fn validate(&self) -> Result<(), DescriptorError> {
		validate_base_url(&self.base_url)?;
		validate_prefix(&self.routes.prefix)?;
		validate_route("refresh", &self.routes.refresh)?;
		validate_route("sign_in", &self.routes.sign_in)?;
		validate_route("sign_up", &self.routes.sign_up)?;
		validate_route("validate_sign_up", &self.routes.validate_sign_up)?;

		if !self.refresh_timeout.is_positive() {
			return Err(DescriptorError::NonPositiveRefreshTimeout);
		}

		Ok(())
	}
}

fn validate_base_url(url: &Url) -> Result<(), DescriptorError> {
	if url.cannot_be_a_base() {
		return Err(DescriptorError::NotABaseUrl { url: url.to_string() });
	}
	if url.query().is_some() || url.fragment().is_some() {
		return Err(DescriptorError::BaseUrlHasQuery { url: url.to_string() });
	}

	match url.scheme() {
		"https" => Ok(()),
		"http" if is_loopback(url) => Ok(()),
		_ => Err(DescriptorError::InsecureBaseUrl { url: url.to_string() }),
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(Host::Ipv4(ip)) => IpAddr::V4(ip).is_loopback(),
		Some(Host::Ipv6(ip)) => IpAddr::V6(ip).is_loopback(),
		None => false,
	}
}

fn validate_prefix(prefix: &str) -> Result<(), DescriptorError> {
	if prefix.is_empty() || prefix.contains(['/', '?', '#']) {
		Err(DescriptorError::InvalidPrefix { value: prefix.to_owned() })
	} else {
		Ok(())
	}
}

fn validate_route(name: &'static str, route: &str) -> Result<(), DescriptorError> {
	if route.is_empty() || route.starts_with('/') || route.contains(['?', '#']) {
		Err(DescriptorError::InvalidRoute { route: name, value: route.to_owned() })
	} else {
		Ok(())
	}
}
