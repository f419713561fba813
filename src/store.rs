//! Storage contracts and built-in store implementations for the session's token pair.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{TokenPair, TokenSecret},
};

/// Boxed future returned by [`TokenStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Durable holder of the session's current token pair.
///
/// Implementations must replace the pair atomically: after [`save`](TokenStore::save)
/// resolves, every subsequent [`load`](TokenStore::load) returns the new pair in full, and no
/// reader may ever observe a new access token next to an old refresh token.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Returns a snapshot of the current pair, if one is stored.
	fn load(&self) -> StoreFuture<'_, Option<TokenPair>>;

	/// Replaces the stored pair wholesale.
	fn save(&self, pair: TokenPair) -> StoreFuture<'_, ()>;

	/// Removes the stored pair (sign-out / forced logout).
	fn clear(&self) -> StoreFuture<'_, ()>;

	/// Returns the current access token, if any.
	fn access_token(&self) -> StoreFuture<'_, Option<TokenSecret>> {
		Box::pin(async move { Ok(self.load().await?.map(|pair| pair.access_token)) })
	}

	/// Returns the current refresh token, if any.
	fn refresh_token(&self) -> StoreFuture<'_, Option<TokenSecret>> {
		Box::pin(async move { Ok(self.load().await?.map(|pair| pair.refresh_token)) })
	}
}

/// Error type produced by [`TokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn store_error_converts_into_pipeline_error_with_source() {
		let store_error = StoreError::Backend { message: "disk full".into() };
		let pipeline_error: Error = store_error.clone().into();

		assert!(matches!(pipeline_error, Error::Storage(_)));
		assert!(pipeline_error.to_string().contains("disk full"));

		let source = StdError::source(&pipeline_error)
			.expect("Pipeline error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[tokio::test]
	async fn default_accessors_read_from_one_snapshot() {
		let store = MemoryStore::with_pair(TokenPair::new("A1", "R1"));

		assert_eq!(
			store.access_token().await.expect("Memory store reads should succeed."),
			Some(TokenSecret::new("A1"))
		);
		assert_eq!(
			store.refresh_token().await.expect("Memory store reads should succeed."),
			Some(TokenSecret::new("R1"))
		);

		store.clear().await.expect("Clearing the memory store should succeed.");

		assert_eq!(store.access_token().await.expect("Memory store reads should succeed."), None);
	}
}
