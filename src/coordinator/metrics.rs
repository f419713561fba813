// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for refresh waves.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	waves: AtomicU64,
	followers: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
}
impl RefreshMetrics {
	/// Returns the number of leader elections, i.e. refresh calls started.
	pub fn waves(&self) -> u64 {
		self.waves.load(Ordering::Relaxed)
	}

	/// Returns the number of callers that joined a wave already in flight.
	pub fn followers(&self) -> u64 {
		self.followers.load(Ordering::Relaxed)
	}

	/// Returns the number of waves that published a successful outcome.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of waves that published a failure (timeouts included).
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	pub(crate) fn record_wave(&self) {
		self.waves.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_follower(&self) {
		self.followers.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}
}
