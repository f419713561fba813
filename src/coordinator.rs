//! Single-flight refresh coordination.
//!
//! [`RefreshCoordinator`] guarantees that at most one refresh call is in flight per
//! coordinator. The first caller to observe [`RefreshState::Idle`] becomes the leader and
//! starts a refresh wave; every caller that arrives while the wave is running becomes a
//! follower and waits for the leader's outcome instead of calling the auth endpoint itself.
//!
//! The leader's refresh runs on a detached Tokio task bounded by the coordinator timeout.
//! Dropping the leader's caller therefore never cancels a refresh that may already have
//! rotated the refresh token upstream, and dropping a follower only drops its own receiver.
//! The wave publishes its outcome and returns the state to `Idle` under the same lock, so no
//! caller can observe `Idle` before the outcome is readable, and a failed wave never blocks
//! the next election.

mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use tokio::sync::watch;
// self
use crate::{
	_prelude::*,
	descriptor::ApiDescriptor,
	error::{RefreshError, RefreshTransportError},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

type WaveOutcome = Result<(), RefreshError>;
type WaveReceiver = watch::Receiver<Option<WaveOutcome>>;

/// Observable refresh state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefreshState {
	/// No refresh is in flight; the next unauthorized response elects a leader.
	Idle,
	/// A leader's refresh is in flight; new callers join it as followers.
	Refreshing,
}

#[derive(Debug)]
enum Slot {
	Idle,
	Refreshing(WaveReceiver),
}

enum Role {
	Leader(WaveGuard, WaveReceiver),
	Follower(WaveReceiver),
}

/// Elects refresh leaders and broadcasts each wave's outcome to its followers.
///
/// One coordinator is meant to be shared (behind `Arc`) by every pipeline that talks to the
/// same API with the same token store.
#[derive(Debug)]
pub struct RefreshCoordinator {
	slot: Arc<Mutex<Slot>>,
	timeout: Duration,
	metrics: Arc<RefreshMetrics>,
}
impl RefreshCoordinator {
	/// Creates an idle coordinator whose refresh attempts are bounded by `timeout`.
	pub fn new(timeout: Duration) -> Self {
		Self {
			slot: Arc::new(Mutex::new(Slot::Idle)),
			timeout,
			metrics: Default::default(),
		}
	}

	/// Creates a coordinator using the descriptor's refresh timeout.
	pub fn for_descriptor(descriptor: &ApiDescriptor) -> Self {
		Self::new(descriptor.refresh_timeout)
	}

	/// Upper bound applied to every leader refresh.
	pub fn timeout(&self) -> Duration {
		self.timeout
	}

	/// Returns the current refresh state.
	pub fn state(&self) -> RefreshState {
		match *self.slot.lock() {
			Slot::Idle => RefreshState::Idle,
			Slot::Refreshing(_) => RefreshState::Refreshing,
		}
	}

	/// Returns `true` while a leader's refresh is in flight.
	pub fn is_refreshing(&self) -> bool {
		self.state() == RefreshState::Refreshing
	}

	/// Wave counters collected by this coordinator.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Runs `refresh` once per wave and returns that wave's outcome to every participant.
	///
	/// When no wave is in flight, the caller becomes the leader and `refresh` is spawned onto
	/// the current Tokio runtime. Otherwise `refresh` is dropped without being called and the
	/// caller waits for the running wave. Every participant of a wave receives the same
	/// outcome, including [`RefreshTransportError::Timeout`] when the leader exceeds the
	/// timeout and [`RefreshTransportError::Abandoned`] when its task dies before publishing.
	///
	/// `refresh` is expected to read the refresh token, call the auth endpoint, and persist
	/// the new pair before resolving, so that followers read the new pair as soon as they
	/// are released.
	///
	/// # Panics
	///
	/// Panics when called outside a Tokio runtime and no wave is in flight.
	pub async fn coordinate_refresh<F, Fut>(&self, refresh: F) -> WaveOutcome
	where
		F: 'static + Send + FnOnce() -> Fut,
		Fut: 'static + Send + Future<Output = WaveOutcome>,
	{
		let receiver = match self.join() {
			Role::Leader(wave, receiver) => {
				obs::event!(debug, "elected refresh leader");

				self.spawn_wave(wave, refresh);

				receiver
			},
			Role::Follower(receiver) => {
				obs::event!(debug, "joined in-flight refresh as follower");

				receiver
			},
		};

		await_outcome(receiver).await
	}

	fn join(&self) -> Role {
		let mut slot = self.slot.lock();

		match &*slot {
			Slot::Refreshing(receiver) => {
				self.metrics.record_follower();

				Role::Follower(receiver.clone())
			},
			Slot::Idle => {
				let (sender, receiver) = watch::channel(None);

				*slot = Slot::Refreshing(receiver.clone());
				self.metrics.record_wave();

				let wave = WaveGuard {
					slot: Arc::clone(&self.slot),
					sender: Some(sender),
					metrics: Arc::clone(&self.metrics),
				};

				Role::Leader(wave, receiver)
			},
		}
	}

	fn spawn_wave<F, Fut>(&self, mut wave: WaveGuard, refresh: F)
	where
		F: 'static + Send + FnOnce() -> Fut,
		Fut: 'static + Send + Future<Output = WaveOutcome>,
	{
		const KIND: FlowKind = FlowKind::Refresh;

		let after = self.timeout;
		let span = FlowSpan::new(KIND, "coordinate_refresh");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		tokio::spawn(span.instrument(async move {
			let outcome = match tokio::time::timeout(after.unsigned_abs(), refresh()).await {
				Ok(outcome) => outcome,
				Err(_) => {
					obs::event!(warn, timeout = %after, "refresh exceeded its timeout");

					Err(RefreshTransportError::Timeout { after }.into())
				},
			};

			obs::record_result(KIND, &outcome);

			#[cfg(feature = "tracing")]
			if let Err(e) = &outcome {
				tracing::warn!(error = %e, "refresh wave failed");
			}

			wave.publish(outcome);
		}));
	}
}
impl Default for RefreshCoordinator {
	fn default() -> Self {
		Self::new(ApiDescriptor::DEFAULT_REFRESH_TIMEOUT)
	}
}

/// Publishes a wave's outcome exactly once, even when the leader task is torn down.
struct WaveGuard {
	slot: Arc<Mutex<Slot>>,
	sender: Option<watch::Sender<Option<WaveOutcome>>>,
	metrics: Arc<RefreshMetrics>,
}
impl WaveGuard {
	fn publish(&mut self, outcome: WaveOutcome) {
		let Some(sender) = self.sender.take() else {
			return;
		};

		match &outcome {
			Ok(()) => self.metrics.record_success(),
			Err(_) => self.metrics.record_failure(),
		}

		let mut slot = self.slot.lock();

		*slot = Slot::Idle;
		sender.send_replace(Some(outcome));
	}
}
impl Drop for WaveGuard {
	fn drop(&mut self) {
		self.publish(Err(RefreshTransportError::Abandoned.into()));
	}
}

async fn await_outcome(mut receiver: WaveReceiver) -> WaveOutcome {
	match receiver.wait_for(Option::is_some).await {
		Ok(outcome) =>
			Option::clone(&outcome).unwrap_or_else(|| Err(RefreshTransportError::Abandoned.into())),
		Err(_) => Err(RefreshTransportError::Abandoned.into()),
	}
}
