// std
use std::{path::PathBuf, sync::Arc};
// self
use authflight::{
	auth::{TokenPair, TokenSecret},
	store::{FileStore, MemoryStore, TokenStore},
};

fn temp_path(tag: &str) -> PathBuf {
	std::env::temp_dir().join(format!("authflight_store_it_{tag}_{}.json", std::process::id()))
}

fn generation_of(pair: &TokenPair) -> (String, String) {
	(
		pair.access_token.expose().trim_start_matches('A').to_owned(),
		pair.refresh_token.expose().trim_start_matches('R').to_owned(),
	)
}

/// Runs one writer rotating through `generations` pairs against four readers.
async fn assert_readers_never_observe_a_mixed_pair(
	store: Arc<dyn TokenStore>,
	generations: usize,
) {
	store.save(TokenPair::new("A0", "R0")).await.expect("Seeding the store should succeed.");

	let writer = {
		let store = store.clone();

		tokio::spawn(async move {
			for generation in 1..=generations {
				store
					.save(TokenPair::new(format!("A{generation}"), format!("R{generation}")))
					.await
					.expect("Writer task should save every generation.");
				tokio::task::yield_now().await;
			}
		})
	};
	let readers = (0..4)
		.map(|_| {
			let store = store.clone();

			tokio::spawn(async move {
				for _ in 0..generations {
					let pair = store
						.load()
						.await
						.expect("Reader task should load.")
						.expect("Pair should stay present.");
					let (access, refresh) = generation_of(&pair);

					assert_eq!(access, refresh, "Reader observed a mixed pair.");
					tokio::task::yield_now().await;
				}
			})
		})
		.collect::<Vec<_>>();

	writer.await.expect("Writer task should not panic.");

	for reader in readers {
		reader.await.expect("Reader task should not panic.");
	}
}

#[tokio::test]
async fn save_replaces_the_pair_wholesale() {
	let store = MemoryStore::with_pair(TokenPair::new("A1", "R1"));

	store.save(TokenPair::new("A2", "R2")).await.expect("Saving a pair should succeed.");

	let access = store.access_token().await.expect("Access token read should succeed.");
	let refresh = store.refresh_token().await.expect("Refresh token read should succeed.");

	assert_eq!(access, Some(TokenSecret::new("A2")));
	assert_eq!(refresh, Some(TokenSecret::new("R2")));

	store.clear().await.expect("Clearing the store should succeed.");

	assert!(store.load().await.expect("Load should succeed.").is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_readers_never_observe_a_mixed_pair() {
	assert_readers_never_observe_a_mixed_pair(Arc::new(MemoryStore::default()), 200).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn file_store_readers_never_observe_a_mixed_pair() {
	let path = temp_path("concurrent");
	let store = Arc::new(FileStore::open(&path).expect("File store should open."));

	assert_readers_never_observe_a_mixed_pair(store.clone(), 50).await;

	let reopened = FileStore::open(&path).expect("Persisted store should reopen.");
	let on_disk = reopened
		.load()
		.await
		.expect("Reopened store should load.")
		.expect("Last generation should be on disk.");

	assert_eq!(on_disk, TokenPair::new("A50", "R50"));
	assert!(!path.with_extension("tmp").exists(), "Temporary file should be renamed away.");

	store.clear().await.expect("Clearing the file store should succeed.");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn file_store_disk_snapshots_are_never_torn() {
	let path = temp_path("torn");
	let store = Arc::new(FileStore::open(&path).expect("File store should open."));

	store.save(TokenPair::new("A0", "R0")).await.expect("Seeding the store should succeed.");

	let writer = {
		let store = store.clone();

		tokio::spawn(async move {
			for generation in 1..=50 {
				store
					.save(TokenPair::new(format!("A{generation}"), format!("R{generation}")))
					.await
					.expect("Writer task should save every generation.");
				tokio::task::yield_now().await;
			}
		})
	};
	let reader = {
		let path = path.clone();

		tokio::spawn(async move {
			for _ in 0..50 {
				let pair = FileStore::open(&path)
					.expect("Every on-disk snapshot should parse.")
					.load()
					.await
					.expect("Reopened store should load.")
					.expect("Pair should stay on disk.");
				let (access, refresh) = generation_of(&pair);

				assert_eq!(access, refresh, "Reader observed a mixed pair on disk.");
				tokio::task::yield_now().await;
			}
		})
	};

	writer.await.expect("Writer task should not panic.");
	reader.await.expect("Reader task should not panic.");
	store.clear().await.expect("Clearing the file store should succeed.");
}
