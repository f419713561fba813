//! Demonstrates a wave of concurrent requests with an expired access token converging on a
//! single refresh call, using the default reqwest transport and the in-memory token store.

// std
use std::{sync::Arc, time::Duration};
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use authflight::{
	auth::TokenPair,
	descriptor::ApiDescriptor,
	session::ReqwestSession,
	store::MemoryStore,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let expired = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/profile").header("authorization", "Bearer expired-access");
			then.status(401);
		})
		.await;
	let refreshed = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/profile").header("authorization", "Bearer fresh-access");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"username\":\"ada\"}");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/auth/refresh-tokens")
				.header("authorization", "Bearer demo-refresh");
			then.status(200)
				.header("content-type", "application/json")
				.delay(Duration::from_millis(250))
				.body("{\"accessToken\":\"fresh-access\",\"refreshToken\":\"rotated-refresh\"}");
		})
		.await;
	let descriptor = ApiDescriptor::builder(Url::parse(&server.url("/api/"))?).build()?;
	let store = MemoryStore::with_pair(TokenPair::new("expired-access", "demo-refresh"));
	let session = ReqwestSession::with_reqwest(Arc::new(store.clone()), descriptor)?;
	let mut tasks = Vec::new();

	for _ in 0..8 {
		let session = session.clone();

		tasks.push(tokio::spawn(async move {
			let request = session.pipeline().get("profile")?;

			session.send(request).await.map(|response| response.status)
		}));
	}
	for task in tasks {
		println!("Request finished with {}.", task.await??);
	}

	let metrics = session.pipeline().coordinator().metrics();

	println!(
		"Refresh waves: {}, followers: {}, stored pair: {:?}.",
		metrics.waves(),
		metrics.followers(),
		store.snapshot()
	);

	expired.assert_calls_async(8).await;
	refreshed.assert_calls_async(8).await;
	refresh.assert_calls_async(1).await;

	Ok(())
}
