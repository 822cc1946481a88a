//! Demonstrates acquiring a self token through a mock auth service, reusing it from the
//! in-memory cache, and calling a user endpoint with it.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::{Value, json};
// self
use tws_auth::{Client, ClientOptions, store::MemoryStore};

const APP_ID: &str = "59294da476d70b4b83fa91a5";

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let authorize_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/v1/apps/authorize");
			then.status(200)
				.json_body(json!({ "access_token": "demo-access", "expires_in": 3600 }));
		})
		.await;
	let user_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/users/u1").header("authorization", "Bearer demo-access");
			then.status(200).json_body(json!({ "_id": "u1", "name": "Demo User" }));
		})
		.await;
	let options = ClientOptions::builder(APP_ID, ["hello123"])
		.host(server.base_url())
		.cache_store(Arc::new(MemoryStore::default()))
		.app("tws-auth-demo", "0.1.0")
		.build()?;
	let client = Client::new(options)?;
	let token = client.authorize(APP_ID, "self").await?;

	println!("Self token: {token}.");

	let user: Value = client.user().get_by_id("u1").await?;

	println!("Fetched user: {user}.");

	authorize_mock.assert_calls_async(1).await;
	user_mock.assert_async().await;

	Ok(())
}
