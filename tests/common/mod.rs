#![allow(dead_code)]

// std
use std::{sync::Arc, time::Duration};
// crates.io
use httpmock::prelude::*;
use serde_json::{Value, json};
// self
use tws_auth::{Client, ClientOptions, ClientOptionsBuilder, store::MemoryStore};

pub const APP_ID: &str = "59294da476d70b4b83fa91a5";
pub const APP_SECRET: &str = "hello123";
pub const AUTHORIZE_PATH: &str = "/v1/apps/authorize";

/// Options pointed at `host` with a fast retry delay and no cache.
pub fn options(host: &str) -> ClientOptionsBuilder {
	ClientOptions::builder(APP_ID, [APP_SECRET]).host(host).retry_delay(Duration::from_millis(10))
}

/// Client pointed at `host` with an empty in-memory cache.
pub fn client_with_store(host: &str) -> (Client, Arc<MemoryStore>) {
	client_from(options(host))
}

/// Builds a client from `builder` after attaching an empty in-memory cache.
pub fn client_from(builder: ClientOptionsBuilder) -> (Client, Arc<MemoryStore>) {
	let store = Arc::new(MemoryStore::default());
	let options =
		builder.cache_store(store.clone()).build().expect("Client options should be valid.");
	let client = Client::new(options).expect("Client should build.");

	(client, store)
}

/// Authorize request body the client sends for `grantor_id` as `grantor_type`.
pub fn authorize_body(grantor_id: &str, grantor_type: &str) -> Value {
	json!({
		"_resourceId": grantor_id,
		"resourceType": grantor_type,
		"_grantorId": grantor_id,
		"grantorType": grantor_type,
		"_appId": APP_ID,
		"name": "tws-auth",
		"grantType": "client_credentials",
	})
}

/// Mocks a successful self-authorization returning `token`.
pub async fn mock_self_token<'a>(server: &'a MockServer, token: &str) -> httpmock::Mock<'a> {
	server
		.mock_async(|when, then| {
			when.method(POST)
				.path(AUTHORIZE_PATH)
				.header_exists("authorization")
				.json_body(authorize_body(APP_ID, "self"));
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "access_token": token, "expires_in": 3600 }));
		})
		.await
}

/// Port on 127.0.0.1 with nothing listening.
pub fn closed_port() -> u16 {
	let listener =
		std::net::TcpListener::bind("127.0.0.1:0").expect("Ephemeral port should be bindable.");

	listener.local_addr().expect("Listener should expose its address.").port()
}
