mod common;

// std
use std::time::Duration;
// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use common::*;
use tws_auth::{CacheStore, Client, ConfigError, Error, http::Method, jwt::AppTokenClaims};

#[tokio::test]
async fn authorize_caches_self_token() {
	let server = MockServer::start_async().await;
	let mock = mock_self_token(&server, "T1").await;
	let (client, store) = client_with_store(&server.base_url());
	let first = client.authorize(APP_ID, "self").await.expect("First authorize should succeed.");
	let second = client.authorize(APP_ID, "self").await.expect("Cached authorize should succeed.");

	assert_eq!(first, "T1");
	assert_eq!(second, "T1");

	mock.assert_calls_async(1).await;

	let cached = store
		.get(&format!("{APP_ID}${APP_ID}"))
		.await
		.expect("Store read should succeed.");

	assert_eq!(cached.as_deref(), Some("T1"));
}

#[tokio::test]
async fn authorize_signs_bucketed_app_token() {
	let server = MockServer::start_async().await;
	let (client, _) = client_with_store(&server.base_url());
	let self_token = client.sign_app_token(3600).expect("App token should sign.");
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(AUTHORIZE_PATH)
				.header("authorization", format!("Bearer {self_token}"))
				.header_exists("user-agent");
			then.status(200).json_body(json!({ "access_token": "T1", "expires_in": 3600 }));
		})
		.await;

	client.authorize(APP_ID, "self").await.expect("Authorize should succeed.");

	mock.assert_calls_async(1).await;

	let claims: AppTokenClaims =
		client.signer().decode_as(&self_token).expect("App token should decode.");

	assert_eq!(claims.app_id, APP_ID);
	assert_eq!(claims.exp - claims.iat, 3960);
}

#[tokio::test]
async fn authorize_rejection_maps_error_code() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(AUTHORIZE_PATH);
			then.status(401).json_body(json!({ "error": "Unauthorized" }));
		})
		.await;
	let (client, store) = client_with_store(&server.base_url());
	let err = client
		.authorize(APP_ID, "self")
		.await
		.expect_err("A 401 from the auth service should fail authorize.");

	assert_eq!(err.code(), Some("Unauthorized"));
	assert_eq!(err.status(), Some(401));
	assert_eq!(err.attempts(), Some(1));
	assert!(store.is_empty(), "Failed authorizations must not be cached.");

	match err {
		Error::Api(api) => {
			assert_eq!(api.original_method, Method::Post);
			assert!(api.original_url.ends_with(AUTHORIZE_PATH));
		},
		other => panic!("Expected an API error, got {other:?}."),
	}

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn cache_key_with_type_separates_grantor_types() {
	let server = MockServer::start_async().await;
	let self_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(AUTHORIZE_PATH).json_body(authorize_body("X", "self"));
			then.status(200).json_body(json!({ "access_token": "T-self", "expires_in": 3600 }));
		})
		.await;
	let user_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(AUTHORIZE_PATH).json_body(authorize_body("X", "user"));
			then.status(200).json_body(json!({ "access_token": "T-user", "expires_in": 3600 }));
		})
		.await;
	let (client, store) = client_from(options(&server.base_url()).cache_key_with_type(true));

	assert_eq!(client.authorize("X", "self").await.expect("Self grant should succeed."), "T-self");
	assert_eq!(client.authorize("X", "user").await.expect("User grant should succeed."), "T-user");
	assert_eq!(
		client.authorize("X", "user").await.expect("Cached grant should succeed."),
		"T-user"
	);
	assert_eq!(store.len(), 2);

	self_mock.assert_calls_async(1).await;
	user_mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn cache_key_without_type_shares_entry() {
	let server = MockServer::start_async().await;
	let self_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(AUTHORIZE_PATH).json_body(authorize_body("X", "self"));
			then.status(200).json_body(json!({ "access_token": "T-self", "expires_in": 3600 }));
		})
		.await;
	let user_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(AUTHORIZE_PATH).json_body(authorize_body("X", "user"));
			then.status(200).json_body(json!({ "access_token": "T-user", "expires_in": 3600 }));
		})
		.await;
	let (client, store) = client_with_store(&server.base_url());

	assert_eq!(client.authorize("X", "self").await.expect("Self grant should succeed."), "T-self");
	assert_eq!(client.authorize("X", "user").await.expect("Shared entry should hit."), "T-self");
	assert_eq!(store.len(), 1);

	self_mock.assert_calls_async(1).await;
	user_mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn short_lived_tokens_are_not_cached() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(AUTHORIZE_PATH);
			then.status(200).json_body(json!({ "access_token": "T1", "expires_in": 1 }));
		})
		.await;
	let (client, store) = client_with_store(&server.base_url());

	client.authorize(APP_ID, "self").await.expect("First authorize should succeed.");
	client.authorize(APP_ID, "self").await.expect("Second authorize should succeed.");

	assert!(store.is_empty());

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn authorize_without_store_always_fetches() {
	let server = MockServer::start_async().await;
	let mock = mock_self_token(&server, "T1").await;
	let options = options(&server.base_url()).build().expect("Options should be valid.");
	let client = Client::new(options).expect("Client should build.");

	assert!(client.cache_store().is_none());

	for _ in 0..2 {
		let token = client.authorize(APP_ID, "self").await.expect("Authorize should succeed.");

		assert_eq!(token, "T1");
	}

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn single_flight_coalesces_concurrent_misses() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(AUTHORIZE_PATH);
			then.status(200)
				.delay(Duration::from_millis(200))
				.json_body(json!({ "access_token": "T1", "expires_in": 3600 }));
		})
		.await;
	let (client, _) = client_from(options(&server.base_url()).single_flight(true));
	let (a, b, c) = tokio::join!(
		client.authorize(APP_ID, "self"),
		client.authorize(APP_ID, "self"),
		client.authorize(APP_ID, "self"),
	);

	for token in [a, b, c] {
		assert_eq!(token.expect("Coalesced authorize should succeed."), "T1");
	}

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn authorize_requires_grantor() {
	let (client, _) = client_with_store("http://127.0.0.1:1");

	for (id, kind) in [("", "self"), (APP_ID, "")] {
		let err = client.authorize(id, kind).await.expect_err("Empty grantor fields must fail.");

		assert!(matches!(err, Error::Config(ConfigError::MissingGrantor)));
	}
}

#[tokio::test]
async fn malformed_authorize_body_is_a_decode_error() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path(AUTHORIZE_PATH);
			then.status(200).json_body(json!({ "token": "T1" }));
		})
		.await;

	let (client, store) = client_with_store(&server.base_url());
	let err = client
		.authorize(APP_ID, "self")
		.await
		.expect_err("Missing access_token should fail to decode.");

	assert!(matches!(err, Error::Decode { .. }));
	assert!(store.is_empty());
}

#[tokio::test]
async fn authorize_ignores_service_host_override() {
	let auth = MockServer::start_async().await;
	let service = MockServer::start_async().await;
	let auth_mock = mock_self_token(&auth, "T1").await;
	let service_mock = service
		.mock_async(|when, then| {
			when.method(POST).path(AUTHORIZE_PATH);
			then.status(500);
		})
		.await;
	let (client, _) = client_with_store(&auth.base_url());
	let derived = client.with_host(&service.base_url()).expect("Service host should parse.");

	assert_eq!(derived.authorize(APP_ID, "self").await.expect("Authorize should succeed."), "T1");

	auth_mock.assert_calls_async(1).await;
	service_mock.assert_calls_async(0).await;
}

#[test]
fn unparsable_root_cert_fails_client_construction() {
	let options = options("http://127.0.0.1:1")
		.root_cert(b"garbage".to_vec())
		.build()
		.expect("Options should be valid.");
	let err = Client::new(options).expect_err("A garbage root certificate must fail early.");

	assert!(matches!(err, Error::Config(ConfigError::InvalidRootCert { index: 0 })));
}
