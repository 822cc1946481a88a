//! Suite management. Every call carries an explicit bearer token (typically a user's).

// crates.io
use serde_json::json;
// self
use crate::{_prelude::*, client::Client, http::Method};

/// Suite endpoints.
#[derive(Clone, Debug)]
pub struct SuiteService {
	client: Client,
}
impl SuiteService {
	/// Wraps a client.
	pub fn new(client: Client) -> Self {
		Self { client }
	}

	/// Fetches a suite.
	pub async fn get_by_id<T>(&self, suite_id: &str, token: &str) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.call(Method::Get, &suite_path(suite_id, ""), JsonValue::Null, token).await
	}

	/// Replaces a suite's updatable fields with `body`.
	pub async fn update_by_id<T, B>(&self, suite_id: &str, body: B, token: &str) -> Result<T>
	where
		T: DeserializeOwned,
		B: Serialize,
	{
		self.call(Method::Put, &suite_path(suite_id, ""), body, token).await
	}

	/// Replaces the suite's AES keys.
	pub async fn update_aes_keys_by_id<T>(
		&self,
		suite_id: &str,
		aes_keys: &[&str],
		token: &str,
	) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let path = suite_path(suite_id, "/AESKeys");

		self.call(Method::Put, &path, json!({ "AESKeys": aes_keys }), token).await
	}

	/// Sets the suite's callback URL.
	pub async fn update_callback_url_by_id<T>(
		&self,
		suite_id: &str,
		callback_url: &str,
		token: &str,
	) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.call(
			Method::Put,
			&suite_path(suite_id, "/callbackURL"),
			json!({ "callbackURL": callback_url }),
			token,
		)
		.await
	}

	/// Replaces the suite's IP allow-list.
	pub async fn update_ips_by_id<T>(&self, suite_id: &str, ips: &[&str], token: &str) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.call(Method::Put, &suite_path(suite_id, "/ips"), json!({ "ips": ips }), token).await
	}

	/// Marks the suite as accredited or not.
	pub async fn update_is_accredited_by_id<T>(
		&self,
		suite_id: &str,
		is_accredited: bool,
		token: &str,
	) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.call(
			Method::Put,
			&suite_path(suite_id, "/isAccredited"),
			json!({ "isAccredited": is_accredited }),
			token,
		)
		.await
	}

	/// Enables or disables the suite.
	pub async fn update_is_disabled_by_id<T>(
		&self,
		suite_id: &str,
		is_disabled: bool,
		token: &str,
	) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.call(
			Method::Put,
			&suite_path(suite_id, "/isDisabled"),
			json!({ "isDisabled": is_disabled }),
			token,
		)
		.await
	}

	/// Replaces the suite's secrets.
	pub async fn update_secrets_by_id<T>(
		&self,
		suite_id: &str,
		secrets: &[&str],
		token: &str,
	) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let path = suite_path(suite_id, "/secrets");

		self.call(Method::Put, &path, json!({ "secrets": secrets }), token).await
	}

	/// Transfers ownership of the suite to `user_id`.
	pub async fn transfer<T>(&self, suite_id: &str, user_id: &str, token: &str) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let path = suite_path(suite_id, "/transfer");

		self.call(Method::Put, &path, json!({ "_userId": user_id }), token).await
	}

	/// Lists suites owned by `user_id`.
	pub async fn list_by_user_id<T>(&self, user_id: &str, token: &str) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.call(Method::Get, &format!("/v1/users/{user_id}/suites"), JsonValue::Null, token).await
	}

	/// Creates a suite owned by `creator_id`.
	pub async fn create<T, B>(&self, creator_id: &str, body: B, token: &str) -> Result<T>
	where
		T: DeserializeOwned,
		B: Serialize,
	{
		self.call(Method::Post, &format!("/v1/users/{creator_id}/suites"), body, token).await
	}

	async fn call<T, B>(&self, method: Method, path: &str, body: B, token: &str) -> Result<T>
	where
		T: DeserializeOwned,
		B: Serialize,
	{
		self.client.request_with_token(method, path, body, token).await?.into_body()
	}
}

fn suite_path(suite_id: &str, suffix: &str) -> String {
	format!("/v1/suites/{suite_id}{suffix}")
}
