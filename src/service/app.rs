//! App token verification.

// self
use crate::{_prelude::*, client::Client, http::Method};

/// App endpoints.
#[derive(Clone, Debug)]
pub struct AppService {
	client: Client,
}
impl AppService {
	/// Wraps a client.
	pub fn new(client: Client) -> Self {
		Self { client }
	}

	/// Verifies an app access token through the `{ result, error }` envelope.
	pub async fn verify_token<T>(&self, token: &str) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.client
			.request(Method::Post, "/v1/apps/verify/token", serde_json::json!({ "token": token }))
			.await?
			.into_result()
	}
}
