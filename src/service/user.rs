//! User lookup and credential verification.

// self
use crate::{_prelude::*, client::Client, http::Method};

/// Fields returned by [`UserService::batch_get_by_ids`] when none are requested.
pub const DEFAULT_BATCH_FIELDS: &str = "_id,name,avatarUrl";

/// User endpoints.
#[derive(Clone, Debug)]
pub struct UserService {
	client: Client,
}
impl UserService {
	/// Wraps a client.
	pub fn new(client: Client) -> Self {
		Self { client }
	}

	/// Underlying client.
	pub fn client(&self) -> &Client {
		&self.client
	}

	/// Verifies a signed session cookie and returns the session payload.
	pub async fn check_cookie<T>(&self, cookie: &str, signature: &str) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.client.post("/v1/users/verify/cookie", CookieBody { cookie, signed: signature }).await
	}

	/// Verifies a user access token and returns its payload.
	pub async fn check_token<T>(&self, token: &str) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.client.post("/v1/users/verify/token", TokenBody { token }).await
	}

	/// Verifies a signed session cookie through the `{ result, error }` envelope.
	///
	/// Prefer [`check_cookie`](Self::check_cookie): an invalid cookie and a rejected
	/// application both surface here as 401.
	pub async fn verify_cookie<T>(&self, cookie: &str, signature: &str) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let body = CookieBody { cookie, signed: signature };

		self.client.request(Method::Post, "/v1/users/verify/cookie", body).await?.into_result()
	}

	/// Verifies a user access token through the `{ result, error }` envelope.
	///
	/// Prefer [`check_token`](Self::check_token) for the same reason as
	/// [`verify_cookie`](Self::verify_cookie).
	pub async fn verify_token<T>(&self, token: &str) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.client
			.request(Method::Post, "/v1/users/verify/token", TokenBody { token })
			.await?
			.into_result()
	}

	/// Fetches a user by id.
	pub async fn get_by_id<T>(&self, user_id: &str) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.client.get(&format!("/v1/users/{user_id}"), ()).await
	}

	/// Fetches a user by email address.
	pub async fn get_by_email<T>(&self, email: &str) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.client.get("/v1/users:getByEmail", EmailQuery { email }).await
	}

	/// Fetches many users at once, projecting `fields` (defaults to [`DEFAULT_BATCH_FIELDS`]).
	pub async fn batch_get_by_ids<T>(&self, ids: &[&str], fields: Option<&str>) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.client
			.with_query([("fields", fields.unwrap_or(DEFAULT_BATCH_FIELDS))])
			.post("/v1/users:BatchGetByIDs", IdsBody { ids })
			.await
	}
}

#[derive(Serialize)]
struct CookieBody<'a> {
	cookie: &'a str,
	signed: &'a str,
}

#[derive(Serialize)]
struct TokenBody<'a> {
	token: &'a str,
}

#[derive(Serialize)]
struct EmailQuery<'a> {
	email: &'a str,
}

#[derive(Serialize)]
struct IdsBody<'a> {
	ids: &'a [&'a str],
}
