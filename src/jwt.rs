//! JWT signing and verification over a rotating list of shared secrets.
//!
//! The first secret signs every token. Verification walks the whole list in order, so a token
//! signed with a retiring secret keeps verifying for as long as that secret stays configured.

pub use jsonwebtoken::{Algorithm, Header, Validation};

// crates.io
use jsonwebtoken::{DecodingKey, EncodingKey, errors::ErrorKind};
// self
use crate::{_prelude::*, config::AppId, error::ConfigError};

/// Literal JSON object payload.
pub type Payload = JsonMap<String, JsonValue>;

/// Default window for [`TokenSigner::sign_app_token`], in seconds.
pub const DEFAULT_APP_TOKEN_PERIOD: u64 = 3600;

/// Redacted shared-secret wrapper keeping key material out of logs.
#[derive(Clone, PartialEq, Eq)]
pub struct AppSecret(String);
impl AppSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner secret. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl Debug for AppSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("AppSecret").field(&"<redacted>").finish()
	}
}
impl Display for AppSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Claims of the periodical app token used to authenticate authorize calls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppTokenClaims {
	/// Window start, in seconds since the Unix epoch.
	pub iat: i64,
	/// Expiry: window start plus 110% of the period.
	pub exp: i64,
	/// Application identifier.
	#[serde(rename = "_appId")]
	pub app_id: String,
}
impl AppTokenClaims {
	/// Builds claims aligned to the `period`-second window containing `now`.
	pub fn bucketed(app_id: &AppId, period: u64, now: OffsetDateTime) -> Self {
		let period = i64::try_from(period.max(1)).unwrap_or(i64::MAX);
		let iat = now.unix_timestamp().div_euclid(period) * period;
		let exp = iat.saturating_add(period.saturating_mul(11) / 10);

		Self { iat, exp, app_id: app_id.to_string() }
	}
}

/// Signs, decodes, and verifies JWTs for one application.
#[derive(Clone, Debug)]
pub struct TokenSigner {
	app_id: AppId,
	secrets: Arc<[AppSecret]>,
}
impl TokenSigner {
	/// Creates a signer; at least one secret is required.
	pub fn new(app_id: AppId, secrets: Vec<AppSecret>) -> Result<Self, ConfigError> {
		if secrets.is_empty() {
			return Err(ConfigError::MissingAppSecrets);
		}

		Ok(Self { app_id, secrets: secrets.into() })
	}

	/// Application identifier carried in app tokens.
	pub fn app_id(&self) -> &AppId {
		&self.app_id
	}

	/// Configured secrets in verification order.
	pub fn secrets(&self) -> &[AppSecret] {
		&self.secrets
	}

	/// Signs `claims` with the first secret using HS256.
	pub fn sign<T>(&self, claims: &T) -> Result<String>
	where
		T: Serialize,
	{
		self.sign_with_header(&Header::default(), claims)
	}

	/// Signs `claims` with the first secret and a caller-supplied header.
	pub fn sign_with_header<T>(&self, header: &Header, claims: &T) -> Result<String>
	where
		T: Serialize,
	{
		let secret = self.secrets.first().ok_or(ConfigError::MissingAppSecrets)?;
		let key = EncodingKey::from_secret(secret.expose().as_bytes());

		jsonwebtoken::encode(header, claims, &key)
			.map_err(|source| ConfigError::TokenSign { source }.into())
	}

	/// Signs a token that only changes once per `period` seconds.
	///
	/// Repeated calls inside the same window return the same string, which lets the auth
	/// service cache its verification result.
	pub fn sign_app_token(&self, period: u64) -> Result<String> {
		self.sign_app_token_at(period, OffsetDateTime::now_utc())
	}

	/// Same as [`sign_app_token`](Self::sign_app_token) with an explicit clock reading.
	pub fn sign_app_token_at(&self, period: u64, now: OffsetDateTime) -> Result<String> {
		self.sign(&AppTokenClaims::bucketed(&self.app_id, period, now))
	}

	/// Decodes a token into a JSON object without checking its signature.
	///
	/// Use for introspection only, never for trust decisions.
	pub fn decode(&self, token: &str) -> Result<Payload> {
		self.decode_as(token)
	}

	/// Decodes a token into `T` without checking its signature.
	pub fn decode_as<T>(&self, token: &str) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut validation = Validation::new(Algorithm::HS256);

		validation.insecure_disable_signature_validation();
		validation.validate_exp = false;
		validation.validate_aud = false;
		validation.required_spec_claims.clear();

		jsonwebtoken::decode::<T>(token, &DecodingKey::from_secret(&[]), &validation)
			.map(|data| data.claims)
			.map_err(|source| Error::MalformedToken { source })
	}

	/// Verifies a token against every secret with the default validation.
	///
	/// The default accepts HS256, requires no claims, and checks `exp`/`nbf` when present.
	pub fn verify(&self, token: &str) -> Result<Payload> {
		self.verify_with(token, &default_validation())
	}

	/// Verifies a token against every secret in order; the first success wins.
	///
	/// Fails with [`Error::Unauthorized`] wrapping the last verification error.
	pub fn verify_with<T>(&self, token: &str, validation: &Validation) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut last = None;

		for secret in self.secrets.iter() {
			let key = DecodingKey::from_secret(secret.expose().as_bytes());

			match jsonwebtoken::decode::<T>(token, &key, validation) {
				Ok(data) => return Ok(data.claims),
				Err(e) => last = Some(e),
			}
		}

		let source = last.unwrap_or_else(|| ErrorKind::InvalidSignature.into());

		Err(Error::Unauthorized { source })
	}
}

/// Validation used by [`TokenSigner::verify`].
pub fn default_validation() -> Validation {
	let mut validation = Validation::new(Algorithm::HS256);

	validation.required_spec_claims.clear();
	validation.validate_aud = false;

	validation
}
