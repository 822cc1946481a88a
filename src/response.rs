//! Augmented HTTP responses and the mapping of upstream failures onto [`ApiError`].
//!
//! Teambition Web Service error bodies carry two string fields: `error` (a machine code such as
//! `"UserNotFound"`) and `message` (an English description).

// self
use crate::{
	_prelude::*,
	http::{Headers, HttpRequest, Method, RawResponse, TimingPhases},
};

/// Status used when a 2xx envelope carries an `error` field.
const ENVELOPE_ERROR_STATUS: u16 = 401;

/// HTTP response plus the attempt metadata attached by the retry executor.
#[derive(Clone, Debug)]
pub struct Response {
	/// HTTP status code.
	pub status: u16,
	/// Canonical reason phrase.
	pub status_text: String,
	/// Headers keyed by lower-cased name.
	pub headers: Headers,
	/// Raw body bytes.
	pub body: Vec<u8>,
	/// Number of attempts made, including the successful one.
	pub attempts: u32,
	/// URL of the original request, without query string.
	pub original_url: String,
	/// Method of the original request.
	pub original_method: Method,
	/// Wall time from the first attempt until this response was read.
	pub elapsed: Duration,
	/// Phases of the final attempt.
	pub timing: TimingPhases,
}
impl Response {
	/// Attaches attempt metadata to a transport response.
	pub fn from_raw(
		raw: RawResponse,
		attempts: u32,
		request: &HttpRequest,
		elapsed: Duration,
	) -> Self {
		Self {
			status: raw.status,
			status_text: raw.status_text,
			headers: raw.headers,
			body: raw.body,
			attempts,
			original_url: request.url.to_string(),
			original_method: request.method,
			elapsed,
			timing: raw.timing,
		}
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Body decoded as UTF-8, replacing invalid sequences.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Deserializes the body regardless of status. An empty body reads as JSON `null`.
	///
	/// Trailing characters after the JSON document are a decode error.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let decoded = if is_blank(&self.body) {
			serde_path_to_error::deserialize(JsonValue::Null)
		} else {
			let mut deserializer = serde_json::Deserializer::from_slice(&self.body);

			serde_path_to_error::deserialize(&mut deserializer).and_then(|value| {
				deserializer.end().map_err(trailing_error)?;

				Ok(value)
			})
		};

		decoded.map_err(|source| self.decode_error(source))
	}

	/// Returns the decoded body of a 2xx response, or an [`ApiError`] for any other status.
	///
	/// The body of a 2xx response must be a JSON object, an array, or empty; plain text and
	/// bare scalars are reported as an [`ApiError`] as well.
	pub fn into_body<T>(self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		if self.is_success() && is_structured(&self.body) {
			return self.json();
		}

		Err(ApiError::from_response(self).into())
	}

	/// Unwraps the `{ result, error }` envelope used by legacy verification endpoints.
	///
	/// A 2xx response whose `error` field is populated becomes a 401 [`ApiError`]; otherwise the
	/// `result` field is decoded (absent reads as `null`). Non-2xx responses become an
	/// [`ApiError`] whose message is the raw JSON body.
	pub fn into_result<T>(self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let body = parse_body(&self.body);

		if !self.is_success() {
			let mut err = ApiError::from_response(self);

			if !err.body.is_null() {
				err.message = err.body.to_string();
			}

			return Err(err.into());
		}

		let envelope_error = body
			.get("error")
			.filter(|error| is_populated(error))
			.map(|error| error.as_str().unwrap_or("Unauthorized").to_owned());

		if let Some(code) = envelope_error {
			let mut err = ApiError::from_response(self);

			err.status = ENVELOPE_ERROR_STATUS;
			err.status_text = "Unauthorized".into();
			err.code = code;
			err.message = err.body.to_string();

			return Err(err.into());
		}

		let result = match body {
			JsonValue::Object(mut map) => map.remove("result").unwrap_or(JsonValue::Null),
			_ => JsonValue::Null,
		};

		serde_path_to_error::deserialize(result).map_err(|source| self.decode_error(source))
	}

	fn decode_error(&self, source: serde_path_to_error::Error<serde_json::Error>) -> Error {
		Error::Decode {
			original_url: self.original_url.clone(),
			original_method: self.original_method,
			source,
		}
	}
}

/// Structured upstream failure built from a non-2xx (or enveloped error) response.
#[derive(Clone, Debug, ThisError)]
#[error("{status} {code}: {message}")]
pub struct ApiError {
	/// HTTP status code.
	pub status: u16,
	/// Canonical reason phrase.
	pub status_text: String,
	/// Machine-readable code from the body `error` field, or the reason phrase without spaces.
	pub code: String,
	/// Body `message` field, the plain-text body, or the reason phrase.
	pub message: String,
	/// URL of the original request.
	pub original_url: String,
	/// Method of the original request.
	pub original_method: Method,
	/// Response headers.
	pub headers: Headers,
	/// Parsed body; a non-JSON body is kept as a string.
	pub body: JsonValue,
	/// Attempts made before the response arrived.
	pub attempts: u32,
	/// Wall time across all attempts.
	pub elapsed: Duration,
	/// Phases of the final attempt.
	pub timing: TimingPhases,
}
impl ApiError {
	/// Maps a response onto an error, reading `error`/`message` from a JSON object body.
	pub fn from_response(response: Response) -> Self {
		let body = parse_body(&response.body);
		let fallback_code = reason_code(response.status, &response.status_text);
		let (code, message) = match &body {
			JsonValue::Object(map) => {
				let code = map
					.get("error")
					.and_then(JsonValue::as_str)
					.filter(|code| !code.is_empty())
					.map_or_else(|| fallback_code.clone(), ToOwned::to_owned);
				let message = map
					.get("message")
					.and_then(JsonValue::as_str)
					.map_or_else(|| response.status_text.clone(), ToOwned::to_owned);

				(code, message)
			},
			JsonValue::String(text) if !text.is_empty() => (fallback_code, text.clone()),
			_ => (fallback_code, response.status_text.clone()),
		};

		Self {
			status: response.status,
			status_text: response.status_text,
			code,
			message,
			original_url: response.original_url,
			original_method: response.original_method,
			headers: response.headers,
			body,
			attempts: response.attempts,
			elapsed: response.elapsed,
			timing: response.timing,
		}
	}
}

fn is_blank(body: &[u8]) -> bool {
	body.iter().all(u8::is_ascii_whitespace)
}

fn parse_body(body: &[u8]) -> JsonValue {
	if is_blank(body) {
		return JsonValue::Null;
	}

	serde_json::from_slice(body)
		.unwrap_or_else(|_| JsonValue::String(String::from_utf8_lossy(body).into_owned()))
}

// Empty, or opening a JSON object or array.
fn is_structured(body: &[u8]) -> bool {
	matches!(body.iter().find(|b| !b.is_ascii_whitespace()), None | Some(b'{' | b'['))
}

fn trailing_error(e: serde_json::Error) -> serde_path_to_error::Error<serde_json::Error> {
	serde_path_to_error::Error::new(serde_path_to_error::Track::new().path(), e)
}

fn is_populated(value: &JsonValue) -> bool {
	match value {
		JsonValue::Null => false,
		JsonValue::Bool(b) => *b,
		JsonValue::String(s) => !s.is_empty(),
		JsonValue::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
		JsonValue::Array(_) | JsonValue::Object(_) => true,
	}
}

fn reason_code(status: u16, status_text: &str) -> String {
	let code = status_text.chars().filter(char::is_ascii_alphanumeric).collect::<String>();

	if code.is_empty() { status.to_string() } else { code }
}
