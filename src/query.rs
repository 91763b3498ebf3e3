//! Order-preserving query-string construction for authorization redirect URLs.

// crates.io
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

// Escapes everything except the characters `encodeURIComponent` leaves alone, so a space
// always becomes `%20` rather than `+`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
	.remove(b'-')
	.remove(b'_')
	.remove(b'.')
	.remove(b'!')
	.remove(b'~')
	.remove(b'*')
	.remove(b'\'')
	.remove(b'(')
	.remove(b')');

/// Value accepted by [`create_query_string`].
#[derive(Clone, Debug)]
pub enum QueryValue {
	/// Plain text, percent-encoded on output (spaces become `%20`).
	Text(String),
	/// Structured value (e.g. the `claims` parameter), JSON-serialized before encoding.
	Json(serde_json::Value),
}
impl From<&str> for QueryValue {
	fn from(value: &str) -> Self {
		Self::Text(value.to_owned())
	}
}
impl From<String> for QueryValue {
	fn from(value: String) -> Self {
		Self::Text(value)
	}
}
impl From<serde_json::Value> for QueryValue {
	fn from(value: serde_json::Value) -> Self {
		Self::Json(value)
	}
}

/// Encodes the provided pairs into a URL query string.
///
/// Pairs with an absent value are omitted entirely; the remaining pairs keep their input
/// order so produced URLs stay reproducible.
pub fn create_query_string<'a, I>(pairs: I) -> String
where
	I: IntoIterator<Item = (&'a str, Option<QueryValue>)>,
{
	let mut query = String::new();

	for (key, value) in pairs {
		let text = match value {
			Some(QueryValue::Text(text)) => text,
			Some(QueryValue::Json(json)) => json.to_string(),
			None => continue,
		};

		if !query.is_empty() {
			query.push('&');
		}

		query.extend(utf8_percent_encode(key, COMPONENT));
		query.push('=');
		query.extend(utf8_percent_encode(&text, COMPONENT));
	}

	query
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	#[test]
	fn skips_absent_values_and_preserves_order() {
		let query = create_query_string([
			("response_type", Some("code".into())),
			("audience", None),
			("client_id", Some("client1".into())),
		]);

		assert_eq!(query, "response_type=code&client_id=client1");
	}

	#[test]
	fn json_values_are_serialized_before_encoding() {
		let claims = json!({"id_token": {"acr": null}});
		let query = create_query_string([("claims", Some(claims.into()))]);

		assert_eq!(query, "claims=%7B%22id_token%22%3A%7B%22acr%22%3Anull%7D%7D");
	}

	#[test]
	fn reserved_characters_are_percent_encoded() {
		let query = create_query_string([(
			"redirect_uri",
			Some("https://localhost/callback?x=1".into()),
		)]);

		assert_eq!(query, "redirect_uri=https%3A%2F%2Flocalhost%2Fcallback%3Fx%3D1");
	}

	#[test]
	fn spaces_encode_as_percent_20() {
		let query = create_query_string([("scope", Some("openid profile".into()))]);

		assert_eq!(query, "scope=openid%20profile");
	}

	#[test]
	fn unreserved_marks_pass_through_unescaped() {
		let query = create_query_string([("state", Some("a-b_c.d!e~f*g'h(i)".into()))]);

		assert_eq!(query, "state=a-b_c.d!e~f*g'h(i)");
	}
}
