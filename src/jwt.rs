//! Claim codec: compact-token decoding, typed claims, and expiry helpers.
//!
//! Tokens are decoded without signature verification; signature trust is delegated to
//! transport-layer TLS and issuer-side validation. The codec only guarantees structural
//! validity of the header and payload segments.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::de::DeserializeOwned;
// self
use crate::{_prelude::*, error::MalformedTokenError};

/// Decoded compact-token header.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenHeader {
	/// Signature algorithm declared by the issuer.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub alg: Option<String>,
	/// Token type, usually `JWT`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub typ: Option<String>,
	/// Header parameters without a dedicated field.
	#[serde(flatten)]
	pub extra: BTreeMap<String, serde_json::Value>,
}

/// Typed claim mapping decoded from a compact-token payload.
///
/// Registered claims get explicit optional fields; everything else lands in `extra`. The
/// `_raw` field carries the original encoded token string on access-token cache entries,
/// while `__bearer` carries the raw ID token on ID-token entries. The two raw strings are
/// independent and never assumed equal.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Claims {
	/// Issuer identifier.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub iss: Option<String>,
	/// Subject identifier.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sub: Option<String>,
	/// Audience list; a bare string audience decodes as a single-element list.
	#[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
	pub aud: Vec<String>,
	/// Expiry instant as a Unix timestamp.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub exp: Option<i64>,
	/// Issued-at instant as a Unix timestamp.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub iat: Option<i64>,
	/// Not-before instant as a Unix timestamp.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub nbf: Option<i64>,
	/// Nonce echoed back by the issuer during authorization-code flows.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub nonce: Option<String>,
	/// Granted scope tokens.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub scp: Vec<String>,
	/// Original encoded token string, as presented to resource servers.
	#[serde(rename = "_raw", default, skip_serializing_if = "Option::is_none")]
	pub raw: Option<String>,
	/// Raw encoded ID token string held by ID-token cache entries.
	#[serde(rename = "__bearer", default, skip_serializing_if = "Option::is_none")]
	pub bearer: Option<String>,
	/// Claims without a dedicated field.
	#[serde(flatten)]
	pub extra: BTreeMap<String, serde_json::Value>,
}
impl Claims {
	/// Expiry instant derived from the `exp` claim, when present.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.exp.and_then(|exp| OffsetDateTime::from_unix_timestamp(exp).ok())
	}
}

/// Decoded token: header plus claims.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedToken {
	/// Decoded header segment.
	pub header: TokenHeader,
	/// Decoded payload segment; `raw` is populated with the input string.
	pub claims: Claims,
}

/// Decodes a compact token string into header + claims without verifying the signature.
pub fn decode(raw: &str) -> Result<DecodedToken, MalformedTokenError> {
	let segments = raw.split('.').collect::<Vec<_>>();

	if segments.len() != 3 {
		return Err(MalformedTokenError::SegmentCount { found: segments.len() });
	}

	let header = parse_segment::<TokenHeader>("header", segments[0])?;
	let mut claims = parse_segment::<Claims>("payload", segments[1])?;

	claims.raw = Some(raw.to_owned());

	Ok(DecodedToken { header, claims })
}

/// Remaining lifetime of a token at write time: `exp - now - leeway`.
///
/// Returns `None` when the result is non-positive, meaning the token counts as already
/// expired and must not be cached. A missing `exp` claim is treated the same way.
pub fn compute_ttl(claims: &Claims, leeway: Duration, now: OffsetDateTime) -> Option<Duration> {
	let expires_at = claims.expires_at()?;
	let remaining = expires_at - now - leeway;

	remaining.is_positive().then_some(remaining)
}

/// Whether a cached token counts as expired at `now`.
///
/// An entry with `exp <= now + leeway` is expired regardless of store-level TTL semantics,
/// guarding against clock skew between cache TTL and the token's own claim. Tokens without
/// an `exp` claim count as expired.
pub fn is_expired(claims: &Claims, leeway: Duration, now: OffsetDateTime) -> bool {
	match claims.expires_at() {
		Some(expires_at) => expires_at <= now + leeway,
		None => true,
	}
}

fn parse_segment<T>(segment: &'static str, encoded: &str) -> Result<T, MalformedTokenError>
where
	T: DeserializeOwned,
{
	let bytes = URL_SAFE_NO_PAD
		.decode(encoded)
		.map_err(|source| MalformedTokenError::Base64 { segment, source })?;
	let mut deserializer = serde_json::Deserializer::from_slice(&bytes);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| MalformedTokenError::Json { segment, source })
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
	D: serde::Deserializer<'de>,
{
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum OneOrMany {
		One(String),
		Many(Vec<String>),
	}

	Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
		None => Vec::new(),
		Some(OneOrMany::One(value)) => vec![value],
		Some(OneOrMany::Many(values)) => values,
	})
}
