//! Error types shared across the silent-token core.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Boxed transport-layer error carried by [`Error::Network`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// Exchange and codec failures propagate to the caller unchanged; the client performs no
/// retries of its own.
#[derive(Debug, ThisError)]
pub enum Error {
	/// A compact token string could not be decoded into header + claims.
	#[error(transparent)]
	MalformedToken(#[from] MalformedTokenError),
	/// The ID token nonce differs from the one issued for the flow. Security-relevant; the
	/// flow state is discarded and nothing is cached.
	#[error("ID token nonce does not match the nonce issued for this flow.")]
	NonceMismatch,
	/// The redirect's `state` parameter differs from the one issued for the flow.
	#[error("Authorization state does not match the state issued for this flow.")]
	StateMismatch,
	/// Token endpoint answered with a non-success HTTP status.
	#[error("Token endpoint returned HTTP {status}: {body}.")]
	TokenEndpoint {
		/// HTTP status code.
		status: u16,
		/// Raw response body, surfaced as-is for diagnostics.
		body: String,
	},
	/// Token endpoint returned a 2xx response whose body is not a valid token set.
	#[error("Token endpoint returned a malformed token set.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Transport failure (DNS, TCP, TLS). Retry policy is the caller's responsibility.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Caller-initiated abort or expired caller-supplied deadline; no cache state was mutated.
	#[error("Token request was cancelled before completing.")]
	Cancelled,
	/// No usable refresh token is cached for the requested audience/scope; the caller must
	/// fall back to an interactive authorization flow.
	#[error("No refresh token is available; an interactive login is required.")]
	LoginRequired,
	/// A returned token names an issuer other than the configured one.
	#[error("Token issuer `{found}` does not match the configured issuer `{expected}`.")]
	IssuerMismatch {
		/// Issuer the client was configured with.
		expected: String,
		/// Issuer claimed by the token.
		found: String,
	},
	/// A returned token's audience list does not include the expected audience.
	#[error("Token audience does not include `{expected}`.")]
	AudienceMismatch {
		/// Audience the token was requested for.
		expected: String,
	},

	/// Storage-layer failure.
	#[error("{0}")]
	Storage(#[from] crate::cache::CacheError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
}
impl Error {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Box::new(src) }
	}
}

/// Decode failures for compact signed-token strings.
///
/// Fatal for the affected token only; other cache entries are never touched.
#[derive(Debug, ThisError)]
pub enum MalformedTokenError {
	/// The string does not have the `header.payload.signature` shape.
	#[error("Compact token must have exactly 3 segments, found {found}.")]
	SegmentCount {
		/// Number of dot-separated segments observed.
		found: usize,
	},
	/// A segment is not valid base64url.
	#[error("Token {segment} segment is not valid base64url.")]
	Base64 {
		/// Which segment failed (`header` or `payload`).
		segment: &'static str,
		/// Underlying decode failure.
		#[source]
		source: base64::DecodeError,
	},
	/// A segment decoded but did not parse as a claim mapping.
	#[error("Token {segment} segment is not a valid claim mapping.")]
	Json {
		/// Which segment failed (`header` or `payload`).
		segment: &'static str,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}

/// Configuration and validation failures raised while constructing a client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Client identifier was empty or whitespace.
	#[error("Client id cannot be empty.")]
	EmptyClientId,
	/// A required configuration field was never supplied to the builder.
	#[error("Missing required configuration field `{field}`.")]
	MissingField {
		/// Builder field name.
		field: &'static str,
	},
	/// Configured scopes cannot be normalized.
	#[error("Configured scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::cache::CacheError;

	#[test]
	fn store_error_converts_with_source() {
		let cache_error = CacheError::Backend { message: "storage unreachable".into() };
		let error: Error = cache_error.clone().into();

		assert!(matches!(error, Error::Storage(_)));
		assert!(error.to_string().contains("storage unreachable"));

		let source = StdError::source(&error)
			.expect("Wrapped error should expose the cache error as its source.");

		assert_eq!(source.to_string(), cache_error.to_string());
	}

	#[test]
	fn token_endpoint_error_carries_status_and_body() {
		let error = Error::TokenEndpoint { status: 400, body: "{\"error\":\"invalid_grant\"}".into() };

		assert!(error.to_string().contains("400"));
		assert!(error.to_string().contains("invalid_grant"));
	}
}
