//! Deterministic cache key derivation.

// self
use crate::{_prelude::*, auth::ScopeSet};

/// Library-wide key namespace, shared by every entry to avoid collisions with unrelated
/// data in a shared storage backend.
pub const NAMESPACE: &str = "oidc-silent";

/// Reserved key holding the cache index.
pub const INDEX_KEY: &str = "oidc-silent|index";

const DELIMITER: char = '|';

/// Kind of token stored under a cache key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
	/// Access token presented to resource servers.
	AccessToken,
	/// OIDC ID token.
	IdToken,
	/// Refresh token used for silent renewal.
	RefreshToken,
}
impl TokenKind {
	/// Returns the key-segment label for the kind.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenKind::AccessToken => "access_token",
			TokenKind::IdToken => "id_token",
			TokenKind::RefreshToken => "refresh_token",
		}
	}

	fn parse(label: &str) -> Option<Self> {
		match label {
			"access_token" => Some(TokenKind::AccessToken),
			"id_token" => Some(TokenKind::IdToken),
			"refresh_token" => Some(TokenKind::RefreshToken),
			_ => None,
		}
	}
}
impl Display for TokenKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Deterministic storage key for one (kind, client, audience, scope) slot.
///
/// Scope is normalized before keying, so equivalent scope sets always produce the same
/// key. Two keys are equal iff all four components match exactly.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
	/// Token kind component.
	pub kind: TokenKind,
	/// Client identifier component.
	pub client_id: String,
	/// Audience component (may be empty).
	pub audience: String,
	/// Normalized scope component.
	pub scope: String,
}
impl CacheKey {
	/// Builds a key for the provided components.
	pub fn new(
		kind: TokenKind,
		client_id: impl Into<String>,
		audience: impl Into<String>,
		scope: &ScopeSet,
	) -> Self {
		Self {
			kind,
			client_id: client_id.into(),
			audience: audience.into(),
			scope: scope.normalized(),
		}
	}

	/// Parses a stored key string back into its components.
	///
	/// Returns `None` for strings outside this library's namespace or with an unknown
	/// token-kind segment (the reserved index key included).
	pub fn parse(raw: &str) -> Option<Self> {
		let mut segments = raw.splitn(5, DELIMITER);
		let namespace = segments.next()?;

		if namespace != NAMESPACE {
			return None;
		}

		let kind = TokenKind::parse(segments.next()?)?;
		let client_id = segments.next()?.to_owned();
		let audience = segments.next()?.to_owned();
		let scope = segments.next()?.to_owned();

		Some(Self { kind, client_id, audience, scope })
	}
}
impl Display for CacheKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(
			f,
			"{NAMESPACE}{DELIMITER}{}{DELIMITER}{}{DELIMITER}{}{DELIMITER}{}",
			self.kind, self.client_id, self.audience, self.scope,
		)
	}
}
