//! Immutable client configuration and its validating builder.

// self
use crate::{_prelude::*, auth::ScopeSet, error::ConfigError};

const DEFAULT_LEEWAY: Duration = Duration::seconds(60);

/// Immutable configuration owned by one client instance for its whole lifetime.
///
/// There is no process-wide singleton; construct as many clients with as many
/// configurations as needed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	/// Expected `iss` claim value on returned tokens.
	pub issuer: String,
	/// Authorization endpoint receiving interactive redirects.
	pub authorization_endpoint: Url,
	/// Token endpoint used for code and refresh exchanges.
	pub token_endpoint: Url,
	/// Logout endpoint for ending the upstream session.
	pub logout_endpoint: Url,
	/// Redirect URI registered for this client.
	pub redirect_uri: Url,
	/// Audience applied when a request does not name one.
	pub default_audience: String,
	/// Scope set applied when a request does not name one.
	pub default_scope: ScopeSet,
	/// Clock-skew allowance subtracted from token lifetimes (defaults to 60 seconds).
	pub leeway: Duration,
}
impl ClientConfig {
	/// Creates a new builder seeded with the provided client identifier.
	pub fn builder(client_id: impl Into<String>) -> ClientConfigBuilder {
		ClientConfigBuilder::new(client_id)
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Clone, Debug)]
pub struct ClientConfigBuilder {
	client_id: String,
	issuer: Option<String>,
	authorization_endpoint: Option<Url>,
	token_endpoint: Option<Url>,
	logout_endpoint: Option<Url>,
	redirect_uri: Option<Url>,
	default_audience: String,
	default_scope_raw: Option<String>,
	default_scope_set: Option<ScopeSet>,
	leeway: Duration,
}
impl ClientConfigBuilder {
	fn new(client_id: impl Into<String>) -> Self {
		Self {
			client_id: client_id.into(),
			issuer: None,
			authorization_endpoint: None,
			token_endpoint: None,
			logout_endpoint: None,
			redirect_uri: None,
			default_audience: String::new(),
			default_scope_raw: None,
			default_scope_set: None,
			leeway: DEFAULT_LEEWAY,
		}
	}

	/// Sets the expected issuer identifier.
	pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
		self.issuer = Some(issuer.into());

		self
	}

	/// Sets the authorization endpoint.
	pub fn authorization_endpoint(mut self, url: Url) -> Self {
		self.authorization_endpoint = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the logout endpoint.
	pub fn logout_endpoint(mut self, url: Url) -> Self {
		self.logout_endpoint = Some(url);

		self
	}

	/// Sets the registered redirect URI.
	pub fn redirect_uri(mut self, url: Url) -> Self {
		self.redirect_uri = Some(url);

		self
	}

	/// Sets the default audience (empty by default).
	pub fn default_audience(mut self, audience: impl Into<String>) -> Self {
		self.default_audience = audience.into();

		self
	}

	/// Sets the default scope from a space-delimited string; validated during [`build`](Self::build).
	pub fn default_scope(mut self, scope: impl Into<String>) -> Self {
		self.default_scope_raw = Some(scope.into());

		self
	}

	/// Sets the default scope from an already-normalized set.
	pub fn default_scope_set(mut self, scope: ScopeSet) -> Self {
		self.default_scope_set = Some(scope);

		self
	}

	/// Overrides the clock-skew leeway (negative values clamp to zero).
	pub fn leeway(mut self, leeway: Duration) -> Self {
		self.leeway = if leeway.is_negative() { Duration::ZERO } else { leeway };

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		if self.client_id.trim().is_empty() {
			return Err(ConfigError::EmptyClientId);
		}

		let issuer = self.issuer.ok_or(ConfigError::MissingField { field: "issuer" })?;
		let authorization_endpoint = self
			.authorization_endpoint
			.ok_or(ConfigError::MissingField { field: "authorization_endpoint" })?;
		let token_endpoint =
			self.token_endpoint.ok_or(ConfigError::MissingField { field: "token_endpoint" })?;
		let logout_endpoint =
			self.logout_endpoint.ok_or(ConfigError::MissingField { field: "logout_endpoint" })?;
		let redirect_uri =
			self.redirect_uri.ok_or(ConfigError::MissingField { field: "redirect_uri" })?;
		let default_scope = match (self.default_scope_set, self.default_scope_raw) {
			(Some(set), _) => set,
			(None, Some(raw)) => ScopeSet::from_str(&raw)?,
			(None, None) => ScopeSet::default(),
		};

		Ok(ClientConfig {
			client_id: self.client_id,
			issuer,
			authorization_endpoint,
			token_endpoint,
			logout_endpoint,
			redirect_uri,
			default_audience: self.default_audience,
			default_scope,
			leeway: self.leeway,
		})
	}
}

/// Compares issuer identifiers, ignoring a trailing slash on either side.
pub(crate) fn issuer_matches(expected: &str, found: &str) -> bool {
	expected.trim_end_matches('/') == found.trim_end_matches('/')
}
