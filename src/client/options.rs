//! Per-call options for the client's flows.

// self
use crate::{_prelude::*, auth::ScopeSet, exchange::ExchangeOptions};

/// Options for [`Client::get_token_silently`](crate::client::Client::get_token_silently).
#[derive(Clone, Debug, Default)]
pub struct GetTokenOptions {
	/// Audience override; the configured default applies when absent.
	pub audience: Option<String>,
	/// Scope override; the configured default applies when absent.
	pub scope: Option<ScopeSet>,
	/// Skips the cache read, never the write-back.
	pub ignore_cache: bool,
	/// Timeout and cancellation knobs forwarded to the token exchange.
	pub exchange: ExchangeOptions,
}
impl GetTokenOptions {
	/// Overrides the audience.
	pub fn audience(mut self, audience: impl Into<String>) -> Self {
		self.audience = Some(audience.into());

		self
	}

	/// Overrides the scope.
	pub fn scope(mut self, scope: ScopeSet) -> Self {
		self.scope = Some(scope);

		self
	}

	/// Bypasses the cache read for this call.
	pub fn ignore_cache(mut self) -> Self {
		self.ignore_cache = true;

		self
	}

	/// Attaches exchange-level timeout/cancellation knobs.
	pub fn exchange(mut self, exchange: ExchangeOptions) -> Self {
		self.exchange = exchange;

		self
	}
}

/// Options for [`Client::start_authorization`](crate::client::Client::start_authorization).
#[derive(Clone, Debug, Default)]
pub struct AuthorizeOptions {
	/// Audience override; the configured default applies when absent.
	pub audience: Option<String>,
	/// Scope override; the configured default applies when absent.
	pub scope: Option<ScopeSet>,
	/// Requested claims, JSON-serialized into the `claims` query parameter.
	pub claims: Option<serde_json::Value>,
}
impl AuthorizeOptions {
	/// Overrides the audience.
	pub fn audience(mut self, audience: impl Into<String>) -> Self {
		self.audience = Some(audience.into());

		self
	}

	/// Overrides the scope.
	pub fn scope(mut self, scope: ScopeSet) -> Self {
		self.scope = Some(scope);

		self
	}

	/// Requests specific claims from the issuer.
	pub fn claims(mut self, claims: serde_json::Value) -> Self {
		self.claims = Some(claims);

		self
	}
}
