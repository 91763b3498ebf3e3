//! Authorization Code + PKCE helpers: redirect URL construction and code exchange.

// self
use crate::{
	_prelude::*,
	auth::ScopeSet,
	client::{AuthorizeOptions, Client},
	exchange::{ExchangeOptions, TokenSet},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	pkce::{CODE_CHALLENGE_METHOD, FlowState},
	query::{QueryValue, create_query_string},
};

/// Pending authorization handshake returned by [`Client::start_authorization`].
///
/// Holds the per-flow secrets until the authorization code comes back; consumed by
/// [`Client::exchange_code`] and discarded afterwards, whether the exchange succeeds or
/// not.
pub struct Authorization {
	/// Fully-formed authorize URL that callers should send end-users to.
	pub authorize_url: Url,
	/// Audience the flow was started for.
	pub audience: String,
	/// Requested scope set.
	pub scope: ScopeSet,
	flow: FlowState,
}
impl Authorization {
	/// Validates the `state` parameter returned via the redirect.
	pub fn validate_state(&self, returned_state: &str) -> Result<()> {
		self.flow.validate_state(returned_state)
	}
}
impl Debug for Authorization {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Authorization")
			.field("authorize_url", &self.authorize_url.as_str())
			.field("audience", &self.audience)
			.field("scope", &self.scope)
			.field("flow", &self.flow)
			.finish()
	}
}

impl Client {
	/// Starts an Authorization Code + PKCE flow.
	///
	/// Generates fresh state, nonce, and verifier/challenge material and builds the
	/// redirect URL. Query parameters keep insertion order so URLs are reproducible.
	pub fn start_authorization(&self, options: AuthorizeOptions) -> Result<Authorization> {
		let audience =
			options.audience.unwrap_or_else(|| self.config.default_audience.clone());
		let scope = options.scope.unwrap_or_else(|| self.config.default_scope.clone());
		let flow = FlowState::generate();
		let redirect_uri = self.config.redirect_uri.to_string();
		let query = create_query_string([
			("response_type", Some(QueryValue::from("code"))),
			("client_id", Some(QueryValue::from(self.config.client_id.as_str()))),
			("redirect_uri", Some(QueryValue::from(redirect_uri.as_str()))),
			("scope", Some(QueryValue::from(scope.normalized()))),
			("audience", Some(QueryValue::from(audience.as_str()))),
			("state", Some(QueryValue::from(flow.state()))),
			("nonce", Some(QueryValue::from(flow.nonce()))),
			("code_challenge", Some(QueryValue::from(flow.code_challenge()))),
			("code_challenge_method", Some(QueryValue::from(CODE_CHALLENGE_METHOD))),
			("claims", options.claims.map(QueryValue::from)),
		]);
		let mut authorize_url = self.config.authorization_endpoint.clone();

		authorize_url.set_query(Some(&query));

		Ok(Authorization { authorize_url, audience, scope, flow })
	}

	/// Redeems the authorization code returned via the redirect.
	///
	/// Validates the ID token nonce against the one issued for the flow before anything
	/// is cached; a mismatch aborts the flow and leaves the cache untouched. On success
	/// all entries plus the index are written back best-effort and the decoded token set
	/// is returned.
	pub async fn exchange_code(
		&self,
		authorization: Authorization,
		code: &str,
		options: &ExchangeOptions,
	) -> Result<TokenSet> {
		const KIND: FlowKind = FlowKind::AuthorizationCode;

		let span = FlowSpan::new(KIND, "exchange_code");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.exchange_code_inner(authorization, code, options)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn exchange_code_inner(
		&self,
		authorization: Authorization,
		code: &str,
		options: &ExchangeOptions,
	) -> Result<TokenSet> {
		let Authorization { audience, scope, flow, .. } = authorization;
		let set = self
			.exchange
			.exchange_authorization_code(
				code,
				flow.code_verifier(),
				&self.config.redirect_uri,
				options,
			)
			.await?;
		let validated = self.validate_token_set(&set, &audience, Some(flow.nonce()))?;

		self.write_back(&audience, &scope, &set, &validated, None).await;

		Ok(set)
	}
}
