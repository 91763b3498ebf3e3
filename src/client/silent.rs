//! Silent token acquisition with singleflight guards, rotation-safe write-back, and
//! metrics.
//!
//! The client exposes [`Client::get_token_silently`] so callers can request a valid
//! access token for an (audience, scope) pair without worrying about concurrent refresh
//! rotations. Each request acquires a per-pair guard, serves an unexpired cached entry
//! with zero network calls, or performs a `grant_type=refresh_token` exchange and writes
//! the resulting entries back best-effort.

// self
use crate::{
	_prelude::*,
	auth::{ScopeClass, ScopeSet},
	cache::{CacheKey, CachedEntry, TokenKind},
	client::{Client, GetTokenOptions},
	config,
	exchange::TokenSet,
	jwt::{self, DecodedToken},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	pkce,
};

/// Decoded and validated pair returned by a successful exchange.
#[derive(Debug)]
pub(crate) struct ValidatedTokens {
	pub access: DecodedToken,
	pub id: DecodedToken,
}

impl Client {
	/// Obtains a valid access token for the requested (audience, scope) pair, silently.
	///
	/// Serves an unexpired cached token with zero network calls; otherwise redeems the
	/// cached refresh token in a single exchange shared by all concurrent callers of the
	/// same pair. Fails with [`Error::LoginRequired`] when no refresh token is cached.
	pub async fn get_token_silently(&self, options: GetTokenOptions) -> Result<String> {
		const KIND: FlowKind = FlowKind::Silent;

		let span = FlowSpan::new(KIND, "get_token_silently");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.silent_metrics.record_attempt();

		let result = span.instrument(self.silent_inner(options)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
				self.silent_metrics.record_failure();
			},
		}

		result
	}

	async fn silent_inner(&self, options: GetTokenOptions) -> Result<String> {
		let audience =
			options.audience.unwrap_or_else(|| self.config.default_audience.clone());
		let scope = options.scope.unwrap_or_else(|| self.config.default_scope.clone());
		let normalized = scope.normalized();
		let guard = self.flight_guard(&audience, &normalized);
		// Concurrent callers of the same pair queue here and re-evaluate the cache, so one
		// in-flight exchange serves all of them. Refresh tokens rotate; a second exchange
		// with the superseded token would be rejected and corrupt the cached slot.
		let _singleflight = guard.lock().await;
		let access_key =
			CacheKey::new(TokenKind::AccessToken, &self.config.client_id, &audience, &scope);

		if !options.ignore_cache
			&& let Some(entry) = self.store.entry(&access_key).await?
			&& !jwt::is_expired(&entry.payload, self.config.leeway, OffsetDateTime::now_utc())
			&& let Some(raw) = entry.payload.raw
		{
			self.silent_metrics.record_cache_hit();

			return Ok(raw);
		}

		let Some((refresh_key, refresh_token)) =
			self.cached_refresh_token(&audience, scope.class()).await?
		else {
			return Err(Error::LoginRequired);
		};

		self.silent_metrics.record_exchange();

		let set = self
			.exchange
			.exchange_refresh_token(&refresh_token, &audience, &normalized, &options.exchange)
			.await?;
		let validated = self.validate_token_set(&set, &audience, None)?;

		self.write_back(&audience, &scope, &set, &validated, Some(refresh_key)).await;

		Ok(set.access_token)
	}

	/// Finds the freshest usable refresh token for (audience, class) via the index.
	///
	/// Requested class first; `offline` entries also satisfy `openid` requests, since an
	/// offline grant is a superset.
	pub(crate) async fn cached_refresh_token(
		&self,
		audience: &str,
		class: ScopeClass,
	) -> Result<Option<(CacheKey, String)>> {
		let classes: &[ScopeClass] = match class {
			ScopeClass::Openid => &[ScopeClass::Openid, ScopeClass::Offline],
			ScopeClass::Offline => &[ScopeClass::Offline],
		};

		for class in classes {
			for candidate in self.store.resolve_from_index(audience, *class).await? {
				let Some(key) = CacheKey::parse(&candidate) else {
					continue;
				};

				if key.kind != TokenKind::RefreshToken || key.client_id != self.config.client_id
				{
					continue;
				}
				// Stale index references read as absent entries and are skipped; the next
				// successful write for the slot prunes them.
				if let Some(entry) = self.store.entry_at(&candidate).await?
					&& let Some(raw) = entry.payload.raw
				{
					return Ok(Some((key, raw)));
				}
			}
		}

		Ok(None)
	}

	/// Decodes both returned tokens and checks issuer, audience, and (for code exchanges)
	/// the flow nonce against the client configuration.
	pub(crate) fn validate_token_set(
		&self,
		set: &TokenSet,
		audience: &str,
		expected_nonce: Option<&str>,
	) -> Result<ValidatedTokens> {
		let access = jwt::decode(&set.access_token)?;
		let id = jwt::decode(&set.id_token)?;

		for claims in [&access.claims, &id.claims] {
			let found = claims.iss.clone().unwrap_or_default();

			if !config::issuer_matches(&self.config.issuer, &found) {
				return Err(Error::IssuerMismatch {
					expected: self.config.issuer.clone(),
					found,
				});
			}
		}
		if !audience.is_empty() && !access.claims.aud.iter().any(|aud| aud == audience) {
			return Err(Error::AudienceMismatch { expected: audience.to_owned() });
		}
		if !id.claims.aud.iter().any(|aud| aud == &self.config.client_id) {
			return Err(Error::AudienceMismatch { expected: self.config.client_id.clone() });
		}
		if let Some(expected) = expected_nonce {
			pkce::validate_nonce(expected, id.claims.nonce.as_deref())?;
		}

		Ok(ValidatedTokens { access, id })
	}

	/// Best-effort write-back of one exchange's results.
	///
	/// Ordering invariant: the rotated refresh token lands first, so a crash or failure
	/// after this point never leaves a superseded refresh token as the stored one. Write
	/// failures degrade future cache efficiency but never fail the current request.
	pub(crate) async fn write_back(
		&self,
		audience: &str,
		scope: &ScopeSet,
		set: &TokenSet,
		tokens: &ValidatedTokens,
		refresh_slot: Option<CacheKey>,
	) {
		let now = OffsetDateTime::now_utc();
		let leeway = self.config.leeway;
		let class = scope.class();

		if let Some(refresh) = &set.refresh_token {
			let (key, slot_is_new) = match refresh_slot {
				Some(key) => (key, false),
				None => (
					CacheKey::new(
						TokenKind::RefreshToken,
						&self.config.client_id,
						audience,
						scope,
					),
					true,
				),
			};

			match self.store.put_entry(&key, &CachedEntry::opaque(refresh), None).await {
				Ok(()) if slot_is_new =>
					if let Err(e) = self.store.write_index_entry(audience, class, &key).await {
						obs::warn_cache_write_failed("refresh_index", &e);
					},
				Ok(()) => {},
				Err(e) => obs::warn_cache_write_failed("refresh_entry", &e),
			}
		}

		// Entries with a non-positive remaining lifetime are never cached.
		if let Some(ttl) = jwt::compute_ttl(&tokens.access.claims, leeway, now) {
			let key =
				CacheKey::new(TokenKind::AccessToken, &self.config.client_id, audience, scope);
			let entry = CachedEntry {
				header: tokens.access.header.clone(),
				payload: tokens.access.claims.clone(),
			};

			match self.store.put_entry(&key, &entry, Some(ttl)).await {
				Ok(()) =>
					if let Err(e) = self.store.write_index_entry(audience, class, &key).await {
						obs::warn_cache_write_failed("access_index", &e);
					},
				Err(e) => obs::warn_cache_write_failed("access_entry", &e),
			}
		}

		if let Some(ttl) = jwt::compute_ttl(&tokens.id.claims, leeway, now) {
			let key = CacheKey::new(TokenKind::IdToken, &self.config.client_id, audience, scope);
			let mut payload = tokens.id.claims.clone();

			// The ID entry carries its raw string under `__bearer`, not `_raw`.
			payload.raw = None;
			payload.bearer = Some(set.id_token.clone());

			let entry = CachedEntry { header: tokens.id.header.clone(), payload };

			if let Err(e) = self.store.put_entry(&key, &entry, Some(ttl)).await {
				obs::warn_cache_write_failed("id_entry", &e);
			}
		}
	}
}
