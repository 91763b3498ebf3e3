#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use oidc_silent::{
	_preludet::*,
	auth::ScopeSet,
	cache::{CacheBackend, CacheKey, CachedEntry, TokenKind},
	client::{Client, GetTokenOptions},
	exchange::{CancelHandle, ExchangeClient, ExchangeOptions, ReqwestTransport},
};

async fn seed_refresh_token(client: &Client, raw: &str) {
	let scope = ScopeSet::from_str("openid").expect("Scope fixture should be valid.");
	let key = CacheKey::new(TokenKind::RefreshToken, "client1", "myorg.com", &scope);

	client
		.store
		.put_entry(&key, &CachedEntry::opaque(raw), None)
		.await
		.expect("Failed to seed refresh token entry.");
	client
		.store
		.write_index_entry("myorg.com", scope.class(), &key)
		.await
		.expect("Failed to index seeded refresh token entry.");
}

fn token_set_body(base: &str) -> String {
	let now = OffsetDateTime::now_utc().unix_timestamp();
	let access = mint_test_jwt(
		&json!({"alg": "RS256"}),
		&json!({
			"iss": format!("{base}/oauth2/"),
			"aud": ["myorg.com"],
			"exp": now + 3600,
		}),
	);
	let id = mint_test_jwt(
		&json!({"alg": "RS256"}),
		&json!({
			"iss": format!("{base}/oauth2/"),
			"aud": ["client1"],
			"exp": now + 3600,
		}),
	);

	json!({
		"access_token": access,
		"id_token": id,
		"expires_in": 3600,
		"token_type": "Bearer",
	})
	.to_string()
}

#[tokio::test]
async fn token_endpoint_errors_surface_status_and_body() {
	let server = MockServer::start_async().await;
	let endpoint = Url::parse(&server.url("/oauth2/token"))
		.expect("Mock token endpoint should parse.");
	let exchange =
		ExchangeClient::new(Arc::new(ReqwestTransport::default()), endpoint, "client1");

	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_grant\"}");
		})
		.await;

	let err = exchange
		.exchange_refresh_token("stale", "myorg.com", "openid", &ExchangeOptions::default())
		.await
		.expect_err("A non-2xx status must be surfaced as an error.");

	assert!(
		matches!(&err, Error::TokenEndpoint { status: 400, body } if body.contains("invalid_grant"))
	);
}

#[tokio::test]
async fn unreachable_endpoints_surface_as_network_errors() {
	// Port 9 (discard) is never listening in the test environment.
	let endpoint =
		Url::parse("http://127.0.0.1:9/oauth2/token").expect("Endpoint fixture should parse.");
	let exchange =
		ExchangeClient::new(Arc::new(ReqwestTransport::default()), endpoint, "client1");
	let err = exchange
		.exchange_refresh_token("rt", "myorg.com", "openid", &ExchangeOptions::default())
		.await
		.expect_err("An unreachable endpoint must fail.");

	assert!(matches!(err, Error::Network { .. }));
}

#[tokio::test]
async fn timed_out_exchange_writes_nothing_and_releases_the_flight_guard() {
	let server = MockServer::start_async().await;
	let base = server.base_url();
	let (client, backend) = build_test_client(test_config(&base));

	seed_refresh_token(&client, "someRefreshToken").await;

	let body = token_set_body(&base);

	server
		.mock_async(move |when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(body)
				.delay(StdDuration::from_millis(250));
		})
		.await;

	let deadline = ExchangeOptions {
		timeout: Some(StdDuration::from_millis(25)),
		..ExchangeOptions::default()
	};
	let err = client
		.get_token_silently(GetTokenOptions::default().exchange(deadline))
		.await
		.expect_err("An elapsed deadline must abort the exchange.");

	assert!(matches!(err, Error::Cancelled));
	assert!(
		backend
			.get("oidc-silent|access_token|client1|myorg.com|openid")
			.await
			.expect("Backend read should succeed.")
			.is_none(),
		"A cancelled exchange must not write any cache entry.",
	);

	// The guard must have been released: a follow-up call without a deadline succeeds.
	client
		.get_token_silently(GetTokenOptions::default())
		.await
		.expect("A follow-up request should proceed after the cancelled one.");
}

#[tokio::test]
async fn fired_cancel_signal_aborts_without_cache_writes() {
	let server = MockServer::start_async().await;
	let base = server.base_url();
	let (client, backend) = build_test_client(test_config(&base));

	seed_refresh_token(&client, "someRefreshToken").await;

	let body = token_set_body(&base);

	server
		.mock_async(move |when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(body)
				.delay(StdDuration::from_millis(250));
		})
		.await;

	let (handle, signal) = CancelHandle::new();
	let cancel = ExchangeOptions { timeout: None, cancel: Some(signal) };
	let request = client.get_token_silently(GetTokenOptions::default().exchange(cancel));

	tokio::spawn(async move {
		tokio::time::sleep(StdDuration::from_millis(25)).await;
		handle.cancel();
	});

	let err = request.await.expect_err("A fired cancel signal must abort the exchange.");

	assert!(matches!(err, Error::Cancelled));
	assert!(
		backend
			.get("oidc-silent|access_token|client1|myorg.com|openid")
			.await
			.expect("Backend read should succeed.")
			.is_none(),
		"A cancelled exchange must not write any cache entry.",
	);
}
