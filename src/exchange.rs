//! Token endpoint client: single-attempt form POSTs for the two grant types the silent
//! pipeline uses.

pub mod cancel;
pub use cancel::*;

// self
use crate::_prelude::*;

/// Boxed future returned by [`TokenTransport::post_form`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<FormResponse, BoxError>> + 'a + Send>>;

/// Raw HTTP response handed back by a transport.
#[derive(Clone, Debug)]
pub struct FormResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response body bytes.
	pub body: Vec<u8>,
}
impl FormResponse {
	fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Transport seam for the token endpoint.
///
/// One call, one form-encoded POST. Retry and backoff stay with the caller.
pub trait TokenTransport
where
	Self: Send + Sync,
{
	/// Sends an `application/x-www-form-urlencoded` POST and returns the raw response.
	fn post_form<'a>(&'a self, endpoint: &'a Url, form: &'a [(&'a str, &'a str)])
	-> TransportFuture<'a>;
}

/// [`TokenTransport`] over a shared [`reqwest::Client`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
	client: ReqwestClient,
}
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing client, sharing its connection pool.
	pub fn new(client: ReqwestClient) -> Self {
		Self { client }
	}
}
#[cfg(feature = "reqwest")]
impl TokenTransport for ReqwestTransport {
	fn post_form<'a>(
		&'a self,
		endpoint: &'a Url,
		form: &'a [(&'a str, &'a str)],
	) -> TransportFuture<'a> {
		Box::pin(async move {
			let response = self
				.client
				.post(endpoint.clone())
				.form(form)
				.send()
				.await
				.map_err(|e| Box::new(e) as BoxError)?;
			let status = response.status().as_u16();
			let body = response.bytes().await.map_err(|e| Box::new(e) as BoxError)?.to_vec();

			Ok(FormResponse { status, body })
		})
	}
}

/// Token endpoint response shape.
///
/// Transient by design: the orchestrator decomposes it into cache entries and never
/// persists it as-is.
#[derive(Clone, Deserialize)]
pub struct TokenSet {
	/// Newly issued access token.
	pub access_token: String,
	/// Newly issued ID token.
	pub id_token: String,
	/// Rotated refresh token, when the issuer rotates on use.
	#[serde(default)]
	pub refresh_token: Option<String>,
	/// Advisory lifetime in seconds; claim-level `exp` is authoritative for caching.
	#[serde(default)]
	pub expires_in: Option<i64>,
	/// Space-joined scope actually granted.
	#[serde(default)]
	pub scope: Option<String>,
	/// Token type, normally `Bearer`.
	#[serde(default)]
	pub token_type: Option<String>,
}
impl Debug for TokenSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenSet")
			.field("access_token", &"<redacted>")
			.field("id_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("expires_in", &self.expires_in)
			.field("scope", &self.scope)
			.field("token_type", &self.token_type)
			.finish()
	}
}

/// Per-call knobs for a token endpoint exchange.
#[derive(Clone, Debug, Default)]
pub struct ExchangeOptions {
	/// Deadline for the whole exchange; elapsing maps to [`Error::Cancelled`].
	pub timeout: Option<StdDuration>,
	/// Caller-held abort signal; firing maps to [`Error::Cancelled`].
	pub cancel: Option<CancelSignal>,
}

/// Client for the issuer's token endpoint.
pub struct ExchangeClient {
	transport: Arc<dyn TokenTransport>,
	token_endpoint: Url,
	client_id: String,
}
impl ExchangeClient {
	/// Builds a client for the given endpoint.
	pub fn new(
		transport: Arc<dyn TokenTransport>,
		token_endpoint: Url,
		client_id: impl Into<String>,
	) -> Self {
		Self { transport, token_endpoint, client_id: client_id.into() }
	}

	/// Redeems an authorization code with its PKCE verifier.
	pub async fn exchange_authorization_code(
		&self,
		code: &str,
		code_verifier: &str,
		redirect_uri: &Url,
		options: &ExchangeOptions,
	) -> Result<TokenSet> {
		let redirect_uri = redirect_uri.to_string();
		let form = [
			("grant_type", "authorization_code"),
			("client_id", self.client_id.as_str()),
			("code", code),
			("code_verifier", code_verifier),
			("redirect_uri", redirect_uri.as_str()),
		];

		self.post(&form, options).await
	}

	/// Redeems a refresh token for the given audience and scope.
	pub async fn exchange_refresh_token(
		&self,
		refresh_token: &str,
		audience: &str,
		scope: &str,
		options: &ExchangeOptions,
	) -> Result<TokenSet> {
		let form = [
			("grant_type", "refresh_token"),
			("client_id", self.client_id.as_str()),
			("refresh_token", refresh_token),
			("audience", audience),
			("scope", scope),
		];

		self.post(&form, options).await
	}

	async fn post(&self, form: &[(&str, &str)], options: &ExchangeOptions) -> Result<TokenSet> {
		let request = self.transport.post_form(&self.token_endpoint, form);
		let response = match (&options.cancel, options.timeout) {
			(Some(cancel), Some(timeout)) => {
				let cancel = cancel.clone();

				tokio::select! {
					response = tokio::time::timeout(timeout, request) =>
						response.map_err(|_| Error::Cancelled)?,
					() = cancel.cancelled() => return Err(Error::Cancelled),
				}
			},
			(Some(cancel), None) => {
				let cancel = cancel.clone();

				tokio::select! {
					response = request => response,
					() = cancel.cancelled() => return Err(Error::Cancelled),
				}
			},
			(None, Some(timeout)) =>
				tokio::time::timeout(timeout, request).await.map_err(|_| Error::Cancelled)?,
			(None, None) => request.await,
		};
		let response = response.map_err(|source| Error::Network { source })?;

		if !response.is_success() {
			return Err(Error::TokenEndpoint {
				status: response.status,
				body: String::from_utf8_lossy(&response.body).into_owned(),
			});
		}

		let mut deserializer = serde_json::Deserializer::from_slice(&response.body);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| Error::TokenResponseParse { source })
	}
}
impl Debug for ExchangeClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ExchangeClient")
			.field("token_endpoint", &self.token_endpoint.as_str())
			.field("client_id", &self.client_id)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	struct StaticTransport {
		status: u16,
		body: &'static str,
	}
	impl TokenTransport for StaticTransport {
		fn post_form<'a>(
			&'a self,
			_: &'a Url,
			_: &'a [(&'a str, &'a str)],
		) -> TransportFuture<'a> {
			Box::pin(async move {
				Ok(FormResponse { status: self.status, body: self.body.as_bytes().to_vec() })
			})
		}
	}

	struct HangingTransport;
	impl TokenTransport for HangingTransport {
		fn post_form<'a>(
			&'a self,
			_: &'a Url,
			_: &'a [(&'a str, &'a str)],
		) -> TransportFuture<'a> {
			Box::pin(std::future::pending::<Result<FormResponse, BoxError>>())
		}
	}

	fn client(transport: impl TokenTransport + 'static) -> ExchangeClient {
		let endpoint = Url::parse("https://myorg.example.com/oauth2/token")
			.expect("Endpoint fixture should parse.");

		ExchangeClient::new(Arc::new(transport), endpoint, "client1")
	}

	#[tokio::test]
	async fn successful_response_parses_into_a_token_set() {
		let client = client(StaticTransport {
			status: 200,
			body: r#"{"access_token":"a.b.c","id_token":"d.e.f","refresh_token":"rt","expires_in":3600}"#,
		});
		let set = client
			.exchange_refresh_token("rt-old", "myorg.com", "openid", &ExchangeOptions::default())
			.await
			.expect("Well-formed token set should parse.");

		assert_eq!(set.access_token, "a.b.c");
		assert_eq!(set.refresh_token.as_deref(), Some("rt"));
		assert_eq!(set.expires_in, Some(3600));
	}

	#[tokio::test]
	async fn non_success_status_surfaces_status_and_body() {
		let client = client(StaticTransport { status: 400, body: r#"{"error":"invalid_grant"}"# });
		let err = client
			.exchange_refresh_token("rt", "myorg.com", "openid", &ExchangeOptions::default())
			.await
			.expect_err("Non-2xx status must be an error regardless of body.");

		assert!(
			matches!(&err, Error::TokenEndpoint { status: 400, body } if body.contains("invalid_grant"))
		);
	}

	#[tokio::test]
	async fn malformed_success_body_is_a_parse_error() {
		let client = client(StaticTransport { status: 200, body: "not json" });
		let err = client
			.exchange_refresh_token("rt", "myorg.com", "openid", &ExchangeOptions::default())
			.await
			.expect_err("Unparsable 2xx body must be an error.");

		assert!(matches!(err, Error::TokenResponseParse { .. }));
	}

	#[tokio::test]
	async fn elapsed_timeout_maps_to_cancelled() {
		let client = client(HangingTransport);
		let options = ExchangeOptions {
			timeout: Some(StdDuration::from_millis(10)),
			..ExchangeOptions::default()
		};
		let err = client
			.exchange_refresh_token("rt", "myorg.com", "openid", &options)
			.await
			.expect_err("Hanging transport must hit the deadline.");

		assert!(matches!(err, Error::Cancelled));
	}

	#[tokio::test]
	async fn fired_cancel_signal_maps_to_cancelled() {
		let client = client(HangingTransport);
		let (handle, signal) = CancelHandle::new();
		let options = ExchangeOptions { timeout: None, cancel: Some(signal) };
		let exchange = client.exchange_refresh_token("rt", "myorg.com", "openid", &options);

		handle.cancel();

		let err = exchange.await.expect_err("Fired signal must abort the exchange.");

		assert!(matches!(err, Error::Cancelled));
	}

	#[tokio::test]
	async fn redacted_debug_never_prints_token_material() {
		let set = TokenSet {
			access_token: "secret-access".into(),
			id_token: "secret-id".into(),
			refresh_token: Some("secret-refresh".into()),
			expires_in: Some(3600),
			scope: Some("openid".into()),
			token_type: Some("Bearer".into()),
		};
		let rendered = format!("{set:?}");

		assert!(!rendered.contains("secret"));
		assert!(rendered.contains("<redacted>"));
	}
}
