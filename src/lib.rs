//! Silent OAuth 2.0 / OIDC token acquisition core - cache-first access tokens, PKCE flows, and
//! rotation-safe refresh exchanges for single-page-app style clients.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod exchange;
pub mod jwt;
pub mod obs;
pub mod pkce;
pub mod query;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// crates.io
	use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
	// self
	use crate::config::ClientConfig;
	#[cfg(feature = "reqwest")]
	use crate::{
		cache::{CacheBackend, MemoryBackend},
		client::Client,
	};

	/// Encodes an unsigned compact token from raw header/payload JSON. The signature segment is
	/// junk; the codec never inspects it.
	pub fn mint_test_jwt(header: &serde_json::Value, payload: &serde_json::Value) -> String {
		let encode = |value: &serde_json::Value| URL_SAFE_NO_PAD.encode(value.to_string());

		format!("{}.{}.sig", encode(header), encode(payload))
	}

	/// Builds a client configuration whose endpoints point at a mock server base URL.
	pub fn test_config(base: &str) -> ClientConfig {
		let url = |path: &str| {
			Url::parse(&format!("{base}{path}")).expect("Test endpoint URL should parse.")
		};

		ClientConfig::builder("client1")
			.issuer(format!("{base}/oauth2/"))
			.authorization_endpoint(url("/oauth2/auth"))
			.token_endpoint(url("/oauth2/token"))
			.logout_endpoint(url("/oauth2/logout"))
			.redirect_uri(url("/callback"))
			.default_audience("myorg.com")
			.default_scope("openid")
			.build()
			.expect("Test client configuration should build successfully.")
	}

	/// Constructs a [`Client`] backed by a fresh in-memory backend and the default reqwest
	/// transport used across integration tests.
	#[cfg(feature = "reqwest")]
	pub fn build_test_client(config: ClientConfig) -> (Client, Arc<MemoryBackend>) {
		let backend = Arc::new(MemoryBackend::default());
		let store_backend: Arc<dyn CacheBackend> = backend.clone();
		let client = Client::new(config, store_backend);

		(client, backend)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::Client as ReqwestClient;
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{BoxError, Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;
#[cfg(test)] use oidc_silent as _;
