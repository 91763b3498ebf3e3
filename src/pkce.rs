//! PKCE and nonce material for a single authorization attempt.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

const STATE_LEN: usize = 32;
const NONCE_LEN: usize = 32;
const CODE_VERIFIER_LEN: usize = 64;

/// PKCE challenge method sent alongside the code challenge (RFC 7636 S256).
pub const CODE_CHALLENGE_METHOD: &str = "S256";

/// Per-flow secrets for one authorization-code round trip.
///
/// Held only for the duration of a single flow and discarded once the code is exchanged or
/// the flow is abandoned. The code verifier and state are never logged (`Debug` redacts
/// them) and must not be persisted beyond the flow's lifetime.
#[derive(Clone)]
pub struct FlowState {
	state: String,
	nonce: String,
	code_verifier: String,
	code_challenge: String,
}
impl FlowState {
	/// Generates fresh random state, nonce, and PKCE verifier/challenge material.
	pub fn generate() -> Self {
		let code_verifier = random_string(CODE_VERIFIER_LEN);
		let code_challenge = compute_code_challenge(&code_verifier);

		Self {
			state: random_string(STATE_LEN),
			nonce: random_string(NONCE_LEN),
			code_verifier,
			code_challenge,
		}
	}

	/// Opaque state value that must round-trip via the redirect handler.
	pub fn state(&self) -> &str {
		&self.state
	}

	/// Nonce bound into the authorize URL and echoed back inside the ID token.
	pub fn nonce(&self) -> &str {
		&self.nonce
	}

	/// High-entropy PKCE code verifier presented during the code exchange.
	pub fn code_verifier(&self) -> &str {
		&self.code_verifier
	}

	/// PKCE code challenge: `base64url(SHA-256(code_verifier))`, unpadded.
	pub fn code_challenge(&self) -> &str {
		&self.code_challenge
	}

	/// Validates the `state` parameter returned by the authorization redirect.
	pub fn validate_state(&self, returned_state: &str) -> Result<()> {
		if returned_state == self.state { Ok(()) } else { Err(Error::StateMismatch) }
	}

	/// Validates that a returned ID token nonce matches the one issued for this flow.
	///
	/// Mandatory before accepting any ID token from an authorization-code exchange; a
	/// mismatch indicates token substitution and aborts the flow.
	pub fn validate_nonce(&self, received: Option<&str>) -> Result<()> {
		validate_nonce(&self.nonce, received)
	}
}
impl Debug for FlowState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FlowState")
			.field("state", &"<redacted>")
			.field("nonce", &self.nonce)
			.field("code_verifier", &"<redacted>")
			.field("code_challenge", &self.code_challenge)
			.finish()
	}
}

/// Fails with [`Error::NonceMismatch`] unless `received` equals `expected`.
pub fn validate_nonce(expected: &str, received: Option<&str>) -> Result<()> {
	if received == Some(expected) { Ok(()) } else { Err(Error::NonceMismatch) }
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

fn compute_code_challenge(verifier: &str) -> String {
	let mut hasher = Sha256::new();

	hasher.update(verifier.as_bytes());

	URL_SAFE_NO_PAD.encode(hasher.finalize())
}
