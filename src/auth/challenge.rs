//! Canonical challenge message
//!
//! The exact bytes of this template are a wire format: the client signs the
//! rendered message, and the server re-renders it from the request fields to
//! verify. Any change, even whitespace, invalidates every in-flight
//! signature, so changes must bump the embedded version.

const CHALLENGE_VERSION: &str = "v1";

/// Render the canonical challenge message for signing and verification.
pub fn challenge_message(nonce: &str, public_key: &str, iso_timestamp: &str) -> String {
    format!(
        "WalletGate authentication {CHALLENGE_VERSION}\nnonce: {nonce}\npublic-key: {public_key}\nissued-at: {iso_timestamp}"
    )
}
