//! Nonce challenge management
//!
//! Issues single-use random nonces and seals them, together with their issue
//! time, into an encrypted carrier the client stores out-of-band (an
//! http-only cookie). The carrier is never trusted at face value: redemption
//! decrypts it and requires the decrypted nonce, the presented nonce, and
//! the stored pending nonce to all agree, inside the freshness window.
//!
//! Carriers use AES-256-GCM with a random 12-byte nonce generated per
//! encryption and transmitted alongside the ciphertext, so tampering with
//! any byte fails authentication outright.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce as AesNonce};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::NonceState;

const IV_SIZE: usize = 12; // AES-GCM standard nonce size

/// Nonce lifecycle errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum NonceError {
    /// Carrier absent, truncated, or failed authenticated decryption
    #[error("Nonce carrier is missing or invalid")]
    CarrierInvalid,

    /// No nonce is pending for this identity (never issued, superseded, or
    /// already consumed)
    #[error("No pending nonce for this identity")]
    NotPending,

    /// Decrypted, presented, and stored nonce values disagree
    #[error("Nonce mismatch")]
    Mismatch,

    /// The freshness window has elapsed since issuance
    #[error("Nonce expired")]
    Expired,

    /// Lost the consumption race: the nonce was redeemed concurrently
    #[error("Nonce already used")]
    AlreadyUsed,

    /// Server-side encryption failure while sealing a carrier
    #[error("Failed to seal nonce carrier: {0}")]
    SealFailed(String),
}

/// Payload embedded in the encrypted carrier.
#[derive(Serialize, Deserialize)]
struct CarrierPayload {
    nonce: String,
    issued_at_ms: i64,
}

/// Mints and validates challenge nonces and their encrypted carriers.
pub struct NonceManager {
    cipher: Aes256Gcm,
    freshness_window: Duration,
}

impl NonceManager {
    pub fn new(carrier_key: &[u8; 32], freshness_window_seconds: i64) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(carrier_key)),
            freshness_window: Duration::seconds(freshness_window_seconds),
        }
    }

    /// Generate a fresh nonce value: 32 bytes from the OS RNG, hex-encoded.
    pub fn generate(&self) -> String {
        let mut bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Seal a nonce and its issue time into an opaque carrier string.
    ///
    /// Layout: `base64url(iv || ciphertext)` with a random per-encryption IV.
    pub fn seal(&self, nonce: &str, issued_at: DateTime<Utc>) -> Result<String, NonceError> {
        let payload = CarrierPayload {
            nonce: nonce.to_string(),
            issued_at_ms: issued_at.timestamp_millis(),
        };
        let plaintext =
            serde_json::to_vec(&payload).map_err(|e| NonceError::SealFailed(e.to_string()))?;

        let mut iv = [0u8; IV_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut iv);

        let ciphertext = self
            .cipher
            .encrypt(AesNonce::from_slice(&iv), plaintext.as_ref())
            .map_err(|e| NonceError::SealFailed(e.to_string()))?;

        let mut sealed = Vec::with_capacity(IV_SIZE + ciphertext.len());
        sealed.extend_from_slice(&iv);
        sealed.extend_from_slice(&ciphertext);

        Ok(URL_SAFE_NO_PAD.encode(sealed))
    }

    /// Decrypt a carrier back into its nonce value and issue time.
    ///
    /// Any decoding or authentication failure collapses to `CarrierInvalid`;
    /// a tampered ciphertext can never yield a wrong nonce.
    pub fn open(&self, carrier: &str) -> Result<(String, DateTime<Utc>), NonceError> {
        let sealed = URL_SAFE_NO_PAD
            .decode(carrier)
            .map_err(|_| NonceError::CarrierInvalid)?;
        if sealed.len() <= IV_SIZE {
            return Err(NonceError::CarrierInvalid);
        }
        let (iv, ciphertext) = sealed.split_at(IV_SIZE);

        let plaintext = self
            .cipher
            .decrypt(AesNonce::from_slice(iv), ciphertext)
            .map_err(|_| NonceError::CarrierInvalid)?;

        let payload: CarrierPayload =
            serde_json::from_slice(&plaintext).map_err(|_| NonceError::CarrierInvalid)?;
        let issued_at = DateTime::from_timestamp_millis(payload.issued_at_ms)
            .ok_or(NonceError::CarrierInvalid)?;

        Ok((payload.nonce, issued_at))
    }

    /// Validate a redemption attempt against the stored nonce state.
    ///
    /// On success returns the pending value for the caller to consume via a
    /// conditional store update. Does not mutate anything itself.
    pub fn redeem(
        &self,
        state: &NonceState,
        presented_nonce: &str,
        carrier: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<String, NonceError> {
        let carrier = carrier.ok_or(NonceError::CarrierInvalid)?;
        let (carrier_nonce, issued_at) = self.open(carrier)?;

        let NonceState::Pending { value, .. } = state else {
            return Err(NonceError::NotPending);
        };

        if carrier_nonce != presented_nonce || presented_nonce != value {
            return Err(NonceError::Mismatch);
        }

        if now - issued_at > self.freshness_window {
            return Err(NonceError::Expired);
        }

        Ok(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> NonceManager {
        NonceManager::new(&[0x42; 32], 240)
    }

    fn pending(value: &str, issued_at: DateTime<Utc>) -> NonceState {
        NonceState::Pending {
            value: value.to_string(),
            issued_at,
        }
    }

    #[test]
    fn test_generate_is_unique_and_long() {
        let m = manager();
        let a = m.generate();
        let b = m.generate();
        assert_ne!(a, b);
        // 32 bytes hex-encoded
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let m = manager();
        let now = Utc::now();
        let carrier = m.seal("nonce-value", now).unwrap();
        let (nonce, issued_at) = m.open(&carrier).unwrap();

        assert_eq!(nonce, "nonce-value");
        assert_eq!(issued_at.timestamp_millis(), now.timestamp_millis());
    }

    #[test]
    fn test_seal_uses_random_iv() {
        let m = manager();
        let now = Utc::now();
        let c1 = m.seal("same", now).unwrap();
        let c2 = m.seal("same", now).unwrap();
        assert_ne!(c1, c2);
    }

    #[test]
    fn test_tampered_carrier_fails() {
        let m = manager();
        let carrier = m.seal("nonce-value", Utc::now()).unwrap();

        let mut sealed = URL_SAFE_NO_PAD.decode(&carrier).unwrap();
        // Flip one ciphertext byte
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        let tampered = URL_SAFE_NO_PAD.encode(sealed);

        assert_eq!(m.open(&tampered), Err(NonceError::CarrierInvalid));
    }

    #[test]
    fn test_wrong_key_fails() {
        let m = manager();
        let other = NonceManager::new(&[0x43; 32], 240);
        let carrier = m.seal("nonce-value", Utc::now()).unwrap();

        assert_eq!(other.open(&carrier), Err(NonceError::CarrierInvalid));
    }

    #[test]
    fn test_redeem_happy_path() {
        let m = manager();
        let now = Utc::now();
        let carrier = m.seal("n1", now).unwrap();
        let state = pending("n1", now);

        assert_eq!(m.redeem(&state, "n1", Some(&carrier), now).unwrap(), "n1");
    }

    #[test]
    fn test_redeem_missing_carrier() {
        let m = manager();
        let state = pending("n1", Utc::now());
        assert_eq!(
            m.redeem(&state, "n1", None, Utc::now()),
            Err(NonceError::CarrierInvalid)
        );
    }

    #[test]
    fn test_redeem_mismatched_nonce() {
        let m = manager();
        let now = Utc::now();
        let carrier = m.seal("n1", now).unwrap();

        // Presented nonce differs from carrier
        assert_eq!(
            m.redeem(&pending("n1", now), "n2", Some(&carrier), now),
            Err(NonceError::Mismatch)
        );
        // Stored nonce superseded by a newer issuance
        assert_eq!(
            m.redeem(&pending("n3", now), "n1", Some(&carrier), now),
            Err(NonceError::Mismatch)
        );
    }

    #[test]
    fn test_redeem_consumed_or_unissued() {
        let m = manager();
        let now = Utc::now();
        let carrier = m.seal("n1", now).unwrap();

        assert_eq!(
            m.redeem(&NonceState::Consumed, "n1", Some(&carrier), now),
            Err(NonceError::NotPending)
        );
        assert_eq!(
            m.redeem(&NonceState::Unissued, "n1", Some(&carrier), now),
            Err(NonceError::NotPending)
        );
    }

    #[test]
    fn test_redeem_expired() {
        let m = manager();
        let issued_at = Utc::now();
        let carrier = m.seal("n1", issued_at).unwrap();
        let state = pending("n1", issued_at);

        let later = issued_at + Duration::seconds(241);
        assert_eq!(
            m.redeem(&state, "n1", Some(&carrier), later),
            Err(NonceError::Expired)
        );

        // Just inside the window is still fine
        let inside = issued_at + Duration::seconds(239);
        assert!(m.redeem(&state, "n1", Some(&carrier), inside).is_ok());
    }
}
