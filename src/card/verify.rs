use chrono::Utc;
use std::fmt;

use crate::card::{CardProvisioner, NfcCardConfig, SECURITY_VERSION, SecurePayload};

/// Maximum age of a sealed payload: 365 days in milliseconds.
pub const MAX_CARD_AGE_MS: i64 = 365 * 24 * 60 * 60 * 1000;

/// Why a card failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Undecryptable,
    ChecksumMismatch,
    UidMismatch,
    MerchantMismatch,
    Expired,
    UnsupportedVersion,
}

impl Rejection {
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::Undecryptable => "Card data could not be decrypted",
            Rejection::ChecksumMismatch => "Card checksum mismatch",
            Rejection::UidMismatch => "Card UID mismatch",
            Rejection::MerchantMismatch => "Card merchant ID mismatch",
            Rejection::Expired => "Card data has expired",
            Rejection::UnsupportedVersion => "Unsupported security block version",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// Result of card verification
#[derive(Debug, PartialEq)]
pub enum Verification {
    Valid { payload: SecurePayload },
    Rejected(Rejection),
}

impl Verification {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verification::Valid { .. })
    }

    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Verification::Valid { .. } => None,
            Verification::Rejected(rejection) => Some(*rejection),
        }
    }
}

impl CardProvisioner {
    /// Verify a card configuration against the current wall clock.
    pub fn verify(&self, config: &NfcCardConfig) -> Verification {
        self.verify_at(config, Utc::now().timestamp_millis())
    }

    /// Verify a card configuration as of `now_ms` (milliseconds since epoch).
    ///
    /// Never fails: every problem with the card becomes a [`Rejection`].
    pub fn verify_at(&self, config: &NfcCardConfig, now_ms: i64) -> Verification {
        match config.security.version.as_str() {
            SECURITY_VERSION => self.verify_v1(config, now_ms),
            other => {
                tracing::warn!(uid = %config.uid, version = other, "Unsupported security block version");
                Verification::Rejected(Rejection::UnsupportedVersion)
            }
        }
    }

    fn verify_v1(&self, config: &NfcCardConfig, now_ms: i64) -> Verification {
        let reject = |rejection: Rejection| {
            tracing::warn!(uid = %config.uid, reason = %rejection, "Card verification failed");
            Verification::Rejected(rejection)
        };

        let payload: SecurePayload = match self.cipher.decrypt(&config.security.encrypted_data) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::debug!(uid = %config.uid, error = %e, "Security block did not decrypt");
                return reject(Rejection::Undecryptable);
            }
        };

        if !self.cipher.verify_checksum(&payload, &config.security.checksum) {
            return reject(Rejection::ChecksumMismatch);
        }

        if payload.uid != config.uid {
            return reject(Rejection::UidMismatch);
        }

        if payload.merchant_id != config.merchant_id {
            return reject(Rejection::MerchantMismatch);
        }

        if now_ms.saturating_sub(payload.timestamp) > MAX_CARD_AGE_MS {
            return reject(Rejection::Expired);
        }

        Verification::Valid { payload }
    }
}
