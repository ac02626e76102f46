use anyhow::{Result, anyhow};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub mod provision;
pub mod verify;

pub use provision::{CardProvisioner, ProvisionRequest};
pub use verify::Verification;

/// Security block format produced by this service.
pub const SECURITY_VERSION: &str = "1.0";

/// Card identifier: 8 bytes, rendered as 16 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CardUid([u8; 8]);

impl CardUid {
    /// Draws 128 random bits and keeps the first 64 of them.
    pub fn generate() -> Self {
        let wide: [u8; 16] = rand::random();
        let mut arr = [0u8; 8];
        arr.copy_from_slice(&wide[..8]);
        Self(arr)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        if s.len() != 16 || !s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(anyhow!("UID must be 16 lowercase hex characters"));
        }
        let bytes = hex::decode(s)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl fmt::Display for CardUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Serialize for CardUid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CardUid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// The sealed record. Only ever stored encrypted and checksummed.
///
/// Field order is the canonical serialization order; do not reorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurePayload {
    pub uid: CardUid,
    pub merchant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub nonce: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityBlock {
    pub encrypted_data: String,
    pub checksum: String,
    pub version: String,
}

/// Display-only labels. Never consulted by verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardMetadata {
    pub merchant_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_name: Option<String>,
    pub created_at: String,
    pub last_modified: String,
}

/// Public card configuration. `uid` and `merchant_id` are queryable copies of
/// the values sealed inside `security`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NfcCardConfig {
    pub uid: CardUid,
    pub merchant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gmb_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortened_url: Option<String>,
    pub metadata: CardMetadata,
    pub security: SecurityBlock,
}

impl NfcCardConfig {
    /// Where a customer tapping this card should land.
    pub fn destination(&self) -> Option<&str> {
        self.shortened_url.as_deref().or(self.gmb_url.as_deref())
    }
}
