use chrono::{SecondsFormat, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    card::{CardMetadata, CardUid, NfcCardConfig, SECURITY_VERSION, SecurePayload, SecurityBlock},
    crypto::{CipherError, CipherService},
};

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("card could not be sealed: {0}")]
    Seal(#[from] CipherError),
}

/// Inputs for a new card. Display names fall back to generated labels.
#[derive(Debug, Clone, Default)]
pub struct ProvisionRequest {
    pub merchant_id: String,
    pub location_id: Option<String>,
    pub campaign_id: Option<String>,
    pub gmb_url: Option<String>,
    pub merchant_name: Option<String>,
    pub location_name: Option<String>,
    pub campaign_name: Option<String>,
}

impl ProvisionRequest {
    pub fn new(merchant_id: impl Into<String>) -> Self {
        Self {
            merchant_id: merchant_id.into(),
            ..Self::default()
        }
    }
}

/// Builds sealed card configurations and verifies them later.
#[derive(Debug, Clone)]
pub struct CardProvisioner {
    pub(crate) cipher: CipherService,
    default_merchant_name: String,
}

impl CardProvisioner {
    pub fn new(cipher: CipherService, default_merchant_name: impl Into<String>) -> Self {
        Self {
            cipher,
            default_merchant_name: default_merchant_name.into(),
        }
    }

    /// Generates a fresh uid and nonce, seals them with the merchant and
    /// location, and returns the complete public configuration.
    ///
    /// Nothing is returned on failure, so a caller can never persist a
    /// half-built card.
    pub fn provision(&self, request: &ProvisionRequest) -> Result<NfcCardConfig, ProvisionError> {
        let now = Utc::now();
        let uid = CardUid::generate();

        let payload = SecurePayload {
            uid,
            merchant_id: request.merchant_id.clone(),
            location_id: request.location_id.clone(),
            timestamp: now.timestamp_millis(),
            nonce: Uuid::new_v4().to_string(),
        };
        let security = self.seal(&payload)?;

        let stamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);
        let metadata = CardMetadata {
            merchant_name: request
                .merchant_name
                .clone()
                .unwrap_or_else(|| self.default_merchant_name.clone()),
            location_name: request.location_name.clone().or_else(|| {
                request.location_id.as_ref().map(|id| format!("Location {id}"))
            }),
            campaign_name: request.campaign_name.clone().or_else(|| {
                request.campaign_id.as_ref().map(|id| format!("Campaign {id}"))
            }),
            created_at: stamp.clone(),
            last_modified: stamp,
        };

        tracing::info!(%uid, merchant_id = %request.merchant_id, "Provisioned card");

        Ok(NfcCardConfig {
            uid,
            merchant_id: request.merchant_id.clone(),
            location_id: request.location_id.clone(),
            campaign_id: request.campaign_id.clone(),
            gmb_url: request.gmb_url.clone(),
            shortened_url: None,
            metadata,
            security,
        })
    }

    /// Encrypts and checksums `payload` into a current-version security block.
    pub fn seal(&self, payload: &SecurePayload) -> Result<SecurityBlock, ProvisionError> {
        Ok(SecurityBlock {
            encrypted_data: self.cipher.encrypt(payload)?,
            checksum: self.cipher.checksum(payload)?,
            version: SECURITY_VERSION.to_string(),
        })
    }
}
