use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::card::{CardMetadata, CardUid, NfcCardConfig, ProvisionRequest, SecurityBlock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    Active,
    Inactive,
}

impl CardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardStatus::Active => "active",
            CardStatus::Inactive => "inactive",
        }
    }
}

impl FromStr for CardStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(CardStatus::Active),
            "inactive" => Ok(CardStatus::Inactive),
            other => Err(anyhow!("Unknown card status: {other}")),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CardRow {
    pub id: String,
    pub uid: String,
    pub merchant_id: String,
    pub location_id: Option<String>,
    pub campaign_id: Option<String>,
    pub gmb_url: Option<String>,
    pub shortened_url: Option<String>,
    pub card_label: Option<String>,
    pub merchant_name: String,
    pub location_name: Option<String>,
    pub campaign_name: Option<String>,
    pub created_at: String,
    pub last_modified: String,
    pub encrypted_data: String,
    pub checksum: String,
    pub security_version: String,
    pub status: String,
    pub interactions: i64,
    pub last_used: Option<String>,
    pub updated_at: String,
}

impl CardRow {
    /// Rebuild the public card configuration exactly as it was provisioned.
    pub fn config(&self) -> Result<NfcCardConfig> {
        Ok(NfcCardConfig {
            uid: CardUid::from_hex(&self.uid)?,
            merchant_id: self.merchant_id.clone(),
            location_id: self.location_id.clone(),
            campaign_id: self.campaign_id.clone(),
            gmb_url: self.gmb_url.clone(),
            shortened_url: self.shortened_url.clone(),
            metadata: CardMetadata {
                merchant_name: self.merchant_name.clone(),
                location_name: self.location_name.clone(),
                campaign_name: self.campaign_name.clone(),
                created_at: self.created_at.clone(),
                last_modified: self.last_modified.clone(),
            },
            security: SecurityBlock {
                encrypted_data: self.encrypted_data.clone(),
                checksum: self.checksum.clone(),
                version: self.security_version.clone(),
            },
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == CardStatus::Active.as_str()
    }

    pub fn into_stored(self) -> Result<StoredCard> {
        Ok(StoredCard {
            config: self.config()?,
            status: self.status.parse()?,
            id: self.id,
            card_id: self.card_label,
            interactions: self.interactions,
            last_used: self.last_used,
            updated_at: self.updated_at,
        })
    }
}

/// A card configuration plus the operational fields owned by storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCard {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_id: Option<String>,
    pub status: CardStatus,
    pub interactions: i64,
    pub last_used: Option<String>,
    pub updated_at: String,
    #[serde(flatten)]
    pub config: NfcCardConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCardRequest {
    pub merchant_id: String,
    pub location_id: Option<String>,
    pub campaign_id: Option<String>,
    pub gmb_url: Option<String>,
    /// Label printed on the physical card.
    pub card_id: Option<String>,
    pub merchant_name: Option<String>,
    pub location_name: Option<String>,
    pub campaign_name: Option<String>,
}

impl CreateCardRequest {
    pub fn provision_request(&self, default_gmb_url: Option<&str>) -> ProvisionRequest {
        ProvisionRequest {
            merchant_id: self.merchant_id.clone(),
            location_id: self.location_id.clone(),
            campaign_id: self.campaign_id.clone(),
            gmb_url: self
                .gmb_url
                .clone()
                .or_else(|| default_gmb_url.map(str::to_string)),
            merchant_name: self.merchant_name.clone(),
            location_name: self.location_name.clone(),
            campaign_name: self.campaign_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: CardStatus,
}
