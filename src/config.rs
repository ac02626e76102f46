use clap::Parser;

use crate::{
    crypto::{CipherService, KeyError},
    shortener::bitly::DEFAULT_BITLY_API_URL,
};

#[derive(Parser, Debug, Clone)]
#[command(name = "nfc-card-service")]
#[command(about = "Provisions and verifies sealed NFC review cards")]
#[command(version)]
pub struct Config {
    /// Host address to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value = "8080")]
    pub port: u16,

    /// SQLite database URL
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://nfc_cards.db?mode=rwc")]
    pub database_url: String,

    /// Key material for card sealing (at least 32 bytes)
    #[arg(long, env = "ENCRYPTION_KEY", hide_env_values = true)]
    pub encryption_key: String,

    /// CBC initialization vector (exactly 16 bytes)
    #[arg(long, env = "ENCRYPTION_IV", hide_env_values = true)]
    pub encryption_iv: String,

    /// Default review destination for cards provisioned without one
    #[arg(long, env = "GMB_REVIEW_LINK")]
    pub gmb_review_link: Option<String>,

    /// Bitly access token; review links are stored unshortened without it
    #[arg(long, env = "BITLY_ACCESS_TOKEN", hide_env_values = true)]
    pub bitly_access_token: Option<String>,

    /// Bitly API base URL
    #[arg(long, env = "BITLY_API_URL", default_value = DEFAULT_BITLY_API_URL)]
    pub bitly_api_url: String,

    /// Merchant display name used when a request does not supply one
    #[arg(long, env = "DEFAULT_MERCHANT_NAME", default_value = "Default Merchant")]
    pub default_merchant_name: String,
}

impl Config {
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate the sealing secrets and build the cipher service from them.
    pub fn cipher_service(&self) -> Result<CipherService, KeyError> {
        CipherService::from_secrets(&self.encryption_key, &self.encryption_iv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "config-test-key-material-32-bytes-long";

    #[test]
    fn parses_required_secrets() {
        let config = Config::try_parse_from([
            "nfc-card-service",
            "--encryption-key",
            KEY,
            "--encryption-iv",
            "abcdefghijklmnop",
        ])
        .unwrap();
        assert_eq!(config.socket_addr(), "0.0.0.0:8080");
        assert_eq!(config.default_merchant_name, "Default Merchant");
        assert_eq!(config.bitly_api_url, "https://api-ssl.bitly.com/v4");
        assert!(config.cipher_service().is_ok());
    }

    #[test]
    fn weak_secrets_fail_validation() {
        let config = Config::try_parse_from([
            "nfc-card-service",
            "--encryption-key",
            "short",
            "--encryption-iv",
            "abcdefghijklmnop",
        ])
        .unwrap();
        assert_eq!(config.cipher_service().unwrap_err(), KeyError::KeyTooShort(5));

        let config = Config::try_parse_from([
            "nfc-card-service",
            "--encryption-key",
            KEY,
            "--encryption-iv",
            "abc",
        ])
        .unwrap();
        assert_eq!(config.cipher_service().unwrap_err(), KeyError::InvalidIvLength(3));
    }

    #[test]
    fn parses_bitly_settings() {
        let config = Config::try_parse_from([
            "nfc-card-service",
            "--encryption-key",
            KEY,
            "--encryption-iv",
            "abcdefghijklmnop",
            "--bitly-access-token",
            "bitly-token",
            "--bitly-api-url",
            "http://127.0.0.1:9000/v4",
        ])
        .unwrap();
        assert_eq!(config.bitly_access_token.as_deref(), Some("bitly-token"));
        assert_eq!(config.bitly_api_url, "http://127.0.0.1:9000/v4");
    }
}
