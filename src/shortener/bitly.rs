use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::UrlShortener;

pub const DEFAULT_BITLY_API_URL: &str = "https://api-ssl.bitly.com/v4";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const SHORT_DOMAIN: &str = "bit.ly";

#[derive(Debug, Serialize)]
struct ShortenRequest<'a> {
    long_url: &'a str,
    domain: &'a str,
}

#[derive(Debug, Deserialize)]
struct ShortenResponse {
    #[serde(default)]
    link: Option<String>,
}

/// Shortens review links through the Bitly v4 API.
pub struct BitlyShortener {
    access_token: String,
    api_base_url: String,
    http_client: reqwest::Client,
}

impl BitlyShortener {
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be initialized.
    pub fn new(
        access_token: impl Into<String>,
        api_base_url: impl Into<String>,
    ) -> reqwest::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            access_token: access_token.into(),
            api_base_url: api_base_url.into(),
            http_client,
        })
    }

    async fn request_link(&self, long_url: &str) -> reqwest::Result<Option<String>> {
        let long_url = if long_url.starts_with("http") {
            long_url.to_string()
        } else {
            format!("https://{long_url}")
        };

        let response = self
            .http_client
            .post(format!("{}/shorten", self.api_base_url.trim_end_matches('/')))
            .bearer_auth(&self.access_token)
            .json(&ShortenRequest {
                long_url: &long_url,
                domain: SHORT_DOMAIN,
            })
            .send()
            .await?
            .error_for_status()?;

        let body: ShortenResponse = response.json().await?;
        Ok(body.link.filter(|link| !link.is_empty()))
    }
}

#[async_trait]
impl UrlShortener for BitlyShortener {
    async fn shorten(&self, long_url: &str) -> String {
        match self.request_link(long_url).await {
            Ok(Some(link)) => link,
            Ok(None) => {
                tracing::warn!("No shortened URL in Bitly response, using original URL");
                long_url.to_string()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to shorten URL with Bitly, using original URL");
                long_url.to_string()
            }
        }
    }
}
