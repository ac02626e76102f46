use async_trait::async_trait;
use std::sync::Arc;
use url::form_urlencoded;

pub mod bitly;

pub use bitly::BitlyShortener;

/// Builds the long review URL a card points at. Parameter values are
/// form-urlencoded.
pub fn review_url(gmb_url: &str, location_id: Option<&str>, campaign_id: Option<&str>) -> String {
    let base = gmb_url.strip_suffix('/').unwrap_or(gmb_url);

    let mut query = form_urlencoded::Serializer::new(String::new());
    if let Some(location) = location_id {
        query.append_pair("location", location);
    }
    if let Some(campaign) = campaign_id {
        query.append_pair("campaign", campaign);
    }
    let query = query.finish();

    if query.is_empty() {
        format!("{base}/")
    } else {
        format!("{base}/?{query}")
    }
}

/// Picks the shortening backend: Bitly when an access token is configured,
/// the passthrough otherwise.
pub fn from_settings(
    access_token: Option<&str>,
    api_base_url: &str,
) -> reqwest::Result<Arc<dyn UrlShortener>> {
    match access_token.map(str::trim).filter(|token| !token.is_empty()) {
        Some(token) => Ok(Arc::new(BitlyShortener::new(token, api_base_url)?)),
        None => {
            tracing::warn!("Bitly access token not configured; URL shortening is disabled");
            Ok(Arc::new(PassthroughShortener))
        }
    }
}

#[async_trait]
pub trait UrlShortener: Send + Sync {
    /// Shorten `long_url`. Implementations return `long_url` unchanged on any
    /// failure rather than erroring.
    async fn shorten(&self, long_url: &str) -> String;
}

/// Used when no shortening backend is configured.
pub struct PassthroughShortener;

#[async_trait]
impl UrlShortener for PassthroughShortener {
    async fn shorten(&self, long_url: &str) -> String {
        tracing::debug!("URL shortening not configured, using full URL");
        long_url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_url_with_location_and_campaign() {
        assert_eq!(
            review_url("https://g.page/r/example/", Some("550001"), Some("summer-promo")),
            "https://g.page/r/example/?location=550001&campaign=summer-promo"
        );
    }

    #[test]
    fn review_url_with_location_only() {
        assert_eq!(
            review_url("https://g.page/r/example", Some("550001"), None),
            "https://g.page/r/example/?location=550001"
        );
    }

    #[test]
    fn review_url_with_campaign_only() {
        assert_eq!(
            review_url("https://g.page/r/example", None, Some("spring")),
            "https://g.page/r/example/?campaign=spring"
        );
    }

    #[test]
    fn review_url_without_parameters() {
        assert_eq!(
            review_url("https://g.page/r/example", None, None),
            "https://g.page/r/example/"
        );
    }

    #[test]
    fn review_url_encodes_parameter_values() {
        assert_eq!(
            review_url("https://g.page/r/example", Some("north side"), Some("x&location=evil")),
            "https://g.page/r/example/?location=north+side&campaign=x%26location%3Devil"
        );
    }

    #[tokio::test]
    async fn passthrough_returns_input() {
        let url = "https://g.page/r/example/?location=1";
        assert_eq!(PassthroughShortener.shorten(url).await, url);
    }

    #[tokio::test]
    async fn missing_token_selects_passthrough() {
        let api = bitly::tests::stub_api(axum::routing::post(|| async {
            axum::Json(serde_json::json!({ "link": "https://bit.ly/3abcDEF" }))
        }))
        .await;

        let url = "https://g.page/r/example/";
        for token in [None, Some(""), Some("   ")] {
            let shortener = from_settings(token, &api).unwrap();
            assert_eq!(shortener.shorten(url).await, url);
        }
    }

    #[tokio::test]
    async fn token_selects_bitly() {
        let api = bitly::tests::stub_api(axum::routing::post(|| async {
            axum::Json(serde_json::json!({ "link": "https://bit.ly/3abcDEF" }))
        }))
        .await;

        let shortener = from_settings(Some("token"), &api).unwrap();
        assert_eq!(
            shortener.shorten("https://g.page/r/example/").await,
            "https://bit.ly/3abcDEF"
        );
    }
}
