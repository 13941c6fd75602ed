//! HTTP implementation of the community web endpoint.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::domain::{AppId, SteamId};
use crate::error::{Error, Result};

use super::traits::WebClient;

const DEFAULT_COMMUNITY_URL: &str = "https://steamcommunity.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Community web client backed by `reqwest` with a shared cookie store.
pub struct SteamWebClient {
    http: reqwest::Client,
    community_url: String,
    api_key: Option<String>,
    session: RwLock<Option<SteamId>>,
}

impl SteamWebClient {
    /// Creates a client against the default community host.
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_community_url(DEFAULT_COMMUNITY_URL, api_key)
    }

    /// Creates a client against a custom community host (used by tests).
    pub fn with_community_url(url: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            community_url: url.into(),
            api_key,
            session: RwLock::new(None),
        })
    }

    /// The configured web API key, if any.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    fn profile_url(&self, steam_id: SteamId) -> String {
        format!("{}/profiles/{}", self.community_url, steam_id)
    }

    fn session_id(&self) -> Result<SteamId> {
        (*self.session.read()).ok_or(Error::WebSessionMissing)
    }

    async fn fetch(&self, url: &str) -> Result<Option<String>> {
        debug!(url, "fetching community page");
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            warn!(url, status = %response.status(), "community page fetch rejected");
            return Ok(None);
        }
        let body = response.text().await?;
        if body.is_empty() {
            return Ok(None);
        }
        Ok(Some(body))
    }
}

#[async_trait]
impl WebClient for SteamWebClient {
    async fn init_session(&self, steam_id: SteamId, parental_pin: &str) -> Result<()> {
        if parental_pin != "0" {
            // Unlock parental restrictions for the cookie store.
            let url = format!("{}/parental/ajaxunlock", self.community_url);
            let response = self
                .http
                .post(&url)
                .form(&[("pin", parental_pin)])
                .send()
                .await?;
            if !response.status().is_success() {
                warn!(status = %response.status(), "parental unlock rejected");
            }
        }
        *self.session.write() = Some(steam_id);
        debug!(steam_id = %steam_id, "web session initialized");
        Ok(())
    }

    async fn badge_page(&self, page: u32) -> Result<Option<String>> {
        let steam_id = self.session_id()?;
        let url = format!("{}/badges?p={}", self.profile_url(steam_id), page);
        self.fetch(&url).await
    }

    async fn game_cards_page(&self, app_id: AppId) -> Result<Option<String>> {
        let steam_id = self.session_id()?;
        let url = format!("{}/gamecards/{}", self.profile_url(steam_id), app_id);
        self.fetch(&url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_url_uses_session_id() {
        let client = SteamWebClient::with_community_url("https://example.test", None).unwrap();
        let url = client.profile_url(SteamId::new(76561198000000001));
        assert_eq!(url, "https://example.test/profiles/76561198000000001");
    }

    #[tokio::test]
    async fn pages_require_session() {
        let client = SteamWebClient::with_community_url("https://example.test", None).unwrap();
        assert!(matches!(
            client.badge_page(1).await,
            Err(Error::WebSessionMissing)
        ));
        assert!(matches!(
            client.game_cards_page(AppId::new(440)).await,
            Err(Error::WebSessionMissing)
        ));
    }

    #[test]
    fn api_key_round_trips() {
        let client =
            SteamWebClient::with_community_url("https://example.test", Some("key".into())).unwrap();
        assert_eq!(client.api_key(), Some("key"));
    }
}
