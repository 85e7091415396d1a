//! Client for searching the mangadex catalogue and resolving chapter pages.
//!
//! Every operation on [MangoClient] issues a single GET (advanced search with an author
//! name issues two, one after the other), checks the status code, decodes the mangadex
//! envelope and reshapes the payload into one of the flat summaries in [requests].
//! Failures are reported through [requests::Error] and never retried.

pub mod logging;
pub mod requests;

use requests::{Error, Result};

use bon::Builder;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest_middleware::ClientWithMiddleware;
use reqwest_tracing::TracingMiddleware;
use tracing::instrument::WithSubscriber as _;

use std::future::Future;
use std::time::Duration;

/// Browser identity presented to the server. Mangadex sits behind bot detection that is
/// more forgiving towards requests that look like they come from a browser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BrowserProfile {
    #[default]
    Chrome120,
    Firefox120,
    Safari17,
    Custom(String),
}

impl BrowserProfile {
    pub fn user_agent(&self) -> &str {
        match self {
            Self::Chrome120 => "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            Self::Firefox120 => "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0",
            Self::Safari17 => "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
            Self::Custom(user_agent) => user_agent.as_str(),
        }
    }

    /// Headers sent with every request besides the user agent
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        if let Self::Chrome120 = self {
            headers.insert(
                "sec-ch-ua",
                HeaderValue::from_static(
                    "\"Not_A Brand\";v=\"8\", \"Chromium\";v=\"120\", \"Google Chrome\";v=\"120\"",
                ),
            );
            headers.insert("sec-ch-ua-mobile", HeaderValue::from_static("?0"));
            headers.insert("sec-ch-ua-platform", HeaderValue::from_static("\"Windows\""));
        }

        headers
    }
}

/// Settings for [MangoClient]. Timeouts apply to every request separately.
#[derive(Builder, Debug, Clone)]
pub struct ClientConfig {
    #[builder(into, default = MangoClient::BASE_URL.to_owned())]
    pub base_url: String,
    #[builder(into, default = MangoClient::COVER_BASE_URL.to_owned())]
    pub cover_base_url: String,
    #[builder(default)]
    pub browser: BrowserProfile,
    #[builder(default = Duration::from_secs(30))]
    pub timeout: Duration,
    #[builder(default = Duration::from_secs(10))]
    pub connect_timeout: Duration,
    /// Subscriber that receives the client's spans and events instead of the global one,
    /// see [`LogConfig::into_dispatch`](logging::LogConfig::into_dispatch)
    pub dispatch: Option<tracing::Dispatch>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Entry point of the crate. Holds configuration only: each operation opens its own
/// session and drops it before returning, so a client can be shared freely.
#[derive(Debug, Clone)]
pub struct MangoClient {
    config: ClientConfig,
}

impl MangoClient {
    pub const BASE_URL: &str = "https://api.mangadex.org";
    pub const COVER_BASE_URL: &str = "https://uploads.mangadex.org/covers";

    /// Client with the default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Fails if the configuration cannot produce an http client, e.g. on a custom user
    /// agent that is not a valid header value
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let client = Self { config };
        client
            .session()
            .map_err(|e| Error::InvalidParameter(format!("unusable client configuration: {e}")))?;

        Ok(client)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn cover_base_url(&self) -> &str {
        &self.config.cover_base_url
    }

    /// Builds the per-operation session
    pub(crate) fn session(&self) -> reqwest::Result<ClientWithMiddleware> {
        let browser = &self.config.browser;

        let client = reqwest::Client::builder()
            .user_agent(browser.user_agent())
            .default_headers(browser.headers())
            .timeout(self.config.timeout)
            .connect_timeout(self.config.connect_timeout)
            .build()?;

        Ok(reqwest_middleware::ClientBuilder::new(client)
            .with(TracingMiddleware::default())
            .build())
    }

    /// Runs `fut` under the configured dispatcher, if any
    pub(crate) async fn traced<F: Future>(&self, fut: F) -> F::Output {
        match &self.config.dispatch {
            Some(dispatch) => fut.with_subscriber(dispatch.clone()).await,
            None => fut.await,
        }
    }
}
