//! Blocking Selling Partner API client

use std::time::Duration;

use edi_pipeline::{OrderBatch, OrderFeed, OrderRecord, Verbosity};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::orders::parse_page;
use crate::{Error, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection and paging settings
#[derive(Debug, Clone)]
pub struct SpApiConfig {
    pub base_url: String,
    pub token_url: String,
    pub endpoint_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    /// Order field holding the identifier compared against the watermark
    pub id_field: String,
    /// Upper bound on pages followed in one fetch
    pub max_pages: usize,
    pub verbosity: Verbosity,
}

impl Default for SpApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://sellingpartnerapi-na.amazon.com".to_string(),
            token_url: "https://api.amazon.com/auth/o2/token".to_string(),
            endpoint_url: "/vendor/orders/v1/purchaseOrders".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            refresh_token: String::new(),
            id_field: "purchaseOrderNumber".to_string(),
            max_pages: 20,
            verbosity: Verbosity::Normal,
        }
    }
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    refresh_token: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Order feed over the purchase order endpoint
///
/// Credentials are passed in by the caller; they are never logged.
#[derive(Debug, Clone)]
pub struct SpApiClient {
    config: SpApiConfig,
    http: Client,
}

impl SpApiClient {
    pub fn new(config: SpApiConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| Error::Http {
                url: config.base_url.clone(),
                source,
            })?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &SpApiConfig {
        &self.config
    }

    fn orders_url(&self) -> String {
        format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.endpoint_url
        )
    }

    /// Exchange the refresh token for an access token.
    pub fn fetch_access_token(&self) -> Result<String> {
        let url = self.config.token_url.as_str();
        let request = TokenRequest {
            grant_type: "refresh_token",
            refresh_token: &self.config.refresh_token,
            client_id: &self.config.client_id,
            client_secret: &self.config.client_secret,
        };

        let response = self
            .http
            .post(url)
            .json(&request)
            .send()
            .map_err(|source| Error::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::Auth {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response.json().map_err(|e| Error::InvalidResponse {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        if self.config.verbosity.is_verbose() {
            debug!(
                token_type = token.token_type.as_deref().unwrap_or("unknown"),
                expires_in = token.expires_in.unwrap_or_default(),
                "Received access token"
            );
        }
        Ok(token.access_token)
    }

    /// Fetch every page of purchase orders, up to `max_pages`.
    ///
    /// The batch is flagged as truncated when the page limit is reached
    /// while the feed still announces a next page.
    pub fn fetch_all(&self) -> Result<OrderBatch> {
        let token = self.fetch_access_token()?;
        let url = self.orders_url();
        info!(url = %url, "Fetching purchase orders");

        let mut orders = Vec::new();
        let mut next_token: Option<String> = None;
        let mut pages = 0;
        let mut truncated = false;

        loop {
            let body = self.fetch_page(&url, &token, next_token.as_deref())?;
            pages += 1;

            if self.config.verbosity.is_verbose() {
                debug!(page = pages, body = %body, "Order response");
            }

            let page = parse_page(&body, &self.config.id_field);
            orders.extend(page.orders);
            next_token = page.next_token;

            if next_token.is_none() {
                break;
            }
            if pages >= self.config.max_pages {
                warn!(pages, "Stopped at page limit with pages left in the feed");
                truncated = true;
                break;
            }
        }

        info!(orders = orders.len(), pages, truncated, "Fetched purchase orders");
        Ok(OrderBatch { records: orders, truncated })
    }

    fn fetch_page(&self, url: &str, token: &str, next_token: Option<&str>) -> Result<Value> {
        let mut request = self
            .http
            .get(url)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(next) = next_token {
            request = request.query(&[("nextToken", next)]);
        }

        let response = request.send().map_err(|source| Error::Http {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }

        response.json().map_err(|e| Error::InvalidResponse {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

impl OrderFeed for SpApiClient {
    fn fetch_orders(&self) -> edi_pipeline::Result<Vec<OrderRecord>> {
        Ok(self.fetch_all()?.records)
    }

    fn fetch_batch(&self) -> edi_pipeline::Result<OrderBatch> {
        Ok(self.fetch_all()?)
    }
}
