use std::thread::sleep;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde_json::json;

use crate::config::{LinkvetConfig, env_value_u64};
use crate::model::BookmarkPage;

/// Paginated read access to the bookmark repository.
pub trait BookmarkReadApi {
    /// Fetch one page of the listing. `None` starts from the beginning;
    /// otherwise `cursor` is the `next` URL from the previous page, followed
    /// verbatim.
    fn fetch_page(&mut self, cursor: Option<&str>) -> Result<BookmarkPage>;
    fn request_count(&self) -> usize;
}

/// Partial update of one bookmark's tag set.
pub trait BookmarkWriteApi: BookmarkReadApi {
    fn update_tags(&mut self, bookmark_id: i64, tags: &[String]) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct LinkdingClientConfig {
    pub api_url: String,
    pub token: String,
    pub page_size: usize,
    pub timeout_ms: u64,
    pub rate_limit_read_ms: u64,
    pub rate_limit_write_ms: u64,
}

impl LinkdingClientConfig {
    /// Resolve the client configuration, env-first over the config file.
    /// Both credentials are required before any network call is made.
    pub fn from_config(config: &LinkvetConfig) -> Result<Self> {
        let Some(api_url) = config.api_url() else {
            bail!(
                "API_URL is not set; export it or set url under [repository] in the config file"
            );
        };
        let Some(token) = config.api_token() else {
            bail!(
                "API_TOKEN is not set; export it or set token under [repository] in the config file"
            );
        };
        Ok(Self {
            api_url,
            token,
            page_size: config.page_size(),
            timeout_ms: config.timeout_ms(),
            rate_limit_read_ms: env_value_u64("LINKVET_RATE_LIMIT_READ", 0),
            rate_limit_write_ms: env_value_u64("LINKVET_RATE_LIMIT_WRITE", 0),
        })
    }
}

pub struct LinkdingClient {
    client: Client,
    config: LinkdingClientConfig,
    last_request_at: Option<Instant>,
    request_count: usize,
}

impl LinkdingClient {
    pub fn new(config: LinkdingClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .context("failed to build repository HTTP client")?;
        Ok(Self {
            client,
            config,
            last_request_at: None,
            request_count: 0,
        })
    }

    pub fn from_config(config: &LinkvetConfig) -> Result<Self> {
        Self::new(LinkdingClientConfig::from_config(config)?)
    }

    fn apply_rate_limit(&mut self, is_write: bool) {
        let delay = if is_write {
            Duration::from_millis(self.config.rate_limit_write_ms)
        } else {
            Duration::from_millis(self.config.rate_limit_read_ms)
        };
        if !delay.is_zero()
            && let Some(last) = self.last_request_at
        {
            let elapsed = last.elapsed();
            if elapsed < delay {
                sleep(delay - elapsed);
            }
        }
        self.last_request_at = Some(Instant::now());
        self.request_count += 1;
    }

    fn auth_header(&self) -> String {
        format!("Token {}", self.config.token)
    }
}

impl BookmarkReadApi for LinkdingClient {
    fn fetch_page(&mut self, cursor: Option<&str>) -> Result<BookmarkPage> {
        let url = match cursor {
            Some(cursor) => cursor.to_string(),
            None => listing_url(&self.config.api_url, self.config.page_size),
        };

        self.apply_rate_limit(false);
        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .with_context(|| format!("failed to fetch bookmarks from {url}"))?;

        let status = response.status();
        if !status.is_success() {
            bail!("bookmark listing request failed with HTTP {status}");
        }

        response
            .json()
            .context("failed to decode bookmark listing response")
    }

    fn request_count(&self) -> usize {
        self.request_count
    }
}

impl BookmarkWriteApi for LinkdingClient {
    fn update_tags(&mut self, bookmark_id: i64, tags: &[String]) -> Result<()> {
        let url = bookmark_url(&self.config.api_url, bookmark_id);

        self.apply_rate_limit(true);
        let response = self
            .client
            .patch(&url)
            .header("Authorization", self.auth_header())
            .json(&json!({ "tag_names": tags }))
            .send()
            .with_context(|| format!("failed to send tag update for bookmark {bookmark_id}"))?;

        // The repository answers a successful partial update with 200
        // exactly; anything else carries its body as diagnostic text.
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().unwrap_or_default();
            bail!("failed to update bookmark {bookmark_id} with status {status}: {body}");
        }
        Ok(())
    }
}

fn listing_url(api_url: &str, page_size: usize) -> String {
    format!("{}/?limit={page_size}", api_url.trim_end_matches('/'))
}

fn bookmark_url(api_url: &str, bookmark_id: i64) -> String {
    format!("{}/{bookmark_id}/", api_url.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::{bookmark_url, listing_url};

    #[test]
    fn listing_url_appends_limit_once() {
        assert_eq!(
            listing_url("https://links.example.org/api/bookmarks", 100),
            "https://links.example.org/api/bookmarks/?limit=100"
        );
        assert_eq!(
            listing_url("https://links.example.org/api/bookmarks/", 25),
            "https://links.example.org/api/bookmarks/?limit=25"
        );
    }

    #[test]
    fn bookmark_url_targets_one_resource() {
        assert_eq!(
            bookmark_url("https://links.example.org/api/bookmarks", 42),
            "https://links.example.org/api/bookmarks/42/"
        );
        assert_eq!(
            bookmark_url("https://links.example.org/api/bookmarks/", 42),
            "https://links.example.org/api/bookmarks/42/"
        );
    }
}
