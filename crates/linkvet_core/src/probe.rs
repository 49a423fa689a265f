use std::error::Error as StdError;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;

use crate::config::LinkvetConfig;
use crate::model::HealthOutcome;

/// Liveness probe seam. Probing never fails: transport problems are
/// themselves outcomes, so the driver has no error path to handle here.
pub trait UrlProbe {
    fn probe(&mut self, url: &str) -> HealthOutcome;
    fn probe_count(&self) -> usize;
}

#[derive(Debug, Clone)]
pub struct ProbeClientConfig {
    pub user_agent: String,
    pub timeout_ms: u64,
}

impl ProbeClientConfig {
    pub fn from_config(config: &LinkvetConfig) -> Self {
        Self {
            user_agent: config.probe_user_agent(),
            timeout_ms: config.timeout_ms(),
        }
    }
}

/// Best-effort liveness classifier: one HEAD request per URL, no body, no
/// retries. Transient network issues surface as `OtherFailure` and get
/// re-evaluated on the next run.
pub struct ProbeClient {
    client: Client,
    user_agent: String,
    probe_count: usize,
}

impl ProbeClient {
    pub fn new(config: ProbeClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .context("failed to build probe HTTP client")?;
        Ok(Self {
            client,
            user_agent: config.user_agent,
            probe_count: 0,
        })
    }
}

impl UrlProbe for ProbeClient {
    fn probe(&mut self, url: &str) -> HealthOutcome {
        self.probe_count += 1;
        let response = self
            .client
            .head(url)
            .header("User-Agent", self.user_agent.clone())
            .send();
        match response {
            Ok(response) => classify_status(response.status().as_u16()),
            Err(error) => classify_send_error(&error),
        }
    }

    fn probe_count(&self) -> usize {
        self.probe_count
    }
}

/// [200, 400) counts as reachable; everything else keeps its status code.
pub(crate) fn classify_status(status: u16) -> HealthOutcome {
    if (200..400).contains(&status) {
        HealthOutcome::Reachable
    } else {
        HealthOutcome::HttpFailure(status)
    }
}

fn classify_send_error(error: &reqwest::Error) -> HealthOutcome {
    // Name-resolution failures hide inside the connect error's source
    // chain; everything else (refused, timeout, TLS, malformed URL) is
    // deliberately lumped together.
    let mut source = error.source();
    while let Some(inner) = source {
        if is_dns_failure_message(&inner.to_string()) {
            return HealthOutcome::DnsFailure;
        }
        source = inner.source();
    }
    HealthOutcome::OtherFailure
}

pub(crate) fn is_dns_failure_message(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("dns error")
        || message.contains("failed to lookup address")
        || message.contains("name or service not known")
}
