//! Public IP discovery for the runner.

use std::net::Ipv4Addr;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

/// Discovers the public IPv4 address the runner egresses from
#[async_trait]
pub trait IpLookup: Send + Sync {
    async fn public_ip(&self) -> Result<Ipv4Addr>;
}

/// Looks the address up over HTTP from a plain-text echo endpoint
pub struct HttpIpLookup {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpIpLookup {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }
}

#[async_trait]
impl IpLookup for HttpIpLookup {
    async fn public_ip(&self) -> Result<Ipv4Addr> {
        let body = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.endpoint))?
            .error_for_status()
            .with_context(|| format!("{} returned an error status", self.endpoint))?
            .text()
            .await
            .context("Failed to read public IP response")?;

        parse_ip(&body)
    }
}

/// Parse an echo endpoint response body
pub fn parse_ip(body: &str) -> Result<Ipv4Addr> {
    body.trim()
        .parse()
        .with_context(|| format!("Not an IPv4 address: '{}'", body.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ip() {
        assert_eq!(parse_ip("203.0.113.9\n").unwrap(), Ipv4Addr::new(203, 0, 113, 9));
        assert!(parse_ip("<html>").is_err());
    }
}
