//! Published webhook source ranges for each provider.

use crate::providers::Provider;
use fastci_config::GatewayConfig;
use ipnet::IpNet;
use serde::Deserialize;
use std::net::IpAddr;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct GitHubMeta {
    hooks: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AtlassianRanges {
    items: Vec<AtlassianItem>,
}

#[derive(Debug, Deserialize)]
struct AtlassianItem {
    cidr: String,
}

/// Fetch the CIDR blocks a provider delivers webhooks from.
///
/// An unreachable or malformed endpoint is an error: a source address
/// that cannot be verified is rejected, not waved through.
pub async fn fetch_hook_blocks(
    client: &reqwest::Client,
    provider: Provider,
    config: &GatewayConfig,
) -> Result<Vec<IpNet>, String> {
    let cidrs = match provider {
        Provider::Github => fetch_github(client, &config.github_meta_url).await,
        Provider::Bitbucket => fetch_bitbucket(client, &config.bitbucket_ranges_url).await,
    }
    .map_err(|e| format!("could not determine the acceptable {provider} source ranges: {e}"))?;

    Ok(parse_blocks(cidrs))
}

async fn fetch_github(client: &reqwest::Client, url: &str) -> Result<Vec<String>, reqwest::Error> {
    let meta: GitHubMeta = client.get(url).send().await?.json().await?;
    Ok(meta.hooks)
}

async fn fetch_bitbucket(
    client: &reqwest::Client,
    url: &str,
) -> Result<Vec<String>, reqwest::Error> {
    let ranges: AtlassianRanges = client.get(url).send().await?.json().await?;
    Ok(ranges.items.into_iter().map(|item| item.cidr).collect())
}

/// Parse the published entries, accepting both CIDR blocks and bare
/// addresses; unparseable entries are dropped with a warning.
fn parse_blocks(cidrs: Vec<String>) -> Vec<IpNet> {
    cidrs
        .into_iter()
        .filter_map(|cidr| {
            let parsed = cidr
                .parse::<IpNet>()
                .ok()
                .or_else(|| cidr.parse::<IpAddr>().map(IpNet::from).ok());
            if parsed.is_none() {
                warn!(%cidr, "skipping unparseable published range");
            }
            parsed
        })
        .collect()
}
