//! The gateway authentication chain: source address and shared secret.

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use ipnet::IpNet;
use sha1::Sha1;
use std::net::IpAddr;
use tracing::warn;

type HmacSha1 = Hmac<Sha1>;

const SIGNATURE_HEADER: &str = "X-Hub-Signature";
const FORWARDED_HEADER: &str = "X-Forwarded-For";

/// Resolve the client address: the last entry of the forwarded chain, or
/// the socket peer when the request arrived directly.
pub fn client_addr(headers: &HeaderMap, peer: IpAddr) -> Result<IpAddr, String> {
    let Some(chain) = headers.get(FORWARDED_HEADER).and_then(|v| v.to_str().ok()) else {
        return Ok(peer);
    };

    match chain.split(',').map(str::trim).filter(|e| !e.is_empty()).last() {
        Some(entry) => entry
            .parse()
            .map_err(|_| format!("unparseable forwarded address {entry}")),
        None => Ok(peer),
    }
}

/// Check the client address against the allowed source blocks.
pub fn check_source_ip(addr: IpAddr, blocks: &[IpNet]) -> Result<(), String> {
    if blocks.iter().any(|block| block.contains(&addr)) {
        Ok(())
    } else {
        Err(format!("{addr} is not in the list of accepted source addresses"))
    }
}

/// Validate the optional signature header against the shared secret.
///
/// A missing header means the caller has no secret configured: the check
/// passes with a warning. A supplied signature must be `sha1=<hexdigest>`
/// over the raw request body and is compared in constant time.
pub fn check_secret(secret: Option<&str>, headers: &HeaderMap, body: &[u8]) -> Result<(), String> {
    let Some(header) = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) else {
        warn!("no signature header provided, skipping secret check");
        return Ok(());
    };

    let Some(secret) = secret else {
        return Err("signature supplied but no trigger secret is configured".to_string());
    };

    let (algorithm, digest) = header
        .split_once('=')
        .ok_or_else(|| "malformed signature header".to_string())?;
    if algorithm != "sha1" {
        return Err(format!("signature algorithm needs to be sha1, got {algorithm}"));
    }
    let digest =
        hex::decode(digest).map_err(|_| "signature digest is not valid hex".to_string())?;

    let mut mac = HmacSha1::new_from_slice(secret.as_bytes()).expect("HMAC can take any size key");
    mac.update(body);
    mac.verify_slice(&digest)
        .map_err(|_| "digest does not match signature".to_string())
}
