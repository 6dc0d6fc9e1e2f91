//! Forward and reverse DNS, thin wrappers over hickory.

use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use std::net::IpAddr;
use tracing::{debug, warn};
use troute_core::{IpFamily, ReverseResolver, TrouteError};

/// Resolves `host` to the addresses of the requested family.
///
/// A lookup failure is fatal; a successful lookup with no address of the
/// requested family is not and returns an empty list.
pub async fn resolve_host(host: &str, family: IpFamily) -> Result<Vec<IpAddr>, TrouteError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(if family.matches(ip) { vec![ip] } else { Vec::new() });
    }

    let resolver =
        TokioAsyncResolver::tokio_from_system_conf().map_err(|e| TrouteError::ResolutionFailed {
            hostname: host.to_string(),
            source: Box::new(e),
        })?;

    let lookup = resolver
        .lookup_ip(host)
        .await
        .map_err(|e| TrouteError::ResolutionFailed {
            hostname: host.to_string(),
            source: Box::new(e),
        })?;

    let addresses: Vec<IpAddr> = lookup.iter().filter(|ip| family.matches(*ip)).collect();
    debug!(host, %family, count = addresses.len(), "resolved destination");

    Ok(addresses)
}

/// Best-effort address-to-hostname lookup. Any failure, including a missing
/// system resolver configuration, falls back to the address literal.
pub struct DnsReverseResolver {
    resolver: Option<TokioAsyncResolver>,
}

impl DnsReverseResolver {
    pub fn new() -> Self {
        let resolver = match TokioAsyncResolver::tokio_from_system_conf() {
            Ok(resolver) => Some(resolver),
            Err(e) => {
                warn!(error = %e, "system resolver unavailable, reverse lookups disabled");
                None
            }
        };
        Self { resolver }
    }
}

impl Default for DnsReverseResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReverseResolver for DnsReverseResolver {
    async fn resolve(&self, addr: IpAddr) -> String {
        let Some(resolver) = &self.resolver else {
            return addr.to_string();
        };

        match resolver.reverse_lookup(addr).await {
            Ok(names) => names
                .iter()
                .next()
                .map(|name| name.to_string().trim_end_matches('.').to_string())
                .unwrap_or_else(|| addr.to_string()),
            Err(_) => addr.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_literal_address_skips_lookup() {
        let addresses = resolve_host("192.0.2.7", IpFamily::V4).await.unwrap();
        assert_eq!(addresses, vec!["192.0.2.7".parse::<IpAddr>().unwrap()]);
    }

    #[tokio::test]
    async fn test_literal_address_of_wrong_family_is_empty() {
        let addresses = resolve_host("192.0.2.7", IpFamily::V6).await.unwrap();
        assert!(addresses.is_empty());

        let addresses = resolve_host("2001:db8::1", IpFamily::V4).await.unwrap();
        assert!(addresses.is_empty());
    }
}
