//! Download URL policy
//!
//! Asset URLs come from the browser, so before anything is fetched the host
//! is checked against the configured allowlist and, unless private networks
//! are explicitly allowed, rejected when it names or resolves to a loopback,
//! private or otherwise internal address.

use reqwest::Url;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tokio::net::lookup_host;

#[derive(Debug, Clone, Default)]
pub struct UrlPolicy {
    /// Allowed hosts, subdomains included; `None` allows any host
    pub allowed_hosts: Option<Vec<String>>,
    pub allow_private_ips: bool,
}

impl UrlPolicy {
    pub fn new(allowed_hosts: Option<Vec<String>>, allow_private_ips: bool) -> Self {
        Self {
            allowed_hosts,
            allow_private_ips,
        }
    }

    /// Any host, private networks included
    pub fn permissive() -> Self {
        Self::new(None, true)
    }

    /// Full check: host rules, then every address the host resolves to.
    pub async fn check(&self, url: &Url) -> Result<(), String> {
        self.check_host(url)?;

        if self.allow_private_ips {
            return Ok(());
        }

        let Some(host) = host_of(url) else {
            return Ok(());
        };
        if host.parse::<IpAddr>().is_ok() {
            return Ok(());
        }
        let port = url.port_or_known_default().unwrap_or(80);
        match lookup_host((host.as_str(), port)).await {
            Ok(addrs) => {
                for addr in addrs {
                    if is_private_ip(&addr.ip()) {
                        return Err(format!(
                            "Hostname resolves to private/internal IP address: {}",
                            addr.ip()
                        ));
                    }
                }
            }
            Err(e) => {
                // the request itself reports the failure
                tracing::warn!(host = %host, error = %e, "Failed to resolve download host");
            }
        }
        Ok(())
    }

    /// Checks that need no DNS lookup. Also applied to every redirect hop.
    pub fn check_host(&self, url: &Url) -> Result<(), String> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err("URL must start with http:// or https://".to_string());
        }

        let name = host_of(url).ok_or_else(|| "URL must have a host".to_string())?;

        if let Some(allowed) = &self.allowed_hosts {
            let is_allowed = allowed.iter().any(|domain| {
                let domain = domain.to_lowercase();
                name == domain || name.ends_with(&format!(".{}", domain))
            });
            if !is_allowed {
                return Err(format!(
                    "URL hostname '{}' is not in the allowed list. Allowed domains: {}",
                    name,
                    allowed.join(", ")
                ));
            }
        }

        if self.allow_private_ips {
            return Ok(());
        }

        match name.parse::<IpAddr>() {
            Ok(ip) if is_private_ip(&ip) => {
                Err("Private/internal IP addresses are not allowed".to_string())
            }
            Ok(_) => Ok(()),
            Err(_) if is_internal_hostname(&name) => {
                Err("Localhost and internal hostnames are not allowed".to_string())
            }
            Err(_) => Ok(()),
        }
    }
}

/// Lowercased host, IPv6 literals without their brackets
fn host_of(url: &Url) -> Option<String> {
    let host = url.host_str().filter(|h| !h.is_empty())?;
    Some(
        host.trim_start_matches('[')
            .trim_end_matches(']')
            .to_lowercase(),
    )
}

fn is_internal_hostname(host: &str) -> bool {
    host == "localhost"
        || host.ends_with(".localhost")
        || host.ends_with(".local")
        || host.ends_with(".internal")
        || host.contains(".internal.")
        || host.ends_with(".corp")
        || !host.contains('.')
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => is_private_ipv4(ipv4),
        IpAddr::V6(ipv6) => {
            if let Some(mapped) = ipv6.to_ipv4_mapped() {
                return is_private_ipv4(&mapped);
            }
            ipv6.is_loopback()
                || ipv6.is_unspecified()
                || ipv6.is_multicast()
                || is_ipv6_link_local(ipv6)
                || is_ipv6_unique_local(ipv6)
        }
    }
}

fn is_private_ipv4(ip: &Ipv4Addr) -> bool {
    let octets = ip.octets();
    octets[0] == 10
        || (octets[0] == 172 && (16..=31).contains(&octets[1]))
        || (octets[0] == 192 && octets[1] == 168)
        || octets[0] == 127
        || (octets[0] == 169 && octets[1] == 254)
        || (octets[0] == 100 && (64..=127).contains(&octets[1])) // carrier-grade NAT
        || (224..=239).contains(&octets[0])
        || octets[0] == 0
        || ip.is_broadcast()
}

/// fe80::/10
fn is_ipv6_link_local(ip: &Ipv6Addr) -> bool {
    ip.segments()[0] & 0xffc0 == 0xfe80
}

/// fc00::/7
fn is_ipv6_unique_local(ip: &Ipv6Addr) -> bool {
    ip.segments()[0] & 0xfe00 == 0xfc00
}
