//! IP allow-lists

use ipnet::IpNet;
use std::net::IpAddr;

#[derive(Debug, Clone, PartialEq)]
enum AllowEntry {
    Exact(String),
    Network(IpNet),
}

/// Comma-separated list of literal IPs and CIDR blocks
///
/// An empty list allows every address.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IpAllowList {
    entries: Vec<AllowEntry>,
}

impl IpAllowList {
    pub fn parse(list: &str) -> Self {
        let entries = list
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                if entry.contains('/') {
                    match entry.parse::<IpNet>() {
                        Ok(network) => AllowEntry::Network(network),
                        Err(_) => AllowEntry::Exact(entry.to_string()),
                    }
                } else {
                    AllowEntry::Exact(entry.to_string())
                }
            })
            .collect();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether `ip` matches any entry
    pub fn allows(&self, ip: &str) -> bool {
        if self.entries.is_empty() {
            return true;
        }
        let parsed = ip.trim().parse::<IpAddr>().ok();

        self.entries.iter().any(|entry| match entry {
            AllowEntry::Exact(allowed) => {
                allowed == ip || parsed.is_some_and(|addr| allowed.parse::<IpAddr>() == Ok(addr))
            }
            AllowEntry::Network(network) => parsed.is_some_and(|addr| network.contains(&addr)),
        })
    }
}
