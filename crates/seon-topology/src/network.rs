//! Network topology planning.
//!
//! One [`NetworkPlan`] per environment: the address block, the AZ-indexed
//! subnet carve-up, and the cluster identity everything downstream hangs
//! off. The carve is a fixed-mask split (/24 per subnet, public block
//! first, then private), so the same input always yields the same layout.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

use seon_core::config::NetworkConfig;
use seon_core::error::ConfigError;
use seon_core::plan::SubnetTier;

/// Fixed prefix length for carved subnets.
const SUBNET_PREFIX: u8 = 24;

/// Availability zones the provisioning backend declares available.
///
/// Injected from outside the resolver; resolution never probes the
/// environment. Zone strings are opaque and used verbatim in subnet names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCapabilities {
    pub available_azs: Vec<String>,
}

impl Default for ProviderCapabilities {
    fn default() -> Self {
        Self {
            available_azs: vec![
                "use1-az1".to_string(),
                "use1-az2".to_string(),
                "use1-az3".to_string(),
            ],
        }
    }
}

/// A parsed IPv4 CIDR block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CidrBlock {
    addr: Ipv4Addr,
    prefix: u8,
}

impl CidrBlock {
    /// Parse `a.b.c.d/n` notation. The address is normalized to the
    /// network address (host bits cleared).
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidCidr {
            cidr: s.to_string(),
            reason: reason.to_string(),
        };

        let (addr_part, prefix_part) = s
            .split_once('/')
            .ok_or_else(|| invalid("expected 'a.b.c.d/n' notation"))?;
        let addr: Ipv4Addr = addr_part
            .parse()
            .map_err(|_| invalid("malformed IPv4 address"))?;
        let prefix: u8 = prefix_part
            .parse()
            .map_err(|_| invalid("malformed prefix length"))?;
        if prefix > 32 {
            return Err(invalid("prefix length exceeds 32"));
        }

        let mask = if prefix == 0 {
            0
        } else {
            u32::MAX << (32 - prefix)
        };
        Ok(Self {
            addr: Ipv4Addr::from(u32::from(addr) & mask),
            prefix,
        })
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Number of `new_prefix`-sized blocks this block can hold.
    pub fn capacity(&self, new_prefix: u8) -> u32 {
        if new_prefix < self.prefix || new_prefix > 32 {
            return 0;
        }
        1u32 << (new_prefix - self.prefix).min(31)
    }

    /// Carve the `index`-th `new_prefix`-sized block out of this one.
    pub fn subnet(&self, index: u32, new_prefix: u8) -> Option<CidrBlock> {
        if index >= self.capacity(new_prefix) {
            return None;
        }
        let block_size = 1u32 << (32 - new_prefix);
        let base = u32::from(self.addr) + index * block_size;
        Some(CidrBlock {
            addr: Ipv4Addr::from(base),
            prefix: new_prefix,
        })
    }
}

impl fmt::Display for CidrBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}

/// One carved subnet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetSpec {
    pub name: String,
    pub tier: SubnetTier,
    pub availability_zone: String,
    pub cidr: String,
}

/// The shared network topology for one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkPlan {
    pub cidr: String,
    pub availability_zones: Vec<String>,
    pub subnets: Vec<SubnetSpec>,
    pub nat_gateways: usize,
    pub cluster_name: String,
}

impl NetworkPlan {
    /// Compute the network topology for one environment.
    ///
    /// Zones are taken from the provider capabilities in declared order.
    /// NAT gateways are zone-bound, so requesting more gateways than
    /// zones is an AZ shortage.
    pub fn resolve(
        project: &str,
        env_name: &str,
        config: &NetworkConfig,
        capabilities: &ProviderCapabilities,
    ) -> Result<Self, ConfigError> {
        let cidr = CidrBlock::parse(&config.cidr)?;
        if cidr.prefix() > SUBNET_PREFIX {
            return Err(ConfigError::InvalidCidr {
                cidr: config.cidr.clone(),
                reason: format!("prefix /{} cannot hold /{SUBNET_PREFIX} subnets", cidr.prefix()),
            });
        }

        if config.az_count > capabilities.available_azs.len() {
            return Err(ConfigError::InsufficientAzs {
                requested: config.az_count,
                available: capabilities.available_azs.len(),
            });
        }
        if config.nat_gateways > config.az_count {
            return Err(ConfigError::InsufficientAzs {
                requested: config.nat_gateways,
                available: config.az_count,
            });
        }

        let zones = capabilities.available_azs[..config.az_count].to_vec();

        let required = 2 * config.az_count as u32;
        if u64::from(required) > u64::from(cidr.capacity(SUBNET_PREFIX)) {
            return Err(ConfigError::InvalidCidr {
                cidr: config.cidr.clone(),
                reason: format!(
                    "cannot fit {required} /{SUBNET_PREFIX} subnets ({} available)",
                    cidr.capacity(SUBNET_PREFIX)
                ),
            });
        }

        // Public block first, then private, each AZ-indexed.
        let mut subnets = Vec::with_capacity(zones.len() * 2);
        for (i, zone) in zones.iter().enumerate() {
            let carved = cidr
                .subnet(i as u32, SUBNET_PREFIX)
                .expect("capacity checked above");
            subnets.push(SubnetSpec {
                name: format!("public-{zone}"),
                tier: SubnetTier::Public,
                availability_zone: zone.clone(),
                cidr: carved.to_string(),
            });
        }
        for (i, zone) in zones.iter().enumerate() {
            let carved = cidr
                .subnet((zones.len() + i) as u32, SUBNET_PREFIX)
                .expect("capacity checked above");
            subnets.push(SubnetSpec {
                name: format!("private-{zone}"),
                tier: SubnetTier::Private,
                availability_zone: zone.clone(),
                cidr: carved.to_string(),
            });
        }

        Ok(Self {
            cidr: cidr.to_string(),
            availability_zones: zones,
            subnets,
            nat_gateways: config.nat_gateways,
            cluster_name: format!("{project}-{env_name}"),
        })
    }
}
