use crate::mac::{self, HardwareAddress};
use crate::wol::{BROADCAST_ADDR, DEFAULT_PORT};
use log::debug;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::str::FromStr;

const MAX_LABEL_LEN: usize = 63;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Could not read inventory: {0}")]
    Io(#[from] io::Error),
    #[error("Could not parse inventory: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Proxy {0}: enter a valid IP address or hostname")]
    BadProxyAddress(String),
    #[error("Proxy {0}: port number must be between 1 and 65535")]
    BadPort(String),
    #[error("Proxy {0}: at least one subnet is required")]
    NoSubnets(String),
    #[error("Invalid subnet format: {0}. Use CIDR notation (e.g., 192.168.1.0/24)")]
    BadSubnet(String),
    #[error("A proxy with address {0} and port {1} already exists")]
    DuplicateProxy(String, u16),
    #[error("Machine {0}: {1}")]
    BadMachineAddress(String, mac::Error),
    #[error("No machine with id {0}")]
    UnknownMachine(u32),
    #[error("No proxy with id {0}")]
    UnknownProxy(u32),
}

/// An IPv4 network in CIDR notation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Subnet {
    network: Ipv4Addr,
    prefix_len: u8,
}

impl Subnet {
    fn mask(&self) -> u32 {
        match self.prefix_len {
            0 => 0,
            n => u32::MAX << (32 - n),
        }
    }

    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        u32::from(ip) & self.mask() == u32::from(self.network) & self.mask()
    }

    /// Directed broadcast address of the subnet.
    pub fn broadcast(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.network) | !self.mask())
    }
}

impl FromStr for Subnet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || Error::BadSubnet(s.to_string());
        let (network, prefix_len) = s.trim().split_once('/').ok_or_else(bad)?;
        let network: Ipv4Addr = network.parse().map_err(|_| bad())?;
        let prefix_len: u8 = prefix_len.parse().map_err(|_| bad())?;
        if prefix_len > 32 {
            return Err(bad());
        }
        Ok(Self {
            network,
            prefix_len,
        })
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

impl Serialize for Subnet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Subnet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Accepts either a JSON list of CIDR strings or one comma-separated string.
fn deserialize_subnets<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<Subnet>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Subnets {
        List(Vec<Subnet>),
        Text(String),
    }
    match Subnets::deserialize(deserializer)? {
        Subnets::List(list) => Ok(list),
        Subnets::Text(text) => text
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<Subnet>().map_err(serde::de::Error::custom))
            .collect(),
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_active() -> bool {
    true
}

/// A machine that relays wake requests onto the subnets it manages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProxyTarget {
    pub id: u32,
    pub name: String,
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default, deserialize_with = "deserialize_subnets")]
    pub subnets: Vec<Subnet>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl ProxyTarget {
    pub fn manages(&self, ip: Ipv4Addr) -> bool {
        self.subnets.iter().any(|s| s.contains(ip))
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !is_valid_proxy_address(&self.address) {
            return Err(Error::BadProxyAddress(self.name.clone()));
        }
        if self.port == 0 {
            return Err(Error::BadPort(self.name.clone()));
        }
        if self.subnets.is_empty() {
            return Err(Error::NoSubnets(self.name.clone()));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    pub id: u32,
    pub name: String,
    pub mac_address: String,
    #[serde(default)]
    pub ip_address: Option<Ipv4Addr>,
}

impl Machine {
    pub fn hardware_address(&self) -> Result<HardwareAddress, Error> {
        self.mac_address
            .parse()
            .map_err(|e| Error::BadMachineAddress(self.name.clone(), e))
    }
}

/// Where a wake request for a machine should be sent.
#[derive(Clone, Debug, PartialEq)]
pub enum Route<'a> {
    Proxy(&'a ProxyTarget),
    Direct(Ipv4Addr),
}

impl Route<'_> {
    pub fn destination(&self) -> (String, u16) {
        match self {
            Route::Proxy(proxy) => (proxy.address.clone(), proxy.port),
            Route::Direct(addr) => (addr.to_string(), DEFAULT_PORT),
        }
    }
}

impl fmt::Display for Route<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Route::Proxy(proxy) => write!(
                f,
                "proxy {} ({}:{})",
                proxy.name, proxy.address, proxy.port
            ),
            Route::Direct(addr) => write!(f, "broadcast {}:{}", addr, DEFAULT_PORT),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub proxies: Vec<ProxyTarget>,
    #[serde(default)]
    pub machines: Vec<Machine>,
}

impl Inventory {
    pub fn from_reader(reader: impl Read) -> Result<Self, Error> {
        let inventory: Self = serde_json::from_reader(reader)?;
        inventory.validate()?;
        Ok(inventory)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        debug!("loading inventory from {}", path.as_ref().display());
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    /// Checks every proxy record and rejects duplicate address and port pairs.
    pub fn validate(&self) -> Result<(), Error> {
        let mut seen = HashSet::new();
        for proxy in &self.proxies {
            proxy.validate()?;
            if !seen.insert((proxy.address.to_ascii_lowercase(), proxy.port)) {
                return Err(Error::DuplicateProxy(proxy.address.clone(), proxy.port));
            }
        }
        for machine in &self.machines {
            machine.hardware_address()?;
        }
        Ok(())
    }

    pub fn machine(&self, id: u32) -> Result<&Machine, Error> {
        self.machines
            .iter()
            .find(|m| m.id == id)
            .ok_or(Error::UnknownMachine(id))
    }

    pub fn proxy(&self, id: u32) -> Result<&ProxyTarget, Error> {
        self.proxies
            .iter()
            .find(|p| p.id == id)
            .ok_or(Error::UnknownProxy(id))
    }

    /// Picks the first active proxy whose subnets hold the machine's address,
    /// falling back to the limited broadcast address.
    pub fn route(&self, machine: &Machine) -> Route<'_> {
        machine
            .ip_address
            .and_then(|ip| self.proxies.iter().find(|p| p.is_active && p.manages(ip)))
            .map(Route::Proxy)
            .unwrap_or(Route::Direct(BROADCAST_ADDR))
    }
}

fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= MAX_LABEL_LEN
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !label.starts_with('-')
        && !label.ends_with('-')
}

/// An IPv4 literal or a DNS hostname.
pub fn is_valid_proxy_address(address: &str) -> bool {
    match address.parse::<IpAddr>() {
        Ok(IpAddr::V4(_)) => true,
        Ok(IpAddr::V6(_)) => false,
        Err(_) => !address.is_empty() && address.split('.').all(is_valid_label),
    }
}
