//! IPv4 CIDR blocks for network ranges and ingress peers.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::error::{Error, Result};

/// An IPv4 address with a prefix length, e.g. `203.0.113.5/32`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Cidr {
    addr: Ipv4Addr,
    prefix: u8,
}

impl Ipv4Cidr {
    pub fn new(addr: Ipv4Addr, prefix: u8) -> Result<Self> {
        if prefix > 32 {
            return Err(Error::invalid_source(
                format!("{}/{}", addr, prefix),
                "prefix length must be between 0 and 32",
            ));
        }
        Ok(Self { addr, prefix })
    }

    pub fn addr(&self) -> Ipv4Addr {
        self.addr
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    fn mask(prefix: u8) -> u32 {
        if prefix == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(prefix))
        }
    }

    /// The block with host bits cleared
    pub fn network(&self) -> Self {
        Self {
            addr: Ipv4Addr::from(u32::from(self.addr) & Self::mask(self.prefix)),
            prefix: self.prefix,
        }
    }

    /// The `index`-th subnet of size `/new_prefix` inside this block.
    ///
    /// Returns `None` when `new_prefix` is shorter than this block's prefix or
    /// the index runs past the end of the block.
    pub fn subnet(&self, new_prefix: u8, index: u32) -> Option<Self> {
        if new_prefix < self.prefix || new_prefix > 32 {
            return None;
        }
        let bits = u32::from(new_prefix - self.prefix);
        if bits < 32 && u64::from(index) >= (1u64 << bits) {
            return None;
        }
        let step = if new_prefix == 0 {
            0
        } else {
            1u64 << (32 - u32::from(new_prefix))
        };
        let base = u64::from(u32::from(self.network().addr));
        let start = base + u64::from(index) * step;
        let start = u32::try_from(start).ok()?;
        Some(Self {
            addr: Ipv4Addr::from(start),
            prefix: new_prefix,
        })
    }
}

impl FromStr for Ipv4Cidr {
    type Err = Error;

    /// Parses `a.b.c.d/n`. A bare address is rejected with a hint pointing at
    /// the single-host form.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let Some((addr, prefix)) = trimmed.split_once('/') else {
            return Err(match trimmed.parse::<Ipv4Addr>() {
                Ok(_) => Error::invalid_source(
                    s,
                    format!("CIDR mask is missing. Did you mean {}/32?", trimmed),
                ),
                Err(_) => Error::invalid_source(s, "not an IPv4 address or CIDR block"),
            });
        };
        let addr = addr
            .parse::<Ipv4Addr>()
            .map_err(|_| Error::invalid_source(s, "not an IPv4 address"))?;
        let prefix = prefix
            .parse::<u8>()
            .map_err(|_| Error::invalid_source(s, "prefix length is not a number"))?;
        Self::new(addr, prefix).map_err(|_| {
            Error::invalid_source(s, "prefix length must be between 0 and 32")
        })
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}
