//! Core data structures of the allocator.

use std::fmt;
use std::str::FromStr;

use ipnet::IpNet;
use parking_lot::Mutex;

use crate::errors::Error;
use crate::index::PrefixIndex;

/// Address family of a prefix. The two families never mix: each owns its
/// own pair of pool and allocation indexes inside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    /// Family of a parsed prefix.
    pub fn of(net: &IpNet) -> Family {
        match net {
            IpNet::V4(_) => Family::V4,
            IpNet::V6(_) => Family::V6,
        }
    }

    /// Address width in bits.
    pub fn width(self) -> u8 {
        match self {
            Family::V4 => 32,
            Family::V6 => 128,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::V4 => f.write_str("ipv4"),
            Family::V6 => f.write_str("ipv6"),
        }
    }
}

impl FromStr for Family {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ipv4" => Ok(Family::V4),
            "ipv6" => Ok(Family::V6),
            other => Err(Error::Parse {
                text: other.to_string(),
                reason: "must be one of ipv4 or ipv6".to_string(),
            }),
        }
    }
}

/// The allocator engine: pool and allocation indexes, one pair per family.
/// Not synchronized on its own; [`SyncCalculator`] is the thread-safe
/// facade hosts are expected to hold.
#[derive(Debug, Clone)]
pub struct Calculator {
    pub(crate) pools_v4: PrefixIndex,
    pub(crate) allocations_v4: PrefixIndex,
    pub(crate) pools_v6: PrefixIndex,
    pub(crate) allocations_v6: PrefixIndex,
}

/// Thread-safe facade over [`Calculator`]. Every operation holds the one
/// mutex for its full duration, so an allocation made by one call is
/// visible to the next.
#[derive(Debug)]
pub struct SyncCalculator {
    pub(crate) inner: Mutex<Calculator>,
}
