//! Lazy enumeration of candidate subnets inside the pool index.

use std::net::IpAddr;

use ipnet::IpNet;

use crate::helpers::increment_at_bit;
use crate::index::{Iter, PrefixIndex};

/// Iterator over every subnet of `prefix_len` bits that can be carved out
/// of the pools: pool by pool in index walk order, ascending by address
/// within each pool. Pools too small to subdivide contribute nothing, and
/// a mask length beyond the pools' address width yields an empty stream.
///
/// The candidate space can be astronomically large (a `/56` split into
/// `/128`s is 2^72 prefixes), so candidates are computed one at a time and
/// the consumer stops pulling, or drops the iterator, as soon as it is
/// done. The iterator holds a snapshot of the pool index; mutating the
/// index afterwards does not affect a stream already started.
pub struct Candidates {
    pools: Iter,
    prefix_len: u8,
    cursor: Option<(IpNet, IpAddr)>,
}

impl Candidates {
    pub fn new(pools: &PrefixIndex, prefix_len: u8) -> Candidates {
        Candidates {
            pools: pools.iter(),
            prefix_len,
            cursor: None,
        }
    }
}

impl Iterator for Candidates {
    type Item = IpNet;

    fn next(&mut self) -> Option<IpNet> {
        loop {
            if let Some((pool, addr)) = self.cursor.take() {
                let candidate = IpNet::new(addr, self.prefix_len)
                    .expect("candidate mask length exceeds the pool address width");
                // Step to the next subnet; a wrapped or escaped address
                // means this pool is exhausted.
                let (next, wrapped) = increment_at_bit(addr, self.prefix_len);
                if !wrapped && pool.contains(&next) {
                    self.cursor = Some((pool, next));
                }
                return Some(candidate);
            }
            let (_, pool) = self.pools.next()?;
            if pool.prefix_len() <= self.prefix_len && self.prefix_len <= pool.max_prefix_len() {
                self.cursor = Some((pool, pool.network()));
            }
        }
    }
}
