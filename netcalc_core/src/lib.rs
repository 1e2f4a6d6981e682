pub mod candidates;
pub mod constants;
pub mod errors;
pub mod handle_registry;
pub mod helpers;
pub mod index;
pub mod telemetry;
pub mod types;

pub use crate::candidates::Candidates;
pub use crate::errors::{Error, ErrorCode};
pub use crate::types::{Calculator, Family, SyncCalculator};

use ipnet::IpNet;
use log::{debug, info, trace, warn};
use metrics::{counter, gauge};
use once_cell::sync::OnceCell;

use crate::helpers::widened_key;
use crate::index::PrefixIndex;

impl Calculator {
    // ---- logging bootstrapper ------------------------------------------------
    fn ensure_logging() {
        static INIT: OnceCell<()> = OnceCell::new();
        INIT.get_or_init(|| {
            // Fallback: simple env_logger with RFC-3339 ts off.
            let _ = env_logger::builder()
                .format_timestamp(None)
                .is_test(std::env::var("RUST_TEST_THREADS").is_ok())
                .try_init();
        });
    }

    /// Create an empty allocator.
    pub fn new() -> Calculator {
        Self::ensure_logging();
        telemetry::init();
        Calculator {
            pools_v4: PrefixIndex::new(),
            allocations_v4: PrefixIndex::new(),
            pools_v6: PrefixIndex::new(),
            allocations_v6: PrefixIndex::new(),
        }
    }

    fn pool_index(&self, family: Family) -> &PrefixIndex {
        match family {
            Family::V4 => &self.pools_v4,
            Family::V6 => &self.pools_v6,
        }
    }

    fn allocation_index(&self, family: Family) -> &PrefixIndex {
        match family {
            Family::V4 => &self.allocations_v4,
            Family::V6 => &self.allocations_v6,
        }
    }

    /// Add a pool prefix. Host bits are masked off; re-adding an existing
    /// pool is a no-op.
    pub fn add_pool(&mut self, prefix: IpNet) {
        let prefix = prefix.trunc();
        info!("[POOL] add {prefix}");
        let index = match Family::of(&prefix) {
            Family::V4 => &mut self.pools_v4,
            Family::V6 => &mut self.pools_v6,
        };
        index.insert(widened_key(&prefix), prefix);
    }

    /// Remove a pool by its network-address key. Allocations inside it are
    /// left in place, stranded until the host releases them; the host
    /// detects that through [`Calculator::prefix_in_pools`].
    pub fn remove_pool(&mut self, prefix: IpNet) {
        let prefix = prefix.trunc();
        info!("[POOL] remove {prefix}");
        let index = match Family::of(&prefix) {
            Family::V4 => &mut self.pools_v4,
            Family::V6 => &mut self.pools_v6,
        };
        index.delete(widened_key(&prefix));
    }

    /// Record an externally-claimed prefix. Deliberately unvalidated: the
    /// host replays claims on boot, and those may predate the pools or lie
    /// outside them entirely.
    pub fn add_allocation(&mut self, prefix: IpNet) {
        let prefix = prefix.trunc();
        info!("[ALLOC] add {prefix}");
        let index = match Family::of(&prefix) {
            Family::V4 => &mut self.allocations_v4,
            Family::V6 => &mut self.allocations_v6,
        };
        index.insert(widened_key(&prefix), prefix);
    }

    /// Release an allocation by its network-address key; releasing twice
    /// is a no-op.
    pub fn remove_allocation(&mut self, prefix: IpNet) {
        let prefix = prefix.trunc();
        let index = match Family::of(&prefix) {
            Family::V4 => &mut self.allocations_v4,
            Family::V6 => &mut self.allocations_v6,
        };
        if index.delete(widened_key(&prefix)) {
            counter!("netcalc_allocations_released_total").increment(1);
            info!("[ALLOC] release {prefix}");
        }
    }

    /// True when some pool wholly contains `prefix`.
    pub fn prefix_in_pools(&self, prefix: IpNet) -> bool {
        let prefix = prefix.trunc();
        let mut found = false;
        self.pool_index(Family::of(&prefix)).walk(|_, pool| {
            if pool.contains(&prefix) {
                found = true;
                return true;
            }
            false
        });
        found
    }

    /// Candidate stream for `prefix_len` over the family's pools, in the
    /// order [`Calculator::next_available`] considers them.
    pub fn candidates(&self, prefix_len: u8, family: Family) -> Candidates {
        Candidates::new(self.pool_index(family), prefix_len)
    }

    /// First-fit allocation: return the lowest available subnet of
    /// `prefix_len` bits in the family's pools and record it as allocated.
    pub fn next_available(&mut self, prefix_len: u8, family: Family) -> Result<IpNet, Error> {
        counter!("netcalc_next_available_total").increment(1);
        if prefix_len > family.width() {
            return Err(Error::InvalidMaskLength { prefix_len, family });
        }
        let (pools, allocations) = match family {
            Family::V4 => (&self.pools_v4, &mut self.allocations_v4),
            Family::V6 => (&self.pools_v6, &mut self.allocations_v6),
        };
        debug!(
            "[NEXT] request /{prefix_len} {family}: pools={}, allocations={}",
            pools.len(),
            allocations.len()
        );
        let mut examined = 0usize;
        for candidate in Candidates::new(pools, prefix_len) {
            examined += 1;
            if Self::prefix_available(allocations, &candidate) {
                allocations.insert(widened_key(&candidate), candidate);
                info!("[NEXT] allocated {candidate} after {examined} candidate(s)");
                return Ok(candidate);
            }
            trace!("[NEXT] {candidate} overlaps an existing allocation");
        }
        counter!("netcalc_exhaustions_total").increment(1);
        warn!("[NEXT] no eligible subnet with mask /{prefix_len} for {family}");
        Err(Error::NoSuitablePrefix { prefix_len })
    }

    /// Shorthand for [`Calculator::next_available`] in the IPv4 family.
    pub fn next_available_v4(&mut self, prefix_len: u8) -> Result<IpNet, Error> {
        self.next_available(prefix_len, Family::V4)
    }

    /// Shorthand for [`Calculator::next_available`] in the IPv6 family.
    pub fn next_available_v6(&mut self, prefix_len: u8) -> Result<IpNet, Error> {
        self.next_available(prefix_len, Family::V6)
    }

    /// Allocate `count` subnets in one call. On failure the subnets taken
    /// by this call are released again, so a failed batch leaves the
    /// engine unchanged.
    pub fn next_available_many(
        &mut self,
        count: usize,
        prefix_len: u8,
        family: Family,
    ) -> Result<Vec<IpNet>, Error> {
        let mut taken = Vec::with_capacity(count);
        for _ in 0..count {
            match self.next_available(prefix_len, family) {
                Ok(prefix) => taken.push(prefix),
                Err(err) => {
                    for prefix in taken {
                        self.remove_allocation(prefix);
                    }
                    return Err(err);
                }
            }
        }
        Ok(taken)
    }

    /// Pool prefixes of a family, ascending by network address.
    pub fn pools(&self, family: Family) -> Vec<IpNet> {
        self.pool_index(family).iter().map(|(_, p)| p).collect()
    }

    /// Allocated prefixes of a family, ascending by network address.
    pub fn allocations(&self, family: Family) -> Vec<IpNet> {
        self.allocation_index(family).iter().map(|(_, p)| p).collect()
    }

    /// Emit occupancy gauges (caller decides cadence).
    pub fn report_occupancy_metrics(&self) {
        gauge!("netcalc_pools_v4").set(self.pools_v4.len() as f64);
        gauge!("netcalc_allocations_v4").set(self.allocations_v4.len() as f64);
        gauge!("netcalc_pools_v6").set(self.pools_v6.len() as f64);
        gauge!("netcalc_allocations_v6").set(self.allocations_v6.len() as f64);
    }

    /// A candidate is available when no recorded allocation overlaps it in
    /// either direction.
    fn prefix_available(allocations: &PrefixIndex, candidate: &IpNet) -> bool {
        let mut available = true;
        allocations.walk(|_, existing| {
            if existing.contains(&candidate.network()) || candidate.contains(&existing.network()) {
                available = false;
                return true;
            }
            false
        });
        available
    }
}

impl Default for Calculator {
    fn default() -> Self {
        Calculator::new()
    }
}

impl SyncCalculator {
    /// Create an empty, thread-safe allocator.
    pub fn new() -> SyncCalculator {
        SyncCalculator {
            inner: parking_lot::Mutex::new(Calculator::new()),
        }
    }

    pub fn add_pool(&self, prefix: IpNet) {
        self.inner.lock().add_pool(prefix)
    }

    pub fn remove_pool(&self, prefix: IpNet) {
        self.inner.lock().remove_pool(prefix)
    }

    pub fn add_allocation(&self, prefix: IpNet) {
        self.inner.lock().add_allocation(prefix)
    }

    pub fn remove_allocation(&self, prefix: IpNet) {
        self.inner.lock().remove_allocation(prefix)
    }

    pub fn prefix_in_pools(&self, prefix: IpNet) -> bool {
        self.inner.lock().prefix_in_pools(prefix)
    }

    pub fn next_available(&self, prefix_len: u8, family: Family) -> Result<IpNet, Error> {
        self.inner.lock().next_available(prefix_len, family)
    }

    pub fn next_available_v4(&self, prefix_len: u8) -> Result<IpNet, Error> {
        self.inner.lock().next_available_v4(prefix_len)
    }

    pub fn next_available_v6(&self, prefix_len: u8) -> Result<IpNet, Error> {
        self.inner.lock().next_available_v6(prefix_len)
    }

    /// The whole batch allocates under one lock acquisition, so concurrent
    /// callers cannot interleave with a half-finished batch.
    pub fn next_available_many(
        &self,
        count: usize,
        prefix_len: u8,
        family: Family,
    ) -> Result<Vec<IpNet>, Error> {
        self.inner.lock().next_available_many(count, prefix_len, family)
    }

    pub fn pools(&self, family: Family) -> Vec<IpNet> {
        self.inner.lock().pools(family)
    }

    pub fn allocations(&self, family: Family) -> Vec<IpNet> {
        self.inner.lock().allocations(family)
    }

    pub fn report_occupancy_metrics(&self) {
        self.inner.lock().report_occupancy_metrics()
    }
}

impl Default for SyncCalculator {
    fn default() -> Self {
        SyncCalculator::new()
    }
}

// Public module for C API functions
pub mod public_api;

// Re-export all public API functions at the crate root
pub use public_api::*;
