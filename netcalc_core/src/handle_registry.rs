//! Opaque-handle registry backing the C ABI.
//!
//! FFI callers hold `u64` ids rather than raw pointers, so a stale or
//! fabricated handle fails with `InvalidHandle` instead of dereferencing
//! garbage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::errors::ErrorCode;
use crate::types::SyncCalculator;

/// Handle ID type - safer than raw pointers
pub type HandleId = u64;

struct HandleRegistry {
    handles: Mutex<HashMap<HandleId, Arc<SyncCalculator>>>,
    next_id: AtomicU64,
}

impl HandleRegistry {
    fn new() -> Self {
        HandleRegistry {
            handles: Mutex::new(HashMap::new()),
            // id 0 stays reserved as the null handle
            next_id: AtomicU64::new(1),
        }
    }
}

static REGISTRY: OnceLock<HandleRegistry> = OnceLock::new();

fn registry() -> &'static HandleRegistry {
    REGISTRY.get_or_init(HandleRegistry::new)
}

/// Register a calculator and return its handle id.
pub fn register_handle(calculator: SyncCalculator) -> HandleId {
    let reg = registry();
    let id = reg.next_id.fetch_add(1, Ordering::SeqCst);
    reg.handles.lock().insert(id, Arc::new(calculator));
    id
}

/// Run `f` against the calculator behind `id`. The registry lock is
/// dropped before `f` runs; the calculator serializes itself.
pub fn with_handle<T, F>(id: HandleId, f: F) -> Result<T, ErrorCode>
where
    F: FnOnce(&SyncCalculator) -> T,
{
    let calculator = registry()
        .handles
        .lock()
        .get(&id)
        .cloned()
        .ok_or(ErrorCode::InvalidHandle)?;
    Ok(f(&calculator))
}

/// Unregister and drop the calculator behind `id`.
pub fn unregister_handle(id: HandleId) -> Result<(), ErrorCode> {
    registry()
        .handles
        .lock()
        .remove(&id)
        .map(|_| ())
        .ok_or(ErrorCode::InvalidHandle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Family;

    #[test]
    fn unknown_handles_are_rejected() {
        assert_eq!(with_handle(0, |_| ()).unwrap_err(), ErrorCode::InvalidHandle);
        assert_eq!(unregister_handle(u64::MAX).unwrap_err(), ErrorCode::InvalidHandle);
    }

    #[test]
    fn register_use_unregister_roundtrip() {
        let id = register_handle(SyncCalculator::new());
        assert_eq!(with_handle(id, |c| c.pools(Family::V4).len()).unwrap(), 0);
        assert!(unregister_handle(id).is_ok());
        assert_eq!(unregister_handle(id).unwrap_err(), ErrorCode::InvalidHandle);
    }
}
