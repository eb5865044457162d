//! Per-vehicle mutual exclusion for read-modify-write sequences.
//!
//! Session start/end and rotation-cursor advancement each re-read state and
//! write it back. Both run under the vehicle's lock so two callers in the same
//! process can never interleave on one vehicle. Cross-device exclusion is the
//! backend's job (compare-and-swap on the session store).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
pub struct VehicleLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl VehicleLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lock handle for a vehicle, creating it on first use.
    pub fn handle(&self, vehicle_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks
            .entry(vehicle_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Locks a handle, recovering from poisoning (the guarded unit carries no data).
pub fn lock(handle: &Mutex<()>) -> MutexGuard<'_, ()> {
    handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::thread;

    #[test]
    fn test_same_vehicle_shares_handle() {
        let locks = VehicleLocks::new();
        let a = locks.handle("v-1");
        let b = locks.handle("v-1");
        let c = locks.handle("v-2");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn test_critical_section_is_exclusive() {
        let locks = Arc::new(VehicleLocks::new());
        let inside = Arc::new(AtomicU32::new(0));
        let max_seen = Arc::new(AtomicU32::new(0));

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let max_seen = Arc::clone(&max_seen);
                thread::spawn(move || {
                    let handle = locks.handle("v-1");
                    let _guard = lock(&handle);
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    thread::yield_now();
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }
}
