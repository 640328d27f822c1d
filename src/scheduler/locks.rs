use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One mutex per station, created on first use.
///
/// A booking holds its station's lock from the overlap check until the
/// observation is saved, so two requests for the same station cannot both
/// pass the check.
#[derive(Default)]
pub struct StationLocks {
    locks: Mutex<HashMap<u32, Arc<Mutex<()>>>>,
}

impl StationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, station_id: u32) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(station_id).or_default().clone()
    }

    /// Run `f` while holding the lock of `station_id`.
    pub fn with_station<T>(&self, station_id: u32, f: impl FnOnce() -> T) -> T {
        let lock = self.lock_for(station_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// Run `f` while holding the locks of every station in `station_ids`.
    ///
    /// Locks are taken in ascending id order.
    pub fn with_stations<T>(&self, station_ids: &[u32], f: impl FnOnce() -> T) -> T {
        let mut ids = station_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let locks: Vec<Arc<Mutex<()>>> = ids.iter().map(|id| self.lock_for(*id)).collect();
        let _guards: Vec<MutexGuard<'_, ()>> = locks
            .iter()
            .map(|lock| lock.lock().unwrap_or_else(PoisonError::into_inner))
            .collect();
        f()
    }
}
