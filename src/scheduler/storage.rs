use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use fs2::FileExt;
use thiserror::Error;

use crate::scheduler::interval::Interval;
use crate::scheduler::observation::Observation;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error in {file}: {source}")]
    Parse {
        file: String,
        source: serde_yaml::Error,
    },
    #[error("Serialize error: {0}")]
    Serialize(#[from] serde_yaml::Error),
    #[error("Booking store unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Io(_) | StorageError::Unavailable(_))
    }
}

/// Persisted bookings, one timeline per station.
pub trait BookingStore {
    /// Held while a booking is checked against a station's timeline and saved.
    /// Dropping it releases the station.
    type StationLock;

    /// Block until no other writer, in this process or another, holds
    /// `station_id`.
    fn lock_station(&self, station_id: u32) -> Result<Self::StationLock, StorageError>;

    /// Bookings on `station_id` that end after `after`, ordered by start.
    fn future_bookings_for(
        &self,
        station_id: u32,
        after: DateTime<Utc>,
    ) -> Result<Vec<Interval>, StorageError>;

    /// Store a booking and return its id.
    fn save(&self, observation: &Observation) -> Result<String, StorageError>;
}

const LOCK_FILE: &str = ".lock";

/// Exclusive OS lock on `<base>/<station id>/.lock`, released on drop.
pub struct StationFileLock {
    _file: File,
}

/// One YAML file per booking under `<base>/<station id>/`.
pub struct FileStore {
    base: PathBuf,
}

impl FileStore {
    pub fn new(base: PathBuf) -> Self {
        FileStore { base }
    }

    fn station_path(&self, station_id: u32) -> PathBuf {
        self.base.join(station_id.to_string())
    }

    fn observation_path(&self, station_id: u32, id: &str) -> PathBuf {
        self.station_path(station_id).join(format!("{}.yaml", id))
    }

    /// Every stored booking of a station, ordered by start.
    pub fn observations(&self, station_id: u32) -> Result<Vec<(String, Observation)>, StorageError> {
        let path = self.station_path(station_id);

        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in path.read_dir()? {
            let entry_path = entry?.path();

            if !entry_path.is_file() || entry_path.extension().is_none_or(|ext| ext != "yaml") {
                continue;
            }

            let id = entry_path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(String::from)
                .unwrap_or_default();

            // An unreadable booking must not vanish from the overlap check
            let content = std::fs::read_to_string(&entry_path)?;
            let observation: Observation =
                serde_yaml::from_str(&content).map_err(|source| StorageError::Parse {
                    file: entry_path.display().to_string(),
                    source,
                })?;

            entries.push((id, observation));
        }

        entries.sort_by_key(|(_, o)| o.start);
        Ok(entries)
    }

    fn generate_id(&self, start: DateTime<Utc>) -> String {
        let uuid = uuid::Uuid::new_v4();
        let timestamp = start.format("%Y%m%dT%H%M%SZ");
        format!("{}_{}", timestamp, uuid)
    }
}

impl BookingStore for FileStore {
    type StationLock = StationFileLock;

    fn lock_station(&self, station_id: u32) -> Result<StationFileLock, StorageError> {
        let folder = self.station_path(station_id);
        std::fs::create_dir_all(&folder)?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(folder.join(LOCK_FILE))?;
        FileExt::lock_exclusive(&file)?;
        Ok(StationFileLock { _file: file })
    }

    fn future_bookings_for(
        &self,
        station_id: u32,
        after: DateTime<Utc>,
    ) -> Result<Vec<Interval>, StorageError> {
        Ok(self
            .observations(station_id)?
            .into_iter()
            .map(|(_, o)| o.interval())
            .filter(|interval| interval.end > after)
            .collect())
    }

    fn save(&self, observation: &Observation) -> Result<String, StorageError> {
        let folder = self.station_path(observation.station_id);
        std::fs::create_dir_all(&folder)?;

        let id = self.generate_id(observation.start);
        let path = self.observation_path(observation.station_id, &id);
        // Readers only pick up `.yaml` files, so they never see a partial write
        let staging = folder.join(format!(".{}.tmp", id));
        std::fs::write(&staging, serde_yaml::to_string(observation)?)?;
        std::fs::rename(&staging, &path)?;
        log::info!(
            "Stored observation {} on station {} ({} - {})",
            id,
            observation.station_id,
            observation.start,
            observation.end
        );
        Ok(id)
    }
}

/// Bookings held in memory, for tests and embedding.
#[derive(Default)]
pub struct MemoryStore {
    stations: Mutex<HashMap<u32, Vec<Observation>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observations(&self, station_id: u32) -> Result<Vec<Observation>, StorageError> {
        let stations = self
            .stations
            .lock()
            .map_err(|_| StorageError::Unavailable("memory store poisoned".into()))?;
        Ok(stations.get(&station_id).cloned().unwrap_or_default())
    }
}

impl BookingStore for MemoryStore {
    /// Bookings live in this process only, where `StationLocks` already
    /// serializes writers.
    type StationLock = ();

    fn lock_station(&self, _station_id: u32) -> Result<(), StorageError> {
        Ok(())
    }

    fn future_bookings_for(
        &self,
        station_id: u32,
        after: DateTime<Utc>,
    ) -> Result<Vec<Interval>, StorageError> {
        let mut intervals: Vec<Interval> = self
            .observations(station_id)?
            .iter()
            .map(Observation::interval)
            .filter(|interval| interval.end > after)
            .collect();
        intervals.sort();
        Ok(intervals)
    }

    fn save(&self, observation: &Observation) -> Result<String, StorageError> {
        let mut stations = self
            .stations
            .lock()
            .map_err(|_| StorageError::Unavailable("memory store poisoned".into()))?;
        let bookings = stations.entry(observation.station_id).or_default();
        bookings.push(observation.clone());
        Ok(format!("{}-{}", observation.station_id, bookings.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Transmitter;
    use crate::predict::iss_tle;
    use chrono::{Duration, TimeZone};

    fn observation(station_id: u32, start_minute: i64, len: i64) -> Observation {
        let start = Utc.with_ymd_and_hms(2030, 5, 1, 12, 0, 0).unwrap()
            + Duration::minutes(start_minute);
        Observation {
            station_id,
            norad_id: 25544,
            tle: iss_tle(),
            transmitter: Transmitter {
                uuid: "tx".into(),
                downlink_low: Some(145_800_000),
                downlink_high: None,
                downlink_drift: None,
            },
            author: "alice".into(),
            start,
            end: start + Duration::minutes(len),
            rise_azimuth: 10.0,
            max_altitude: 45.0,
            set_azimuth: 200.0,
        }
    }

    #[test]
    fn file_store_returns_future_bookings_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf());

        let late = observation(1, 60, 10);
        let early = observation(1, 0, 10);
        store.save(&late).unwrap();
        store.save(&early).unwrap();
        store.save(&observation(2, 30, 10)).unwrap();

        let all = store
            .future_bookings_for(1, early.start - Duration::days(1))
            .unwrap();
        assert_eq!(all, vec![early.interval(), late.interval()]);

        // the early booking has ended by then
        let future = store
            .future_bookings_for(1, early.end + Duration::minutes(1))
            .unwrap();
        assert_eq!(future, vec![late.interval()]);

        let (_, stored) = &store.observations(1).unwrap()[0];
        assert_eq!(stored, &early);
    }

    #[test]
    fn file_store_surfaces_corrupt_bookings() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf());
        std::fs::create_dir_all(dir.path().join("3")).unwrap();
        std::fs::write(dir.path().join("3").join("broken.yaml"), "start: [").unwrap();

        let err = store.future_bookings_for(3, Utc::now()).unwrap_err();
        assert!(matches!(err, StorageError::Parse { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn staging_and_lock_files_are_not_bookings() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf());
        let booked = observation(4, 0, 10);
        store.save(&booked).unwrap();

        let _lock = store.lock_station(4).unwrap();
        std::fs::write(dir.path().join("4").join(".half-written.tmp"), "start: [").unwrap();

        let future = store
            .future_bookings_for(4, booked.start - Duration::days(1))
            .unwrap();
        assert_eq!(future, vec![booked.interval()]);

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("4"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp") && name != ".half-written.tmp")
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn station_lock_excludes_a_second_store() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        let dir = tempfile::tempdir().unwrap();
        let first = FileStore::new(dir.path().to_path_buf());
        let second = FileStore::new(dir.path().to_path_buf());
        let acquired = Arc::new(AtomicBool::new(false));

        let held = first.lock_station(5).unwrap();
        std::thread::scope(|scope| {
            let flag = Arc::clone(&acquired);
            let waiter = scope.spawn(move || {
                let _lock = second.lock_station(5).unwrap();
                flag.store(true, Ordering::SeqCst);
            });
            std::thread::sleep(std::time::Duration::from_millis(50));
            assert!(!acquired.load(Ordering::SeqCst));
            drop(held);
            waiter.join().unwrap();
        });
        assert!(acquired.load(Ordering::SeqCst));
    }

    #[test]
    fn empty_station_has_no_bookings() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf());
        assert!(store.future_bookings_for(9, Utc::now()).unwrap().is_empty());
    }

    #[test]
    fn memory_store_filters_by_station_and_end() {
        let store = MemoryStore::new();
        let a = observation(1, 30, 10);
        let b = observation(1, 0, 10);
        store.save(&a).unwrap();
        store.save(&b).unwrap();
        store.save(&observation(2, 0, 10)).unwrap();

        let intervals = store.future_bookings_for(1, b.start).unwrap();
        assert_eq!(intervals, vec![b.interval(), a.interval()]);
        assert_eq!(store.future_bookings_for(1, b.end).unwrap(), vec![a.interval()]);
    }
}
