pub mod eligibility;
pub mod error;
pub mod interval;
pub mod locks;
pub mod observation;
pub mod overlap;
pub mod scanner;
pub mod service;
pub mod settings;
pub mod storage;
pub mod validation;
pub mod windows;

pub use eligibility::{available_stations, PermissionService};
pub use error::{SchedulingError, SchedulingResult};
pub use interval::Interval;
pub use locks::StationLocks;
pub use observation::{BookingRequest, Observation, ObservationFactory};
pub use overlap::{check_batch_overlaps, resolve_overlaps, Resolution, GUARD_INTERVAL};
pub use scanner::{PassScanner, ScanOutcome, ScanRequest};
pub use service::{Scheduler, WindowQuery};
pub use settings::SchedulingSettings;
pub use storage::{BookingStore, FileStore, MemoryStore, StorageError};
pub use windows::{OverlapMode, Window, WindowPolicy};
