use thiserror::Error;

use crate::predict::PredictError;
use crate::scheduler::storage::StorageError;

#[derive(Debug, Error)]
pub enum SchedulingError {
    #[error("Observation overlaps an existing booking on station {station_id}")]
    Overlap { station_id: u32 },
    #[error("Out of range: {0}")]
    OutOfRange(String),
    #[error("User {user} may not schedule on station {station_id}")]
    Permission { user: String, station_id: u32 },
    #[error("Propagation failed: {0}")]
    Propagation(#[from] PredictError),
    #[error("Booking store error: {0}")]
    Storage(#[from] StorageError),
}

impl SchedulingError {
    /// Errors the caller may retry unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SchedulingError::Storage(e) if e.is_retryable())
    }
}

pub type SchedulingResult<T> = Result<T, SchedulingError>;
