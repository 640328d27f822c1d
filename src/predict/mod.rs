mod error;
mod ground_station;
mod pass_finder;
mod propagation;
mod propagator;
mod tle_loader;
mod types;

pub use error::PredictError;
pub use ground_station::Observer;
pub use pass_finder::find_next_pass;
pub use propagation::{Sgp4Propagator, Sgp4Satellite};
pub use propagator::OrbitPropagator;
pub use tle_loader::TleCatalog;
pub use types::{round_degrees, LookAngles, Pass, Tle};

#[cfg(test)]
pub(crate) use propagation::tests::{iss_tle, observer as test_observer};
