use crate::model::{Station, User};

/// Who may book which station.
pub trait PermissionService {
    fn can_schedule(&self, user: &User, station: &Station) -> bool;
}

/// Stations `user` may book that can receive `downlink` (Hz).
pub fn available_stations<'a>(
    stations: &'a [Station],
    downlink: Option<u64>,
    user: &User,
    permissions: &impl PermissionService,
) -> Vec<&'a Station> {
    let Some(downlink) = downlink else {
        return Vec::new();
    };
    stations
        .iter()
        .filter(|station| permissions.can_schedule(user, station))
        .filter(|station| station.supports_frequency(downlink))
        .collect()
}
