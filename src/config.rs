use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

use crate::model::{Station, Transmitter, User};
use crate::scheduler::{PermissionService, SchedulingSettings};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub stations: Vec<Station>,
    #[serde(default)]
    pub transmitters: Vec<Transmitter>,
    #[serde(default)]
    pub operators: Vec<Operator>,
    #[serde(default)]
    pub scheduling: SchedulingSettings,
    pub tle_folder: PathBuf,
    pub bookings_folder: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Operator {
    pub name: String,
    pub permissions: HashSet<Permission>,
    /// Stations this operator owns
    #[serde(default)]
    pub stations: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ScheduleAnyStation,
    ScheduleOwnStation,
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), ConfigError> {
        let mut ids = HashSet::new();
        for station in &self.stations {
            if !ids.insert(station.id) {
                return Err(ConfigError::Invalid(format!(
                    "station id {} is used twice",
                    station.id
                )));
            }
            if station.antennas.iter().any(|a| a.frequency_min > a.frequency_max) {
                return Err(ConfigError::Invalid(format!(
                    "station {} has an antenna with frequency_min above frequency_max",
                    station.id
                )));
            }
        }
        if self.scheduling.min_start_offset >= self.scheduling.max_booking_range {
            return Err(ConfigError::Invalid(
                "min_start_offset must be shorter than max_booking_range".into(),
            ));
        }
        Ok(())
    }

    pub fn find_station(&self, id: u32) -> Option<&Station> {
        self.stations.iter().find(|s| s.id == id)
    }

    pub fn find_transmitter(&self, uuid: &str) -> Option<&Transmitter> {
        self.transmitters.iter().find(|t| t.uuid == uuid)
    }

    pub fn find_operator(&self, name: &str) -> Option<&Operator> {
        self.operators.iter().find(|o| o.name == name)
    }
}

impl Operator {
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}

impl PermissionService for Config {
    fn can_schedule(&self, user: &User, station: &Station) -> bool {
        let Some(operator) = self.find_operator(&user.name) else {
            return false;
        };
        operator.has_permission(Permission::ScheduleAnyStation)
            || (operator.has_permission(Permission::ScheduleOwnStation)
                && operator.stations.contains(&station.id))
    }
}
