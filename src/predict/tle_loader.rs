use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use sgp4::Elements;

use crate::model::Satellite;
use crate::predict::error::PredictError;
use crate::predict::types::Tle;

/// Every TLE loaded from a folder, grouped by NORAD id.
pub struct TleCatalog {
    tle_dir: PathBuf,
    tles: HashMap<u32, Vec<Tle>>,
}

impl TleCatalog {
    pub fn new(tle_dir: PathBuf) -> Self {
        Self {
            tle_dir,
            tles: HashMap::new(),
        }
    }

    /// Load all TLE files from the directory
    pub fn load_all(&mut self) -> Result<(), PredictError> {
        if !self.tle_dir.exists() {
            return Err(PredictError::DirectoryNotFound(
                self.tle_dir.display().to_string(),
            ));
        }

        self.tles.clear();

        for entry in fs::read_dir(&self.tle_dir)? {
            let path = entry?.path();
            let is_tle = path
                .extension()
                .is_some_and(|ext| ext == "tle" || ext == "txt");
            if !path.is_file() || !is_tle {
                continue;
            }

            match parse_tle_file(&path) {
                Ok(tles) => {
                    log::debug!("Loaded {} TLEs from {}", tles.len(), path.display());
                    for tle in tles {
                        self.insert(tle);
                    }
                }
                Err(e) => {
                    log::warn!("Failed to parse TLE file {}: {}", path.display(), e);
                }
            }
        }

        Ok(())
    }

    pub fn insert(&mut self, tle: Tle) {
        self.tles.entry(tle.norad_id).or_default().push(tle);
    }

    /// Most recently updated TLE for a satellite
    pub fn latest(&self, norad_id: u32) -> Option<&Tle> {
        self.tles
            .get(&norad_id)?
            .iter()
            .max_by_key(|tle| tle.updated)
    }

    pub fn satellite(&self, norad_id: u32) -> Satellite {
        let latest_tle = self.latest(norad_id).cloned();
        Satellite {
            norad_id,
            name: latest_tle
                .as_ref()
                .map(|tle| tle.tle0.clone())
                .filter(|name| !name.is_empty()),
            latest_tle,
        }
    }

    pub fn norad_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.tles.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

/// Parse a single TLE file (may contain multiple satellites)
fn parse_tle_file(path: &Path) -> Result<Vec<Tle>, PredictError> {
    let content = fs::read_to_string(path)?;
    let filename = path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    let updated: DateTime<Utc> = fs::metadata(path)?.modified()?.into();

    parse_multi_tle(&content)
        .into_iter()
        .map(|(name, line1, line2)| {
            let elements = Elements::from_tle(name.clone(), line1.as_bytes(), line2.as_bytes())
                .map_err(|e| PredictError::InvalidTle {
                    source_name: filename.clone(),
                    message: e.to_string(),
                })?;
            Ok(Tle {
                tle0: name.unwrap_or_default(),
                tle1: line1,
                tle2: line2,
                norad_id: elements.norad_id as u32,
                source: filename.clone(),
                updated,
            })
        })
        .collect()
}

/// Parse multi-satellite TLE content
fn parse_multi_tle(content: &str) -> Vec<(Option<String>, String, String)> {
    let lines: Vec<&str> = content
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    let mut result = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if lines[i].starts_with("1 ") && i + 1 < lines.len() && lines[i + 1].starts_with("2 ") {
            // 2-line TLE (no name)
            result.push((None, lines[i].to_string(), lines[i + 1].to_string()));
            i += 2;
        } else if i + 2 < lines.len()
            && lines[i + 1].starts_with("1 ")
            && lines[i + 2].starts_with("2 ")
        {
            // 3-line TLE (with name)
            result.push((
                Some(lines[i].to_string()),
                lines[i + 1].to_string(),
                lines[i + 2].to_string(),
            ));
            i += 3;
        } else {
            i += 1;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::propagation::tests::iss_tle;
    use chrono::Duration;

    #[test]
    fn splits_named_and_unnamed_entries() {
        let content = "ISS (ZARYA)\n1 a\n2 b\n\n1 c\n2 d\nstray line\n";
        let parsed = parse_multi_tle(content);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].0.as_deref(), Some("ISS (ZARYA)"));
        assert_eq!(parsed[1].0, None);
        assert_eq!(parsed[1].1, "1 c");
    }

    #[test]
    fn latest_picks_most_recent_update() {
        let mut catalog = TleCatalog::new(PathBuf::from("unused"));
        let older = iss_tle();
        let mut newer = iss_tle();
        newer.updated = older.updated + Duration::hours(6);
        newer.source = "newer".into();
        catalog.insert(newer);
        catalog.insert(older);

        assert_eq!(catalog.latest(25544).unwrap().source, "newer");
        let satellite = catalog.satellite(25544);
        assert_eq!(satellite.name.as_deref(), Some("ISS (ZARYA)"));
        assert!(catalog.satellite(1).latest_tle.is_none());
    }

    #[test]
    fn loads_folder_and_skips_other_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let tle = iss_tle();
        fs::write(
            dir.path().join("stations.tle"),
            format!("{}\n{}\n{}\n", tle.tle0, tle.tle1, tle.tle2),
        )
        .unwrap();
        fs::write(dir.path().join("notes.md"), "1 x\n2 y\n").unwrap();

        let mut catalog = TleCatalog::new(dir.path().to_path_buf());
        catalog.load_all().unwrap();
        assert_eq!(catalog.norad_ids(), vec![25544]);
        assert_eq!(catalog.latest(25544).unwrap().source, "stations.tle");
    }

    #[test]
    fn missing_folder_is_an_error() {
        let mut catalog = TleCatalog::new(PathBuf::from("/nonexistent/tle/folder"));
        assert!(matches!(
            catalog.load_all(),
            Err(PredictError::DirectoryNotFound(_))
        ));
    }
}
