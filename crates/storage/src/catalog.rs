use std::{
    collections::HashSet,
    fs, io,
    path::{Path, PathBuf},
};

use log::{debug, error, warn};
use serde::{Deserialize, Serialize};
use spotter_domain::{
    ExerciseSource, ImageRef, Provenance, SourceError, SourceRecord, normalize,
    normalize::eq_ignore_case,
};

#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] io::Error),
    #[error("invalid catalog: {0}")]
    Json(#[from] serde_json::Error),
}

/// An exercise as stored in a catalog file.
///
/// Relative image paths are resolved against the directory containing the catalog.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct CatalogEntry {
    pub exercise_name: String,
    pub name: String,
    pub description: String,
    pub muscle_groups: Vec<String>,
    pub keywords: Vec<String>,
    pub image_path: Option<PathBuf>,
}

impl CatalogEntry {
    fn into_record(self, base_dir: Option<&Path>) -> SourceRecord {
        let image = self
            .image_path
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| match base_dir {
                Some(base_dir) if p.is_relative() => base_dir.join(p),
                _ => p,
            })
            .map(ImageRef::Path);

        SourceRecord {
            exercise_name: self.exercise_name,
            name: self.name,
            description: self.description,
            muscle_groups: self.muscle_groups,
            keywords: self.keywords,
            image,
            provenance: None,
        }
    }
}

/// Structured exercise source backed by a JSON file.
pub struct JsonCatalog {
    records: Result<Vec<SourceRecord>, String>,
    provenance: Provenance,
}

impl JsonCatalog {
    pub fn load(path: &Path, provenance: Provenance) -> Result<Self, CatalogError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json, path.parent(), provenance)
    }

    /// Loads the catalog at `path`. If that fails, the catalog reports itself as unavailable on
    /// every access.
    #[must_use]
    pub fn open(path: &Path, provenance: Provenance) -> Self {
        match Self::load(path, provenance) {
            Ok(catalog) => {
                debug!(
                    "loaded {} exercises from {} ({provenance})",
                    catalog.len(),
                    path.display()
                );
                catalog
            }
            Err(err) => {
                error!("failed to load {}: {err}", path.display());
                Self {
                    records: Err(format!("{}: {err}", path.display())),
                    provenance,
                }
            }
        }
    }

    pub fn from_json(
        json: &str,
        base_dir: Option<&Path>,
        provenance: Provenance,
    ) -> Result<Self, CatalogError> {
        let entries: Vec<CatalogEntry> = serde_json::from_str(json)?;
        Ok(Self::from_records(
            entries
                .into_iter()
                .map(|e| e.into_record(base_dir))
                .collect(),
            provenance,
        ))
    }

    #[must_use]
    pub fn from_records(records: Vec<SourceRecord>, provenance: Provenance) -> Self {
        Self {
            records: Ok(records
                .into_iter()
                .map(|r| SourceRecord {
                    provenance: Some(provenance),
                    ..r
                })
                .collect()),
            provenance,
        }
    }

    #[must_use]
    pub fn empty(provenance: Provenance) -> Self {
        Self::from_records(vec![], provenance)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.as_ref().map_or(0, Vec::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    fn records(&self) -> Result<&[SourceRecord], SourceError> {
        self.records
            .as_deref()
            .map_err(|err| SourceError::Unavailable(err.clone()))
    }
}

impl ExerciseSource for JsonCatalog {
    /// Exact (case-insensitive) name matches take precedence over partial matches. Only entries
    /// with an image are considered.
    fn find_by_name(&self, name: &str) -> Result<Option<SourceRecord>, SourceError> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }

        let mut with_image = self.records()?.iter().filter(|r| r.image.is_some());

        if let Some(record) = with_image
            .clone()
            .find(|r| r.names().any(|n| eq_ignore_case(n, name)))
        {
            return Ok(Some(record.clone()));
        }

        let pattern = name.to_lowercase();
        let partial = with_image.find(|r| r.names().any(|n| n.to_lowercase().contains(&pattern)));

        if let Some(record) = partial {
            if self.provenance == Provenance::Legacy {
                debug!(
                    "partial match \"{}\" for \"{name}\" in {}",
                    record.local_name(),
                    self.provenance
                );
            }
            return Ok(Some(record.clone()));
        }

        Ok(None)
    }

    fn all_records(&self) -> Result<Vec<SourceRecord>, SourceError> {
        self.records().map(<[SourceRecord]>::to_vec)
    }
}

/// Combines a primary source with a legacy source that fills its gaps.
pub struct LayeredSource<P, L> {
    primary: P,
    legacy: L,
}

impl<P: ExerciseSource, L: ExerciseSource> LayeredSource<P, L> {
    pub fn new(primary: P, legacy: L) -> Self {
        Self { primary, legacy }
    }

    pub fn primary(&self) -> &P {
        &self.primary
    }

    pub fn legacy(&self) -> &L {
        &self.legacy
    }
}

impl<P: ExerciseSource, L: ExerciseSource> ExerciseSource for LayeredSource<P, L> {
    fn find_by_name(&self, name: &str) -> Result<Option<SourceRecord>, SourceError> {
        let primary_error = match self.primary.find_by_name(name) {
            Ok(Some(record)) => return Ok(Some(record)),
            Ok(None) => None,
            Err(err) => {
                warn!("failed to look up \"{name}\" in primary source: {err}");
                Some(err)
            }
        };

        match (self.legacy.find_by_name(name), primary_error) {
            (Ok(record), _) => Ok(record),
            (Err(err), None) => {
                warn!("failed to look up \"{name}\" in legacy source: {err}");
                Ok(None)
            }
            (Err(_), Some(err)) => Err(err),
        }
    }

    /// Primary records followed by the legacy records not known to the primary source.
    fn all_records(&self) -> Result<Vec<SourceRecord>, SourceError> {
        let (primary, legacy) = (self.primary.all_records(), self.legacy.all_records());

        let mut records = match (primary, &legacy) {
            (Ok(records), _) => records,
            (Err(err), Ok(_)) => {
                warn!("failed to load primary source: {err}");
                vec![]
            }
            (Err(err), Err(_)) => return Err(err),
        };

        match legacy {
            Ok(legacy) => {
                let known = records
                    .iter()
                    .map(|r| normalize(r.local_name()))
                    .collect::<HashSet<_>>();
                records.extend(
                    legacy
                        .into_iter()
                        .filter(|r| !known.contains(&normalize(r.local_name()))),
                );
            }
            Err(err) => warn!("failed to load legacy source: {err}"),
        }

        Ok(records)
    }
}
