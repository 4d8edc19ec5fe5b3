use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use log::{LevelFilter, debug};
use serde::{Deserialize, Serialize};
use spotter_domain::{ExerciseResolver, Provenance};

use crate::{
    catalog::{JsonCatalog, LayeredSource},
    image_finder::DocumentTreeFinder,
    thumbnail::{DEFAULT_CAPACITY, FreedesktopThumbnailer, MIN_CAPACITY, ThumbnailCache},
};

pub type Resolver =
    ExerciseResolver<LayeredSource<JsonCatalog, JsonCatalog>, DocumentTreeFinder>;

#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error("invalid settings: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub catalog_path: Option<PathBuf>,
    pub legacy_catalog_path: Option<PathBuf>,
    pub document_root: Option<PathBuf>,
    pub thumbnail_capacity: usize,
    #[serde(with = "LevelFilterDef")]
    pub log_level: LevelFilter,
}

#[derive(Serialize, Deserialize)]
#[serde(remote = "LevelFilter")]
enum LevelFilterDef {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            catalog_path: None,
            legacy_catalog_path: None,
            document_root: None,
            thumbnail_capacity: DEFAULT_CAPACITY,
            log_level: LevelFilter::Info,
        }
    }
}

/// Services sharing one configuration.
pub struct Services {
    pub resolver: Resolver,
    pub thumbnails: ThumbnailCache<FreedesktopThumbnailer>,
}

impl Settings {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file: {}", path.display()))?;
        Self::from_json(&json)
            .with_context(|| format!("failed to parse settings file: {}", path.display()))
    }

    /// Parses settings, raising the thumbnail capacity to its minimum if necessary.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let mut settings: Settings = serde_json::from_str(json)?;
        if settings.thumbnail_capacity < MIN_CAPACITY {
            debug!(
                "raising thumbnail capacity from {} to {MIN_CAPACITY}",
                settings.thumbnail_capacity
            );
            settings.thumbnail_capacity = MIN_CAPACITY;
        }
        Ok(settings)
    }

    /// Creates the services. Relative paths are resolved against `base_dir`, which is also where
    /// the search for the document tree starts if no root is configured.
    ///
    /// Catalogs that cannot be loaded are treated as unavailable, so that exercises can still be
    /// resolved from the document tree.
    #[must_use]
    pub fn open(&self, base_dir: &Path) -> Services {
        let catalog = |path: Option<&PathBuf>, provenance: Provenance| match path {
            Some(path) => JsonCatalog::open(&base_dir.join(path), provenance),
            None => JsonCatalog::empty(provenance),
        };

        let source = LayeredSource::new(
            catalog(self.catalog_path.as_ref(), Provenance::Primary),
            catalog(self.legacy_catalog_path.as_ref(), Provenance::Legacy),
        );
        let finder = match &self.document_root {
            Some(root) => DocumentTreeFinder::new(base_dir.join(root)),
            None => DocumentTreeFinder::discover(base_dir),
        };

        Services {
            resolver: ExerciseResolver::new(source, finder),
            thumbnails: ThumbnailCache::new(
                self.thumbnail_capacity,
                FreedesktopThumbnailer::from_env(),
            ),
        }
    }
}
