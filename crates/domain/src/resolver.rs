use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
    sync::{Mutex, OnceLock, PoisonError},
};

use log::{debug, warn};

use crate::{
    ExerciseIndex, ExerciseRecord, ExerciseSource, ImageFinder, ImageRef, NameVariants,
    Provenance, SourceRecord,
    muscle::registry,
    normalize::{eq_ignore_case, is_blank, normalize},
    variant::variants,
};

/// Name of the directory at the top of the muscle-group-organized document tree.
pub const DOCUMENT_ROOT_NAME: &str = "ejercicios";

/// Resolves free-text exercise names to records with images.
///
/// Sources are consulted in order of authority: the index built from the structured source, the
/// structured source itself, and finally the image finder. Resolved records are memoized under
/// every name they were requested or are known by. The index is built on first use, and neither
/// the index nor the memoized results are invalidated afterwards.
pub struct ExerciseResolver<S, F> {
    source: S,
    finder: F,
    index: OnceLock<ExerciseIndex>,
    cache: Mutex<HashMap<String, ExerciseRecord>>,
}

impl<S, F> ExerciseResolver<S, F>
where
    S: ExerciseSource,
    F: ImageFinder,
{
    pub fn new(source: S, finder: F) -> Self {
        Self {
            source,
            finder,
            index: OnceLock::new(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn index(&self) -> &ExerciseIndex {
        self.index
            .get_or_init(|| ExerciseIndex::from_source(&self.source))
    }

    pub fn by_muscle_group(&self, label: &str) -> Vec<ExerciseRecord> {
        self.index().by_muscle_group(label)
    }

    pub fn search(&self, query: &str) -> Vec<ExerciseRecord> {
        self.index().search(query)
    }

    /// Muscle groups of all indexed exercises and of the image directories, sorted by name.
    ///
    /// Labels known to the registry are reported by their canonical name.
    pub fn muscle_groups(&self) -> Vec<String> {
        let labels = self
            .index()
            .records()
            .iter()
            .flat_map(|r| r.muscle_groups.iter().cloned())
            .chain(self.finder.muscle_group_directories());

        let mut groups = BTreeMap::new();
        for label in labels {
            let label = registry()
                .canonical_of(&label)
                .map_or_else(|| label.trim().to_string(), str::to_string);
            let key = normalize(&label);
            if !key.is_empty() {
                groups.entry(key).or_insert(label);
            }
        }

        groups.into_values().collect()
    }

    pub fn cached_len(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Finds the best matching exercise that has a usable image.
    ///
    /// Returns `None` if no source knows an image for any variant of `raw`.
    pub fn resolve(&self, raw: &str) -> Option<ExerciseRecord> {
        if is_blank(raw) {
            return None;
        }

        let variants = variants(raw);

        if let Some(cached) = self.cached(&variants) {
            return Some(cached);
        }

        let Some(resolved) = self
            .resolve_with_metadata(&variants)
            .or_else(|| self.resolve_without_metadata(&variants))
        else {
            debug!("no image found for \"{}\"", raw.trim());
            return None;
        };

        debug!(
            "resolved \"{}\" to \"{}\" ({})",
            raw.trim(),
            resolved.name,
            resolved.provenance
        );
        self.remember(&resolved, &variants);

        Some(resolved)
    }

    /// Path of the image for `raw`, if it is available as a file.
    pub fn image_path(&self, raw: &str) -> Option<PathBuf> {
        self.resolve(raw)
            .and_then(|r| r.image_path().filter(|p| p.is_file()).map(Path::to_path_buf))
            .or_else(|| {
                self.finder
                    .find_image_path(raw.trim())
                    .filter(|p| p.is_file())
            })
    }

    fn resolve_with_metadata(&self, variants: &NameVariants) -> Option<ExerciseRecord> {
        for variant in variants {
            let Some(mut resolved) = self.index().by_normalized_key(variant) else {
                continue;
            };

            self.attach_from_source(variant, &mut resolved);

            if !resolved.has_usable_image() {
                self.attach_from_finder(variant, &mut resolved);
            }

            if resolved.has_usable_image() {
                return Some(resolved);
            }
        }

        None
    }

    fn resolve_without_metadata(&self, variants: &NameVariants) -> Option<ExerciseRecord> {
        for variant in variants {
            if let Some(hit) = self
                .lookup(variant)
                .filter(|h| h.image.as_ref().is_some_and(ImageRef::is_usable))
            {
                let metadata = hit
                    .names()
                    .find_map(|n| self.index().by_normalized_key(n))
                    .or_else(|| self.index().by_normalized_key(variant));
                let provenance = hit.provenance.unwrap_or_default();
                let image = hit.image.clone();

                let mut resolved = metadata.unwrap_or_else(|| ExerciseRecord::from(hit));
                if resolved.name.is_empty() {
                    variant.trim().clone_into(&mut resolved.name);
                }
                resolved.image = image;
                resolved.provenance = provenance;
                self.complete_muscle_groups(variant, &mut resolved);

                return Some(resolved);
            }

            if let Some(path) = self.finder.find_image_path(variant) {
                let mut resolved = self
                    .index()
                    .by_normalized_key(variant)
                    .unwrap_or_else(|| ExerciseRecord::new(variant, Provenance::Filesystem));
                resolved.image = Some(ImageRef::Path(path));
                resolved.provenance = Provenance::Filesystem;
                self.complete_muscle_groups(variant, &mut resolved);

                if resolved.has_usable_image() {
                    return Some(resolved);
                }
            }
        }

        None
    }

    fn attach_from_source(&self, variant: &str, resolved: &mut ExerciseRecord) {
        let hit = self.lookup(&resolved.name).or_else(|| {
            if eq_ignore_case(&resolved.name, variant) {
                None
            } else {
                self.lookup(variant)
            }
        });

        let Some(hit) = hit else {
            return;
        };

        if resolved.muscle_groups.is_empty() {
            if let Some(metadata) = hit
                .names()
                .find_map(|n| self.index().by_normalized_key(n))
                .filter(|m| !m.muscle_groups.is_empty())
            {
                resolved.muscle_groups = metadata.muscle_groups;
            }
        }

        if let Some(image) = hit.image.filter(ImageRef::is_usable) {
            resolved.image = Some(image);
            resolved.provenance = hit.provenance.unwrap_or_default();
        }
    }

    fn attach_from_finder(&self, variant: &str, resolved: &mut ExerciseRecord) {
        let path = self.finder.find_image_path(&resolved.name).or_else(|| {
            if eq_ignore_case(&resolved.name, variant) {
                None
            } else {
                self.finder.find_image_path(variant)
            }
        });

        if let Some(path) = path {
            resolved.image = Some(ImageRef::Path(path));
            resolved.provenance = Provenance::Filesystem;
            let name = resolved.name.clone();
            self.complete_muscle_groups(&name, resolved);
        }
    }

    fn complete_muscle_groups(&self, name: &str, resolved: &mut ExerciseRecord) {
        if resolved.muscle_groups.is_empty() {
            resolved.muscle_groups = self.infer_muscle_groups(name, resolved.image_path());
        }
    }

    /// Best-effort muscle groups for an exercise without structured metadata.
    ///
    /// Known metadata wins. Otherwise the directories containing the image are searched upwards
    /// for a muscle group name, up to the root of the document tree, and finally the exercise
    /// name itself is tried.
    fn infer_muscle_groups(&self, name: &str, image_path: Option<&Path>) -> Vec<String> {
        if let Some(metadata) = self
            .index()
            .by_normalized_key(name)
            .filter(|m| !m.muscle_groups.is_empty())
        {
            return metadata.muscle_groups;
        }

        if let Some(path) = image_path {
            for directory in path.ancestors().skip(1) {
                let Some(directory_name) = directory.file_name().and_then(|n| n.to_str()) else {
                    break;
                };

                if let Some(canonical) = registry().canonical_of(directory_name) {
                    return vec![canonical.to_string()];
                }

                if directory_name.eq_ignore_ascii_case(DOCUMENT_ROOT_NAME) {
                    break;
                }
            }
        }

        registry()
            .canonical_of(name)
            .map(|c| vec![c.to_string()])
            .unwrap_or_default()
    }

    fn lookup(&self, name: &str) -> Option<SourceRecord> {
        match self.source.find_by_name(name) {
            Ok(hit) => hit,
            Err(err) => {
                warn!("failed to look up \"{name}\": {err}");
                None
            }
        }
    }

    /// Looks up every variant key, so a short key cached by an earlier resolution wins over a
    /// more specific name. For example, once "Press de hombro" is resolved, the shared key
    /// "press de" makes a later "Press de banca" return the shoulder press.
    fn cached(&self, variants: &NameVariants) -> Option<ExerciseRecord> {
        let keys = variants.normalized_keys();
        let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        keys.iter().find_map(|k| cache.get(k)).cloned()
    }

    /// Existing associations are kept, so a key never changes the record it resolves to.
    fn remember(&self, resolved: &ExerciseRecord, variants: &NameVariants) {
        let mut keys = variants.normalized_keys();
        for key in resolved.names().map(normalize) {
            if !key.is_empty() && !keys.contains(&key) {
                keys.push(key);
            }
        }

        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        for key in keys {
            cache.entry(key).or_insert_with(|| resolved.clone());
        }
    }
}
