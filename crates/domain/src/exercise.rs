use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
    sync::Arc,
};

use derive_more::Display;

use crate::{SourceError, normalize::eq_ignore_case};

/// A structured store of exercises, such as the primary catalog or the legacy database.
///
/// Implementations may return incomplete or inconsistently named records. Errors are reported to
/// the caller, which treats them as if the source had produced nothing.
pub trait ExerciseSource: Send + Sync {
    fn find_by_name(&self, name: &str) -> Result<Option<SourceRecord>, SourceError>;
    fn all_records(&self) -> Result<Vec<SourceRecord>, SourceError>;
}

/// Best-effort image lookup based on naming conventions.
pub trait ImageFinder: Send + Sync {
    fn find_image_path(&self, name: &str) -> Option<PathBuf>;

    /// Names of the muscle group directories the images are organized in.
    fn muscle_group_directories(&self) -> Vec<String> {
        vec![]
    }
}

impl<T: ExerciseSource + ?Sized> ExerciseSource for Arc<T> {
    fn find_by_name(&self, name: &str) -> Result<Option<SourceRecord>, SourceError> {
        (**self).find_by_name(name)
    }

    fn all_records(&self) -> Result<Vec<SourceRecord>, SourceError> {
        (**self).all_records()
    }
}

impl<T: ImageFinder + ?Sized> ImageFinder for Arc<T> {
    fn find_image_path(&self, name: &str) -> Option<PathBuf> {
        (**self).find_image_path(name)
    }

    fn muscle_group_directories(&self) -> Vec<String> {
        (**self).muscle_group_directories()
    }
}

/// Finder for setups without an image directory.
pub struct NoImageFinder;

impl ImageFinder for NoImageFinder {
    fn find_image_path(&self, _: &str) -> Option<PathBuf> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExerciseRecord {
    pub name: String,
    pub alternate_name: Option<String>,
    pub description: String,
    pub muscle_groups: Vec<String>,
    pub keywords: BTreeSet<String>,
    pub image: Option<ImageRef>,
    pub provenance: Provenance,
}

impl ExerciseRecord {
    #[must_use]
    pub fn new(name: &str, provenance: Provenance) -> Self {
        Self {
            name: name.trim().to_string(),
            alternate_name: None,
            description: String::new(),
            muscle_groups: vec![],
            keywords: BTreeSet::new(),
            image: None,
            provenance,
        }
    }

    /// True if the record carries image data or points to an existing file.
    #[must_use]
    pub fn has_usable_image(&self) -> bool {
        self.image.as_ref().is_some_and(ImageRef::is_usable)
    }

    #[must_use]
    pub fn image_path(&self) -> Option<&Path> {
        match &self.image {
            Some(ImageRef::Path(path)) => Some(path),
            _ => None,
        }
    }

    /// The local name followed by the alternate-language name, if any.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.alternate_name.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    Data(Arc<[u8]>),
    Path(PathBuf),
}

impl ImageRef {
    #[must_use]
    pub fn is_usable(&self) -> bool {
        match self {
            ImageRef::Data(data) => !data.is_empty(),
            ImageRef::Path(path) => path.is_file(),
        }
    }
}

impl From<Vec<u8>> for ImageRef {
    fn from(value: Vec<u8>) -> Self {
        Self::Data(value.into())
    }
}

impl From<PathBuf> for ImageRef {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Provenance {
    #[default]
    #[display("structured store")]
    Primary,
    #[display("legacy store")]
    Legacy,
    #[display("filesystem")]
    Filesystem,
}

/// A record as delivered by an [`ExerciseSource`].
///
/// `exercise_name` holds the local (Spanish) name and `name` the name the record is stored under,
/// which is frequently the English one. Either may be blank.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceRecord {
    pub exercise_name: String,
    pub name: String,
    pub description: String,
    pub muscle_groups: Vec<String>,
    pub keywords: Vec<String>,
    pub image: Option<ImageRef>,
    pub provenance: Option<Provenance>,
}

impl SourceRecord {
    /// Non-blank names of the record, stored name first.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        [self.name.as_str(), self.exercise_name.as_str()]
            .into_iter()
            .filter(|n| !n.trim().is_empty())
    }

    #[must_use]
    pub fn local_name(&self) -> &str {
        if self.exercise_name.trim().is_empty() {
            self.name.trim()
        } else {
            self.exercise_name.trim()
        }
    }
}

impl From<SourceRecord> for ExerciseRecord {
    fn from(value: SourceRecord) -> Self {
        let name = value.local_name().to_string();
        let alternate_name = Some(value.name.trim())
            .filter(|n| !n.is_empty() && !eq_ignore_case(n, &name))
            .map(str::to_string);

        let mut muscle_groups: Vec<String> = Vec::with_capacity(value.muscle_groups.len());
        for group in value.muscle_groups.iter().map(|g| g.trim()) {
            if !group.is_empty() && !muscle_groups.iter().any(|g| eq_ignore_case(g, group)) {
                muscle_groups.push(group.to_string());
            }
        }

        ExerciseRecord {
            name,
            alternate_name,
            description: value.description,
            muscle_groups,
            keywords: value
                .keywords
                .iter()
                .map(|k| k.trim())
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect(),
            image: value.image,
            provenance: value.provenance.unwrap_or_default(),
        }
    }
}
