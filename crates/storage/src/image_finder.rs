use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
};

use log::{debug, warn};
use spotter_domain::{
    DOCUMENT_ROOT_NAME, ImageFinder,
    normalize::{self, normalize},
};
use walkdir::WalkDir;

pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Maximum number of directories searched upwards for the document tree.
const MAX_ROOT_SEARCH_DEPTH: usize = 10;

/// Directory names used in the document tree for exercises commonly referred to by their Spanish
/// name.
const ENGLISH_NAMES: [(&str, &str); 31] = [
    ("Press de Banca", "Bench Press"),
    ("Press Banca", "Bench Press"),
    ("Press de pecho", "Chest Press"),
    ("Flexiones", "Push Up"),
    ("Aperturas", "Fly"),
    ("Remo con Barra", "Barbell Row"),
    ("Remo", "Row"),
    ("Dominadas", "Pull Up"),
    ("Jalones", "Lat Pulldown"),
    ("Peso Muerto", "Deadlift"),
    ("Sentadilla", "Squat"),
    ("Sentadillas", "Squat"),
    ("Prensa", "Leg Press"),
    ("Zancadas", "Lunge"),
    ("Curl Femoral", "Leg Curl"),
    ("Extensión de Cuádriceps", "Leg Extension"),
    ("Elevaciones de Pantorrilla", "Calf Raise"),
    ("Press Militar", "Military Press"),
    ("Press de Hombro", "Shoulder Press"),
    ("Elevaciones Laterales", "Lateral Raise"),
    ("Elevaciones Frontales", "Front Raise"),
    ("Remo al Mentón", "Upright Row"),
    ("Curl de Bíceps", "Bicep Curl"),
    ("Curl con Barra", "Barbell Curl"),
    ("Extensiones de Tríceps", "Tricep Extension"),
    ("Press Francés", "Skull Crusher"),
    ("Fondos", "Dip"),
    ("Abdominales", "Crunch"),
    ("Plancha", "Plank"),
    ("Elevación de Piernas", "Leg Raise"),
    ("Bicicleta", "Bicycle Crunch"),
];

#[must_use]
pub fn english_name(name: &str) -> Option<&'static str> {
    let key = normalize(name);
    ENGLISH_NAMES
        .iter()
        .find(|(spanish, _)| normalize(spanish) == key)
        .map(|(_, english)| *english)
}

/// Searches `docs/ejercicios` in `start` and its ancestors.
#[must_use]
pub fn find_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .take(MAX_ROOT_SEARCH_DEPTH)
        .map(|dir| dir.join("docs").join(DOCUMENT_ROOT_NAME))
        .find(|dir| dir.is_dir())
}

/// Finds exercise images in a document tree organized as `<muscle group>/<exercise>/<image>`.
///
/// The first image of every directory is indexed by the directory name when the finder is
/// created. Names that cannot be found in the index trigger a scan of the tree, and hits of such
/// scans are added to the index.
pub struct DocumentTreeFinder {
    root: Option<PathBuf>,
    images: Mutex<BTreeMap<String, Entry>>,
}

#[derive(Debug, Clone)]
struct Entry {
    directory_name: String,
    path: PathBuf,
}

impl DocumentTreeFinder {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let images = preload(&root);
        debug!("indexed {} exercise images in {}", images.len(), root.display());
        Self {
            root: Some(root),
            images: Mutex::new(images),
        }
    }

    /// Uses the document tree found by [`find_root`], if any.
    #[must_use]
    pub fn discover(start: &Path) -> Self {
        match find_root(start) {
            Some(root) => Self::new(root),
            None => {
                warn!(
                    "no exercise document tree found above {}",
                    start.display()
                );
                Self {
                    root: None,
                    images: Mutex::new(BTreeMap::new()),
                }
            }
        }
    }

    #[must_use]
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Names of all exercise directories containing an image.
    #[must_use]
    pub fn exercise_names(&self) -> Vec<String> {
        self.lock()
            .values()
            .map(|e| e.directory_name.clone())
            .collect()
    }

    fn by_directory_name(&self, name: &str) -> Option<PathBuf> {
        self.lock()
            .get(&name.trim().to_lowercase())
            .map(|e| e.path.clone())
            .filter(|p| p.is_file())
    }

    fn by_keywords(&self, keywords: &[&str]) -> Option<PathBuf> {
        let candidates = self
            .lock()
            .values()
            .filter(|e| matches_keywords(&e.directory_name, keywords))
            .map(|e| e.path.clone())
            .collect::<Vec<_>>();
        candidates.into_iter().find(|p| p.is_file())
    }

    fn scan(&self, keywords: &[&str]) -> Option<PathBuf> {
        let root = self.root.as_ref()?;

        let (directory_name, path) = WalkDir::new(root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_dir())
            .filter_map(|e| {
                let directory_name = e.file_name().to_str()?.to_string();
                if !matches_keywords(&directory_name, keywords) {
                    return None;
                }
                first_image(e.path()).map(|p| (directory_name, p))
            })
            .next()?;

        debug!("found {} by scanning {}", path.display(), root.display());
        self.lock().insert(
            directory_name.to_lowercase(),
            Entry {
                directory_name,
                path: path.clone(),
            },
        );

        Some(path)
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Entry>> {
        self.images.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ImageFinder for DocumentTreeFinder {
    fn find_image_path(&self, name: &str) -> Option<PathBuf> {
        if normalize::is_blank(name) {
            return None;
        }

        if let Some(path) = self.by_directory_name(name) {
            return Some(path);
        }

        if let Some(path) = english_name(name).and_then(|n| self.by_directory_name(n)) {
            return Some(path);
        }

        let key = normalize(name);
        let keywords = normalize::tokens(&key).collect::<Vec<_>>();

        self.by_keywords(&keywords).or_else(|| self.scan(&keywords))
    }

    /// Top-level directories of the document tree, sorted by name.
    fn muscle_group_directories(&self) -> Vec<String> {
        let Some(root) = &self.root else {
            return vec![];
        };

        WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_dir())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .filter(|n| !n.starts_with('.') && !n.trim().is_empty())
            .collect()
    }
}

/// True if enough of `keywords` are contained in the normalized `directory_name`.
///
/// A single keyword must match, otherwise at least two.
fn matches_keywords(directory_name: &str, keywords: &[&str]) -> bool {
    if keywords.is_empty() {
        return false;
    }
    let directory_name = normalize(directory_name);
    let matches = keywords
        .iter()
        .filter(|k| directory_name.contains(*k))
        .count();
    matches >= keywords.len().min(2)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.iter().any(|i| e.eq_ignore_ascii_case(i)))
}

fn first_image(directory: &Path) -> Option<PathBuf> {
    let mut images = fs::read_dir(directory)
        .ok()?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_image(p))
        .collect::<Vec<_>>();
    images.sort_by_key(|p| p.file_name().map(|n| n.to_string_lossy().to_lowercase()));
    images.into_iter().next()
}

fn preload(root: &Path) -> BTreeMap<String, Entry> {
    let mut images = BTreeMap::new();

    for entry in WalkDir::new(root)
        .sort_by_key(|e| e.file_name().to_string_lossy().to_lowercase())
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && is_image(e.path()))
    {
        let Some(directory_name) = entry
            .path()
            .parent()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
            .filter(|n| !n.trim().is_empty())
        else {
            continue;
        };

        images
            .entry(directory_name.to_lowercase())
            .or_insert_with(|| Entry {
                directory_name: directory_name.to_string(),
                path: entry.path().to_path_buf(),
            });
    }

    images
}
