use std::{
    env,
    fmt::Write,
    io,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
};

use derive_more::Display;
use image::{ImageReader, Rgba, RgbaImage, imageops::FilterType};
use log::{debug, warn};

use crate::lru::LruCache;

pub const MIN_CAPACITY: usize = 10;
pub const DEFAULT_CAPACITY: usize = 100;

/// The top-left pixel is only treated as background if it is at least this opaque.
const BACKGROUND_MIN_ALPHA: u8 = 240;
const CLEARED_MIN_ALPHA: u8 = 200;
const COLOR_TOLERANCE: u8 = 24;

/// Thumbnail sizes of the shared freedesktop cache, largest first.
const FREEDESKTOP_SIZES: [&str; 3] = ["x-large", "large", "normal"];

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[display("{width}x{height}")]
pub struct TargetSize {
    width: u32,
    height: u32,
}

impl TargetSize {
    pub fn new(width: u32, height: u32) -> Result<Self, SizeError> {
        if width == 0 {
            return Err(SizeError::ZeroWidth);
        }
        if height == 0 {
            return Err(SizeError::ZeroHeight);
        }
        Ok(Self { width, height })
    }

    #[must_use]
    pub fn width(self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(self) -> u32 {
        self.height
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeError {
    #[error("width must be greater than zero")]
    ZeroWidth,
    #[error("height must be greater than zero")]
    ZeroHeight,
}

#[derive(thiserror::Error, Debug)]
pub enum ThumbnailError {
    #[error("failed to read image: {0}")]
    Io(#[from] io::Error),
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Thumbnail facility of the operating system, used for files the decoder cannot handle.
pub trait SystemThumbnailer: Send + Sync {
    fn thumbnail(&self, path: &Path, size: TargetSize) -> Option<RgbaImage>;
}

pub struct NoSystemThumbnailer;

impl SystemThumbnailer for NoSystemThumbnailer {
    fn thumbnail(&self, _: &Path, _: TargetSize) -> Option<RgbaImage> {
        None
    }
}

/// Reads thumbnails that desktop environments store in the shared freedesktop.org cache.
pub struct FreedesktopThumbnailer {
    cache_dir: Option<PathBuf>,
}

impl FreedesktopThumbnailer {
    #[must_use]
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: Some(cache_dir.into()),
        }
    }

    /// Uses `$XDG_CACHE_HOME/thumbnails`, falling back to `$HOME/.cache/thumbnails`.
    #[must_use]
    pub fn from_env() -> Self {
        let cache_dir = env::var_os("XDG_CACHE_HOME")
            .filter(|d| !d.is_empty())
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|h| PathBuf::from(h).join(".cache")))
            .map(|d| d.join("thumbnails"));
        Self { cache_dir }
    }

    fn candidates(&self, path: &Path) -> Vec<PathBuf> {
        let Some(cache_dir) = &self.cache_dir else {
            return vec![];
        };
        let file_name = format!("{:x}.png", md5::compute(file_uri(path)));
        FREEDESKTOP_SIZES
            .iter()
            .map(|size| cache_dir.join(size).join(&file_name))
            .collect()
    }
}

impl SystemThumbnailer for FreedesktopThumbnailer {
    fn thumbnail(&self, path: &Path, _: TargetSize) -> Option<RgbaImage> {
        let path = path.canonicalize().ok()?;
        let candidate = self.candidates(&path).into_iter().find(|c| c.is_file())?;

        match image::open(&candidate) {
            Ok(image) => {
                debug!(
                    "using system thumbnail {} for {}",
                    candidate.display(),
                    path.display()
                );
                Some(image.to_rgba8())
            }
            Err(err) => {
                warn!(
                    "failed to read system thumbnail {}: {err}",
                    candidate.display()
                );
                None
            }
        }
    }
}

/// Builds the URI the thumbnail cache is keyed by. Unreserved characters, sub-delimiters, `:`, `@`
/// and `/` are kept, everything else is percent-encoded, as desktop thumbnailers do.
fn file_uri(path: &Path) -> String {
    let mut uri = String::from("file://");
    for byte in path.to_string_lossy().bytes() {
        if byte.is_ascii_alphanumeric() || b"/-._~!$&'()*+,;=:@".contains(&byte) {
            uri.push(char::from(byte));
        } else {
            let _ = write!(uri, "%{byte:02X}");
        }
    }
    uri
}

/// Memory-bounded cache of resized images.
///
/// Entries are keyed by item id and target size. Decoding and resizing happen outside of the
/// lock, so concurrent misses for the same key may both decode the file.
pub struct ThumbnailCache<T = NoSystemThumbnailer> {
    entries: Mutex<LruCache<String, RgbaImage>>,
    system: T,
}

impl Default for ThumbnailCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, NoSystemThumbnailer)
    }
}

impl<T: SystemThumbnailer> ThumbnailCache<T> {
    /// Capacities below [`MIN_CAPACITY`] are raised to it.
    pub fn new(capacity: usize, system: T) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity.max(MIN_CAPACITY))),
            system,
        }
    }

    /// Returns a thumbnail of the image at `path` fitting into `size`.
    ///
    /// Returns `None` if the file does not exist or neither the decoder nor the system
    /// thumbnailer can handle it.
    pub fn thumbnail(&self, item_id: &str, path: &Path, size: TargetSize) -> Option<RgbaImage> {
        if !path.is_file() {
            return None;
        }

        let key = cache_key(item_id, size);

        if let Some(thumbnail) = self.lock().get(&key) {
            return Some(thumbnail.clone());
        }

        let thumbnail = match load(path, size) {
            Ok(thumbnail) => thumbnail,
            Err(err) => {
                warn!("failed to create thumbnail of {}: {err}", path.display());
                fit(self.system.thumbnail(path, size)?, size)
            }
        };

        let evicted = self.lock().insert(key, thumbnail.clone());
        for (key, _) in evicted {
            debug!("evicted thumbnail {key}");
        }

        Some(thumbnail)
    }

    #[must_use]
    pub fn contains(&self, item_id: &str, size: TargetSize) -> bool {
        self.lock().contains_key(&cache_key(item_id, size))
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, RgbaImage>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn cache_key(item_id: &str, size: TargetSize) -> String {
    format!("{}|{size}", item_id.to_lowercase())
}

fn load(path: &Path, size: TargetSize) -> Result<RgbaImage, ThumbnailError> {
    let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    Ok(fit(image.to_rgba8(), size))
}

fn fit(mut image: RgbaImage, size: TargetSize) -> RgbaImage {
    clear_background(&mut image);

    let (width, height) = scaled_dimensions(image.dimensions(), size);
    if (width, height) == image.dimensions() {
        return image;
    }

    image::imageops::resize(&image, width, height, FilterType::CatmullRom)
}

/// Makes pixels similar to an opaque top-left pixel transparent.
fn clear_background(image: &mut RgbaImage) {
    let Some(&Rgba([red, green, blue, alpha])) = image.get_pixel_checked(0, 0) else {
        return;
    };

    if alpha < BACKGROUND_MIN_ALPHA {
        return;
    }

    for pixel in image.pixels_mut() {
        let Rgba([r, g, b, a]) = *pixel;
        if a >= CLEARED_MIN_ALPHA
            && r.abs_diff(red) <= COLOR_TOLERANCE
            && g.abs_diff(green) <= COLOR_TOLERANCE
            && b.abs_diff(blue) <= COLOR_TOLERANCE
        {
            pixel.0[3] = 0;
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scaled_dimensions((width, height): (u32, u32), size: TargetSize) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (size.width, size.height);
    }

    let ratio = f64::min(
        f64::from(size.width) / f64::from(width),
        f64::from(size.height) / f64::from(height),
    );

    (
        ((f64::from(width) * ratio) as u32).max(1),
        ((f64::from(height) * ratio) as u32).max(1),
    )
}
