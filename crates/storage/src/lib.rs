#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

pub mod catalog;
pub mod image_finder;
pub mod log;
pub mod lru;
pub mod settings;
pub mod thumbnail;

pub use catalog::{CatalogEntry, CatalogError, JsonCatalog, LayeredSource};
pub use image_finder::DocumentTreeFinder;
pub use lru::LruCache;
pub use settings::{Resolver, Services, Settings, SettingsError};
pub use thumbnail::{
    FreedesktopThumbnailer, NoSystemThumbnailer, SizeError, SystemThumbnailer, TargetSize,
    ThumbnailCache, ThumbnailError,
};
