#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

mod error;
mod exercise;
mod index;
pub mod muscle;
pub mod normalize;
mod resolver;
pub mod variant;

pub use error::SourceError;
pub use exercise::{
    ExerciseRecord, ExerciseSource, ImageFinder, ImageRef, NoImageFinder, Provenance,
    SourceRecord,
};
pub use index::{ExerciseIndex, SUBSTRING_FALLBACK_THRESHOLD};
pub use muscle::{MuscleGroupRegistry, registry};
pub use normalize::normalize;
pub use resolver::{DOCUMENT_ROOT_NAME, ExerciseResolver};
pub use variant::{NameVariants, variants};
