//! Typed, resource-safe bindings to libmagic, the file type recognition
//! engine behind `file(1)`.
//!
//! - [`Magic`] owns one engine handle and exposes every operation on it.
//! - [`Flag`] / [`FlagSet`] and [`Parameter`] / [`ParameterMap`] replace the
//!   engine's integer constants with named, ordered values.
//! - [`MagicError`] separates handle misuse, bad input and engine failure.

mod ffi;

pub mod config;
pub mod error;
pub mod flags;
pub mod magic;
pub mod parallel;
pub mod parameter;
pub mod render;
pub mod tracker;

pub use config::{ConfigError, MagicConfig, DEFAULT_DATABASE_FILE, DEFAULT_DATABASE_SOURCE};
pub use error::{MagicError, Result};
pub use flags::{Flag, FlagSet, UnknownFlag};
pub use magic::Magic;
pub use parallel::identify_files_parallel;
pub use parameter::{Parameter, ParameterMap, UnknownParameter};
pub use render::{results_to_string, types_to_string, version, IdentifyResults, TypesOfFiles};
pub use tracker::{Percentage, ProgressTracker};
