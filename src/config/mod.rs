//! Configuration assembly: merging sources and binding them onto records.

mod builder;
mod env;
mod error;
mod file;
mod map;
mod resolve;
mod validate;
mod value;
mod walk;

pub use builder::Builder;
pub use env::{Environment, ProcessEnv, StaticEnv};
pub use error::{BoxError, ConfigError, ConversionError, ResolutionError};
pub use file::{parse_data, parse_toml};
pub use map::Map;
pub use resolve::resolve_references;
pub use validate::{ValidationErrors, Validator, Violation};
pub use value::{ConfigValue, Slot};
pub use walk::{Configurable, DefaultConfig, Field, FieldDefault, Fields, Walk};

/// Joins the segments of a nested key, e.g. `Database__Port`.
pub const SEPARATOR: &str = "__";
