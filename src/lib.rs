//! Merge configuration from files, the environment and explicit values, then
//! bind it onto a typed record.

pub mod config;

pub use config::{
    BoxError, Builder, ConfigError, ConfigValue, Configurable, DefaultConfig, Environment, Fields,
    Map, StaticEnv, ValidationErrors, Validator,
};
