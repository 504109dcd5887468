use std::path::PathBuf;
use thiserror::Error;

use super::validate::ValidationErrors;

/// Boxed cause carried by conversion failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid configuration target: {reason}")]
    Shape { reason: String },

    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("config data is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot flatten non-scalar value: {key}")]
    NonScalar { key: String },

    #[error(
        "missing {} configuration {}: {}",
        .keys.len(),
        key_noun(.keys.len()),
        .keys.join(", ")
    )]
    MissingKeys { keys: Vec<String> },

    #[error("resolve values: {0}")]
    Resolve(#[source] ResolutionError),

    #[error("unmarshal value: {0}")]
    Unmarshal(#[source] ConversionError),

    #[error(transparent)]
    Validation(#[from] ValidationErrors),
}

fn key_noun(count: usize) -> &'static str {
    if count == 1 {
        "key"
    } else {
        "keys"
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResolutionError {
    #[error("{key}: referenced key not found: {reference}")]
    Unresolved { key: String, reference: String },

    #[error("circular reference detected: {}", .chain.join(" -> "))]
    Cycle { chain: Vec<String> },

    #[error("{key}: unclosed reference (missing '}}')")]
    Unclosed { key: String },

    #[error("{key}: empty reference '${{}}'")]
    EmptyReference { key: String },
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConversionError {
    #[error("no value for key {key}")]
    Missing { key: String },

    #[error("key {key}: cannot parse {value:?} as {expected}: {source}")]
    Invalid {
        key: String,
        expected: &'static str,
        value: String,
        source: BoxError,
    },
}

impl ConversionError {
    /// The configuration key the failed conversion was reading.
    pub fn key(&self) -> &str {
        match self {
            Self::Missing { key } | Self::Invalid { key, .. } => key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_pluralizes() {
        let one = ConfigError::MissingKeys {
            keys: vec!["Port".into()],
        };
        assert_eq!(one.to_string(), "missing 1 configuration key: Port");

        let two = ConfigError::MissingKeys {
            keys: vec!["Port".into(), "Database__Name".into()],
        };
        assert_eq!(
            two.to_string(),
            "missing 2 configuration keys: Port, Database__Name"
        );
    }

    #[test]
    fn test_stage_context_prefixes_messages() {
        let err = ConfigError::Resolve(ResolutionError::Cycle {
            chain: vec!["a".into(), "b".into(), "a".into()],
        });
        assert_eq!(
            err.to_string(),
            "resolve values: circular reference detected: a -> b -> a"
        );

        let err = ConfigError::Unmarshal(ConversionError::Missing { key: "Port".into() });
        assert_eq!(err.to_string(), "unmarshal value: no value for key Port");
    }
}
