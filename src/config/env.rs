//! Environment snapshots for [`Builder::merge_environ`](super::Builder::merge_environ).

use super::map::Map;

/// A source of environment variables.
///
/// The process environment is the default; tests and embedders can supply
/// a [`StaticEnv`] instead.
pub trait Environment {
    fn vars(&self) -> Vec<(String, String)>;
}

/// The environment of the running process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    /// Non UTF-8 values are decoded lossily; entries with a non UTF-8 name
    /// cannot be addressed by key and are dropped.
    fn vars(&self) -> Vec<(String, String)> {
        std::env::vars_os()
            .filter_map(|(name, value)| {
                let name = match name.into_string() {
                    Ok(name) => name,
                    Err(name) => {
                        tracing::warn!(name = ?name, "skipping environment variable with non UTF-8 name");
                        return None;
                    }
                };
                let value = match value.into_string() {
                    Ok(value) => value,
                    Err(value) => {
                        tracing::warn!(%name, "environment variable value is not UTF-8, decoding lossily");
                        value.to_string_lossy().into_owned()
                    }
                };
                Some((name, value))
            })
            .collect()
    }
}

/// A fixed set of environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticEnv {
    vars: Vec<(String, String)>,
}

impl StaticEnv {
    pub fn new<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Builds a snapshot from raw `NAME=VALUE` entries.
    ///
    /// An entry without `=` is a variable with an empty value.
    pub fn from_entries<S: AsRef<str>>(entries: impl IntoIterator<Item = S>) -> Self {
        Self {
            vars: entries
                .into_iter()
                .map(|entry| match entry.as_ref().split_once('=') {
                    Some((name, value)) => (name.to_string(), value.to_string()),
                    None => (entry.as_ref().to_string(), String::new()),
                })
                .collect(),
        }
    }
}

impl Environment for StaticEnv {
    fn vars(&self) -> Vec<(String, String)> {
        self.vars.clone()
    }
}

/// Collects the variables whose name starts with `prefix`, prefix removed.
///
/// Matching is literal and case-sensitive.
pub fn prefixed_vars(env: &(impl Environment + ?Sized), prefix: &str) -> Map {
    env.vars()
        .into_iter()
        .filter_map(|(name, value)| {
            let key = name.strip_prefix(prefix)?;
            Some((key.to_string(), value))
        })
        .collect()
}
