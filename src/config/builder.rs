use std::any::Any;
use std::borrow::Cow;
use std::path::Path;

use super::env::{prefixed_vars, Environment, ProcessEnv};
use super::file::{parse_data, parse_toml, read_file};
use super::map::Map;
use super::resolve::resolve_references;
use super::validate::Validator;
use super::walk::{Configurable, Fields};
use super::ConfigError;

/// Builder that assembles configuration from several sources and binds it
/// onto a [`Configurable`] record.
///
/// Sources are merged in call order, later sources overriding earlier ones
/// key-for-key. Defaults declared by the record sit underneath every
/// explicit source.
///
/// The first failing source is remembered and turns every later chained call
/// into a no-op. It surfaces from [`error`](Self::error) or
/// [`build`](Self::build).
///
/// ## Variable References
///
/// Values can reference other keys using `${Section.field}` or
/// `${Section__field}`:
///
/// ```text
/// Server__Host=localhost
/// Server__Port=8080
/// Server__Url=http://${Server.Host}:${Server.Port}/api
/// ```
///
/// Use `$$` to escape a literal `$` (e.g., `$${VAR}` becomes `${VAR}`).
///
/// ## Example
///
/// ```no_run
/// use configkit::{Builder, Configurable, Fields};
///
/// #[derive(Default)]
/// struct MyConfig {
///     host: String,
///     port: u16,
/// }
///
/// impl Configurable for MyConfig {
///     fn describe<'a>(&'a mut self, fields: &mut Fields<'a>) {
///         fields.field("Host", &mut self.host).default("localhost");
///         fields.field("Port", &mut self.port);
///     }
/// }
///
/// let mut config = MyConfig::default();
/// Builder::new()
///     .merge_file("config/default.conf")
///     .merge_optional_file("config/local.conf")
///     .merge_environ("MYAPP_")
///     .build(&mut config)?;
/// # Ok::<(), configkit::ConfigError>(())
/// ```
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct Builder {
    error: Option<ConfigError>,
    values: Map,
    validator: Option<Validator>,
}

impl Builder {
    /// Creates a new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// The error recorded by an earlier chained call, if any.
    pub fn error(&self) -> Option<&ConfigError> {
        self.error.as_ref()
    }

    /// The explicitly supplied values merged so far, without defaults.
    pub fn values(&self) -> &Map {
        &self.values
    }

    fn has_error(&self) -> bool {
        if let Some(err) = &self.error {
            tracing::warn!(error = %err, "skipping config source after earlier failure");
            return true;
        }
        false
    }

    fn fail(mut self, err: ConfigError) -> Self {
        tracing::debug!(error = %err, "config source failed");
        self.error = Some(err);
        self
    }

    /// Sets a single value.
    pub fn set(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if self.has_error() {
            return self;
        }

        let mut map = Map::new();
        map.set(key, value);
        self.merge_map(map)
    }

    /// Merges a flat `key=value` file.
    ///
    /// A file that cannot be read is recorded as the builder's error.
    pub fn merge_file(self, path: impl AsRef<Path>) -> Self {
        if self.has_error() {
            return self;
        }

        match read_file(path.as_ref(), true) {
            Ok(Some(data)) => self.merge_data(data),
            Ok(None) => self,
            Err(err) => self.fail(err),
        }
    }

    /// Like [`merge_file`](Self::merge_file), but a missing file is skipped.
    pub fn merge_optional_file(self, path: impl AsRef<Path>) -> Self {
        if self.has_error() {
            return self;
        }

        match read_file(path.as_ref(), false) {
            Ok(Some(data)) => self.merge_data(data),
            Ok(None) => {
                tracing::debug!(path = %path.as_ref().display(), "optional config file not found");
                self
            }
            Err(err) => self.fail(err),
        }
    }

    /// Merges line-oriented `key=value` data.
    ///
    /// Blank lines and `#` comments are ignored; a line without `=` sets an
    /// empty value.
    pub fn merge_data(self, data: impl AsRef<[u8]>) -> Self {
        if self.has_error() {
            return self;
        }

        match parse_data(data.as_ref()) {
            Ok(map) => self.merge_map(map),
            Err(err) => self.fail(err),
        }
    }

    /// Merges a TOML file, flattening nested tables into `__`-joined keys.
    pub fn merge_toml_file(self, path: impl AsRef<Path>) -> Self {
        if self.has_error() {
            return self;
        }

        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(contents) => self.merge_toml(&contents),
            Err(source) => self.fail(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Merges a TOML document, flattening nested tables into `__`-joined keys.
    pub fn merge_toml(self, contents: &str) -> Self {
        if self.has_error() {
            return self;
        }

        match parse_toml(contents) {
            Ok(map) => self.merge_map(map),
            Err(err) => self.fail(err),
        }
    }

    /// Merges process environment variables whose name starts with `prefix`.
    ///
    /// The prefix is stripped from each name, so with prefix `MYAPP_` the
    /// variable `MYAPP_Database__Port` sets the key `Database__Port`.
    pub fn merge_environ(self, prefix: &str) -> Self {
        self.merge_environ_from(prefix, &ProcessEnv)
    }

    /// Like [`merge_environ`](Self::merge_environ), reading from `env`.
    pub fn merge_environ_from(self, prefix: &str, env: &(impl Environment + ?Sized)) -> Self {
        if self.has_error() {
            return self;
        }

        let map = prefixed_vars(env, prefix);
        tracing::debug!(prefix, count = map.len(), "merging environment variables");
        self.merge_map(map)
    }

    /// Merges arbitrary key/value pairs. Every other source funnels through
    /// here.
    pub fn merge_map<K, V>(mut self, map: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        if self.has_error() {
            return self;
        }

        self.values.extend(map);
        self
    }

    /// Replaces the validator run at the end of [`build`](Self::build).
    pub fn with_validator(mut self, validator: Validator) -> Self {
        if self.has_error() {
            return self;
        }

        self.validator = Some(validator);
        self
    }

    /// Adjusts the validator in place, creating a default one first if
    /// none is attached.
    pub fn map_validator(mut self, f: impl FnOnce(&mut Validator)) -> Self {
        if self.has_error() {
            return self;
        }

        f(self.validator.get_or_insert_with(Validator::new));
        self
    }

    /// The attached validator, or a fresh default one.
    pub fn validator(&self) -> Cow<'_, Validator> {
        match &self.validator {
            Some(validator) => Cow::Borrowed(validator),
            None => Cow::Owned(Validator::new()),
        }
    }

    /// Populates `target` from defaults and the merged sources, then
    /// validates it.
    ///
    /// Fails if `target` describes itself inconsistently, if a source failed
    /// earlier, if any field has no value, if a reference cannot be resolved,
    /// if a value does not parse as its field's type, or if validation
    /// rejects the result.
    pub fn build<T: Configurable + Any>(self, target: &mut T) -> Result<(), ConfigError> {
        let walk = Fields::walk(target)?;

        if let Some(err) = self.error {
            return Err(err);
        }

        let mut values = walk.defaults;
        tracing::debug!(
            fields = walk.fields.len(),
            defaults = values.len(),
            explicit = self.values.len(),
            "building configuration"
        );
        values.merge(self.values);

        let missing: Vec<String> = walk
            .fields
            .iter()
            .filter(|field| !values.contains_key(&field.key))
            .map(|field| field.key.clone())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingKeys { keys: missing });
        }

        resolve_references(&mut values).map_err(ConfigError::Resolve)?;

        for field in walk.fields {
            values
                .unmarshal(&field.key, field.slot)
                .map_err(ConfigError::Unmarshal)?;
        }

        match self.validator {
            Some(validator) => validator.validate(target)?,
            None => Validator::new().validate(target)?,
        }

        Ok(())
    }

    /// Builds into `T::default()` and returns it.
    pub fn build_default<T: Configurable + Any + Default>(self) -> Result<T, ConfigError> {
        let mut target = T::default();
        self.build(&mut target)?;
        Ok(target)
    }

    /// Like [`build`](Self::build), but panics on failure.
    ///
    /// For start-up code where running with bad configuration is not an
    /// option.
    pub fn must_build<T: Configurable + Any>(self, target: &mut T) {
        if let Err(err) = self.build(target) {
            panic!("configuration failed: {err}");
        }
    }
}
