//! Field discovery for configuration records.
//!
//! Rust has no runtime reflection, so a record describes its own fields by
//! implementing [`Configurable`]. The walker turns that description into a
//! list of settable leaves and a set of declared defaults.

use super::error::ConfigError;
use super::map::Map;
use super::value::Slot;
use super::SEPARATOR;

/// A record the builder can populate.
///
/// ```
/// use configkit::{Configurable, Fields};
///
/// #[derive(Default)]
/// struct Database {
///     host: String,
///     port: u16,
/// }
///
/// impl Configurable for Database {
///     fn describe<'a>(&'a mut self, fields: &mut Fields<'a>) {
///         fields.field("Host", &mut self.host).default("localhost");
///         fields.field("Port", &mut self.port);
///     }
/// }
/// ```
pub trait Configurable {
    /// Registers every configurable field of `self` with `fields`, in
    /// declaration order.
    fn describe<'a>(&'a mut self, fields: &mut Fields<'a>);
}

/// A type that supplies its own defaults, keyed relative to where it sits in
/// the record.
///
/// Register it from [`Configurable::describe`] with
/// [`Fields::default_config`] before describing the fields.
pub trait DefaultConfig {
    fn default_config(&self) -> Map;
}

/// One assignable leaf discovered during a walk.
pub struct Field<'a> {
    pub key: String,
    pub default: Option<String>,
    pub slot: &'a mut dyn Slot,
}

impl std::fmt::Debug for Field<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("key", &self.key)
            .field("default", &self.default)
            .field("type", &self.slot.type_name())
            .finish()
    }
}

/// Result of walking a record: its leaves and the defaults it declares.
#[derive(Debug)]
pub struct Walk<'a> {
    pub fields: Vec<Field<'a>>,
    pub defaults: Map,
}

/// Collector handed to [`Configurable::describe`].
pub struct Fields<'a> {
    path: Vec<String>,
    fields: Vec<Field<'a>>,
    defaults: Map,
    error: Option<ConfigError>,
}

impl<'a> Fields<'a> {
    /// Walks `target`, collecting its leaves and defaults.
    pub fn walk<T: Configurable + ?Sized>(target: &'a mut T) -> Result<Walk<'a>, ConfigError> {
        let mut fields = Fields {
            path: Vec::new(),
            fields: Vec::new(),
            defaults: Map::new(),
            error: None,
        };
        target.describe(&mut fields);

        match fields.error {
            Some(err) => Err(err),
            None => Ok(Walk {
                fields: fields.fields,
                defaults: fields.defaults,
            }),
        }
    }

    /// Registers an assignable leaf named `name`.
    pub fn field<T: Slot>(&mut self, name: &str, slot: &'a mut T) -> FieldDefault<'_, 'a> {
        let index = match self.key_for(name) {
            Some(key) if self.fields.iter().any(|f| f.key == key) => {
                self.fail(format!("field {key} is registered twice"));
                None
            }
            Some(key) => {
                self.fields.push(Field {
                    key,
                    default: None,
                    slot,
                });
                Some(self.fields.len() - 1)
            }
            None => None,
        };
        FieldDefault {
            fields: self,
            index,
        }
    }

    /// Descends into a nested record stored under `name`.
    pub fn nested<T: Configurable + ?Sized>(&mut self, name: &str, record: &'a mut T) {
        if self.key_for(name).is_none() {
            return;
        }
        self.path.push(name.to_string());
        record.describe(self);
        self.path.pop();
    }

    /// Merges `source`'s own defaults, prefixed with the current path.
    pub fn default_config<T: DefaultConfig + ?Sized>(&mut self, source: &T) {
        let prefix = self.path.join(SEPARATOR);
        for (key, value) in source.default_config() {
            let key = if prefix.is_empty() {
                key
            } else {
                format!("{prefix}{SEPARATOR}{key}")
            };
            self.defaults.set(key, value);
        }
    }

    /// Declares a default for `name` without an assignable field behind it.
    pub fn default_value(&mut self, name: &str, value: impl Into<String>) {
        if let Some(key) = self.key_for(name) {
            self.defaults.set(key, value);
        }
    }

    /// Joins `name` onto the current path, rejecting malformed names.
    fn key_for(&mut self, name: &str) -> Option<String> {
        if name.is_empty() {
            self.fail(format!("empty field name under '{}'", self.path.join(SEPARATOR)));
            return None;
        }
        if name.contains(SEPARATOR) {
            self.fail(format!("field name {name} contains separator '{SEPARATOR}'"));
            return None;
        }
        if self.path.is_empty() {
            Some(name.to_string())
        } else {
            Some(format!("{}{SEPARATOR}{name}", self.path.join(SEPARATOR)))
        }
    }

    fn fail(&mut self, reason: String) {
        if self.error.is_none() {
            self.error = Some(ConfigError::Shape { reason });
        }
    }
}

/// Returned by [`Fields::field`] to attach a declared default.
pub struct FieldDefault<'f, 'a> {
    fields: &'f mut Fields<'a>,
    index: Option<usize>,
}

impl FieldDefault<'_, '_> {
    pub fn default(self, value: impl Into<String>) {
        let Some(index) = self.index else {
            return;
        };
        let fields = self.fields;
        let Some(field) = fields.fields.get_mut(index) else {
            return;
        };
        let value = value.into();
        field.default = Some(value.clone());
        fields.defaults.set(field.key.clone(), value);
    }
}
