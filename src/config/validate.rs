//! Pluggable validation of populated configuration records.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

type Rule = Arc<dyn Fn(&dyn Any) -> Result<(), String> + Send + Sync>;

/// Registry of validation rules, keyed by record type.
///
/// A validator with no rules accepts every record.
///
/// ```
/// use configkit::Validator;
///
/// struct Server {
///     port: u16,
/// }
///
/// let mut validator = Validator::new();
/// validator.rule::<Server, _>("Port", |s| {
///     if s.port == 0 { Err("must be non-zero".into()) } else { Ok(()) }
/// });
///
/// let errors = validator.validate(&Server { port: 0 }).unwrap_err();
/// assert_eq!(errors.len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct Validator {
    rules: HashMap<TypeId, Vec<(String, Rule)>>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a check for records of type `T`, reported under `field`.
    pub fn rule<T, F>(&mut self, field: impl Into<String>, check: F) -> &mut Self
    where
        T: Any,
        F: Fn(&T) -> Result<(), String> + Send + Sync + 'static,
    {
        let rule: Rule = Arc::new(move |target: &dyn Any| match target.downcast_ref::<T>() {
            Some(target) => check(target),
            None => Ok(()),
        });
        self.rules
            .entry(TypeId::of::<T>())
            .or_default()
            .push((field.into(), rule));
        self
    }

    /// Runs every rule registered for `T`, collecting all failures.
    pub fn validate<T: Any>(&self, target: &T) -> Result<(), ValidationErrors> {
        let Some(rules) = self.rules.get(&TypeId::of::<T>()) else {
            return Ok(());
        };

        let violations: Vec<Violation> = rules
            .iter()
            .filter_map(|(field, rule)| {
                rule(target as &dyn Any).err().map(|message| Violation {
                    field: field.clone(),
                    message,
                })
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors { violations })
        }
    }

    /// Number of rules registered across all types.
    pub fn rule_count(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("rules", &self.rule_count())
            .finish()
    }
}

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every rule failure from one validation run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ValidationErrors {
    violations: Vec<Violation>,
}

impl ValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Messages reported for `field`.
    pub fn field(&self, field: &str) -> Vec<&str> {
        self.violations
            .iter()
            .filter(|v| v.field == field)
            .map(|v| v.message.as_str())
            .collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed: ")?;
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}
