//! Conversion of raw configuration strings into typed field values.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;

use super::error::{BoxError, ConversionError};

/// A type that can be parsed from a single configuration value.
///
/// Implement this for custom field types to make them assignable by the
/// builder.
///
/// ```
/// use configkit::ConfigValue;
///
/// struct Level(u8);
///
/// impl ConfigValue for Level {
///     const TYPE_NAME: &'static str = "level";
///
///     fn parse_config(raw: &str) -> Result<Self, configkit::BoxError> {
///         match raw {
///             "low" => Ok(Level(0)),
///             "high" => Ok(Level(9)),
///             other => Err(format!("unknown level {other}").into()),
///         }
///     }
/// }
/// ```
pub trait ConfigValue: Sized {
    /// Name reported in conversion errors.
    const TYPE_NAME: &'static str;

    fn parse_config(raw: &str) -> Result<Self, BoxError>;
}

/// A settable handle to one field of a configuration record.
pub trait Slot {
    /// Parses `raw` and stores it, reporting failures against `key`.
    fn assign(&mut self, key: &str, raw: &str) -> Result<(), ConversionError>;

    fn type_name(&self) -> &'static str;
}

impl<T: ConfigValue> Slot for T {
    fn assign(&mut self, key: &str, raw: &str) -> Result<(), ConversionError> {
        *self = T::parse_config(raw).map_err(|source| ConversionError::Invalid {
            key: key.to_string(),
            expected: T::TYPE_NAME,
            value: raw.to_string(),
            source,
        })?;
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        T::TYPE_NAME
    }
}

impl ConfigValue for String {
    const TYPE_NAME: &'static str = "string";

    fn parse_config(raw: &str) -> Result<Self, BoxError> {
        Ok(raw.to_string())
    }
}

impl ConfigValue for bool {
    const TYPE_NAME: &'static str = "bool";

    fn parse_config(raw: &str) -> Result<Self, BoxError> {
        match raw {
            "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
            "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
            _ => Err("expected one of 1, t, true, 0, f, false".into()),
        }
    }
}

macro_rules! from_str_value {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl ConfigValue for $ty {
                const TYPE_NAME: &'static str = $name;

                fn parse_config(raw: &str) -> Result<Self, BoxError> {
                    Ok(raw.parse::<$ty>()?)
                }
            }
        )*
    };
}

from_str_value! {
    i8 => "i8", i16 => "i16", i32 => "i32", i64 => "i64", i128 => "i128", isize => "isize",
    u8 => "u8", u16 => "u16", u32 => "u32", u64 => "u64", u128 => "u128", usize => "usize",
    f32 => "f32", f64 => "f64",
    char => "char",
    IpAddr => "IP address",
    Ipv4Addr => "IPv4 address",
    Ipv6Addr => "IPv6 address",
    SocketAddr => "socket address",
}

impl ConfigValue for PathBuf {
    const TYPE_NAME: &'static str = "path";

    fn parse_config(raw: &str) -> Result<Self, BoxError> {
        Ok(PathBuf::from(raw))
    }
}
