//! File-based configuration sources: flat `key=value` data and TOML.

use std::path::Path;

use toml::{Table, Value};

use super::map::Map;
use super::{ConfigError, SEPARATOR};

/// Parses line-oriented `key=value` data.
///
/// Blank lines and lines starting with `#` are skipped. Each remaining line
/// is split on its first `=`; a line with an empty key is ignored and a line
/// without `=` is a key with an empty value.
pub fn parse_data(data: &[u8]) -> Result<Map, ConfigError> {
    let text = std::str::from_utf8(data)?;
    let mut map = Map::new();

    for line in text.split('\n') {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (key, value) = line.split_once('=').unwrap_or((line, ""));
        if key.is_empty() {
            continue;
        }
        map.set(key, value);
    }

    Ok(map)
}

/// Reads a whole file.
///
/// Returns `Ok(None)` if the file doesn't exist and `required` is false.
pub fn read_file(path: &Path, required: bool) -> Result<Option<Vec<u8>>, ConfigError> {
    match std::fs::read(path) {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => Ok(None),
        Err(e) => Err(ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Parses a TOML document and flattens nested tables into `__`-joined keys.
pub fn parse_toml(contents: &str) -> Result<Map, ConfigError> {
    let table: Table = toml::from_str(contents)?;
    let mut map = Map::new();
    flatten(&mut map, "", table)?;
    Ok(map)
}

fn flatten(map: &mut Map, prefix: &str, table: Table) -> Result<(), ConfigError> {
    for (name, value) in table {
        let key = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}{SEPARATOR}{name}")
        };
        match value {
            Value::Table(nested) => flatten(map, &key, nested)?,
            scalar => {
                let rendered = value_to_string(scalar, &key)?;
                map.set(key, rendered);
            }
        }
    }
    Ok(())
}

/// Converts a TOML scalar to its string representation.
fn value_to_string(value: Value, key: &str) -> Result<String, ConfigError> {
    match value {
        Value::String(s) => Ok(s),
        Value::Integer(i) => Ok(i.to_string()),
        Value::Float(f) => Ok(f.to_string()),
        Value::Boolean(b) => Ok(b.to_string()),
        Value::Datetime(dt) => Ok(dt.to_string()),
        Value::Array(_) | Value::Table(_) => Err(ConfigError::NonScalar {
            key: key.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_data_comments_blanks_and_barewords() {
        let map = parse_data(b"# comment\n\nkey=value\nbareword\n").unwrap();
        assert_eq!(map, Map::from([("key", "value"), ("bareword", "")]));
    }

    #[test]
    fn test_parse_data_splits_on_first_equals_only() {
        let map = parse_data(b"url=postgres://u:p@h/db?sslmode=require\n").unwrap();
        assert_eq!(
            map.lookup("url"),
            Some("postgres://u:p@h/db?sslmode=require")
        );
    }

    #[test]
    fn test_parse_data_ignores_empty_keys_and_trims_lines() {
        let map = parse_data(b"=orphan\n   # indented comment\n  Port=80  \r\nA= spaced\n").unwrap();
        assert_eq!(map, Map::from([("Port", "80"), ("A", " spaced")]));
    }

    #[test]
    fn test_parse_data_last_line_wins() {
        let map = parse_data(b"a=1\na=2").unwrap();
        assert_eq!(map.lookup("a"), Some("2"));
    }

    #[test]
    fn test_parse_data_rejects_invalid_utf8() {
        assert!(matches!(
            parse_data(&[b'a', b'=', 0xff]),
            Err(ConfigError::Encoding(_))
        ));
    }

    #[test]
    fn test_parse_data_round_trips_serialized_map() {
        let original = Map::from([("Host", "db"), ("Empty", ""), ("Url", "a=b")]);
        let serialized: String = original
            .iter()
            .map(|(k, v)| format!("{k}={v}\n"))
            .collect();
        assert_eq!(parse_data(serialized.as_bytes()).unwrap(), original);
    }

    #[test]
    fn test_read_file_loads_contents() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "key=value").unwrap();

        let data = read_file(file.path(), true).unwrap().unwrap();
        assert_eq!(data, b"key=value\n");
    }

    #[test]
    fn test_read_file_required_missing() {
        let result = read_file(Path::new("/nonexistent/path/app.conf"), true);
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_read_file_optional_missing() {
        let result = read_file(Path::new("/nonexistent/path/app.conf"), false).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_parse_toml_flattens_tables() {
        let map = parse_toml(
            r#"
            name = "svc"
            debug = true

            [Database]
            Port = 5432
            Ratio = 0.5

            [Database.Pool]
            Size = 8
            "#,
        )
        .unwrap();

        assert_eq!(
            map,
            Map::from([
                ("name", "svc"),
                ("debug", "true"),
                ("Database__Port", "5432"),
                ("Database__Ratio", "0.5"),
                ("Database__Pool__Size", "8"),
            ])
        );
    }

    #[test]
    fn test_parse_toml_rejects_arrays() {
        let err = parse_toml("hosts = [\"a\", \"b\"]").unwrap_err();
        assert!(matches!(err, ConfigError::NonScalar { ref key } if key == "hosts"));
    }

    #[test]
    fn test_parse_toml_reports_syntax_errors() {
        assert!(matches!(parse_toml("= broken"), Err(ConfigError::Parse(_))));
    }
}
