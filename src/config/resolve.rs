//! Variable reference resolution for configuration values.
//!
//! Supports `${Section__field}` (or `${Section.field}`) syntax for
//! cross-referencing values within the merged mapping.
//! Use `$${...}` to escape and produce a literal `${...}`.

use std::collections::BTreeMap;
use std::iter::Peekable;
use std::str::Chars;

use super::error::ResolutionError;
use super::map::Map;
use super::SEPARATOR;

/// One piece of a parsed value: literal text or a reference to another key.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Ref(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    InProgress,
    Done,
}

/// Resolves every `${...}` reference in `map`, in place.
///
/// Each key is finalized only after the keys it references. A reference to a
/// missing key or a reference cycle is an error; nothing loops. Resolution
/// keeps its own work stack, so chain length is bounded by memory only.
pub fn resolve_references(map: &mut Map) -> Result<(), ResolutionError> {
    let mut parsed = BTreeMap::new();
    for (key, value) in map.iter() {
        parsed.insert(key.to_string(), parse_value(key, value)?);
    }

    let mut resolver = Resolver {
        parsed: &parsed,
        state: BTreeMap::new(),
        resolved: BTreeMap::new(),
    };
    for key in parsed.keys() {
        resolver.resolve(key)?;
    }

    let Resolver { resolved, .. } = resolver;
    for (key, value) in resolved {
        map.set(key, value);
    }
    Ok(())
}

struct Resolver<'p> {
    parsed: &'p BTreeMap<String, Vec<Segment>>,
    state: BTreeMap<&'p str, State>,
    resolved: BTreeMap<&'p str, String>,
}

/// A key whose value is being assembled.
struct Frame<'p> {
    key: &'p str,
    segments: &'p [Segment],
    next: usize,
    value: String,
}

enum Step<'p> {
    Descend(&'p str),
    Cycle(&'p str),
    Finish,
}

impl<'p> Resolver<'p> {
    fn resolve(&mut self, root: &'p str) -> Result<(), ResolutionError> {
        if self.state.contains_key(root) {
            return Ok(());
        }
        let Some(frame) = self.enter(root) else {
            return Ok(());
        };
        let mut work = vec![frame];

        loop {
            let step = {
                let Some(frame) = work.last_mut() else {
                    return Ok(());
                };
                let mut step = Step::Finish;
                while let Some(segment) = frame.segments.get(frame.next) {
                    match segment {
                        Segment::Text(text) => frame.value.push_str(text),
                        Segment::Ref(reference) => {
                            let target = find_key(self.parsed, reference).ok_or_else(|| {
                                ResolutionError::Unresolved {
                                    key: frame.key.to_string(),
                                    reference: reference.clone(),
                                }
                            })?;
                            match self.state.get(target) {
                                Some(State::Done) => {
                                    if let Some(resolved) = self.resolved.get(target) {
                                        frame.value.push_str(resolved);
                                    }
                                }
                                Some(State::InProgress) => {
                                    step = Step::Cycle(target);
                                    break;
                                }
                                None => {
                                    step = Step::Descend(target);
                                    break;
                                }
                            }
                        }
                    }
                    frame.next += 1;
                }
                step
            };

            match step {
                // The referencing segment is revisited once `target` is done.
                Step::Descend(target) => {
                    if let Some(frame) = self.enter(target) {
                        work.push(frame);
                    }
                }
                Step::Cycle(target) => {
                    let start = work.iter().position(|f| f.key == target).unwrap_or(0);
                    let mut chain: Vec<String> =
                        work[start..].iter().map(|f| f.key.to_string()).collect();
                    chain.push(target.to_string());
                    return Err(ResolutionError::Cycle { chain });
                }
                Step::Finish => {
                    if let Some(frame) = work.pop() {
                        self.state.insert(frame.key, State::Done);
                        self.resolved.insert(frame.key, frame.value);
                    }
                }
            }
        }
    }

    fn enter(&mut self, key: &'p str) -> Option<Frame<'p>> {
        let (key, segments) = self.parsed.get_key_value(key)?;
        let key = key.as_str();
        self.state.insert(key, State::InProgress);
        Some(Frame {
            key,
            segments,
            next: 0,
            value: String::new(),
        })
    }
}

/// Finds the key a reference names: the literal text first, then with `.`
/// read as the separator, so `Database.Port` reaches `Database__Port`.
fn find_key<'p>(parsed: &'p BTreeMap<String, Vec<Segment>>, reference: &str) -> Option<&'p str> {
    parsed
        .get_key_value(reference)
        .or_else(|| parsed.get_key_value(reference.replace('.', SEPARATOR).as_str()))
        .map(|(key, _)| key.as_str())
}

/// Splits a raw value into literal text and references.
/// Handles `$$` escape sequences.
fn parse_value(key: &str, raw: &str) -> Result<Vec<Segment>, ResolutionError> {
    let mut segments = Vec::new();
    let mut text = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            text.push(ch);
            continue;
        }

        match chars.peek() {
            Some('$') => {
                // Escape sequence: $$ -> $
                chars.next();
                text.push('$');
            }
            Some('{') => {
                chars.next();
                let reference = consume_until(&mut chars, '}').ok_or_else(|| {
                    ResolutionError::Unclosed {
                        key: key.to_string(),
                    }
                })?;
                if reference.is_empty() {
                    return Err(ResolutionError::EmptyReference {
                        key: key.to_string(),
                    });
                }
                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                segments.push(Segment::Ref(reference));
            }
            _ => text.push('$'),
        }
    }

    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    Ok(segments)
}

/// Consumes characters until the delimiter, returning the collected string.
fn consume_until(chars: &mut Peekable<Chars<'_>>, delim: char) -> Option<String> {
    let mut result = String::new();
    for ch in chars.by_ref() {
        if ch == delim {
            return Some(result);
        }
        result.push(ch);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(entries: &[(&str, &str)]) -> Result<Map, ResolutionError> {
        let mut map: Map = entries.iter().copied().collect();
        resolve_references(&mut map)?;
        Ok(map)
    }

    #[test]
    fn test_simple_reference() {
        let map = resolved(&[("host", "localhost"), ("url", "http://${host}/api")]).unwrap();
        assert_eq!(map.lookup("url"), Some("http://localhost/api"));
        assert_eq!(map.lookup("host"), Some("localhost"));
    }

    #[test]
    fn test_nested_key_reference() {
        let map = resolved(&[
            ("Server__Host", "example.com"),
            ("Server__Port", "8080"),
            ("Client__Endpoint", "https://${Server.Host}:${Server__Port}"),
        ])
        .unwrap();
        assert_eq!(
            map.lookup("Client__Endpoint"),
            Some("https://example.com:8080")
        );
    }

    #[test]
    fn test_chained_references_resolve_out_of_order() {
        let map = resolved(&[("a", "${b}!"), ("b", "${c} world"), ("c", "hello")]).unwrap();
        assert_eq!(map.lookup("a"), Some("hello world!"));
        assert_eq!(map.lookup("b"), Some("hello world"));
    }

    #[test]
    fn test_escape_sequence() {
        let map = resolved(&[("value", "use $${VAR} for env vars, costs $5")]).unwrap();
        assert_eq!(map.lookup("value"), Some("use ${VAR} for env vars, costs $5"));
    }

    #[test]
    fn test_escaped_text_is_not_rescanned() {
        let map = resolved(&[("a", "$${b}"), ("c", "${a}")]).unwrap();
        assert_eq!(map.lookup("c"), Some("${b}"));
    }

    #[test]
    fn test_circular_reference() {
        let err = resolved(&[("a", "${b}"), ("b", "${a}")]).unwrap_err();
        assert_eq!(
            err,
            ResolutionError::Cycle {
                chain: vec!["a".into(), "b".into(), "a".into()]
            }
        );
    }

    #[test]
    fn test_self_reference() {
        let err = resolved(&[("a", "x${a}")]).unwrap_err();
        assert!(matches!(err, ResolutionError::Cycle { .. }));
    }

    #[test]
    fn test_missing_reference() {
        let err = resolved(&[("url", "${nonexistent.path}")]).unwrap_err();
        assert_eq!(
            err,
            ResolutionError::Unresolved {
                key: "url".into(),
                reference: "nonexistent.path".into(),
            }
        );
    }

    #[test]
    fn test_unclosed_and_empty_references() {
        assert!(matches!(
            resolved(&[("a", "${b")]).unwrap_err(),
            ResolutionError::Unclosed { .. }
        ));
        assert!(matches!(
            resolved(&[("a", "${}")]).unwrap_err(),
            ResolutionError::EmptyReference { .. }
        ));
    }

    #[test]
    fn test_dotted_key_is_found_literally() {
        let map = resolved(&[("db.host", "example"), ("Url", "http://${db.host}/")]).unwrap();
        assert_eq!(map.lookup("Url"), Some("http://example/"));
    }

    #[test]
    fn test_literal_key_wins_over_separator_form() {
        let map = resolved(&[("a.b", "dotted"), ("a__b", "nested"), ("c", "${a.b}")]).unwrap();
        assert_eq!(map.lookup("c"), Some("dotted"));
    }

    #[test]
    fn test_long_chain_resolves_without_recursion() {
        const LEN: usize = 100_000;
        let mut map = Map::new();
        map.set("k0", "end");
        for i in 1..LEN {
            map.set(format!("k{i}"), format!("${{k{}}}", i - 1));
        }
        map.set("Url", format!("${{k{}}}", LEN - 1));

        resolve_references(&mut map).unwrap();
        assert_eq!(map.lookup("Url"), Some("end"));
        assert_eq!(map.lookup("k50000"), Some("end"));
    }

    #[test]
    fn test_long_cycle_is_reported() {
        const LEN: usize = 100_000;
        let mut map = Map::new();
        for i in 0..LEN {
            map.set(format!("k{i}"), format!("${{k{}}}", (i + 1) % LEN));
        }

        match resolve_references(&mut map).unwrap_err() {
            ResolutionError::Cycle { chain } => {
                assert_eq!(chain.len(), LEN + 1);
                assert_eq!(chain.first(), chain.last());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_plain_values_untouched() {
        let map = resolved(&[("a", "plain"), ("b", "")]).unwrap();
        assert_eq!(map, Map::from([("a", "plain"), ("b", "")]));
    }
}
