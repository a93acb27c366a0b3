//! Component key normalization
//!
//! Component keys are paths of segments joined by [`SEPARATOR`]. Callers may also
//! spell paths with `\`, `::` or `.` between segments (namespace style, Rust path style
//! or dotted config style); all of them normalize to the same key.

use crate::{DiError, Result};

/// Reserved separator between the segments of a qualified component key.
pub const SEPARATOR: char = '|';

/// Delimiters accepted in requested names besides [`SEPARATOR`].
const INPUT_DELIMITERS: [char; 3] = [SEPARATOR, '\\', '.'];

/// Prefix marking a parameter-name key (`$name`) in contextual bindings and annotations.
pub const PARAMETER_PREFIX: char = '$';

/// Split a requested name into its path segments.
///
/// Empty segments (a leading `\`, doubled delimiters) are dropped. Parameter keys
/// (`$name`) are never split.
pub fn segments(name: &str) -> Vec<String> {
    let name = name.trim();
    if is_parameter_key(name) {
        return vec![name.to_string()];
    }
    name.replace("::", "|")
        .split(INPUT_DELIMITERS)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Normalize a name into its `|`-joined key form.
#[inline]
pub fn normalize(name: &str) -> String {
    join(&segments(name))
}

/// Join path segments into a key.
#[inline]
pub fn join<S: AsRef<str>>(segments: &[S]) -> String {
    let mut key = String::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            key.push(SEPARATOR);
        }
        key.push_str(segment.as_ref());
    }
    key
}

/// Split a normalized key back into segments.
#[inline]
pub fn split(key: &str) -> impl Iterator<Item = &str> {
    key.split(SEPARATOR).filter(|segment| !segment.is_empty())
}

/// Whether the name is a `$param` key rather than a component path.
#[inline]
pub fn is_parameter_key(name: &str) -> bool {
    name.starts_with(PARAMETER_PREFIX)
}

/// Build the `$name` key for a parameter or property name.
#[inline]
pub fn parameter_key(name: &str) -> String {
    if is_parameter_key(name) {
        name.to_string()
    } else {
        format!("{PARAMETER_PREFIX}{name}")
    }
}

/// The last segment of a key (the short name).
#[inline]
pub fn short_name(key: &str) -> &str {
    key.rsplit(SEPARATOR).next().unwrap_or(key)
}

/// The key without its last segment (the namespace), if any.
#[inline]
pub fn namespace(key: &str) -> Option<&str> {
    key.rfind(SEPARATOR).map(|idx| &key[..idx])
}

/// Expand one raw configuration segment into key segments.
///
/// A raw segment may itself be a namespaced name (`Norma\Example`), which expands into
/// several segments. The reserved separator is rejected.
pub fn config_segments(raw: &str) -> Result<Vec<String>> {
    if raw.contains(SEPARATOR) {
        return Err(DiError::ConfigurationKeyConflict {
            segment: raw.to_string(),
            separator: SEPARATOR,
        });
    }
    Ok(segments(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_delimiters() {
        assert_eq!(normalize("Norma\\Example\\Service"), "Norma|Example|Service");
        assert_eq!(normalize("\\Norma\\Example"), "Norma|Example");
        assert_eq!(normalize("norma_di::example::Service"), "norma_di|example|Service");
        assert_eq!(normalize("a.b.Foo"), "a|b|Foo");
        assert_eq!(normalize("a|b|Foo"), "a|b|Foo");
    }

    #[test]
    fn test_parameter_keys_are_not_split() {
        assert_eq!(segments("$logger"), vec!["$logger".to_string()]);
        assert_eq!(parameter_key("logger"), "$logger");
        assert_eq!(parameter_key("$logger"), "$logger");
    }

    #[test]
    fn test_short_name_and_namespace() {
        assert_eq!(short_name("Norma|Example|Service"), "Service");
        assert_eq!(namespace("Norma|Example|Service"), Some("Norma|Example"));
        assert_eq!(namespace("Service"), None);
    }

    #[test]
    fn test_config_segment_rejects_separator() {
        let err = config_segments("bad|key").unwrap_err();
        assert!(matches!(err, DiError::ConfigurationKeyConflict { .. }));
        assert_eq!(
            config_segments("Norma\\Example").unwrap(),
            vec!["Norma".to_string(), "Example".to_string()]
        );
    }
}
