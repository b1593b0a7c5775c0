//! Composite names for per-metric configuration keys and symptom types

/// Separator between a prefix and the name it qualifies
pub const COMPOSITE_SEPARATOR: char = ':';

/// Join a prefix and a name into a composite key, e.g. `LOW_THRESHOLD:memory`
///
/// The prefix must not contain [`COMPOSITE_SEPARATOR`]; the name may.
pub fn composite_name(prefix: &str, name: &str) -> String {
    debug_assert!(
        !prefix.contains(COMPOSITE_SEPARATOR),
        "composite prefix must not contain the separator"
    );
    let mut key = String::with_capacity(prefix.len() + name.len() + 1);
    key.push_str(prefix);
    key.push(COMPOSITE_SEPARATOR);
    key.push_str(name);
    key
}

/// Split a composite key back into `(prefix, name)`
pub fn split_composite_name(key: &str) -> Option<(&str, &str)> {
    key.split_once(COMPOSITE_SEPARATOR)
}
