use std::fmt;

/// Longest entry name, in bytes, that is safe across common filesystems.
pub const MAX_NAME_BYTES: usize = 200;

const EMPTY_NAME: &str = "_empty_";

/// Identifies a cache entry: a namespace (one per cached computation) and a
/// name derived from the computation's arguments.
///
/// Both parts are usable as single path components: path separators, NUL and
/// `:` become `-`, and the name is cut to [`MAX_NAME_BYTES`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: String,
    name: String,
}

impl CacheKey {
    pub fn new<S: AsRef<str>>(namespace: &str, args: &[S]) -> Self {
        let joined = args
            .iter()
            .map(|a| a.as_ref())
            .collect::<Vec<_>>()
            .join("-");

        Self {
            namespace: path_component(namespace),
            name: path_component(&joined),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

fn path_component(raw: &str) -> String {
    let sanitized: String = raw
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '-',
            other => other,
        })
        .collect();

    match truncate_on_char_boundary(&sanitized, MAX_NAME_BYTES) {
        "" => EMPTY_NAME.to_string(),
        "." => "_dot_".to_string(),
        ".." => "_dotdot_".to_string(),
        name => name.to_string(),
    }
}

fn truncate_on_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
