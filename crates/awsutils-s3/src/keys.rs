use tracing::debug;

/// Reports whether a key contains characters that break downstream tooling:
/// spaces, more than one `.`, `&`, `(`, `)` or `:`.
pub fn needs_rename(key: &str) -> bool {
    UnsafeChars::scan(key).any()
}

/// Replaces unsafe characters with `_`.
///
/// Every period except the last is replaced so the file extension survives.
/// Keys that are already safe come back unchanged.
pub fn sanitize_key(key: &str) -> String {
    let found = UnsafeChars::scan(key);
    let mut sanitized = key.to_string();

    if found.spaces {
        debug!(key, "replacing spaces in object key");
        sanitized = sanitized.replace(' ', "_");
    }
    if found.periods > 1 {
        debug!(key, periods = found.periods, "replacing extra periods in object key");
        sanitized = sanitized.replacen('.', "_", found.periods - 1);
    }
    if found.ampersands {
        debug!(key, "replacing ampersands in object key");
        sanitized = sanitized.replace('&', "_");
    }
    if found.parentheses {
        debug!(key, "replacing parentheses in object key");
        sanitized = sanitized.replace(['(', ')'], "_");
    }
    if found.colons {
        debug!(key, "replacing colons in object key");
        sanitized = sanitized.replace(':', "_");
    }

    sanitized
}

/// `Some(new_key)` when the key needs renaming.
pub fn rename_unsafe_key(key: &str) -> Option<String> {
    needs_rename(key).then(|| sanitize_key(key))
}

#[derive(Debug, Clone, Copy)]
struct UnsafeChars {
    spaces: bool,
    periods: usize,
    ampersands: bool,
    parentheses: bool,
    colons: bool,
}

impl UnsafeChars {
    fn scan(key: &str) -> Self {
        Self {
            spaces: key.contains(' '),
            periods: key.matches('.').count(),
            ampersands: key.contains('&'),
            parentheses: key.contains(['(', ')']),
            colons: key.contains(':'),
        }
    }

    fn any(&self) -> bool {
        self.spaces || self.periods > 1 || self.ampersands || self.parentheses || self.colons
    }
}
