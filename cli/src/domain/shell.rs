//! POSIX shell quoting for values interpolated into remote commands.
//!
//! Every value that did not originate as a literal in this crate (VM names,
//! URLs, paths from config) must pass through [`quote`] before it is spliced
//! into a command string.

/// Quote `value` so a POSIX shell reads it back as exactly one word.
///
/// Plain words made only of safe characters are returned unchanged to keep
/// logged commands readable.
#[must_use]
pub fn quote(value: &str) -> String {
    if !value.is_empty() && value.chars().all(is_safe) {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

fn is_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '=' | '@' | ',' | '+')
}
