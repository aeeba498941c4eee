//! Ref name validation following git-style conventions.
//!
//! Valid ref names:
//! - Must start with `refs/` and name something below it
//! - Must not contain whitespace, `~`, `^`, `:`, `?`, `*`, `[`, `\`
//! - Must not contain `..` (double dot) or `@{`
//! - Must not end with `.`, `/` or `.lock`
//! - Components between slashes must be non-empty and not start with `.`
//!
//! The rules matter for [`FsRefStore`](crate::FsRefStore): a ref name is a
//! relative path under the store root, and `<name>.lock` is its lock file.

use crate::error::{RefError, Result};

/// Characters that are forbidden anywhere in a ref name.
const FORBIDDEN_CHARS: &[char] = &[' ', '\t', '\n', '\r', '~', '^', ':', '?', '*', '[', '\\'];

fn invalid(name: &str, reason: impl Into<String>) -> RefError {
    RefError::InvalidName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Validate a canonical ref name, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use motd_refs::names::validate_ref_name;
///
/// assert!(validate_ref_name("refs/heads/master").is_ok());
/// assert!(validate_ref_name("refs/meta/config").is_ok());
/// assert!(validate_ref_name("master").is_err());
/// assert!(validate_ref_name("refs/heads/bad..name").is_err());
/// ```
pub fn validate_ref_name(name: &str) -> Result<()> {
    let Some(rest) = name.strip_prefix("refs/") else {
        return Err(invalid(name, "must start with 'refs/'"));
    };
    if rest.is_empty() {
        return Err(invalid(name, "must name a ref below 'refs/'"));
    }

    for ch in FORBIDDEN_CHARS {
        if name.contains(*ch) {
            return Err(invalid(name, format!("contains forbidden character: {ch:?}")));
        }
    }

    if name.contains("..") {
        return Err(invalid(name, "must not contain '..'"));
    }

    if name.contains("@{") {
        return Err(invalid(name, "must not contain '@{'"));
    }

    if name.ends_with('.') || name.ends_with('/') {
        return Err(invalid(name, "must not end with '.' or '/'"));
    }

    if name.ends_with(".lock") {
        return Err(invalid(name, "must not end with '.lock'"));
    }

    for component in name.split('/') {
        if component.is_empty() {
            return Err(invalid(name, "path components must not be empty"));
        }
        if component.starts_with('.') {
            return Err(invalid(
                name,
                format!("component must not start with '.': {component:?}"),
            ));
        }
    }

    Ok(())
}
