//! Branch name validation.
//!
//! Branch names reach the `git` command line and the mirror's config file, so
//! anything `git check-ref-format --branch` would refuse is rejected up front.
//! Valid branch names:
//! - Must be non-empty
//! - Must not start with `-` (it would be read as an option)
//! - Must not contain whitespace, control characters, `~`, `^`, `:`, `?`, `*`, `[`, `\`
//! - Must not contain `..` or `@{`, and must not be exactly `@`
//! - Must not start or end with `/`, must not end with `.` or `.lock`
//! - Components between slashes must be non-empty and must not start with `.`

use crate::error::{TypeError, TypeResult};

const FORBIDDEN_CHARS: &[char] = &[' ', '\t', '~', '^', ':', '?', '*', '[', '\\'];

fn invalid(name: &str, reason: impl Into<String>) -> TypeError {
    TypeError::InvalidBranchName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Validate a branch name, returning `Ok(())` if git would accept it.
///
/// # Examples
///
/// ```
/// use gbs_types::names::validate_branch_name;
///
/// assert!(validate_branch_name("main").is_ok());
/// assert!(validate_branch_name("release/1.x").is_ok());
/// assert!(validate_branch_name("").is_err());
/// assert!(validate_branch_name("--upload-pack=evil").is_err());
/// ```
pub fn validate_branch_name(name: &str) -> TypeResult<()> {
    if name.is_empty() {
        return Err(invalid(name, "branch name must not be empty"));
    }
    if name.starts_with('-') {
        return Err(invalid(name, "must not start with '-'"));
    }
    if name == "@" {
        return Err(invalid(name, "must not be '@'"));
    }
    if let Some(ch) = name
        .chars()
        .find(|c| c.is_control() || FORBIDDEN_CHARS.contains(c))
    {
        return Err(invalid(name, format!("contains forbidden character: {ch:?}")));
    }
    if name.contains("..") {
        return Err(invalid(name, "must not contain '..'"));
    }
    if name.contains("@{") {
        return Err(invalid(name, "must not contain '@{'"));
    }
    if name.starts_with('/') || name.ends_with('/') {
        return Err(invalid(name, "must not start or end with '/'"));
    }
    if name.ends_with('.') {
        return Err(invalid(name, "must not end with '.'"));
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
