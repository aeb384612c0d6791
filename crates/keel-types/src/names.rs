//! Name and identity validation.
//!
//! Valid workspace names:
//! - Must be non-empty
//! - Must consist only of ASCII letters, digits, `-` and `_`
//! - Must start and end with a letter or digit
//!
//! Record ids are opaque strings but must be non-empty and free of
//! whitespace and `/`.

use crate::error::TypeError;

/// Validate a workspace name, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use keel_types::names::validate_workspace_name;
///
/// assert!(validate_workspace_name("default").is_ok());
/// assert!(validate_workspace_name("special_and-allowed").is_ok());
/// assert!(validate_workspace_name("no spaces allowed").is_err());
/// assert!(validate_workspace_name("-leading-hyphen").is_err());
/// ```
pub fn validate_workspace_name(name: &str) -> Result<(), TypeError> {
    let invalid = |reason: String| TypeError::InvalidWorkspaceName {
        name: name.to_string(),
        reason,
    };

    let (first, last) = match (name.chars().next(), name.chars().last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(invalid("must not be empty".into())),
    };

    if let Some(ch) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(invalid(format!("contains forbidden character: {ch:?}")));
    }

    if !first.is_ascii_alphanumeric() {
        return Err(invalid(format!("must not start with {first:?}")));
    }

    if !last.is_ascii_alphanumeric() {
        return Err(invalid(format!("must not end with {last:?}")));
    }

    Ok(())
}

/// Validate the identity of a stored record of the given kind.
pub fn validate_record_id(kind: &'static str, id: &str) -> Result<(), TypeError> {
    let invalid = |reason: &str| TypeError::InvalidId {
        kind,
        id: id.to_string(),
        reason: reason.to_string(),
    };

    if id.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if id.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain whitespace"));
    }
    if id.contains('/') {
        return Err(invalid("must not contain '/'"));
    }
    Ok(())
}
