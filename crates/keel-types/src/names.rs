//! Repository and tag name validation.
//!
//! Valid namespaces:
//! - 1 to 63 characters of lowercase ASCII letters, digits and `-`
//! - Must start and end with a letter or digit
//!
//! Valid repository names:
//! - One or more `/`-separated components, 255 characters at most overall
//! - Each component is lowercase alphanumeric runs joined by a single `.`,
//!   a single or double `_`, or any number of `-`
//!
//! Valid tags:
//! - 1 to 128 characters of `[A-Za-z0-9_.-]`, not starting with `.` or `-`

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

const MAX_NAMESPACE_LEN: usize = 63;
const MAX_NAME_LEN: usize = 255;
const MAX_TAG_LEN: usize = 128;

/// Validate a repository namespace.
///
/// # Examples
///
/// ```
/// use keel_types::names::validate_namespace;
///
/// assert!(validate_namespace("team-a").is_ok());
/// assert!(validate_namespace("Team").is_err());
/// assert!(validate_namespace("-lead").is_err());
/// ```
pub fn validate_namespace(namespace: &str) -> Result<(), TypeError> {
    let invalid = |reason: &str| TypeError::InvalidRepositoryName {
        name: namespace.to_string(),
        reason: reason.to_string(),
    };

    if namespace.is_empty() {
        return Err(invalid("namespace must not be empty"));
    }
    if namespace.len() > MAX_NAMESPACE_LEN {
        return Err(invalid("namespace must be at most 63 characters"));
    }
    if !namespace
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(invalid(
            "namespace may only contain lowercase letters, digits and '-'",
        ));
    }
    if namespace.starts_with('-') || namespace.ends_with('-') {
        return Err(invalid("namespace must start and end with a letter or digit"));
    }
    Ok(())
}

/// Validate a repository name (the part after the namespace).
pub fn validate_repository_name(name: &str) -> Result<(), TypeError> {
    let invalid = |reason: String| TypeError::InvalidRepositoryName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("repository name must not be empty".into()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid(format!(
            "repository name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    for component in name.split('/') {
        if !is_path_component(component) {
            return Err(invalid(format!("invalid path component {component:?}")));
        }
    }
    Ok(())
}

/// Validate an image tag.
pub fn validate_tag(tag: &str) -> Result<(), TypeError> {
    let invalid = |reason: &str| TypeError::InvalidTag {
        tag: tag.to_string(),
        reason: reason.to_string(),
    };

    if tag.is_empty() {
        return Err(invalid("tag must not be empty"));
    }
    if tag.len() > MAX_TAG_LEN {
        return Err(invalid("tag must be at most 128 characters"));
    }
    if tag.starts_with('.') || tag.starts_with('-') {
        return Err(invalid("tag must not start with '.' or '-'"));
    }
    if !tag
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(invalid("tag may only contain [A-Za-z0-9_.-]"));
    }
    Ok(())
}

fn is_alnum(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit()
}

fn is_path_component(component: &str) -> bool {
    let chars: Vec<char> = component.chars().collect();
    if chars.is_empty() || !is_alnum(chars[0]) || !is_alnum(chars[chars.len() - 1]) {
        return false;
    }

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if is_alnum(c) {
            i += 1;
            continue;
        }
        // Separator run: ".", "_", "__" or one or more "-".
        let start = i;
        while i < chars.len() && !is_alnum(chars[i]) {
            i += 1;
        }
        let sep: String = chars[start..i].iter().collect();
        let ok = sep == "." || sep == "_" || sep == "__" || sep.chars().all(|c| c == '-');
        if !ok {
            return false;
        }
    }
    true
}

/// A validated `namespace/name` repository path.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepositoryPath {
    namespace: String,
    name: String,
}

impl RepositoryPath {
    /// Build a repository path, validating both parts.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Result<Self, TypeError> {
        let namespace = namespace.into();
        let name = name.into();
        validate_namespace(&namespace)?;
        validate_repository_name(&name)?;
        Ok(Self { namespace, name })
    }

    /// Parse `namespace/name`. The name may itself contain `/`.
    pub fn parse(path: &str) -> Result<Self, TypeError> {
        let Some((namespace, name)) = path.split_once('/') else {
            return Err(TypeError::InvalidRepositoryName {
                name: path.to_string(),
                reason: "expected <namespace>/<name>".into(),
            });
        };
        Self::new(namespace, name)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for RepositoryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
