//! Image references: `[registry/][namespace/]name[:tag][@id]`.
//!
//! The coordinator builds one of these per read to label which repository a
//! set of layers was confirmed for. A reference without a registry names the
//! local store; one with a registry names a remote (pull-through) repository.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Registry assumed when a reference carries none.
pub const DEFAULT_REGISTRY: &str = "docker.io";
/// Namespace assumed for single-component names on the default registry.
pub const DEFAULT_NAMESPACE: &str = "library";

/// A parsed container image reference.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageReference {
    pub registry: String,
    pub namespace: String,
    pub name: String,
    pub tag: String,
    pub id: String,
}

impl ImageReference {
    /// Reference to `namespace/name` on `registry` (which may be empty).
    pub fn repository(
        registry: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            registry: registry.into(),
            namespace: namespace.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Parse a textual reference.
    ///
    /// The first `/`-separated component is treated as a registry when it
    /// contains `.` or `:` or equals `localhost`.
    pub fn parse(input: &str) -> Result<Self, TypeError> {
        let invalid = |reason: &str| TypeError::InvalidReference {
            reference: input.to_string(),
            reason: reason.to_string(),
        };

        if input.is_empty() {
            return Err(invalid("reference must not be empty"));
        }

        let mut reference = Self::default();
        let (rest, id) = match input.split_once('@') {
            Some((rest, id)) => (rest, id),
            None => (input, ""),
        };
        reference.id = id.to_string();

        let mut parts: Vec<&str> = rest.split('/').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(invalid("empty path component"));
        }
        if parts.len() > 1 {
            let first = parts[0];
            if first.contains('.') || first.contains(':') || first == "localhost" {
                reference.registry = first.to_string();
                parts.remove(0);
            }
        }

        let last = parts.pop().ok_or_else(|| invalid("missing repository name"))?;
        let (name, tag) = match last.rsplit_once(':') {
            Some((name, tag)) => (name, tag),
            None => (last, ""),
        };
        if name.is_empty() {
            return Err(invalid("missing repository name"));
        }
        reference.tag = tag.to_string();

        match parts.len() {
            0 => reference.name = name.to_string(),
            _ => {
                reference.namespace = parts[0].to_string();
                let mut full = parts[1..].join("/");
                if !full.is_empty() {
                    full.push('/');
                }
                full.push_str(name);
                reference.name = full;
            }
        }
        Ok(reference)
    }

    /// Fill in the defaults a docker client would assume.
    pub fn docker_client_defaults(&self) -> Self {
        let mut r = self.clone();
        if r.registry.is_empty() {
            r.registry = DEFAULT_REGISTRY.to_string();
        }
        if r.namespace.is_empty() && r.registry == DEFAULT_REGISTRY {
            r.namespace = DEFAULT_NAMESPACE.to_string();
        }
        r
    }

    /// The same repository without tag or id.
    pub fn as_repository(&self) -> Self {
        Self {
            tag: String::new(),
            id: String::new(),
            ..self.clone()
        }
    }

    /// `name[:tag][@id]`.
    pub fn name_string(&self) -> String {
        let mut s = self.name.clone();
        if !self.tag.is_empty() {
            s.push(':');
            s.push_str(&self.tag);
        }
        if !self.id.is_empty() {
            s.push('@');
            s.push_str(&self.id);
        }
        s
    }

    /// The exact textual form, with no defaults applied.
    pub fn exact(&self) -> String {
        let name = self.name_string();
        if self.name.is_empty() {
            return String::new();
        }
        let mut s = String::new();
        if !self.registry.is_empty() {
            s.push_str(&self.registry);
            s.push('/');
        }
        if !self.namespace.is_empty() {
            s.push_str(&self.namespace);
            s.push('/');
        }
        s.push_str(&name);
        s
    }

    /// Returns `true` if the reference identifies the local store.
    pub fn is_local(&self) -> bool {
        self.registry.is_empty()
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.exact())
    }
}
