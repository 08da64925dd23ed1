//! Dotted module names.
//!
//! A `ModuleName` is always absolute and always valid: at least one segment,
//! every segment a non-empty identifier. Names are built by parsing, so the
//! rest of the bridge never re-validates them.

use std::fmt;
use std::sync::Arc;

/// Why a string was rejected as a module name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("module name is empty")]
    Empty,
    #[error("module name `{name}` has an empty segment")]
    EmptySegment { name: String },
    #[error("module name `{name}` has invalid segment `{segment}`")]
    InvalidSegment { name: String, segment: String },
}

/// A resolved, absolute, dotted module name (`a.b.c`).
///
/// Cheap to clone: the dotted form is shared.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "wire",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct ModuleName(Arc<str>);

impl ModuleName {
    /// Parse and validate a dotted name.
    pub fn parse(dotted: &str) -> Result<Self, NameError> {
        if dotted.is_empty() {
            return Err(NameError::Empty);
        }
        for segment in dotted.split('.') {
            if segment.is_empty() {
                return Err(NameError::EmptySegment {
                    name: dotted.to_owned(),
                });
            }
            if !is_identifier(segment) {
                return Err(NameError::InvalidSegment {
                    name: dotted.to_owned(),
                    segment: segment.to_owned(),
                });
            }
        }
        Ok(ModuleName(Arc::from(dotted)))
    }

    /// The full dotted form.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl DoubleEndedIterator<Item = &str> + '_ {
        self.0.split('.')
    }

    /// Number of segments (`a.b.c` has depth 3).
    pub fn depth(&self) -> usize {
        self.0.bytes().filter(|&b| b == b'.').count() + 1
    }

    /// First segment (the top-level package).
    pub fn head(&self) -> &str {
        self.0.split_once('.').map_or(&*self.0, |(head, _)| head)
    }

    /// Last segment (the attribute name under the parent).
    pub fn leaf(&self) -> &str {
        self.0.rsplit_once('.').map_or(&*self.0, |(_, leaf)| leaf)
    }

    pub fn is_top_level(&self) -> bool {
        !self.0.contains('.')
    }

    /// The enclosing package, or `None` for a top-level name.
    pub fn parent(&self) -> Option<ModuleName> {
        self.0
            .rsplit_once('.')
            .map(|(parent, _)| ModuleName(Arc::from(parent)))
    }

    /// Ancestors from the outermost package inward, excluding `self`.
    ///
    /// `a.b.c` yields `a`, then `a.b`.
    pub fn ancestors(&self) -> impl Iterator<Item = ModuleName> + '_ {
        self.0
            .match_indices('.')
            .map(move |(idx, _)| ModuleName(Arc::from(&self.0[..idx])))
    }

    /// Append one segment. The segment must itself be a valid identifier.
    pub fn child(&self, segment: &str) -> Result<ModuleName, NameError> {
        if !is_identifier(segment) {
            return Err(NameError::InvalidSegment {
                name: format!("{}.{segment}", self.0),
                segment: segment.to_owned(),
            });
        }
        Ok(ModuleName(Arc::from(format!("{}.{segment}", self.0))))
    }

    /// Segment-wise prefix test: `pkg` covers `pkg` and `pkg.sub`,
    /// but not `pkgx`.
    pub fn starts_with(&self, prefix: &ModuleName) -> bool {
        match self.0.strip_prefix(&*prefix.0) {
            Some(rest) => rest.is_empty() || rest.starts_with('.'),
            None => false,
        }
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_') && chars.all(|c| c.is_alphanumeric() || c == '_')
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModuleName({})", self.0)
    }
}

impl std::str::FromStr for ModuleName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModuleName::parse(s)
    }
}

impl TryFrom<String> for ModuleName {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ModuleName::parse(&value)
    }
}

impl From<ModuleName> for String {
    fn from(value: ModuleName) -> Self {
        value.0.to_string()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
