//! Bridge configuration: which module names are forced to remote resolution.
//!
//! Everything not forced follows the default policy, "remote only if local
//! resolution would fail". The configuration is immutable once built.

use std::fmt;

use tether_ir::{ModuleName, NameError};

/// Environment variable read by [`BridgeConfig::from_env`].
pub const FORCE_REMOTE_ENV: &str = "TETHER_FORCE_REMOTE";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid forced-remote prefix `{entry}`: {source}")]
    InvalidPrefix {
        entry: String,
        #[source]
        source: NameError,
    },
    #[error("environment variable `{var}` is not valid unicode")]
    NotUnicode { var: String },
}

/// One forced-remote entry.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum ForcedPrefix {
    /// `*`: every module.
    All,
    /// A package and everything below it.
    Module(ModuleName),
}

impl ForcedPrefix {
    pub fn parse(entry: &str) -> Result<Self, ConfigError> {
        let entry = entry.trim();
        if entry == "*" {
            return Ok(ForcedPrefix::All);
        }
        // `pkg.*` means the same as `pkg`
        let dotted = entry.strip_suffix(".*").unwrap_or(entry);
        ModuleName::parse(dotted)
            .map(ForcedPrefix::Module)
            .map_err(|source| ConfigError::InvalidPrefix {
                entry: entry.to_owned(),
                source,
            })
    }

    pub fn covers(&self, name: &ModuleName) -> bool {
        match self {
            ForcedPrefix::All => true,
            ForcedPrefix::Module(prefix) => name.starts_with(prefix),
        }
    }

    /// Segments matched; `*` matches zero segments so any named prefix wins
    /// over it.
    fn specificity(&self) -> usize {
        match self {
            ForcedPrefix::All => 0,
            ForcedPrefix::Module(prefix) => prefix.depth(),
        }
    }
}

impl fmt::Display for ForcedPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForcedPrefix::All => f.write_str("*"),
            ForcedPrefix::Module(name) => write!(f, "{name}"),
        }
    }
}

impl fmt::Debug for ForcedPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ForcedPrefix({self})")
    }
}

/// Ordered, de-duplicated forced-remote prefixes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeConfig {
    forced: Vec<ForcedPrefix>,
}

impl BridgeConfig {
    /// No forced prefixes: purely local-first.
    pub fn local_first() -> Self {
        Self::default()
    }

    pub fn new<I, S>(prefixes: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut forced: Vec<ForcedPrefix> = Vec::new();
        for entry in prefixes {
            let prefix = ForcedPrefix::parse(entry.as_ref())?;
            if !forced.contains(&prefix) {
                forced.push(prefix);
            }
        }
        Ok(BridgeConfig { forced })
    }

    /// Parse a comma- or whitespace-separated list, e.g. `"numpy, pkg.sub"`.
    pub fn parse(list: &str) -> Result<Self, ConfigError> {
        Self::new(
            list.split(|c: char| c == ',' || c.is_whitespace())
                .filter(|entry| !entry.is_empty()),
        )
    }

    /// Read [`FORCE_REMOTE_ENV`]. Unset means no forced prefixes.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_var(FORCE_REMOTE_ENV)
    }

    pub fn from_env_var(var: &str) -> Result<Self, ConfigError> {
        match std::env::var(var) {
            Ok(list) => Self::parse(&list),
            Err(std::env::VarError::NotPresent) => Ok(Self::local_first()),
            Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode {
                var: var.to_owned(),
            }),
        }
    }

    pub fn forced(&self) -> &[ForcedPrefix] {
        &self.forced
    }

    pub fn is_local_first(&self) -> bool {
        self.forced.is_empty()
    }

    /// Whether `name` or one of its ancestors is forced remote.
    pub fn forces(&self, name: &ModuleName) -> bool {
        self.forced.iter().any(|prefix| prefix.covers(name))
    }

    /// The most specific forced entry covering `name`.
    pub fn matching_prefix(&self, name: &ModuleName) -> Option<&ForcedPrefix> {
        self.forced
            .iter()
            .filter(|prefix| prefix.covers(name))
            .max_by_key(|prefix| prefix.specificity())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
