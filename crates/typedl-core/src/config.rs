//! Loader configuration.
//!
//! Read from the environment:
//! - `TYPEDL_BIND`: `now` (default) resolves every reference at open time;
//!   `lazy` defers function binding to first call.
//! - `TYPEDL_VISIBILITY`: `local` (default) keeps the object's symbols private;
//!   `global` makes them available to objects loaded later.
//! - `TYPEDL_NODELETE`: `1`/`true`/`yes` keeps the object mapped after close.
//! - `TYPEDL_SEARCH_PATH`: `:`-separated directories tried, in order, for bare
//!   library names (names without a `/`).

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::dlfcn::{BindMode, Visibility};

pub const ENV_BIND: &str = "TYPEDL_BIND";
pub const ENV_VISIBILITY: &str = "TYPEDL_VISIBILITY";
pub const ENV_NODELETE: &str = "TYPEDL_NODELETE";
pub const ENV_SEARCH_PATH: &str = "TYPEDL_SEARCH_PATH";

/// How libraries are opened and where bare names are looked up.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    pub bind: BindMode,
    pub visibility: Visibility,
    pub no_delete: bool,
    pub search_paths: Vec<PathBuf>,
}

impl LoaderConfig {
    /// Configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Configuration from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let bind = lookup(ENV_BIND)
            .map(|v| BindMode::from_str_loose(&v))
            .unwrap_or_default();
        let visibility = lookup(ENV_VISIBILITY)
            .map(|v| Visibility::from_str_loose(&v))
            .unwrap_or_default();
        let no_delete = lookup(ENV_NODELETE).is_some_and(|v| parse_bool(&v));
        let search_paths = lookup(ENV_SEARCH_PATH)
            .map(|v| parse_search_path(&v))
            .unwrap_or_default();
        Self {
            bind,
            visibility,
            no_delete,
            search_paths,
        }
    }

    /// Process-wide configuration, read from the environment on first use.
    #[must_use]
    pub fn global() -> &'static LoaderConfig {
        static GLOBAL: OnceLock<LoaderConfig> = OnceLock::new();
        GLOBAL.get_or_init(Self::from_env)
    }

    /// Path to hand to the platform loader for `name`.
    ///
    /// Names containing `/` are used as given. Bare names are joined with each
    /// search directory in order and the first existing file wins; if none
    /// exists the bare name is returned so the platform search applies.
    #[must_use]
    pub fn resolve_path(&self, name: &str) -> PathBuf {
        self.resolve_path_with(name, |p| p.is_file())
    }

    fn resolve_path_with(&self, name: &str, exists: impl Fn(&Path) -> bool) -> PathBuf {
        if name.contains('/') {
            return PathBuf::from(name);
        }
        self.search_paths
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| exists(candidate))
            .unwrap_or_else(|| PathBuf::from(name))
    }
}

fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_search_path(raw: &str) -> Vec<PathBuf> {
    raw.split(':')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}
