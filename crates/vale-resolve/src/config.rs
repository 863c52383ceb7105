use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ResolveError, ResolveResult};

/// Resolver settings, usually read from a TOML file.
///
/// ```toml
/// cache_dir = "/var/cache/vale"
/// hint_sources = ["./mirror", "/srv/archive"]
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    /// Directory for the on-disk blob cache. `None` keeps blobs in memory.
    pub cache_dir: Option<PathBuf>,

    /// Hint sources tried after the ones passed to each call.
    pub hint_sources: Vec<String>,
}

impl ResolverConfig {
    pub fn from_toml_str(text: &str) -> ResolveResult<Self> {
        toml::from_str(text).map_err(|e| ResolveError::Config(e.to_string()))
    }

    /// Load config from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ResolveResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ResolveError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> ResolveResult<String> {
        toml::to_string_pretty(self).map_err(|e| ResolveError::Config(e.to_string()))
    }

    /// Per-call hints followed by the configured ones, first occurrence kept.
    pub fn merged_hints(&self, per_call: &[String]) -> Vec<String> {
        merge_hints(per_call, &self.hint_sources)
    }
}

pub(crate) fn merge_hints(per_call: &[String], defaults: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(per_call.len() + defaults.len());
    for hint in per_call.iter().chain(defaults) {
        if !merged.contains(hint) {
            merged.push(hint.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let config = ResolverConfig::from_toml_str(
            r#"
            cache_dir = "/tmp/vale-cache"
            hint_sources = ["a", "b"]
            "#,
        )
        .unwrap();
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/vale-cache")));
        assert_eq!(config.hint_sources, vec!["a", "b"]);
    }

    #[test]
    fn empty_config_uses_defaults() {
        assert_eq!(ResolverConfig::from_toml_str("").unwrap(), ResolverConfig::default());
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = ResolverConfig::from_toml_str("cache = 1").unwrap_err();
        assert!(matches!(err, ResolveError::Config(_)));
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vale.toml");
        let config = ResolverConfig {
            cache_dir: Some(dir.path().join("cache")),
            hint_sources: vec!["mirror".into()],
        };
        std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();
        assert_eq!(ResolverConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_names_path() {
        let err = ResolverConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }

    #[test]
    fn per_call_hints_come_first_without_duplicates() {
        let config = ResolverConfig {
            cache_dir: None,
            hint_sources: vec!["b".into(), "c".into()],
        };
        let merged = config.merged_hints(&["a".into(), "b".into(), "a".into()]);
        assert_eq!(merged, vec!["a", "b", "c"]);
    }
}
