use std::path::{Path, PathBuf};

pub const ENV_LOG: &str = "GRADEBOOKD_LOG";
pub const ENV_LOG_JSON: &str = "GRADEBOOKD_LOG_JSON";
pub const ENV_WORKSPACE: &str = "GRADEBOOKD_WORKSPACE";

const DEFAULT_LOG_LEVEL: &str = "warn";

/// Process settings, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Level (`debug`) or full filter directive (`gradebookd=debug`).
    pub log_level: String,
    pub log_json: bool,
    /// Base directory for relative `.gb` paths.
    pub workspace: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_json: false,
            workspace: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();
        Self {
            log_level: get(ENV_LOG).unwrap_or(defaults.log_level),
            log_json: get(ENV_LOG_JSON).map(|v| parse_bool(&v)).unwrap_or(false),
            workspace: get(ENV_WORKSPACE).map(PathBuf::from),
        }
    }

    /// Joins a relative path onto the workspace, if one is configured.
    pub fn resolve_path(&self, raw: &str) -> PathBuf {
        let p = Path::new(raw);
        match &self.workspace {
            Some(ws) if p.is_relative() => ws.join(p),
            _ => p.to_path_buf(),
        }
    }
}

fn parse_bool(v: &str) -> bool {
    matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(config_from(&[]), Config::default());
        assert_eq!(config_from(&[(ENV_LOG, "  ")]).log_level, "warn");
    }

    #[test]
    fn reads_all_keys() {
        let cfg = config_from(&[
            (ENV_LOG, "gradebookd=debug"),
            (ENV_LOG_JSON, "TRUE"),
            (ENV_WORKSPACE, "/srv/grades"),
        ]);
        assert_eq!(cfg.log_level, "gradebookd=debug");
        assert!(cfg.log_json);
        assert_eq!(cfg.workspace, Some(PathBuf::from("/srv/grades")));
    }

    #[test]
    fn relative_paths_resolve_against_workspace() {
        let cfg = config_from(&[(ENV_WORKSPACE, "/srv/grades")]);
        assert_eq!(cfg.resolve_path("bio.gb"), PathBuf::from("/srv/grades/bio.gb"));
        assert_eq!(cfg.resolve_path("/tmp/x.gb"), PathBuf::from("/tmp/x.gb"));
        assert_eq!(Config::default().resolve_path("bio.gb"), PathBuf::from("bio.gb"));
    }
}
