//! Solver configuration loading.
//!
//! Lookup order: explicit path, then `$CARBOSOL_CONFIG`, then built-in defaults.
//! `CARBOSOL_PHREEQC` and `CARBOSOL_DATABASE_DIR` override the loaded values.

use cs_brine::SolverConfig;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};

pub const CONFIG_ENV: &str = "CARBOSOL_CONFIG";
pub const PHREEQC_ENV: &str = "CARBOSOL_PHREEQC";
pub const DATABASE_DIR_ENV: &str = "CARBOSOL_DATABASE_DIR";

/// Load the solver configuration using the process environment.
pub fn load_config(path: Option<&Path>) -> AppResult<SolverConfig> {
    load_config_with(path, |name| std::env::var(name).ok())
}

/// Load the solver configuration, reading variables through `var`.
pub fn load_config_with(
    path: Option<&Path>,
    var: impl Fn(&str) -> Option<String>,
) -> AppResult<SolverConfig> {
    let source = path
        .map(Path::to_path_buf)
        .or_else(|| var(CONFIG_ENV).filter(|s| !s.is_empty()).map(PathBuf::from));

    let mut config = match source {
        Some(path) => read_config_file(&path)?,
        None => {
            debug!("No config file given; using defaults");
            SolverConfig::default()
        }
    };
    apply_env_overrides(&mut config, var);
    Ok(config)
}

fn read_config_file(path: &Path) -> AppResult<SolverConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| AppError::ConfigFileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let config: SolverConfig = serde_yaml::from_str(&content)
        .map_err(|e| AppError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
    info!(path = %path.display(), "Loaded solver config");
    Ok(config)
}

fn apply_env_overrides(config: &mut SolverConfig, var: impl Fn(&str) -> Option<String>) {
    if let Some(exe) = var(PHREEQC_ENV).filter(|s| !s.is_empty()) {
        debug!(executable = %exe, "Solver executable overridden from environment");
        config.phreeqc_executable = PathBuf::from(exe);
    }
    if let Some(dir) = var(DATABASE_DIR_ENV).filter(|s| !s.is_empty()) {
        debug!(database_dir = %dir, "Database directory overridden from environment");
        config.database_dir = PathBuf::from(dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cs_brine::UnknownModelPolicy;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_without_file_or_env() {
        let config = load_config_with(None, env(&[])).unwrap();
        assert_eq!(config, SolverConfig::default());
    }

    #[test]
    fn yaml_file_from_env_var_with_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("carbosol.yaml");
        std::fs::write(
            &path,
            "timeout_secs: 30\nunknown_model: fallback\nsweep_defaults:\n  pressure: {start: 1.0, end: 2.0, step: 0.5}\n",
        )
        .unwrap();
        let path_str = path.display().to_string();
        let config = load_config_with(
            None,
            env(&[
                (CONFIG_ENV, path_str.as_str()),
                (PHREEQC_ENV, "/opt/bin/phreeqc"),
            ]),
        )
        .unwrap();
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.unknown_model, UnknownModelPolicy::Fallback);
        assert_eq!(config.sweep_defaults.pressure.step, 0.5);
        assert_eq!(config.phreeqc_executable, PathBuf::from("/opt/bin/phreeqc"));
        assert_eq!(config.max_workers, 4);
    }

    #[test]
    fn explicit_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("explicit.yaml");
        std::fs::write(&path, "max_workers: 2\n").unwrap();
        let config = load_config_with(
            Some(&path),
            env(&[(CONFIG_ENV, "/nonexistent.yaml"), (DATABASE_DIR_ENV, "/db")]),
        )
        .unwrap();
        assert_eq!(config.max_workers, 2);
        assert_eq!(config.database_dir, PathBuf::from("/db"));
    }

    #[test]
    fn unreadable_and_malformed_files_fail() {
        let missing = load_config_with(Some(Path::new("/nonexistent/carbosol.yaml")), env(&[]));
        assert!(matches!(missing, Err(AppError::ConfigFileRead { .. })));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "timeout_secs: [1, 2]\n").unwrap();
        let bad = load_config_with(Some(&path), env(&[]));
        assert!(matches!(bad, Err(AppError::Config(_))));
    }
}
