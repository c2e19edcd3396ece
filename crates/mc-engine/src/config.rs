use std::path::{Path, PathBuf};

use mc_data::CalibrationCache;
use mc_optimizer::StrategyConfig;
use mc_types::{config_error, CalResult, ModeTable};
use serde::{Deserialize, Serialize};

/// Calibration settings, loadable from a JSON file.
///
/// Every field is optional in the file; missing fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Cache root; falls back to [`CalibrationCache::default_root`].
    pub cache_dir: Option<PathBuf>,
    pub strategy: StrategyConfig,
    pub modes: ModeTable,
    pub seed: Option<u64>,
}

impl CalibrationConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> CalResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| config_error!("cannot read {}: {}", path.display(), e))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| config_error!("invalid config {}: {}", path.display(), e))?;
        config.validate()?;

        tracing::debug!("Loaded calibration config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> CalResult<()> {
        match self.strategy {
            StrategyConfig::Exhaustive { samples: 0, .. } => {
                return Err(config_error!("exhaustive search needs at least one sample"))
            }
            StrategyConfig::Exhaustive { parallelism: 0, .. } => {
                return Err(config_error!("parallelism must be positive"))
            }
            StrategyConfig::Bayesian { budget: 0, .. } => {
                return Err(config_error!("evaluation budget must be positive"))
            }
            _ => {}
        }
        if self.modes.modes().is_empty() {
            return Err(config_error!("no modes registered"));
        }
        self.modes.validate()
    }

    pub fn resolve_cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(CalibrationCache::default_root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mc_types::{CalError, Mode, ModeProfile};
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn empty_file_takes_defaults() {
        let file = write_config("{}");
        let config = CalibrationConfig::from_file(file.path()).unwrap();
        assert_eq!(config, CalibrationConfig::default());
        assert_eq!(config.modes.modes(), vec![Mode::Spread, Mode::Total]);
    }

    #[test]
    fn explicit_fields_override() {
        let file = write_config(
            r#"{
                "cache_dir": "/tmp/calibrations",
                "strategy": {"kind": "exhaustive", "samples": 1000, "parallelism": 4},
                "seed": 7
            }"#,
        );
        let config = CalibrationConfig::from_file(file.path()).unwrap();
        assert_eq!(config.resolve_cache_dir(), PathBuf::from("/tmp/calibrations"));
        assert_eq!(
            config.strategy,
            StrategyConfig::Exhaustive {
                samples: 1000,
                parallelism: 4
            }
        );
        assert_eq!(config.seed, Some(7));
    }

    #[test]
    fn invalid_configs_rejected() {
        for contents in [
            "not json",
            r#"{"strategy": {"kind": "bayesian", "budget": 0}}"#,
            r#"{"strategy": {"kind": "exhaustive", "samples": 0}}"#,
            r#"{"modes": {}}"#,
            r#"{"strategy": {"kind": "annealing"}}"#,
        ] {
            let file = write_config(contents);
            assert!(
                matches!(CalibrationConfig::from_file(file.path()), Err(CalError::Config(_))),
                "accepted {contents}"
            );
        }
    }

    #[test]
    fn unbounded_outcome_grid_rejected_at_load() {
        let mut profile = ModeProfile::defaults_for(Mode::Spread);
        profile.lines.stop = 1e300;
        let table = ModeTable::empty().with_profile(Mode::Spread, profile);
        let contents = format!(r#"{{"modes": {}}}"#, serde_json::to_string(&table).unwrap());

        let file = write_config(&contents);
        match CalibrationConfig::from_file(file.path()) {
            Err(CalError::Config(message)) => assert!(message.contains("lines"), "{message}"),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_config_error() {
        assert!(matches!(
            CalibrationConfig::from_file("/nonexistent/calibrate.json"),
            Err(CalError::Config(_))
        ));
    }
}
