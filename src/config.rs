//! Engine configuration: TOML file with env-var path override, every
//! field defaulted so a bare checkout runs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::quota::DEFAULT_DAILY_LIMIT;
use crate::score::ScoringMode;

const ENV_PATH: &str = "RADWATCH_CONFIG_PATH";
const DEFAULT_PATH: &str = "config/radwatch.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Scoring strategy selected per deployment; both are first-class.
    pub scoring_mode: ScoringMode,
    pub dedup_window_days: i64,
    pub daily_enrichment_limit: u32,
    /// Whether the recipient opted into SMS for Urgent alerts.
    pub sms_opt_in: bool,
    /// Lower-cased jurisdiction tokens the deployment targets.
    pub target_jurisdiction: Vec<String>,
    pub adjacent_regions: Vec<String>,
    /// Personalization sets for the adjustment strategy.
    pub tracked_devices: Vec<String>,
    pub tracked_codes: Vec<String>,
    pub poll_interval_secs: u64,
    pub digest_interval_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scoring_mode: ScoringMode::Additive,
            dedup_window_days: crate::dedup::DEFAULT_WINDOW_DAYS,
            daily_enrichment_limit: DEFAULT_DAILY_LIMIT,
            sms_opt_in: false,
            target_jurisdiction: vec!["ca".into(), "california".into()],
            adjacent_regions: vec!["west".into(), "pacific".into()],
            tracked_devices: Vec::new(),
            tracked_codes: Vec::new(),
            poll_interval_secs: 900,
            digest_interval_secs: 24 * 3600,
        }
    }
}

impl EngineConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading engine config from {}", path.display()))?;
        toml::from_str(&content).context("parsing engine config")
    }

    /// `$RADWATCH_CONFIG_PATH`, then `config/radwatch.toml`, then defaults.
    pub fn load_default() -> Self {
        let path = std::env::var(ENV_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_PATH));
        match Self::load_from(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::debug!(error = ?e, "engine config not loaded, using defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.scoring_mode, ScoringMode::Additive);
        assert_eq!(cfg.dedup_window_days, 14);
        assert_eq!(cfg.daily_enrichment_limit, 6);
        assert!(!cfg.sms_opt_in);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let cfg: EngineConfig = toml::from_str(
            r#"
            scoring_mode = "adjustment"
            daily_enrichment_limit = 12
            tracked_codes = ["70553"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.scoring_mode, ScoringMode::Adjustment);
        assert_eq!(cfg.daily_enrichment_limit, 12);
        assert_eq!(cfg.tracked_codes, vec!["70553".to_string()]);
        // untouched fields keep defaults
        assert_eq!(cfg.dedup_window_days, 14);
    }
}
