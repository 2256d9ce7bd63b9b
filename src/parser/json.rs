use crate::error::{Result, SchedulerError};
use crate::types::{DomainModel, SoftWeights, SolveResult, SolverLimits};
use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Optional solver tuning loaded next to the domain file
#[derive(Debug, Default, Deserialize)]
pub struct SolverConfig {
    pub weights: Option<SoftWeights>,
    pub limits: Option<SolverLimits>,
}

/// Load and structurally validate a domain model from JSON
pub fn load_model(path: &Path) -> Result<DomainModel> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    let model: DomainModel =
        serde_json::from_str(&content).map_err(|e| SchedulerError::InvalidInput {
            entity: path.display().to_string(),
            message: e.to_string(),
        })?;
    model.validate()?;
    Ok(model)
}

/// Load a previously written result snapshot
pub fn load_result(path: &Path) -> Result<SolveResult> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    let result = SolveResult::from_json(&content)
        .with_context(|| format!("failed to parse '{}'", path.display()))?;
    Ok(result)
}

/// Load solver config from TOML, or fall back to defaults
pub fn load_config_or_default(path: &Path) -> SolverConfig {
    if path.exists() {
        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).unwrap_or_default(),
            Err(_) => SolverConfig::default(),
        }
    } else {
        SolverConfig::default()
    }
}

/// Merge a loaded config into the model's weights and limits
pub fn apply_config(model: &mut DomainModel, config: SolverConfig) {
    if let Some(weights) = config.weights {
        model.weights = weights;
    }
    if let Some(limits) = config.limits {
        model.limits = limits;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_round_trip() {
        let toml = "
[limits]
time_limit_seconds = 60
seed = 7

[weights]
gaps = 5.0
";
        let config: SolverConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.limits.as_ref().unwrap().time_limit_seconds, 60);
        assert_eq!(config.limits.as_ref().unwrap().seed, 7);
        assert_eq!(config.weights.as_ref().unwrap().gaps, 5.0);
        // omitted weights fall back to their defaults
        assert_eq!(
            config.weights.as_ref().unwrap().workload,
            SoftWeights::default().workload
        );
    }
}
