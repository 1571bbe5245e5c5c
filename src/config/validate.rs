// src/config/validate.rs

use crate::config::model::{RawSettings, Settings, ThresholdSection};
use crate::errors::{OrchdagError, Result};
use crate::types::CostTier;

impl TryFrom<RawSettings> for Settings {
    type Error = OrchdagError;

    fn try_from(raw: RawSettings) -> std::result::Result<Self, Self::Error> {
        validate_raw_settings(&raw)?;
        Ok(Settings::new_unchecked(raw.limits, raw.heartbeat))
    }
}

fn validate_raw_settings(raw: &RawSettings) -> Result<()> {
    validate_limits(raw)?;
    validate_thresholds(CostTier::Cheap, &raw.heartbeat.cheap)?;
    validate_thresholds(CostTier::Medium, &raw.heartbeat.medium)?;
    validate_thresholds(CostTier::Expensive, &raw.heartbeat.expensive)?;
    Ok(())
}

fn validate_limits(raw: &RawSettings) -> Result<()> {
    let limits = [
        ("cheap", raw.limits.cheap),
        ("medium", raw.limits.medium),
        ("expensive", raw.limits.expensive),
    ];

    for (tier, limit) in limits {
        if limit == 0 {
            return Err(OrchdagError::ConfigError(format!(
                "[limits].{tier} must be >= 1 (got 0)"
            )));
        }
    }

    Ok(())
}

fn validate_thresholds(tier: CostTier, section: &ThresholdSection) -> Result<()> {
    if section.interval_secs == 0 {
        return Err(OrchdagError::ConfigError(format!(
            "[heartbeat.{tier}].interval_secs must be >= 1 (got 0)"
        )));
    }
    if section.warning_secs <= section.interval_secs {
        return Err(OrchdagError::ConfigError(format!(
            "[heartbeat.{tier}].warning_secs ({}) must exceed interval_secs ({})",
            section.warning_secs, section.interval_secs
        )));
    }
    if section.timeout_secs <= section.warning_secs {
        return Err(OrchdagError::ConfigError(format!(
            "[heartbeat.{tier}].timeout_secs ({}) must exceed warning_secs ({})",
            section.timeout_secs, section.warning_secs
        )));
    }
    Ok(())
}
