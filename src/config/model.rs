// src/config/model.rs

use serde::Deserialize;

/// Top-level settings as read from a TOML file.
///
/// ```toml
/// [limits]
/// cheap = 10
/// medium = 3
/// expensive = 1
///
/// [heartbeat.cheap]
/// interval_secs = 60
/// warning_secs = 180
/// timeout_secs = 300
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSettings {
    /// Per-tier concurrency ceilings from `[limits]`.
    #[serde(default)]
    pub limits: LimitsSection,

    /// Per-tier heartbeat thresholds from `[heartbeat.<tier>]`.
    #[serde(default)]
    pub heartbeat: HeartbeatSection,
}

/// `[limits]` section: maximum concurrently running nodes per cost tier.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LimitsSection {
    #[serde(default = "default_cheap_limit")]
    pub cheap: usize,
    #[serde(default = "default_medium_limit")]
    pub medium: usize,
    #[serde(default = "default_expensive_limit")]
    pub expensive: usize,
}

fn default_cheap_limit() -> usize {
    10
}

fn default_medium_limit() -> usize {
    3
}

fn default_expensive_limit() -> usize {
    1
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            cheap: default_cheap_limit(),
            medium: default_medium_limit(),
            expensive: default_expensive_limit(),
        }
    }
}

/// `[heartbeat]` section, one sub-table per tier.
///
/// Cheap/background tiers get longer liveness windows; expensive
/// foreground tiers are expected to respond quickly.
#[derive(Debug, Clone, Deserialize)]
pub struct HeartbeatSection {
    #[serde(default = "default_cheap_thresholds")]
    pub cheap: ThresholdSection,
    #[serde(default = "default_medium_thresholds")]
    pub medium: ThresholdSection,
    #[serde(default = "default_expensive_thresholds")]
    pub expensive: ThresholdSection,
}

/// Thresholds for one tier, all in seconds.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ThresholdSection {
    /// Expected interval between heartbeats.
    pub interval_secs: u64,
    /// Elapsed time past which a node counts as stalled.
    pub warning_secs: u64,
    /// Elapsed time past which a node counts as timed out.
    pub timeout_secs: u64,
}

fn default_cheap_thresholds() -> ThresholdSection {
    ThresholdSection {
        interval_secs: 60,
        warning_secs: 180,
        timeout_secs: 300,
    }
}

fn default_medium_thresholds() -> ThresholdSection {
    ThresholdSection {
        interval_secs: 45,
        warning_secs: 120,
        timeout_secs: 240,
    }
}

fn default_expensive_thresholds() -> ThresholdSection {
    ThresholdSection {
        interval_secs: 30,
        warning_secs: 90,
        timeout_secs: 120,
    }
}

impl Default for HeartbeatSection {
    fn default() -> Self {
        Self {
            cheap: default_cheap_thresholds(),
            medium: default_medium_thresholds(),
            expensive: default_expensive_thresholds(),
        }
    }
}

/// Validated settings.
///
/// Constructed via `TryFrom<RawSettings>` (see [`validate`]), which checks
/// ceiling and threshold sanity before the rest of the crate sees them.
///
/// [`validate`]: crate::config::validate
#[derive(Debug, Clone)]
pub struct Settings {
    limits: LimitsSection,
    heartbeat: HeartbeatSection,
}

impl Settings {
    /// Construct without validation. Only `validate` should call this.
    pub(crate) fn new_unchecked(limits: LimitsSection, heartbeat: HeartbeatSection) -> Self {
        Self { limits, heartbeat }
    }

    pub fn limits(&self) -> LimitsSection {
        self.limits
    }

    pub fn heartbeat(&self) -> &HeartbeatSection {
        &self.heartbeat
    }
}

impl Default for Settings {
    fn default() -> Self {
        // The built-in defaults always pass validation.
        Self::new_unchecked(LimitsSection::default(), HeartbeatSection::default())
    }
}
