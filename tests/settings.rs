// tests/settings.rs

use orchdag::admission::TierLimits;
use orchdag::config::{load_and_validate, RawSettings, Settings};
use orchdag::errors::OrchdagError;
use orchdag::health::thresholds_from_section;
use orchdag::types::CostTier;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn defaults_mirror_the_builtin_limits_and_windows() {
    let settings = Settings::default();

    let limits = TierLimits::from(settings.limits());
    assert_eq!(limits.cheap, 10);
    assert_eq!(limits.medium, 3);
    assert_eq!(limits.expensive, 1);

    let thresholds = thresholds_from_section(settings.heartbeat());
    assert_eq!(thresholds[&CostTier::Cheap].timeout.as_secs(), 300);
    assert_eq!(thresholds[&CostTier::Expensive].timeout.as_secs(), 120);
}

#[test]
fn partial_toml_overrides_merge_with_defaults() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("orchdag.toml");
    std::fs::write(
        &path,
        r#"
[limits]
expensive = 2

[heartbeat.expensive]
interval_secs = 10
warning_secs = 30
timeout_secs = 60
"#,
    )?;

    let settings = load_and_validate(&path)?;
    let limits = TierLimits::from(settings.limits());
    assert_eq!(limits.expensive, 2);
    assert_eq!(limits.cheap, 10);

    let thresholds = thresholds_from_section(settings.heartbeat());
    assert_eq!(thresholds[&CostTier::Expensive].warning.as_secs(), 30);
    // Untouched tiers keep their defaults.
    assert_eq!(thresholds[&CostTier::Cheap].warning.as_secs(), 180);

    Ok(())
}

#[test]
fn zero_ceilings_are_rejected() {
    let raw: RawSettings = toml::from_str(
        r#"
[limits]
medium = 0
"#,
    )
    .expect("parses");

    let err = Settings::try_from(raw).unwrap_err();
    assert!(matches!(err, OrchdagError::ConfigError(msg) if msg.contains("medium")));
}

#[test]
fn threshold_windows_must_be_strictly_ordered() {
    let raw: RawSettings = toml::from_str(
        r#"
[heartbeat.cheap]
interval_secs = 60
warning_secs = 50
timeout_secs = 300
"#,
    )
    .expect("parses");
    assert!(Settings::try_from(raw).is_err());

    let raw: RawSettings = toml::from_str(
        r#"
[heartbeat.cheap]
interval_secs = 60
warning_secs = 180
timeout_secs = 180
"#,
    )
    .expect("parses");
    assert!(Settings::try_from(raw).is_err());
}

#[test]
fn missing_settings_file_is_an_error_but_defaults_never_are() {
    let err = load_and_validate("/definitely/not/here/orchdag.toml").unwrap_err();
    assert!(matches!(err, OrchdagError::IoError(_)));

    // Embedders that skip the file entirely just use the defaults.
    let _ = Settings::default();
}
