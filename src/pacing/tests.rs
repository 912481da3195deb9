//! Tests for pacing module

use super::*;
use crate::error::Error;
use pretty_assertions::assert_eq;
use std::time::Duration;
use test_case::test_case;

// ============================================================================
// PacingConfig Tests
// ============================================================================

#[test]
fn test_pacing_config_default() {
    let config = PacingConfig::default();
    assert_eq!(config.profile, PacingProfile::Organic(OrganicParams::default()));
    assert_eq!(config.long_break_every, 10);
    assert!((config.micro_pause_probability - 1.0 / 3.0).abs() < 1e-9);
    assert!(config.validate().is_ok());
}

#[test]
fn test_pacing_config_yaml_profile_tag() {
    let config: PacingConfig =
        serde_yaml::from_str("profile:\n  kind: uniform\n  short_max: 6.0\nlong_break_every: 5\n")
            .unwrap();

    match config.profile {
        PacingProfile::Uniform(params) => {
            assert_eq!(params.short_min, 3.0);
            assert_eq!(params.short_max, 6.0);
            assert_eq!(params.long_max, 70.0);
        }
        other => panic!("Expected uniform profile, got {other:?}"),
    }
    assert_eq!(config.long_break_every, 5);
}

#[test]
fn test_pacing_config_yaml_empty_organic() {
    let config: PacingConfig = serde_yaml::from_str("profile:\n  kind: organic\n").unwrap();
    assert_eq!(config, PacingConfig::default());
}

#[test_case(PacingConfig::default().with_micro_pause_probability(1.5), "pacing.micro_pause_probability" ; "probability above one")]
#[test_case(PacingConfig { micro_pause_min: 2.0, micro_pause_max: 1.0, ..PacingConfig::default() }, "pacing.micro_pause_max" ; "inverted micro pause")]
#[test_case(PacingConfig { profile: PacingProfile::Uniform(UniformParams { short_min: 9.0, ..UniformParams::default() }), ..PacingConfig::default() }, "pacing.profile.short_max" ; "inverted short range")]
#[test_case(PacingConfig { profile: PacingProfile::Organic(OrganicParams { long_mean: 0.0, ..OrganicParams::default() }), ..PacingConfig::default() }, "pacing.profile.long_mean" ; "zero long mean")]
fn test_pacing_config_validate_rejects(config: PacingConfig, expected_field: &str) {
    match config.validate() {
        Err(Error::InvalidConfigValue { field, .. }) => assert_eq!(field, expected_field),
        other => panic!("Expected InvalidConfigValue, got {other:?}"),
    }
}

#[test]
fn test_human_pacing_rejects_invalid_config() {
    let config = PacingConfig::default().with_micro_pause_probability(-0.1);
    assert!(HumanPacing::new(config).is_err());
}

// ============================================================================
// NoPacing Tests
// ============================================================================

#[test]
fn test_no_pacing_is_zero() {
    let pacing = NoPacing;
    assert_eq!(pacing.batch_delay(1), Duration::ZERO);
    assert_eq!(pacing.batch_delay(10), Duration::ZERO);
    assert_eq!(pacing.post_auth_delay(), Duration::ZERO);
}

// ============================================================================
// HumanPacing Tests
// ============================================================================

#[test]
fn test_organic_short_pause_capped() {
    let pacing = HumanPacing::new(PacingConfig::default()).unwrap().with_seed(1);
    for batch in 1..200 {
        if batch % 10 == 0 {
            continue;
        }
        let delay = pacing.batch_delay(batch);
        assert!(delay <= Duration::from_secs(10), "batch {batch}: {delay:?}");
    }
}

#[test]
fn test_organic_long_break_capped() {
    let pacing = HumanPacing::new(PacingConfig::default()).unwrap().with_seed(2);
    for round in 1..100 {
        let delay = pacing.batch_delay(round * 10);
        assert!(delay <= Duration::from_secs(120), "{delay:?}");
    }
}

#[test]
fn test_uniform_ranges() {
    let pacing = HumanPacing::new(PacingConfig::default().uniform())
        .unwrap()
        .with_seed(3);

    for batch in 1..=9 {
        let delay = pacing.batch_delay(batch);
        assert!(delay >= Duration::from_secs(3), "{delay:?}");
        assert!(delay <= Duration::from_secs(8), "{delay:?}");
    }

    let long = pacing.batch_delay(10);
    assert!(long >= Duration::from_secs(30), "{long:?}");
    assert!(long <= Duration::from_secs(70), "{long:?}");
}

#[test]
fn test_long_breaks_disabled() {
    let pacing = HumanPacing::new(PacingConfig::default().uniform().with_long_break_every(0))
        .unwrap()
        .with_seed(4);
    for batch in [10, 20, 30] {
        assert!(pacing.batch_delay(batch) <= Duration::from_secs(8));
    }
}

#[test]
fn test_post_auth_delay_bounds() {
    let config = PacingConfig::default()
        .uniform()
        .with_micro_pause_probability(1.0);
    let pacing = HumanPacing::new(config).unwrap().with_seed(5);

    for _ in 0..50 {
        let delay = pacing.post_auth_delay();
        assert!(delay >= Duration::from_millis(3200), "{delay:?}");
        assert!(delay <= Duration::from_secs(9), "{delay:?}");
    }
}

#[test]
fn test_post_auth_delay_without_micro_pause() {
    let config = PacingConfig::default()
        .uniform()
        .with_micro_pause_probability(0.0);
    let pacing = HumanPacing::new(config).unwrap().with_seed(6);

    for _ in 0..50 {
        assert!(pacing.post_auth_delay() <= Duration::from_secs(8));
    }
}

#[test]
fn test_seeded_pacing_is_deterministic() {
    let a = HumanPacing::new(PacingConfig::default()).unwrap().with_seed(42);
    let b = HumanPacing::new(PacingConfig::default()).unwrap().with_seed(42);
    let first: Vec<Duration> = (1..=12).map(|i| a.batch_delay(i)).collect();
    let second: Vec<Duration> = (1..=12).map(|i| b.batch_delay(i)).collect();
    assert_eq!(first, second);
}
