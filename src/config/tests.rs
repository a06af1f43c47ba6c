//! Tests for config functionality.

use crate::config::{Config, MAX_SECONDS, Verbosity};
use crate::error::LockError;
use std::time::Duration;

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.retries, -1);
    assert_eq!(config.max_age, 300);
    assert_eq!(config.sleep_inc, 5);
    assert_eq!(config.min_sleep, 5);
    assert_eq!(config.max_sleep, 60);
    assert_eq!(config.suspend, 15);
    assert_eq!(config.timeout, 0);
    assert_eq!(config.refresh, None);
    assert_eq!(config.refresh_secs(), 60);
    assert_eq!(config.poll_retries, 10);
    assert_eq!(config.poll_max_sleep, 5);
    assert!(!config.dont_sweep);
    assert!(!config.debug);
    assert_eq!(config.verbosity, Verbosity::Warn);
    assert!(config.validate().is_ok());
}

#[test]
fn test_parse_minimal_yaml() {
    let config = Config::from_yaml("").unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_parse_partial_yaml() {
    let yaml = r#"
max_age: 60
refresh: 5
timeout: 30
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(config.max_age, 60);
    assert_eq!(config.refresh, Some(5));
    assert_eq!(config.timeout, 30);

    // Unspecified values should use defaults
    assert_eq!(config.retries, -1);
    assert_eq!(config.max_sleep, 60);
}

#[test]
fn test_unknown_fields_are_ignored() {
    let yaml = r#"
max_age: 90
some_future_option: true
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.max_age, 90);
}

#[test]
fn test_verbosity_parses_snake_case() {
    let config = Config::from_yaml("verbosity: debug\n").unwrap();
    assert_eq!(config.verbosity, Verbosity::Debug);
}

#[test]
fn test_wrong_type_is_config_error() {
    let err = Config::from_yaml("retries: lots\n").unwrap_err();
    assert!(matches!(err, LockError::Config(_)));
    assert!(err.to_string().contains("failed to parse config YAML"));
}

#[test]
fn test_refresh_must_be_below_max_age() {
    let err = Config::from_yaml("max_age: 10\nrefresh: 10\n").unwrap_err();
    assert!(matches!(err, LockError::Config(_)));
    assert!(err.to_string().contains("must be less than max_age"));
}

#[test]
fn test_derived_refresh_stays_below_small_max_age() {
    let config = Config {
        max_age: 2,
        ..Config::default()
    };
    assert_eq!(config.refresh_secs(), 1);
    assert!(config.validate().is_ok());
}

#[test]
fn test_max_age_of_one_cannot_be_refreshed() {
    let config = Config {
        max_age: 1,
        ..Config::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_retries_below_minus_one_rejected() {
    let config = Config {
        retries: -2,
        ..Config::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_retries_beyond_u32_rejected() {
    let config = Config {
        retries: 5_000_000_000,
        ..Config::default()
    };
    let err = config.validate().unwrap_err();
    assert!(matches!(err, LockError::Config(_)));
    assert!(err.to_string().contains("retries must be at most"));
}

#[test]
fn test_large_retries_stay_bounded() {
    let config = Config {
        retries: i64::from(u32::MAX),
        ..Config::default()
    };
    assert!(config.validate().is_ok());
    assert_eq!(config.retry_policy().retries, Some(u32::MAX));

    let unchecked = Config {
        retries: 5_000_000_000,
        ..Config::default()
    };
    assert_eq!(unchecked.retry_policy().retries, Some(u32::MAX));
}

#[test]
fn test_time_settings_above_ceiling_rejected() {
    let huge = u64::MAX;
    let cases = [
        Config {
            timeout: huge,
            ..Config::default()
        },
        Config {
            min_sleep: huge,
            max_sleep: huge,
            ..Config::default()
        },
        Config {
            suspend: huge,
            ..Config::default()
        },
        Config {
            sleep_inc: huge,
            ..Config::default()
        },
        Config {
            max_age: huge,
            refresh: Some(5),
            ..Config::default()
        },
        Config {
            poll_max_sleep: huge,
            ..Config::default()
        },
    ];

    for config in cases {
        let err = config.validate().unwrap_err();
        assert!(matches!(err, LockError::Config(_)), "{:?}", config);
        assert!(err.to_string().contains("must be at most"), "{}", err);
    }
}

#[test]
fn test_time_settings_at_ceiling_accepted() {
    let config = Config {
        timeout: MAX_SECONDS,
        max_age: MAX_SECONDS,
        min_sleep: MAX_SECONDS,
        max_sleep: MAX_SECONDS,
        suspend: MAX_SECONDS,
        ..Config::default()
    };
    assert!(config.validate().is_ok());
}

#[test]
fn test_min_sleep_above_max_sleep_rejected() {
    let config = Config {
        min_sleep: 10,
        max_sleep: 5,
        ..Config::default()
    };
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("min_sleep"));
}

#[test]
fn test_retry_policy_maps_sentinels_to_unbounded() {
    let policy = Config::default().retry_policy();
    assert_eq!(policy.retries, None);
    assert_eq!(policy.timeout, None);

    let policy = Config {
        retries: 3,
        timeout: 5,
        ..Config::default()
    }
    .retry_policy();
    assert_eq!(policy.retries, Some(3));
    assert_eq!(policy.timeout, Some(Duration::from_secs(5)));
    assert_eq!(policy.poll.retries, 10);
    assert_eq!(policy.poll.max_sleep, Duration::from_secs(5));
}

#[test]
fn test_lease_policy() {
    let config = Config {
        max_age: 60,
        refresh: Some(5),
        ..Config::default()
    };
    let lease = config.lease_policy();
    assert_eq!(lease.max_age, Duration::from_secs(60));
    assert_eq!(lease.refresh, Duration::from_secs(5));
}

#[test]
fn test_debug_overrides_verbosity() {
    let config = Config {
        debug: true,
        verbosity: Verbosity::Error,
        ..Config::default()
    };
    assert_eq!(config.effective_verbosity(), Verbosity::Debug);
}

#[test]
fn test_yaml_roundtrip_preserves_values() {
    let config = Config {
        retries: 4,
        max_age: 45,
        refresh: Some(9),
        dont_sweep: true,
        ..Config::default()
    };
    let yaml = config.to_yaml().unwrap();
    assert_eq!(Config::from_yaml(&yaml).unwrap(), config);
}
