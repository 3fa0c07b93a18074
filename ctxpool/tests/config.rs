use ctxpool::{
    BuildError, ContextPool, PoolBuilder, PoolConfig, Propagation, RejectionPolicy,
    ShutdownPolicy,
};
use proptest::prelude::*;
use std::time::Duration;

#[test]
fn test_defaults() {
    let config = PoolConfig::default();

    assert_eq!(config.core_threads, 10);
    assert_eq!(config.max_threads, 20);
    assert_eq!(config.queue_capacity, 10);
    assert_eq!(config.propagation, Propagation::CaptureAndRestore);
    assert_eq!(config.rejection, RejectionPolicy::Reject);
    assert_eq!(config.shutdown, ShutdownPolicy::Drain);
    assert_eq!(config.keep_alive(), Duration::from_secs(60));
    assert_eq!(config.thread_name_prefix, "Thread-");
    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_json_keeps_defaults() {
    let config = PoolConfig::from_json(
        r#"{ "core_threads": 4, "propagation": "inherit-at-spawn", "rejection": "block" }"#,
    )
    .unwrap();

    assert_eq!(config.core_threads, 4);
    assert_eq!(config.propagation, Propagation::InheritAtSpawn);
    assert_eq!(config.rejection, RejectionPolicy::Block);
    assert_eq!(config.max_threads, 20);
    assert_eq!(config.shutdown, ShutdownPolicy::Drain);
}

#[test]
fn test_json_enum_names() {
    let config = PoolConfig::from_json(
        r#"{ "propagation": "none", "shutdown": "cancel-pending", "keep_alive_ms": 250 }"#,
    )
    .unwrap();

    assert_eq!(config.propagation, Propagation::None);
    assert_eq!(config.shutdown, ShutdownPolicy::CancelPending);
    assert_eq!(config.keep_alive(), Duration::from_millis(250));
}

#[test]
fn test_json_rejects_unknown_strategy() {
    assert!(PoolConfig::from_json(r#"{ "propagation": "telepathy" }"#).is_err());
    assert!(PoolConfig::from_json("not json").is_err());
}

#[test]
fn test_json_serialization_uses_config_names() {
    let json = serde_json::to_value(PoolConfig::default()).unwrap();

    assert_eq!(json["propagation"], "capture-and-restore");
    assert_eq!(json["rejection"], "reject");
    assert_eq!(json["shutdown"], "drain");
}

#[test]
fn test_strategy_names_round_trip_through_from_str() {
    for propagation in Propagation::ALL {
        assert_eq!(propagation.as_str().parse::<Propagation>(), Ok(propagation));
        assert_eq!(propagation.to_string(), propagation.as_str());
    }

    assert_eq!("block".parse::<RejectionPolicy>(), Ok(RejectionPolicy::Block));
    assert_eq!(
        "cancel-pending".parse::<ShutdownPolicy>(),
        Ok(ShutdownPolicy::CancelPending)
    );
}

#[test]
fn test_unknown_names_are_reported() {
    let err = "capture".parse::<Propagation>().unwrap_err();
    assert_eq!(err.to_string(), "unknown propagation `capture`");

    let err = "drop".parse::<RejectionPolicy>().unwrap_err();
    assert_eq!(err.to_string(), "unknown rejection policy `drop`");

    assert!("drain-all".parse::<ShutdownPolicy>().is_err());
}

#[test]
fn test_build_rejects_zero_core_threads() {
    let err = ContextPool::builder().core_threads(0).build().unwrap_err();
    assert!(matches!(err, BuildError::ZeroCoreThreads));
}

#[test]
fn test_build_rejects_max_below_core() {
    let err = ContextPool::builder()
        .core_threads(4)
        .max_threads(2)
        .build()
        .unwrap_err();

    assert!(matches!(err, BuildError::MaxBelowCore { core: 4, max: 2 }));
    assert_eq!(
        err.to_string(),
        "max_threads (2) must be at least core_threads (4)"
    );
}

#[test]
fn test_build_rejects_zero_queue_capacity() {
    let err = ContextPool::builder().queue_capacity(0).build().unwrap_err();
    assert!(matches!(err, BuildError::ZeroQueueCapacity));
}

#[test]
fn test_builder_from_config() {
    let config = PoolConfig {
        core_threads: 2,
        max_threads: 2,
        propagation: Propagation::None,
        ..PoolConfig::default()
    };

    let builder = PoolBuilder::from_config(config).thread_name_prefix("worker-");
    assert_eq!(builder.config().thread_name_prefix, "worker-");

    let pool = builder.build().unwrap();
    assert_eq!(pool.propagation(), Propagation::None);
    assert_eq!(pool.config().core_threads, 2);
    assert_eq!(pool.live_workers(), 2);
}

proptest! {
    #[test]
    fn prop_validate_accepts_exactly_sane_bounds(
        core in 0usize..64,
        max in 0usize..64,
        queue in 0usize..64,
    ) {
        let config = PoolConfig {
            core_threads: core,
            max_threads: max,
            queue_capacity: queue,
            ..PoolConfig::default()
        };

        let sane = core > 0 && max >= core && queue > 0;
        prop_assert_eq!(config.validate().is_ok(), sane);
    }
}
