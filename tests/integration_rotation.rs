//! End-to-end rotation protocol tests over the in-memory collaborators.
//!
//! Run with:
//!   cargo test --test integration_rotation

#![cfg(feature = "mock")]

use originverify::mock::{
    CallLog, MockDistribution, MockEdgeFirewall, MockOriginProbe, MockSecretStore, RecordingDelay,
};
use originverify::{
    Rotation, RotationConfig, RotationError, RotationRequest, RotationStep, VersionStage,
};
use std::sync::Arc;

const SECRET_ID: &str = "prod/origin-secret";

struct Fixture {
    rotation: Rotation,
    store: Arc<MockSecretStore>,
    firewall: Arc<MockEdgeFirewall>,
    distribution: Arc<MockDistribution>,
    probe: Arc<MockOriginProbe>,
    log: CallLog,
}

fn test_config() -> RotationConfig {
    RotationConfig::new("prod-acl", "a1b2c3", "E2EXAMPLE")
        .with_rule_priority(0)
        .with_header_name("x-origin-verify")
        .with_origin_url("https://origin.example.com/healthz")
        .with_stack_name("prod")
}

fn fixture() -> Fixture {
    let config = test_config();
    let log = CallLog::default();
    let store = Arc::new(MockSecretStore::new(SECRET_ID));
    let firewall = Arc::new(MockEdgeFirewall::new(log.clone()));
    let distribution = Arc::new(MockDistribution::new(&config, log.clone()));
    let probe = Arc::new(MockOriginProbe::default());

    let rotation = Rotation::new(
        config,
        store.clone(),
        firewall.clone(),
        distribution.clone(),
        probe.clone(),
        Arc::new(RecordingDelay::new(log.clone())),
    );

    Fixture {
        rotation,
        store,
        firewall,
        distribution,
        probe,
        log,
    }
}

/// A secret mid-rotation: `v0` is current with value `old123`, `v1` is the
/// pending version the scheduler is staging, and the origin accepts both
/// values.
async fn seeded() -> Fixture {
    let f = fixture();
    f.store.stage_current("v0", "old123").await;
    f.store.begin_rotation("v1").await;
    f.store.set_random_value("new456").await;
    f.distribution
        .add_origin("api", &[("x-origin-verify", "old123")]);
    f.probe.accept("old123");
    f.probe.accept("new456");
    f
}

#[tokio::test]
async fn test_full_rotation() {
    let f = seeded().await;

    for step in [
        RotationStep::Create,
        RotationStep::Set,
        RotationStep::Test,
        RotationStep::Finish,
    ] {
        f.rotation
            .execute_step(SECRET_ID, "v1", step)
            .await
            .unwrap_or_else(|e| panic!("{step} failed: {e}"));
    }

    // The firewall saw both values, OR'd.
    let rule = f.firewall.last_rule().expect("no rule installed");
    let values: Vec<&str> = rule.matches.iter().map(|m| m.value.as_str()).collect();
    assert_eq!(values, ["new456", "old123"]);

    // The distribution now sends the new value.
    assert_eq!(
        f.distribution.origins()[0].custom_headers[0].value,
        "new456"
    );

    // Both values went through the live path.
    assert_eq!(f.probe.probed(), ["new456", "old123"]);

    // The current stage moved to v1; v0 was demoted.
    let v1 = f.store.stages_of("v1").await;
    assert!(v1.contains(&VersionStage::Current));
    let v0 = f.store.stages_of("v0").await;
    assert!(!v0.contains(&VersionStage::Current));
    assert!(v0.contains(&VersionStage::Previous));
}

#[tokio::test]
async fn test_already_current_version_is_noop_for_every_step() {
    for step in [
        RotationStep::Create,
        RotationStep::Set,
        RotationStep::Test,
        RotationStep::Finish,
    ] {
        let f = fixture();
        f.store.stage_current("v1", "old123").await;

        f.rotation
            .execute_step(SECRET_ID, "v1", step)
            .await
            .unwrap_or_else(|e| panic!("{step} failed: {e}"));

        assert!(f.log.is_empty(), "{step} touched an external system");
        assert_eq!(f.distribution.write_count(), 0);
    }
}

#[tokio::test]
async fn test_create_is_idempotent() {
    let f = seeded().await;

    f.rotation
        .execute_step(SECRET_ID, "v1", RotationStep::Create)
        .await
        .unwrap();
    assert_eq!(f.store.value_of("v1").await.unwrap().header_value, "new456");

    // A second CREATE must not overwrite the staged value, even though the
    // store would now hand out a different random one.
    f.store.set_random_value("other789").await;
    f.rotation
        .execute_step(SECRET_ID, "v1", RotationStep::Create)
        .await
        .unwrap();
    assert_eq!(f.store.value_of("v1").await.unwrap().header_value, "new456");
}

#[tokio::test]
async fn test_create_requires_existing_current_value() {
    let f = fixture();
    f.store.begin_rotation("v1").await;

    let err = f
        .rotation
        .execute_step(SECRET_ID, "v1", RotationStep::Create)
        .await
        .unwrap_err();

    assert!(matches!(err, RotationError::SecretNotFound(_)));
}

#[tokio::test]
async fn test_set_orders_firewall_before_delay_before_distribution() {
    let f = seeded().await;

    f.rotation
        .execute_step(SECRET_ID, "v1", RotationStep::Create)
        .await
        .unwrap();
    f.rotation
        .execute_step(SECRET_ID, "v1", RotationStep::Set)
        .await
        .unwrap();

    assert_eq!(
        f.log.entries(),
        [
            "firewall.put_rule",
            "propagation.settle",
            "distribution.set_header"
        ]
    );
}

#[tokio::test]
async fn test_set_fails_when_no_origin_carries_header() {
    let f = fixture();
    f.store.stage_current("v0", "old123").await;
    f.store.begin_rotation("v1").await;
    f.distribution.add_origin("api", &[("x-trace", "t1")]);

    f.rotation
        .execute_step(SECRET_ID, "v1", RotationStep::Create)
        .await
        .unwrap();
    let err = f
        .rotation
        .execute_step(SECRET_ID, "v1", RotationStep::Set)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RotationError::HeaderNotFound { ref header, .. } if header == "x-origin-verify"
    ));
    // No configuration write was issued and the origin kept its headers.
    assert_eq!(f.distribution.write_count(), 0);
    assert_eq!(f.distribution.origins()[0].custom_headers[0].value, "t1");
}

#[tokio::test]
async fn test_set_fails_before_any_write_when_not_deployed() {
    let f = seeded().await;
    f.rotation
        .execute_step(SECRET_ID, "v1", RotationStep::Create)
        .await
        .unwrap();
    f.distribution.set_deployed(false);

    let err = f
        .rotation
        .execute_step(SECRET_ID, "v1", RotationStep::Set)
        .await
        .unwrap_err();

    assert!(matches!(err, RotationError::ResourceNotReady(_)));
    assert!(f.log.is_empty(), "a write was attempted: {:?}", f.log.entries());
    assert_eq!(f.firewall.install_count(), 0);
}

#[tokio::test]
async fn test_set_surfaces_firewall_failure_and_retries_cleanly() {
    let f = seeded().await;
    f.rotation
        .execute_step(SECRET_ID, "v1", RotationStep::Create)
        .await
        .unwrap();
    f.firewall
        .inject_put_error(RotationError::external("waf", "throttled"));

    let err = f
        .rotation
        .execute_step(SECRET_ID, "v1", RotationStep::Set)
        .await
        .unwrap_err();
    assert!(matches!(err, RotationError::ExternalUpdateFailed { .. }));
    assert_eq!(f.distribution.write_count(), 0);

    // The scheduler re-invokes the step; it completes without manual repair.
    f.rotation
        .execute_step(SECRET_ID, "v1", RotationStep::Set)
        .await
        .unwrap();
    assert_eq!(
        f.distribution.origins()[0].custom_headers[0].value,
        "new456"
    );
}

#[tokio::test]
async fn test_test_fails_naming_rejected_pending_value() {
    // The origin only accepts the old value, as when the firewall change has
    // not finished propagating.
    let f = fixture();
    f.store.stage_current("v0", "old123").await;
    f.store.begin_rotation("v1").await;
    f.store.set_random_value("new456").await;
    f.probe.accept("old123");

    f.rotation
        .execute_step(SECRET_ID, "v1", RotationStep::Create)
        .await
        .unwrap();
    let err = f
        .rotation
        .execute_step(SECRET_ID, "v1", RotationStep::Test)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RotationError::VerificationFailed { ref value, .. } if value == "new456"
    ));
}

#[tokio::test]
async fn test_test_fails_naming_rejected_current_value() {
    let f = fixture();
    f.store.stage_current("v0", "old123").await;
    f.store.begin_rotation("v1").await;
    f.store.set_random_value("new456").await;
    f.probe.accept("new456");

    f.rotation
        .execute_step(SECRET_ID, "v1", RotationStep::Create)
        .await
        .unwrap();
    let err = f
        .rotation
        .execute_step(SECRET_ID, "v1", RotationStep::Test)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RotationError::VerificationFailed { ref value, .. } if value == "old123"
    ));
}

#[tokio::test]
async fn test_finish_moves_current_exactly_once() {
    let f = seeded().await;
    f.rotation
        .execute_step(SECRET_ID, "v1", RotationStep::Create)
        .await
        .unwrap();

    f.rotation
        .execute_step(SECRET_ID, "v1", RotationStep::Finish)
        .await
        .unwrap();
    assert!(f
        .store
        .stages_of("v1")
        .await
        .contains(&VersionStage::Current));
    assert!(!f
        .store
        .stages_of("v0")
        .await
        .contains(&VersionStage::Current));

    // A duplicate FINISH is short-circuited by the already-current guard.
    f.rotation
        .execute_step(SECRET_ID, "v1", RotationStep::Finish)
        .await
        .unwrap();
    assert!(f
        .store
        .stages_of("v1")
        .await
        .contains(&VersionStage::Current));
}

#[tokio::test]
async fn test_unknown_version_fails_without_external_writes() {
    for step in [
        RotationStep::Create,
        RotationStep::Set,
        RotationStep::Test,
        RotationStep::Finish,
    ] {
        let f = seeded().await;

        let err = f
            .rotation
            .execute_step(SECRET_ID, "v9", step)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RotationError::UnknownVersion { ref version, .. } if version == "v9"
        ));
        assert!(f.log.is_empty());
        assert_eq!(f.distribution.write_count(), 0);
    }
}

#[tokio::test]
async fn test_rotation_disabled_is_rejected_before_dispatch() {
    let f = seeded().await;
    f.store.disable_rotation().await;

    let err = f
        .rotation
        .execute_step(SECRET_ID, "v1", RotationStep::Create)
        .await
        .unwrap_err();

    assert!(matches!(err, RotationError::RotationDisabled(_)));
}

#[tokio::test]
async fn test_version_without_pending_stage_is_rejected() {
    let f = seeded().await;
    f.store
        .set_stages("v2", vec![VersionStage::Previous])
        .await;

    let err = f
        .rotation
        .execute_step(SECRET_ID, "v2", RotationStep::Set)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RotationError::InvalidStageForRotation { ref version, .. } if version == "v2"
    ));
}

#[tokio::test]
async fn test_handle_parses_scheduler_event() {
    let f = seeded().await;

    let request: RotationRequest = serde_json::from_str(&format!(
        r#"{{"SecretId": "{SECRET_ID}", "ClientRequestToken": "v1", "Step": "createSecret"}}"#
    ))
    .unwrap();
    f.rotation.handle(&request).await.unwrap();
    assert_eq!(f.store.value_of("v1").await.unwrap().header_value, "new456");
}

#[tokio::test]
async fn test_handle_rejects_unknown_step() {
    let f = seeded().await;

    let request: RotationRequest = serde_json::from_str(&format!(
        r#"{{"SecretId": "{SECRET_ID}", "ClientRequestToken": "v1", "Step": "rollbackSecret"}}"#
    ))
    .unwrap();
    let err = f.rotation.handle(&request).await.unwrap_err();

    assert!(matches!(err, RotationError::InvalidStep(step) if step == "rollbackSecret"));
}
