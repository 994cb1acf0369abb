//! Walks one full rotation against the in-memory collaborators.
//!
//! Demonstrates the four-step protocol end to end: a fresh value is staged,
//! both enforcement points are updated with the firewall leading, the origin
//! is probed with both values, and the version switch is finalized.
//!
//! Run with: cargo run --example rotate

use originverify::mock::{
    CallLog, MockDistribution, MockEdgeFirewall, MockOriginProbe, MockSecretStore, RecordingDelay,
};
use originverify::{Rotation, RotationConfig, RotationStep, VersionStage};
use std::sync::Arc;

const SECRET_ID: &str = "prod/origin-secret";

#[tokio::main]
async fn main() -> originverify::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    println!("=== Origin Verification Header Rotation ===\n");

    let config = RotationConfig::new("prod-acl", "a1b2c3", "E2EXAMPLE")
        .with_header_name("x-origin-verify")
        .with_origin_url("https://origin.example.com/healthz")
        .with_stack_name("prod");

    // A secret mid-rotation: v0 holds the value both systems currently
    // enforce, v1 is the version the scheduler is staging.
    let log = CallLog::default();
    let store = Arc::new(MockSecretStore::new(SECRET_ID));
    store.stage_current("v0", "old123").await;
    store.begin_rotation("v1").await;
    store.set_random_value("new456").await;

    let firewall = Arc::new(MockEdgeFirewall::new(log.clone()));
    let distribution = Arc::new(MockDistribution::new(&config, log.clone()));
    distribution.add_origin("api", &[("x-origin-verify", "old123")]);
    distribution.add_origin("assets", &[("x-origin-verify", "old123")]);

    let probe = Arc::new(MockOriginProbe::default());
    probe.accept("old123");
    probe.accept("new456");

    let rotation = Rotation::new(
        config,
        store.clone(),
        firewall.clone(),
        distribution.clone(),
        probe,
        Arc::new(RecordingDelay::new(log.clone())),
    );

    for (i, step) in [
        RotationStep::Create,
        RotationStep::Set,
        RotationStep::Test,
        RotationStep::Finish,
    ]
    .into_iter()
    .enumerate()
    {
        println!("{}. {}...", i + 1, step);
        rotation.execute_step(SECRET_ID, "v1", step).await?;
        println!("   ✓ done");
    }

    println!("\nExternal calls, in order:");
    for entry in log.entries() {
        println!("   {entry}");
    }

    let rule = firewall.last_rule().expect("no rule installed");
    let values: Vec<&str> = rule.matches.iter().map(|m| m.value.as_str()).collect();
    println!("\nFirewall rule '{}' accepts: {:?}", rule.name, values);
    println!(
        "Distribution header on 'api': {}",
        distribution.origins()[0].custom_headers[0].value
    );
    println!(
        "v1 stages: {:?}",
        store.stages_of("v1").await
    );
    assert!(store.stages_of("v1").await.contains(&VersionStage::Current));

    println!("\n✓ Rotation complete: the old value is no longer enforced anywhere.");
    Ok(())
}
