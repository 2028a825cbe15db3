//! Restart-resumption tests: a process restart must pick users up
//! mid-flow from the durable snapshot.
//!
//! Run with: cargo test --test snapshot_resume_test

use std::sync::Arc;

use pretty_assertions::assert_eq;

use sarraf::core::rate_limiter::RateLimiter;
use sarraf::core::types::Platform;
use sarraf::flow::{FlowName, FlowRuntime, FlowState, InboundEvent, Services, Trigger};
use sarraf::pricing::PriceLedger;
use sarraf::storage::db;
use sarraf::storage::snapshot;

const USER_ID: i64 = 2002;

fn make_runtime(services: &Arc<Services>, snapshot_path: &str) -> FlowRuntime {
    FlowRuntime::new(
        Arc::clone(services),
        RateLimiter::default(),
        Some(snapshot_path.to_string()),
    )
    .unwrap()
}

#[test]
fn test_restart_resumes_user_mid_flow() {
    let dir = tempfile::tempdir().unwrap();
    let snap_path = dir.path().join("sessions.json");
    let snap_path = snap_path.to_str().unwrap();

    let pool = db::create_test_pool().unwrap();
    let services = Arc::new(Services {
        ledger: PriceLedger::new(pool.clone()),
        db: pool,
    });

    // First process: user reaches the contact-entry step.
    {
        let runtime = make_runtime(&services, snap_path);
        runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::Start));
        runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::RegPlatform(Platform::Xbox)));
        assert_eq!(
            runtime.active_state(USER_ID, FlowName::Registration),
            Some(FlowState::RegContactEntry)
        );
    }

    // "Restart": a fresh runtime loads the snapshot written after the
    // last event.
    let runtime = make_runtime(&services, snap_path);
    runtime.restore(snapshot::load(snap_path));

    assert_eq!(
        runtime.active_state(USER_ID, FlowName::Registration),
        Some(FlowState::RegContactEntry)
    );
    assert_eq!(
        runtime.sessions().get(USER_ID, FlowName::Registration, "platform"),
        Some("xbox".to_string())
    );

    // The next message continues the flow as if nothing happened.
    runtime.handle_event(InboundEvent::text(USER_ID, "01112345678"));
    assert_eq!(
        runtime.active_state(USER_ID, FlowName::Registration),
        Some(FlowState::RegPaymentMethodChoice)
    );
}

#[test]
fn test_unknown_snapshot_state_is_treated_as_absent() {
    let dir = tempfile::tempdir().unwrap();
    let snap_path = dir.path().join("sessions.json");
    let snap_path = snap_path.to_str().unwrap();

    // A snapshot from some future build with a state this one has never
    // heard of.
    std::fs::write(
        snap_path,
        serde_json::json!({
            "instances": [{
                "user_id": USER_ID,
                "flow": "reg",
                "state": "reg_biometric_scan",
                "entered_at": "2026-08-07T10:00:00Z"
            }],
            "buckets": []
        })
        .to_string(),
    )
    .unwrap();

    let pool = db::create_test_pool().unwrap();
    let services = Arc::new(Services {
        ledger: PriceLedger::new(pool.clone()),
        db: pool,
    });
    let runtime = make_runtime(&services, snap_path);
    runtime.restore(snapshot::load(snap_path));

    assert_eq!(runtime.active_state(USER_ID, FlowName::Registration), None);
}

#[test]
fn test_snapshot_written_once_per_event() {
    let dir = tempfile::tempdir().unwrap();
    let snap_path = dir.path().join("sessions.json");
    let snap_path = snap_path.to_str().unwrap();

    let pool = db::create_test_pool().unwrap();
    let services = Arc::new(Services {
        ledger: PriceLedger::new(pool.clone()),
        db: pool,
    });
    let runtime = make_runtime(&services, snap_path);

    runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::Start));
    let snap = snapshot::load(snap_path);
    assert_eq!(snap.instances.len(), 1);
    assert_eq!(snap.instances[0].state, "reg_platform_choice");

    runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::Cancel));
    let snap = snapshot::load(snap_path);
    // Flow ended: the post-event snapshot carries no instance for it
    assert_eq!(snap.instances.len(), 0);
}
