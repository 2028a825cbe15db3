//! Integration tests for the conversation orchestration layer
//!
//! Run with: cargo test --test flow_engine_test

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use sarraf::core::rate_limiter::RateLimiter;
use sarraf::core::types::{PaymentMethod, Platform, RegistrationStage, TransferType};
use sarraf::flow::{FlowName, FlowRuntime, FlowState, InboundEvent, Reply, Services, Trigger};
use sarraf::pricing::PriceLedger;
use sarraf::storage::db;
use sarraf::texts;

const ADMIN_ID: i64 = 9000;
const USER_ID: i64 = 1001;

/// Pins the admin allowlist before anything reads the config static.
/// Every test calls this first.
fn init() {
    std::env::set_var("ADMIN_IDS", ADMIN_ID.to_string());
}

fn make_runtime() -> (Arc<Services>, FlowRuntime) {
    init();
    let pool = db::create_test_pool().unwrap();
    let services = Arc::new(Services {
        ledger: PriceLedger::new(pool.clone()),
        db: pool,
    });
    let runtime = FlowRuntime::new(Arc::clone(&services), RateLimiter::default(), None).unwrap();
    (services, runtime)
}

fn texts_of(replies: &[Reply]) -> Vec<&str> {
    replies.iter().map(|r| r.text.as_str()).collect()
}

/// Drives a user through the whole registration happy path.
fn register(runtime: &FlowRuntime, user_id: i64) {
    runtime.handle_event(InboundEvent::trigger(user_id, Trigger::Start));
    runtime.handle_event(InboundEvent::trigger(user_id, Trigger::RegPlatform(Platform::Playstation)));
    runtime.handle_event(InboundEvent::text(user_id, "01012345678"));
    runtime.handle_event(InboundEvent::trigger(
        user_id,
        Trigger::RegPayment(PaymentMethod::VodafoneCash),
    ));
    runtime.handle_event(InboundEvent::text(user_id, "01012345678"));
}

// ============================================================================
// Registration Flow
// ============================================================================

mod registration_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_happy_path_populates_all_fields() {
        let (services, runtime) = make_runtime();
        register(&runtime, USER_ID);

        let conn = services.db.get().unwrap();
        let user = db::get_user(&conn, USER_ID).unwrap().unwrap();
        assert_eq!(user.stage, RegistrationStage::Completed);
        assert_eq!(user.platform, Some(Platform::Playstation));
        assert_eq!(user.whatsapp.as_deref(), Some("01012345678"));
        assert_eq!(user.payment_method, Some(PaymentMethod::VodafoneCash));
        assert_eq!(user.payment_details.as_deref(), Some("01012345678"));

        // Flow ended: no active instance, bucket cleared automatically
        assert_eq!(runtime.active_state(USER_ID, FlowName::Registration), None);
        assert!(!runtime.sessions().has(USER_ID, FlowName::Registration));
    }

    #[test]
    fn test_malformed_phone_self_loops_without_bucket_write() {
        let (_services, runtime) = make_runtime();
        runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::Start));
        runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::RegPlatform(Platform::Playstation)));

        let replies = runtime.handle_event(InboundEvent::text(USER_ID, "010abc45678"));

        // Specific letters-vs-digits error, same state, no `contact` key
        assert_eq!(
            texts_of(&replies),
            vec![texts::phone_error(&sarraf::core::validation::PhoneError::NonDigit).as_str()]
        );
        assert_eq!(
            runtime.active_state(USER_ID, FlowName::Registration),
            Some(FlowState::RegContactEntry)
        );
        assert_eq!(runtime.sessions().get(USER_ID, FlowName::Registration, "contact"), None);

        // Valid input then advances and records the contact
        runtime.handle_event(InboundEvent::text(USER_ID, "01012345678"));
        assert_eq!(
            runtime.active_state(USER_ID, FlowName::Registration),
            Some(FlowState::RegPaymentMethodChoice)
        );
        assert_eq!(
            runtime.sessions().get(USER_ID, FlowName::Registration, "contact"),
            Some("01012345678".to_string())
        );
    }

    #[test]
    fn test_wrong_length_and_bad_prefix_are_distinct_errors() {
        let (_services, runtime) = make_runtime();
        runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::Start));
        runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::RegPlatform(Platform::Xbox)));

        let short = runtime.handle_event(InboundEvent::text(USER_ID, "0101234567"));
        let bad_prefix = runtime.handle_event(InboundEvent::text(USER_ID, "09912345678"));
        assert_ne!(short[0].text, bad_prefix[0].text);
    }

    #[test]
    fn test_reentry_resumes_instead_of_forking() {
        let (_services, runtime) = make_runtime();
        runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::Start));
        runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::RegPlatform(Platform::Pc)));
        // Mid-flow /start lands on the interrupted-decision branch
        let replies = runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::Start));
        assert!(replies[0].choices.is_some());
        assert_eq!(
            runtime.active_state(USER_ID, FlowName::Registration),
            Some(FlowState::RegInterruptedDecision)
        );

        // Resume returns to the stage the persisted row dictates, without
        // re-asking for the platform
        runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::RegResume));
        assert_eq!(
            runtime.active_state(USER_ID, FlowName::Registration),
            Some(FlowState::RegContactEntry)
        );
    }

    #[test]
    fn test_restart_wipes_bucket_and_returns_to_platform_choice() {
        let (_services, runtime) = make_runtime();
        runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::Start));
        runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::RegPlatform(Platform::Pc)));
        runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::Start));

        runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::RegRestart));
        assert_eq!(
            runtime.active_state(USER_ID, FlowName::Registration),
            Some(FlowState::RegPlatformChoice)
        );
        assert_eq!(runtime.sessions().get(USER_ID, FlowName::Registration, "platform"), None);
    }

    #[test]
    fn test_cancel_ends_flow_and_clears_bucket() {
        let (_services, runtime) = make_runtime();
        runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::Start));
        runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::RegPlatform(Platform::Pc)));

        let replies = runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::Cancel));
        assert_eq!(texts_of(&replies), vec![texts::cancelled().as_str()]);
        assert_eq!(runtime.active_state(USER_ID, FlowName::Registration), None);
        assert!(!runtime.sessions().has(USER_ID, FlowName::Registration));
    }

    #[test]
    fn test_completed_user_start_shows_menu() {
        let (_services, runtime) = make_runtime();
        register(&runtime, USER_ID);

        let replies = runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::Start));
        assert_eq!(texts_of(&replies), vec![texts::already_registered().as_str()]);
        assert_eq!(runtime.active_state(USER_ID, FlowName::Registration), None);
    }
}

// ============================================================================
// Sale Flow
// ============================================================================

mod sale_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sell_requires_completed_registration() {
        let (_services, runtime) = make_runtime();
        let replies = runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::Sell));
        assert_eq!(texts_of(&replies), vec![texts::must_register_first().as_str()]);
        assert_eq!(runtime.active_state(USER_ID, FlowName::Sale), None);
    }

    #[test]
    fn test_sale_happy_path_records_order_with_ledger_quote() {
        let (services, runtime) = make_runtime();
        register(&runtime, USER_ID);

        runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::Sell));
        runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::SellPlatform(Platform::Playstation)));
        runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::SellTransfer(TransferType::Normal)));
        let replies = runtime.handle_event(InboundEvent::text(USER_ID, "1000"));

        // 5600 per 1M -> 1000 coins quote 5
        assert!(replies[0].text.contains("5 ج.م"), "got: {}", replies[0].text);
        assert_eq!(runtime.active_state(USER_ID, FlowName::Sale), None);

        let conn = services.db.get().unwrap();
        let (count, amount, price): (i64, i64, i64) = conn
            .query_row(
                "SELECT COUNT(*), MAX(amount), MAX(price) FROM sell_orders WHERE telegram_id = ?1",
                [USER_ID],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .unwrap();
        assert_eq!((count, amount, price), (1, 1000, 5));
    }

    #[test]
    fn test_amount_errors_are_three_distinct_kinds() {
        let (_services, runtime) = make_runtime();
        register(&runtime, USER_ID);
        runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::Sell));
        runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::SellPlatform(Platform::Pc)));
        runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::SellTransfer(TransferType::Instant)));

        let not_digits = runtime.handle_event(InboundEvent::text(USER_ID, "5k"));
        let too_low = runtime.handle_event(InboundEvent::text(USER_ID, "10"));
        let too_high = runtime.handle_event(InboundEvent::text(USER_ID, "999999"));

        assert_ne!(not_digits[0].text, too_low[0].text);
        assert_ne!(too_low[0].text, too_high[0].text);
        assert_ne!(not_digits[0].text, too_high[0].text);
        // All three self-loop
        assert_eq!(
            runtime.active_state(USER_ID, FlowName::Sale),
            Some(FlowState::SellAmountEntry)
        );
    }

    #[test]
    fn test_back_returns_to_platform_choice() {
        let (_services, runtime) = make_runtime();
        register(&runtime, USER_ID);
        runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::Sell));
        runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::SellPlatform(Platform::Xbox)));
        runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::SellBack));
        assert_eq!(
            runtime.active_state(USER_ID, FlowName::Sale),
            Some(FlowState::SellPlatformChoice)
        );
    }
}

// ============================================================================
// Admin Flow
// ============================================================================

mod admin_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_non_admin_is_rejected_without_state() {
        let (_services, runtime) = make_runtime();
        let replies = runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::Admin));
        assert_eq!(texts_of(&replies), vec![texts::not_admin().as_str()]);
        assert_eq!(runtime.active_state(USER_ID, FlowName::Admin), None);
        assert!(!runtime.sessions().has(USER_ID, FlowName::Admin));
    }

    #[test]
    fn test_admin_price_edit_happy_path() {
        let (services, runtime) = make_runtime();

        runtime.handle_event(InboundEvent::trigger(ADMIN_ID, Trigger::Admin));
        runtime.handle_event(InboundEvent::trigger(ADMIN_ID, Trigger::AdminEditPrices));
        runtime.handle_event(InboundEvent::trigger(ADMIN_ID, Trigger::AdminPlatform(Platform::Playstation)));
        runtime.handle_event(InboundEvent::trigger(ADMIN_ID, Trigger::AdminTransfer(TransferType::Normal)));
        let replies = runtime.handle_event(InboundEvent::text(ADMIN_ID, "5500"));

        assert_eq!(
            texts_of(&replies),
            vec![texts::price_updated(Platform::Playstation, TransferType::Normal, Some(5600), 5500).as_str()]
        );
        assert_eq!(
            services.ledger.read(Platform::Playstation, TransferType::Normal).unwrap(),
            Some(5500)
        );

        // Exactly one audit record with the old and new values
        let conn = services.db.get().unwrap();
        let (count, old, new): (i64, Option<i64>, i64) = conn
            .query_row(
                "SELECT COUNT(*), MAX(old_price), MAX(new_price) FROM price_audit_log",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .unwrap();
        assert_eq!((count, old, new), (1, Some(5600), 5500));
        assert_eq!(runtime.active_state(ADMIN_ID, FlowName::Admin), None);
    }

    #[test]
    fn test_below_minimum_price_rejected_storage_untouched() {
        let (services, runtime) = make_runtime();

        runtime.handle_event(InboundEvent::trigger(ADMIN_ID, Trigger::Admin));
        runtime.handle_event(InboundEvent::trigger(ADMIN_ID, Trigger::AdminEditPrices));
        runtime.handle_event(InboundEvent::trigger(ADMIN_ID, Trigger::AdminPlatform(Platform::Playstation)));
        runtime.handle_event(InboundEvent::trigger(ADMIN_ID, Trigger::AdminTransfer(TransferType::Normal)));
        let replies = runtime.handle_event(InboundEvent::text(ADMIN_ID, "500"));

        assert!(replies[0].text.contains("1,000"), "got: {}", replies[0].text);
        assert_eq!(
            services.ledger.read(Platform::Playstation, TransferType::Normal).unwrap(),
            Some(5600)
        );
        let conn = services.db.get().unwrap();
        let audits: i64 = conn
            .query_row("SELECT COUNT(*) FROM price_audit_log", [], |r| r.get(0))
            .unwrap();
        assert_eq!(audits, 0);
        // Still at price entry for another try
        assert_eq!(
            runtime.active_state(ADMIN_ID, FlowName::Admin),
            Some(FlowState::AdminPriceEntry)
        );
    }

    #[test]
    fn test_show_prices_stays_in_menu() {
        let (_services, runtime) = make_runtime();
        runtime.handle_event(InboundEvent::trigger(ADMIN_ID, Trigger::Admin));
        let replies = runtime.handle_event(InboundEvent::trigger(ADMIN_ID, Trigger::AdminShowPrices));
        assert!(replies[0].text.contains("5,600"));
        assert_eq!(
            runtime.active_state(ADMIN_ID, FlowName::Admin),
            Some(FlowState::AdminMainMenu)
        );
    }
}

// ============================================================================
// Cross-flow Policies
// ============================================================================

mod policy_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_flow_families_are_mutually_exclusive() {
        let (_services, runtime) = make_runtime();
        register(&runtime, USER_ID);

        // Start registration again via restart path to own the user
        runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::Sell));
        assert!(runtime.active_state(USER_ID, FlowName::Sale).is_some());

        let replies = runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::Admin));
        assert_eq!(texts_of(&replies), vec![texts::busy_with_other_flow().as_str()]);
        assert_eq!(runtime.active_state(USER_ID, FlowName::Admin), None);
    }

    #[test]
    fn test_bucket_isolation_across_flows() {
        let (_services, runtime) = make_runtime();
        runtime.sessions().set(USER_ID, FlowName::Sale, "amount", "500");
        runtime.sessions().set(USER_ID, FlowName::Registration, "platform", "pc");

        runtime.sessions().clear(USER_ID, FlowName::Registration);

        assert_eq!(
            runtime.sessions().get(USER_ID, FlowName::Sale, "amount"),
            Some("500".to_string())
        );
    }

    #[test]
    fn test_rate_limiter_gates_flow_entry() {
        init();
        let pool = db::create_test_pool().unwrap();
        let services = Arc::new(Services {
            ledger: PriceLedger::new(pool.clone()),
            db: pool,
        });
        let limiter = RateLimiter::new(Duration::from_secs(60), 1);
        let runtime = FlowRuntime::new(services, limiter, None).unwrap();

        // First entry passes and creates the flow
        runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::Start));
        // Cancel ends it (fallback arms are not entries, not counted)
        runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::Cancel));

        // Second entry inside the window is throttled, no state created
        let replies = runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::Start));
        assert_eq!(texts_of(&replies), vec![texts::throttled().as_str()]);
        assert_eq!(runtime.active_state(USER_ID, FlowName::Registration), None);
    }

    #[test]
    fn test_mid_flow_input_is_not_rate_limited() {
        init();
        let pool = db::create_test_pool().unwrap();
        let services = Arc::new(Services {
            ledger: PriceLedger::new(pool.clone()),
            db: pool,
        });
        let limiter = RateLimiter::new(Duration::from_secs(60), 1);
        let runtime = FlowRuntime::new(services, limiter, None).unwrap();

        runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::Start));
        // Entry allowance is spent, but mid-flow steps keep working
        let replies = runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::RegPlatform(Platform::Pc)));
        assert!(replies[0].text.contains("010/011/012/015"));
    }
}

// ============================================================================
// Recovery Router
// ============================================================================

mod recovery_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unknown_user_free_text_gets_greeting() {
        let (_services, runtime) = make_runtime();
        let replies = runtime.handle_event(InboundEvent::text(USER_ID, "hello?"));
        assert_eq!(texts_of(&replies), vec![texts::greet_new_user().as_str()]);
    }

    #[test]
    fn test_completed_user_free_text_gets_menu() {
        let (_services, runtime) = make_runtime();
        register(&runtime, USER_ID);
        let replies = runtime.handle_event(InboundEvent::text(USER_ID, "are you there"));
        assert_eq!(texts_of(&replies), vec![texts::already_registered().as_str()]);
    }

    #[test]
    fn test_interrupted_user_offered_resume_then_continues() {
        let (services, runtime) = make_runtime();

        // Persisted progress up to the contact step, then the process
        // "restarts": fresh runtime, no in-memory state.
        runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::Start));
        runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::RegPlatform(Platform::Playstation)));
        let runtime = FlowRuntime::new(Arc::clone(&services), RateLimiter::default(), None).unwrap();

        let replies = runtime.handle_event(InboundEvent::text(USER_ID, "hi again"));
        assert_eq!(replies.len(), 1);
        assert!(replies[0].choices.is_some(), "expected resume/restart buttons");
        assert_eq!(
            runtime.active_state(USER_ID, FlowName::Registration),
            Some(FlowState::RegInterruptedDecision)
        );

        // Choosing resume re-enters the contact step without re-asking
        // for the platform, and the flow completes normally from there.
        runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::RegResume));
        assert_eq!(
            runtime.active_state(USER_ID, FlowName::Registration),
            Some(FlowState::RegContactEntry)
        );
        runtime.handle_event(InboundEvent::text(USER_ID, "01012345678"));
        assert_eq!(
            runtime.active_state(USER_ID, FlowName::Registration),
            Some(FlowState::RegPaymentMethodChoice)
        );
    }

    #[test]
    fn test_recovery_silent_when_flow_claimed_the_event() {
        let (_services, runtime) = make_runtime();
        runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::Start));
        runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::RegPlatform(Platform::Pc)));

        // The contact-entry handler answers; recovery must not add a
        // second reply to the same event.
        let replies = runtime.handle_event(InboundEvent::text(USER_ID, "01012345678"));
        assert_eq!(replies.len(), 1);
    }

    #[test]
    fn test_recovery_stays_out_while_any_bucket_is_active() {
        let (_services, runtime) = make_runtime();
        // An active conversation owns this user even though no engine
        // claims the event itself.
        runtime.sessions().set(USER_ID, FlowName::Sale, "platform", "pc");

        let replies = runtime.handle_event(InboundEvent::text(USER_ID, "random chatter"));
        assert_eq!(replies.len(), 0);
    }

    #[test]
    fn test_commands_are_not_recoverys_business() {
        let (_services, runtime) = make_runtime();
        // /help is answered by the runtime itself, not the router
        let replies = runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::Help));
        assert_eq!(texts_of(&replies), vec![texts::help().as_str()]);
    }
}

// ============================================================================
// Profile & Erase
// ============================================================================

mod profile_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_profile_summary_after_registration() {
        let (_services, runtime) = make_runtime();
        register(&runtime, USER_ID);
        let replies = runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::Profile));
        assert!(replies[0].text.contains("01012345678"));
    }

    #[test]
    fn test_erase_requires_explicit_confirmation() {
        let (services, runtime) = make_runtime();
        register(&runtime, USER_ID);

        // First step only asks; nothing is deleted yet
        let replies = runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::Delete));
        assert!(replies[0].choices.is_some());
        let conn = services.db.get().unwrap();
        assert!(db::get_user(&conn, USER_ID).unwrap().is_some());
        drop(conn);

        // Cancelling keeps the profile
        runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::DeleteCancel));
        let conn = services.db.get().unwrap();
        assert!(db::get_user(&conn, USER_ID).unwrap().is_some());
        drop(conn);

        // Confirming removes the user and derived history
        runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::Delete));
        runtime.handle_event(InboundEvent::trigger(USER_ID, Trigger::DeleteConfirm));
        let conn = services.db.get().unwrap();
        assert!(db::get_user(&conn, USER_ID).unwrap().is_none());
        let logs: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM registration_log WHERE telegram_id = ?1",
                [USER_ID],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(logs, 0);
    }
}
