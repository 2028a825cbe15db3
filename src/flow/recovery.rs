//! Recovery router
//!
//! Runs after every flow engine had its chance to claim the event. Order
//! matters and is load-bearing:
//!
//! 1. Claim check — a set tag means some handler already answered (even
//!    if it only failed mid-way); stay silent and reset the tag.
//! 2. Commands are never recovery's business; they are entry points or
//!    unrecognized.
//! 3. A user with any non-empty session bucket is owned by an active
//!    flow, even when that flow consumed this particular event silently.
//! 4. Otherwise classify the *persisted* stage: greet a stranger, show
//!    the menu to a finished user, or offer resume/restart to someone
//!    who abandoned registration partway.
//!
//! The router reads persisted state and seeds the registration bucket's
//! interrupted snapshot; it never writes the user row itself.

use crate::core::error::AppResult;
use crate::flow::claim::ClaimTag;
use crate::flow::engine::{FlowEngine, FlowState};
use crate::flow::event::{InboundEvent, Reply};
use crate::flow::keyboards;
use crate::flow::registration;
use crate::flow::session::SessionStore;
use crate::flow::Services;
use crate::storage::db;
use crate::texts;

pub fn handle(
    event: &InboundEvent,
    services: &Services,
    sessions: &SessionStore,
    claim: &mut ClaimTag,
    registration_engine: &FlowEngine,
    replies: &mut Vec<Reply>,
) -> AppResult<()> {
    if claim.check_and_clear() {
        return Ok(());
    }

    if event.is_command() {
        return Ok(());
    }

    if sessions.any_active(event.user_id) {
        log::debug!("recovery: user {} has active buckets, staying out", event.user_id);
        return Ok(());
    }

    let conn = services.db.get()?;
    let user = db::get_user(&conn, event.user_id)?;

    let Some(user) = user else {
        replies.push(Reply::text(event.user_id, texts::greet_new_user()));
        return Ok(());
    };

    if user.stage.is_completed() {
        replies.push(Reply::text(event.user_id, texts::already_registered()));
        return Ok(());
    }

    // Interrupted registration: render the resume/restart choice and seat
    // the user in the decision state so the button presses route there.
    registration::seed_interrupted_bucket(sessions, event.user_id, Some(&user), user.stage);

    let platform = user.platform.map(|p| p.label().to_string());
    replies.push(Reply::with_choices(
        event.user_id,
        texts::interrupted_question(platform.as_deref(), user.whatsapp.as_deref()),
        keyboards::resume_restart(),
    ));
    registration_engine.resume_at(event.user_id, FlowState::RegInterruptedDecision);

    Ok(())
}
