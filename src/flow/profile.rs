//! Profile view and double-confirmed self-service erase
//!
//! These are single-shot trigger handlers, not a multi-step flow: /profile
//! renders the stored data, /delete asks for confirmation, and only the
//! explicit confirm button removes the user row together with every
//! derived history row, per-flow buckets and active instances.

use crate::core::error::AppResult;
use crate::core::rate_limiter::RateLimiter;
use crate::flow::claim::ClaimTag;
use crate::flow::engine::FlowEngine;
use crate::flow::event::{InboundEvent, Reply, Trigger};
use crate::flow::keyboards;
use crate::flow::session::SessionStore;
use crate::flow::Services;
use crate::storage::db;
use crate::texts;

/// Handles profile-related triggers. Returns `true` if the event was one
/// of ours (claim marked, reply queued).
#[allow(clippy::too_many_arguments)]
pub fn handle(
    event: &InboundEvent,
    services: &Services,
    sessions: &SessionStore,
    engines: &[&FlowEngine],
    limiter: &RateLimiter,
    claim: &mut ClaimTag,
    replies: &mut Vec<Reply>,
) -> AppResult<bool> {
    let user_id = event.user_id;
    match event.trigger {
        Some(Trigger::Profile) => {
            claim.mark_handled();
            let conn = services.db.get()?;
            let reply = match db::get_user(&conn, user_id)? {
                Some(user) if user.stage.is_completed() => texts::profile_summary(
                    user.platform,
                    user.whatsapp.as_deref(),
                    user.payment_method,
                    user.payment_details.as_deref(),
                ),
                _ => texts::no_profile(),
            };
            replies.push(Reply::text(user_id, reply));
            Ok(true)
        }
        Some(Trigger::Delete) => {
            claim.mark_handled();
            let conn = services.db.get()?;
            if db::get_user(&conn, user_id)?.is_none() {
                replies.push(Reply::text(user_id, texts::no_profile()));
            } else {
                replies.push(Reply::with_choices(
                    user_id,
                    texts::delete_confirmation(),
                    keyboards::delete_confirm(),
                ));
            }
            Ok(true)
        }
        Some(Trigger::DeleteConfirm) => {
            claim.mark_handled();
            let mut conn = services.db.get()?;
            let removed = db::delete_user(&mut conn, user_id)?;

            // Drop every in-memory trace as well: buckets, instances and
            // the throttle window all key off the id being erased.
            sessions.clear_user(user_id);
            for engine in engines {
                engine.remove_user(user_id);
            }
            limiter.forget(user_id);

            if removed {
                log::info!("user {} erased their profile", user_id);
            }
            replies.push(Reply::text(user_id, texts::profile_deleted()));
            Ok(true)
        }
        Some(Trigger::DeleteCancel) => {
            claim.mark_handled();
            replies.push(Reply::text(user_id, texts::delete_cancelled()));
            Ok(true)
        }
        _ => Ok(false),
    }
}
