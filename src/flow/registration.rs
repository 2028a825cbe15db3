//! Registration flow
//!
//! `PlatformChoice → ContactEntry → PaymentMethodChoice →
//! PaymentDetailsEntry → Completed`, with an `InterruptedDecision` side
//! branch reachable only from the entry point when the persisted stage
//! shows an abandoned prior attempt.
//!
//! Each advancing handler writes its field together with the new stage
//! checkpoint in one transaction; validation rejections self-loop without
//! touching the bucket or the checkpoint.

use std::str::FromStr;

use crate::core::error::AppResult;
use crate::core::types::{PaymentMethod, RegistrationStage};
use crate::core::validation::{validate_contact, validate_payment_details};
use crate::flow::engine::{Arm, FlowCtx, FlowName, FlowSpec, FlowState, StateSpec, Step};
use crate::flow::event::{Trigger, TriggerKind};
use crate::flow::keyboards;
use crate::storage::db::{self, UserField};
use crate::texts;

/// Bucket keys. `interrupted_*` fields are a read-only snapshot seeded
/// from the persisted row for rendering the interrupted-decision prompt;
/// the row itself stays authoritative.
pub const KEY_PLATFORM: &str = "platform";
pub const KEY_CONTACT: &str = "contact";
pub const KEY_PAYMENT_METHOD: &str = "payment_method";
pub const KEY_INTERRUPTED_PLATFORM: &str = "interrupted_platform";
pub const KEY_INTERRUPTED_CONTACT: &str = "interrupted_contact";
pub const KEY_INTERRUPTED_STAGE: &str = "interrupted_stage";

pub fn spec() -> FlowSpec {
    FlowSpec {
        name: FlowName::Registration,
        entry: vec![
            Arm::on(TriggerKind::Start, entry_start),
            // The recovery router renders the same resume/restart buttons;
            // their presses must enter the flow even after a restart wiped
            // the in-memory instance.
            Arm::on(TriggerKind::RegResume, on_resume),
            Arm::on(TriggerKind::RegRestart, on_restart),
        ],
        states: vec![
            StateSpec {
                state: FlowState::RegPlatformChoice,
                arms: vec![
                    Arm::on(TriggerKind::RegPlatform, on_platform),
                    Arm::on_text(nudge_buttons),
                ],
            },
            StateSpec {
                state: FlowState::RegContactEntry,
                arms: vec![Arm::on_text(on_contact)],
            },
            StateSpec {
                state: FlowState::RegPaymentMethodChoice,
                arms: vec![
                    Arm::on(TriggerKind::RegPayment, on_payment_method),
                    Arm::on_text(nudge_buttons),
                ],
            },
            StateSpec {
                state: FlowState::RegPaymentDetailsEntry,
                arms: vec![Arm::on_text(on_payment_details)],
            },
            StateSpec {
                state: FlowState::RegInterruptedDecision,
                arms: vec![
                    Arm::on(TriggerKind::RegResume, on_resume),
                    Arm::on(TriggerKind::RegRestart, on_restart),
                    Arm::on_text(nudge_interrupted),
                ],
            },
        ],
        fallback: vec![Arm::on(TriggerKind::Cancel, on_cancel)],
    }
}

/// Smart entry: routes /start by the persisted stage — fresh start,
/// already registered, or interrupted attempt.
fn entry_start(ctx: &mut FlowCtx<'_>) -> AppResult<Step> {
    let user_id = ctx.user_id();
    let mut conn = ctx.services.db.get()?;
    let stage = db::get_stage(&conn, user_id)?;

    if stage.is_completed() {
        ctx.reply(texts::already_registered());
        return Ok(Step::End);
    }

    if stage.is_interrupted() {
        let user = db::get_user(&conn, user_id)?;
        seed_interrupted_bucket(ctx.sessions, user_id, user.as_ref(), stage);
        let platform = ctx.bucket_get(KEY_INTERRUPTED_PLATFORM);
        let contact = ctx.bucket_get(KEY_INTERRUPTED_CONTACT);
        ctx.reply_with(
            texts::interrupted_question(platform.as_deref(), contact.as_deref()),
            keyboards::resume_restart(),
        );
        return Ok(Step::Goto(FlowState::RegInterruptedDecision));
    }

    // Fresh start (no row, or a row that never left `start`)
    ctx.bucket_clear();
    db::save_stage(&mut conn, user_id, RegistrationStage::ChoosingPlatform)?;
    ctx.reply_with(texts::choose_platform(), keyboards::reg_platforms());
    Ok(Step::Goto(FlowState::RegPlatformChoice))
}

fn on_platform(ctx: &mut FlowCtx<'_>) -> AppResult<Step> {
    let Some(Trigger::RegPlatform(platform)) = ctx.trigger() else {
        ctx.reply(texts::nudge_choose_with_buttons());
        return Ok(Step::Stay);
    };

    ctx.bucket_set(KEY_PLATFORM, platform.to_string());
    let mut conn = ctx.services.db.get()?;
    db::save_field_and_stage(
        &mut conn,
        ctx.user_id(),
        UserField::Platform(platform),
        RegistrationStage::EnteringContact,
    )?;

    ctx.reply(texts::platform_saved_enter_contact(platform));
    Ok(Step::Goto(FlowState::RegContactEntry))
}

fn on_contact(ctx: &mut FlowCtx<'_>) -> AppResult<Step> {
    match validate_contact(ctx.text()) {
        Ok(contact) => {
            ctx.bucket_set(KEY_CONTACT, contact.as_str());
            let mut conn = ctx.services.db.get()?;
            db::save_field_and_stage(
                &mut conn,
                ctx.user_id(),
                UserField::Whatsapp(&contact),
                RegistrationStage::ChoosingPayment,
            )?;
            ctx.reply_with(texts::contact_saved_choose_payment(), keyboards::reg_payments());
            Ok(Step::Goto(FlowState::RegPaymentMethodChoice))
        }
        Err(err) => {
            // Rejected input: no `contact` key, no stage move.
            ctx.reply(texts::phone_error(&err));
            Ok(Step::Stay)
        }
    }
}

fn on_payment_method(ctx: &mut FlowCtx<'_>) -> AppResult<Step> {
    let Some(Trigger::RegPayment(method)) = ctx.trigger() else {
        ctx.reply(texts::nudge_choose_with_buttons());
        return Ok(Step::Stay);
    };

    ctx.bucket_set(KEY_PAYMENT_METHOD, method.to_string());
    let mut conn = ctx.services.db.get()?;
    db::save_field_and_stage(
        &mut conn,
        ctx.user_id(),
        UserField::PaymentMethod(method),
        RegistrationStage::EnteringPaymentDetails,
    )?;

    ctx.reply(texts::payment_instructions(method));
    Ok(Step::Goto(FlowState::RegPaymentDetailsEntry))
}

fn on_payment_details(ctx: &mut FlowCtx<'_>) -> AppResult<Step> {
    let mut conn = ctx.services.db.get()?;

    // Bucket first (warm path), persisted row as the fallback after a
    // restart dropped the bucket.
    let method = ctx
        .bucket_get(KEY_PAYMENT_METHOD)
        .and_then(|m| PaymentMethod::from_str(&m).ok())
        .or(db::get_user(&conn, ctx.user_id())?.and_then(|u| u.payment_method));

    let Some(method) = method else {
        ctx.reply_with(texts::contact_saved_choose_payment(), keyboards::reg_payments());
        return Ok(Step::Goto(FlowState::RegPaymentMethodChoice));
    };

    match validate_payment_details(method, ctx.text()) {
        Ok(details) => {
            db::save_field_and_stage(
                &mut conn,
                ctx.user_id(),
                UserField::PaymentDetails(&details.cleaned),
                RegistrationStage::Completed,
            )?;

            if let Some(warning) = details.warning {
                ctx.reply(warning);
            }

            let user = db::get_user(&conn, ctx.user_id())?;
            let (platform, contact) = user
                .map(|u| (u.platform, u.whatsapp.unwrap_or_default()))
                .unwrap_or((None, String::new()));
            ctx.reply(texts::registration_complete(
                platform,
                &contact,
                Some(method),
                &details.cleaned,
            ));
            Ok(Step::End)
        }
        Err(err) => {
            ctx.reply(texts::payment_details_error(&err));
            Ok(Step::Stay)
        }
    }
}

/// Resume lands on the state implied by the persisted stage — never by
/// the bucket, which may be stale or missing after a restart.
fn on_resume(ctx: &mut FlowCtx<'_>) -> AppResult<Step> {
    let mut conn = ctx.services.db.get()?;
    let stage = db::get_stage(&conn, ctx.user_id())?;

    let next = match stage {
        RegistrationStage::EnteringContact => FlowState::RegContactEntry,
        RegistrationStage::ChoosingPayment => FlowState::RegPaymentMethodChoice,
        RegistrationStage::EnteringPaymentDetails => FlowState::RegPaymentDetailsEntry,
        RegistrationStage::ChoosingPlatform => FlowState::RegPlatformChoice,
        // Nothing sensible to resume; restart instead.
        RegistrationStage::Start | RegistrationStage::Completed => {
            ctx.bucket_clear();
            db::save_stage(&mut conn, ctx.user_id(), RegistrationStage::ChoosingPlatform)?;
            ctx.reply_with(texts::restarting(), keyboards::reg_platforms());
            return Ok(Step::Goto(FlowState::RegPlatformChoice));
        }
    };

    match next {
        FlowState::RegPlatformChoice => {
            ctx.reply_with(texts::resume_at_stage(stage), keyboards::reg_platforms());
        }
        FlowState::RegPaymentMethodChoice => {
            ctx.reply_with(texts::resume_at_stage(stage), keyboards::reg_payments());
        }
        _ => ctx.reply(texts::resume_at_stage(stage)),
    }
    Ok(Step::Goto(next))
}

fn on_restart(ctx: &mut FlowCtx<'_>) -> AppResult<Step> {
    ctx.bucket_clear();
    let mut conn = ctx.services.db.get()?;
    db::save_stage(&mut conn, ctx.user_id(), RegistrationStage::ChoosingPlatform)?;
    ctx.reply_with(texts::restarting(), keyboards::reg_platforms());
    Ok(Step::Goto(FlowState::RegPlatformChoice))
}

fn nudge_buttons(ctx: &mut FlowCtx<'_>) -> AppResult<Step> {
    ctx.reply(texts::nudge_choose_with_buttons());
    Ok(Step::Stay)
}

fn nudge_interrupted(ctx: &mut FlowCtx<'_>) -> AppResult<Step> {
    let platform = ctx.bucket_get(KEY_INTERRUPTED_PLATFORM);
    let contact = ctx.bucket_get(KEY_INTERRUPTED_CONTACT);
    ctx.reply_with(
        texts::interrupted_question(platform.as_deref(), contact.as_deref()),
        keyboards::resume_restart(),
    );
    Ok(Step::Stay)
}

fn on_cancel(ctx: &mut FlowCtx<'_>) -> AppResult<Step> {
    ctx.reply(texts::cancelled());
    Ok(Step::End)
}

/// Overwrites the bucket's interrupted snapshot from the persisted row.
/// Shared with the recovery router so both prompts render the same data.
pub fn seed_interrupted_bucket(
    sessions: &crate::flow::session::SessionStore,
    user_id: i64,
    user: Option<&db::User>,
    stage: RegistrationStage,
) {
    if let Some(user) = user {
        if let Some(platform) = user.platform {
            sessions.set(user_id, FlowName::Registration, KEY_INTERRUPTED_PLATFORM, platform.label());
        }
        if let Some(ref whatsapp) = user.whatsapp {
            sessions.set(user_id, FlowName::Registration, KEY_INTERRUPTED_CONTACT, whatsapp.clone());
        }
    }
    sessions.set(user_id, FlowName::Registration, KEY_INTERRUPTED_STAGE, stage.to_string());
}
