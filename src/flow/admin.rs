//! Admin price-edit flow
//!
//! `MainMenu → PlatformSelect → TransferTypeSelect → PriceEntry →
//! terminal`. Entry is refused for non-admin ids before any state exists.
//! The actual catalog write goes through the ledger's serialized update
//! path; this flow only collects the key and the new price.

use std::str::FromStr;

use crate::core::config::admin::is_admin;
use crate::core::error::{AppError, AppResult};
use crate::core::types::{Platform, TransferType};
use crate::core::validation::validate_price;
use crate::flow::engine::{Arm, FlowCtx, FlowName, FlowSpec, FlowState, StateSpec, Step};
use crate::flow::event::{Trigger, TriggerKind};
use crate::flow::keyboards;
use crate::texts;

pub const KEY_PLATFORM: &str = "platform";
pub const KEY_TRANSFER: &str = "transfer_type";

pub fn spec() -> FlowSpec {
    FlowSpec {
        name: FlowName::Admin,
        entry: vec![Arm::on(TriggerKind::Admin, entry_admin)],
        states: vec![
            StateSpec {
                state: FlowState::AdminMainMenu,
                arms: vec![
                    Arm::on(TriggerKind::AdminShowPrices, on_show_prices),
                    Arm::on(TriggerKind::AdminEditPrices, on_edit_prices),
                    Arm::on(TriggerKind::AdminClose, on_close),
                    Arm::on_text(nudge_buttons),
                ],
            },
            StateSpec {
                state: FlowState::AdminPlatformSelect,
                arms: vec![
                    Arm::on(TriggerKind::AdminPlatform, on_platform),
                    Arm::on(TriggerKind::AdminBack, back_to_menu),
                    Arm::on_text(nudge_buttons),
                ],
            },
            StateSpec {
                state: FlowState::AdminTransferTypeSelect,
                arms: vec![
                    Arm::on(TriggerKind::AdminTransfer, on_transfer),
                    Arm::on(TriggerKind::AdminBack, back_to_platforms),
                    Arm::on_text(nudge_buttons),
                ],
            },
            StateSpec {
                state: FlowState::AdminPriceEntry,
                arms: vec![Arm::on_text(on_price)],
            },
        ],
        fallback: vec![Arm::on(TriggerKind::Cancel, on_cancel)],
    }
}

fn entry_admin(ctx: &mut FlowCtx<'_>) -> AppResult<Step> {
    if !is_admin(ctx.user_id()) {
        log::warn!("user {} tried to open the admin panel", ctx.user_id());
        ctx.reply(texts::not_admin());
        return Ok(Step::End);
    }

    ctx.reply_with(texts::admin_main_menu(), keyboards::admin_menu());
    Ok(Step::Goto(FlowState::AdminMainMenu))
}

fn on_show_prices(ctx: &mut FlowCtx<'_>) -> AppResult<Step> {
    let entries = ctx.services.ledger.all()?;
    ctx.reply_with(texts::admin_all_prices(&entries), keyboards::admin_menu());
    Ok(Step::Stay)
}

fn on_edit_prices(ctx: &mut FlowCtx<'_>) -> AppResult<Step> {
    ctx.reply_with(texts::admin_choose_platform(), keyboards::admin_platforms());
    Ok(Step::Goto(FlowState::AdminPlatformSelect))
}

fn on_close(ctx: &mut FlowCtx<'_>) -> AppResult<Step> {
    ctx.reply(texts::admin_closed());
    Ok(Step::End)
}

fn on_platform(ctx: &mut FlowCtx<'_>) -> AppResult<Step> {
    let Some(Trigger::AdminPlatform(platform)) = ctx.trigger() else {
        ctx.reply(texts::nudge_choose_with_buttons());
        return Ok(Step::Stay);
    };

    ctx.bucket_set(KEY_PLATFORM, platform.to_string());
    ctx.reply_with(texts::admin_choose_transfer(platform), keyboards::admin_transfers());
    Ok(Step::Goto(FlowState::AdminTransferTypeSelect))
}

fn on_transfer(ctx: &mut FlowCtx<'_>) -> AppResult<Step> {
    let Some(Trigger::AdminTransfer(transfer_type)) = ctx.trigger() else {
        ctx.reply(texts::nudge_choose_with_buttons());
        return Ok(Step::Stay);
    };

    let Some(platform) = bucket_platform(ctx) else {
        ctx.reply_with(texts::admin_choose_platform(), keyboards::admin_platforms());
        return Ok(Step::Goto(FlowState::AdminPlatformSelect));
    };

    ctx.bucket_set(KEY_TRANSFER, transfer_type.to_string());
    let current = ctx.services.ledger.read(platform, transfer_type)?;
    ctx.reply(texts::admin_enter_price(platform, transfer_type, current));
    Ok(Step::Goto(FlowState::AdminPriceEntry))
}

fn back_to_menu(ctx: &mut FlowCtx<'_>) -> AppResult<Step> {
    ctx.reply_with(texts::admin_main_menu(), keyboards::admin_menu());
    Ok(Step::Goto(FlowState::AdminMainMenu))
}

fn back_to_platforms(ctx: &mut FlowCtx<'_>) -> AppResult<Step> {
    ctx.reply_with(texts::admin_choose_platform(), keyboards::admin_platforms());
    Ok(Step::Goto(FlowState::AdminPlatformSelect))
}

fn on_price(ctx: &mut FlowCtx<'_>) -> AppResult<Step> {
    let new_price = match validate_price(ctx.text()) {
        Ok(price) => price,
        Err(err) => {
            ctx.reply(texts::price_error(&err));
            return Ok(Step::Stay);
        }
    };

    let (Some(platform), Some(transfer_type)) = (bucket_platform(ctx), bucket_transfer(ctx)) else {
        ctx.reply_with(texts::admin_choose_platform(), keyboards::admin_platforms());
        return Ok(Step::Goto(FlowState::AdminPlatformSelect));
    };

    match ctx
        .services
        .ledger
        .update(platform, transfer_type, new_price, ctx.user_id())
    {
        Ok(update) => {
            ctx.reply(texts::price_updated(
                platform,
                transfer_type,
                update.old_price,
                update.new_price,
            ));
            Ok(Step::End)
        }
        // The ledger re-validates bounds at its own boundary; a rejection
        // here means this handler and the ledger disagree — still a
        // user-correctable situation, so stay in the entry state.
        Err(AppError::Validation(msg)) => {
            log::warn!("ledger rejected price {}: {}", new_price, msg);
            ctx.reply(texts::generic_error());
            Ok(Step::Stay)
        }
        // Storage failures bubble to the engine: generic notice, state kept.
        Err(err) => Err(err),
    }
}

fn nudge_buttons(ctx: &mut FlowCtx<'_>) -> AppResult<Step> {
    ctx.reply(texts::nudge_choose_with_buttons());
    Ok(Step::Stay)
}

fn on_cancel(ctx: &mut FlowCtx<'_>) -> AppResult<Step> {
    ctx.reply(texts::cancelled());
    Ok(Step::End)
}

fn bucket_platform(ctx: &FlowCtx<'_>) -> Option<Platform> {
    ctx.bucket_get(KEY_PLATFORM).and_then(|p| Platform::from_str(&p).ok())
}

fn bucket_transfer(ctx: &FlowCtx<'_>) -> Option<TransferType> {
    ctx.bucket_get(KEY_TRANSFER)
        .and_then(|t| TransferType::from_str(&t).ok())
}
