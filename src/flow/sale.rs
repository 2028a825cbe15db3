//! Coin sale flow
//!
//! `PlatformChoice → TransferTypeChoice → AmountEntry → terminal`. Entry
//! requires a completed registration. A completed sale records an order
//! row; the quote comes from the ledger's reference price, never from a
//! hardcoded table.

use std::str::FromStr;

use crate::core::error::AppResult;
use crate::core::types::{Platform, TransferType};
use crate::core::validation::validate_amount;
use crate::flow::engine::{Arm, FlowCtx, FlowName, FlowSpec, FlowState, StateSpec, Step};
use crate::flow::event::{Trigger, TriggerKind};
use crate::flow::keyboards;
use crate::storage::db;
use crate::texts;

pub const KEY_PLATFORM: &str = "platform";
pub const KEY_TRANSFER: &str = "transfer_type";

pub fn spec() -> FlowSpec {
    FlowSpec {
        name: FlowName::Sale,
        entry: vec![Arm::on(TriggerKind::Sell, entry_sell)],
        states: vec![
            StateSpec {
                state: FlowState::SellPlatformChoice,
                arms: vec![
                    Arm::on(TriggerKind::SellPlatform, on_platform),
                    Arm::on_text(nudge_buttons),
                ],
            },
            StateSpec {
                state: FlowState::SellTransferTypeChoice,
                arms: vec![
                    Arm::on(TriggerKind::SellTransfer, on_transfer),
                    Arm::on(TriggerKind::SellBack, back_to_platforms),
                    Arm::on_text(nudge_buttons),
                ],
            },
            StateSpec {
                state: FlowState::SellAmountEntry,
                arms: vec![Arm::on_text(on_amount)],
            },
        ],
        fallback: vec![Arm::on(TriggerKind::Cancel, on_cancel)],
    }
}

fn entry_sell(ctx: &mut FlowCtx<'_>) -> AppResult<Step> {
    let conn = ctx.services.db.get()?;
    let stage = db::get_stage(&conn, ctx.user_id())?;
    if !stage.is_completed() {
        ctx.reply(texts::must_register_first());
        return Ok(Step::End);
    }

    ctx.reply_with(texts::sell_choose_platform(), keyboards::sell_platforms());
    Ok(Step::Goto(FlowState::SellPlatformChoice))
}

fn on_platform(ctx: &mut FlowCtx<'_>) -> AppResult<Step> {
    let Some(Trigger::SellPlatform(platform)) = ctx.trigger() else {
        ctx.reply(texts::nudge_choose_with_buttons());
        return Ok(Step::Stay);
    };

    ctx.bucket_set(KEY_PLATFORM, platform.to_string());

    let normal = ctx.services.ledger.read(platform, TransferType::Normal)?;
    let instant = ctx.services.ledger.read(platform, TransferType::Instant)?;
    ctx.reply_with(
        texts::sell_platform_prices(platform, normal, instant),
        keyboards::sell_transfers(),
    );
    Ok(Step::Goto(FlowState::SellTransferTypeChoice))
}

fn on_transfer(ctx: &mut FlowCtx<'_>) -> AppResult<Step> {
    let Some(Trigger::SellTransfer(transfer_type)) = ctx.trigger() else {
        ctx.reply(texts::nudge_choose_with_buttons());
        return Ok(Step::Stay);
    };

    let Some(platform) = bucket_platform(ctx) else {
        // Bucket lost (restart mid-flow with a stale snapshot); start over.
        ctx.reply_with(texts::sell_choose_platform(), keyboards::sell_platforms());
        return Ok(Step::Goto(FlowState::SellPlatformChoice));
    };

    ctx.bucket_set(KEY_TRANSFER, transfer_type.to_string());
    ctx.reply(texts::sell_enter_amount(platform, transfer_type));
    Ok(Step::Goto(FlowState::SellAmountEntry))
}

fn back_to_platforms(ctx: &mut FlowCtx<'_>) -> AppResult<Step> {
    ctx.reply_with(texts::sell_choose_platform(), keyboards::sell_platforms());
    Ok(Step::Goto(FlowState::SellPlatformChoice))
}

fn on_amount(ctx: &mut FlowCtx<'_>) -> AppResult<Step> {
    let amount = match validate_amount(ctx.text()) {
        Ok(amount) => amount,
        Err(err) => {
            ctx.reply(texts::amount_error(&err));
            return Ok(Step::Stay);
        }
    };

    let (Some(platform), Some(transfer_type)) = (bucket_platform(ctx), bucket_transfer(ctx)) else {
        ctx.reply_with(texts::sell_choose_platform(), keyboards::sell_platforms());
        return Ok(Step::Goto(FlowState::SellPlatformChoice));
    };

    let Some(per_million) = ctx.services.ledger.read(platform, transfer_type)? else {
        ctx.reply(texts::sell_price_unavailable());
        return Ok(Step::End);
    };
    let Some(total) = ctx.services.ledger.quote(platform, transfer_type, amount)? else {
        ctx.reply(texts::sell_price_unavailable());
        return Ok(Step::End);
    };

    let conn = ctx.services.db.get()?;
    let order = db::insert_order(&conn, ctx.user_id(), platform, transfer_type, amount, total)?;

    ctx.reply(texts::sell_order_confirmed(
        &order.id,
        platform,
        transfer_type,
        amount,
        total,
        per_million,
    ));
    Ok(Step::End)
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
