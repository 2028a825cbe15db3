//! Choice-set builders for every menu the flows render
//!
//! These produce platform-agnostic [`ChoiceSet`]s; the Telegram binding
//! turns them into inline keyboards. Button labels and triggers stay next
//! to each other here so a flow handler never assembles rows inline.

use strum::IntoEnumIterator;

use crate::core::types::{PaymentMethod, Platform, TransferType};
use crate::flow::event::{Choice, ChoiceSet, Trigger};

pub fn reg_platforms() -> ChoiceSet {
    Platform::iter()
        .map(|p| vec![Choice::new(p.label(), Trigger::RegPlatform(p))])
        .collect()
}

pub fn reg_payments() -> ChoiceSet {
    PaymentMethod::iter()
        .map(|m| vec![Choice::new(m.label(), Trigger::RegPayment(m))])
        .collect()
}

pub fn resume_restart() -> ChoiceSet {
    vec![
        vec![Choice::new("✅ متابعة", Trigger::RegResume)],
        vec![Choice::new("🔄 بدء من جديد", Trigger::RegRestart)],
    ]
}

pub fn sell_platforms() -> ChoiceSet {
    Platform::iter()
        .map(|p| vec![Choice::new(p.label(), Trigger::SellPlatform(p))])
        .collect()
}

pub fn sell_transfers() -> ChoiceSet {
    vec![
        vec![Choice::new(
            TransferType::Normal.label(),
            Trigger::SellTransfer(TransferType::Normal),
        )],
        vec![Choice::new(
            TransferType::Instant.label(),
            Trigger::SellTransfer(TransferType::Instant),
        )],
        vec![Choice::new("🔙 رجوع", Trigger::SellBack)],
    ]
}

pub fn admin_menu() -> ChoiceSet {
    vec![
        vec![Choice::new("💰 عرض الأسعار", Trigger::AdminShowPrices)],
        vec![Choice::new("✏️ تعديل الأسعار", Trigger::AdminEditPrices)],
        vec![Choice::new("❌ إغلاق", Trigger::AdminClose)],
    ]
}

pub fn admin_platforms() -> ChoiceSet {
    let mut rows: ChoiceSet = Platform::iter()
        .map(|p| vec![Choice::new(p.label(), Trigger::AdminPlatform(p))])
        .collect();
    rows.push(vec![Choice::new("🔙 رجوع", Trigger::AdminBack)]);
    rows
}

pub fn admin_transfers() -> ChoiceSet {
    vec![
        vec![Choice::new(
            TransferType::Normal.label(),
            Trigger::AdminTransfer(TransferType::Normal),
        )],
        vec![Choice::new(
            TransferType::Instant.label(),
            Trigger::AdminTransfer(TransferType::Instant),
        )],
        vec![Choice::new("🔙 رجوع", Trigger::AdminBack)],
    ]
}

pub fn delete_confirm() -> ChoiceSet {
    vec![
        vec![Choice::new("🗑️ نعم، امسح نهائياً", Trigger::DeleteConfirm)],
        vec![Choice::new("❌ لا، احتفظ بالملف", Trigger::DeleteCancel)],
    ]
}
