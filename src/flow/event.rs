//! Platform-agnostic event and reply types
//!
//! The flow layer never sees Telegram types. The binding converts an
//! update into an [`InboundEvent`] — free text or a [`Trigger`] decoded
//! exactly once from the callback payload — and converts [`Reply`] values
//! back into outbound messages. Downstream code pattern-matches the enum
//! exhaustively; no handler ever splits payload strings itself.

use chrono::{DateTime, Utc};
use std::str::FromStr;

use crate::core::types::{PaymentMethod, Platform, TransferType};

/// One inbound event from the messaging platform.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub user_id: i64,
    /// Free text, present for plain messages
    pub text: Option<String>,
    /// Decoded menu/button press or command, present for structured input
    pub trigger: Option<Trigger>,
    pub timestamp: DateTime<Utc>,
}

impl InboundEvent {
    pub fn text(user_id: i64, text: impl Into<String>) -> Self {
        Self {
            user_id,
            text: Some(text.into()),
            trigger: None,
            timestamp: Utc::now(),
        }
    }

    pub fn trigger(user_id: i64, trigger: Trigger) -> Self {
        Self {
            user_id,
            text: None,
            trigger: Some(trigger),
            timestamp: Utc::now(),
        }
    }

    /// Commands are always flow entry points; the recovery router skips
    /// them entirely.
    pub fn is_command(&self) -> bool {
        matches!(self.trigger, Some(t) if t.kind().is_command())
    }
}

/// Every intent the bot understands, decoded once at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    // Commands
    Start,
    Sell,
    Admin,
    Cancel,
    Help,
    Profile,
    Delete,

    // Registration buttons
    RegPlatform(Platform),
    RegPayment(PaymentMethod),
    RegResume,
    RegRestart,

    // Sale buttons
    SellPlatform(Platform),
    SellTransfer(TransferType),
    SellBack,

    // Admin buttons
    AdminShowPrices,
    AdminEditPrices,
    AdminPlatform(Platform),
    AdminTransfer(TransferType),
    AdminBack,
    AdminClose,

    // Profile erase confirmation
    DeleteConfirm,
    DeleteCancel,
}

/// Discriminant used by transition tables: a state arm matches a kind,
/// the handler then reads the associated data off the trigger itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    Start,
    Sell,
    Admin,
    Cancel,
    Help,
    Profile,
    Delete,
    RegPlatform,
    RegPayment,
    RegResume,
    RegRestart,
    SellPlatform,
    SellTransfer,
    SellBack,
    AdminShowPrices,
    AdminEditPrices,
    AdminPlatform,
    AdminTransfer,
    AdminBack,
    AdminClose,
    DeleteConfirm,
    DeleteCancel,
}

impl TriggerKind {
    pub fn is_command(&self) -> bool {
        matches!(
            self,
            TriggerKind::Start
                | TriggerKind::Sell
                | TriggerKind::Admin
                | TriggerKind::Cancel
                | TriggerKind::Help
                | TriggerKind::Profile
                | TriggerKind::Delete
        )
    }
}

impl Trigger {
    pub fn kind(&self) -> TriggerKind {
        match self {
            Trigger::Start => TriggerKind::Start,
            Trigger::Sell => TriggerKind::Sell,
            Trigger::Admin => TriggerKind::Admin,
            Trigger::Cancel => TriggerKind::Cancel,
            Trigger::Help => TriggerKind::Help,
            Trigger::Profile => TriggerKind::Profile,
            Trigger::Delete => TriggerKind::Delete,
            Trigger::RegPlatform(_) => TriggerKind::RegPlatform,
            Trigger::RegPayment(_) => TriggerKind::RegPayment,
            Trigger::RegResume => TriggerKind::RegResume,
            Trigger::RegRestart => TriggerKind::RegRestart,
            Trigger::SellPlatform(_) => TriggerKind::SellPlatform,
            Trigger::SellTransfer(_) => TriggerKind::SellTransfer,
            Trigger::SellBack => TriggerKind::SellBack,
            Trigger::AdminShowPrices => TriggerKind::AdminShowPrices,
            Trigger::AdminEditPrices => TriggerKind::AdminEditPrices,
            Trigger::AdminPlatform(_) => TriggerKind::AdminPlatform,
            Trigger::AdminTransfer(_) => TriggerKind::AdminTransfer,
            Trigger::AdminBack => TriggerKind::AdminBack,
            Trigger::AdminClose => TriggerKind::AdminClose,
            Trigger::DeleteConfirm => TriggerKind::DeleteConfirm,
            Trigger::DeleteCancel => TriggerKind::DeleteCancel,
        }
    }

    /// Serializes the trigger into a callback payload.
    pub fn encode(&self) -> String {
        match self {
            Trigger::Start => "cmd:start".into(),
            Trigger::Sell => "cmd:sell".into(),
            Trigger::Admin => "cmd:admin".into(),
            Trigger::Cancel => "cmd:cancel".into(),
            Trigger::Help => "cmd:help".into(),
            Trigger::Profile => "cmd:profile".into(),
            Trigger::Delete => "cmd:delete".into(),
            Trigger::RegPlatform(p) => format!("reg:platform:{p}"),
            Trigger::RegPayment(m) => format!("reg:payment:{m}"),
            Trigger::RegResume => "reg:resume".into(),
            Trigger::RegRestart => "reg:restart".into(),
            Trigger::SellPlatform(p) => format!("sell:platform:{p}"),
            Trigger::SellTransfer(t) => format!("sell:type:{t}"),
            Trigger::SellBack => "sell:back".into(),
            Trigger::AdminShowPrices => "admin:prices".into(),
            Trigger::AdminEditPrices => "admin:edit".into(),
            Trigger::AdminPlatform(p) => format!("admin:platform:{p}"),
            Trigger::AdminTransfer(t) => format!("admin:type:{t}"),
            Trigger::AdminBack => "admin:back".into(),
            Trigger::AdminClose => "admin:close".into(),
            Trigger::DeleteConfirm => "profile:delete:confirm".into(),
            Trigger::DeleteCancel => "profile:delete:cancel".into(),
        }
    }

    /// Decodes a callback payload. Unknown payloads yield `None` and the
    /// event is treated as unhandled rather than crashing a flow.
    pub fn decode(data: &str) -> Option<Trigger> {
        let mut parts = data.splitn(3, ':');
        let (head, action, arg) = (parts.next()?, parts.next(), parts.next());
        match (head, action, arg) {
            ("cmd", Some("start"), None) => Some(Trigger::Start),
            ("cmd", Some("sell"), None) => Some(Trigger::Sell),
            ("cmd", Some("admin"), None) => Some(Trigger::Admin),
            ("cmd", Some("cancel"), None) => Some(Trigger::Cancel),
            ("cmd", Some("help"), None) => Some(Trigger::Help),
            ("cmd", Some("profile"), None) => Some(Trigger::Profile),
            ("cmd", Some("delete"), None) => Some(Trigger::Delete),
            ("reg", Some("platform"), Some(p)) => Platform::from_str(p).ok().map(Trigger::RegPlatform),
            ("reg", Some("payment"), Some(m)) => PaymentMethod::from_str(m).ok().map(Trigger::RegPayment),
            ("reg", Some("resume"), None) => Some(Trigger::RegResume),
            ("reg", Some("restart"), None) => Some(Trigger::RegRestart),
            ("sell", Some("platform"), Some(p)) => Platform::from_str(p).ok().map(Trigger::SellPlatform),
            ("sell", Some("type"), Some(t)) => TransferType::from_str(t).ok().map(Trigger::SellTransfer),
            ("sell", Some("back"), None) => Some(Trigger::SellBack),
            ("admin", Some("prices"), None) => Some(Trigger::AdminShowPrices),
            ("admin", Some("edit"), None) => Some(Trigger::AdminEditPrices),
            ("admin", Some("platform"), Some(p)) => Platform::from_str(p).ok().map(Trigger::AdminPlatform),
            ("admin", Some("type"), Some(t)) => TransferType::from_str(t).ok().map(Trigger::AdminTransfer),
            ("admin", Some("back"), None) => Some(Trigger::AdminBack),
            ("admin", Some("close"), None) => Some(Trigger::AdminClose),
            ("profile", Some("delete"), Some("confirm")) => Some(Trigger::DeleteConfirm),
            ("profile", Some("delete"), Some("cancel")) => Some(Trigger::DeleteCancel),
            _ => None,
        }
    }
}

/// One button in an outbound choice set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub label: String,
    pub trigger: Trigger,
}

impl Choice {
    pub fn new(label: impl Into<String>, trigger: Trigger) -> Self {
        Self {
            label: label.into(),
            trigger,
        }
    }
}

/// Rows of buttons attached to a reply.
pub type ChoiceSet = Vec<Vec<Choice>>;

/// One outbound reply instruction. The binding renders the choice set as
/// an inline keyboard; the flow layer never builds platform payloads.
#[derive(Debug, Clone)]
pub struct Reply {
    pub user_id: i64,
    pub text: String,
    pub choices: Option<ChoiceSet>,
}

impl Reply {
    pub fn text(user_id: i64, text: impl Into<String>) -> Self {
        Self {
            user_id,
            text: text.into(),
            choices: None,
        }
    }

    pub fn with_choices(user_id: i64, text: impl Into<String>, choices: ChoiceSet) -> Self {
        Self {
            user_id,
            text: text.into(),
            choices: Some(choices),
        }
    }
}
