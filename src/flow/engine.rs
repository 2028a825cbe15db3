//! Generic finite-state-machine runner for conversation flows
//!
//! A flow is described by a [`FlowSpec`]: entry arms (triggers usable from
//! "no active flow"), per-state arms, and fallback arms usable from any
//! state (cancel). The table is validated at startup — a flow with no
//! fallback coverage refuses to boot rather than stranding users at
//! runtime.
//!
//! Dispatch advances exactly one instance per user. Re-entry while an
//! instance is active resumes it (the entry handler decides where to
//! land); it never forks a second instance for the same address.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{Display, EnumString};

use crate::core::error::{AppError, AppResult};
use crate::flow::claim::ClaimTag;
use crate::flow::event::{ChoiceSet, InboundEvent, Reply, Trigger, TriggerKind};
use crate::flow::session::SessionStore;
use crate::flow::Services;
use crate::texts;

/// Stable flow addresses. Also the bucket namespace per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FlowName {
    #[strum(serialize = "reg")]
    #[serde(rename = "reg")]
    Registration,
    #[strum(serialize = "sell")]
    #[serde(rename = "sell")]
    Sale,
    #[strum(serialize = "admin")]
    Admin,
}

/// Every non-terminal state across all flows. Terminal states are not
/// represented: ending a flow removes its instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    // Registration
    RegPlatformChoice,
    RegContactEntry,
    RegPaymentMethodChoice,
    RegPaymentDetailsEntry,
    RegInterruptedDecision,
    // Sale
    SellPlatformChoice,
    SellTransferTypeChoice,
    SellAmountEntry,
    // Admin price editing
    AdminMainMenu,
    AdminPlatformSelect,
    AdminTransferTypeSelect,
    AdminPriceEntry,
}

/// What a handler tells the engine to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Self-loop: stay in the current state (validation rejected input).
    /// Does not clear the bucket.
    Stay,
    /// Move to another state of the same flow.
    Goto(FlowState),
    /// Terminal: the engine clears the flow's bucket automatically.
    End,
}

/// Dispatch result visible to the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Advanced(FlowState),
    Ended,
    NotClaimed,
}

/// What an arm matches on: a structured trigger kind, or any free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmMatch {
    Kind(TriggerKind),
    Text,
}

impl ArmMatch {
    fn matches(&self, event: &InboundEvent) -> bool {
        match self {
            ArmMatch::Kind(kind) => matches!(event.trigger, Some(t) if t.kind() == *kind),
            ArmMatch::Text => event.trigger.is_none() && event.text.is_some(),
        }
    }
}

/// Handler signature. Handlers do their storage work through the context
/// and queue replies on it; the engine owns state transitions.
pub type Handler = fn(&mut FlowCtx<'_>) -> AppResult<Step>;

pub struct Arm {
    pub matches: ArmMatch,
    pub handler: Handler,
}

impl Arm {
    pub fn on(kind: TriggerKind, handler: Handler) -> Self {
        Self {
            matches: ArmMatch::Kind(kind),
            handler,
        }
    }

    pub fn on_text(handler: Handler) -> Self {
        Self {
            matches: ArmMatch::Text,
            handler,
        }
    }
}

pub struct StateSpec {
    pub state: FlowState,
    pub arms: Vec<Arm>,
}

/// Complete transition table for one flow.
pub struct FlowSpec {
    pub name: FlowName,
    pub entry: Vec<Arm>,
    pub states: Vec<StateSpec>,
    /// Arms usable from any state; must at least cover explicit cancel.
    pub fallback: Vec<Arm>,
}

impl FlowSpec {
    /// Fails fast on tables that would strand users: no entry, a state
    /// with no arms, duplicate states, or missing fallback coverage.
    pub fn validate(&self) -> AppResult<()> {
        if self.entry.is_empty() {
            return Err(AppError::Validation(format!("flow {} has no entry arms", self.name)));
        }
        if self.fallback.is_empty() {
            return Err(AppError::Validation(format!("flow {} has no fallback arms", self.name)));
        }
        let mut seen = std::collections::HashSet::new();
        for state_spec in &self.states {
            if !seen.insert(state_spec.state) {
                return Err(AppError::Validation(format!(
                    "flow {} defines state {} twice",
                    self.name, state_spec.state
                )));
            }
            if state_spec.arms.is_empty() {
                return Err(AppError::Validation(format!(
                    "flow {} state {} has no arms",
                    self.name, state_spec.state
                )));
            }
        }
        Ok(())
    }

    fn state_arms(&self, state: FlowState) -> Option<&[Arm]> {
        self.states
            .iter()
            .find(|s| s.state == state)
            .map(|s| s.arms.as_slice())
    }
}

/// One user's position inside a flow.
#[derive(Debug, Clone, Copy)]
pub struct FlowInstance {
    pub state: FlowState,
    pub entered_at: DateTime<Utc>,
}

/// Serializable instance record for the durable snapshot. The state is
/// kept as text so that records from older builds simply fail to parse
/// and are treated as absent, per the restart contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceSnapshot {
    pub user_id: i64,
    pub flow: FlowName,
    pub state: String,
    pub entered_at: DateTime<Utc>,
}

/// Mutable context threaded through one handler invocation.
pub struct FlowCtx<'a> {
    pub event: &'a InboundEvent,
    pub services: &'a Services,
    pub sessions: &'a SessionStore,
    pub claim: &'a mut ClaimTag,
    pub flow: FlowName,
    pub replies: &'a mut Vec<Reply>,
}

impl FlowCtx<'_> {
    pub fn user_id(&self) -> i64 {
        self.event.user_id
    }

    pub fn text(&self) -> &str {
        self.event.text.as_deref().unwrap_or_default()
    }

    pub fn trigger(&self) -> Option<Trigger> {
        self.event.trigger
    }

    pub fn reply(&mut self, text: impl Into<String>) {
        self.replies.push(Reply::text(self.event.user_id, text));
    }

    pub fn reply_with(&mut self, text: impl Into<String>, choices: ChoiceSet) {
        self.replies.push(Reply::with_choices(self.event.user_id, text, choices));
    }

    pub fn bucket_get(&self, key: &str) -> Option<String> {
        self.sessions.get(self.event.user_id, self.flow, key)
    }

    pub fn bucket_set(&self, key: &str, value: impl Into<String>) {
        self.sessions.set(self.event.user_id, self.flow, key, value);
    }

    pub fn bucket_clear(&self) {
        self.sessions.clear(self.event.user_id, self.flow);
    }
}

pub struct FlowEngine {
    spec: FlowSpec,
    instances: DashMap<i64, FlowInstance>,
}

impl FlowEngine {
    pub fn new(spec: FlowSpec) -> AppResult<Self> {
        spec.validate()?;
        Ok(Self {
            spec,
            instances: DashMap::new(),
        })
    }

    pub fn name(&self) -> FlowName {
        self.spec.name
    }

    pub fn has_active(&self, user_id: i64) -> bool {
        self.instances.contains_key(&user_id)
    }

    pub fn active_state(&self, user_id: i64) -> Option<FlowState> {
        self.instances.get(&user_id).map(|i| i.state)
    }

    /// True if this event would *enter* the flow for a user with no
    /// active instance. The runtime uses this for the rate-limit gate and
    /// the mutual-exclusion check before any state is created.
    pub fn is_entry_event(&self, event: &InboundEvent) -> bool {
        self.spec.entry.iter().any(|arm| arm.matches.matches(event))
    }

    /// Places a user directly into a state without running a handler.
    /// Used by the recovery router to seat a user in the interrupted-
    /// decision state it just rendered.
    pub fn resume_at(&self, user_id: i64, state: FlowState) {
        self.instances.insert(
            user_id,
            FlowInstance {
                state,
                entered_at: Utc::now(),
            },
        );
    }

    /// Drops a user's instance (profile erase). The bucket is the
    /// caller's to clear.
    pub fn remove_user(&self, user_id: i64) {
        self.instances.remove(&user_id);
    }

    /// Routes one event through the flow's transition table.
    ///
    /// Matching order for an active instance: current state's arms, then
    /// fallback arms, then entry arms (re-entry resumes — the entry
    /// handler inspects persisted progress and lands the existing
    /// instance, never a duplicate). With no instance, only entry arms
    /// match.
    pub fn dispatch(&self, ctx: &mut FlowCtx<'_>) -> Outcome {
        let user_id = ctx.event.user_id;
        let current = self.active_state(user_id);

        let handler = match current {
            Some(state) => self
                .spec
                .state_arms(state)
                .and_then(|arms| find_arm(arms, ctx.event))
                .or_else(|| find_arm(&self.spec.fallback, ctx.event))
                .or_else(|| find_arm(&self.spec.entry, ctx.event)),
            None => find_arm(&self.spec.entry, ctx.event),
        };

        let Some(handler) = handler else {
            return Outcome::NotClaimed;
        };

        // Claim before running the handler so that a handler which errors
        // mid-processing still recorded intent and the recovery router
        // stays silent.
        ctx.claim.mark_handled();

        match handler(ctx) {
            Ok(Step::Stay) => match current {
                Some(state) => Outcome::Advanced(state),
                // Entry handlers have nothing to stay in.
                None => Outcome::Ended,
            },
            Ok(Step::Goto(next)) => {
                self.instances
                    .entry(user_id)
                    .and_modify(|instance| instance.state = next)
                    .or_insert(FlowInstance {
                        state: next,
                        entered_at: ctx.event.timestamp,
                    });
                Outcome::Advanced(next)
            }
            Ok(Step::End) => {
                self.instances.remove(&user_id);
                ctx.sessions.clear(user_id, self.spec.name);
                Outcome::Ended
            }
            Err(err) => {
                log::error!("flow {} handler failed for user {}: {}", self.spec.name, user_id, err);
                // Storage failures get a deliberately generic notice; the
                // state is left where it was so the user can retry.
                ctx.reply(texts::generic_error());
                match current {
                    Some(state) => Outcome::Advanced(state),
                    None => Outcome::Ended,
                }
            }
        }
    }

    /// Copies active instances out for snapshotting.
    pub fn export(&self) -> Vec<InstanceSnapshot> {
        self.instances
            .iter()
            .map(|entry| InstanceSnapshot {
                user_id: *entry.key(),
                flow: self.spec.name,
                state: entry.value().state.to_string(),
                entered_at: entry.value().entered_at,
            })
            .collect()
    }

    /// Restores instances belonging to this flow. Records whose state no
    /// longer parses are dropped — a reconstructed instance with an
    /// unknown state is treated as absent.
    pub fn import(&self, snapshots: &[InstanceSnapshot]) {
        for snap in snapshots.iter().filter(|s| s.flow == self.spec.name) {
            match FlowState::from_str(&snap.state) {
                Ok(state) => {
                    self.instances.insert(
                        snap.user_id,
                        FlowInstance {
                            state,
                            entered_at: snap.entered_at,
                        },
                    );
                }
                Err(_) => {
                    log::warn!(
                        "dropping snapshot instance for user {} with unknown state '{}'",
                        snap.user_id,
                        snap.state
                    );
                }
            }
        }
    }
}

fn find_arm<'s>(arms: &'s [Arm], event: &InboundEvent) -> Option<&'s Handler> {
    arms.iter().find(|arm| arm.matches.matches(event)).map(|arm| &arm.handler)
}
