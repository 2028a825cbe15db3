//! Conversation orchestration
//!
//! The runtime routes each inbound event to exactly one of the competing
//! flows (registration, sale, admin — in that priority order), guards the
//! entry points with the rate limiter and the one-flow-per-user policy,
//! falls back to the recovery router for unclaimed events, and writes the
//! durable snapshot once per completed event.

pub mod admin;
pub mod claim;
pub mod engine;
pub mod event;
pub mod keyboards;
pub mod profile;
pub mod recovery;
pub mod registration;
pub mod sale;
pub mod session;

pub use engine::{FlowEngine, FlowName, FlowState, Outcome};
pub use event::{InboundEvent, Reply, Trigger};
pub use session::SessionStore;

use std::sync::Arc;

use crate::core::error::AppResult;
use crate::core::rate_limiter::RateLimiter;
use crate::flow::claim::ClaimTag;
use crate::flow::engine::FlowCtx;
use crate::pricing::PriceLedger;
use crate::storage::db::DbPool;
use crate::storage::snapshot::{self, FlowSnapshot};
use crate::texts;

/// Shared collaborators handlers reach through the context.
pub struct Services {
    pub db: DbPool,
    pub ledger: PriceLedger,
}

pub struct FlowRuntime {
    services: Arc<Services>,
    sessions: SessionStore,
    registration: FlowEngine,
    sale: FlowEngine,
    admin: FlowEngine,
    limiter: RateLimiter,
    /// Where to persist the per-event snapshot; `None` disables
    /// persistence (tests).
    snapshot_path: Option<String>,
}

impl FlowRuntime {
    pub fn new(services: Arc<Services>, limiter: RateLimiter, snapshot_path: Option<String>) -> AppResult<Self> {
        Ok(Self {
            services,
            sessions: SessionStore::new(),
            registration: FlowEngine::new(registration::spec())?,
            sale: FlowEngine::new(sale::spec())?,
            admin: FlowEngine::new(admin::spec())?,
            limiter,
            snapshot_path,
        })
    }

    /// Priority order: the first engine to claim an event wins.
    fn engines(&self) -> [&FlowEngine; 3] {
        [&self.registration, &self.sale, &self.admin]
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn active_state(&self, user_id: i64, flow: FlowName) -> Option<FlowState> {
        self.engines()
            .into_iter()
            .find(|e| e.name() == flow)
            .and_then(|e| e.active_state(user_id))
    }

    /// Restores instances and buckets from a startup snapshot.
    pub fn restore(&self, snap: FlowSnapshot) {
        for engine in self.engines() {
            engine.import(&snap.instances);
        }
        self.sessions.import(snap.buckets);
    }

    /// Current in-memory state, for snapshotting.
    pub fn snapshot(&self) -> FlowSnapshot {
        let mut instances = Vec::new();
        for engine in self.engines() {
            instances.extend(engine.export());
        }
        FlowSnapshot {
            instances,
            buckets: self.sessions.export(),
        }
    }

    /// Processes one inbound event to completion and returns the reply
    /// instructions to send. Exactly one flow may claim the event; the
    /// recovery router answers only when none did and the user has no
    /// active conversation.
    pub fn handle_event(&self, event: InboundEvent) -> Vec<Reply> {
        let user_id = event.user_id;
        let mut replies = Vec::new();
        let mut claim = ClaimTag::new();

        // Throttle gate: only consulted where a flow would be *entered* —
        // mid-flow inputs and resumes pass freely.
        let would_enter = self
            .engines()
            .into_iter()
            .any(|e| e.is_entry_event(&event) && !e.has_active(user_id));
        if would_enter {
            if self.limiter.is_limited(user_id) {
                replies.push(Reply::text(user_id, texts::throttled()));
                return replies;
            }
            self.limiter.record(user_id);
        }

        // One flow family per user: entering a second family while another
        // owns the user is answered with a notice, not a fork. Re-entering
        // the active family resumes and is allowed through.
        if would_enter {
            let target = self
                .engines()
                .into_iter()
                .find(|e| e.is_entry_event(&event) && !e.has_active(user_id));
            if let Some(target) = target {
                let blocked = self
                    .engines()
                    .into_iter()
                    .any(|other| other.name() != target.name() && other.has_active(user_id));
                if blocked {
                    claim.mark_handled();
                    replies.push(Reply::text(user_id, texts::busy_with_other_flow()));
                    self.persist();
                    return replies;
                }
            }
        }

        let mut outcome = Outcome::NotClaimed;
        for flow_engine in self.engines() {
            let mut ctx = FlowCtx {
                event: &event,
                services: &self.services,
                sessions: &self.sessions,
                claim: &mut claim,
                flow: flow_engine.name(),
                replies: &mut replies,
            };
            outcome = flow_engine.dispatch(&mut ctx);
            if outcome != Outcome::NotClaimed {
                break;
            }
        }

        if outcome == Outcome::NotClaimed {
            self.handle_unclaimed(&event, &mut claim, &mut replies);
        }

        self.persist();
        replies
    }

    fn handle_unclaimed(&self, event: &InboundEvent, claim: &mut ClaimTag, replies: &mut Vec<Reply>) {
        let user_id = event.user_id;

        match profile::handle(
            event,
            &self.services,
            &self.sessions,
            &self.engines(),
            &self.limiter,
            claim,
            replies,
        ) {
            Ok(true) => {}
            Ok(false) => match event.trigger {
                Some(Trigger::Help) => {
                    claim.mark_handled();
                    replies.push(Reply::text(user_id, texts::help()));
                }
                Some(Trigger::Cancel) => {
                    // No flow picked it up, so there is nothing to cancel;
                    // confirming is friendlier than silence.
                    claim.mark_handled();
                    replies.push(Reply::text(user_id, texts::cancelled()));
                }
                _ => {}
            },
            Err(err) => {
                log::error!("profile handler failed for user {}: {}", user_id, err);
                replies.push(Reply::text(user_id, texts::generic_error()));
            }
        }

        if let Err(err) = recovery::handle(
            event,
            &self.services,
            &self.sessions,
            claim,
            &self.registration,
            replies,
        ) {
            log::error!("recovery router failed for user {}: {}", user_id, err);
            replies.push(Reply::text(user_id, texts::generic_error()));
        }
    }

    /// Writes the durable snapshot. Runs after every event; failures are
    /// logged, never surfaced — losing one snapshot generation costs at
    /// most one event of resumability.
    fn persist(&self) {
        let Some(ref path) = self.snapshot_path else {
            return;
        };
        if let Err(err) = snapshot::save(path, &self.snapshot()) {
            log::error!("failed to write flow snapshot to {}: {}", path, err);
        }
    }
}
