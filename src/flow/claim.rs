//! Message claim tag
//!
//! A one-shot marker scoped to a single event's processing context. The
//! first handler that decides to respond marks the event *before* sending
//! anything, so even a handler that errors mid-way still records intent.
//! The recovery router checks-and-clears exactly once at the start of its
//! inspection; a set tag means "someone already answered, stay silent".
//!
//! The tag lives on the per-event context, never in a long-lived shared
//! map, so it cannot leak across events.

/// Claim state for one inbound event.
#[derive(Debug, Default)]
pub struct ClaimTag {
    claimed: bool,
}

impl ClaimTag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the event as claimed. Called by the engine on behalf of every
    /// handler it runs, before the handler executes.
    pub fn mark_handled(&mut self) {
        if !self.claimed {
            log::debug!("event claimed");
        }
        self.claimed = true;
    }

    /// True if some handler claimed the event. Read-only peek.
    pub fn is_handled(&self) -> bool {
        self.claimed
    }

    /// Returns the claim state and resets it, so the next event starts
    /// unmarked. Called exactly once, by the recovery router.
    pub fn check_and_clear(&mut self) -> bool {
        std::mem::take(&mut self.claimed)
    }
}
