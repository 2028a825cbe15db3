//! Session buckets: isolated per-(user, flow) scratch space
//!
//! Each flow keeps its mid-transaction fields in its own bucket. Clearing
//! one bucket never touches another flow's data for the same user, which
//! is what lets a cancelled sale leave a half-done registration intact.
//! A bucket's presence is advisory memory only — recovery reconciles it
//! against the persisted user row, which wins on conflict.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::flow::FlowName;

/// String key/value scratch fields for one flow of one user.
pub type Bucket = HashMap<String, String>;

#[derive(Default)]
pub struct SessionStore {
    buckets: DashMap<(i64, FlowName), Bucket>,
}

/// Serializable form of the whole store, for the durable snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketSnapshot {
    pub user_id: i64,
    pub flow: FlowName,
    pub data: Bucket,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads one field. Missing buckets are not an error — they simply
    /// have no fields yet.
    pub fn get(&self, user_id: i64, flow: FlowName, key: &str) -> Option<String> {
        self.buckets
            .get(&(user_id, flow))
            .and_then(|b| b.get(key).cloned())
    }

    /// Writes one field, creating the bucket lazily on first write.
    pub fn set(&self, user_id: i64, flow: FlowName, key: &str, value: impl Into<String>) {
        self.buckets
            .entry((user_id, flow))
            .or_default()
            .insert(key.to_string(), value.into());
    }

    /// Drops one flow's bucket. Idempotent; other flows' buckets for the
    /// same user are untouched.
    pub fn clear(&self, user_id: i64, flow: FlowName) {
        if self.buckets.remove(&(user_id, flow)).is_some() {
            log::debug!("cleared bucket {:?} for user {}", flow, user_id);
        }
    }

    /// True if the flow has a non-empty bucket for this user.
    pub fn has(&self, user_id: i64, flow: FlowName) -> bool {
        self.buckets
            .get(&(user_id, flow))
            .map(|b| !b.is_empty())
            .unwrap_or(false)
    }

    /// True if *any* flow has a non-empty bucket for this user. The
    /// recovery router uses this to stay out of active conversations.
    pub fn any_active(&self, user_id: i64) -> bool {
        self.buckets
            .iter()
            .any(|entry| entry.key().0 == user_id && !entry.value().is_empty())
    }

    /// Removes every bucket the user owns (profile erase).
    pub fn clear_user(&self, user_id: i64) {
        self.buckets.retain(|key, _| key.0 != user_id);
    }

    /// Copies all non-empty buckets out for snapshotting.
    pub fn export(&self) -> Vec<BucketSnapshot> {
        self.buckets
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| BucketSnapshot {
                user_id: entry.key().0,
                flow: entry.key().1,
                data: entry.value().clone(),
            })
            .collect()
    }

    /// Restores buckets from a snapshot, replacing any current content.
    pub fn import(&self, snapshots: Vec<BucketSnapshot>) {
        for snap in snapshots {
            self.buckets.insert((snap.user_id, snap.flow), snap.data);
        }
    }
}
