use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::trace;

use crate::domain::SkillScore;

type SkillMap = HashMap<String, SkillScore>;

/// In-memory `(user, skill) -> SkillScore` table.
///
/// Locking is per user. The user index is a sharded map whose shard lock is
/// held only long enough to find or create a user's slot; each slot is its own
/// reader-writer lock around that user's skill map. Writers for one user
/// serialize, writers for different users never wait on each other's critical
/// section, and a record is always replaced whole under the slot's write lock.
#[derive(Debug, Default)]
pub struct ScoreStore {
    users: DashMap<String, Arc<RwLock<SkillMap>>>,
    reads: AtomicU64,
    writes: AtomicU64,
}

/// Point-in-time counters for a [`ScoreStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub users: usize,
    pub reads: u64,
    pub writes: u64,
}

impl ScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record for `(user_id, skill_name)`, or `None` when either
    /// the user or the skill is unknown.
    pub fn read(&self, user_id: &str, skill_name: &str) -> Option<SkillScore> {
        self.reads.fetch_add(1, Ordering::Relaxed);

        let slot = self.existing_slot(user_id)?;
        let skills = slot.read();
        skills.get(skill_name).cloned()
    }

    /// Inserts or replaces the record for `score.skill_name` under `user_id`.
    pub fn write(&self, user_id: &str, score: SkillScore) {
        let slot = self.slot(user_id);
        {
            let mut skills = slot.write();
            trace!(user_id, skill = %score.skill_name, score = score.score, "storing score");
            skills.insert(score.skill_name.clone(), score);
        }
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    /// All records currently held for `user_id`, ordered by skill name.
    pub fn skills_for(&self, user_id: &str) -> Vec<SkillScore> {
        let Some(slot) = self.existing_slot(user_id) else {
            return Vec::new();
        };
        let mut skills: Vec<SkillScore> = slot.read().values().cloned().collect();
        skills.sort_by(|a, b| a.skill_name.cmp(&b.skill_name));
        skills
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            users: self.users.len(),
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
        }
    }

    // The shard guard is dropped before the caller touches the slot lock.
    fn existing_slot(&self, user_id: &str) -> Option<Arc<RwLock<SkillMap>>> {
        self.users.get(user_id).map(|entry| Arc::clone(entry.value()))
    }

    fn slot(&self, user_id: &str) -> Arc<RwLock<SkillMap>> {
        if let Some(slot) = self.existing_slot(user_id) {
            return slot;
        }
        Arc::clone(self.users.entry(user_id.to_owned()).or_default().value())
    }
}
