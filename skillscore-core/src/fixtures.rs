use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::{
    domain::{MAX_SCORE, SkillScore},
    store::ScoreStore,
};

/// User that owns the demo records.
pub const DEMO_USER: &str = "user1";

/// Skills seeded for [`DEMO_USER`].
pub const DEMO_SKILLS: [&str; 2] = ["Golang", "Kafka"];

/// Seed the demo user with full marks scored a day before `now`.
///
/// Returns the number of records written.
pub fn seed_demo_scores(store: &ScoreStore, now: DateTime<Utc>) -> usize {
    let scored_at = now - Duration::hours(24);
    for skill in DEMO_SKILLS {
        store.write(DEMO_USER, SkillScore::new(skill, MAX_SCORE, scored_at));
    }
    info!(user_id = DEMO_USER, count = DEMO_SKILLS.len(), "seeded demo scores");
    DEMO_SKILLS.len()
}
