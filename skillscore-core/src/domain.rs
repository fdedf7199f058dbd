use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound for a score. Freshly computed scores fall in `0..MAX_SCORE`.
pub const MAX_SCORE: u8 = 100;

/// One user's measured proficiency in one named skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillScore {
    pub skill_name: String,
    pub score: u8,
    pub last_scored: DateTime<Utc>,
}

impl SkillScore {
    pub fn new(
        skill_name: impl Into<String>,
        score: u8,
        last_scored: DateTime<Utc>,
    ) -> Self {
        Self {
            skill_name: skill_name.into(),
            score: score.min(MAX_SCORE),
            last_scored,
        }
    }
}

/// A unit of work: compute a new score for this user's named skill.
///
/// Consumed exactly once by a dispatch strategy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScoreRequest {
    pub user_id: String,
    pub skill_name: String,
}

impl ScoreRequest {
    pub fn new(
        user_id: impl Into<String>,
        skill_name: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            skill_name: skill_name.into(),
        }
    }
}

/// Broker payload for a [`ScoreRequest`].
///
/// Field names are part of the wire contract with out-of-process scorers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreMessage {
    #[serde(rename = "skillName")]
    pub skill_name: String,
    #[serde(rename = "profileID")]
    pub profile_id: String,
}

impl From<&ScoreRequest> for ScoreMessage {
    fn from(request: &ScoreRequest) -> Self {
        Self {
            skill_name: request.skill_name.clone(),
            profile_id: request.user_id.clone(),
        }
    }
}
