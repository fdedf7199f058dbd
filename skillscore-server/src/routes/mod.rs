use axum::{Router, routing::get};

use crate::{
    AppState,
    handlers::skills::{
        get_skill_score_handler, ingest_skills_handler, skills_head_handler,
    },
};

pub const PING: &str = "/ping";
pub const HEALTH: &str = "/health";
pub const SKILLS: &str = "/api/skills";

/// Create the API router. Methods other than GET and POST on
/// [`SKILLS`] answer `405`, HEAD included.
pub fn create_api_router() -> Router<AppState> {
    Router::new().route(
        SKILLS,
        get(get_skill_score_handler)
            .head(skills_head_handler)
            .post(ingest_skills_handler),
    )
}
