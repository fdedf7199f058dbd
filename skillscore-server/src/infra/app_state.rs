use std::{fmt, sync::Arc};

use skillscore_core::{BatchPolicy, ScoreDispatcher, ScoreStore};

/// Shared handles for every request.
///
/// Handlers only see the dispatcher through its trait; which strategy backs
/// it is decided once at startup.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ScoreStore>,
    pub dispatcher: Arc<dyn ScoreDispatcher>,
    pub batch_policy: BatchPolicy,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("strategy", &self.dispatcher.strategy())
            .field("batch_policy", &self.batch_policy)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(
        store: Arc<ScoreStore>,
        dispatcher: Arc<dyn ScoreDispatcher>,
        batch_policy: BatchPolicy,
    ) -> Self {
        Self {
            store,
            dispatcher,
            batch_policy,
        }
    }
}
