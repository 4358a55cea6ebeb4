use std::sync::Arc;
use std::time::Instant;

use pb_domain::config::Config;
use pb_sessions::{LifecycleController, SessionRegistry};

/// Shared application state passed to all API handlers.
///
/// Owns the session registry for the lifetime of the process; it is built
/// once in [`bootstrap`](crate::bootstrap) and torn down on shutdown.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionRegistry>,
    pub lifecycle: Arc<LifecycleController>,
    pub started_at: Instant,
}
