//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the registry of live
//! broadcasts.

use crate::config::Config;
use attendance_core::broadcaster::SessionBroadcaster;
use attendance_core::ports::{AttendanceStore, IdentityProvider};
use attendance_core::token::TokenGenerator;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub store: Arc<dyn AttendanceStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub tokens: Arc<dyn TokenGenerator>,
    pub config: Arc<Config>,
    /// One entry per session this process is actively broadcasting, keyed by
    /// session id. Removed when the session ends.
    pub live_broadcasts: Mutex<HashMap<Uuid, LiveBroadcast>>,
}

//=========================================================================================
// LiveBroadcast (One Actively Rotating Session)
//=========================================================================================

/// A session whose token this process is rotating. The broadcaster is shared
/// with the rotation task; the token cancels that task when the session
/// ends or the process shuts the broadcast down.
pub struct LiveBroadcast {
    pub broadcaster: Arc<Mutex<SessionBroadcaster>>,
    pub cancellation_token: CancellationToken,
    pub lecturer_id: Uuid,
}
