//! crates/attendance_core/src/broadcaster.rs
//!
//! The lecturer-side session broadcaster: owns one lecture session's active
//! window and its rotating verification token.
//!
//! Lifecycle is `Idle -> Active` (on start, which requires a captured device
//! position) `-> Idle` (on end). While active, the hosting task calls
//! [`SessionBroadcaster::rotate_once`] on a fixed cadence; each call resolves
//! the persistence write before the next tick is scheduled, so the in-memory
//! and persisted tokens never silently diverge for more than one interval.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{Position, Session};
use crate::ports::{AttendanceStore, NewSession, PortError, PortResult};
use crate::token::TokenGenerator;

/// How often the verification token is regenerated while a session is
/// active. The interval restarts from the last tick; there is no wall-clock
/// alignment.
pub const ROTATION_INTERVAL: Duration = Duration::from_secs(10);

/// Acceptance radius used when the lecturer does not pick one, in meters.
pub const DEFAULT_RADIUS_M: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BroadcasterState {
    Idle,
    Active { session_id: Uuid },
}

/// The result of one rotation tick. Rotation is a recurring side effect,
/// not a value-returning operation; a failed write is reported and then
/// superseded by the next tick.
#[derive(Debug)]
pub enum RotationOutcome {
    /// The new token was persisted.
    Rotated { token: String },
    /// The token was regenerated but the persistence write failed; the next
    /// tick will generate and write a fresh one.
    WriteFailed { token: String, error: PortError },
    /// No session is active; the hosting task should stop.
    NotActive,
}

pub struct SessionBroadcaster {
    store: Arc<dyn AttendanceStore>,
    tokens: Arc<dyn TokenGenerator>,
    state: BroadcasterState,
}

impl SessionBroadcaster {
    pub fn new(store: Arc<dyn AttendanceStore>, tokens: Arc<dyn TokenGenerator>) -> Self {
        Self {
            store,
            tokens,
            state: BroadcasterState::Idle,
        }
    }

    /// The persisted id of the active session, if any.
    pub fn session_id(&self) -> Option<Uuid> {
        match self.state {
            BroadcasterState::Idle => None,
            BroadcasterState::Active { session_id } => Some(session_id),
        }
    }

    /// Opens a session anchored at `captured`, the position read from the
    /// lecturer's device. Callers that could not obtain a position have
    /// nothing to pass here and must surface that failure themselves; no
    /// retry is attempted.
    pub async fn start(
        &mut self,
        course_id: &str,
        lecturer_id: Uuid,
        captured: Position,
        radius_m: Option<f64>,
    ) -> PortResult<Session> {
        if let BroadcasterState::Active { session_id } = self.state {
            return Err(PortError::Unexpected(format!(
                "session {session_id} is already active"
            )));
        }

        let radius_m = radius_m.unwrap_or(DEFAULT_RADIUS_M);
        if !(radius_m > 0.0) {
            return Err(PortError::Unexpected(format!(
                "acceptance radius must be positive, got {radius_m}"
            )));
        }

        let session = self
            .store
            .create_session(NewSession {
                course_id: course_id.to_string(),
                lecturer_id,
                anchor: captured.point,
                radius_m,
                initial_token: self.tokens.generate(),
            })
            .await?;

        info!(session_id = %session.id, course_id, "lecture session started");
        self.state = BroadcasterState::Active {
            session_id: session.id,
        };
        Ok(session)
    }

    /// Regenerates the token and overwrites it on the persisted record.
    /// Resolves the write (success or give-up) before returning, so the
    /// caller only schedules the next rotation afterwards.
    pub async fn rotate_once(&mut self) -> RotationOutcome {
        let BroadcasterState::Active { session_id } = self.state else {
            return RotationOutcome::NotActive;
        };

        let token = self.tokens.generate();
        match self.store.update_session_token(session_id, &token).await {
            Ok(()) => RotationOutcome::Rotated { token },
            Err(error) => {
                warn!(%session_id, %error, "token rotation write failed; giving up until next tick");
                RotationOutcome::WriteFailed { token, error }
            }
        }
    }

    /// Flips the persisted session's active flag and returns to `Idle`.
    /// The record itself is kept as closed history. Ending while idle is a
    /// no-op.
    pub async fn end(&mut self) -> PortResult<()> {
        let BroadcasterState::Active { session_id } = self.state else {
            return Ok(());
        };

        self.store.end_session(session_id).await?;
        info!(%session_id, "lecture session ended");
        self.state = BroadcasterState::Idle;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryStore, SequenceTokenGenerator};

    fn lecturer() -> Uuid {
        Uuid::new_v4()
    }

    fn anchor() -> Position {
        Position::new(30.0000, 32.0000)
    }

    #[tokio::test]
    async fn start_captures_anchor_radius_and_initial_token() {
        let store = Arc::new(InMemoryStore::new());
        let tokens = Arc::new(SequenceTokenGenerator::new(&["4821", "7302"]));
        let mut broadcaster = SessionBroadcaster::new(store.clone(), tokens);

        let session = broadcaster
            .start("CS101", lecturer(), anchor(), None)
            .await
            .unwrap();

        assert!(session.is_active);
        assert_eq!(session.anchor.lat, 30.0000);
        assert_eq!(session.radius_m, DEFAULT_RADIUS_M);
        assert_eq!(session.current_token, "4821");
        assert_eq!(broadcaster.session_id(), Some(session.id));
    }

    #[tokio::test]
    async fn start_rejects_a_second_concurrent_session() {
        let store = Arc::new(InMemoryStore::new());
        let tokens = Arc::new(SequenceTokenGenerator::new(&["1111"]));
        let mut broadcaster = SessionBroadcaster::new(store, tokens);

        broadcaster
            .start("CS101", lecturer(), anchor(), Some(25.0))
            .await
            .unwrap();
        let second = broadcaster.start("CS102", lecturer(), anchor(), None).await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn start_rejects_a_non_positive_radius() {
        let store = Arc::new(InMemoryStore::new());
        let tokens = Arc::new(SequenceTokenGenerator::new(&["1111"]));
        let mut broadcaster = SessionBroadcaster::new(store, tokens);

        assert!(broadcaster
            .start("CS101", lecturer(), anchor(), Some(0.0))
            .await
            .is_err());
        assert!(broadcaster
            .start("CS101", lecturer(), anchor(), Some(-10.0))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn rotate_once_overwrites_the_persisted_token() {
        let store = Arc::new(InMemoryStore::new());
        let tokens = Arc::new(SequenceTokenGenerator::new(&["1000", "2000", "3000"]));
        let mut broadcaster = SessionBroadcaster::new(store.clone(), tokens);

        let session = broadcaster
            .start("CS101", lecturer(), anchor(), None)
            .await
            .unwrap();

        match broadcaster.rotate_once().await {
            RotationOutcome::Rotated { token } => assert_eq!(token, "2000"),
            other => panic!("expected Rotated, got {other:?}"),
        }
        let stored = store.get_session(session.id).await.unwrap();
        assert_eq!(stored.current_token, "2000");
    }

    #[tokio::test]
    async fn a_failed_rotation_write_is_reported_and_superseded() {
        let store = Arc::new(InMemoryStore::new());
        let tokens = Arc::new(SequenceTokenGenerator::new(&["1000", "2000", "3000"]));
        let mut broadcaster = SessionBroadcaster::new(store.clone(), tokens);

        let session = broadcaster
            .start("CS101", lecturer(), anchor(), None)
            .await
            .unwrap();

        store.fail_next_token_write();
        assert!(matches!(
            broadcaster.rotate_once().await,
            RotationOutcome::WriteFailed { .. }
        ));
        // The store still holds the initial token.
        assert_eq!(
            store.get_session(session.id).await.unwrap().current_token,
            "1000"
        );

        // The next tick writes a fresh token.
        assert!(matches!(
            broadcaster.rotate_once().await,
            RotationOutcome::Rotated { .. }
        ));
        assert_eq!(
            store.get_session(session.id).await.unwrap().current_token,
            "3000"
        );
    }

    #[tokio::test]
    async fn end_preserves_the_record_and_stops_rotation() {
        let store = Arc::new(InMemoryStore::new());
        let tokens = Arc::new(SequenceTokenGenerator::new(&["1000", "2000"]));
        let mut broadcaster = SessionBroadcaster::new(store.clone(), tokens);

        let session = broadcaster
            .start("CS101", lecturer(), anchor(), Some(75.0))
            .await
            .unwrap();
        broadcaster.end().await.unwrap();

        let stored = store.get_session(session.id).await.unwrap();
        assert!(!stored.is_active);
        assert_eq!(stored.anchor, session.anchor);
        assert_eq!(stored.radius_m, 75.0);
        assert_eq!(stored.current_token, "1000");

        assert!(store.active_sessions().await.unwrap().is_empty());
        assert!(matches!(
            broadcaster.rotate_once().await,
            RotationOutcome::NotActive
        ));
        assert_eq!(broadcaster.session_id(), None);
    }
}
