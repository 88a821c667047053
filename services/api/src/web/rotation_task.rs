//! services/api/src/web/rotation_task.rs
//!
//! This module contains the asynchronous "worker" function responsible for
//! rotating a live session's verification token.

use attendance_core::broadcaster::{RotationOutcome, SessionBroadcaster};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// The recurring token-rotation task for one live session.
///
/// Sleeps for one interval, then rotates; the next interval is only
/// scheduled once the rotation's persistence write has resolved, so a slow
/// or failing store never stacks up unconfirmed writes. The interval
/// restarts from the last tick rather than aligning to the wall clock.
/// It is designed to be gracefully cancelled via a `CancellationToken`.
pub async fn rotation_process(
    broadcaster: Arc<Mutex<SessionBroadcaster>>,
    interval: Duration,
    cancellation_token: CancellationToken,
) {
    info!("Token rotation task started.");

    loop {
        tokio::select! {
            _ = cancellation_token.cancelled() => {
                info!("Token rotation task cancelled.");
                return;
            }
            _ = tokio::time::sleep(interval) => {}
        }

        // The session may have been ended while we slept; never apply a
        // rotation after cancellation.
        if cancellation_token.is_cancelled() {
            info!("Token rotation task cancelled.");
            return;
        }

        match broadcaster.lock().await.rotate_once().await {
            RotationOutcome::Rotated { .. } => {}
            // Already logged by the broadcaster; the next tick supersedes it.
            RotationOutcome::WriteFailed { .. } => {}
            RotationOutcome::NotActive => {
                info!("Session no longer active. Token rotation task finished.");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attendance_core::domain::Position;
    use attendance_core::testing::{InMemoryStore, SequenceTokenGenerator};
    use attendance_core::AttendanceStore;
    use uuid::Uuid;

    async fn live_broadcaster(
        store: Arc<InMemoryStore>,
        tokens: &[&str],
    ) -> (Arc<Mutex<SessionBroadcaster>>, Uuid) {
        let generator = Arc::new(SequenceTokenGenerator::new(tokens));
        let mut broadcaster = SessionBroadcaster::new(store, generator);
        let session = broadcaster
            .start("CS101", Uuid::new_v4(), Position::new(30.0, 32.0), None)
            .await
            .unwrap();
        (Arc::new(Mutex::new(broadcaster)), session.id)
    }

    #[tokio::test(start_paused = true)]
    async fn rotates_on_the_configured_interval() {
        let store = Arc::new(InMemoryStore::new());
        let (broadcaster, session_id) =
            live_broadcaster(store.clone(), &["1000", "2000", "3000", "4000"]).await;

        let cancellation_token = CancellationToken::new();
        let task = tokio::spawn(rotation_process(
            broadcaster,
            Duration::from_secs(10),
            cancellation_token.clone(),
        ));

        // Two full intervals elapse: two rotations.
        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(
            store.get_session(session_id).await.unwrap().current_token,
            "3000"
        );

        cancellation_token.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_rotation_immediately() {
        let store = Arc::new(InMemoryStore::new());
        let (broadcaster, session_id) =
            live_broadcaster(store.clone(), &["1000", "2000", "3000"]).await;

        let cancellation_token = CancellationToken::new();
        let task = tokio::spawn(rotation_process(
            broadcaster,
            Duration::from_secs(10),
            cancellation_token.clone(),
        ));

        tokio::time::sleep(Duration::from_secs(15)).await;
        let token_at_cancel = store.get_session(session_id).await.unwrap().current_token;
        cancellation_token.cancel();
        task.await.unwrap();

        // No further ticks are applied after cancellation.
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(
            store.get_session(session_id).await.unwrap().current_token,
            token_at_cancel
        );
    }

    #[tokio::test(start_paused = true)]
    async fn a_failed_write_does_not_stop_the_loop() {
        let store = Arc::new(InMemoryStore::new());
        let (broadcaster, session_id) =
            live_broadcaster(store.clone(), &["1000", "2000", "3000"]).await;

        store.fail_next_token_write();
        let cancellation_token = CancellationToken::new();
        let task = tokio::spawn(rotation_process(
            broadcaster,
            Duration::from_secs(10),
            cancellation_token.clone(),
        ));

        // First tick fails its write; the second succeeds with a fresh token.
        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(
            store.get_session(session_id).await.unwrap().current_token,
            "3000"
        );

        cancellation_token.cancel();
        task.await.unwrap();
    }
}
