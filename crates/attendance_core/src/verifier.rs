//! crates/attendance_core/src/verifier.rs
//!
//! The student-side attendance verifier: decides whether a submitted token
//! is acceptable against the selected session, with live distance from the
//! session anchor as a gating precondition.

use std::sync::Arc;

use tracing::error;
use uuid::Uuid;

use crate::domain::{AttendanceLog, Position, Session, UserProfile};
use crate::geo;
use crate::ports::{AttendanceStore, NewAttendanceLog, PortError, PortResult};

/// Reported GPS accuracy above this is flagged as low-confidence. The
/// warning is advisory; it never blocks a submission on its own.
pub const LOW_ACCURACY_THRESHOLD_M: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationConfidence {
    Good,
    /// The device's confidence circle is wider than the threshold; advise
    /// the student to move somewhere with open sky.
    Low,
}

pub fn location_confidence(position: &Position) -> LocationConfidence {
    match position.accuracy_m {
        Some(accuracy) if accuracy > LOW_ACCURACY_THRESHOLD_M => LocationConfidence::Low,
        _ => LocationConfidence::Good,
    }
}

/// Every way one check-in attempt can be refused. Each variant carries its
/// own user-facing message; all of them leave the attempt retryable.
#[derive(Debug, thiserror::Error)]
pub enum CheckInError {
    #[error("no active lecture is available right now")]
    NoActiveSession,

    #[error("enable location services (GPS) to continue")]
    LocationUnavailable,

    #[error(
        "you are {distance_m:.0} m from the lecture hall; the allowed radius is {radius_m:.0} m"
    )]
    OutOfRange { distance_m: f64, radius_m: f64 },

    #[error("the verification token is invalid or expired")]
    TokenMismatch,

    #[error("check-in could not be recorded; the session may have ended")]
    Submission(#[source] PortError),
}

pub struct AttendanceVerifier {
    store: Arc<dyn AttendanceStore>,
}

impl AttendanceVerifier {
    pub fn new(store: Arc<dyn AttendanceStore>) -> Self {
        Self { store }
    }

    /// Selects the session a student checks into.
    ///
    /// Active sessions are filtered to the student's enrolled courses when
    /// the enrolled list is non-empty; among the remainder the most recently
    /// started session wins. Deterministic regardless of store ordering.
    pub async fn find_active_session(
        &self,
        profile: &UserProfile,
    ) -> PortResult<Option<Session>> {
        let mut sessions = self.store.active_sessions().await?;
        if !profile.courses.is_empty() {
            sessions.retain(|s| profile.courses.iter().any(|c| c == &s.course_id));
        }
        Ok(sessions.into_iter().max_by_key(|s| s.started_at))
    }

    /// Great-circle distance from the student to the session anchor, in
    /// meters. Recomputed on every call.
    pub fn distance_to(&self, position: &Position, session: &Session) -> f64 {
        geo::distance_m(position.point, session.anchor)
    }

    /// The client-side submit-button guard. A usability check only:
    /// [`AttendanceVerifier::submit`] re-verifies everything regardless.
    pub fn within_radius(&self, position: &Position, session: &Session) -> bool {
        self.distance_to(position, session) <= session.radius_m
    }

    /// One check-in attempt. Gated by two independent checks, in order:
    ///
    /// 1. distance from the anchor must be within the session radius;
    /// 2. the submitted token must exactly equal the currently stored one.
    ///
    /// The session record is re-read here so both gates run against fresh
    /// state at submission time. On success, exactly one verified
    /// [`AttendanceLog`] is written with a store-assigned timestamp.
    pub async fn submit(
        &self,
        session_id: Uuid,
        student: &UserProfile,
        position: Option<Position>,
        submitted_token: &str,
    ) -> Result<AttendanceLog, CheckInError> {
        let position = position.ok_or(CheckInError::LocationUnavailable)?;

        let session = match self.store.get_session(session_id).await {
            Ok(session) => session,
            Err(PortError::NotFound(_)) => return Err(CheckInError::NoActiveSession),
            Err(other) => return Err(CheckInError::Submission(other)),
        };
        if !session.is_active {
            return Err(CheckInError::NoActiveSession);
        }

        let distance_m = self.distance_to(&position, &session);
        if distance_m > session.radius_m {
            return Err(CheckInError::OutOfRange {
                distance_m,
                radius_m: session.radius_m,
            });
        }

        if submitted_token != session.current_token {
            return Err(CheckInError::TokenMismatch);
        }

        self.store
            .record_attendance(NewAttendanceLog {
                session_id: session.id,
                student_id: student.uid,
                student_name: student.display_name.clone(),
                location: position.point,
                verified: true,
            })
            .await
            .map_err(|e| {
                error!(%session_id, error = %e, "attendance write failed");
                CheckInError::Submission(e)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use crate::ports::NewSession;
    use crate::testing::InMemoryStore;
    use crate::domain::GeoPoint;

    fn student() -> UserProfile {
        UserProfile {
            uid: Uuid::new_v4(),
            email: "student@campus.edu".to_string(),
            display_name: "Test Student".to_string(),
            role: Role::Student,
            courses: Vec::new(),
        }
    }

    async fn open_session(store: &InMemoryStore, course_id: &str, token: &str) -> Session {
        store
            .create_session(NewSession {
                course_id: course_id.to_string(),
                lecturer_id: Uuid::new_v4(),
                anchor: GeoPoint::new(30.0000, 32.0000),
                radius_m: 50.0,
                initial_token: token.to_string(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn in_range_with_correct_token_writes_a_verified_log() {
        let store = Arc::new(InMemoryStore::new());
        let session = open_session(&store, "CS101", "4821").await;
        let verifier = AttendanceVerifier::new(store.clone());
        let me = student();

        // ~32 m from the anchor, inside the 50 m radius.
        let position = Position::new(30.00029, 32.0000);
        let log = verifier
            .submit(session.id, &me, Some(position), "4821")
            .await
            .unwrap();

        assert!(log.verified);
        assert_eq!(log.student_id, me.uid);
        assert_eq!(log.session_id, session.id);

        let logs = store.attendance_for_session(session.id).await.unwrap();
        assert_eq!(logs.len(), 1);
    }

    #[tokio::test]
    async fn out_of_range_is_rejected_with_distance_and_radius() {
        let store = Arc::new(InMemoryStore::new());
        let session = open_session(&store, "CS101", "4821").await;
        let verifier = AttendanceVerifier::new(store.clone());

        // ~111 m away: correct token, still refused.
        let position = Position::new(30.0010, 32.0000);
        let err = verifier
            .submit(session.id, &student(), Some(position), "4821")
            .await
            .unwrap_err();

        match err {
            CheckInError::OutOfRange {
                distance_m,
                radius_m,
            } => {
                assert!((110.0..113.0).contains(&distance_m), "got {distance_m}");
                assert_eq!(radius_m, 50.0);
            }
            other => panic!("expected OutOfRange, got {other:?}"),
        }
        assert!(store.attendance_for_session(session.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn wrong_token_is_rejected_even_in_range() {
        let store = Arc::new(InMemoryStore::new());
        let session = open_session(&store, "CS101", "4821").await;
        let verifier = AttendanceVerifier::new(store.clone());

        let position = Position::new(30.00029, 32.0000);
        let err = verifier
            .submit(session.id, &student(), Some(position), "0000")
            .await
            .unwrap_err();

        assert!(matches!(err, CheckInError::TokenMismatch));
        assert!(store.attendance_for_session(session.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_location_blocks_the_submission() {
        let store = Arc::new(InMemoryStore::new());
        let session = open_session(&store, "CS101", "4821").await;
        let verifier = AttendanceVerifier::new(store.clone());

        let err = verifier
            .submit(session.id, &student(), None, "4821")
            .await
            .unwrap_err();
        assert!(matches!(err, CheckInError::LocationUnavailable));
    }

    #[tokio::test]
    async fn an_ended_session_no_longer_accepts_check_ins() {
        let store = Arc::new(InMemoryStore::new());
        let session = open_session(&store, "CS101", "4821").await;
        store.end_session(session.id).await.unwrap();
        let verifier = AttendanceVerifier::new(store.clone());

        let position = Position::new(30.00029, 32.0000);
        let err = verifier
            .submit(session.id, &student(), Some(position), "4821")
            .await
            .unwrap_err();
        assert!(matches!(err, CheckInError::NoActiveSession));
    }

    #[tokio::test]
    async fn no_active_session_leaves_nothing_to_select() {
        let store = Arc::new(InMemoryStore::new());
        let verifier = AttendanceVerifier::new(store.clone());
        let selected = verifier.find_active_session(&student()).await.unwrap();
        assert!(selected.is_none());
    }

    #[tokio::test]
    async fn selection_prefers_enrolled_courses_then_most_recent() {
        let store = Arc::new(InMemoryStore::new());
        let _other = open_session(&store, "MATH200", "1111").await;
        let older = open_session(&store, "CS101", "2222").await;
        let newer = open_session(&store, "CS101", "3333").await;
        let verifier = AttendanceVerifier::new(store.clone());

        let mut enrolled = student();
        enrolled.courses = vec!["CS101".to_string()];
        let selected = verifier
            .find_active_session(&enrolled)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(selected.id, newer.id);
        assert_ne!(selected.id, older.id);

        // An empty enrollment list sees every active session.
        let anyone = student();
        assert!(verifier
            .find_active_session(&anyone)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn ended_sessions_are_invisible_to_selection() {
        let store = Arc::new(InMemoryStore::new());
        let session = open_session(&store, "CS101", "1111").await;
        store.end_session(session.id).await.unwrap();
        let verifier = AttendanceVerifier::new(store.clone());

        assert!(verifier
            .find_active_session(&student())
            .await
            .unwrap()
            .is_none());
    }

    #[test]
    fn accuracy_above_threshold_is_low_confidence() {
        let good = Position::with_accuracy(30.0, 32.0, 25.0);
        let poor = Position::with_accuracy(30.0, 32.0, 150.0);
        let unknown = Position::new(30.0, 32.0);
        assert_eq!(location_confidence(&good), LocationConfidence::Good);
        assert_eq!(location_confidence(&poor), LocationConfidence::Low);
        assert_eq!(location_confidence(&unknown), LocationConfidence::Good);
    }

    #[test]
    fn within_radius_mirrors_the_distance_gate() {
        let session = Session {
            id: Uuid::new_v4(),
            course_id: "CS101".to_string(),
            lecturer_id: Uuid::new_v4(),
            started_at: chrono::Utc::now(),
            is_active: true,
            anchor: GeoPoint::new(30.0000, 32.0000),
            radius_m: 50.0,
            current_token: "4821".to_string(),
        };
        let store = Arc::new(InMemoryStore::new());
        let verifier = AttendanceVerifier::new(store);

        assert!(verifier.within_radius(&Position::new(30.00029, 32.0000), &session));
        assert!(!verifier.within_radius(&Position::new(30.0010, 32.0000), &session));
    }
}
