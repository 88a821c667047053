//! crates/attendance_core/src/testing.rs
//!
//! Test doubles for the core ports: an in-memory document store and a
//! deterministic token sequence. Compiled for this crate's own tests and,
//! behind the `test-util` feature, for downstream test suites.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use crate::domain::{
    AttendanceLog, ElevationRequest, ElevationStatus, ResourceLink, Role, Session, UserProfile,
};
use crate::ports::{
    AttendanceStore, NewAttendanceLog, NewResourceLink, NewSession, PortError, PortResult,
};
use crate::token::TokenGenerator;

/// Yields a fixed token sequence, wrapping around at the end.
pub struct SequenceTokenGenerator {
    tokens: Vec<String>,
    next: Mutex<usize>,
}

impl SequenceTokenGenerator {
    pub fn new(tokens: &[&str]) -> Self {
        assert!(!tokens.is_empty());
        Self {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            next: Mutex::new(0),
        }
    }
}

impl TokenGenerator for SequenceTokenGenerator {
    fn generate(&self) -> String {
        let mut next = self.next.lock().unwrap();
        let token = self.tokens[*next % self.tokens.len()].clone();
        *next += 1;
        token
    }
}

#[derive(Default)]
struct StoreInner {
    profiles: HashMap<Uuid, UserProfile>,
    sessions: HashMap<Uuid, Session>,
    logs: Vec<AttendanceLog>,
    resources: Vec<ResourceLink>,
    elevations: HashMap<Uuid, ElevationRequest>,
    session_seq: i64,
}

/// A `Mutex<HashMap>`-backed stand-in for the shared document store.
///
/// Session start times are assigned from a fixed base clock, strictly
/// increasing per insert, so "most recent" selection is deterministic in
/// tests.
pub struct InMemoryStore {
    inner: Mutex<StoreInner>,
    fail_next_token_write: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner::default()),
            fail_next_token_write: AtomicBool::new(false),
        }
    }

    /// Makes the next `update_session_token` call fail once.
    pub fn fail_next_token_write(&self) {
        self.fail_next_token_write.store(true, Ordering::SeqCst);
    }

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 1, 9, 0, 0).unwrap()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AttendanceStore for InMemoryStore {
    async fn get_or_create_profile(
        &self,
        uid: Uuid,
        email: &str,
        display_name: &str,
    ) -> PortResult<UserProfile> {
        let mut inner = self.inner.lock().unwrap();
        let profile = inner.profiles.entry(uid).or_insert_with(|| UserProfile {
            uid,
            email: email.to_string(),
            display_name: display_name.to_string(),
            role: Role::Student,
            courses: Vec::new(),
        });
        Ok(profile.clone())
    }

    async fn get_profile(&self, uid: Uuid) -> PortResult<UserProfile> {
        let inner = self.inner.lock().unwrap();
        inner
            .profiles
            .get(&uid)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {uid} not found")))
    }

    async fn set_role(&self, uid: Uuid, role: Role) -> PortResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let profile = inner
            .profiles
            .get_mut(&uid)
            .ok_or_else(|| PortError::NotFound(format!("User {uid} not found")))?;
        profile.role = role;
        Ok(())
    }

    async fn create_session(&self, new_session: NewSession) -> PortResult<Session> {
        let mut inner = self.inner.lock().unwrap();
        inner.session_seq += 1;
        let session = Session {
            id: Uuid::new_v4(),
            course_id: new_session.course_id,
            lecturer_id: new_session.lecturer_id,
            started_at: Self::base_time() + Duration::seconds(inner.session_seq),
            is_active: true,
            anchor: new_session.anchor,
            radius_m: new_session.radius_m,
            current_token: new_session.initial_token,
        };
        inner.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn get_session(&self, session_id: Uuid) -> PortResult<Session> {
        let inner = self.inner.lock().unwrap();
        inner
            .sessions
            .get(&session_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Session {session_id} not found")))
    }

    async fn update_session_token(&self, session_id: Uuid, token: &str) -> PortResult<()> {
        if self.fail_next_token_write.swap(false, Ordering::SeqCst) {
            return Err(PortError::Unexpected("injected write failure".to_string()));
        }
        let mut inner = self.inner.lock().unwrap();
        let session = inner
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| PortError::NotFound(format!("Session {session_id} not found")))?;
        session.current_token = token.to_string();
        Ok(())
    }

    async fn end_session(&self, session_id: Uuid) -> PortResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let session = inner
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| PortError::NotFound(format!("Session {session_id} not found")))?;
        session.is_active = false;
        Ok(())
    }

    async fn active_sessions(&self) -> PortResult<Vec<Session>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .sessions
            .values()
            .filter(|s| s.is_active)
            .cloned()
            .collect())
    }

    async fn record_attendance(&self, new_log: NewAttendanceLog) -> PortResult<AttendanceLog> {
        let mut inner = self.inner.lock().unwrap();
        let log = AttendanceLog {
            id: Uuid::new_v4(),
            session_id: new_log.session_id,
            student_id: new_log.student_id,
            student_name: new_log.student_name,
            recorded_at: Utc::now(),
            location: new_log.location,
            verified: new_log.verified,
        };
        inner.logs.push(log.clone());
        Ok(log)
    }

    async fn attendance_for_session(&self, session_id: Uuid) -> PortResult<Vec<AttendanceLog>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .logs
            .iter()
            .filter(|l| l.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn create_resource(&self, new_resource: NewResourceLink) -> PortResult<ResourceLink> {
        let mut inner = self.inner.lock().unwrap();
        let resource = ResourceLink {
            id: Uuid::new_v4(),
            course_id: new_resource.course_id,
            title: new_resource.title,
            url: new_resource.url,
            added_by: new_resource.added_by,
            created_at: Utc::now(),
        };
        inner.resources.push(resource.clone());
        Ok(resource)
    }

    async fn resources_for_course(&self, course_id: &str) -> PortResult<Vec<ResourceLink>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .resources
            .iter()
            .filter(|r| r.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn create_elevation_request(
        &self,
        user_id: Uuid,
        requested_role: Role,
    ) -> PortResult<ElevationRequest> {
        let mut inner = self.inner.lock().unwrap();
        let request = ElevationRequest {
            id: Uuid::new_v4(),
            user_id,
            requested_role,
            status: ElevationStatus::Pending,
            requested_at: Utc::now(),
            decided_by: None,
            decided_at: None,
        };
        inner.elevations.insert(request.id, request.clone());
        Ok(request)
    }

    async fn pending_elevation_requests(&self) -> PortResult<Vec<ElevationRequest>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .elevations
            .values()
            .filter(|r| r.status == ElevationStatus::Pending)
            .cloned()
            .collect())
    }

    async fn decide_elevation_request(
        &self,
        request_id: Uuid,
        decided_by: Uuid,
        approve: bool,
    ) -> PortResult<ElevationRequest> {
        let mut inner = self.inner.lock().unwrap();
        let request = inner
            .elevations
            .get_mut(&request_id)
            .ok_or_else(|| PortError::NotFound(format!("Elevation request {request_id} not found")))?;
        if request.status != ElevationStatus::Pending {
            return Err(PortError::Unexpected(
                "elevation request is already decided".to_string(),
            ));
        }
        request.status = if approve {
            ElevationStatus::Approved
        } else {
            ElevationStatus::Denied
        };
        request.decided_by = Some(decided_by);
        request.decided_at = Some(Utc::now());
        let decided = request.clone();

        if approve {
            let (user_id, role) = (decided.user_id, decided.requested_role);
            if let Some(profile) = inner.profiles.get_mut(&user_id) {
                profile.role = role;
            }
        }
        Ok(decided)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_sign_in_creates_a_student_profile_with_no_courses() {
        let store = InMemoryStore::new();
        let uid = Uuid::new_v4();

        let profile = store
            .get_or_create_profile(uid, "new@campus.edu", "New User")
            .await
            .unwrap();

        assert_eq!(profile.role, Role::Student);
        assert!(profile.courses.is_empty());

        // A second sign-in returns the same profile rather than resetting it.
        store.set_role(uid, Role::Lecturer).await.unwrap();
        let again = store
            .get_or_create_profile(uid, "new@campus.edu", "New User")
            .await
            .unwrap();
        assert_eq!(again.role, Role::Lecturer);
    }

    #[tokio::test]
    async fn approving_an_elevation_request_applies_the_role() {
        let store = InMemoryStore::new();
        let target = Uuid::new_v4();
        let approver = Uuid::new_v4();
        store
            .get_or_create_profile(target, "target@campus.edu", "Target")
            .await
            .unwrap();

        let request = store
            .create_elevation_request(target, Role::Lecturer)
            .await
            .unwrap();
        assert_eq!(store.pending_elevation_requests().await.unwrap().len(), 1);

        let decided = store
            .decide_elevation_request(request.id, approver, true)
            .await
            .unwrap();
        assert_eq!(decided.status, ElevationStatus::Approved);
        assert_eq!(decided.decided_by, Some(approver));
        assert_eq!(store.get_profile(target).await.unwrap().role, Role::Lecturer);
        assert!(store.pending_elevation_requests().await.unwrap().is_empty());

        // A decided request cannot be re-decided.
        assert!(store
            .decide_elevation_request(request.id, approver, false)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn denying_an_elevation_request_leaves_the_role_alone() {
        let store = InMemoryStore::new();
        let target = Uuid::new_v4();
        store
            .get_or_create_profile(target, "target@campus.edu", "Target")
            .await
            .unwrap();

        let request = store
            .create_elevation_request(target, Role::SuperAdmin)
            .await
            .unwrap();
        store
            .decide_elevation_request(request.id, Uuid::new_v4(), false)
            .await
            .unwrap();

        assert_eq!(store.get_profile(target).await.unwrap().role, Role::Student);
    }
}
