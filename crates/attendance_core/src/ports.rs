//! crates/attendance_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture: the shared
//! document store and the identity provider are external collaborators, and
//! the core stays independent of their concrete implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    AttendanceLog, ElevationRequest, GeoPoint, ResourceLink, Role, Session, UserProfile,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Creation Payloads
//=========================================================================================

/// Everything the broadcaster supplies when opening a session. The store
/// assigns the id and the start timestamp.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub course_id: String,
    pub lecturer_id: Uuid,
    pub anchor: GeoPoint,
    pub radius_m: f64,
    pub initial_token: String,
}

/// A check-in receipt about to be written. `recorded_at` is assigned by the
/// store, never by the caller.
#[derive(Debug, Clone)]
pub struct NewAttendanceLog {
    pub session_id: Uuid,
    pub student_id: Uuid,
    pub student_name: String,
    pub location: GeoPoint,
    pub verified: bool,
}

#[derive(Debug, Clone)]
pub struct NewResourceLink {
    pub course_id: String,
    pub title: String,
    pub url: String,
    pub added_by: Uuid,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The shared document store: four record sets (`sessions`,
/// `attendance_logs`, `users`, `resources`, plus the audited
/// `elevation_requests`) accessed by identifier or single-field equality.
/// No transactions, no compound queries.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    // --- User Profiles ---

    /// Fetches the profile for `uid`, creating it with role `student` and an
    /// empty course list if this is the user's first appearance.
    async fn get_or_create_profile(
        &self,
        uid: Uuid,
        email: &str,
        display_name: &str,
    ) -> PortResult<UserProfile>;

    async fn get_profile(&self, uid: Uuid) -> PortResult<UserProfile>;

    async fn set_role(&self, uid: Uuid, role: Role) -> PortResult<()>;

    // --- Sessions ---

    async fn create_session(&self, new_session: NewSession) -> PortResult<Session>;

    async fn get_session(&self, session_id: Uuid) -> PortResult<Session>;

    /// Overwrites the rotating token on a live session record.
    async fn update_session_token(&self, session_id: Uuid, token: &str) -> PortResult<()>;

    /// Flips `is_active` to false. The record itself is preserved as closed
    /// history.
    async fn end_session(&self, session_id: Uuid) -> PortResult<()>;

    /// Every session with `is_active == true`, in no guaranteed order.
    /// Callers apply their own selection policy.
    async fn active_sessions(&self) -> PortResult<Vec<Session>>;

    // --- Attendance Logs ---

    async fn record_attendance(&self, new_log: NewAttendanceLog) -> PortResult<AttendanceLog>;

    async fn attendance_for_session(&self, session_id: Uuid) -> PortResult<Vec<AttendanceLog>>;

    // --- Resource Board ---

    async fn create_resource(&self, new_resource: NewResourceLink) -> PortResult<ResourceLink>;

    async fn resources_for_course(&self, course_id: &str) -> PortResult<Vec<ResourceLink>>;

    // --- Role Elevation (audited) ---

    async fn create_elevation_request(
        &self,
        user_id: Uuid,
        requested_role: Role,
    ) -> PortResult<ElevationRequest>;

    async fn pending_elevation_requests(&self) -> PortResult<Vec<ElevationRequest>>;

    /// Records the decision and, on approval, applies the requested role to
    /// the target user in the same operation.
    async fn decide_elevation_request(
        &self,
        request_id: Uuid,
        decided_by: Uuid,
        approve: bool,
    ) -> PortResult<ElevationRequest>;
}

/// The signed-in identity as the external provider reports it. The core
/// consumes only these three fields.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub uid: Uuid,
    pub email: String,
    pub display_name: String,
}

/// The hosted identity provider. Supplies authenticated identities and an
/// opaque auth-session handle; everything else about credentials is its
/// business.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> PortResult<AuthUser>;

    async fn authenticate(&self, email: &str, password: &str) -> PortResult<AuthUser>;

    /// Opens an auth session and returns its opaque identifier.
    async fn open_auth_session(
        &self,
        uid: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<String>;

    /// Resolves an auth-session identifier back to the signed-in identity,
    /// or `Unauthorized` when the session is unknown or expired.
    async fn resolve_auth_session(&self, auth_session_id: &str) -> PortResult<AuthUser>;

    async fn close_auth_session(&self, auth_session_id: &str) -> PortResult<()>;
}
