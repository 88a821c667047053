//! crates/attendance_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A geographic coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// A device position as reported by geolocation hardware.
///
/// `accuracy_m` is the radius of the reported confidence circle; devices
/// that do not report one yield `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub point: GeoPoint,
    pub accuracy_m: Option<f64>,
}

impl Position {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            point: GeoPoint::new(lat, lng),
            accuracy_m: None,
        }
    }

    pub fn with_accuracy(lat: f64, lng: f64, accuracy_m: f64) -> Self {
        Self {
            point: GeoPoint::new(lat, lng),
            accuracy_m: Some(accuracy_m),
        }
    }
}

/// The closed set of user roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Student,
    Lecturer,
    Admin,
    SuperAdmin,
}

/// What a role is allowed to do. Handlers check capabilities, never role
/// strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ViewAttendance,
    BroadcastSession,
    ManageResources,
    ManageUsers,
}

impl Capability {
    /// Stable wire name for the capability.
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ViewAttendance => "view_attendance",
            Capability::BroadcastSession => "broadcast_session",
            Capability::ManageResources => "manage_resources",
            Capability::ManageUsers => "manage_users",
        }
    }
}

impl Role {
    /// The single place the role -> capability mapping is defined.
    pub fn capabilities(&self) -> &'static [Capability] {
        match self {
            Role::Student => &[Capability::ViewAttendance],
            Role::Lecturer => &[
                Capability::ViewAttendance,
                Capability::BroadcastSession,
                Capability::ManageResources,
            ],
            Role::Admin => &[
                Capability::ViewAttendance,
                Capability::ManageResources,
                Capability::ManageUsers,
            ],
            Role::SuperAdmin => &[
                Capability::ViewAttendance,
                Capability::BroadcastSession,
                Capability::ManageResources,
                Capability::ManageUsers,
            ],
        }
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Stable storage/wire name for the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Lecturer => "lecturer",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "student" => Some(Role::Student),
            "lecturer" => Some(Role::Lecturer),
            "admin" => Some(Role::Admin),
            "super_admin" => Some(Role::SuperAdmin),
            _ => None,
        }
    }
}

/// Represents a user - used throughout the app. New users start as students
/// with no enrolled courses.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub uid: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    /// Opaque enrolled-course identifiers. Empty means "not enrolled in
    /// anything specific".
    pub courses: Vec<String>,
}

/// One lecture instance: an attendance window anchored to a coordinate with
/// a rotating verification token.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub course_id: String,
    pub lecturer_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub is_active: bool,
    /// The coordinate captured at session start; the origin for every
    /// distance check.
    pub anchor: GeoPoint,
    /// Maximum accepted distance from the anchor, in meters. Always positive.
    pub radius_m: f64,
    /// The current 4-digit verification token; rotated while active.
    pub current_token: String,
}

/// Immutable proof-of-presence receipt. Written once on a successful
/// check-in, never updated or deleted.
#[derive(Debug, Clone)]
pub struct AttendanceLog {
    pub id: Uuid,
    pub session_id: Uuid,
    pub student_id: Uuid,
    pub student_name: String,
    /// Assigned by the store at insert time, not by the caller.
    pub recorded_at: DateTime<Utc>,
    /// Where the student was when the check-in was accepted.
    pub location: GeoPoint,
    pub verified: bool,
}

/// A named external URL attached to a course's resource board.
#[derive(Debug, Clone)]
pub struct ResourceLink {
    pub id: Uuid,
    pub course_id: String,
    pub title: String,
    pub url: String,
    pub added_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElevationStatus {
    Pending,
    Approved,
    Denied,
}

impl ElevationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElevationStatus::Pending => "pending",
            ElevationStatus::Approved => "approved",
            ElevationStatus::Denied => "denied",
        }
    }

    pub fn parse(s: &str) -> Option<ElevationStatus> {
        match s {
            "pending" => Some(ElevationStatus::Pending),
            "approved" => Some(ElevationStatus::Approved),
            "denied" => Some(ElevationStatus::Denied),
            _ => None,
        }
    }
}

/// An audited request to change a user's role.
///
/// The role change is applied by the store when a holder of the
/// `ManageUsers` capability approves the request. There is no other
/// elevation path.
#[derive(Debug, Clone)]
pub struct ElevationRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub requested_role: Role,
    pub status: ElevationStatus,
    pub requested_at: DateTime<Utc>,
    pub decided_by: Option<Uuid>,
    pub decided_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn students_cannot_broadcast_or_manage() {
        assert!(Role::Student.can(Capability::ViewAttendance));
        assert!(!Role::Student.can(Capability::BroadcastSession));
        assert!(!Role::Student.can(Capability::ManageResources));
        assert!(!Role::Student.can(Capability::ManageUsers));
    }

    #[test]
    fn lecturers_broadcast_but_do_not_manage_users() {
        assert!(Role::Lecturer.can(Capability::BroadcastSession));
        assert!(Role::Lecturer.can(Capability::ManageResources));
        assert!(!Role::Lecturer.can(Capability::ManageUsers));
    }

    #[test]
    fn super_admin_holds_every_capability() {
        for cap in [
            Capability::ViewAttendance,
            Capability::BroadcastSession,
            Capability::ManageResources,
            Capability::ManageUsers,
        ] {
            assert!(Role::SuperAdmin.can(cap));
        }
    }

    #[test]
    fn role_names_round_trip() {
        for role in [Role::Student, Role::Lecturer, Role::Admin, Role::SuperAdmin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("registrar"), None);
    }
}
