//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `AttendanceStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use attendance_core::domain::{
    AttendanceLog, ElevationRequest, ElevationStatus, GeoPoint, ResourceLink, Role, Session,
    UserProfile,
};
use attendance_core::ports::{
    AttendanceStore, NewAttendanceLog, NewResourceLink, NewSession, PortError, PortResult,
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `AttendanceStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct ProfileRecord {
    uid: Uuid,
    email: String,
    display_name: String,
    role: String,
    courses: Vec<String>,
}
impl ProfileRecord {
    fn to_domain(self) -> PortResult<UserProfile> {
        let role = Role::parse(&self.role)
            .ok_or_else(|| PortError::Unexpected(format!("unknown role '{}'", self.role)))?;
        Ok(UserProfile {
            uid: self.uid,
            email: self.email,
            display_name: self.display_name,
            role,
            courses: self.courses,
        })
    }
}

#[derive(FromRow)]
struct SessionRecord {
    id: Uuid,
    course_id: String,
    lecturer_id: Uuid,
    started_at: DateTime<Utc>,
    is_active: bool,
    anchor_lat: f64,
    anchor_lng: f64,
    radius_m: f64,
    current_token: String,
}
impl SessionRecord {
    fn to_domain(self) -> Session {
        Session {
            id: self.id,
            course_id: self.course_id,
            lecturer_id: self.lecturer_id,
            started_at: self.started_at,
            is_active: self.is_active,
            anchor: GeoPoint::new(self.anchor_lat, self.anchor_lng),
            radius_m: self.radius_m,
            current_token: self.current_token,
        }
    }
}

const SESSION_COLUMNS: &str =
    "id, course_id, lecturer_id, started_at, is_active, anchor_lat, anchor_lng, radius_m, current_token";

#[derive(FromRow)]
struct AttendanceLogRecord {
    id: Uuid,
    session_id: Uuid,
    student_id: Uuid,
    student_name: String,
    recorded_at: DateTime<Utc>,
    lat: f64,
    lng: f64,
    verified: bool,
}
impl AttendanceLogRecord {
    fn to_domain(self) -> AttendanceLog {
        AttendanceLog {
            id: self.id,
            session_id: self.session_id,
            student_id: self.student_id,
            student_name: self.student_name,
            recorded_at: self.recorded_at,
            location: GeoPoint::new(self.lat, self.lng),
            verified: self.verified,
        }
    }
}

#[derive(FromRow)]
struct ResourceRecord {
    id: Uuid,
    course_id: String,
    title: String,
    url: String,
    added_by: Uuid,
    created_at: DateTime<Utc>,
}
impl ResourceRecord {
    fn to_domain(self) -> ResourceLink {
        ResourceLink {
            id: self.id,
            course_id: self.course_id,
            title: self.title,
            url: self.url,
            added_by: self.added_by,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct ElevationRecord {
    id: Uuid,
    user_id: Uuid,
    requested_role: String,
    status: String,
    requested_at: DateTime<Utc>,
    decided_by: Option<Uuid>,
    decided_at: Option<DateTime<Utc>>,
}
impl ElevationRecord {
    fn to_domain(self) -> PortResult<ElevationRequest> {
        let requested_role = Role::parse(&self.requested_role).ok_or_else(|| {
            PortError::Unexpected(format!("unknown role '{}'", self.requested_role))
        })?;
        let status = ElevationStatus::parse(&self.status).ok_or_else(|| {
            PortError::Unexpected(format!("unknown elevation status '{}'", self.status))
        })?;
        Ok(ElevationRequest {
            id: self.id,
            user_id: self.user_id,
            requested_role,
            status,
            requested_at: self.requested_at,
            decided_by: self.decided_by,
            decided_at: self.decided_at,
        })
    }
}

//=========================================================================================
// `AttendanceStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AttendanceStore for DbAdapter {
    async fn get_or_create_profile(
        &self,
        uid: Uuid,
        email: &str,
        display_name: &str,
    ) -> PortResult<UserProfile> {
        sqlx::query(
            "INSERT INTO users (uid, email, display_name) VALUES ($1, $2, $3) ON CONFLICT (uid) DO NOTHING",
        )
        .bind(uid)
        .bind(email)
        .bind(display_name)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        self.get_profile(uid).await
    }

    async fn get_profile(&self, uid: Uuid) -> PortResult<UserProfile> {
        let record = sqlx::query_as::<_, ProfileRecord>(
            "SELECT uid, email, display_name, role, courses FROM users WHERE uid = $1",
        )
        .bind(uid)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", uid)),
            _ => unexpected(e),
        })?;
        record.to_domain()
    }

    async fn set_role(&self, uid: Uuid, role: Role) -> PortResult<()> {
        let result = sqlx::query("UPDATE users SET role = $1 WHERE uid = $2")
            .bind(role.as_str())
            .bind(uid)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("User {} not found", uid)));
        }
        Ok(())
    }

    async fn create_session(&self, new_session: NewSession) -> PortResult<Session> {
        let record = sqlx::query_as::<_, SessionRecord>(&format!(
            "INSERT INTO sessions (course_id, lecturer_id, anchor_lat, anchor_lng, radius_m, current_token) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {SESSION_COLUMNS}"
        ))
        .bind(&new_session.course_id)
        .bind(new_session.lecturer_id)
        .bind(new_session.anchor.lat)
        .bind(new_session.anchor.lng)
        .bind(new_session.radius_m)
        .bind(&new_session.initial_token)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_session(&self, session_id: Uuid) -> PortResult<Session> {
        let record = sqlx::query_as::<_, SessionRecord>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1"
        ))
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("Session {} not found", session_id))
            }
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn update_session_token(&self, session_id: Uuid, token: &str) -> PortResult<()> {
        let result = sqlx::query("UPDATE sessions SET current_token = $1 WHERE id = $2")
            .bind(token)
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Session {} not found",
                session_id
            )));
        }
        Ok(())
    }

    async fn end_session(&self, session_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("UPDATE sessions SET is_active = FALSE WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Session {} not found",
                session_id
            )));
        }
        Ok(())
    }

    async fn active_sessions(&self) -> PortResult<Vec<Session>> {
        let records = sqlx::query_as::<_, SessionRecord>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE is_active = TRUE"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn record_attendance(&self, new_log: NewAttendanceLog) -> PortResult<AttendanceLog> {
        // recorded_at is assigned by the database default, never by us.
        let record = sqlx::query_as::<_, AttendanceLogRecord>(
            "INSERT INTO attendance_logs (session_id, student_id, student_name, lat, lng, verified) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, session_id, student_id, student_name, recorded_at, lat, lng, verified",
        )
        .bind(new_log.session_id)
        .bind(new_log.student_id)
        .bind(&new_log.student_name)
        .bind(new_log.location.lat)
        .bind(new_log.location.lng)
        .bind(new_log.verified)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn attendance_for_session(&self, session_id: Uuid) -> PortResult<Vec<AttendanceLog>> {
        let records = sqlx::query_as::<_, AttendanceLogRecord>(
            "SELECT id, session_id, student_id, student_name, recorded_at, lat, lng, verified \
             FROM attendance_logs WHERE session_id = $1 ORDER BY recorded_at ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn create_resource(&self, new_resource: NewResourceLink) -> PortResult<ResourceLink> {
        let record = sqlx::query_as::<_, ResourceRecord>(
            "INSERT INTO resources (course_id, title, url, added_by) VALUES ($1, $2, $3, $4) \
             RETURNING id, course_id, title, url, added_by, created_at",
        )
        .bind(&new_resource.course_id)
        .bind(&new_resource.title)
        .bind(&new_resource.url)
        .bind(new_resource.added_by)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn resources_for_course(&self, course_id: &str) -> PortResult<Vec<ResourceLink>> {
        let records = sqlx::query_as::<_, ResourceRecord>(
            "SELECT id, course_id, title, url, added_by, created_at \
             FROM resources WHERE course_id = $1 ORDER BY created_at ASC",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn create_elevation_request(
        &self,
        user_id: Uuid,
        requested_role: Role,
    ) -> PortResult<ElevationRequest> {
        let record = sqlx::query_as::<_, ElevationRecord>(
            "INSERT INTO elevation_requests (user_id, requested_role) VALUES ($1, $2) \
             RETURNING id, user_id, requested_role, status, requested_at, decided_by, decided_at",
        )
        .bind(user_id)
        .bind(requested_role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn pending_elevation_requests(&self) -> PortResult<Vec<ElevationRequest>> {
        let records = sqlx::query_as::<_, ElevationRecord>(
            "SELECT id, user_id, requested_role, status, requested_at, decided_by, decided_at \
             FROM elevation_requests WHERE status = 'pending' ORDER BY requested_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn decide_elevation_request(
        &self,
        request_id: Uuid,
        decided_by: Uuid,
        approve: bool,
    ) -> PortResult<ElevationRequest> {
        let status = if approve { "approved" } else { "denied" };
        let record = sqlx::query_as::<_, ElevationRecord>(
            "UPDATE elevation_requests \
             SET status = $1, decided_by = $2, decided_at = now() \
             WHERE id = $3 AND status = 'pending' \
             RETURNING id, user_id, requested_role, status, requested_at, decided_by, decided_at",
        )
        .bind(status)
        .bind(decided_by)
        .bind(request_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!(
                "Pending elevation request {} not found",
                request_id
            )),
            _ => unexpected(e),
        })?;
        let decided = record.to_domain()?;

        // Applying the role is part of the approval operation itself.
        if approve {
            self.set_role(decided.user_id, decided.requested_role).await?;
        }
        Ok(decided)
    }
}
