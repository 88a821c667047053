//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::rotation_task::rotation_process;
use crate::web::state::{AppState, LiveBroadcast};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::error;
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

use attendance_core::broadcaster::SessionBroadcaster;
use attendance_core::domain::{Capability, Position, Role, UserProfile};
use attendance_core::ports::{NewResourceLink, PortError};
use attendance_core::verifier::{
    location_confidence, AttendanceVerifier, CheckInError, LocationConfidence,
};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::signup_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        profile_handler,
        start_session_handler,
        end_session_handler,
        active_session_handler,
        check_in_handler,
        session_attendance_handler,
        list_resources_handler,
        create_resource_handler,
        create_elevation_handler,
        pending_elevations_handler,
        decide_elevation_handler,
    ),
    components(
        schemas(
            crate::web::auth::SignupRequest,
            crate::web::auth::LoginRequest,
            crate::web::auth::AuthResponse,
            LocationPayload,
            StartSessionRequest,
            BroadcastSessionResponse,
            ActiveSessionResponse,
            CheckInRequest,
            CheckInResponse,
            AttendanceLogResponse,
            ProfileResponse,
            CreateResourceRequest,
            ResourceResponse,
            CreateElevationRequest,
            DecideElevationRequest,
            ElevationResponse,
        )
    ),
    tags(
        (name = "Campus Attendance API", description = "Proximity-gated lecture attendance with rotating verification tokens.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// A device position as the client's geolocation hardware reported it.
#[derive(Deserialize, ToSchema)]
pub struct LocationPayload {
    pub lat: f64,
    pub lng: f64,
    /// Radius of the reported confidence circle, in meters.
    pub accuracy_m: Option<f64>,
}

impl LocationPayload {
    fn into_position(self) -> Position {
        Position {
            point: attendance_core::domain::GeoPoint::new(self.lat, self.lng),
            accuracy_m: self.accuracy_m,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct StartSessionRequest {
    pub course_id: String,
    /// Acceptance radius in meters; defaults to 50 when omitted.
    pub radius_m: Option<f64>,
    /// The lecturer device's current position; becomes the session anchor.
    pub location: Option<LocationPayload>,
}

/// The lecturer's view of a freshly started session, token included.
#[derive(Serialize, ToSchema)]
pub struct BroadcastSessionResponse {
    pub session_id: Uuid,
    pub course_id: String,
    pub started_at: DateTime<Utc>,
    pub radius_m: f64,
    pub current_token: String,
}

/// Optional device position for the live distance readout.
#[derive(Deserialize, IntoParams)]
pub struct ActiveSessionQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub accuracy_m: Option<f64>,
}

impl ActiveSessionQuery {
    fn position(&self) -> Option<Position> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(Position {
                point: attendance_core::domain::GeoPoint::new(lat, lng),
                accuracy_m: self.accuracy_m,
            }),
            _ => None,
        }
    }
}

/// The student's view of the selected active session. The token is never
/// part of it; students learn the token from the lecture-hall screen.
#[derive(Serialize, ToSchema)]
pub struct ActiveSessionResponse {
    pub session_id: Uuid,
    pub course_id: String,
    pub started_at: DateTime<Utc>,
    pub anchor_lat: f64,
    pub anchor_lng: f64,
    pub radius_m: f64,
    /// Live distance from the caller's reported position, when one was
    /// supplied with the request.
    pub distance_m: Option<f64>,
    /// Whether that distance is within the acceptance radius. A display
    /// guard only; check-in re-verifies regardless.
    pub in_range: Option<bool>,
    /// Set when the reported GPS accuracy was poor; advisory only.
    pub location_warning: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct CheckInRequest {
    pub token: String,
    pub location: Option<LocationPayload>,
}

#[derive(Serialize, ToSchema)]
pub struct CheckInResponse {
    pub log_id: Uuid,
    pub session_id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub verified: bool,
    /// Set when the device's reported accuracy was poor; advisory only.
    pub location_warning: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceLogResponse {
    pub id: Uuid,
    pub student_id: Uuid,
    pub student_name: String,
    pub recorded_at: DateTime<Utc>,
    pub verified: bool,
}

#[derive(Serialize, ToSchema)]
pub struct ProfileResponse {
    pub uid: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub courses: Vec<String>,
    pub capabilities: Vec<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct ResourceQuery {
    pub course_id: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateResourceRequest {
    pub course_id: String,
    pub title: String,
    pub url: String,
}

#[derive(Serialize, ToSchema)]
pub struct ResourceResponse {
    pub id: Uuid,
    pub course_id: String,
    pub title: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateElevationRequest {
    pub requested_role: String,
}

#[derive(Deserialize, ToSchema)]
pub struct DecideElevationRequest {
    pub approve: bool,
}

#[derive(Serialize, ToSchema)]
pub struct ElevationResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub requested_role: String,
    pub status: String,
    pub requested_at: DateTime<Utc>,
    pub decided_by: Option<Uuid>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl ElevationResponse {
    fn from_domain(request: attendance_core::domain::ElevationRequest) -> Self {
        Self {
            id: request.id,
            user_id: request.user_id,
            requested_role: request.requested_role.as_str().to_string(),
            status: request.status.as_str().to_string(),
            requested_at: request.requested_at,
            decided_by: request.decided_by,
            decided_at: request.decided_at,
        }
    }
}

//=========================================================================================
// Shared Gates and Error Mapping
//=========================================================================================

/// Refuses the request unless the caller's role holds `capability`.
fn require_capability(
    profile: &UserProfile,
    capability: Capability,
) -> Result<(), (StatusCode, String)> {
    if profile.role.can(capability) {
        Ok(())
    } else {
        Err((
            StatusCode::FORBIDDEN,
            "You do not have permission to perform this action".to_string(),
        ))
    }
}

/// Maps each check-in rejection to its HTTP status. The message itself comes
/// from the error's own display text.
fn check_in_status(error: &CheckInError) -> StatusCode {
    match error {
        CheckInError::NoActiveSession => StatusCode::NOT_FOUND,
        CheckInError::LocationUnavailable => StatusCode::BAD_REQUEST,
        CheckInError::OutOfRange { .. } | CheckInError::TokenMismatch => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        CheckInError::Submission(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn not_found_or_internal(e: PortError, what: &str) -> (StatusCode, String) {
    match e {
        PortError::NotFound(_) => (StatusCode::NOT_FOUND, format!("{what} not found")),
        other => {
            error!("Store error: {:?}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred".to_string(),
            )
        }
    }
}

//=========================================================================================
// Profile
//=========================================================================================

/// GET /profile - The signed-in user's profile and capabilities.
#[utoipa::path(
    get,
    path = "/profile",
    responses(
        (status = 200, description = "The caller's profile", body = ProfileResponse),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn profile_handler(
    Extension(profile): Extension<UserProfile>,
) -> Json<ProfileResponse> {
    let capabilities = profile
        .role
        .capabilities()
        .iter()
        .map(|c| c.as_str().to_string())
        .collect();
    Json(ProfileResponse {
        uid: profile.uid,
        email: profile.email,
        display_name: profile.display_name,
        role: profile.role.as_str().to_string(),
        courses: profile.courses,
        capabilities,
    })
}

//=========================================================================================
// Session Broadcasting (Lecturer Side)
//=========================================================================================

/// POST /sessions - Start a lecture session anchored at the lecturer's
/// current position, and begin rotating its token.
#[utoipa::path(
    post,
    path = "/sessions",
    request_body = StartSessionRequest,
    responses(
        (status = 201, description = "Session started", body = BroadcastSessionResponse),
        (status = 400, description = "No device location supplied"),
        (status = 403, description = "Caller cannot broadcast sessions"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn start_session_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(profile): Extension<UserProfile>,
    Json(req): Json<StartSessionRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    require_capability(&profile, Capability::BroadcastSession)?;

    // A session cannot exist without an anchor; there is no retry here.
    let position = req.location.map(LocationPayload::into_position).ok_or((
        StatusCode::BAD_REQUEST,
        "A device location is required to start a session. Enable GPS and try again.".to_string(),
    ))?;

    let mut broadcaster =
        SessionBroadcaster::new(app_state.store.clone(), app_state.tokens.clone());
    let session = broadcaster
        .start(&req.course_id, profile.uid, position, req.radius_m)
        .await
        .map_err(|e| {
            error!("Failed to start session: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to start session".to_string(),
            )
        })?;

    let broadcaster = Arc::new(Mutex::new(broadcaster));
    let cancellation_token = CancellationToken::new();
    tokio::spawn(rotation_process(
        broadcaster.clone(),
        app_state.config.rotation_interval,
        cancellation_token.clone(),
    ));
    app_state.live_broadcasts.lock().await.insert(
        session.id,
        LiveBroadcast {
            broadcaster,
            cancellation_token,
            lecturer_id: profile.uid,
        },
    );

    Ok((
        StatusCode::CREATED,
        Json(BroadcastSessionResponse {
            session_id: session.id,
            course_id: session.course_id,
            started_at: session.started_at,
            radius_m: session.radius_m,
            current_token: session.current_token,
        }),
    ))
}

/// POST /sessions/{id}/end - End a session. Stops the token rotation and
/// flips the active flag; the record stays queryable as closed history.
#[utoipa::path(
    post,
    path = "/sessions/{id}/end",
    params(("id" = Uuid, Path, description = "The session to end")),
    responses(
        (status = 200, description = "Session ended"),
        (status = 403, description = "Caller does not own this session"),
        (status = 404, description = "No such session"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn end_session_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(profile): Extension<UserProfile>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    require_capability(&profile, Capability::BroadcastSession)?;

    let live = {
        let mut broadcasts = app_state.live_broadcasts.lock().await;
        match broadcasts.get(&session_id) {
            Some(entry) if entry.lecturer_id != profile.uid => {
                return Err((
                    StatusCode::FORBIDDEN,
                    "Only the session owner can end it".to_string(),
                ));
            }
            Some(_) => broadcasts.remove(&session_id),
            None => None,
        }
    };

    match live {
        Some(live) => {
            // Cancel the rotation first so no tick lands after the end.
            live.cancellation_token.cancel();
            live.broadcaster.lock().await.end().await.map_err(|e| {
                error!("Failed to end session: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to end session".to_string(),
                )
            })?;
        }
        None => {
            // Not broadcast by this process (e.g. it restarted); end the
            // record directly.
            let session = app_state
                .store
                .get_session(session_id)
                .await
                .map_err(|e| not_found_or_internal(e, "Session"))?;
            if session.lecturer_id != profile.uid {
                return Err((
                    StatusCode::FORBIDDEN,
                    "Only the session owner can end it".to_string(),
                ));
            }
            app_state
                .store
                .end_session(session_id)
                .await
                .map_err(|e| not_found_or_internal(e, "Session"))?;
        }
    }

    Ok(StatusCode::OK)
}

/// GET /sessions/{id}/attendance - The check-in receipts for one session.
#[utoipa::path(
    get,
    path = "/sessions/{id}/attendance",
    params(("id" = Uuid, Path, description = "The session to report on")),
    responses(
        (status = 200, description = "Attendance receipts", body = [AttendanceLogResponse]),
        (status = 403, description = "Caller may not view this session's attendance"),
        (status = 404, description = "No such session")
    )
)]
pub async fn session_attendance_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(profile): Extension<UserProfile>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    require_capability(&profile, Capability::ViewAttendance)?;

    let session = app_state
        .store
        .get_session(session_id)
        .await
        .map_err(|e| not_found_or_internal(e, "Session"))?;
    if session.lecturer_id != profile.uid && !profile.role.can(Capability::ManageUsers) {
        return Err((
            StatusCode::FORBIDDEN,
            "You can only view attendance for your own sessions".to_string(),
        ));
    }

    let logs = app_state
        .store
        .attendance_for_session(session_id)
        .await
        .map_err(|e| not_found_or_internal(e, "Session"))?;
    let response: Vec<AttendanceLogResponse> = logs
        .into_iter()
        .map(|log| AttendanceLogResponse {
            id: log.id,
            student_id: log.student_id,
            student_name: log.student_name,
            recorded_at: log.recorded_at,
            verified: log.verified,
        })
        .collect();
    Ok(Json(response))
}

//=========================================================================================
// Attendance Verification (Student Side)
//=========================================================================================

/// GET /sessions/active - The active session selected for this student, or
/// 404 with a "no active lecture" message. When the caller reports its
/// position, the response carries the live distance readout the check-in
/// screen displays.
#[utoipa::path(
    get,
    path = "/sessions/active",
    params(ActiveSessionQuery),
    responses(
        (status = 200, description = "The selected active session", body = ActiveSessionResponse),
        (status = 404, description = "No active lecture right now")
    )
)]
pub async fn active_session_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(profile): Extension<UserProfile>,
    Query(query): Query<ActiveSessionQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let verifier = AttendanceVerifier::new(app_state.store.clone());
    let session = verifier
        .find_active_session(&profile)
        .await
        .map_err(|e| {
            error!("Failed to look up active sessions: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to look up sessions".to_string(),
            )
        })?
        .ok_or((
            StatusCode::NOT_FOUND,
            "No active lecture right now. Refresh to check again.".to_string(),
        ))?;

    let position = query.position();
    let distance_m = position.as_ref().map(|p| verifier.distance_to(p, &session));
    let in_range = position.as_ref().map(|p| verifier.within_radius(p, &session));
    let location_warning = position.as_ref().and_then(|p| match location_confidence(p) {
        LocationConfidence::Low => {
            Some("GPS accuracy is poor. Move somewhere with open sky.".to_string())
        }
        LocationConfidence::Good => None,
    });

    Ok(Json(ActiveSessionResponse {
        session_id: session.id,
        course_id: session.course_id,
        started_at: session.started_at,
        anchor_lat: session.anchor.lat,
        anchor_lng: session.anchor.lng,
        radius_m: session.radius_m,
        distance_m,
        in_range,
        location_warning,
    }))
}

/// POST /attendance - One check-in attempt against the selected active
/// session. Distance is checked before the token; each rejection carries its
/// own message and the attempt stays retryable.
#[utoipa::path(
    post,
    path = "/attendance",
    request_body = CheckInRequest,
    responses(
        (status = 201, description = "Attendance recorded", body = CheckInResponse),
        (status = 400, description = "Location unavailable"),
        (status = 404, description = "No active lecture"),
        (status = 422, description = "Out of range or wrong token"),
        (status = 500, description = "The check-in could not be recorded")
    )
)]
pub async fn check_in_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(profile): Extension<UserProfile>,
    Json(req): Json<CheckInRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let verifier = AttendanceVerifier::new(app_state.store.clone());
    let session = verifier
        .find_active_session(&profile)
        .await
        .map_err(|e| {
            error!("Failed to look up active sessions: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to look up sessions".to_string(),
            )
        })?
        .ok_or_else(|| {
            let e = CheckInError::NoActiveSession;
            (check_in_status(&e), e.to_string())
        })?;

    let position = req.location.map(LocationPayload::into_position);
    let location_warning = position.as_ref().and_then(|p| match location_confidence(p) {
        LocationConfidence::Low => {
            Some("GPS accuracy is poor. Move somewhere with open sky.".to_string())
        }
        LocationConfidence::Good => None,
    });

    let log = verifier
        .submit(session.id, &profile, position, &req.token)
        .await
        .map_err(|e| (check_in_status(&e), e.to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(CheckInResponse {
            log_id: log.id,
            session_id: log.session_id,
            recorded_at: log.recorded_at,
            verified: log.verified,
            location_warning,
        }),
    ))
}

//=========================================================================================
// Resource Board
//=========================================================================================

/// GET /resources?course_id=X - The resource links for one course.
#[utoipa::path(
    get,
    path = "/resources",
    params(ResourceQuery),
    responses(
        (status = 200, description = "Resource links", body = [ResourceResponse])
    )
)]
pub async fn list_resources_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ResourceQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let resources = app_state
        .store
        .resources_for_course(&query.course_id)
        .await
        .map_err(|e| not_found_or_internal(e, "Course"))?;
    let response: Vec<ResourceResponse> = resources
        .into_iter()
        .map(|r| ResourceResponse {
            id: r.id,
            course_id: r.course_id,
            title: r.title,
            url: r.url,
            created_at: r.created_at,
        })
        .collect();
    Ok(Json(response))
}

/// POST /resources - Add a link to a course's resource board.
#[utoipa::path(
    post,
    path = "/resources",
    request_body = CreateResourceRequest,
    responses(
        (status = 201, description = "Resource created", body = ResourceResponse),
        (status = 403, description = "Caller cannot manage resources")
    )
)]
pub async fn create_resource_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(profile): Extension<UserProfile>,
    Json(req): Json<CreateResourceRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    require_capability(&profile, Capability::ManageResources)?;

    let resource = app_state
        .store
        .create_resource(NewResourceLink {
            course_id: req.course_id,
            title: req.title,
            url: req.url,
            added_by: profile.uid,
        })
        .await
        .map_err(|e| not_found_or_internal(e, "Course"))?;

    Ok((
        StatusCode::CREATED,
        Json(ResourceResponse {
            id: resource.id,
            course_id: resource.course_id,
            title: resource.title,
            url: resource.url,
            created_at: resource.created_at,
        }),
    ))
}

//=========================================================================================
// Role Elevation (Audited)
//=========================================================================================

/// POST /elevations - Request a role elevation for the signed-in user.
/// Recorded for audit; nothing changes until someone with the ManageUsers
/// capability approves it.
#[utoipa::path(
    post,
    path = "/elevations",
    request_body = CreateElevationRequest,
    responses(
        (status = 201, description = "Elevation requested", body = ElevationResponse),
        (status = 400, description = "Unknown role")
    )
)]
pub async fn create_elevation_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(profile): Extension<UserProfile>,
    Json(req): Json<CreateElevationRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let requested_role = Role::parse(&req.requested_role).ok_or((
        StatusCode::BAD_REQUEST,
        format!("'{}' is not a known role", req.requested_role),
    ))?;

    let request = app_state
        .store
        .create_elevation_request(profile.uid, requested_role)
        .await
        .map_err(|e| not_found_or_internal(e, "User"))?;
    Ok((
        StatusCode::CREATED,
        Json(ElevationResponse::from_domain(request)),
    ))
}

/// GET /elevations/pending - All undecided elevation requests.
#[utoipa::path(
    get,
    path = "/elevations/pending",
    responses(
        (status = 200, description = "Pending requests", body = [ElevationResponse]),
        (status = 403, description = "Caller cannot manage users")
    )
)]
pub async fn pending_elevations_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(profile): Extension<UserProfile>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    require_capability(&profile, Capability::ManageUsers)?;

    let requests = app_state
        .store
        .pending_elevation_requests()
        .await
        .map_err(|e| not_found_or_internal(e, "Elevation request"))?;
    let response: Vec<ElevationResponse> = requests
        .into_iter()
        .map(ElevationResponse::from_domain)
        .collect();
    Ok(Json(response))
}

/// POST /elevations/{id}/decide - Approve or deny a pending request. On
/// approval the requested role is applied server-side in the same operation.
#[utoipa::path(
    post,
    path = "/elevations/{id}/decide",
    params(("id" = Uuid, Path, description = "The elevation request")),
    request_body = DecideElevationRequest,
    responses(
        (status = 200, description = "Decision recorded", body = ElevationResponse),
        (status = 403, description = "Caller cannot manage users"),
        (status = 404, description = "No such pending request")
    )
)]
pub async fn decide_elevation_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(profile): Extension<UserProfile>,
    Path(request_id): Path<Uuid>,
    Json(req): Json<DecideElevationRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    require_capability(&profile, Capability::ManageUsers)?;

    let decided = app_state
        .store
        .decide_elevation_request(request_id, profile.uid, req.approve)
        .await
        .map_err(|e| not_found_or_internal(e, "Pending elevation request"))?;
    Ok(Json(ElevationResponse::from_domain(decided)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use attendance_core::ports::PortError;

    fn profile_with_role(role: Role) -> UserProfile {
        UserProfile {
            uid: Uuid::new_v4(),
            email: "someone@campus.edu".to_string(),
            display_name: "Someone".to_string(),
            role,
            courses: Vec::new(),
        }
    }

    #[test]
    fn capability_gate_refuses_students_and_admits_lecturers() {
        let student = profile_with_role(Role::Student);
        let lecturer = profile_with_role(Role::Lecturer);

        assert!(require_capability(&student, Capability::BroadcastSession).is_err());
        assert!(require_capability(&lecturer, Capability::BroadcastSession).is_ok());
        assert!(require_capability(&lecturer, Capability::ManageUsers).is_err());
    }

    #[test]
    fn each_rejection_maps_to_its_own_status() {
        assert_eq!(
            check_in_status(&CheckInError::NoActiveSession),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            check_in_status(&CheckInError::LocationUnavailable),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            check_in_status(&CheckInError::OutOfRange {
                distance_m: 111.0,
                radius_m: 50.0
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            check_in_status(&CheckInError::TokenMismatch),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            check_in_status(&CheckInError::Submission(PortError::Unexpected(
                "write failed".to_string()
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn rejection_messages_state_the_measured_distance_and_radius() {
        let message = CheckInError::OutOfRange {
            distance_m: 111.2,
            radius_m: 50.0,
        }
        .to_string();
        assert!(message.contains("111"));
        assert!(message.contains("50"));

        let message = CheckInError::TokenMismatch.to_string();
        assert!(message.contains("invalid or expired"));
    }
}
