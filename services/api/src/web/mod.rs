pub mod auth;
pub mod middleware;
pub mod rest;
pub mod rotation_task;
pub mod state;

// Re-export the pieces the binary needs to build the web server router.
pub use middleware::require_auth;
pub use rest::{
    active_session_handler, check_in_handler, create_elevation_handler,
    create_resource_handler, decide_elevation_handler, end_session_handler,
    list_resources_handler, pending_elevations_handler, profile_handler,
    session_attendance_handler, start_session_handler,
};
