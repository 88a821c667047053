pub mod broadcaster;
pub mod domain;
pub mod geo;
pub mod ports;
pub mod token;
pub mod verifier;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use broadcaster::{RotationOutcome, SessionBroadcaster, DEFAULT_RADIUS_M, ROTATION_INTERVAL};
pub use domain::{
    AttendanceLog, Capability, ElevationRequest, ElevationStatus, GeoPoint, Position,
    ResourceLink, Role, Session, UserProfile,
};
pub use ports::{
    AttendanceStore, AuthUser, IdentityProvider, NewAttendanceLog, NewResourceLink, NewSession,
    PortError, PortResult,
};
pub use token::{TokenGenerator, UniformTokenGenerator};
pub use verifier::{AttendanceVerifier, CheckInError, LocationConfidence};
