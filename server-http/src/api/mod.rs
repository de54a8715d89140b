pub mod responses;

pub use responses::{
    ErrorResponse, HealthResponse, ProtectedResponse, ProtectedUser, RegisteredResponse,
    ServiceStatusResponse, TokenResponse,
};
