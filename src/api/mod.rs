//! Verification back-office API on top of the request engine.

pub mod client;
pub mod types;

pub use client::{ApiClient, REFRESH_TOKEN_MISSING};
pub use types::{
    ApiResponse, Application, ApplicationStatus, ApplicationsResponse, ApproveApplicationResponse,
    AuthTokens, AutoClass, RejectApplicationResponse, User, UserRole,
};
