//! Wire types for the verification back-office API.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Result of an [`ApiClient`](super::ApiClient) call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Builds a response that never reached the network.
    pub fn local_error(status_code: u16, error: impl Into<String>) -> Self {
        Self {
            status_code,
            data: None,
            error: Some(error.into()),
        }
    }

    /// 2xx or 3xx with no error.
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status_code) && self.error.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendSmsRequest {
    pub phone_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifySmsRequest {
    pub phone_number: String,
    pub sms_code: String,
}

/// Token pair issued by `verify_sms` and `refresh_token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: String,
}

/// Account role as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Financier,
    Mvd,
    Admin,
    Rejected,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Financier => "financier",
            UserRole::Mvd => "mvd",
            UserRole::Admin => "admin",
            UserRole::Rejected => "rejected",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(UserRole::User),
            "financier" => Ok(UserRole::Financier),
            "mvd" => Ok(UserRole::Mvd),
            "admin" => Ok(UserRole::Admin),
            "rejected" => Ok(UserRole::Rejected),
            _ => Err(format!("Invalid user role: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriversLicense {
    pub url: Option<String>,
    pub expiry: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdCard {
    pub front_url: Option<String>,
    pub back_url: Option<String>,
    pub expiry: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserDocuments {
    pub documents_verified: bool,
    pub selfie_with_license_url: Option<String>,
    pub selfie_url: Option<String>,
    pub drivers_license: DriversLicense,
    pub id_card: IdCard,
}

/// The signed-in account (`GET /auth/user/me`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub phone_number: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub role: UserRole,
    #[serde(default)]
    pub wallet_balance: f64,
    #[serde(default)]
    pub current_rental: Option<serde_json::Value>,
    #[serde(default)]
    pub owned_cars: Vec<serde_json::Value>,
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub unread_message: u32,
    #[serde(default)]
    pub documents: UserDocuments,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationDocuments {
    pub id_card_front_url: Option<String>,
    pub id_card_back_url: Option<String>,
    pub drivers_license_url: Option<String>,
    pub selfie_url: Option<String>,
    pub selfie_with_license_url: Option<String>,
}

/// A document-verification application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub application_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub iin: Option<String>,
    #[serde(default)]
    pub passport_number: Option<String>,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub id_card_expiry: Option<String>,
    #[serde(default)]
    pub drivers_license_expiry: Option<String>,
    #[serde(default)]
    pub documents: ApplicationDocuments,
    #[serde(default)]
    pub auto_class: Option<Vec<String>>,
    #[serde(default)]
    pub approved_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mvd_rejected_at: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub financier_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mvd_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationsResponse {
    #[serde(default)]
    pub applications: Vec<Application>,
}

/// Outcome of an approve call. `auto_class` is only sent back by the
/// financier endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApproveApplicationResponse {
    pub message: String,
    pub application_id: i64,
    pub user_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_class: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectApplicationResponse {
    pub message: String,
    pub application_id: i64,
    pub user_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Which list of applications to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ApplicationStatus::Pending),
            "approved" => Ok(ApplicationStatus::Approved),
            "rejected" => Ok(ApplicationStatus::Rejected),
            _ => Err(format!(
                "Invalid application status: {}. Valid values: pending, approved, rejected",
                s
            )),
        }
    }
}

/// Vehicle class a financier can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutoClass {
    A,
    AB,
    ABC,
}

impl AutoClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AutoClass::A => "A",
            AutoClass::AB => "AB",
            AutoClass::ABC => "ABC",
        }
    }
}

impl fmt::Display for AutoClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AutoClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "A" => Ok(AutoClass::A),
            "AB" => Ok(AutoClass::AB),
            "ABC" => Ok(AutoClass::ABC),
            _ => Err(format!("Invalid auto class: {}. Valid values: A, AB, ABC", s)),
        }
    }
}
