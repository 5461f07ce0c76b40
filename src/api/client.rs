//! Back-office API client.
//!
//! Maps each domain operation onto a call through the shared [`HttpClient`].
//! Tokens are held in memory only.

use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};
use url::form_urlencoded;

use super::types::{
    ApiResponse, ApplicationStatus, ApplicationsResponse, ApproveApplicationResponse, AuthTokens,
    AutoClass, RejectApplicationResponse, SendSmsRequest, User, UserRole, VerifySmsRequest,
};
use crate::client::{HttpClient, RequestMethod, Response};

/// Error text returned by `refresh_token` when no refresh token is stored.
pub const REFRESH_TOKEN_MISSING: &str = "Refresh token not found";

#[derive(Debug, Default)]
struct TokenStore {
    access: Option<String>,
    refresh: Option<String>,
    role: Option<UserRole>,
}

/// Client for the verification back-office endpoints.
#[derive(Debug)]
pub struct ApiClient {
    http: Arc<HttpClient>,
    tokens: Mutex<TokenStore>,
}

impl ApiClient {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self {
            http,
            tokens: Mutex::new(TokenStore::default()),
        }
    }

    /// The underlying request engine.
    pub fn http(&self) -> &Arc<HttpClient> {
        &self.http
    }

    fn tokens(&self) -> MutexGuard<'_, TokenStore> {
        self.tokens.lock().unwrap_or_else(|e| e.into_inner())
    }

    // Auth

    /// Requests a one-time code for `phone_number`.
    pub async fn send_sms(&self, phone_number: &str) -> ApiResponse<serde_json::Value> {
        let request = SendSmsRequest {
            phone_number: phone_number.to_string(),
        };
        info!(phone = %mask_phone(phone_number), "Requesting SMS code");
        into_api_response(self.http.post("/auth/send_sms/", Some(&request)).await)
    }

    /// Exchanges a one-time code for tokens and signs the client in.
    pub async fn verify_sms(&self, phone_number: &str, sms_code: &str) -> ApiResponse<AuthTokens> {
        let request = VerifySmsRequest {
            phone_number: phone_number.to_string(),
            sms_code: sms_code.to_string(),
        };
        let response: ApiResponse<AuthTokens> =
            into_api_response(self.http.post("/auth/verify_sms/", Some(&request)).await);

        if let Some(tokens) = &response.data {
            self.store_tokens(tokens);
            info!(phone = %mask_phone(phone_number), "Signed in");
        }
        response
    }

    pub async fn current_user(&self) -> ApiResponse<User> {
        let response: ApiResponse<User> = into_api_response(self.http.get("/auth/user/me").await);
        if let Some(user) = &response.data {
            self.tokens().role = Some(user.role);
        }
        response
    }

    /// Trades the stored refresh token for a new token pair.
    pub async fn refresh_token(&self) -> ApiResponse<AuthTokens> {
        let Some(refresh) = self.tokens().refresh.clone() else {
            warn!("Token refresh requested without a refresh token");
            return ApiResponse::local_error(401, REFRESH_TOKEN_MISSING);
        };

        let mut headers = HashMap::new();
        headers.insert("Authorization".to_string(), format!("Bearer {}", refresh));

        let response: ApiResponse<AuthTokens> = into_api_response(
            self.http
                .execute(RequestMethod::Post, "/auth/refresh_token/", None, Some(&headers))
                .await,
        );

        if let Some(tokens) = &response.data {
            self.store_tokens(tokens);
            debug!("Access token refreshed");
        }
        response
    }

    // Financier

    pub async fn financier_applications(
        &self,
        status: ApplicationStatus,
        search: Option<&str>,
    ) -> ApiResponse<ApplicationsResponse> {
        let path = list_path("financier", status, search);
        into_api_response(self.http.get(&path).await)
    }

    pub async fn approve_financier_application(
        &self,
        application_id: i64,
        auto_class: AutoClass,
    ) -> ApiResponse<ApproveApplicationResponse> {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("auto_class", auto_class.as_str())
            .finish();
        let path = format!("/financier/approve/{}?{}", application_id, query);

        info!(application_id, auto_class = %auto_class, "Approving financier application");
        into_api_response(self.http.post::<()>(&path, None).await)
    }

    pub async fn reject_financier_application(
        &self,
        application_id: i64,
    ) -> ApiResponse<RejectApplicationResponse> {
        info!(application_id, "Rejecting financier application");
        let path = format!("/financier/reject/{}", application_id);
        into_api_response(self.http.post::<()>(&path, None).await)
    }

    // MVD

    pub async fn mvd_applications(
        &self,
        status: ApplicationStatus,
        search: Option<&str>,
    ) -> ApiResponse<ApplicationsResponse> {
        let path = list_path("mvd", status, search);
        into_api_response(self.http.get(&path).await)
    }

    pub async fn approve_mvd_application(
        &self,
        application_id: i64,
    ) -> ApiResponse<ApproveApplicationResponse> {
        info!(application_id, "Approving MVD application");
        let path = format!("/mvd/approve/{}", application_id);
        into_api_response(self.http.post::<()>(&path, None).await)
    }

    pub async fn reject_mvd_application(
        &self,
        application_id: i64,
    ) -> ApiResponse<RejectApplicationResponse> {
        info!(application_id, "Rejecting MVD application");
        let path = format!("/mvd/reject/{}", application_id);
        into_api_response(self.http.post::<()>(&path, None).await)
    }

    // Session

    /// Installs a token pair obtained elsewhere.
    pub fn set_tokens(
        &self,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        role: Option<UserRole>,
    ) {
        let access_token = access_token.into();
        self.http.set_token(access_token.clone());

        let mut tokens = self.tokens();
        tokens.access = Some(access_token);
        tokens.refresh = Some(refresh_token.into());
        if role.is_some() {
            tokens.role = role;
        }
    }

    pub fn user_role(&self) -> Option<UserRole> {
        self.tokens().role
    }

    /// Forgets every token and the cached role.
    pub fn logout(&self) {
        *self.tokens() = TokenStore::default();
        self.http.clear_token();
        info!("Signed out");
    }

    pub fn is_authenticated(&self) -> bool {
        self.tokens().access.is_some()
    }

    fn store_tokens(&self, tokens: &AuthTokens) {
        self.http.set_token(tokens.access_token.clone());

        let mut store = self.tokens();
        store.access = Some(tokens.access_token.clone());
        store.refresh = Some(tokens.refresh_token.clone());
    }
}

/// `/{role}/{status}`, with `?search=` appended when a non-empty search is
/// given.
fn list_path(role: &str, status: ApplicationStatus, search: Option<&str>) -> String {
    match search.filter(|s| !s.is_empty()) {
        Some(search) => {
            let query = form_urlencoded::Serializer::new(String::new())
                .append_pair("search", search)
                .finish();
            format!("/{}/{}?{}", role, status, query)
        }
        None => format!("/{}/{}", role, status),
    }
}

/// Keeps the last four digits.
fn mask_phone(phone: &str) -> String {
    let digits = phone.chars().count();
    if digits <= 4 {
        return "*".repeat(digits);
    }
    let visible: String = phone.chars().skip(digits - 4).collect();
    format!("{}{}", "*".repeat(digits - 4), visible)
}

/// Converts an engine response, decoding the body into `T`.
///
/// A body that does not decode keeps the status code. The engine's own error
/// message wins over the decode error.
fn into_api_response<T: DeserializeOwned>(response: Response) -> ApiResponse<T> {
    let status_code = response.status_code;

    match response.json::<T>() {
        Some(Ok(data)) => ApiResponse {
            status_code,
            data: Some(data),
            error: response.error,
        },
        Some(Err(e)) => {
            let error = response.error.unwrap_or_else(|| {
                warn!(status_code, error = %e, "Failed to decode response body");
                format!("Failed to decode response: {}", e)
            });
            ApiResponse {
                status_code,
                data: None,
                error: Some(error),
            }
        }
        None => ApiResponse {
            status_code,
            data: None,
            error: response.error,
        },
    }
}
