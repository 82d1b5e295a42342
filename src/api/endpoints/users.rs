//! Account endpoints.
//!
//! - `POST /api/users/onboarding`: create an account
//! - `GET /api/users/:owner_id`: profile without credentials
//! - `PATCH /api/users/:owner_id/profile`: partial profile update

use std::str::FromStr;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiResponse};
use crate::credentials::hash_password;
use crate::models::enums::{Specialization, UserRole};
use crate::models::{FieldViolation, User};
use crate::pipeline::profile_patch::flatten_profile_update;

const MIN_EMAIL_LEN: usize = 6;
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OnboardingRequest {
    pub email_id: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(alias = "userType")]
    pub role: Option<String>,
    pub certificate_path: Option<String>,
    pub specialization: Option<String>,
    pub terms_accepted: bool,
}

/// Onboarding input after trimming and enum parsing. The password is still
/// plaintext here.
#[derive(Debug)]
struct NewAccount {
    email_id: String,
    password: String,
    first_name: String,
    last_name: String,
    role: Option<UserRole>,
    certificate_path: Option<String>,
    specialization: Option<Specialization>,
    terms_accepted: bool,
}

fn optional_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_optional<T: FromStr>(
    value: Option<String>,
    field: &str,
    allowed: &[&str],
    violations: &mut Vec<FieldViolation>,
) -> Option<T> {
    let raw = optional_text(value)?;
    match raw.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            violations.push(FieldViolation::new(
                field,
                format!("must be one of: {}", allowed.join(", ")),
            ));
            None
        }
    }
}

impl OnboardingRequest {
    fn validate(self) -> Result<NewAccount, Vec<FieldViolation>> {
        let mut violations = Vec::new();

        let email_id = self.email_id.trim().to_lowercase();
        if email_id.chars().count() < MIN_EMAIL_LEN {
            violations.push(FieldViolation::new(
                "emailId",
                format!("Email must be at least {MIN_EMAIL_LEN} characters"),
            ));
        }
        let password = self.password.trim().to_string();
        if password.chars().count() < MIN_PASSWORD_LEN {
            violations.push(FieldViolation::new(
                "password",
                format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
            ));
        }
        let first_name = self.first_name.trim().to_string();
        if first_name.is_empty() {
            violations.push(FieldViolation::new("firstName", "is required"));
        }
        let last_name = self.last_name.trim().to_string();
        if last_name.is_empty() {
            violations.push(FieldViolation::new("lastName", "is required"));
        }

        let role = parse_optional(self.role, "role", UserRole::values(), &mut violations);
        let specialization = parse_optional(
            self.specialization,
            "specialization",
            Specialization::values(),
            &mut violations,
        );

        if !violations.is_empty() {
            return Err(violations);
        }
        Ok(NewAccount {
            email_id,
            password,
            first_name,
            last_name,
            role,
            certificate_path: optional_text(self.certificate_path),
            specialization,
            terms_accepted: self.terms_accepted,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedUser {
    pub id: Uuid,
}

/// `POST /api/users/onboarding`
pub async fn onboarding(
    State(ctx): State<ApiContext>,
    payload: Result<Json<OnboardingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedUser>>), ApiError> {
    let Json(payload) = payload?;
    let account = payload.validate().map_err(ApiError::invalid_data)?;

    // PBKDF2 blocks for a noticeable time at production iteration counts.
    let password = account.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::Internal(format!("Password hashing task: {e}")))?;

    let mut user = User::new(account.first_name, account.last_name, account.email_id, password_hash);
    user.role = account.role;
    user.specialization = account.specialization;
    user.terms_accepted = account.terms_accepted;
    if let Some(path) = account.certificate_path {
        user.certificate_path = path;
    }

    ctx.store.insert_user(&user)?;
    tracing::info!(user_id = %user.id, "User created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "User created successfully",
            CreatedUser { id: user.id },
        )),
    ))
}

fn parse_user_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::bad_request("Invalid user id"))
}

/// `GET /api/users/:owner_id`
pub async fn profile(
    State(ctx): State<ApiContext>,
    Path(owner_id): Path<String>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let id = parse_user_id(&owner_id)?;
    let user = ctx
        .store
        .find_user(&id)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(Json(ApiResponse::success(user.public_view()?)))
}

/// `PATCH /api/users/:owner_id/profile`: only recognised roots are applied;
/// credentials and identity fields are never touched.
pub async fn update_profile(
    State(ctx): State<ApiContext>,
    Path(owner_id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let Json(payload) = payload?;
    let id = parse_user_id(&owner_id)?;
    let patch = flatten_profile_update(&payload)?;
    let updated = ctx.store.update_user_fields(&id, &patch)?;

    tracing::info!(
        user_id = %id,
        fields = patch.len(),
        "Profile updated"
    );
    Ok(Json(ApiResponse::with_message(
        "Profile updated successfully",
        updated.public_view()?,
    )))
}
