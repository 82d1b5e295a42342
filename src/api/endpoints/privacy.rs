//! Privacy settings explanation endpoint.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiResponse};
use crate::pipeline::explanation::{build_prompt, sanitize_markup, PrivacySettingsInput};

/// `POST /api/privacy/explanation`: plain-language explanation of the
/// submitted settings, limited to `<h3>`, `<span>` and `<br/>` markup.
pub async fn explain(
    State(ctx): State<ApiContext>,
    input: Result<Json<PrivacySettingsInput>, JsonRejection>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let Json(input) = input?;
    let settings = input.validate().map_err(|details| ApiError::ValidationFailed {
        message: "Missing required settings information.".into(),
        details,
    })?;

    let raw = ctx
        .text_generation
        .generate(build_prompt(&settings))
        .await
        .map_err(|e| ApiError::GenerationFailed(e.to_string()))?;

    let explanation = sanitize_markup(&raw);
    if explanation.is_empty() {
        return Err(ApiError::GenerationFailed("empty explanation".into()));
    }
    Ok(Json(ApiResponse::success(explanation)))
}
