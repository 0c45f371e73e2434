//! Session endpoints. These proxy the auth service; no local state is kept.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{
        AuthResponse, LoginRequest, MessageResponse, PendingConfirmationResponse, RefreshRequest,
        RegisterRequest, UserResponse,
    },
    supabase::{AccessToken, DataError, SignUpOutcome},
    utils::ValidatedJson,
    AppState,
};

/// Maps an auth-endpoint rejection to a generic 401, keeping the remote
/// message for logs only.
fn auth_failure(err: DataError, public: &'static str) -> AppError {
    match err {
        DataError::Remote { status, message } if status < 500 => {
            tracing::info!(status, reason = %message, "Auth service rejected credentials");
            AppError::Unauthorized(anyhow::anyhow!(public))
        }
        other => other.into(),
    }
}

/// POST /auth/register
///
/// 201 either way; the body carries tokens only when the account is usable
/// right away.
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> Result<Response, AppError> {
    tracing::info!(email = %payload.email, "Registering user");

    let outcome = state
        .client
        .sign_up(&payload.email, &payload.password)
        .await
        .map_err(|e| auth_failure(e, "Registration was rejected"))?;

    let response = match outcome {
        SignUpOutcome::Session(session) => {
            (StatusCode::CREATED, Json(AuthResponse::from(session))).into_response()
        }
        SignUpOutcome::PendingConfirmation(user) => {
            tracing::info!(user_id = %user.id, "Registration pending email confirmation");
            (
                StatusCode::CREATED,
                Json(PendingConfirmationResponse {
                    message: "Check your email to confirm your account".to_string(),
                    user: UserResponse::from(user),
                }),
            )
                .into_response()
        }
    };

    Ok(response)
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let session = state
        .client
        .sign_in(&payload.email, &payload.password)
        .await
        .map_err(|e| auth_failure(e, "Invalid email or password"))?;

    tracing::info!(user_id = %session.user.id, "User logged in");

    Ok(Json(AuthResponse::from(session)))
}

/// POST /auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RefreshRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let session = state
        .client
        .refresh(&payload.refresh_token)
        .await
        .map_err(|e| auth_failure(e, "Invalid or expired refresh token"))?;

    Ok(Json(AuthResponse::from(session)))
}

/// POST /auth/logout
///
/// Always answers 200 once a bearer token is presented; revocation is
/// best effort.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, AppError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Authorization header is required")))?;

    state.client.sign_out(&AccessToken::new(token)).await;

    Ok(Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    }))
}
