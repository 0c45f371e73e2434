use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::client::{AccessToken, RemoteRequest, SupabaseClient, AUTH_PREFIX};
use super::error::{DataError, DataResult};

/// Tokens issued by the auth endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub user: AuthUserRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUserRecord {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Result of a sign-up. When the project requires email confirmation the
/// auth service creates the user but issues no tokens.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignUpOutcome {
    Session(Session),
    PendingConfirmation(AuthUserRecord),
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl SupabaseClient {
    pub async fn sign_up(&self, email: &str, password: &str) -> DataResult<SignUpOutcome> {
        self.auth_request(
            RemoteRequest::new(Method::POST, format!("{}/signup", AUTH_PREFIX))
                .json_body(json!({ "email": email, "password": password })),
        )
        .await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> DataResult<Session> {
        self.auth_request(
            RemoteRequest::new(Method::POST, format!("{}/token", AUTH_PREFIX))
                .param("grant_type", "password")
                .json_body(json!({ "email": email, "password": password })),
        )
        .await
    }

    pub async fn refresh(&self, refresh_token: &str) -> DataResult<Session> {
        if refresh_token.trim().is_empty() {
            return Err(DataError::invalid("refresh token must not be empty"));
        }
        self.auth_request(
            RemoteRequest::new(Method::POST, format!("{}/token", AUTH_PREFIX))
                .param("grant_type", "refresh_token")
                .json_body(json!({ "refresh_token": refresh_token })),
        )
        .await
    }

    /// Revokes the session behind `token`.
    ///
    /// Advisory: the outcome is logged and otherwise discarded, so a failed
    /// revocation never fails the caller. The token stays valid until it
    /// expires if the auth service could not be reached.
    pub async fn sign_out(&self, token: &AccessToken) {
        if token.is_empty() {
            return;
        }
        let request = RemoteRequest::new(Method::POST, format!("{}/logout", AUTH_PREFIX));
        match self.execute(request, Some(token)).await {
            Ok(_) => tracing::debug!("Session revoked"),
            Err(e) => tracing::warn!(error = %e, "Sign-out failed; ignoring"),
        }
    }

    async fn auth_request<T: DeserializeOwned>(&self, request: RemoteRequest) -> DataResult<T> {
        if let Some(body) = &request.body {
            let blank = ["email", "password"]
                .into_iter()
                .any(|k| body.get(k).and_then(|v| v.as_str()).is_some_and(|s| s.trim().is_empty()));
            if blank {
                return Err(DataError::invalid("email and password are required"));
            }
        }
        self.execute(request, None).await?.json()
    }
}
