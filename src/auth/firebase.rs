//! Password sign-in against the identity provider's REST API

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, AuthFailure};

const IDENTITY_BASE: &str = "https://identitytoolkit.googleapis.com/v1";

/// Who the identity provider says signed in.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IdentityUser {
    pub email: String,
    pub display_name: Option<String>,
    pub id_token: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<IdentityUser, ApiError>;

    /// Create an account and set its display name.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<IdentityUser, ApiError>;
}

pub struct FirebaseIdentity {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileUpdate<'a> {
    id_token: &'a str,
    display_name: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    id_token: String,
    email: String,
    #[serde(default)]
    display_name: Option<String>,
}

impl FirebaseIdentity {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, IDENTITY_BASE)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    async fn call<B: Serialize + Sync>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<TokenResponse, ApiError> {
        let url = format!("{}/accounts:{}", self.base_url, method);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            let code = error_code(&text);
            tracing::warn!(method, status = status.as_u16(), code, "identity call failed");
            return Err(AuthFailure::from_code(code).into());
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<IdentityUser, ApiError> {
        let token = self
            .call(
                "signInWithPassword",
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;
        Ok(IdentityUser {
            email: token.email,
            display_name: token.display_name.filter(|n| !n.is_empty()),
            id_token: token.id_token,
        })
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<IdentityUser, ApiError> {
        let created = self
            .call(
                "signUp",
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;
        let updated = self
            .call(
                "update",
                &ProfileUpdate {
                    id_token: &created.id_token,
                    display_name,
                    return_secure_token: true,
                },
            )
            .await?;
        Ok(IdentityUser {
            email: created.email,
            display_name: Some(display_name.to_string()),
            id_token: if updated.id_token.is_empty() {
                created.id_token
            } else {
                updated.id_token
            },
        })
    }
}

/// Map the REST error message to the provider's client-side error code.
fn error_code(body: &str) -> &'static str {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_default();

    // Messages may carry a suffix, e.g. "TOO_MANY_ATTEMPTS_TRY_LATER : ..."
    match message.split(':').next().map(str::trim).unwrap_or_default() {
        "INVALID_LOGIN_CREDENTIALS" => "auth/invalid-credential",
        "EMAIL_NOT_FOUND" => "auth/user-not-found",
        "INVALID_PASSWORD" => "auth/wrong-password",
        "EMAIL_EXISTS" => "auth/email-already-in-use",
        "WEAK_PASSWORD" => "auth/weak-password",
        _ => "auth/internal-error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(message: &str) -> String {
        format!(r#"{{"error": {{"code": 400, "message": "{}"}}}}"#, message)
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(error_code(&body("INVALID_LOGIN_CREDENTIALS")), "auth/invalid-credential");
        assert_eq!(error_code(&body("EMAIL_NOT_FOUND")), "auth/user-not-found");
        assert_eq!(error_code(&body("INVALID_PASSWORD")), "auth/wrong-password");
        assert_eq!(
            error_code(&body("WEAK_PASSWORD : Password should be at least 6 characters")),
            "auth/weak-password"
        );
        assert_eq!(error_code("<html>"), "auth/internal-error");
    }

    #[test]
    fn test_codes_map_to_messages() {
        let failure = AuthFailure::from_code(error_code(&body("EMAIL_NOT_FOUND")));
        assert_eq!(
            failure.message(),
            "Invalid email or password. Are you sure you've registered?"
        );
        let failure = AuthFailure::from_code(error_code(&body("INVALID_PASSWORD")));
        assert_eq!(failure.message(), "The password you entered is incorrect.");
    }
}
