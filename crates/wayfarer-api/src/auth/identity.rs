//! Client for the external users service that owns OAuth and sessions.

use super::models::User;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use wayfarer_core::AppError;

/// Who is calling, as far as the identity service is concerned.
///
/// The admin layer trusts its answers unconditionally.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL the browser is sent to for the Google sign-in flow.
    async fn oauth_redirect_url(&self) -> Result<String, AppError>;

    /// Exchanges an OAuth authorization code for a session token.
    async fn exchange_code(&self, code: &str) -> Result<String, AppError>;

    /// `None` when the token is unknown or expired.
    async fn current_user(&self, session_token: &str) -> Result<Option<User>, AppError>;

    async fn revoke_session(&self, session_token: &str) -> Result<(), AppError>;
}

#[derive(Deserialize)]
struct RedirectUrlBody {
    redirect_url: String,
}

#[derive(Deserialize)]
struct SessionBody {
    session_token: String,
}

/// [`IdentityProvider`] backed by the users service HTTP API.
#[derive(Clone, Debug)]
pub struct HttpIdentityProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpIdentityProvider {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header("x-api-key", self.api_key.as_str())
    }
}

fn upstream(err: reqwest::Error) -> AppError {
    AppError::Identity(err.to_string())
}

async fn failure(response: reqwest::Response) -> AppError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    AppError::Identity(format!("users service returned {}: {}", status, body))
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    #[tracing::instrument(skip(self))]
    async fn oauth_redirect_url(&self) -> Result<String, AppError> {
        let response = self
            .request(reqwest::Method::GET, "/oauth/google/redirect_url")
            .send()
            .await
            .map_err(upstream)?;
        if !response.status().is_success() {
            return Err(failure(response).await);
        }
        let body: RedirectUrlBody = response.json().await.map_err(upstream)?;
        Ok(body.redirect_url)
    }

    #[tracing::instrument(skip(self, code))]
    async fn exchange_code(&self, code: &str) -> Result<String, AppError> {
        let response = self
            .request(reqwest::Method::POST, "/sessions")
            .json(&serde_json::json!({ "code": code }))
            .send()
            .await
            .map_err(upstream)?;
        match response.status() {
            status if status.is_success() => {
                let body: SessionBody = response.json().await.map_err(upstream)?;
                Ok(body.session_token)
            }
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => Err(AppError::Unauthorized(
                "Authorization code was rejected".to_string(),
            )),
            _ => Err(failure(response).await),
        }
    }

    #[tracing::instrument(skip(self, session_token))]
    async fn current_user(&self, session_token: &str) -> Result<Option<User>, AppError> {
        let response = self
            .request(reqwest::Method::GET, "/users/me")
            .bearer_auth(session_token)
            .send()
            .await
            .map_err(upstream)?;
        match response.status() {
            status if status.is_success() => {
                Ok(Some(response.json::<User>().await.map_err(upstream)?))
            }
            StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND => Ok(None),
            _ => Err(failure(response).await),
        }
    }

    #[tracing::instrument(skip(self, session_token))]
    async fn revoke_session(&self, session_token: &str) -> Result<(), AppError> {
        let response = self
            .request(reqwest::Method::DELETE, "/sessions")
            .bearer_auth(session_token)
            .send()
            .await
            .map_err(upstream)?;
        if response.status().is_success() || response.status() == StatusCode::UNAUTHORIZED {
            Ok(())
        } else {
            Err(failure(response).await)
        }
    }
}
