//! Rate-limit aware REST client for the platform API.

use std::time::Duration;

use async_trait::async_trait;
use corvid_proto::{
    ApplicationCommand, Interaction, InteractionResponse, ProtoError, RegisteredCommand,
    ResponseData,
};
use reqwest::Method;
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{BotError, Result};

/// Default cap on attempts for a single request, rate-limit retries included.
const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Fallback wait when a rate-limit response carries no usable `retry_after`.
const DEFAULT_RETRY_AFTER_SECS: f64 = 1.0;

/// Response from an API request.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Decoded response body. JSON bodies decode to their value, anything
    /// else is carried as a string.
    pub body: Value,
}

impl ApiResponse {
    /// Check if the status code is in the 2xx range.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Convert a non-2xx response into an [`BotError::Api`].
    pub fn require_success(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(BotError::Api {
                status: self.status,
                body: self.body.to_string(),
            })
        }
    }
}

/// Anything that can deliver an interaction response back to the platform.
///
/// The dispatcher only needs this one operation, so tests can swap in a
/// recording stub instead of a live client.
#[async_trait]
pub trait ResponseSender: Send + Sync {
    /// Deliver `response` for the given interaction.
    async fn send_response(
        &self,
        interaction: &Interaction,
        response: &InteractionResponse,
    ) -> Result<()>;
}

/// HTTP client for the platform REST API.
///
/// Every request is retried on 429 responses, honoring the server's
/// `retry_after`, up to a fixed attempt budget.
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    application_id: String,
    max_attempts: u32,
}

impl RestClient {
    /// Create a new client for the given API base URL and credentials.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        application_id: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            http: reqwest::Client::new(),
            base_url,
            token: token.into(),
            application_id: application_id.into(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Override the per-request attempt budget.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Application id this client acts for.
    #[must_use]
    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    /// Execute a request against the API, retrying on rate limits.
    ///
    /// Non-429 responses are returned as-is; callers decide how to treat
    /// other error statuses. Only when every attempt was rate limited does
    /// this return [`BotError::RateLimited`].
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<ApiResponse> {
        let url = format!("{}{}", self.base_url, path);

        for attempt in 1..=self.max_attempts {
            debug!(%method, path, attempt, "api request");

            let mut request = self
                .http
                .request(method.clone(), &url)
                .header("Authorization", format!("Bot {}", self.token));
            if let Some(json) = body {
                request = request.json(json);
            }

            let response = request.send().await?;
            let status = response.status().as_u16();

            if status == 429 {
                let retry_after = Self::retry_after(response).await;
                warn!(
                    %method,
                    path,
                    attempt,
                    retry_after_secs = retry_after,
                    "rate limited, backing off"
                );
                sleep(Duration::from_secs_f64(retry_after)).await;
                continue;
            }

            let body = Self::decode_body(response).await?;
            return Ok(ApiResponse { status, body });
        }

        Err(BotError::RateLimited {
            attempts: self.max_attempts,
            method: method.to_string(),
            path: path.to_string(),
        })
    }

    /// Seconds to wait before retrying, from the rate-limit body.
    async fn retry_after(response: reqwest::Response) -> f64 {
        let body: Value = response.json().await.unwrap_or(Value::Null);
        body.get("retry_after")
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
    }

    /// Decode the response body by content type.
    async fn decode_body(response: reqwest::Response) -> Result<Value> {
        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("application/json"));

        if is_json {
            Ok(response.json().await?)
        } else {
            Ok(Value::String(response.text().await?))
        }
    }

    // ===== Command endpoints =====

    /// Fetch all global commands registered for the application.
    pub async fn get_global_commands(&self) -> Result<Vec<RegisteredCommand>> {
        let path = format!("/applications/{}/commands", self.application_id);
        let response = self.execute(Method::GET, &path, None).await?.require_success()?;

        Ok(serde_json::from_value(response.body)
            .map_err(|e| ProtoError::Decoding(e.to_string()))?)
    }

    /// Create or update a global command. The platform upserts by name.
    pub async fn create_global_command(
        &self,
        command: &ApplicationCommand,
    ) -> Result<RegisteredCommand> {
        let path = format!("/applications/{}/commands", self.application_id);
        let body =
            serde_json::to_value(command).map_err(|e| ProtoError::Encoding(e.to_string()))?;
        let response = self
            .execute(Method::POST, &path, Some(&body))
            .await?
            .require_success()?;

        Ok(serde_json::from_value(response.body)
            .map_err(|e| ProtoError::Decoding(e.to_string()))?)
    }

    /// Delete a global command by id.
    pub async fn delete_global_command(&self, command_id: &str) -> Result<()> {
        let path = format!(
            "/applications/{}/commands/{}",
            self.application_id, command_id
        );
        self.execute(Method::DELETE, &path, None)
            .await?
            .require_success()?;

        Ok(())
    }

    // ===== Interaction endpoints =====

    /// Post the callback response for an interaction.
    pub async fn create_interaction_response(
        &self,
        interaction: &Interaction,
        response: &InteractionResponse,
    ) -> Result<()> {
        let path = format!(
            "/interactions/{}/{}/callback",
            interaction.id, interaction.token
        );
        let body =
            serde_json::to_value(response).map_err(|e| ProtoError::Encoding(e.to_string()))?;
        self.execute(Method::POST, &path, Some(&body))
            .await?
            .require_success()?;

        Ok(())
    }

    /// Edit the original response after a deferred acknowledgement.
    pub async fn edit_original_response(
        &self,
        interaction_token: &str,
        data: &ResponseData,
    ) -> Result<Value> {
        let path = format!(
            "/webhooks/{}/{}/messages/@original",
            self.application_id, interaction_token
        );
        let body = serde_json::to_value(data).map_err(|e| ProtoError::Encoding(e.to_string()))?;
        let response = self
            .execute(Method::PATCH, &path, Some(&body))
            .await?
            .require_success()?;

        Ok(response.body)
    }

    /// Send a followup message on an interaction token.
    pub async fn create_followup(
        &self,
        interaction_token: &str,
        data: &ResponseData,
    ) -> Result<Value> {
        let path = format!("/webhooks/{}/{}", self.application_id, interaction_token);
        let body = serde_json::to_value(data).map_err(|e| ProtoError::Encoding(e.to_string()))?;
        let response = self
            .execute(Method::POST, &path, Some(&body))
            .await?
            .require_success()?;

        Ok(response.body)
    }
}

#[async_trait]
impl ResponseSender for RestClient {
    async fn send_response(
        &self,
        interaction: &Interaction,
        response: &InteractionResponse,
    ) -> Result<()> {
        self.create_interaction_response(interaction, response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(200, true; "ok")]
    #[test_case(204, true; "no content")]
    #[test_case(299, true; "upper bound")]
    #[test_case(199, false; "below range")]
    #[test_case(404, false; "not found")]
    #[test_case(500, false; "server error")]
    fn test_is_success(status: u16, expected: bool) {
        let response = ApiResponse {
            status,
            body: Value::Null,
        };

        assert_eq!(response.is_success(), expected);
    }

    #[test]
    fn test_require_success_passes_through() {
        let response = ApiResponse {
            status: 200,
            body: serde_json::json!({"id": "1"}),
        };

        let result = response.require_success();
        assert!(result.is_ok());
    }

    #[test]
    fn test_require_success_maps_error_status() {
        let response = ApiResponse {
            status: 403,
            body: serde_json::json!({"message": "Missing Access"}),
        };

        let err = response.require_success().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("403"), "unexpected message: {msg}");
        assert!(msg.contains("Missing Access"), "unexpected message: {msg}");
    }

    #[test]
    fn test_client_builder() {
        let client = RestClient::new("https://api.example.test/", "token", "app-1")
            .with_max_attempts(3);

        assert_eq!(client.max_attempts, 3);
        assert_eq!(client.application_id(), "app-1");
        // Trailing slash trimmed so path joins stay clean.
        assert_eq!(client.base_url, "https://api.example.test");
    }
}
