//! Dashboard Backend Client
//!
//! JSON requests against the dashboard's REST API. Every failure is
//! reported to the user through the notification center before it is
//! returned to the caller.

use reqwest::{header::CONTENT_TYPE, Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::error::{extract_error_message, RequestError, RequestResult};
use crate::config::ApiConfig;
use crate::notify::NotificationCenter;

/// Moves the user to another page, e.g. the login page after a 401
pub trait Navigator: Send + Sync {
    fn redirect(&self, location: &str);
}

/// Navigator for headless sessions; only records the redirect in the log
#[derive(Debug, Default)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn redirect(&self, location: &str) {
        tracing::warn!(location = %location, "Redirect requested");
    }
}

/// REST client for the dashboard backend
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    config: ApiConfig,
    notifications: NotificationCenter,
    navigator: Arc<dyn Navigator>,
}

impl ApiClient {
    pub fn new(
        config: ApiConfig,
        notifications: NotificationCenter,
        navigator: Arc<dyn Navigator>,
    ) -> RequestResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(RequestError::Client)?;

        Ok(Self {
            client,
            config,
            notifications,
            navigator,
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Absolute URL for an API path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> RequestResult<T> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post_json<T: DeserializeOwned>(&self, path: &str, body: &Value) -> RequestResult<T> {
        self.request(Method::POST, path, Some(body)).await
    }

    /// Send a JSON request and decode the JSON response
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> RequestResult<T> {
        match self.send(method.clone(), path, body).await {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::error!(method = %method, path = %path, error = %e, "API request failed");
                self.report(&e);
                Err(e)
            }
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> RequestResult<T> {
        let mut request = self
            .client
            .request(method, self.url(path))
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(RequestError::Network)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(RequestError::Network)?;

        if status == StatusCode::UNAUTHORIZED {
            return Err(RequestError::AuthExpired);
        }
        if !status.is_success() {
            let text = String::from_utf8_lossy(&bytes);
            return Err(RequestError::Status {
                status: status.as_u16(),
                message: extract_error_message(status, &text),
            });
        }

        Ok(serde_json::from_slice(&bytes)?)
    }

    fn report(&self, error: &RequestError) {
        match error {
            RequestError::Network(_) | RequestError::Client(_) => {
                self.notifications.error("Network connection failed, check your network");
            }
            RequestError::AuthExpired => {
                self.notifications.warning("Login expired, please sign in again");
                self.schedule_login_redirect();
            }
            other => {
                self.notifications.error(format!("Request failed: {}", other));
            }
        }
    }

    fn schedule_login_redirect(&self) {
        let navigator = self.navigator.clone();
        let location = self.config.login_path.clone();
        let deadline = tokio::time::Instant::now() + self.config.auth_redirect_delay();
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            navigator.redirect(&location);
        });
    }
}
