//! Request dispatcher
//!
//! The single funnel for calls to the platform API. The credential is read
//! from the session store while each request is built, so a login, logout or
//! teardown applies to the very next request. A 401 on an authenticated call
//! tears the session down (once per session) and sends the route guard to the
//! login page before the caller sees the error.

use std::sync::Arc;
use std::time::Duration;

use platform_models::ErrorResponse;
use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};
use url::Url;

use crate::errors::ConsoleError;
use crate::guard::route::RouteGuard;
use crate::session::store::SessionStore;
use crate::utils::request_id;

/// Path prefix of every platform endpoint
pub const API_PREFIX: &str = "/api/v1";

/// How a request authenticates
#[derive(Debug, Clone, Copy)]
enum Auth<'a> {
    /// Current session credential
    Session,
    /// An explicit token, used between login and establishing the session
    Token(&'a str),
    /// No credential (registration, login)
    Public,
}

enum Body {
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
}

/// HTTP dispatcher for platform communication
pub struct Dispatcher {
    client: Client,
    base_url: String,
    session: Arc<SessionStore>,
    guard: Arc<RouteGuard>,
}

impl Dispatcher {
    /// Create a dispatcher for the platform at `base_url`.
    ///
    /// `/api/v1` is appended unless already present. Requests never time out
    /// unless `timeout` is given.
    pub fn new(
        base_url: &str,
        session: Arc<SessionStore>,
        guard: Arc<RouteGuard>,
        timeout: Option<Duration>,
    ) -> Result<Self, ConsoleError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| ConsoleError::ConfigError(format!("Invalid base URL {}: {}", base_url, e)))?;

        let mut base_url = parsed.as_str().trim_end_matches('/').to_string();
        if !base_url.ends_with(API_PREFIX) {
            base_url.push_str(API_PREFIX);
        }

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ConsoleError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            session,
            guard,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Authenticated GET returning the body verbatim
    pub async fn get_value(&self, path: &str, query: &[(String, String)]) -> Result<Value, ConsoleError> {
        self.send(Method::GET, path, query, Auth::Session, Body::Empty)
            .await
    }

    /// Authenticated GET shaped into `T`
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T, ConsoleError> {
        let body = self.get_value(path, query).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// GET with an explicit bearer token instead of the session's
    pub async fn get_with_token<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
    ) -> Result<T, ConsoleError> {
        let body = self
            .send(Method::GET, path, &[], Auth::Token(token), Body::Empty)
            .await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Authenticated POST with a JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ConsoleError> {
        let body = Body::Json(serde_json::to_value(body)?);
        let response = self.send(Method::POST, path, &[], Auth::Session, body).await?;
        Ok(serde_json::from_value(response)?)
    }

    /// Authenticated POST without a body (entity actions)
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ConsoleError> {
        let response = self
            .send(Method::POST, path, &[], Auth::Session, Body::Empty)
            .await?;
        Ok(serde_json::from_value(response)?)
    }

    /// Authenticated PUT with a JSON body
    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ConsoleError> {
        let body = Body::Json(serde_json::to_value(body)?);
        let response = self.send(Method::PUT, path, &[], Auth::Session, body).await?;
        Ok(serde_json::from_value(response)?)
    }

    /// Authenticated DELETE; the platform answers with an empty body
    pub async fn delete(&self, path: &str) -> Result<Value, ConsoleError> {
        self.send(Method::DELETE, path, &[], Auth::Session, Body::Empty)
            .await
    }

    /// Unauthenticated POST with a JSON body
    pub async fn post_public<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ConsoleError> {
        let body = Body::Json(serde_json::to_value(body)?);
        let response = self.send(Method::POST, path, &[], Auth::Public, body).await?;
        Ok(serde_json::from_value(response)?)
    }

    /// Unauthenticated POST with a form-encoded body
    pub async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<T, ConsoleError> {
        let form = form
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let response = self
            .send(Method::POST, path, &[], Auth::Public, Body::Form(form))
            .await?;
        Ok(serde_json::from_value(response)?)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        auth: Auth<'_>,
        body: Body,
    ) -> Result<Value, ConsoleError> {
        let url = format!("{}{}", self.base_url, path);
        let id = request_id();
        debug!("{} {} ({})", method, url, id);

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header("X-Request-ID", &id);

        if !query.is_empty() {
            request = request.query(query);
        }

        // Generation of the session whose credential this request carries
        let mut generation = None;
        match auth {
            Auth::Session => {
                if !self.session.is_hydrated() {
                    return Err(ConsoleError::Internal(
                        "Session store must be hydrated before authenticated requests".to_string(),
                    ));
                }
                if let Some(session) = self.session.current() {
                    request = request.bearer_auth(session.credential.expose());
                    generation = Some(session.generation);
                }
            }
            Auth::Token(token) => {
                request = request.bearer_auth(token);
            }
            Auth::Public => {}
        }

        request = match body {
            Body::Empty => request,
            Body::Json(value) => request.json(&value),
            Body::Form(form) => request.form(&form),
        };

        let response = request.send().await.map_err(|e| {
            error!("{} {} failed: {}", method, url, e);
            ConsoleError::from(e)
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED && matches!(auth, Auth::Session) {
            warn!("{} {} returned 401, tearing down session", method, url);
            self.teardown(generation).await;
            return Err(ConsoleError::Authorization);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("HTTP {} {} failed: {} - {}", method, url, status, body);
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|body| body.message());
            return Err(classify(status, detail, path));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn teardown(&self, generation: Option<u64>) {
        let cleared = match generation {
            Some(generation) => match self.session.clear_if(generation).await {
                Ok(cleared) => cleared,
                Err(e) => {
                    // The in-memory session is already gone at this point
                    error!("Failed to remove persisted session: {}", e);
                    true
                }
            },
            None => false,
        };

        if cleared || !self.session.is_authenticated() {
            self.guard.force_unauthenticated();
        }
    }
}

/// Map a failed status to the error taxonomy
fn classify(status: StatusCode, detail: Option<String>, path: &str) -> ConsoleError {
    if status == StatusCode::NOT_FOUND {
        return ConsoleError::NotFound(detail.unwrap_or_else(|| path.to_string()));
    }

    if status.is_client_error() {
        return ConsoleError::Validation {
            status: status.as_u16(),
            detail: detail.unwrap_or_else(|| format!("Request failed ({})", status)),
        };
    }

    ConsoleError::NetworkOrServer(match detail {
        Some(detail) => format!("{}: {}", status, detail),
        None => status.to_string(),
    })
}
