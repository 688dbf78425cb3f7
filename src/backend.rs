use crate::timetable::{Category, ClassSession, Weekday};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend unreachable: {0}")]
    Unreachable(String),
    /// Non-2xx answer. `message` is what the backend said, shown verbatim.
    #[error("{message}")]
    Rejected {
        status: u16,
        message: String,
        conflict: Option<Value>,
    },
    #[error("unexpected backend response: {0}")]
    Decode(String),
}

impl BackendError {
    pub fn code(&self) -> &'static str {
        match self {
            BackendError::Unreachable(_) => "backend_unavailable",
            BackendError::Rejected { .. } => "server_rejected",
            BackendError::Decode(_) => "backend_decode_failed",
        }
    }

    pub fn details(&self) -> Option<Value> {
        match self {
            BackendError::Rejected {
                status, conflict, ..
            } => Some(json!({
                "status": status,
                "conflictingSession": conflict,
            })),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ListFilter {
    pub category: Option<Category>,
    pub day: Option<Weekday>,
}

impl ListFilter {
    pub fn personal_on(day: Weekday) -> Self {
        Self {
            category: Some(Category::Personal),
            day: Some(day),
        }
    }

    fn query(&self) -> Vec<(&'static str, &'static str)> {
        let mut q = Vec::new();
        if let Some(c) = self.category {
            q.push(("category", c.as_str()));
        }
        if let Some(d) = self.day {
            q.push(("day", d.as_str()));
        }
        q
    }

    /// Cache key for the local copy of this listing.
    pub fn scope(&self) -> String {
        format!(
            "{}/{}",
            self.category.map(Category::as_str).unwrap_or("*"),
            self.day.map(Weekday::as_str).unwrap_or("*")
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// The external timetable service. Every method is one HTTP round trip.
pub trait TimetableBackend {
    fn login(&self, username: &str, password: &str) -> Result<LoginResponse, BackendError>;
    fn list_sessions(&self, filter: &ListFilter) -> Result<Vec<ClassSession>, BackendError>;
    fn create_session(&self, token: Option<&str>, payload: &Value)
        -> Result<ClassSession, BackendError>;
    fn update_session(
        &self,
        token: Option<&str>,
        id: &str,
        payload: &Value,
    ) -> Result<ClassSession, BackendError>;
    fn delete_session(&self, token: Option<&str>, id: &str) -> Result<(), BackendError>;
}

pub struct HttpBackend {
    base_url: String,
    client: Client,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Unreachable(format!("HTTP client error: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send(
        &self,
        builder: RequestBuilder,
        token: Option<&str>,
        fallback: &str,
    ) -> Result<Response, BackendError> {
        let request_id = Uuid::new_v4().to_string();
        let mut builder = builder.header("X-Request-Id", &request_id);
        if let Some(t) = token {
            builder = builder.bearer_auth(t);
        }
        let resp = builder.send().map_err(|e| {
            log::warn!("request {} failed: {}", request_id, e);
            BackendError::Unreachable(e.to_string())
        })?;
        let status = resp.status();
        log::debug!("request {} -> {}", request_id, status);
        if status.is_success() {
            return Ok(resp);
        }

        let text = resp.text().unwrap_or_default();
        let body: Option<Value> = serde_json::from_str(&text).ok();
        let message = body
            .as_ref()
            .and_then(|b| b.get("message"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .or_else(|| {
                let t = text.trim();
                (!t.is_empty() && body.is_none()).then(|| t.to_string())
            })
            .unwrap_or_else(|| fallback.to_string());
        let conflict = body.as_ref().and_then(|b| {
            b.get("conflictingSession")
                .or_else(|| b.get("conflict"))
                .filter(|v| !v.is_null())
                .cloned()
        });
        log::info!("request {} rejected ({}): {}", request_id, status, message);
        Err(BackendError::Rejected {
            status: status.as_u16(),
            message,
            conflict,
        })
    }

    fn decode<T: serde::de::DeserializeOwned>(resp: Response) -> Result<T, BackendError> {
        let text = resp
            .text()
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| BackendError::Decode(e.to_string()))
    }
}

impl TimetableBackend for HttpBackend {
    fn login(&self, username: &str, password: &str) -> Result<LoginResponse, BackendError> {
        let req = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "username": username, "password": password }));
        Self::decode(self.send(req, None, "Login failed")?)
    }

    fn list_sessions(&self, filter: &ListFilter) -> Result<Vec<ClassSession>, BackendError> {
        let req = self.client.get(self.url("/timetable")).query(&filter.query());
        Self::decode(self.send(req, None, "Failed to fetch classes.")?)
    }

    fn create_session(
        &self,
        token: Option<&str>,
        payload: &Value,
    ) -> Result<ClassSession, BackendError> {
        let req = self.client.post(self.url("/timetable")).json(payload);
        Self::decode(self.send(req, token, "Failed to save.")?)
    }

    fn update_session(
        &self,
        token: Option<&str>,
        id: &str,
        payload: &Value,
    ) -> Result<ClassSession, BackendError> {
        let req = self
            .client
            .put(self.url(&format!("/timetable/{}", id)))
            .json(payload);
        Self::decode(self.send(req, token, "Failed to save.")?)
    }

    fn delete_session(&self, token: Option<&str>, id: &str) -> Result<(), BackendError> {
        let req = self.client.delete(self.url(&format!("/timetable/{}", id)));
        self.send(req, token, "Failed to delete class").map(|_| ())
    }
}
