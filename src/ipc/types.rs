use std::path::PathBuf;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::backend::TimetableBackend;
use crate::calendar::CalendarEvent;
use crate::config::ClientConfig;
use crate::timetable::ClassSession;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    #[serde(default)]
    pub username: Option<String>,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub config: ClientConfig,
    pub backend: Box<dyn TimetableBackend>,
    pub auth: Option<AuthSession>,
    /// Admin list, times rendered as `HH:MM`, sorted by start.
    pub sessions: Vec<ClassSession>,
    /// Calendar events, raw backend instants.
    pub events: Vec<CalendarEvent>,
}

impl AppState {
    pub fn new(config: ClientConfig, backend: Box<dyn TimetableBackend>) -> Self {
        Self {
            workspace: None,
            db: None,
            config,
            backend,
            auth: None,
            sessions: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.auth.as_ref().map(|a| a.token.as_str())
    }
}
