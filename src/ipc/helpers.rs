use crate::backend::{BackendError, HttpBackend, ListFilter};
use crate::db;
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::timetable::{ClassSession, Weekday};
use std::time::Duration;

pub fn param_str<'a>(req: &'a Request, key: &str) -> Option<&'a str> {
    req.params.get(key).and_then(|v| v.as_str())
}

/// Optional weekday param; `Err` carries the bad_params message.
pub fn param_weekday(req: &Request, key: &str) -> Result<Option<Weekday>, String> {
    match req.params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => v
            .as_str()
            .and_then(Weekday::parse)
            .map(Some)
            .ok_or_else(|| format!("{} must be a weekday name", key)),
    }
}

pub fn backend_err(id: &str, e: &BackendError) -> serde_json::Value {
    err(id, e.code(), e.to_string(), e.details())
}

pub fn rebuild_backend(state: &mut AppState) -> Result<(), BackendError> {
    let backend = HttpBackend::new(
        &state.config.backend_url,
        Duration::from_secs(state.config.timeout_secs),
    )?;
    state.backend = Box::new(backend);
    log::info!("backend set to {}", state.config.backend_url);
    Ok(())
}

pub struct Listing {
    pub sessions: Vec<ClassSession>,
    /// Set when the backend was unreachable and the workspace cache answered.
    pub stale_since: Option<String>,
}

/// Reads a listing from the backend, refreshing the workspace cache on
/// success and falling back to it when the backend cannot be reached.
pub fn fetch_listing(state: &AppState, filter: &ListFilter) -> Result<Listing, BackendError> {
    let scope = filter.scope();
    match state.backend.list_sessions(filter) {
        Ok(sessions) => {
            if let Some(conn) = state.db.as_ref() {
                if let Err(e) = db::cache_put(conn, &scope, &sessions) {
                    log::warn!("timetable cache write failed for {}: {:?}", scope, e);
                }
            }
            Ok(Listing {
                sessions,
                stale_since: None,
            })
        }
        Err(BackendError::Unreachable(msg)) => {
            let cached = state
                .db
                .as_ref()
                .and_then(|conn| db::cache_get(conn, &scope).ok().flatten());
            match cached {
                Some(c) => {
                    log::warn!("backend unreachable ({}); serving cached {}", msg, scope);
                    Ok(Listing {
                        sessions: c.sessions,
                        stale_since: Some(c.fetched_at),
                    })
                }
                None => Err(BackendError::Unreachable(msg)),
            }
        }
        Err(e) => Err(e),
    }
}
