use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{backend_err, param_str};
use crate::ipc::types::{AppState, AuthSession, Request};
use serde_json::json;

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let username = param_str(req, "username").map(str::trim).unwrap_or_default();
    let password = param_str(req, "password").unwrap_or_default();
    if username.is_empty() || password.is_empty() {
        return err(&req.id, "bad_params", "username and password are required", None);
    }

    let resp = match state.backend.login(username, password) {
        Ok(r) => r,
        Err(e) => return backend_err(&req.id, &e),
    };
    let session = AuthSession {
        token: resp.token,
        username: resp.username.or_else(|| Some(username.to_string())),
    };

    if let Some(conn) = state.db.as_ref() {
        let value = match serde_json::to_value(&session) {
            Ok(v) => v,
            Err(e) => return err(&req.id, "db_write_failed", e.to_string(), None),
        };
        if let Err(e) = db::settings_set_json(conn, db::KEY_AUTH_SESSION, &value) {
            return err(&req.id, "db_write_failed", format!("{e:?}"), None);
        }
    }
    log::info!("logged in as {}", session.username.as_deref().unwrap_or("?"));
    let username = session.username.clone();
    state.auth = Some(session);
    ok(&req.id, json!({ "loggedIn": true, "username": username }))
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.auth = None;
    if let Some(conn) = state.db.as_ref() {
        if let Err(e) = db::settings_delete(conn, db::KEY_AUTH_SESSION) {
            return err(&req.id, "db_write_failed", format!("{e:?}"), None);
        }
    }
    ok(&req.id, json!({ "loggedIn": false }))
}

fn handle_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "loggedIn": state.auth.is_some(),
            "username": state.auth.as_ref().and_then(|a| a.username.clone()),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.login" => Some(handle_login(state, req)),
        "auth.logout" => Some(handle_logout(state, req)),
        "auth.status" => Some(handle_status(state, req)),
        _ => None,
    }
}
