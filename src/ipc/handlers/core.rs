use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{backend_err, rebuild_backend};
use crate::ipc::types::{AppState, AuthSession, Request};
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "backendUrl": state.config.backend_url,
            "loggedIn": state.auth.is_some(),
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    let conn = match db::open_db(&path) {
        Ok(c) => c,
        Err(e) => return err(&req.id, "db_open_failed", format!("{e:?}"), None),
    };

    // Best-effort: a stale saved config or auth entry must not prevent the
    // workspace from opening.
    if let Ok(Some(saved)) = db::settings_get_json(&conn, db::KEY_CLIENT_CONFIG) {
        if let Some(obj) = saved.as_object() {
            if let Err(e) = state.config.apply_patch(obj) {
                log::warn!("ignoring saved client config: {}", e);
            }
        }
    }
    if let Ok(Some(saved)) = db::settings_get_json(&conn, db::KEY_AUTH_SESSION) {
        match serde_json::from_value::<AuthSession>(saved) {
            Ok(a) => state.auth = Some(a),
            Err(e) => log::warn!("ignoring saved auth session: {}", e),
        }
    }

    state.workspace = Some(path.clone());
    state.db = Some(conn);
    if let Err(e) = rebuild_backend(state) {
        return backend_err(&req.id, &e);
    }
    log::info!("workspace opened at {}", path.to_string_lossy());
    ok(
        &req.id,
        json!({
            "workspacePath": path.to_string_lossy(),
            "loggedIn": state.auth.is_some(),
        }),
    )
}

fn handle_config_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "config": state.config }))
}

fn handle_config_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(patch) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "missing patch object", None);
    };
    let mut next = state.config.clone();
    if let Err(msg) = next.apply_patch(patch) {
        return err(&req.id, "bad_params", msg, None);
    }
    let previous = std::mem::replace(&mut state.config, next);
    if let Err(e) = rebuild_backend(state) {
        state.config = previous;
        return backend_err(&req.id, &e);
    }

    if let Some(conn) = state.db.as_ref() {
        let value = match serde_json::to_value(&state.config) {
            Ok(v) => v,
            Err(e) => return err(&req.id, "db_write_failed", e.to_string(), None),
        };
        if let Err(e) = db::settings_set_json(conn, db::KEY_CLIENT_CONFIG, &value) {
            return err(&req.id, "db_write_failed", format!("{e:?}"), None);
        }
    }
    ok(&req.id, json!({ "config": state.config }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "config.get" => Some(handle_config_get(state, req)),
        "config.update" => Some(handle_config_update(state, req)),
        _ => None,
    }
}
