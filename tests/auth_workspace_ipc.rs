mod support;

use serde_json::json;
use support::{backend_session, dead_backend_url, temp_dir, Sidecar, StubBackend};

fn start_backend() -> StubBackend {
    StubBackend::start(|req| match (req.method.as_str(), req.path.as_str()) {
        ("POST", "/api/auth/login") => {
            let body = req.json();
            if body["password"] == json!("secret") {
                (200, json!({ "token": "tok-123", "username": "sir" }).to_string())
            } else {
                (401, json!({ "message": "Invalid credentials" }).to_string())
            }
        }
        ("GET", p) if p.starts_with("/timetable") => (
            200,
            json!([backend_session("m1", "Monday", "09:00", "10:00", "EXTERNAL")]).to_string(),
        ),
        ("DELETE", "/timetable/m1") => (200, json!({ "message": "deleted" }).to_string()),
        ("DELETE", _) => (404, json!({ "message": "Class not found" }).to_string()),
        _ => (404, json!({ "message": "no route" }).to_string()),
    })
}

#[test]
fn login_token_is_sent_and_survives_restart() {
    let backend = start_backend();
    let workspace = temp_dir("timetabled-auth");

    let mut sidecar = Sidecar::spawn(&backend.url);
    sidecar.call_ok(
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let error = sidecar.call_err(
        "2",
        "auth.login",
        json!({ "username": "sir", "password": "wrong" }),
    );
    assert_eq!(error["code"], json!("server_rejected"));
    assert_eq!(error["message"], json!("Invalid credentials"));

    let error = sidecar.call_err("3", "auth.login", json!({ "username": "sir" }));
    assert_eq!(error["code"], json!("bad_params"));

    let login = sidecar.call_ok(
        "4",
        "auth.login",
        json!({ "username": "sir", "password": "secret" }),
    );
    assert_eq!(login["username"], json!("sir"));
    sidecar.shutdown();

    // New process, same workspace: the token comes back from disk.
    let mut sidecar = Sidecar::spawn(&backend.url);
    let selected = sidecar.call_ok(
        "5",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(selected["loggedIn"], json!(true));
    let status = sidecar.call_ok("6", "auth.status", json!({}));
    assert_eq!(status["username"], json!("sir"));

    sidecar.call_ok("7", "timetable.list", json!({}));
    let deleted = sidecar.call_ok("8", "timetable.delete", json!({ "id": "m1" }));
    assert_eq!(deleted["deleted"], json!("m1"));
    assert_eq!(deleted["sessions"].as_array().map(|a| a.len()), Some(0));

    let deletes = backend.requests_to("DELETE", "/timetable/m1");
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].header("authorization"), Some("Bearer tok-123"));
    assert!(deletes[0].header("x-request-id").is_some());

    let error = sidecar.call_err("9", "timetable.delete", json!({ "id": "gone" }));
    assert_eq!(error["code"], json!("server_rejected"));
    assert_eq!(error["message"], json!("Class not found"));

    sidecar.call_ok("10", "auth.logout", json!({}));
    let status = sidecar.call_ok("11", "auth.status", json!({}));
    assert_eq!(status["loggedIn"], json!(false));
    sidecar.shutdown();

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn cached_listing_is_served_when_backend_is_down() {
    let backend = start_backend();
    let workspace = temp_dir("timetabled-offline");

    let mut sidecar = Sidecar::spawn(&backend.url);
    sidecar.call_ok(
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    sidecar.call_ok("2", "config.update", json!({ "patch": { "utcOffsetMinutes": 0 } }));
    let fresh = sidecar.call_ok("3", "timetable.list", json!({}));
    assert_eq!(fresh["stale"], json!(false));

    sidecar.call_ok(
        "4",
        "config.update",
        json!({ "patch": { "backendUrl": dead_backend_url() } }),
    );
    let cached = sidecar.call_ok("5", "timetable.list", json!({}));
    assert_eq!(cached["stale"], json!(true));
    assert!(cached["fetchedAt"].is_string());
    assert_eq!(cached["sessions"][0]["_id"], json!("m1"));
    assert_eq!(cached["sessions"][0]["startTime"], json!("09:00"));

    // Nothing cached for this scope.
    let error = sidecar.call_err("6", "timetable.list", json!({ "day": "Friday" }));
    assert_eq!(error["code"], json!("backend_unavailable"));

    // Writes never fall back.
    let error = sidecar.call_err("7", "timetable.delete", json!({ "id": "m1" }));
    assert_eq!(error["code"], json!("backend_unavailable"));
    sidecar.shutdown();

    // The saved backend URL and offset outlive the process.
    let mut sidecar = Sidecar::spawn(&backend.url);
    sidecar.call_ok(
        "8",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let config = sidecar.call_ok("9", "config.get", json!({}));
    assert_eq!(config["config"]["utcOffsetMinutes"], json!(0));
    assert_ne!(config["config"]["backendUrl"], json!(backend.url));
    sidecar.shutdown();

    let _ = std::fs::remove_dir_all(workspace);
}
