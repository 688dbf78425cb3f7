use crate::backend::ListFilter;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{backend_err, fetch_listing, param_weekday};
use crate::ipc::types::{AppState, Request};
use crate::student::personal_schedule;
use crate::timetable::Weekday;
use chrono::Datelike;
use serde_json::json;

fn handle_schedule(state: &mut AppState, req: &Request) -> serde_json::Value {
    let today = Weekday::from_chrono(state.config.now().weekday());
    let day = match param_weekday(req, "day") {
        Ok(v) => v.unwrap_or(today),
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };

    let listing = match fetch_listing(state, &ListFilter::personal_on(day)) {
        Ok(l) => l,
        Err(e) => return backend_err(&req.id, &e),
    };
    let schedule = personal_schedule(&listing.sessions, day, today, &state.config.offset());
    ok(
        &req.id,
        json!({
            "schedule": schedule,
            "days": Weekday::MONDAY_FIRST,
            "stale": listing.stale_since.is_some(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "student.schedule" => Some(handle_schedule(state, req)),
        _ => None,
    }
}
