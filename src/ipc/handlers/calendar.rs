use crate::backend::ListFilter;
use crate::calendar::{event_from_session, move_payload, Move};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{backend_err, fetch_listing, param_str};
use crate::ipc::types::{AppState, Request};
use crate::timetable::{sort_by_start, ClockStyle};
use serde_json::json;

fn handle_events(state: &mut AppState, req: &Request) -> serde_json::Value {
    let listing = match fetch_listing(state, &ListFilter::default()) {
        Ok(l) => l,
        Err(e) => return backend_err(&req.id, &e),
    };
    state.events = listing.sessions.into_iter().map(event_from_session).collect();
    ok(
        &req.id,
        json!({
            "events": state.events,
            "stale": listing.stale_since.is_some(),
        }),
    )
}

/// Drag or resize. On failure the caller reverts the event; local state is
/// left as it was.
fn handle_move(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(id) = param_str(req, "id") else {
        return err(&req.id, "bad_params", "missing id", None);
    };
    let Some(start) = param_str(req, "start") else {
        return err(&req.id, "bad_params", "missing start", None);
    };
    let Some(mv) = Move::parse(start, param_str(req, "end")) else {
        return err(&req.id, "bad_params", "start/end must be ISO-8601 instants", None);
    };
    let Some(pos) = state.events.iter().position(|ev| ev.id.as_deref() == Some(id)) else {
        return err(&req.id, "not_found", "event not loaded", None);
    };

    let body = move_payload(&state.events[pos].extended_props, &mv, &state.config.offset());
    let mut updated = match state.backend.update_session(state.token(), id, &body) {
        Ok(s) => s,
        Err(e) => {
            log::warn!("calendar move of {} failed: {}", id, e);
            return err(
                &req.id,
                e.code(),
                "Failed to save change",
                Some(json!({ "reason": e.to_string(), "backend": e.details() })),
            );
        }
    };
    if updated.id.is_none() {
        updated.id = Some(id.to_string());
    }

    // The admission list must see the new window too.
    let offset = state.config.offset();
    if let Some(row) = state.sessions.iter_mut().find(|s| s.id.as_deref() == Some(id)) {
        *row = updated
            .clone()
            .with_display_times(&offset, ClockStyle::TwentyFourHour);
        sort_by_start(&mut state.sessions);
    }

    let event = event_from_session(updated);
    state.events[pos] = event.clone();
    ok(&req.id, json!({ "event": event }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "calendar.events" => Some(handle_events(state, req)),
        "calendar.move" => Some(handle_move(state, req)),
        _ => None,
    }
}
