use crate::admission::{admit_form, SaveError};
use crate::backend::ListFilter;
use crate::calendar::event_from_session;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{backend_err, fetch_listing, param_str, param_weekday};
use crate::ipc::types::{AppState, Request};
use crate::timetable::{
    day_groups, merge_saved, sort_by_start, Category, ClassSession, ClockStyle, SessionForm,
    Weekday, GRADES,
};
use serde_json::json;

fn save_error(id: &str, e: &SaveError) -> serde_json::Value {
    let details = match e {
        SaveError::TimeConflict(other) => Some(json!({ "conflictingSession": other })),
        _ => None,
    };
    err(id, e.code(), e.to_string(), details)
}

fn parse_form(req: &Request) -> Result<SessionForm, String> {
    let Some(raw) = req.params.get("form") else {
        return Err("missing form".into());
    };
    serde_json::from_value(raw.clone()).map_err(|e| format!("invalid form: {}", e))
}

fn parse_category(req: &Request) -> Result<Option<Category>, String> {
    match req.params.get("category") {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => v
            .as_str()
            .and_then(Category::parse)
            .map(Some)
            .ok_or_else(|| "category must be PERSONAL or EXTERNAL".to_string()),
    }
}

fn form_options(form: &SessionForm) -> serde_json::Value {
    json!({
        "form": form,
        "locations": form.category.locations(),
        "grades": GRADES,
        "days": Weekday::ALL,
    })
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let category = match parse_category(req) {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let day = match param_weekday(req, "day") {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let filter = ListFilter { category, day };

    let listing = match fetch_listing(state, &filter) {
        Ok(l) => l,
        Err(e) => return backend_err(&req.id, &e),
    };
    let offset = state.config.offset();
    let mut sessions: Vec<ClassSession> = listing
        .sessions
        .into_iter()
        .map(|s| s.with_display_times(&offset, ClockStyle::TwentyFourHour))
        .collect();
    sort_by_start(&mut sessions);

    // Only the full listing backs the admission check.
    if filter == ListFilter::default() {
        state.sessions = sessions.clone();
    }
    ok(
        &req.id,
        json!({
            "sessions": sessions,
            "stale": listing.stale_since.is_some(),
            "fetchedAt": listing.stale_since,
        }),
    )
}

fn handle_day_groups(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "groups": day_groups(&state.sessions),
            "empty": state.sessions.is_empty(),
        }),
    )
}

fn handle_form_new(_state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, form_options(&SessionForm::default()))
}

fn handle_form_edit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(id) = param_str(req, "id") else {
        return err(&req.id, "bad_params", "missing id", None);
    };
    let Some(existing) = state.sessions.iter().find(|s| s.id.as_deref() == Some(id)) else {
        return err(&req.id, "not_found", "session not found", None);
    };
    let mut out = form_options(&SessionForm::from_session(existing));
    out["editingId"] = json!(id);
    ok(&req.id, out)
}

fn handle_form_set_category(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let mut form = match parse_form(req) {
        Ok(f) => f,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let category = match parse_category(req) {
        Ok(Some(c)) => c,
        Ok(None) => return err(&req.id, "bad_params", "missing category", None),
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    form.set_category(category);
    ok(&req.id, form_options(&form))
}

fn handle_check(state: &mut AppState, req: &Request) -> serde_json::Value {
    let form = match parse_form(req) {
        Ok(f) => f,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let editing_id = param_str(req, "editingId").filter(|s| !s.is_empty());
    match admit_form(&form, &state.sessions, editing_id) {
        Ok(()) => ok(&req.id, json!({ "admitted": true })),
        Err(SaveError::TimeConflict(other)) => ok(
            &req.id,
            json!({ "admitted": false, "conflictingSession": other }),
        ),
        Err(e) => save_error(&req.id, &e),
    }
}

fn handle_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    let form = match parse_form(req) {
        Ok(f) => f,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let editing_id = param_str(req, "editingId").filter(|s| !s.is_empty());

    if let Err(e) = admit_form(&form, &state.sessions, editing_id) {
        log::info!("save refused locally: {}", e);
        return save_error(&req.id, &e);
    }
    if !form.location_allowed() {
        return err(
            &req.id,
            "bad_params",
            format!(
                "location must be one of: {}",
                form.category.locations().join(", ")
            ),
            None,
        );
    }
    let Some(payload) = form.to_payload(state.config.now()) else {
        return err(&req.id, "bad_params", "start and end must be HH:MM", None);
    };

    let token = state.token();
    let saved = match editing_id {
        Some(id) => state.backend.update_session(token, id, &payload),
        None => state.backend.create_session(token, &payload),
    };
    let saved = match saved {
        Ok(s) => s,
        Err(e) => return backend_err(&req.id, &e),
    };

    // Calendar events keep the raw instants.
    let event = event_from_session(saved.clone());
    match state
        .events
        .iter_mut()
        .find(|ev| ev.id.is_some() && ev.id == event.id)
    {
        Some(existing) => *existing = event,
        None => state.events.push(event),
    }

    let saved = saved.with_display_times(&state.config.offset(), ClockStyle::TwentyFourHour);
    merge_saved(&mut state.sessions, saved.clone(), editing_id);
    ok(
        &req.id,
        json!({
            "session": saved,
            "sessions": state.sessions,
        }),
    )
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(id) = param_str(req, "id").filter(|s| !s.is_empty()) else {
        return err(&req.id, "bad_params", "missing id", None);
    };
    if let Err(e) = state.backend.delete_session(state.token(), id) {
        return backend_err(&req.id, &e);
    }
    state.sessions.retain(|s| s.id.as_deref() != Some(id));
    state.events.retain(|ev| ev.id.as_deref() != Some(id));
    ok(&req.id, json!({ "deleted": id, "sessions": state.sessions }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "timetable.list" => Some(handle_list(state, req)),
        "timetable.dayGroups" => Some(handle_day_groups(state, req)),
        "timetable.form.new" => Some(handle_form_new(state, req)),
        "timetable.form.edit" => Some(handle_form_edit(state, req)),
        "timetable.form.setCategory" => Some(handle_form_set_category(state, req)),
        "timetable.check" => Some(handle_check(state, req)),
        "timetable.save" => Some(handle_save(state, req)),
        "timetable.delete" => Some(handle_delete(state, req)),
        _ => None,
    }
}
