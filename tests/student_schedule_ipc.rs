mod support;

use serde_json::json;
use support::{backend_session, Sidecar, StubBackend};

#[test]
fn student_schedule_shows_only_personal_sessions_in_12_hour_time() {
    // Ignores the query on purpose: the sidecar must filter again.
    let backend = StubBackend::start(|req| match req.method.as_str() {
        "GET" => {
            let mut evening = backend_session("p2", "Monday", "18:30", "20:00", "PERSONAL");
            evening["type"] = json!("Revision");
            let mut paper = backend_session("p3", "Monday", "07:00", "08:00", "PERSONAL");
            paper["type"] = json!("Paper Class");
            if let Some(o) = paper.as_object_mut() {
                o.remove("classNumber");
            }
            paper["title"] = json!("Past papers 2019");
            paper["subject"] = json!("Physics");
            (
                200,
                json!([
                    backend_session("p1", "Monday", "14:00", "15:30", "PERSONAL"),
                    evening,
                    paper,
                    backend_session("e1", "Monday", "10:00", "11:00", "EXTERNAL"),
                    backend_session("p4", "Tuesday", "10:00", "11:00", "PERSONAL"),
                ])
                .to_string(),
            )
        }
        _ => (404, json!({ "message": "no route" }).to_string()),
    });
    let mut sidecar = Sidecar::spawn(&backend.url);
    sidecar.call_ok("cfg", "config.update", json!({ "patch": { "utcOffsetMinutes": 0 } }));

    let result = sidecar.call_ok("1", "student.schedule", json!({ "day": "Monday" }));
    let sched = &result["schedule"];
    assert_eq!(sched["day"], json!("Monday"));
    assert_eq!(sched["sessionCount"], json!(3));
    assert_eq!(result["days"][0], json!("Monday"));
    assert_eq!(result["days"][6], json!("Sunday"));

    let cards = sched["cards"].as_array().expect("cards");
    let ids: Vec<&str> = cards.iter().filter_map(|c| c["id"].as_str()).collect();
    assert_eq!(ids, vec!["p1", "p2", "p3"]);

    assert_eq!(cards[0]["startTime"], json!("02:00 PM"));
    assert_eq!(cards[0]["endTime"], json!("03:30 PM"));
    assert_eq!(cards[0]["heading"], json!("Class 10 — Science"));
    assert_eq!(cards[0]["tone"], json!("theory"));
    assert_eq!(cards[0]["isEvening"], json!(false));

    assert_eq!(cards[1]["isEvening"], json!(true));
    assert_eq!(cards[1]["tone"], json!("revision"));

    assert_eq!(cards[2]["startTime"], json!("07:00 AM"));
    assert_eq!(cards[2]["heading"], json!("Class 2019 — Physics"));
    assert_eq!(cards[2]["tone"], json!("paper"));

    let gets = backend.requests_to("GET", "/timetable");
    assert_eq!(gets.len(), 1);
    assert!(gets[0].path.contains("category=PERSONAL"), "{}", gets[0].path);
    assert!(gets[0].path.contains("day=Monday"), "{}", gets[0].path);

    sidecar.shutdown();
}

#[test]
fn student_schedule_rejects_unknown_day() {
    let backend = StubBackend::start(|_| (200, "[]".to_string()));
    let mut sidecar = Sidecar::spawn(&backend.url);

    let error = sidecar.call_err("1", "student.schedule", json!({ "day": "monday" }));
    assert_eq!(error["code"], json!("bad_params"));

    let result = sidecar.call_ok("2", "student.schedule", json!({}));
    assert_eq!(result["schedule"]["isToday"], json!(true));
    assert_eq!(result["schedule"]["sessionCount"], json!(0));

    sidecar.shutdown();
}
