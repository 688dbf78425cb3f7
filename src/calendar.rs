use crate::timetable::{iso_millis, parse_instant, ClassSession, Weekday};
use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::Serialize;
use serde_json::{json, Value};

pub const PALETTE: [&str; 8] = [
    "#EF4444", "#F59E0B", "#10B981", "#3B82F6", "#8B5CF6", "#EC4899", "#06B6D4", "#F97316",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: Option<String>,
    pub title: String,
    pub start: String,
    pub end: String,
    pub color: &'static str,
    pub extended_props: ClassSession,
}

/// djb2 with xor over UTF-16 units, 32-bit wrapping. Stable across runs so a
/// session keeps its colour.
fn hash_key(key: &str) -> u32 {
    let mut h: i32 = 5381;
    for unit in key.encode_utf16() {
        h = h.wrapping_mul(33) ^ i32::from(unit);
    }
    h as u32
}

pub fn color_for_key(key: &str) -> &'static str {
    if key.is_empty() {
        return PALETTE[0];
    }
    PALETTE[(hash_key(key) % PALETTE.len() as u32) as usize]
}

/// An empty string counts as missing.
fn filled(v: &Option<String>) -> Option<&str> {
    v.as_deref().filter(|s| !s.is_empty())
}

fn event_title(s: &ClassSession) -> String {
    filled(&s.title)
        .or(filled(&s.subject))
        .unwrap_or("Class")
        .to_string()
}

pub fn event_from_session(s: ClassSession) -> CalendarEvent {
    let key = filled(&s.id)
        .or(filled(&s.title))
        .or(filled(&s.subject))
        .unwrap_or_default();
    CalendarEvent {
        id: s.id.clone(),
        title: event_title(&s),
        start: s.start_time.clone(),
        end: s.end_time.clone(),
        color: color_for_key(key),
        extended_props: s,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Move {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Move {
    /// A drop without an end keeps a one hour block.
    pub fn parse(start: &str, end: Option<&str>) -> Option<Self> {
        let start = parse_instant(start)?.with_timezone(&Utc);
        let end = match end.filter(|e| !e.trim().is_empty()) {
            Some(e) => parse_instant(e)?.with_timezone(&Utc),
            None => start + Duration::hours(1),
        };
        Some(Self { start, end })
    }
}

/// PUT body for a dragged or resized event. The weekday follows the new start
/// in the display offset.
pub fn move_payload(props: &ClassSession, mv: &Move, offset: &FixedOffset) -> Value {
    let day = Weekday::from_chrono(chrono::Datelike::weekday(&mv.start.with_timezone(offset)));
    let medium = props
        .extra
        .get("medium")
        .and_then(|v| v.as_str())
        .filter(|m| !m.is_empty())
        .unwrap_or("English");
    json!({
        "title": event_title(props),
        "startTime": iso_millis(mv.start),
        "endTime": iso_millis(mv.end),
        "location": filled(&props.location).unwrap_or("Unknown"),
        "category": props.category.map(|c| c.as_str()).unwrap_or("EXTERNAL"),
        "type": props.class_type.map(|t| t.as_str()).unwrap_or("Theory"),
        "medium": medium,
        "day": day.as_str(),
    })
}
