use crate::timetable::{
    first_number, format_clock, parse_instant, Category, ClassSession, ClassType, ClockStyle,
    Weekday,
};
use chrono::{FixedOffset, Timelike};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentCard {
    pub id: Option<String>,
    pub heading: String,
    pub start_time: String,
    pub end_time: String,
    pub location: Option<String>,
    pub class_type: Option<ClassType>,
    pub tone: &'static str,
    pub is_evening: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySchedule {
    pub day: Weekday,
    pub is_today: bool,
    pub session_count: usize,
    pub cards: Vec<StudentCard>,
}

fn tone(t: Option<ClassType>) -> &'static str {
    match t {
        Some(ClassType::Theory) => "theory",
        Some(ClassType::Revision) => "revision",
        _ => "paper",
    }
}

/// Evening means a start in [18:00, 23:00) local time.
fn starts_in_evening(raw_start: &str, offset: &FixedOffset) -> bool {
    parse_instant(raw_start)
        .map(|t| (18..23).contains(&t.with_timezone(offset).hour()))
        .unwrap_or(false)
}

fn card(s: &ClassSession, offset: &FixedOffset) -> StudentCard {
    let name = s.subject.clone().or_else(|| s.title.clone()).unwrap_or_default();
    let number = s.class_number.or_else(|| {
        s.title
            .as_deref()
            .or(s.subject.as_deref())
            .and_then(first_number)
    });
    let heading = match number {
        Some(n) if n != 0 => format!("Class {} — {}", n, name),
        _ => name,
    };
    StudentCard {
        id: s.id.clone(),
        heading,
        start_time: format_clock(&s.start_time, offset, ClockStyle::TwelveHour),
        end_time: format_clock(&s.end_time, offset, ClockStyle::TwelveHour),
        location: s.location.clone(),
        class_type: s.class_type,
        tone: tone(s.class_type),
        is_evening: s
            .is_evening
            .unwrap_or_else(|| starts_in_evening(&s.start_time, offset)),
    }
}

/// Students only ever see personal tuition classes. The backend is asked for
/// that slice already; the filter is repeated here in case it ignores the query.
pub fn personal_schedule(
    sessions: &[ClassSession],
    day: Weekday,
    today: Weekday,
    offset: &FixedOffset,
) -> DaySchedule {
    let cards: Vec<StudentCard> = sessions
        .iter()
        .filter(|s| s.day == day.as_str() && s.is_category(Category::Personal))
        .map(|s| card(s, offset))
        .collect();
    DaySchedule {
        day,
        is_today: day == today,
        session_count: cards.len(),
        cards,
    }
}
