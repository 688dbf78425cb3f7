use crate::timetable::{ClassSession, SessionForm};
use thiserror::Error;

/// Local pre-save failures. All of them are recoverable form errors; the
/// backend's own refusal is reported separately as `BackendError::Rejected`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SaveError {
    #[error("Please set start and end times.")]
    MissingTimes,
    #[error("End time must be after start time.")]
    InvalidTimeOrder,
    #[error("Time Conflict! You already have a class scheduled during this time.")]
    TimeConflict(Box<ClassSession>),
}

impl SaveError {
    pub fn code(&self) -> &'static str {
        match self {
            SaveError::MissingTimes => "missing_times",
            SaveError::InvalidTimeOrder => "invalid_time_order",
            SaveError::TimeConflict(_) => "time_conflict",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub day: &'a str,
    pub start_time: &'a str,
    pub end_time: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Admission<'a> {
    Admitted,
    Conflict(&'a ClassSession),
}

/// Minutes since midnight for `H:MM`/`HH:MM` (24h) or `H:MM AM`/`HH:MM pm`
/// (12h). Anything else is `None`.
pub fn minutes_since_midnight(raw: &str) -> Option<u32> {
    let s = raw.trim();
    let (clock, meridiem) = split_meridiem(s);
    let (h, m) = clock.split_once(':')?;
    if h.is_empty() || h.len() > 2 || m.len() != 2 {
        return None;
    }
    if !h.bytes().all(|b| b.is_ascii_digit()) || !m.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: u32 = h.parse().ok()?;
    let minutes: u32 = m.parse().ok()?;
    if minutes > 59 {
        return None;
    }

    let hours = match meridiem {
        None if hours <= 23 => hours,
        None => return None,
        Some(_) if !(1..=12).contains(&hours) => return None,
        Some(Meridiem::Am) => hours % 12,
        Some(Meridiem::Pm) => hours % 12 + 12,
    };
    Some(hours * 60 + minutes)
}

#[derive(Debug, Clone, Copy)]
enum Meridiem {
    Am,
    Pm,
}

fn split_meridiem(s: &str) -> (&str, Option<Meridiem>) {
    if s.len() < 2 || !s.is_char_boundary(s.len() - 2) {
        return (s, None);
    }
    let (head, tail) = s.split_at(s.len() - 2);
    let meridiem = if tail.eq_ignore_ascii_case("AM") {
        Meridiem::Am
    } else if tail.eq_ignore_ascii_case("PM") {
        Meridiem::Pm
    } else {
        return (s, None);
    };
    (head.trim_end(), Some(meridiem))
}

/// First gate of a save: both times present and start strictly before end.
/// Time-picker values are `HH:MM`, so string order is clock order.
pub fn validate_time_inputs(start: &str, end: &str) -> Result<(), SaveError> {
    if start.trim().is_empty() || end.trim().is_empty() {
        return Err(SaveError::MissingTimes);
    }
    if start >= end {
        return Err(SaveError::InvalidTimeOrder);
    }
    Ok(())
}

/// Client-side overlap check against the known sessions. Same-day rows are
/// compared as half-open `[start, end)` intervals; the row being edited is
/// never compared with itself. A pair with any unparsable time is skipped:
/// the backend re-validates every save.
pub fn check_admission<'a>(
    candidate: &Candidate<'_>,
    existing: &'a [ClassSession],
    exclude_id: Option<&str>,
) -> Admission<'a> {
    let start_a = minutes_since_midnight(candidate.start_time);
    let end_a = minutes_since_midnight(candidate.end_time);

    for other in existing {
        if exclude_id.is_some() && other.id.as_deref() == exclude_id {
            continue;
        }
        if other.day != candidate.day {
            continue;
        }
        let start_b = minutes_since_midnight(&other.start_time);
        let end_b = minutes_since_midnight(&other.end_time);
        let (Some(sa), Some(ea), Some(sb), Some(eb)) = (start_a, end_a, start_b, end_b) else {
            continue;
        };
        if sa < eb && ea > sb {
            return Admission::Conflict(other);
        }
    }
    Admission::Admitted
}

/// Everything that has to pass before a form is sent to the backend.
pub fn admit_form(
    form: &SessionForm,
    existing: &[ClassSession],
    editing_id: Option<&str>,
) -> Result<(), SaveError> {
    validate_time_inputs(&form.start_time, &form.end_time)?;
    let candidate = Candidate {
        day: form.day.as_str(),
        start_time: &form.start_time,
        end_time: &form.end_time,
    };
    match check_admission(&candidate, existing, editing_id) {
        Admission::Admitted => Ok(()),
        Admission::Conflict(other) => Err(SaveError::TimeConflict(Box::new(other.clone()))),
    }
}
