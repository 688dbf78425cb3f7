use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveTime, SecondsFormat, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub const EXTERNAL_INSTITUTES: [&str; 2] = ["Excellent Institute", "Viyabarimoolai Institute"];
pub const PERSONAL_LOCATIONS: [&str; 2] = ["Thumbasiddy", "Puttalai"];
pub const GRADES: [&str; 6] = [
    "Grade 6", "Grade 7", "Grade 8", "Grade 9", "Grade 10", "Grade 11",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    /// Sunday-first, the order the admin list groups by.
    pub const ALL: [Weekday; 7] = [
        Weekday::Sunday,
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
    ];

    /// Monday-first, the order of the student day tabs.
    pub const MONDAY_FIRST: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// Case-sensitive: "monday" is not a weekday.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == s)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Weekday::Sunday => "Sunday",
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
        }
    }

    pub fn days_from_sunday(self) -> i64 {
        Self::ALL
            .iter()
            .position(|d| *d == self)
            .unwrap_or_default() as i64
    }

    pub fn from_chrono(w: chrono::Weekday) -> Self {
        Self::ALL[w.num_days_from_sunday() as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Personal,
    External,
}

impl Category {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PERSONAL" => Some(Self::Personal),
            "EXTERNAL" => Some(Self::External),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Personal => "PERSONAL",
            Self::External => "EXTERNAL",
        }
    }

    pub fn locations(self) -> &'static [&'static str] {
        match self {
            Self::Personal => &PERSONAL_LOCATIONS,
            Self::External => &EXTERNAL_INSTITUTES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassType {
    Theory,
    Revision,
    #[serde(rename = "Paper Class")]
    PaperClass,
}

impl ClassType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Theory => "Theory",
            Self::Revision => "Revision",
            Self::PaperClass => "Paper Class",
        }
    }
}

/// One class session as the backend serves it. Fields the client does not
/// interpret are kept in `extra` and written back untouched. Rows are not
/// schema-checked: a value of the wrong shape or outside the known set reads
/// as absent, so one odd row never fails a whole listing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSession {
    #[serde(
        rename = "_id",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub day: String,
    #[serde(default, deserialize_with = "text")]
    pub start_time: String,
    #[serde(default, deserialize_with = "text")]
    pub end_time: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub class_type: Option<ClassType>,
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub class_number: Option<i64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub is_evening: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn lenient<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<Value>::deserialize(d)?;
    Ok(raw.and_then(|v| serde_json::from_value(v).ok()))
}

fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let v: Option<String> = lenient(d)?;
    Ok(v.unwrap_or_default())
}

/// `10`, `10.0` and `"10"` all read as 10.
fn lenient_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    let raw = Option::<Value>::deserialize(d)?;
    Ok(match raw {
        Some(Value::Number(n)) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 1e15)
                .map(|f| f as i64)
        }),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockStyle {
    /// `14:05`
    TwentyFourHour,
    /// `02:05 PM`
    TwelveHour,
}

pub fn parse_instant(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw.trim()).ok()
}

/// Renders a backend instant as a wall-clock string in `offset`. Values that
/// are not instants (already formatted, or garbage) come back unchanged.
pub fn format_clock(raw: &str, offset: &FixedOffset, style: ClockStyle) -> String {
    let Some(t) = parse_instant(raw) else {
        return raw.to_string();
    };
    let local = t.with_timezone(offset);
    match style {
        ClockStyle::TwentyFourHour => local.format("%H:%M").to_string(),
        ClockStyle::TwelveHour => local.format("%I:%M %p").to_string(),
    }
}

impl ClassSession {
    pub fn with_display_times(mut self, offset: &FixedOffset, style: ClockStyle) -> Self {
        self.start_time = format_clock(&self.start_time, offset, style);
        self.end_time = format_clock(&self.end_time, offset, style);
        self
    }

    pub fn is_category(&self, category: Category) -> bool {
        self.category == Some(category)
    }
}

pub fn iso_millis(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_picker_time(clock: &str) -> Option<NaiveTime> {
    let clock = clock.trim();
    NaiveTime::parse_from_str(clock, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(clock, "%H:%M:%S"))
        .ok()
}

/// Next date falling on `day` (today included) at wall-clock `clock` in the
/// offset of `now`.
pub fn next_occurrence(day: Weekday, clock: &str, now: DateTime<FixedOffset>) -> Option<DateTime<Utc>> {
    let time = parse_picker_time(clock)?;
    let today = now.weekday().num_days_from_sunday() as i64;
    let ahead = (day.days_from_sunday() - today + 7) % 7;
    let date = now.date_naive() + Duration::days(ahead);
    let local = now.offset().from_local_datetime(&date.and_time(time)).single()?;
    Some(local.with_timezone(&Utc))
}

/// First run of ASCII digits, e.g. `Grade 10` -> 10.
pub fn first_number(s: &str) -> Option<i64> {
    let start = s.find(|c: char| c.is_ascii_digit())?;
    let digits: String = s[start..].chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionForm {
    pub day: Weekday,
    pub grade: String,
    pub subject: String,
    pub category: Category,
    pub class_type: ClassType,
    pub location: String,
    pub start_time: String,
    pub end_time: String,
}

impl Default for SessionForm {
    fn default() -> Self {
        Self {
            day: Weekday::Monday,
            grade: "Grade 10".to_string(),
            subject: "Science".to_string(),
            category: Category::External,
            class_type: ClassType::Theory,
            location: EXTERNAL_INSTITUTES[0].to_string(),
            start_time: String::new(),
            end_time: String::new(),
        }
    }
}

impl SessionForm {
    /// Prefill for editing; every missing field falls back to the new-form default.
    pub fn from_session(s: &ClassSession) -> Self {
        let d = Self::default();
        Self {
            day: Weekday::parse(&s.day).unwrap_or(d.day),
            grade: non_empty(&s.grade).unwrap_or(d.grade),
            subject: non_empty(&s.subject)
                .or_else(|| non_empty(&s.title))
                .unwrap_or(d.subject),
            category: s.category.unwrap_or(d.category),
            class_type: s.class_type.unwrap_or(d.class_type),
            location: non_empty(&s.location).unwrap_or(d.location),
            start_time: s.start_time.clone(),
            end_time: s.end_time.clone(),
        }
    }

    pub fn set_category(&mut self, category: Category) {
        self.category = category;
        self.location = category.locations()[0].to_string();
    }

    pub fn location_allowed(&self) -> bool {
        self.category.locations().contains(&self.location.as_str())
    }

    pub fn title(&self) -> String {
        format!("{} - {}", self.subject, self.grade)
    }

    /// Body for POST/PUT `/timetable`. Times are resolved to the next
    /// occurrence of the form's weekday relative to `now`.
    pub fn to_payload(&self, now: DateTime<FixedOffset>) -> Option<Value> {
        let start = next_occurrence(self.day, &self.start_time, now)?;
        let end = next_occurrence(self.day, &self.end_time, now)?;
        let mut body = serde_json::to_value(self).ok()?;
        let obj = body.as_object_mut()?;
        obj.insert("title".into(), Value::String(self.title()));
        obj.insert("startTime".into(), Value::String(iso_millis(start)));
        obj.insert("endTime".into(), Value::String(iso_millis(end)));
        obj.insert("type".into(), Value::String(self.class_type.as_str().into()));
        if let Some(n) = first_number(&self.grade) {
            obj.insert("classNumber".into(), Value::from(n));
        }
        Some(body)
    }
}

fn non_empty(v: &Option<String>) -> Option<String> {
    v.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Replace-by-id when editing, append when new, then re-sort for display.
pub fn merge_saved(list: &mut Vec<ClassSession>, saved: ClassSession, editing_id: Option<&str>) {
    let slot = match editing_id {
        Some(_) if saved.id.is_some() => list.iter_mut().find(|c| c.id == saved.id),
        _ => None,
    };
    match slot {
        Some(existing) => *existing = saved,
        None => list.push(saved),
    }
    sort_by_start(list);
}

pub fn sort_by_start(list: &mut [ClassSession]) {
    list.sort_by(|a, b| a.start_time.cmp(&b.start_time));
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayRow {
    pub session: ClassSession,
    pub label: String,
    pub badge: &'static str,
    pub location_key: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayGroup {
    pub day: Weekday,
    pub rows: Vec<DayRow>,
}

fn location_key(location: Option<&str>) -> &'static str {
    let loc = location.unwrap_or_default();
    if loc.contains("Viyabarimoolai") {
        "viyabarimoolaiInstitute"
    } else if loc.contains("Puttalai") {
        "puttalai"
    } else if loc.contains("Thumbasiddy") {
        "thumbasiddy"
    } else {
        "excellentInstitute"
    }
}

/// Admin list view: Sunday-first, days without sessions omitted.
pub fn day_groups(list: &[ClassSession]) -> Vec<DayGroup> {
    Weekday::ALL
        .into_iter()
        .filter_map(|day| {
            let rows: Vec<DayRow> = list
                .iter()
                .filter(|s| s.day == day.as_str())
                .map(|s| DayRow {
                    label: match s.class_number {
                        Some(n) if n != 0 => format!("Class {}", n),
                        _ => s.grade.clone().unwrap_or_default(),
                    },
                    badge: if s.is_category(Category::External) {
                        "Fixed"
                    } else {
                        "Personal"
                    },
                    location_key: location_key(s.location.as_deref()),
                    session: s.clone(),
                })
                .collect();
            if rows.is_empty() {
                None
            } else {
                Some(DayGroup { day, rows })
            }
        })
        .collect()
}
